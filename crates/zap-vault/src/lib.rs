//! Vault leg adapter for the zap router.
//!
//! Wraps a single weighted-pool swap between a pool's LP token and the
//! principal token. Vault pools are addressed by an opaque 32-byte
//! identifier rather than a contract reference, and the deadline constraint
//! is enforced inside this leg, so a route that runs past its deadline
//! aborts here regardless of what the orchestrator already checked.

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use thiserror::Error;
use zap_types::{Asset, ConfigSchema, ImplementationRegistry, ZapError};

/// Re-export implementations
pub mod implementations {
	pub mod weighted;
}

/// Errors that can occur during vault leg operations.
#[derive(Debug, Error)]
pub enum VaultError {
	/// No pool is registered under the given identifier.
	#[error("Unknown vault pool {0}")]
	UnknownPool(B256),
	/// One side of the swap is not a member of the addressed pool.
	#[error("Asset not in pool: {0}")]
	AssetNotInPool(String),
	/// Ambient time passed the deadline when the leg executed.
	#[error("Deadline expired at vault leg: deadline {deadline}, now {now}")]
	DeadlineExpired { deadline: u64, now: u64 },
	/// The computed output fell below the supplied limit.
	#[error("Swap limit not met: limit {limit}, actual {actual}")]
	LimitNotMet { limit: U256, actual: U256 },
	/// The pool cannot cover the requested output.
	#[error("Insufficient liquidity: {0}")]
	InsufficientLiquidity(String),
	/// Checked arithmetic failed mid-computation.
	#[error("Arithmetic failure: {0}")]
	Math(String),
	/// The implementation's configuration table is unusable.
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
}

impl From<VaultError> for ZapError {
	fn from(error: VaultError) -> Self {
		match error {
			VaultError::DeadlineExpired { deadline, now } => {
				ZapError::DeadlineExpired { deadline, now }
			}
			VaultError::LimitNotMet { limit, actual } => ZapError::SlippageExceeded {
				minimum: limit,
				actual,
			},
			other => ZapError::LegExecutionFailed(other.to_string()),
		}
	}
}

/// Trait defining the interface for a vault implementation.
///
/// A vault holds many two-token pools keyed by identifier and executes
/// single swaps against them. `quote_swap` mirrors the exact pricing math of
/// `swap` without the deadline/limit checks and without state changes.
#[async_trait]
#[cfg_attr(feature = "testing", mockall::automock)]
pub trait VaultInterface: Send + Sync {
	/// Returns the configuration schema for this vault implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// The address routes approve as the spender for vault-bound tokens.
	fn address(&self) -> Address;

	/// Executes a single swap against the addressed pool.
	async fn swap(
		&self,
		pool_id: B256,
		asset_in: Asset,
		asset_out: Asset,
		amount_in: U256,
		limit: U256,
		deadline: u64,
	) -> Result<U256, VaultError>;

	/// Side-effect-free mirror of `swap`.
	async fn quote_swap(
		&self,
		pool_id: B256,
		asset_in: Asset,
		asset_out: Asset,
		amount_in: U256,
	) -> Result<U256, VaultError>;

	/// Current reserves of the addressed pool, in token order.
	async fn reserves(&self, pool_id: B256) -> Result<(U256, U256), VaultError>;
}

/// Type alias for vault factory functions.
pub type VaultFactory = fn(&toml::Value) -> Result<Box<dyn VaultInterface>, VaultError>;

/// Registry trait for vault implementations.
pub trait VaultRegistry: ImplementationRegistry<Factory = VaultFactory> {}

/// Get all registered vault implementations.
pub fn get_all_implementations() -> Vec<(&'static str, VaultFactory)> {
	use implementations::weighted;

	vec![(weighted::Registry::NAME, weighted::Registry::factory())]
}

/// Service that fronts the configured vault implementation.
pub struct VaultService {
	/// The vault implementation routes swap through.
	implementation: Box<dyn VaultInterface>,
}

impl VaultService {
	/// Creates a new VaultService over the given implementation.
	pub fn new(implementation: Box<dyn VaultInterface>) -> Self {
		Self { implementation }
	}

	/// The vault's spender address for standing approvals.
	pub fn address(&self) -> Address {
		self.implementation.address()
	}

	/// Executes a swap against the addressed pool.
	pub async fn swap(
		&self,
		pool_id: B256,
		asset_in: Asset,
		asset_out: Asset,
		amount_in: U256,
		limit: U256,
		deadline: u64,
	) -> Result<U256, VaultError> {
		self.implementation
			.swap(pool_id, asset_in, asset_out, amount_in, limit, deadline)
			.await
	}

	/// Quotes a swap without touching vault state.
	pub async fn quote_swap(
		&self,
		pool_id: B256,
		asset_in: Asset,
		asset_out: Asset,
		amount_in: U256,
	) -> Result<U256, VaultError> {
		self.implementation
			.quote_swap(pool_id, asset_in, asset_out, amount_in)
			.await
	}

	/// Current reserves of the addressed pool.
	pub async fn reserves(&self, pool_id: B256) -> Result<(U256, U256), VaultError> {
		self.implementation.reserves(pool_id).await
	}
}
