//! Pool leg adapter for the zap router.
//!
//! This module wraps one liquidity pool's deposit/withdraw primitives behind
//! a uniform contract: a basket of assets in exchange for the pool's LP
//! token, or LP tokens in exchange for exactly one basket asset. Basket size
//! and per-asset decimal precision are normalized here; callers always supply
//! amounts in each asset's own native precision and the adapter passes them
//! through without rescaling their meaning.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use zap_types::{ConfigSchema, ImplementationRegistry, PoolLegDescriptor, ZapError};

use alloy_primitives::{Address, U256};

/// Re-export implementations
pub mod implementations {
	pub mod stableswap;
}

/// Errors that can occur during pool leg operations.
#[derive(Debug, Error)]
pub enum PoolError {
	/// No pool implementation is registered for the requested address.
	#[error("No implementation available for pool {0}")]
	NoImplementationAvailable(Address),
	/// The supplied basket disagrees with the pool's configured basket.
	#[error("Basket mismatch: {0}")]
	BasketMismatch(String),
	/// A deposit or withdrawal carried no value.
	#[error("Empty basket: {0}")]
	EmptyBasket(String),
	/// The pool cannot cover the requested exchange.
	#[error("Insufficient liquidity: {0}")]
	InsufficientLiquidity(String),
	/// Checked arithmetic failed mid-computation.
	#[error("Arithmetic failure: {0}")]
	Math(String),
	/// The invariant iteration did not converge.
	#[error("Convergence failure: {0}")]
	NonConvergence(&'static str),
	/// The implementation's configuration table is unusable.
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
}

impl From<PoolError> for ZapError {
	fn from(error: PoolError) -> Self {
		match error {
			PoolError::BasketMismatch(message) | PoolError::EmptyBasket(message) => {
				ZapError::InvalidBasket(message)
			}
			other => ZapError::LegExecutionFailed(other.to_string()),
		}
	}
}

/// Trait defining the interface for one pool leg implementation.
///
/// Both state-changing operations are atomic with respect to the caller:
/// either the full exchange completes or the call errors with no state
/// change. The quote operations mirror the exact pricing math of their
/// state-changing counterparts, so a quote taken against unchanged pool
/// state equals the subsequent execution.
#[async_trait]
#[cfg_attr(feature = "testing", mockall::automock)]
pub trait PoolInterface: Send + Sync {
	/// Returns the configuration schema for this pool implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// The configured descriptor: pool address, basket order, LP token.
	fn descriptor(&self) -> &PoolLegDescriptor;

	/// Supplies a (possibly zero-padded) basket and receives LP tokens.
	async fn deposit(&self, amounts: &[U256]) -> Result<U256, PoolError>;

	/// Burns LP tokens and receives exactly one basket asset.
	async fn withdraw_single(&self, lp_amount: U256, index: usize) -> Result<U256, PoolError>;

	/// Side-effect-free mirror of `deposit`.
	async fn quote_deposit(&self, amounts: &[U256]) -> Result<U256, PoolError>;

	/// Side-effect-free mirror of `withdraw_single`.
	async fn quote_withdraw_single(
		&self,
		lp_amount: U256,
		index: usize,
	) -> Result<U256, PoolError>;

	/// Current basket reserves, in each asset's native precision.
	async fn reserves(&self) -> Vec<U256>;

	/// Outstanding LP token supply.
	async fn lp_supply(&self) -> U256;
}

/// Type alias for pool factory functions.
pub type PoolFactory = fn(&toml::Value) -> Result<Box<dyn PoolInterface>, PoolError>;

/// Registry trait for pool implementations.
pub trait PoolRegistry: ImplementationRegistry<Factory = PoolFactory> {}

/// Get all registered pool implementations.
pub fn get_all_implementations() -> Vec<(&'static str, PoolFactory)> {
	use implementations::stableswap;

	vec![(
		stableswap::Registry::NAME,
		stableswap::Registry::factory(),
	)]
}

/// Service that routes pool leg operations to the implementation registered
/// for each pool address.
pub struct PoolService {
	/// Map of pool addresses to their implementations.
	implementations: HashMap<Address, Arc<dyn PoolInterface>>,
}

impl PoolService {
	/// Creates a new PoolService over the given implementations.
	pub fn new(implementations: HashMap<Address, Arc<dyn PoolInterface>>) -> Self {
		Self { implementations }
	}

	fn implementation(&self, pool: &Address) -> Result<&Arc<dyn PoolInterface>, PoolError> {
		self.implementations
			.get(pool)
			.ok_or(PoolError::NoImplementationAvailable(*pool))
	}

	/// Checks a caller-supplied descriptor against the configured one.
	///
	/// The configured basket order is authoritative; a request that
	/// disagrees with it would misinterpret its own amount vector.
	fn check_descriptor(
		implementation: &Arc<dyn PoolInterface>,
		leg: &PoolLegDescriptor,
		amounts_len: usize,
	) -> Result<(), PoolError> {
		let configured = implementation.descriptor();
		if configured != leg {
			return Err(PoolError::BasketMismatch(format!(
				"descriptor for pool {} disagrees with configuration",
				leg.pool
			)));
		}
		if amounts_len != configured.basket.len() {
			return Err(PoolError::BasketMismatch(format!(
				"{amounts_len} amounts supplied for a basket of {}",
				configured.basket.len()
			)));
		}
		Ok(())
	}

	/// Deposits a basket into the pool named by the descriptor.
	pub async fn deposit(
		&self,
		leg: &PoolLegDescriptor,
		amounts: &[U256],
	) -> Result<U256, PoolError> {
		let implementation = self.implementation(&leg.pool)?;
		Self::check_descriptor(implementation, leg, amounts.len())?;
		implementation.deposit(amounts).await
	}

	/// Burns LP tokens against the pool named by the descriptor.
	pub async fn withdraw_single(
		&self,
		leg: &PoolLegDescriptor,
		lp_amount: U256,
		index: usize,
	) -> Result<U256, PoolError> {
		let implementation = self.implementation(&leg.pool)?;
		Self::check_descriptor(implementation, leg, leg.basket.len())?;
		implementation.withdraw_single(lp_amount, index).await
	}

	/// Quotes a basket deposit without touching pool state.
	pub async fn quote_deposit(
		&self,
		leg: &PoolLegDescriptor,
		amounts: &[U256],
	) -> Result<U256, PoolError> {
		let implementation = self.implementation(&leg.pool)?;
		Self::check_descriptor(implementation, leg, amounts.len())?;
		implementation.quote_deposit(amounts).await
	}

	/// Quotes a single-asset withdrawal without touching pool state.
	pub async fn quote_withdraw_single(
		&self,
		leg: &PoolLegDescriptor,
		lp_amount: U256,
		index: usize,
	) -> Result<U256, PoolError> {
		let implementation = self.implementation(&leg.pool)?;
		Self::check_descriptor(implementation, leg, leg.basket.len())?;
		implementation.quote_withdraw_single(lp_amount, index).await
	}

	/// Current reserves of the pool named by the descriptor.
	pub async fn reserves(&self, leg: &PoolLegDescriptor) -> Result<Vec<U256>, PoolError> {
		Ok(self.implementation(&leg.pool)?.reserves().await)
	}

	/// Outstanding LP supply of the pool named by the descriptor.
	pub async fn lp_supply(&self, leg: &PoolLegDescriptor) -> Result<U256, PoolError> {
		Ok(self.implementation(&leg.pool)?.lp_supply().await)
	}
}
