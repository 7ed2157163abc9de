//! Permit adapter for the zap router.
//!
//! Converts an off-band-signed authorization into an allowance usable within
//! the same atomic call, eliminating the separate approval step. This leg is
//! optional per request: callers may instead rely on a pre-existing
//! allowance. A verified permit yields a `PermitGrant` capability that the
//! orchestrator installs into its allowance book; the grant carries no value
//! transfer, so it is never unwound by a later failure.

use alloy_primitives::Address;
use async_trait::async_trait;
use thiserror::Error;
use zap_types::{ConfigSchema, ImplementationRegistry, PermitAuthorization, PermitGrant, ZapError};

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

/// Errors that can occur during permit verification.
#[derive(Debug, Error)]
pub enum PermitError {
	/// The permit's expiration has passed.
	#[error("Permit expired: expiration {expiration}, now {now}")]
	Expired { expiration: u64, now: u64 },
	/// The signature is malformed or fails the scheme's checks.
	#[error("Invalid signature: {0}")]
	InvalidSignature(String),
	/// The implementation's configuration table is unusable.
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
}

impl From<PermitError> for ZapError {
	fn from(error: PermitError) -> Self {
		ZapError::AuthorizationInvalid(error.to_string())
	}
}

/// Trait defining the interface for permit verification implementations.
///
/// Verification is synchronous within the route call: it either yields a
/// grant or errors, aborting the route before any leg executes. Replay
/// protection per (asset, nonce) belongs to the external permit scheme.
#[async_trait]
#[cfg_attr(feature = "testing", mockall::automock)]
pub trait PermitInterface: Send + Sync {
	/// Returns the configuration schema for this permit implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Verifies an authorization signed by `owner` at ambient time `now`.
	async fn verify(
		&self,
		owner: Address,
		authorization: &PermitAuthorization,
		now: u64,
	) -> Result<PermitGrant, PermitError>;
}

/// Type alias for permit factory functions.
pub type PermitFactory = fn(&toml::Value) -> Result<Box<dyn PermitInterface>, PermitError>;

/// Registry trait for permit implementations.
pub trait PermitRegistry: ImplementationRegistry<Factory = PermitFactory> {}

/// Get all registered permit implementations.
pub fn get_all_implementations() -> Vec<(&'static str, PermitFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Service that fronts the configured permit implementation.
pub struct PermitService {
	/// The permit implementation verifications route through.
	implementation: Box<dyn PermitInterface>,
}

impl PermitService {
	/// Creates a new PermitService over the given implementation.
	pub fn new(implementation: Box<dyn PermitInterface>) -> Self {
		Self { implementation }
	}

	/// Verifies an authorization and returns the allowance grant it carries.
	pub async fn verify(
		&self,
		owner: Address,
		authorization: &PermitAuthorization,
		now: u64,
	) -> Result<PermitGrant, PermitError> {
		self.implementation.verify(owner, authorization, now).await
	}
}
