//! Permit authorization types.
//!
//! A permit is a signed off-band authorization that grants an allowance
//! without a separate approval transaction. Verification of the signature
//! against the token's permit scheme is the external permit collaborator's
//! job; these types only carry the data and the resulting capability.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// The permit scheme a token implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermitKind {
	/// Standard EIP-2612 `permit(owner, spender, value, deadline, v, r, s)`.
	Eip2612,
	/// DAI-style `permit` keyed on an `allowed` boolean and a nonce rather
	/// than a value.
	AllowedStyle,
}

/// A signed one-shot authorization supplied alongside a route request.
///
/// The owner is implicit: it is always the caller of the route. Replay is
/// rejected by the external permit verifier per (asset, nonce), not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitAuthorization {
	/// The token the permit is drawn on.
	pub asset: Address,
	/// The spender being authorized, normally the router itself.
	pub spender: Address,
	/// Authorized amount. `U256::MAX` is the conventional unbounded grant.
	pub value: U256,
	/// Unix timestamp after which the permit is no longer valid.
	pub expiration: u64,
	/// Which permit scheme the signature targets.
	pub kind: PermitKind,
	/// Recovery id of the signature.
	pub v: u8,
	/// First 32 bytes of the signature.
	pub r: B256,
	/// Second 32 bytes of the signature.
	pub s: B256,
}

/// Capability produced by a verified permit.
///
/// The orchestrator installs the grant into its allowance book before the
/// route proceeds. The grant carries no value transfer by itself, so it is
/// not unwound when a later leg fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitGrant {
	/// The account that signed the permit.
	pub owner: Address,
	/// The token the allowance is drawn on.
	pub asset: Address,
	/// The authorized spender.
	pub spender: Address,
	/// The allowance value to install.
	pub value: U256,
}
