//! Local permit verification for development and testing.
//!
//! Checks the authorization's expiration and signature well-formedness:
//! non-zero `r`/`s`, canonical recovery id, and a low-half-order `s`. Full
//! ECDSA recovery against the token's domain separator is the external
//! permit scheme's job and is out of scope here.

use crate::{PermitError, PermitFactory, PermitInterface, PermitRegistry};
use alloy_primitives::{b256, Address, B256, U256};
use async_trait::async_trait;
use zap_types::{
	ConfigSchema, ImplementationRegistry, PermitAuthorization, PermitGrant, PermitKind, Schema,
	ValidationError,
};

/// Half of the secp256k1 group order; any canonical signature keeps `s` at
/// or below this bound.
const SECP256K1_HALF_ORDER: B256 =
	b256!("7fffffffffffffffffffffffffffffff5d576e7357a4501ddfe92f46681b20a0");

/// Permit verifier enforcing expiration and signature shape.
pub struct LocalPermitVerifier;

impl LocalPermitVerifier {
	/// Creates a verifier from its configuration table.
	pub fn new(_config: &toml::Value) -> Result<Self, PermitError> {
		Ok(Self)
	}
}

#[async_trait]
impl PermitInterface for LocalPermitVerifier {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalPermitSchema)
	}

	async fn verify(
		&self,
		owner: Address,
		authorization: &PermitAuthorization,
		now: u64,
	) -> Result<PermitGrant, PermitError> {
		if authorization.expiration < now {
			return Err(PermitError::Expired {
				expiration: authorization.expiration,
				now,
			});
		}
		if authorization.r == B256::ZERO || authorization.s == B256::ZERO {
			return Err(PermitError::InvalidSignature(
				"zero signature component".to_string(),
			));
		}
		if authorization.v != 27 && authorization.v != 28 {
			return Err(PermitError::InvalidSignature(format!(
				"non-canonical recovery id {}",
				authorization.v
			)));
		}
		if authorization.s > SECP256K1_HALF_ORDER {
			return Err(PermitError::InvalidSignature(
				"signature s above the half order".to_string(),
			));
		}

		// Allowed-style permits carry a boolean, not a value; a valid one
		// always installs the unbounded allowance.
		let value = match authorization.kind {
			PermitKind::Eip2612 => authorization.value,
			PermitKind::AllowedStyle => U256::MAX,
		};

		tracing::debug!(
			%owner,
			asset = %authorization.asset,
			spender = %authorization.spender,
			"permit verified"
		);
		Ok(PermitGrant {
			owner,
			asset: authorization.asset,
			spender: authorization.spender,
			value,
		})
	}
}

/// Configuration schema for the local permit verifier.
pub struct LocalPermitSchema;

impl ConfigSchema for LocalPermitSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// No knobs yet; the table must simply be a table.
		Schema::default().validate(config)
	}
}

/// Registry for the local permit verifier.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = PermitFactory;

	fn factory() -> Self::Factory {
		create_verifier
	}
}

impl PermitRegistry for Registry {}

/// Factory function for creating the local permit verifier.
pub fn create_verifier(config: &toml::Value) -> Result<Box<dyn PermitInterface>, PermitError> {
	Ok(Box::new(LocalPermitVerifier::new(config)?))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn authorization(expiration: u64) -> PermitAuthorization {
		PermitAuthorization {
			asset: Address::repeat_byte(0x0a),
			spender: Address::repeat_byte(0x0f),
			value: U256::from(5000),
			expiration,
			kind: PermitKind::Eip2612,
			v: 27,
			r: B256::repeat_byte(0x11),
			s: b256!("1111111111111111111111111111111111111111111111111111111111111111"),
		}
	}

	#[tokio::test]
	async fn valid_permit_yields_grant() {
		let verifier = LocalPermitVerifier::new(&toml::Value::Table(Default::default())).unwrap();
		let owner = Address::repeat_byte(0xaa);
		let grant = verifier.verify(owner, &authorization(2000), 1000).await.unwrap();
		assert_eq!(grant.owner, owner);
		assert_eq!(grant.value, U256::from(5000));
	}

	#[tokio::test]
	async fn expired_permit_rejected() {
		let verifier = LocalPermitVerifier::new(&toml::Value::Table(Default::default())).unwrap();
		let result = verifier
			.verify(Address::repeat_byte(0xaa), &authorization(500), 1000)
			.await;
		assert!(matches!(result, Err(PermitError::Expired { .. })));
	}

	#[tokio::test]
	async fn zero_signature_rejected() {
		let verifier = LocalPermitVerifier::new(&toml::Value::Table(Default::default())).unwrap();
		let mut auth = authorization(2000);
		auth.r = B256::ZERO;
		let result = verifier.verify(Address::repeat_byte(0xaa), &auth, 1000).await;
		assert!(matches!(result, Err(PermitError::InvalidSignature(_))));
	}

	#[tokio::test]
	async fn high_s_rejected() {
		let verifier = LocalPermitVerifier::new(&toml::Value::Table(Default::default())).unwrap();
		let mut auth = authorization(2000);
		auth.s = B256::repeat_byte(0xff);
		let result = verifier.verify(Address::repeat_byte(0xaa), &auth, 1000).await;
		assert!(matches!(result, Err(PermitError::InvalidSignature(_))));
	}

	#[tokio::test]
	async fn allowed_style_installs_unbounded_grant() {
		let verifier = LocalPermitVerifier::new(&toml::Value::Table(Default::default())).unwrap();
		let mut auth = authorization(2000);
		auth.kind = PermitKind::AllowedStyle;
		let grant = verifier
			.verify(Address::repeat_byte(0xaa), &auth, 1000)
			.await
			.unwrap();
		assert_eq!(grant.value, U256::MAX);
	}
}
