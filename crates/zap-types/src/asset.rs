//! Asset identifiers for the zap router.
//!
//! An asset is either the chain's native currency or an ERC-20 style token
//! addressed by its contract. The native case is represented explicitly
//! rather than by a magic address, but the conventional sentinel address is
//! kept for wire formats that have no room for an enum.

use alloy_primitives::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Sentinel address conventionally used to denote the native currency in
/// wire formats that only carry token addresses.
pub const NATIVE_ASSET_SENTINEL: Address = Address::repeat_byte(0xee);

/// A fungible unit handled by the router.
///
/// Decimal precision is a property of the token itself and is looked up from
/// the pool configuration that references the asset, never stored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Asset {
	/// The chain's native currency.
	Native,
	/// An ERC-20 style token identified by its contract address.
	Erc20(Address),
}

impl Asset {
	/// Returns true for the native currency.
	pub const fn is_native(&self) -> bool {
		matches!(self, Asset::Native)
	}

	/// Maps an address to an asset, folding the sentinel back into `Native`.
	pub fn from_address(address: Address) -> Self {
		if address == NATIVE_ASSET_SENTINEL {
			Asset::Native
		} else {
			Asset::Erc20(address)
		}
	}

	/// The address form of this asset, using the sentinel for `Native`.
	pub fn address(&self) -> Address {
		match self {
			Asset::Native => NATIVE_ASSET_SENTINEL,
			Asset::Erc20(address) => *address,
		}
	}
}

impl From<Address> for Asset {
	fn from(address: Address) -> Self {
		Asset::from_address(address)
	}
}

impl fmt::Display for Asset {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Asset::Native => write!(f, "native"),
			Asset::Erc20(address) => write!(f, "{address}"),
		}
	}
}

/// Serializes as the sentinel-aware hex address so configuration files and
/// API payloads carry a single uniform representation.
impl Serialize for Asset {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		self.address().serialize(serializer)
	}
}

impl<'de> Deserialize<'de> for Asset {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let address = Address::deserialize(deserializer)?;
		Ok(Asset::from_address(address))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sentinel_round_trips_to_native() {
		let asset = Asset::from_address(NATIVE_ASSET_SENTINEL);
		assert!(asset.is_native());
		assert_eq!(asset.address(), NATIVE_ASSET_SENTINEL);
	}

	#[test]
	fn token_address_round_trips() {
		let address = Address::repeat_byte(0x11);
		let asset = Asset::from_address(address);
		assert_eq!(asset, Asset::Erc20(address));
		assert_eq!(asset.address(), address);
		assert!(!asset.is_native());
	}

	#[test]
	fn display_formats() {
		assert_eq!(Asset::Native.to_string(), "native");
		let address = Address::repeat_byte(0x22);
		assert!(Asset::Erc20(address).to_string().starts_with("0x"));
	}
}
