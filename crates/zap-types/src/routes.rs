//! Route shapes, leg descriptors, and per-call request structures.
//!
//! A route chains two or three leg operations: a basket deposit or
//! single-asset withdrawal against a liquidity pool, and a swap between the
//! pool's LP token and the principal token through a vault. Every request
//! value is built by the caller, validated, consumed within one atomic call,
//! and discarded.

use crate::{Asset, ZapError};
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest basket a pool leg accepts.
pub const MIN_BASKET_SIZE: usize = 2;
/// Largest basket a pool leg accepts.
pub const MAX_BASKET_SIZE: usize = 3;

/// The closed set of supported route shapes.
///
/// Each shape maps to a fixed, ordered list of leg operations; there is no
/// open-ended path-finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteKind {
	/// Basket deposit, then LP-to-principal swap.
	ZapIn,
	/// Principal-to-LP swap, then single-asset withdrawal.
	ZapOut,
	/// Secondary basket deposit merged into the primary basket, then zap-in.
	Swap3CrvZapIn,
	/// Zap-out into the secondary LP token, then single-asset withdrawal.
	ZapOutSwap3Crv,
}

impl fmt::Display for RouteKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			RouteKind::ZapIn => "zap_in",
			RouteKind::ZapOut => "zap_out",
			RouteKind::Swap3CrvZapIn => "swap3crv_and_zap_in",
			RouteKind::ZapOutSwap3Crv => "zap_out_and_swap3crv",
		};
		write!(f, "{name}")
	}
}

/// Describes one liquidity pool leg.
///
/// The basket order is fixed per pool and authoritative: amount vectors are
/// always interpreted against it, so it must come from configuration, never
/// be inferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolLegDescriptor {
	/// The pool's contract address.
	pub pool: Address,
	/// Ordered basket of assets the pool accepts, size 2 or 3.
	pub basket: Vec<Asset>,
	/// The pool's own liability token.
	pub lp_token: Asset,
}

impl PoolLegDescriptor {
	/// Checks the structural invariants of the descriptor itself.
	pub fn validate(&self) -> Result<(), ZapError> {
		if self.basket.len() < MIN_BASKET_SIZE || self.basket.len() > MAX_BASKET_SIZE {
			return Err(ZapError::InvalidBasket(format!(
				"basket size {} outside supported range {MIN_BASKET_SIZE}..={MAX_BASKET_SIZE}",
				self.basket.len()
			)));
		}
		Ok(())
	}

	/// Index of `asset` within the basket, if it is a member.
	pub fn position_of(&self, asset: &Asset) -> Option<usize> {
		self.basket.iter().position(|member| member == asset)
	}
}

/// Describes the vault leg between an LP token and the principal token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultLegDescriptor {
	/// Opaque 32-byte identifier of the vault pool.
	pub pool_id: B256,
	/// The pool leg's LP token, one side of the swap.
	pub lp_token: Asset,
	/// The yield-bearing principal token, the other side.
	pub principal_token: Asset,
}

/// Request for a two-leg basket-to-principal route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZapInRequest {
	/// The pool leg supplying the basket.
	pub pool_leg: PoolLegDescriptor,
	/// Amounts per basket member, same length and order as the basket.
	/// Zero entries are allowed; at least one entry must be non-zero.
	pub basket_amounts: Vec<U256>,
	/// The vault leg swapping LP token for principal token.
	pub vault_leg: VaultLegDescriptor,
	/// Minimum acceptable principal output.
	pub min_output: U256,
	/// Absolute unix timestamp after which the route must not execute.
	pub deadline: u64,
}

impl ZapInRequest {
	/// Validates basket shape before any external call is made.
	pub fn validate(&self) -> Result<(), ZapError> {
		self.pool_leg.validate()?;
		if self.basket_amounts.len() != self.pool_leg.basket.len() {
			return Err(ZapError::InvalidBasket(format!(
				"{} amounts supplied for a basket of {}",
				self.basket_amounts.len(),
				self.pool_leg.basket.len()
			)));
		}
		if self.basket_amounts.iter().all(|amount| amount.is_zero()) {
			return Err(ZapError::InvalidBasket(
				"all basket amounts are zero".to_string(),
			));
		}
		Ok(())
	}
}

/// Request for a two-leg principal-to-basket-asset route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZapOutRequest {
	/// The pool leg the withdrawal exits through.
	pub pool_leg: PoolLegDescriptor,
	/// The vault leg swapping principal token for LP token.
	pub vault_leg: VaultLegDescriptor,
	/// Principal amount supplied by the caller.
	pub principal_amount_in: U256,
	/// The basket asset to withdraw.
	pub output_asset: Asset,
	/// Index of `output_asset` within the pool basket.
	pub output_index: usize,
	/// Minimum acceptable output of `output_asset`.
	pub min_output: U256,
	/// Absolute unix timestamp after which the route must not execute.
	pub deadline: u64,
}

impl ZapOutRequest {
	/// Validates the withdrawal target before any external call is made.
	pub fn validate(&self) -> Result<(), ZapError> {
		self.pool_leg.validate()?;
		if self.principal_amount_in.is_zero() {
			return Err(ZapError::InvalidBasket(
				"principal amount is zero".to_string(),
			));
		}
		match self.pool_leg.basket.get(self.output_index) {
			Some(member) if *member == self.output_asset => Ok(()),
			Some(member) => Err(ZapError::InvalidBasket(format!(
				"output asset {} does not match basket member {member} at index {}",
				self.output_asset, self.output_index
			))),
			None => Err(ZapError::InvalidBasket(format!(
				"output index {} outside basket of {}",
				self.output_index,
				self.pool_leg.basket.len()
			))),
		}
	}
}

/// Extra basket-composition leg executed before a zap-in.
///
/// Converts a secondary basket into the secondary pool's LP token, which must
/// itself be a member of the primary basket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketJoinLeg {
	/// The secondary pool leg.
	pub pool_leg: PoolLegDescriptor,
	/// Amounts per secondary basket member. All-zero is allowed and skips
	/// the leg, degrading the route to a plain zap-in.
	pub basket_amounts: Vec<U256>,
}

impl BasketJoinLeg {
	/// Validates the join leg against the primary basket and returns the
	/// primary index its LP token merges into.
	pub fn validate_against(&self, primary: &PoolLegDescriptor) -> Result<usize, ZapError> {
		self.pool_leg.validate()?;
		if self.basket_amounts.len() != self.pool_leg.basket.len() {
			return Err(ZapError::InvalidBasket(format!(
				"{} amounts supplied for a secondary basket of {}",
				self.basket_amounts.len(),
				self.pool_leg.basket.len()
			)));
		}
		primary.position_of(&self.pool_leg.lp_token).ok_or_else(|| {
			ZapError::InvalidBasket(format!(
				"secondary LP token {} is not a member of the primary basket",
				self.pool_leg.lp_token
			))
		})
	}

	/// True when every secondary amount is zero and the leg can be skipped.
	pub fn is_empty(&self) -> bool {
		self.basket_amounts.iter().all(|amount| amount.is_zero())
	}
}

/// Extra basket-decomposition leg executed after a zap-out.
///
/// Converts the zap-out's output asset, which must be the secondary pool's
/// LP token, into one member of the secondary basket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketExitLeg {
	/// The secondary pool leg.
	pub pool_leg: PoolLegDescriptor,
	/// Index of the secondary basket member to deliver.
	pub output_index: usize,
}

impl BasketExitLeg {
	/// Validates the exit leg against the zap-out it extends.
	pub fn validate_against(&self, request: &ZapOutRequest) -> Result<(), ZapError> {
		self.pool_leg.validate()?;
		if request.output_asset != self.pool_leg.lp_token {
			return Err(ZapError::InvalidBasket(format!(
				"zap-out output {} is not the secondary pool's LP token {}",
				request.output_asset, self.pool_leg.lp_token
			)));
		}
		if self.output_index >= self.pool_leg.basket.len() {
			return Err(ZapError::InvalidBasket(format!(
				"exit index {} outside secondary basket of {}",
				self.output_index,
				self.pool_leg.basket.len()
			)));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn descriptor(basket: Vec<Asset>) -> PoolLegDescriptor {
		PoolLegDescriptor {
			pool: Address::repeat_byte(0x01),
			basket,
			lp_token: Asset::Erc20(Address::repeat_byte(0x02)),
		}
	}

	fn two_assets() -> Vec<Asset> {
		vec![
			Asset::Erc20(Address::repeat_byte(0x0a)),
			Asset::Erc20(Address::repeat_byte(0x0b)),
		]
	}

	fn vault_leg() -> VaultLegDescriptor {
		VaultLegDescriptor {
			pool_id: B256::repeat_byte(0xab),
			lp_token: Asset::Erc20(Address::repeat_byte(0x02)),
			principal_token: Asset::Erc20(Address::repeat_byte(0x03)),
		}
	}

	#[test]
	fn zap_in_rejects_all_zero_basket() {
		let request = ZapInRequest {
			pool_leg: descriptor(two_assets()),
			basket_amounts: vec![U256::ZERO, U256::ZERO],
			vault_leg: vault_leg(),
			min_output: U256::ZERO,
			deadline: 1,
		};
		assert!(matches!(
			request.validate(),
			Err(ZapError::InvalidBasket(_))
		));
	}

	#[test]
	fn zap_in_rejects_length_mismatch() {
		let request = ZapInRequest {
			pool_leg: descriptor(two_assets()),
			basket_amounts: vec![U256::from(1)],
			vault_leg: vault_leg(),
			min_output: U256::ZERO,
			deadline: 1,
		};
		assert!(matches!(
			request.validate(),
			Err(ZapError::InvalidBasket(_))
		));
	}

	#[test]
	fn zap_in_accepts_partial_basket() {
		let request = ZapInRequest {
			pool_leg: descriptor(two_assets()),
			basket_amounts: vec![U256::from(5), U256::ZERO],
			vault_leg: vault_leg(),
			min_output: U256::ZERO,
			deadline: 1,
		};
		assert!(request.validate().is_ok());
	}

	#[test]
	fn basket_size_bounds_enforced() {
		let single = descriptor(vec![Asset::Native]);
		assert!(single.validate().is_err());
		let four = descriptor(vec![Asset::Native; 4]);
		assert!(four.validate().is_err());
	}

	#[test]
	fn zap_out_checks_index_and_asset() {
		let basket = two_assets();
		let mut request = ZapOutRequest {
			pool_leg: descriptor(basket.clone()),
			vault_leg: vault_leg(),
			principal_amount_in: U256::from(100),
			output_asset: basket[1],
			output_index: 1,
			min_output: U256::ZERO,
			deadline: 1,
		};
		assert!(request.validate().is_ok());

		request.output_index = 0;
		assert!(request.validate().is_err());

		request.output_index = 7;
		assert!(request.validate().is_err());
	}

	#[test]
	fn join_leg_resolves_merge_index() {
		let primary = descriptor(two_assets());
		let secondary_lp = primary.basket[1];
		let join = BasketJoinLeg {
			pool_leg: PoolLegDescriptor {
				pool: Address::repeat_byte(0x05),
				basket: vec![
					Asset::Erc20(Address::repeat_byte(0x21)),
					Asset::Erc20(Address::repeat_byte(0x22)),
					Asset::Erc20(Address::repeat_byte(0x23)),
				],
				lp_token: secondary_lp,
			},
			basket_amounts: vec![U256::from(1), U256::ZERO, U256::ZERO],
		};
		assert_eq!(join.validate_against(&primary).unwrap(), 1);
	}

	#[test]
	fn join_leg_rejects_foreign_lp_token() {
		let primary = descriptor(two_assets());
		let join = BasketJoinLeg {
			pool_leg: PoolLegDescriptor {
				pool: Address::repeat_byte(0x05),
				basket: two_assets(),
				lp_token: Asset::Erc20(Address::repeat_byte(0x99)),
			},
			basket_amounts: vec![U256::from(1), U256::ZERO],
		};
		assert!(join.validate_against(&primary).is_err());
	}
}
