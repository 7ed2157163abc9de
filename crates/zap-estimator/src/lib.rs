//! Quotation engine for the zap router.
//!
//! Produces expected output amounts for every supported route shape without
//! committing funds. Each estimate composes the legs' own side-effect-free
//! quote entry points in exactly the order the live route executes them, so
//! the estimator and the execution path share one pricing model by
//! construction: a quote taken against unchanged pool state equals the
//! subsequent delivery. The orchestrator pre-flights every route through
//! these same quotes before the first leg runs.

use alloy_primitives::U256;
use std::sync::Arc;
use thiserror::Error;
use zap_pool::{PoolError, PoolService};
use zap_types::{BasketExitLeg, BasketJoinLeg, ZapError, ZapInRequest, ZapOutRequest};
use zap_vault::{VaultError, VaultService};

/// Errors that can occur while producing a quote.
///
/// An unusable request is always an error, never a silent zero: a zero
/// estimate would flow into slippage bounds and disable them.
#[derive(Debug, Error)]
pub enum EstimateError {
	/// The request cannot be quoted as posed.
	#[error("Estimation invalid: {0}")]
	InvalidRequest(String),
	/// The pool leg's quote failed.
	#[error("Pool quote failed: {0}")]
	Pool(#[from] PoolError),
	/// The vault leg's quote failed.
	#[error("Vault quote failed: {0}")]
	Vault(#[from] VaultError),
}

impl From<EstimateError> for ZapError {
	fn from(error: EstimateError) -> Self {
		match error {
			EstimateError::InvalidRequest(message) => ZapError::InvalidBasket(message),
			EstimateError::Pool(inner) => inner.into(),
			EstimateError::Vault(inner) => inner.into(),
		}
	}
}

/// Leg-by-leg quote for a zap-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZapInQuote {
	/// LP tokens the basket deposit mints.
	pub lp_amount: U256,
	/// Principal tokens the vault swap delivers.
	pub amount_out: U256,
}

/// Leg-by-leg quote for a zap-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZapOutQuote {
	/// LP tokens the vault swap delivers; also the intermediate floor the
	/// live vault leg is held to.
	pub lp_amount: U256,
	/// Basket asset the single-asset withdrawal delivers.
	pub amount_out: U256,
}

/// Service that quotes routes against current pool and vault state.
pub struct Estimator {
	/// Pool legs, addressed by pool address.
	pools: Arc<PoolService>,
	/// Vault legs, addressed by 32-byte pool id.
	vault: Arc<VaultService>,
}

impl Estimator {
	/// Creates a new Estimator over the given leg services.
	pub fn new(pools: Arc<PoolService>, vault: Arc<VaultService>) -> Self {
		Self { pools, vault }
	}

	/// Expected principal output of a zap-in executed against current state.
	pub async fn estimate_zap_in(&self, request: &ZapInRequest) -> Result<U256, EstimateError> {
		request
			.validate()
			.map_err(|e| EstimateError::InvalidRequest(e.to_string()))?;
		Ok(self
			.quote_zap_in_route(request, &request.basket_amounts)
			.await?
			.amount_out)
	}

	/// Expected basket-asset output of a zap-out executed against current
	/// state.
	pub async fn estimate_zap_out(&self, request: &ZapOutRequest) -> Result<U256, EstimateError> {
		request
			.validate()
			.map_err(|e| EstimateError::InvalidRequest(e.to_string()))?;
		Ok(self.quote_zap_out_route(request).await?.amount_out)
	}

	/// Expected principal output of a three-hop zap-in: the secondary basket
	/// is first quoted into the primary basket member it composes.
	pub async fn estimate_swap3crv_and_zap_in(
		&self,
		request: &ZapInRequest,
		join: &BasketJoinLeg,
	) -> Result<U256, EstimateError> {
		let merged = self.merge_join_leg(request, join).await?;
		Ok(self.quote_zap_in_route(request, &merged).await?.amount_out)
	}

	/// Expected final output of a three-hop zap-out: the zap-out's output is
	/// quoted onward through the exit leg's single-asset withdrawal.
	pub async fn estimate_zap_out_and_swap3crv(
		&self,
		request: &ZapOutRequest,
		exit: &BasketExitLeg,
	) -> Result<U256, EstimateError> {
		request
			.validate()
			.map_err(|e| EstimateError::InvalidRequest(e.to_string()))?;
		exit.validate_against(request)
			.map_err(|e| EstimateError::InvalidRequest(e.to_string()))?;

		let two_hop = self.quote_zap_out_route(request).await?;
		let amount_out = self
			.pools
			.quote_withdraw_single(&exit.pool_leg, two_hop.amount_out, exit.output_index)
			.await?;
		tracing::debug!(intermediate = %two_hop.amount_out, %amount_out, "three-hop zap-out quoted");
		Ok(amount_out)
	}

	/// Quotes both legs of a zap-in over an explicit amount vector.
	pub async fn quote_zap_in_route(
		&self,
		request: &ZapInRequest,
		amounts: &[U256],
	) -> Result<ZapInQuote, EstimateError> {
		let lp_amount = self.pools.quote_deposit(&request.pool_leg, amounts).await?;
		let amount_out = self
			.vault
			.quote_swap(
				request.vault_leg.pool_id,
				request.vault_leg.lp_token,
				request.vault_leg.principal_token,
				lp_amount,
			)
			.await?;
		tracing::debug!(%lp_amount, %amount_out, "zap-in quoted");
		Ok(ZapInQuote {
			lp_amount,
			amount_out,
		})
	}

	/// Quotes both legs of a zap-out.
	pub async fn quote_zap_out_route(
		&self,
		request: &ZapOutRequest,
	) -> Result<ZapOutQuote, EstimateError> {
		let lp_amount = self
			.vault
			.quote_swap(
				request.vault_leg.pool_id,
				request.vault_leg.principal_token,
				request.vault_leg.lp_token,
				request.principal_amount_in,
			)
			.await?;
		let amount_out = self
			.pools
			.quote_withdraw_single(&request.pool_leg, lp_amount, request.output_index)
			.await?;
		tracing::debug!(%lp_amount, %amount_out, "zap-out quoted");
		Ok(ZapOutQuote {
			lp_amount,
			amount_out,
		})
	}

	/// Resolves a join leg into the primary basket's amount vector.
	///
	/// An all-zero secondary basket skips the extra leg entirely, mirroring
	/// the execution path's degradation to a plain zap-in. A route with no
	/// value in either basket is rejected here, before any quote is taken.
	pub async fn merge_join_leg(
		&self,
		request: &ZapInRequest,
		join: &BasketJoinLeg,
	) -> Result<Vec<U256>, EstimateError> {
		let merge_index = join
			.validate_against(&request.pool_leg)
			.map_err(|e| EstimateError::InvalidRequest(e.to_string()))?;
		if request.basket_amounts.len() != request.pool_leg.basket.len() {
			return Err(EstimateError::InvalidRequest(format!(
				"{} amounts supplied for a basket of {}",
				request.basket_amounts.len(),
				request.pool_leg.basket.len()
			)));
		}
		let primary_empty = request.basket_amounts.iter().all(|amount| amount.is_zero());
		if primary_empty && join.is_empty() {
			return Err(EstimateError::InvalidRequest(
				"no value in either basket".to_string(),
			));
		}

		let mut merged = request.basket_amounts.clone();
		if !join.is_empty() {
			let minted = self
				.pools
				.quote_deposit(&join.pool_leg, &join.basket_amounts)
				.await?;
			merged[merge_index] = merged[merge_index].checked_add(minted).ok_or_else(|| {
				EstimateError::InvalidRequest("merged basket amount overflow".to_string())
			})?;
		}
		Ok(merged)
	}
}
