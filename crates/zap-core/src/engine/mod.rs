//! Zap orchestrator engine.
//!
//! Composes the leg services into the four supported route shapes and
//! enforces the transactional contract of every call: deadline first, basket
//! validation before any external call, permits applied as an optional
//! pre-step, a full pre-flight quote against the caller's minimum, and only
//! then the legs, in order, under the route lock. Any failure aborts the
//! whole call; there is no retry and no partial commit. The one effect that
//! survives a failed route is a permit's allowance grant, which carries no
//! value transfer by itself.

pub mod approvals;

use self::approvals::ApprovalManager;
use alloy_primitives::{Address, U256};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;
use zap_estimator::Estimator;
use zap_permit::PermitService;
use zap_pool::PoolService;
use zap_types::{
	current_timestamp, Asset, BasketExitLeg, BasketJoinLeg, PermitAuthorization, RouteKind,
	ZapError, ZapInRequest, ZapOutRequest,
};
use zap_vault::VaultService;

/// Multi-hop asset-conversion router.
///
/// One instance serves every route. Routes execute serially under an
/// internal lock: each call is a single all-or-nothing unit of work and no
/// partial result of one call is observable to another mid-flight.
pub struct ZapRouter {
	/// The router's own identity: spender of caller allowances and owner of
	/// the standing approvals toward pools and the vault.
	address: Address,
	/// Pool leg service, addressed by pool address.
	pools: Arc<PoolService>,
	/// Vault leg service, addressed by 32-byte pool id.
	vault: Arc<VaultService>,
	/// Permit verification service.
	permits: Arc<PermitService>,
	/// Quotation engine shared with callers.
	estimator: Arc<Estimator>,
	/// Process-wide allowance registry.
	approvals: Arc<ApprovalManager>,
	/// Serializes routes into all-or-nothing units.
	route_lock: Mutex<()>,
}

impl ZapRouter {
	/// Creates a router over the given services.
	pub fn new(
		address: Address,
		pools: Arc<PoolService>,
		vault: Arc<VaultService>,
		permits: Arc<PermitService>,
		approvals: Arc<ApprovalManager>,
	) -> Self {
		let estimator = Arc::new(Estimator::new(pools.clone(), vault.clone()));
		Self {
			address,
			pools,
			vault,
			permits,
			estimator,
			approvals,
			route_lock: Mutex::new(()),
		}
	}

	/// The router's own address.
	pub fn address(&self) -> Address {
		self.address
	}

	/// The quotation engine, for read-only estimates ahead of a route.
	pub fn estimator(&self) -> Arc<Estimator> {
		self.estimator.clone()
	}

	/// The allowance registry.
	pub fn approvals(&self) -> Arc<ApprovalManager> {
		self.approvals.clone()
	}

	/// Batch allowance initialization for the router's standing approvals.
	///
	/// Runs once during setup, before any route is accepted; it is not part
	/// of the routing hot path and a failure here is fatal to setup.
	pub async fn set_approvals_for(
		&self,
		assets: &[Address],
		spenders: &[Address],
		amounts: &[U256],
	) -> Result<(), approvals::ApprovalError> {
		self.approvals
			.set_approvals_for(self.address, assets, spenders, amounts)
			.await
	}

	/// Expected principal output of a zap-in against current state.
	pub async fn estimate_zap_in(
		&self,
		request: &ZapInRequest,
	) -> Result<U256, zap_estimator::EstimateError> {
		self.estimator.estimate_zap_in(request).await
	}

	/// Expected basket-asset output of a zap-out against current state.
	pub async fn estimate_zap_out(
		&self,
		request: &ZapOutRequest,
	) -> Result<U256, zap_estimator::EstimateError> {
		self.estimator.estimate_zap_out(request).await
	}

	/// Expected principal output of a three-hop zap-in against current state.
	pub async fn estimate_swap3crv_and_zap_in(
		&self,
		request: &ZapInRequest,
		join: &BasketJoinLeg,
	) -> Result<U256, zap_estimator::EstimateError> {
		self.estimator.estimate_swap3crv_and_zap_in(request, join).await
	}

	/// Expected final output of a three-hop zap-out against current state.
	pub async fn estimate_zap_out_and_swap3crv(
		&self,
		request: &ZapOutRequest,
		exit: &BasketExitLeg,
	) -> Result<U256, zap_estimator::EstimateError> {
		self.estimator
			.estimate_zap_out_and_swap3crv(request, exit)
			.await
	}

	/// Converts a basket into the principal token through two legs.
	#[instrument(skip_all, fields(route = %RouteKind::ZapIn, caller = %caller))]
	pub async fn zap_in(
		&self,
		caller: Address,
		request: ZapInRequest,
		permits: &[PermitAuthorization],
	) -> Result<U256, ZapError> {
		let now = check_deadline(request.deadline)?;
		request.validate()?;

		let _route = self.route_lock.lock().await;
		self.apply_permits(caller, permits, now).await?;

		let pulls = basket_pulls(&request.pool_leg.basket, &request.basket_amounts);
		self.check_caller_allowances(caller, &pulls).await?;

		let quote = self
			.estimator
			.quote_zap_in_route(&request, &request.basket_amounts)
			.await?;
		if quote.amount_out < request.min_output {
			return Err(ZapError::SlippageExceeded {
				minimum: request.min_output,
				actual: quote.amount_out,
			});
		}

		for (asset, amount) in &pulls {
			self.ensure_standing(*asset, request.pool_leg.pool, *amount)
				.await?;
		}
		self.ensure_standing(
			request.vault_leg.lp_token,
			self.vault.address(),
			quote.lp_amount,
		)
		.await?;

		let lp_amount = self
			.pools
			.deposit(&request.pool_leg, &request.basket_amounts)
			.await?;
		let amount_out = self
			.vault
			.swap(
				request.vault_leg.pool_id,
				request.vault_leg.lp_token,
				request.vault_leg.principal_token,
				lp_amount,
				request.min_output,
				request.deadline,
			)
			.await?;
		self.settle(caller, &pulls, request.min_output, amount_out)
			.await
	}

	/// Converts the principal token into one basket asset through two legs.
	#[instrument(skip_all, fields(route = %RouteKind::ZapOut, caller = %caller))]
	pub async fn zap_out(
		&self,
		caller: Address,
		request: ZapOutRequest,
		permits: &[PermitAuthorization],
	) -> Result<U256, ZapError> {
		let now = check_deadline(request.deadline)?;
		request.validate()?;

		let _route = self.route_lock.lock().await;
		self.apply_permits(caller, permits, now).await?;

		let pulls = vec![(
			request.vault_leg.principal_token,
			request.principal_amount_in,
		)];
		self.check_caller_allowances(caller, &pulls).await?;

		let quote = self.estimator.quote_zap_out_route(&request).await?;
		if quote.amount_out < request.min_output {
			return Err(ZapError::SlippageExceeded {
				minimum: request.min_output,
				actual: quote.amount_out,
			});
		}

		self.ensure_standing(
			request.vault_leg.principal_token,
			self.vault.address(),
			request.principal_amount_in,
		)
		.await?;

		// The quoted LP amount doubles as the intermediate floor, so the
		// vault leg itself aborts if state shifted under the quote.
		let lp_amount = self
			.vault
			.swap(
				request.vault_leg.pool_id,
				request.vault_leg.principal_token,
				request.vault_leg.lp_token,
				request.principal_amount_in,
				quote.lp_amount,
				request.deadline,
			)
			.await?;
		let amount_out = self
			.pools
			.withdraw_single(&request.pool_leg, lp_amount, request.output_index)
			.await?;
		self.settle(caller, &pulls, request.min_output, amount_out)
			.await
	}

	/// Converts a secondary basket into a primary basket member, then
	/// proceeds as a zap-in.
	#[instrument(skip_all, fields(route = %RouteKind::Swap3CrvZapIn, caller = %caller))]
	pub async fn swap3crv_and_zap_in(
		&self,
		caller: Address,
		request: ZapInRequest,
		join: BasketJoinLeg,
		permits: &[PermitAuthorization],
	) -> Result<U256, ZapError> {
		let now = check_deadline(request.deadline)?;
		request.pool_leg.validate()?;
		if request.basket_amounts.len() != request.pool_leg.basket.len() {
			return Err(ZapError::InvalidBasket(format!(
				"{} amounts supplied for a basket of {}",
				request.basket_amounts.len(),
				request.pool_leg.basket.len()
			)));
		}
		let merge_index = join.validate_against(&request.pool_leg)?;

		let _route = self.route_lock.lock().await;
		self.apply_permits(caller, permits, now).await?;

		let mut pulls = basket_pulls(&request.pool_leg.basket, &request.basket_amounts);
		pulls.extend(basket_pulls(
			&join.pool_leg.basket,
			&join.basket_amounts,
		));
		self.check_caller_allowances(caller, &pulls).await?;

		// Pre-flight the merged route; this also rejects a call with no
		// value in either basket.
		let merged = self.estimator.merge_join_leg(&request, &join).await?;
		let quote = self
			.estimator
			.quote_zap_in_route(&request, &merged)
			.await?;
		if quote.amount_out < request.min_output {
			return Err(ZapError::SlippageExceeded {
				minimum: request.min_output,
				actual: quote.amount_out,
			});
		}

		for (asset, amount) in basket_pulls(&join.pool_leg.basket, &join.basket_amounts) {
			self.ensure_standing(asset, join.pool_leg.pool, amount).await?;
		}
		for (index, amount) in merged.iter().enumerate() {
			self.ensure_standing(
				request.pool_leg.basket[index],
				request.pool_leg.pool,
				*amount,
			)
			.await?;
		}
		self.ensure_standing(
			request.vault_leg.lp_token,
			self.vault.address(),
			quote.lp_amount,
		)
		.await?;

		let join_minted = if join.is_empty() {
			U256::ZERO
		} else {
			self.pools
				.deposit(&join.pool_leg, &join.basket_amounts)
				.await?
		};
		let mut amounts = request.basket_amounts.clone();
		amounts[merge_index] =
			amounts[merge_index]
				.checked_add(join_minted)
				.ok_or_else(|| {
					ZapError::InvalidBasket("merged basket amount overflow".to_string())
				})?;

		let lp_amount = self.pools.deposit(&request.pool_leg, &amounts).await?;
		let amount_out = self
			.vault
			.swap(
				request.vault_leg.pool_id,
				request.vault_leg.lp_token,
				request.vault_leg.principal_token,
				lp_amount,
				request.min_output,
				request.deadline,
			)
			.await?;
		self.settle(caller, &pulls, request.min_output, amount_out)
			.await
	}

	/// Proceeds as a zap-out into the secondary pool's LP token, then
	/// decomposes it into one secondary basket member.
	///
	/// The caller's minimum binds the final amount only.
	#[instrument(skip_all, fields(route = %RouteKind::ZapOutSwap3Crv, caller = %caller))]
	pub async fn zap_out_and_swap3crv(
		&self,
		caller: Address,
		request: ZapOutRequest,
		exit: BasketExitLeg,
		permits: &[PermitAuthorization],
	) -> Result<U256, ZapError> {
		let now = check_deadline(request.deadline)?;
		request.validate()?;
		exit.validate_against(&request)?;

		let _route = self.route_lock.lock().await;
		self.apply_permits(caller, permits, now).await?;

		let pulls = vec![(
			request.vault_leg.principal_token,
			request.principal_amount_in,
		)];
		self.check_caller_allowances(caller, &pulls).await?;

		let two_hop = self.estimator.quote_zap_out_route(&request).await?;
		let final_quote = self
			.pools
			.quote_withdraw_single(&exit.pool_leg, two_hop.amount_out, exit.output_index)
			.await?;
		if final_quote < request.min_output {
			return Err(ZapError::SlippageExceeded {
				minimum: request.min_output,
				actual: final_quote,
			});
		}

		self.ensure_standing(
			request.vault_leg.principal_token,
			self.vault.address(),
			request.principal_amount_in,
		)
		.await?;

		let lp_amount = self
			.vault
			.swap(
				request.vault_leg.pool_id,
				request.vault_leg.principal_token,
				request.vault_leg.lp_token,
				request.principal_amount_in,
				two_hop.lp_amount,
				request.deadline,
			)
			.await?;
		let intermediate = self
			.pools
			.withdraw_single(&request.pool_leg, lp_amount, request.output_index)
			.await?;
		let amount_out = self
			.pools
			.withdraw_single(&exit.pool_leg, intermediate, exit.output_index)
			.await?;
		self.settle(caller, &pulls, request.min_output, amount_out)
			.await
	}

	/// Verifies each permit and installs the resulting grants.
	async fn apply_permits(
		&self,
		caller: Address,
		permits: &[PermitAuthorization],
		now: u64,
	) -> Result<(), ZapError> {
		for authorization in permits {
			let grant = self.permits.verify(caller, authorization, now).await?;
			self.approvals
				.grant(grant.owner, grant.asset, grant.spender, grant.value)
				.await;
		}
		Ok(())
	}

	/// Read-only check that the caller's allowances cover every pull.
	///
	/// Nothing is consumed here; consumption happens at settlement so a
	/// route that aborts later leaves the caller's allowances untouched.
	async fn check_caller_allowances(
		&self,
		caller: Address,
		pulls: &[(Asset, U256)],
	) -> Result<(), ZapError> {
		for (asset, amount) in pulls {
			if asset.is_native() || amount.is_zero() {
				continue;
			}
			let available = self
				.approvals
				.allowance(caller, asset.address(), self.address)
				.await;
			if available < *amount {
				return Err(ZapError::AuthorizationInvalid(format!(
					"allowance of {available} for {asset} cannot cover {amount}"
				)));
			}
		}
		Ok(())
	}

	/// Read-only check of the router's standing approval toward a spender.
	///
	/// The registry is consulted, never mutated, while routing; a missing
	/// standing approval would make the downstream transfer abort.
	async fn ensure_standing(
		&self,
		asset: Asset,
		spender: Address,
		amount: U256,
	) -> Result<(), ZapError> {
		if asset.is_native() || amount.is_zero() {
			return Ok(());
		}
		let available = self
			.approvals
			.allowance(self.address, asset.address(), spender)
			.await;
		if available < amount {
			return Err(ZapError::LegExecutionFailed(format!(
				"standing approval of {available} for {asset} toward {spender} cannot cover {amount}"
			)));
		}
		Ok(())
	}

	/// Final minimum-output gate and allowance consumption.
	async fn settle(
		&self,
		caller: Address,
		pulls: &[(Asset, U256)],
		min_output: U256,
		amount_out: U256,
	) -> Result<U256, ZapError> {
		if amount_out < min_output {
			return Err(ZapError::SlippageExceeded {
				minimum: min_output,
				actual: amount_out,
			});
		}
		for (asset, amount) in pulls {
			if asset.is_native() || amount.is_zero() {
				continue;
			}
			self.approvals
				.consume(caller, asset.address(), self.address, *amount)
				.await
				.map_err(|e| ZapError::AuthorizationInvalid(e.to_string()))?;
		}
		tracing::info!(%amount_out, "route settled");
		Ok(amount_out)
	}
}

/// Checks the request deadline against ambient time.
fn check_deadline(deadline: u64) -> Result<u64, ZapError> {
	let now = current_timestamp();
	if now > deadline {
		return Err(ZapError::DeadlineExpired { deadline, now });
	}
	Ok(now)
}

/// Pairs basket members with their amounts for allowance bookkeeping.
fn basket_pulls(basket: &[Asset], amounts: &[U256]) -> Vec<(Asset, U256)> {
	basket.iter().copied().zip(amounts.iter().copied()).collect()
}
