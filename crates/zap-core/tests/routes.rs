//! End-to-end route tests against the in-tree pool and vault
//! implementations.
//!
//! Every test builds a fresh router from one configuration document, so
//! pool state never leaks between tests.

use alloy_primitives::{Address, B256, U256};
use std::str::FromStr;
use zap_config::Config;
use zap_core::{build_router, ZapRouter};
use zap_pool::PoolInterface;
use zap_types::utils::builders::{ZapInRequestBuilder, ZapOutRequestBuilder};
use zap_types::{
	current_timestamp, Asset, BasketExitLeg, BasketJoinLeg, PermitAuthorization, PermitKind,
	PoolLegDescriptor, RouteKind, VaultLegDescriptor, ZapError,
};

const ROUTER: &str = "0x00000000000000000000000000000000000000f0";
const CALLER: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

const PRIMARY_POOL: &str = "0x0101010101010101010101010101010101010101";
const PRIMARY_LP: &str = "0x0202020202020202020202020202020202020202";
const PRINCIPAL: &str = "0x0303030303030303030303030303030303030303";
const STABLE: &str = "0x0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a";
const TRI_LP: &str = "0xcccccccccccccccccccccccccccccccccccccccc";

const SECONDARY_POOL: &str = "0x0505050505050505050505050505050505050505";
const DAI: &str = "0x2121212121212121212121212121212121212121";
const USDC: &str = "0x2222222222222222222222222222222222222222";
const USDT: &str = "0x2323232323232323232323232323232323232323";

const VAULT_ADDRESS: &str = "0xba12222222228d8ba445958a75a0704d566bf2c8";
const VAULT_POOL_ID: &str =
	"0x893b30574bf183d69413717f30b17062ec9dfd8b000200000000000000000061";

/// 1M tokens at 18 decimals.
const RESERVE_18: &str = "1000000000000000000000000";
/// 1M tokens at 6 decimals.
const RESERVE_6: &str = "1000000000000";

fn config_document() -> String {
	format!(
		r#"
		[router]
		address = "{ROUTER}"

		[[approvals]]
		asset = "{STABLE}"
		spender = "{PRIMARY_POOL}"
		amount = "max"

		[[approvals]]
		asset = "{TRI_LP}"
		spender = "{PRIMARY_POOL}"
		amount = "max"

		[[approvals]]
		asset = "{DAI}"
		spender = "{SECONDARY_POOL}"
		amount = "max"

		[[approvals]]
		asset = "{USDC}"
		spender = "{SECONDARY_POOL}"
		amount = "max"

		[[approvals]]
		asset = "{USDT}"
		spender = "{SECONDARY_POOL}"
		amount = "max"

		[[approvals]]
		asset = "{PRIMARY_LP}"
		spender = "{VAULT_ADDRESS}"
		amount = "max"

		[[approvals]]
		asset = "{PRINCIPAL}"
		spender = "{VAULT_ADDRESS}"
		amount = "max"

		[[pools]]
		implementation = "stableswap"
		address = "{PRIMARY_POOL}"
		lp_token = "{PRIMARY_LP}"
		assets = ["{STABLE}", "{TRI_LP}"]
		decimals = [18, 18]
		balances = ["{RESERVE_18}", "{RESERVE_18}"]
		amplification = 200
		fee_bps = 4

		[[pools]]
		implementation = "stableswap"
		address = "{SECONDARY_POOL}"
		lp_token = "{TRI_LP}"
		assets = ["{DAI}", "{USDC}", "{USDT}"]
		decimals = [18, 6, 6]
		balances = ["{RESERVE_18}", "{RESERVE_6}", "{RESERVE_6}"]
		amplification = 2000
		fee_bps = 4

		[vault]
		implementation = "weighted"
		address = "{VAULT_ADDRESS}"

		[[vault.pools]]
		pool_id = "{VAULT_POOL_ID}"
		token_a = "{PRIMARY_LP}"
		token_b = "{PRINCIPAL}"
		balance_a = "{RESERVE_18}"
		balance_b = "{RESERVE_18}"
		fee_bps = 30

		[permit]
		implementation = "local"

		[tolerances]
		zap_in_bps = 750
		zap_out_bps = 750
		"#
	)
}

fn addr(value: &str) -> Address {
	Address::from_str(value).unwrap()
}

fn asset(value: &str) -> Asset {
	Asset::Erc20(addr(value))
}

fn caller() -> Address {
	addr(CALLER)
}

fn units(amount: u64, decimals: u32) -> U256 {
	U256::from(amount) * U256::from(10u64).pow(U256::from(decimals))
}

fn primary_leg() -> PoolLegDescriptor {
	PoolLegDescriptor {
		pool: addr(PRIMARY_POOL),
		basket: vec![asset(STABLE), asset(TRI_LP)],
		lp_token: asset(PRIMARY_LP),
	}
}

fn secondary_leg() -> PoolLegDescriptor {
	PoolLegDescriptor {
		pool: addr(SECONDARY_POOL),
		basket: vec![asset(DAI), asset(USDC), asset(USDT)],
		lp_token: asset(TRI_LP),
	}
}

fn vault_leg() -> VaultLegDescriptor {
	VaultLegDescriptor {
		pool_id: B256::from_str(VAULT_POOL_ID).unwrap(),
		lp_token: asset(PRIMARY_LP),
		principal_token: asset(PRINCIPAL),
	}
}

async fn build() -> (ZapRouter, Config) {
	let config = Config::from_str(&config_document()).unwrap();
	let router = build_router(&config).await.unwrap();
	(router, config)
}

/// Stands in for the caller approving the router on each token.
async fn approve_router(router: &ZapRouter, assets: &[&str]) {
	for value in assets {
		router
			.approvals()
			.grant(caller(), addr(value), router.address(), U256::MAX)
			.await;
	}
}

fn low_s_permit(asset_addr: &str, spender: Address, expiration: u64) -> PermitAuthorization {
	PermitAuthorization {
		asset: addr(asset_addr),
		spender,
		value: U256::MAX,
		expiration,
		kind: PermitKind::Eip2612,
		v: 27,
		r: B256::repeat_byte(0x11),
		s: B256::repeat_byte(0x11),
	}
}

#[tokio::test]
async fn estimate_agrees_with_zap_in_execution() {
	let (router, _) = build().await;
	approve_router(&router, &[STABLE]).await;

	let request = ZapInRequestBuilder::new(primary_leg(), vault_leg())
		.amount(0, units(5000, 18))
		.build();

	let estimate = router.estimate_zap_in(&request).await.unwrap();
	let delivered = router.zap_in(caller(), request, &[]).await.unwrap();
	assert_eq!(estimate, delivered);
}

#[tokio::test]
async fn estimate_agrees_with_zap_out_execution() {
	let (router, _) = build().await;
	approve_router(&router, &[PRINCIPAL]).await;

	let request = ZapOutRequestBuilder::new(primary_leg(), vault_leg())
		.principal_amount(units(5000, 18))
		.output_index(0)
		.build();

	let estimate = router.estimate_zap_out(&request).await.unwrap();
	let delivered = router.zap_out(caller(), request, &[]).await.unwrap();
	assert_eq!(estimate, delivered);
}

#[tokio::test]
async fn round_trip_loses_only_fees() {
	let (router, _) = build().await;
	approve_router(&router, &[STABLE, PRINCIPAL]).await;

	let amount_in = units(5000, 18);
	let zap_in = ZapInRequestBuilder::new(primary_leg(), vault_leg())
		.amount(0, amount_in)
		.build();
	let principal = router.zap_in(caller(), zap_in, &[]).await.unwrap();

	let zap_out = ZapOutRequestBuilder::new(primary_leg(), vault_leg())
		.principal_amount(principal)
		.output_index(0)
		.build();
	let returned = router.zap_out(caller(), zap_out, &[]).await.unwrap();

	// Never exactly equal: both vault legs and both pool legs take fees.
	assert!(returned < amount_in);
	// But the loss is bounded by the combined fee schedule, well under 3%.
	assert!(returned > amount_in * U256::from(97) / U256::from(100));
}

#[tokio::test]
async fn slippage_abort_has_no_side_effects() {
	let (router, _) = build().await;
	approve_router(&router, &[STABLE]).await;

	let amount_in = units(5000, 18);
	let probe = ZapInRequestBuilder::new(primary_leg(), vault_leg())
		.amount(0, amount_in)
		.build();
	let estimate = router.estimate_zap_in(&probe).await.unwrap();

	let request = ZapInRequestBuilder::new(primary_leg(), vault_leg())
		.amount(0, amount_in)
		.min_output(estimate + U256::from(1))
		.build();
	let result = router.zap_in(caller(), request, &[]).await;
	assert!(matches!(result, Err(ZapError::SlippageExceeded { .. })));

	// Pool and vault state are untouched: the same quote still holds, and a
	// satisfiable retry delivers exactly it.
	assert_eq!(router.estimate_zap_in(&probe).await.unwrap(), estimate);
	let retry = ZapInRequestBuilder::new(primary_leg(), vault_leg())
		.amount(0, amount_in)
		.min_output(estimate)
		.build();
	assert_eq!(router.zap_in(caller(), retry, &[]).await.unwrap(), estimate);
}

#[tokio::test]
async fn expired_deadline_aborts_with_zero_side_effects() {
	let (router, _) = build().await;
	approve_router(&router, &[STABLE]).await;

	let probe = ZapInRequestBuilder::new(primary_leg(), vault_leg())
		.amount(0, units(5000, 18))
		.build();
	let estimate = router.estimate_zap_in(&probe).await.unwrap();

	let request = ZapInRequestBuilder::new(primary_leg(), vault_leg())
		.amount(0, units(5000, 18))
		.deadline(current_timestamp() - 10)
		.build();
	let result = router.zap_in(caller(), request, &[]).await;
	assert!(matches!(result, Err(ZapError::DeadlineExpired { .. })));
	assert_eq!(router.estimate_zap_in(&probe).await.unwrap(), estimate);
}

#[tokio::test]
async fn all_zero_basket_aborts_before_any_external_call() {
	let (router, _) = build().await;
	approve_router(&router, &[STABLE]).await;

	let request = ZapInRequestBuilder::new(primary_leg(), vault_leg()).build();
	let result = router.zap_in(caller(), request, &[]).await;
	assert!(matches!(result, Err(ZapError::InvalidBasket(_))));
}

#[tokio::test]
async fn all_zero_basket_estimate_is_an_error_not_zero() {
	let (router, _) = build().await;
	let request = ZapInRequestBuilder::new(primary_leg(), vault_leg()).build();
	assert!(router.estimate_zap_in(&request).await.is_err());
}

#[tokio::test]
async fn missing_allowance_rejects_the_route() {
	let (router, _) = build().await;
	// No approve, no permit.
	let request = ZapInRequestBuilder::new(primary_leg(), vault_leg())
		.amount(0, units(5000, 18))
		.build();
	let result = router.zap_in(caller(), request, &[]).await;
	assert!(matches!(result, Err(ZapError::AuthorizationInvalid(_))));
}

#[tokio::test]
async fn permit_installs_the_allowance_for_the_route() {
	let (router, _) = build().await;
	let permit = low_s_permit(STABLE, router.address(), current_timestamp() + 3600);

	let request = ZapInRequestBuilder::new(primary_leg(), vault_leg())
		.amount(0, units(5000, 18))
		.build();
	let delivered = router.zap_in(caller(), request, &[permit]).await.unwrap();
	assert!(delivered > U256::ZERO);
}

#[tokio::test]
async fn expired_permit_aborts_the_route() {
	let (router, _) = build().await;
	let permit = low_s_permit(STABLE, router.address(), current_timestamp() - 10);

	let request = ZapInRequestBuilder::new(primary_leg(), vault_leg())
		.amount(0, units(5000, 18))
		.build();
	let result = router.zap_in(caller(), request, &[permit]).await;
	assert!(matches!(result, Err(ZapError::AuthorizationInvalid(_))));
}

#[tokio::test]
async fn permit_grant_survives_a_failed_route() {
	let (router, _) = build().await;
	let permit = low_s_permit(STABLE, router.address(), current_timestamp() + 3600);

	let probe = ZapInRequestBuilder::new(primary_leg(), vault_leg())
		.amount(0, units(5000, 18))
		.build();
	let estimate = router.estimate_zap_in(&probe).await.unwrap();

	// First attempt fails on slippage after the permit applied.
	let request = ZapInRequestBuilder::new(primary_leg(), vault_leg())
		.amount(0, units(5000, 18))
		.min_output(estimate + U256::from(1))
		.build();
	let result = router.zap_in(caller(), request, &[permit]).await;
	assert!(matches!(result, Err(ZapError::SlippageExceeded { .. })));

	// The grant is still in place: the retry needs no permit.
	let retry = ZapInRequestBuilder::new(primary_leg(), vault_leg())
		.amount(0, units(5000, 18))
		.min_output(estimate)
		.build();
	assert_eq!(router.zap_in(caller(), retry, &[]).await.unwrap(), estimate);
}

#[tokio::test]
async fn three_hop_zap_in_matches_manual_composition() {
	let amount = units(5000, 18);

	// Path A: one three-hop route.
	let (router_a, _) = build().await;
	approve_router(&router_a, &[DAI]).await;
	let request_a = ZapInRequestBuilder::new(primary_leg(), vault_leg()).build();
	let join = BasketJoinLeg {
		pool_leg: secondary_leg(),
		basket_amounts: vec![amount, U256::ZERO, U256::ZERO],
	};
	let estimate_a = router_a
		.estimate_swap3crv_and_zap_in(&request_a, &join)
		.await
		.unwrap();
	let out_a = router_a
		.swap3crv_and_zap_in(caller(), request_a, join, &[])
		.await
		.unwrap();
	assert_eq!(estimate_a, out_a);

	// Path B: convert through a standalone secondary pool with the same
	// seeding, then run the plain two-leg route with the converted amount.
	let secondary_table: toml::Value = format!(
		r#"
		address = "{SECONDARY_POOL}"
		lp_token = "{TRI_LP}"
		assets = ["{DAI}", "{USDC}", "{USDT}"]
		decimals = [18, 6, 6]
		balances = ["{RESERVE_18}", "{RESERVE_6}", "{RESERVE_6}"]
		amplification = 2000
		fee_bps = 4
		"#
	)
	.parse()
	.unwrap();
	let standalone =
		zap_pool::implementations::stableswap::create_pool(&secondary_table).unwrap();
	let converted = standalone
		.deposit(&[amount, U256::ZERO, U256::ZERO])
		.await
		.unwrap();

	let (router_b, _) = build().await;
	approve_router(&router_b, &[TRI_LP]).await;
	let request_b = ZapInRequestBuilder::new(primary_leg(), vault_leg())
		.amount(1, converted)
		.build();
	let out_b = router_b.zap_in(caller(), request_b, &[]).await.unwrap();

	assert_eq!(out_a, out_b);
}

#[tokio::test]
async fn three_hop_zap_out_delivers_the_secondary_member() {
	let (router, _) = build().await;
	approve_router(&router, &[PRINCIPAL]).await;

	let request = ZapOutRequestBuilder::new(primary_leg(), vault_leg())
		.principal_amount(units(5000, 18))
		.output_index(1)
		.build();
	let exit = BasketExitLeg {
		pool_leg: secondary_leg(),
		output_index: 1,
	};

	let estimate = router
		.estimate_zap_out_and_swap3crv(&request, &exit)
		.await
		.unwrap();
	let delivered = router
		.zap_out_and_swap3crv(caller(), request, exit, &[])
		.await
		.unwrap();
	assert_eq!(estimate, delivered);

	// The exit member carries 6 decimals; the delivery lands near 5000
	// units on that grid, inside the combined fee band.
	let nominal = units(5000, 6);
	assert!(delivered < nominal);
	assert!(delivered > nominal * U256::from(95) / U256::from(100));
}

#[tokio::test]
async fn concrete_scenario_stays_inside_the_quoted_band() {
	let (router, config) = build().await;
	approve_router(&router, &[STABLE]).await;

	let probe = ZapInRequestBuilder::new(primary_leg(), vault_leg())
		.amount(0, units(5000, 18))
		.build();
	let estimate = router.estimate_zap_in(&probe).await.unwrap();

	let tolerance_bps =
		U256::from(config.tolerances.for_route(RouteKind::ZapIn));
	let offset = estimate * tolerance_bps / U256::from(10_000);
	let lower = estimate - offset;
	let upper = estimate + offset;

	let request = ZapInRequestBuilder::new(primary_leg(), vault_leg())
		.amount(0, units(5000, 18))
		.min_output(lower)
		.deadline(current_timestamp() + 3600)
		.build();
	let delivered = router.zap_in(caller(), request, &[]).await.unwrap();

	assert!(delivered > lower);
	assert!(delivered < upper);
}

#[tokio::test]
async fn basket_order_is_authoritative() {
	let (router, _) = build().await;
	approve_router(&router, &[STABLE, TRI_LP]).await;

	// Same members, wrong order: the configured descriptor wins.
	let reversed = PoolLegDescriptor {
		pool: addr(PRIMARY_POOL),
		basket: vec![asset(TRI_LP), asset(STABLE)],
		lp_token: asset(PRIMARY_LP),
	};
	let request = ZapInRequestBuilder::new(reversed, vault_leg())
		.amount(0, units(5000, 18))
		.build();
	let result = router.zap_in(caller(), request, &[]).await;
	assert!(matches!(result, Err(ZapError::InvalidBasket(_))));
}
