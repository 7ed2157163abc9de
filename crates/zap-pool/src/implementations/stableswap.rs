//! StableSwap pool implementation for development and testing.
//!
//! Carries the amplified-invariant pricing model used by pegged-asset pools:
//! an amplification coefficient `A` interpolates between a constant-sum and a
//! constant-product curve, with the invariant `D` and single-balance solves
//! found by Newton-Raphson iteration. Deposits accept a joint, possibly
//! unbalanced basket and charge an imbalance fee on the distance from the
//! ideal proportional deposit; single-asset withdrawals charge the same fee
//! on the implied imbalance.
//!
//! Balances are stored in each asset's native precision and scaled to a
//! common 1e18 grid by per-asset rate multipliers before any invariant math.

use crate::{PoolError, PoolFactory, PoolInterface, PoolRegistry};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use tokio::sync::RwLock;
use zap_types::{
	utils, Asset, ConfigSchema, Field, FieldType, ImplementationRegistry, PoolLegDescriptor,
	Schema, ValidationError,
};

/// Basis-point denominator (10 000 = 100%).
const BPS_DENOMINATOR: u64 = 10_000;

/// Maximum Newton-Raphson iterations before declaring non-convergence.
const MAX_ITERATIONS: u32 = 255;

/// Common precision grid all balances are scaled to before invariant math.
const TARGET_DECIMALS: u8 = 18;

fn u256(value: u64) -> U256 {
	U256::from(value)
}

/// Computes the invariant `D` for the scaled balances via Newton-Raphson.
///
/// Iterates `D_next = (Ann·S + n·D_P)·D / ((Ann − 1)·D + (n + 1)·D_P)` with
/// `D_P = D^(n+1) / (n^n · Πx)` until consecutive iterates differ by at most
/// one unit.
fn compute_d(xp: &[U256], amp: U256) -> Result<U256, PoolError> {
	let n = u256(xp.len() as u64);
	let mut s = U256::ZERO;
	for x in xp {
		s = s
			.checked_add(*x)
			.ok_or_else(|| PoolError::Math("D: balance sum overflow".to_string()))?;
	}
	if s.is_zero() {
		return Ok(U256::ZERO);
	}

	let ann = amp
		.checked_mul(n)
		.ok_or_else(|| PoolError::Math("D: A·n overflow".to_string()))?;

	let mut d = s;
	for _ in 0..MAX_ITERATIONS {
		// D_P = D^(n+1) / (n^n · Πx), folded one balance at a time.
		let mut d_p = d;
		for x in xp {
			let nx = x
				.checked_mul(n)
				.ok_or_else(|| PoolError::Math("D: n·x overflow".to_string()))?;
			if nx.is_zero() {
				// A zero balance pins the product invariant at zero.
				return Err(PoolError::InsufficientLiquidity(
					"pool has an empty balance".to_string(),
				));
			}
			d_p = d_p
				.checked_mul(d)
				.ok_or_else(|| PoolError::Math("D: D_P·D overflow".to_string()))?
				/ nx;
		}

		let d_prev = d;
		let numerator = ann
			.checked_mul(s)
			.and_then(|ann_s| ann_s.checked_add(d_p.checked_mul(n)?))
			.and_then(|inner| inner.checked_mul(d))
			.ok_or_else(|| PoolError::Math("D: numerator overflow".to_string()))?;
		let denominator = (ann - U256::from(1))
			.checked_mul(d)
			.and_then(|left| left.checked_add(d_p.checked_mul(n + U256::from(1))?))
			.ok_or_else(|| PoolError::Math("D: denominator overflow".to_string()))?;
		if denominator.is_zero() {
			return Err(PoolError::Math("D: zero denominator".to_string()));
		}
		d = numerator / denominator;

		if d.abs_diff(d_prev) <= U256::from(1) {
			return Ok(d);
		}
	}
	Err(PoolError::NonConvergence("invariant D did not converge"))
}

/// Solves for the scaled balance at `index` that satisfies the invariant `d`
/// while every other balance stays fixed.
fn compute_y(xp: &[U256], index: usize, d: U256, amp: U256) -> Result<U256, PoolError> {
	let n = u256(xp.len() as u64);
	let ann = amp
		.checked_mul(n)
		.ok_or_else(|| PoolError::Math("y: A·n overflow".to_string()))?;

	let mut c = d;
	let mut s = U256::ZERO;
	for (j, x) in xp.iter().enumerate() {
		if j == index {
			continue;
		}
		s = s
			.checked_add(*x)
			.ok_or_else(|| PoolError::Math("y: sum overflow".to_string()))?;
		let nx = x
			.checked_mul(n)
			.ok_or_else(|| PoolError::Math("y: n·x overflow".to_string()))?;
		if nx.is_zero() {
			return Err(PoolError::InsufficientLiquidity(
				"pool has an empty balance".to_string(),
			));
		}
		c = c
			.checked_mul(d)
			.ok_or_else(|| PoolError::Math("y: c·D overflow".to_string()))?
			/ nx;
	}
	let ann_n = ann
		.checked_mul(n)
		.ok_or_else(|| PoolError::Math("y: Ann·n overflow".to_string()))?;
	c = c
		.checked_mul(d)
		.ok_or_else(|| PoolError::Math("y: c·D overflow".to_string()))?
		/ ann_n;
	let b = s
		.checked_add(d / ann)
		.ok_or_else(|| PoolError::Math("y: b overflow".to_string()))?;

	let mut y = d;
	for _ in 0..MAX_ITERATIONS {
		let y_prev = y;
		let numerator = y
			.checked_mul(y)
			.and_then(|yy| yy.checked_add(c))
			.ok_or_else(|| PoolError::Math("y: numerator overflow".to_string()))?;
		let two_y = y
			.checked_mul(u256(2))
			.ok_or_else(|| PoolError::Math("y: 2y overflow".to_string()))?;
		let denominator = two_y
			.checked_add(b)
			.ok_or_else(|| PoolError::Math("y: denominator overflow".to_string()))?
			.checked_sub(d)
			.ok_or_else(|| PoolError::Math("y: denominator underflow".to_string()))?;
		if denominator.is_zero() {
			return Err(PoolError::Math("y: zero denominator".to_string()));
		}
		y = numerator / denominator;
		if y.abs_diff(y_prev) <= U256::from(1) {
			return Ok(y);
		}
	}
	Err(PoolError::NonConvergence("balance solve did not converge"))
}

/// Balances and LP supply, guarded together so every leg operation observes
/// and produces a consistent snapshot.
#[derive(Debug, Clone)]
struct PoolState {
	balances: Vec<U256>,
	lp_supply: U256,
}

/// Outcome of the shared deposit computation: LP amount to mint and the
/// post-deposit balances.
struct DepositOutcome {
	minted: U256,
	new_balances: Vec<U256>,
}

/// Outcome of the shared withdrawal computation: asset amount owed and the
/// post-withdrawal balances.
struct WithdrawOutcome {
	amount_out: U256,
	new_balances: Vec<U256>,
}

/// StableSwap pool with 2 or 3 basket assets.
pub struct StableSwapPool {
	descriptor: PoolLegDescriptor,
	/// Amplification coefficient `A`.
	amp: U256,
	/// Base exchange fee in basis points.
	fee_bps: U256,
	/// Per-asset multipliers scaling native precision to the 1e18 grid.
	rates: Vec<U256>,
	state: RwLock<PoolState>,
}

impl StableSwapPool {
	/// Creates a pool from its configuration table.
	pub fn new(config: &toml::Value) -> Result<Self, PoolError> {
		StableSwapSchema
			.validate(config)
			.map_err(|e| PoolError::InvalidConfig(e.to_string()))?;

		let address = parse_address_field(config, "address")?;
		let lp_token = parse_address_field(config, "lp_token")?;
		let assets = config
			.get("assets")
			.and_then(|v| v.as_array())
			.ok_or_else(|| PoolError::InvalidConfig("assets missing".to_string()))?
			.iter()
			.map(|v| {
				let raw = v
					.as_str()
					.ok_or_else(|| PoolError::InvalidConfig("asset must be a string".to_string()))?;
				utils::parse_address(raw)
					.map(Asset::from_address)
					.map_err(PoolError::InvalidConfig)
			})
			.collect::<Result<Vec<_>, _>>()?;

		let decimals: Vec<u8> = collect_integers(config, "decimals")?
			.into_iter()
			.map(|d| d as u8)
			.collect();
		let balances = collect_amounts(config, "balances")?;
		if decimals.len() != assets.len() || balances.len() != assets.len() {
			return Err(PoolError::InvalidConfig(
				"assets, decimals and balances must have equal length".to_string(),
			));
		}

		let rates = decimals
			.iter()
			.map(|d| {
				if *d > TARGET_DECIMALS {
					return Err(PoolError::InvalidConfig(format!(
						"{d} decimals exceed the {TARGET_DECIMALS}-decimal grid"
					)));
				}
				Ok(U256::from(10u64).pow(U256::from(TARGET_DECIMALS - d)))
			})
			.collect::<Result<Vec<_>, _>>()?;

		let amp = u256(
			config
				.get("amplification")
				.and_then(|v| v.as_integer())
				.unwrap_or(100) as u64,
		);
		let fee_bps = u256(
			config
				.get("fee_bps")
				.and_then(|v| v.as_integer())
				.unwrap_or(4) as u64,
		);

		let descriptor = PoolLegDescriptor {
			pool: address,
			basket: assets,
			lp_token: Asset::Erc20(lp_token),
		};
		descriptor
			.validate()
			.map_err(|e| PoolError::InvalidConfig(e.to_string()))?;

		// Seed the LP supply at the invariant so the pool starts at a
		// virtual price of one.
		let xp = scaled_balances(&balances, &rates)?;
		let lp_supply = match config.get("lp_supply").and_then(|v| v.as_str()) {
			Some(raw) => utils::parse_amount(raw).map_err(PoolError::InvalidConfig)?,
			None => compute_d(&xp, amp)?,
		};

		Ok(Self {
			descriptor,
			amp,
			fee_bps,
			rates,
			state: RwLock::new(PoolState {
				balances,
				lp_supply,
			}),
		})
	}

	fn n(&self) -> usize {
		self.descriptor.basket.len()
	}

	/// Imbalance fee multiplier, `fee · n / (4 · (n − 1))`, applied to the
	/// distance from a proportional deposit or withdrawal.
	fn imbalance_fee_bps(&self) -> U256 {
		let n = u256(self.n() as u64);
		self.fee_bps * n / (u256(4) * (n - U256::from(1)))
	}

	/// Deposit math shared by the quote and the state-changing operation.
	fn compute_deposit(
		&self,
		state: &PoolState,
		amounts: &[U256],
	) -> Result<DepositOutcome, PoolError> {
		if amounts.len() != self.n() {
			return Err(PoolError::BasketMismatch(format!(
				"{} amounts supplied for a basket of {}",
				amounts.len(),
				self.n()
			)));
		}
		if amounts.iter().all(|amount| amount.is_zero()) {
			return Err(PoolError::EmptyBasket(
				"deposit carries no value".to_string(),
			));
		}

		let xp_old = scaled_balances(&state.balances, &self.rates)?;
		let d0 = compute_d(&xp_old, self.amp)?;

		let mut new_balances = Vec::with_capacity(self.n());
		for (balance, amount) in state.balances.iter().zip(amounts) {
			new_balances.push(balance.checked_add(*amount).ok_or_else(|| {
				PoolError::Math("deposit: balance overflow".to_string())
			})?);
		}
		let xp_new = scaled_balances(&new_balances, &self.rates)?;
		let d1 = compute_d(&xp_new, self.amp)?;
		if d1 <= d0 {
			return Err(PoolError::Math(
				"deposit did not grow the invariant".to_string(),
			));
		}

		if state.lp_supply.is_zero() {
			return Ok(DepositOutcome {
				minted: d1,
				new_balances,
			});
		}

		// Imbalance fee: each balance pays on its distance from the ideal
		// proportional deposit, then the invariant is recomputed on the
		// reduced balances.
		let fee = self.imbalance_fee_bps();
		let mut xp_adjusted = Vec::with_capacity(self.n());
		for (i, xp_new_i) in xp_new.iter().enumerate() {
			let ideal = d1
				.checked_mul(xp_old[i])
				.ok_or_else(|| PoolError::Math("deposit: ideal overflow".to_string()))?
				/ d0;
			let difference = ideal.abs_diff(*xp_new_i);
			let charged = fee
				.checked_mul(difference)
				.ok_or_else(|| PoolError::Math("deposit: fee overflow".to_string()))?
				/ u256(BPS_DENOMINATOR);
			xp_adjusted.push(xp_new_i.checked_sub(charged).ok_or_else(|| {
				PoolError::Math("deposit: fee exceeds balance".to_string())
			})?);
		}
		let d2 = compute_d(&xp_adjusted, self.amp)?;

		let minted = state
			.lp_supply
			.checked_mul(d2.checked_sub(d0).ok_or_else(|| {
				PoolError::Math("deposit: invariant regression".to_string())
			})?)
			.ok_or_else(|| PoolError::Math("deposit: mint overflow".to_string()))?
			/ d0;

		Ok(DepositOutcome {
			minted,
			new_balances,
		})
	}

	/// Single-asset withdrawal math shared by the quote and the
	/// state-changing operation.
	fn compute_withdraw_single(
		&self,
		state: &PoolState,
		lp_amount: U256,
		index: usize,
	) -> Result<WithdrawOutcome, PoolError> {
		if lp_amount.is_zero() {
			return Err(PoolError::EmptyBasket(
				"withdrawal burns no LP tokens".to_string(),
			));
		}
		if index >= self.n() {
			return Err(PoolError::BasketMismatch(format!(
				"output index {index} outside basket of {}",
				self.n()
			)));
		}
		if lp_amount > state.lp_supply {
			return Err(PoolError::InsufficientLiquidity(format!(
				"burning {lp_amount} LP against a supply of {}",
				state.lp_supply
			)));
		}

		let xp = scaled_balances(&state.balances, &self.rates)?;
		let d0 = compute_d(&xp, self.amp)?;
		let d1 = d0
			.checked_sub(
				lp_amount
					.checked_mul(d0)
					.ok_or_else(|| PoolError::Math("withdraw: share overflow".to_string()))?
					/ state.lp_supply,
			)
			.ok_or_else(|| PoolError::Math("withdraw: invariant underflow".to_string()))?;
		let new_y = compute_y(&xp, index, d1, self.amp)?;

		// Fee on the implied imbalance: each balance pays on its distance
		// from the proportional reduction to D1.
		let fee = self.imbalance_fee_bps();
		let mut xp_reduced = Vec::with_capacity(self.n());
		for (j, xp_j) in xp.iter().enumerate() {
			let proportional = xp_j
				.checked_mul(d1)
				.ok_or_else(|| PoolError::Math("withdraw: proportional overflow".to_string()))?
				/ d0;
			let expected_change = if j == index {
				proportional
					.checked_sub(new_y)
					.ok_or_else(|| PoolError::Math("withdraw: change underflow".to_string()))?
			} else {
				xp_j - proportional
			};
			let charged = fee
				.checked_mul(expected_change)
				.ok_or_else(|| PoolError::Math("withdraw: fee overflow".to_string()))?
				/ u256(BPS_DENOMINATOR);
			xp_reduced.push(xp_j.checked_sub(charged).ok_or_else(|| {
				PoolError::Math("withdraw: fee exceeds balance".to_string())
			})?);
		}

		let y_after_fee = compute_y(&xp_reduced, index, d1, self.amp)?;
		let dy_scaled = xp_reduced[index]
			.checked_sub(y_after_fee)
			.ok_or_else(|| PoolError::Math("withdraw: output underflow".to_string()))?
			.checked_sub(U256::from(1))
			.unwrap_or(U256::ZERO);
		let amount_out = dy_scaled / self.rates[index];

		if amount_out > state.balances[index] {
			return Err(PoolError::InsufficientLiquidity(format!(
				"withdrawal of {amount_out} exceeds reserve {}",
				state.balances[index]
			)));
		}

		let mut new_balances = state.balances.clone();
		new_balances[index] -= amount_out;

		Ok(WithdrawOutcome {
			amount_out,
			new_balances,
		})
	}
}

fn scaled_balances(balances: &[U256], rates: &[U256]) -> Result<Vec<U256>, PoolError> {
	balances
		.iter()
		.zip(rates)
		.map(|(balance, rate)| {
			balance
				.checked_mul(*rate)
				.ok_or_else(|| PoolError::Math("balance scaling overflow".to_string()))
		})
		.collect()
}

fn parse_address_field(config: &toml::Value, field: &str) -> Result<Address, PoolError> {
	let raw = config
		.get(field)
		.and_then(|v| v.as_str())
		.ok_or_else(|| PoolError::InvalidConfig(format!("{field} missing")))?;
	utils::parse_address(raw).map_err(PoolError::InvalidConfig)
}

fn collect_integers(config: &toml::Value, field: &str) -> Result<Vec<i64>, PoolError> {
	config
		.get(field)
		.and_then(|v| v.as_array())
		.ok_or_else(|| PoolError::InvalidConfig(format!("{field} missing")))?
		.iter()
		.map(|v| {
			v.as_integer()
				.ok_or_else(|| PoolError::InvalidConfig(format!("{field} must hold integers")))
		})
		.collect()
}

fn collect_amounts(config: &toml::Value, field: &str) -> Result<Vec<U256>, PoolError> {
	config
		.get(field)
		.and_then(|v| v.as_array())
		.ok_or_else(|| PoolError::InvalidConfig(format!("{field} missing")))?
		.iter()
		.map(|v| {
			let raw = v
				.as_str()
				.ok_or_else(|| PoolError::InvalidConfig(format!("{field} must hold strings")))?;
			utils::parse_amount(raw).map_err(PoolError::InvalidConfig)
		})
		.collect()
}

#[async_trait]
impl PoolInterface for StableSwapPool {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(StableSwapSchema)
	}

	fn descriptor(&self) -> &PoolLegDescriptor {
		&self.descriptor
	}

	async fn deposit(&self, amounts: &[U256]) -> Result<U256, PoolError> {
		let mut state = self.state.write().await;
		let outcome = self.compute_deposit(&state, amounts)?;
		state.balances = outcome.new_balances;
		state.lp_supply = state
			.lp_supply
			.checked_add(outcome.minted)
			.ok_or_else(|| PoolError::Math("deposit: supply overflow".to_string()))?;
		tracing::debug!(
			pool = %self.descriptor.pool,
			minted = %outcome.minted,
			"basket deposit settled"
		);
		Ok(outcome.minted)
	}

	async fn withdraw_single(&self, lp_amount: U256, index: usize) -> Result<U256, PoolError> {
		let mut state = self.state.write().await;
		let outcome = self.compute_withdraw_single(&state, lp_amount, index)?;
		state.balances = outcome.new_balances;
		state.lp_supply -= lp_amount;
		tracing::debug!(
			pool = %self.descriptor.pool,
			amount_out = %outcome.amount_out,
			index,
			"single-asset withdrawal settled"
		);
		Ok(outcome.amount_out)
	}

	async fn quote_deposit(&self, amounts: &[U256]) -> Result<U256, PoolError> {
		let state = self.state.read().await;
		Ok(self.compute_deposit(&state, amounts)?.minted)
	}

	async fn quote_withdraw_single(
		&self,
		lp_amount: U256,
		index: usize,
	) -> Result<U256, PoolError> {
		let state = self.state.read().await;
		Ok(self
			.compute_withdraw_single(&state, lp_amount, index)?
			.amount_out)
	}

	async fn reserves(&self) -> Vec<U256> {
		self.state.read().await.balances.clone()
	}

	async fn lp_supply(&self) -> U256 {
		self.state.read().await.lp_supply
	}
}

/// Configuration schema for the StableSwap implementation.
pub struct StableSwapSchema;

impl ConfigSchema for StableSwapSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("address", FieldType::String),
				Field::new("lp_token", FieldType::String),
				Field::new("assets", FieldType::Array(Box::new(FieldType::String))),
				Field::new(
					"decimals",
					FieldType::Array(Box::new(FieldType::Integer {
						min: Some(0),
						max: Some(TARGET_DECIMALS as i64),
					})),
				),
				Field::new("balances", FieldType::Array(Box::new(FieldType::String))),
			],
			vec![
				Field::new(
					"amplification",
					FieldType::Integer {
						min: Some(1),
						max: Some(1_000_000),
					},
				),
				Field::new(
					"fee_bps",
					FieldType::Integer {
						min: Some(0),
						max: Some(BPS_DENOMINATOR as i64),
					},
				),
				Field::new("lp_supply", FieldType::String),
			],
		);
		schema.validate(config)
	}
}

/// Registry for the StableSwap implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "stableswap";
	type Factory = PoolFactory;

	fn factory() -> Self::Factory {
		create_pool
	}
}

impl PoolRegistry for Registry {}

/// Factory function for creating StableSwap pools.
pub fn create_pool(config: &toml::Value) -> Result<Box<dyn PoolInterface>, PoolError> {
	Ok(Box::new(StableSwapPool::new(config)?))
}
