//! Equal-weight vault implementation for development and testing.
//!
//! Holds two-token pools keyed by 32-byte identifiers. With equal weights
//! the weighted-pool pricing formula collapses to the product invariant, so
//! a swap prices as `out = R_out · net / (R_in + net)` with the fee deducted
//! from the input before the curve is applied and left in the pool.

use crate::{VaultError, VaultFactory, VaultInterface, VaultRegistry};
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use zap_types::{
	current_timestamp, utils, Asset, ConfigSchema, Field, FieldType, ImplementationRegistry,
	Schema, ValidationError,
};

/// Basis-point denominator (10 000 = 100%).
const BPS_DENOMINATOR: u64 = 10_000;

/// One two-token pool held by the vault.
#[derive(Debug, Clone)]
struct VaultPool {
	token_a: Asset,
	token_b: Asset,
	balance_a: U256,
	balance_b: U256,
	fee_bps: U256,
}

impl VaultPool {
	/// Swap output for the given input, fee deducted before the curve.
	fn compute_out(&self, asset_in: Asset, amount_in: U256) -> Result<U256, VaultError> {
		let (reserve_in, reserve_out) = if asset_in == self.token_a {
			(self.balance_a, self.balance_b)
		} else {
			(self.balance_b, self.balance_a)
		};

		let fee = amount_in
			.checked_mul(self.fee_bps)
			.ok_or_else(|| VaultError::Math("fee overflow".to_string()))?
			/ U256::from(BPS_DENOMINATOR);
		let net_input = amount_in - fee;

		let numerator = reserve_out
			.checked_mul(net_input)
			.ok_or_else(|| VaultError::Math("output overflow".to_string()))?;
		let denominator = reserve_in
			.checked_add(net_input)
			.ok_or_else(|| VaultError::Math("reserve overflow".to_string()))?;
		if denominator.is_zero() {
			return Err(VaultError::InsufficientLiquidity(
				"pool has no reserves".to_string(),
			));
		}
		let amount_out = numerator / denominator;
		if amount_out >= reserve_out {
			return Err(VaultError::InsufficientLiquidity(format!(
				"output {amount_out} would drain the reserve {reserve_out}"
			)));
		}
		Ok(amount_out)
	}

	fn contains(&self, asset: Asset) -> bool {
		asset == self.token_a || asset == self.token_b
	}
}

/// Vault over in-memory equal-weight pools.
pub struct WeightedVault {
	address: Address,
	pools: RwLock<HashMap<B256, VaultPool>>,
}

impl WeightedVault {
	/// Creates a vault from its configuration table.
	pub fn new(config: &toml::Value) -> Result<Self, VaultError> {
		WeightedVaultSchema
			.validate(config)
			.map_err(|e| VaultError::InvalidConfig(e.to_string()))?;

		let address = config
			.get("address")
			.and_then(|v| v.as_str())
			.ok_or_else(|| VaultError::InvalidConfig("address missing".to_string()))
			.and_then(|raw| utils::parse_address(raw).map_err(VaultError::InvalidConfig))?;

		let mut pools = HashMap::new();
		if let Some(tables) = config.get("pools").and_then(|v| v.as_array()) {
			for table in tables {
				let (pool_id, pool) = parse_pool(table)?;
				pools.insert(pool_id, pool);
			}
		}

		Ok(Self {
			address,
			pools: RwLock::new(pools),
		})
	}

	fn checked_pair(
		pool: &VaultPool,
		pool_id: B256,
		asset_in: Asset,
		asset_out: Asset,
	) -> Result<(), VaultError> {
		if !pool.contains(asset_in) {
			return Err(VaultError::AssetNotInPool(format!(
				"{asset_in} not in pool {pool_id}"
			)));
		}
		if !pool.contains(asset_out) {
			return Err(VaultError::AssetNotInPool(format!(
				"{asset_out} not in pool {pool_id}"
			)));
		}
		if asset_in == asset_out {
			return Err(VaultError::AssetNotInPool(
				"swap between identical assets".to_string(),
			));
		}
		Ok(())
	}
}

fn parse_pool(table: &toml::Value) -> Result<(B256, VaultPool), VaultError> {
	let pool_id = table
		.get("pool_id")
		.and_then(|v| v.as_str())
		.ok_or_else(|| VaultError::InvalidConfig("pool_id missing".to_string()))?
		.parse::<B256>()
		.map_err(|e| VaultError::InvalidConfig(format!("invalid pool_id: {e}")))?;

	let asset = |field: &str| -> Result<Asset, VaultError> {
		table
			.get(field)
			.and_then(|v| v.as_str())
			.ok_or_else(|| VaultError::InvalidConfig(format!("{field} missing")))
			.and_then(|raw| {
				utils::parse_address(raw)
					.map(Asset::from_address)
					.map_err(VaultError::InvalidConfig)
			})
	};
	let amount = |field: &str| -> Result<U256, VaultError> {
		table
			.get(field)
			.and_then(|v| v.as_str())
			.ok_or_else(|| VaultError::InvalidConfig(format!("{field} missing")))
			.and_then(|raw| utils::parse_amount(raw).map_err(VaultError::InvalidConfig))
	};

	let pool = VaultPool {
		token_a: asset("token_a")?,
		token_b: asset("token_b")?,
		balance_a: amount("balance_a")?,
		balance_b: amount("balance_b")?,
		fee_bps: U256::from(
			table
				.get("fee_bps")
				.and_then(|v| v.as_integer())
				.unwrap_or(30) as u64,
		),
	};
	if pool.token_a == pool.token_b {
		return Err(VaultError::InvalidConfig(
			"pool tokens must be distinct".to_string(),
		));
	}
	Ok((pool_id, pool))
}

#[async_trait]
impl VaultInterface for WeightedVault {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(WeightedVaultSchema)
	}

	fn address(&self) -> Address {
		self.address
	}

	async fn swap(
		&self,
		pool_id: B256,
		asset_in: Asset,
		asset_out: Asset,
		amount_in: U256,
		limit: U256,
		deadline: u64,
	) -> Result<U256, VaultError> {
		let now = current_timestamp();
		if now > deadline {
			return Err(VaultError::DeadlineExpired { deadline, now });
		}

		let mut pools = self.pools.write().await;
		let pool = pools
			.get_mut(&pool_id)
			.ok_or(VaultError::UnknownPool(pool_id))?;
		Self::checked_pair(pool, pool_id, asset_in, asset_out)?;

		let amount_out = pool.compute_out(asset_in, amount_in)?;
		if amount_out < limit {
			return Err(VaultError::LimitNotMet {
				limit,
				actual: amount_out,
			});
		}

		if asset_in == pool.token_a {
			pool.balance_a += amount_in;
			pool.balance_b -= amount_out;
		} else {
			pool.balance_b += amount_in;
			pool.balance_a -= amount_out;
		}
		tracing::debug!(%pool_id, %amount_in, %amount_out, "vault swap settled");
		Ok(amount_out)
	}

	async fn quote_swap(
		&self,
		pool_id: B256,
		asset_in: Asset,
		asset_out: Asset,
		amount_in: U256,
	) -> Result<U256, VaultError> {
		let pools = self.pools.read().await;
		let pool = pools
			.get(&pool_id)
			.ok_or(VaultError::UnknownPool(pool_id))?;
		Self::checked_pair(pool, pool_id, asset_in, asset_out)?;
		pool.compute_out(asset_in, amount_in)
	}

	async fn reserves(&self, pool_id: B256) -> Result<(U256, U256), VaultError> {
		let pools = self.pools.read().await;
		let pool = pools
			.get(&pool_id)
			.ok_or(VaultError::UnknownPool(pool_id))?;
		Ok((pool.balance_a, pool.balance_b))
	}
}

/// Configuration schema for the equal-weight vault implementation.
pub struct WeightedVaultSchema;

impl ConfigSchema for WeightedVaultSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let pool_schema = Schema::new(
			vec![
				Field::new("pool_id", FieldType::String),
				Field::new("token_a", FieldType::String),
				Field::new("token_b", FieldType::String),
				Field::new("balance_a", FieldType::String),
				Field::new("balance_b", FieldType::String),
			],
			vec![Field::new(
				"fee_bps",
				FieldType::Integer {
					min: Some(0),
					max: Some(BPS_DENOMINATOR as i64),
				},
			)],
		);
		let schema = Schema::new(
			vec![Field::new("address", FieldType::String)],
			vec![Field::new(
				"pools",
				FieldType::Array(Box::new(FieldType::Table(pool_schema))),
			)],
		);
		schema.validate(config)
	}
}

/// Registry for the equal-weight vault implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "weighted";
	type Factory = VaultFactory;

	fn factory() -> Self::Factory {
		create_vault
	}
}

impl VaultRegistry for Registry {}

/// Factory function for creating the equal-weight vault.
pub fn create_vault(config: &toml::Value) -> Result<Box<dyn VaultInterface>, VaultError> {
	Ok(Box::new(WeightedVault::new(config)?))
}
