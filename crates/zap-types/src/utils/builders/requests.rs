//! Builders for route requests.

use crate::routes::{PoolLegDescriptor, VaultLegDescriptor, ZapInRequest, ZapOutRequest};
use crate::{current_timestamp, Asset};
use alloy_primitives::U256;

/// Builder for `ZapInRequest` values.
#[derive(Debug, Clone)]
pub struct ZapInRequestBuilder {
	pool_leg: PoolLegDescriptor,
	vault_leg: VaultLegDescriptor,
	basket_amounts: Vec<U256>,
	min_output: U256,
	deadline: u64,
}

impl ZapInRequestBuilder {
	/// Starts from the given legs with a zero basket, no minimum, and a
	/// one-hour deadline.
	pub fn new(pool_leg: PoolLegDescriptor, vault_leg: VaultLegDescriptor) -> Self {
		let basket_amounts = vec![U256::ZERO; pool_leg.basket.len()];
		Self {
			pool_leg,
			vault_leg,
			basket_amounts,
			min_output: U256::ZERO,
			deadline: current_timestamp() + 3600,
		}
	}

	/// Sets the amount for one basket member.
	pub fn amount(mut self, index: usize, amount: U256) -> Self {
		self.basket_amounts[index] = amount;
		self
	}

	/// Replaces the whole amount vector.
	pub fn amounts(mut self, amounts: Vec<U256>) -> Self {
		self.basket_amounts = amounts;
		self
	}

	/// Sets the minimum acceptable output.
	pub fn min_output(mut self, min_output: U256) -> Self {
		self.min_output = min_output;
		self
	}

	/// Sets the absolute deadline.
	pub fn deadline(mut self, deadline: u64) -> Self {
		self.deadline = deadline;
		self
	}

	/// Builds the request.
	pub fn build(self) -> ZapInRequest {
		ZapInRequest {
			pool_leg: self.pool_leg,
			basket_amounts: self.basket_amounts,
			vault_leg: self.vault_leg,
			min_output: self.min_output,
			deadline: self.deadline,
		}
	}
}

/// Builder for `ZapOutRequest` values.
#[derive(Debug, Clone)]
pub struct ZapOutRequestBuilder {
	pool_leg: PoolLegDescriptor,
	vault_leg: VaultLegDescriptor,
	principal_amount_in: U256,
	output_index: usize,
	min_output: U256,
	deadline: u64,
}

impl ZapOutRequestBuilder {
	/// Starts from the given legs, targeting basket index 0 with no minimum
	/// and a one-hour deadline.
	pub fn new(pool_leg: PoolLegDescriptor, vault_leg: VaultLegDescriptor) -> Self {
		Self {
			pool_leg,
			vault_leg,
			principal_amount_in: U256::ZERO,
			output_index: 0,
			min_output: U256::ZERO,
			deadline: current_timestamp() + 3600,
		}
	}

	/// Sets the principal amount supplied by the caller.
	pub fn principal_amount(mut self, amount: U256) -> Self {
		self.principal_amount_in = amount;
		self
	}

	/// Targets a basket member by index; the output asset follows the basket.
	pub fn output_index(mut self, index: usize) -> Self {
		self.output_index = index;
		self
	}

	/// Sets the minimum acceptable output.
	pub fn min_output(mut self, min_output: U256) -> Self {
		self.min_output = min_output;
		self
	}

	/// Sets the absolute deadline.
	pub fn deadline(mut self, deadline: u64) -> Self {
		self.deadline = deadline;
		self
	}

	/// Builds the request. The output asset is resolved from the basket so
	/// the index/asset pair stays consistent by construction.
	pub fn build(self) -> ZapOutRequest {
		let output_asset = self
			.pool_leg
			.basket
			.get(self.output_index)
			.copied()
			.unwrap_or(Asset::Native);
		ZapOutRequest {
			pool_leg: self.pool_leg,
			vault_leg: self.vault_leg,
			principal_amount_in: self.principal_amount_in,
			output_asset,
			output_index: self.output_index,
			min_output: self.min_output,
			deadline: self.deadline,
		}
	}
}
