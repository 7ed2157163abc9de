//! Allowance registry for the zap router.
//!
//! One process-wide table of (owner, asset, spender) allowances. The
//! router's own standing approvals toward downstream pools and the vault are
//! installed once, during the non-concurrent setup phase, and only read
//! while routes execute. Caller-to-router allowances enter through permits
//! or an out-of-band approve and are consumed as routes settle.
//!
//! The conventional `U256::MAX` allowance is unbounded: it satisfies any
//! pull and is never decremented.

use alloy_primitives::{Address, U256};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors that can occur during allowance bookkeeping.
#[derive(Debug, Error)]
pub enum ApprovalError {
	/// The batch operation's vectors disagree in length.
	#[error("Approval batch shape mismatch: {0}")]
	BatchMismatch(String),
	/// A consumption exceeds the standing allowance.
	#[error("Allowance of {available} for asset {asset} from {owner} to {spender} cannot cover {required}")]
	Insufficient {
		owner: Address,
		asset: Address,
		spender: Address,
		required: U256,
		available: U256,
	},
}

/// In-memory allowance book keyed by (owner, asset, spender).
pub struct ApprovalManager {
	allowances: RwLock<HashMap<(Address, Address, Address), U256>>,
}

impl Default for ApprovalManager {
	fn default() -> Self {
		Self::new()
	}
}

impl ApprovalManager {
	/// Creates an empty allowance book.
	pub fn new() -> Self {
		Self {
			allowances: RwLock::new(HashMap::new()),
		}
	}

	/// Sets the allowance for one (owner, asset, spender) triple.
	///
	/// Overwrite semantics, matching a token approve call.
	pub async fn grant(&self, owner: Address, asset: Address, spender: Address, value: U256) {
		let mut allowances = self.allowances.write().await;
		allowances.insert((owner, asset, spender), value);
	}

	/// Current allowance for one (owner, asset, spender) triple.
	pub async fn allowance(&self, owner: Address, asset: Address, spender: Address) -> U256 {
		let allowances = self.allowances.read().await;
		allowances
			.get(&(owner, asset, spender))
			.copied()
			.unwrap_or(U256::ZERO)
	}

	/// Consumes part of an allowance, as a settled transfer does.
	///
	/// An unbounded allowance is left untouched.
	pub async fn consume(
		&self,
		owner: Address,
		asset: Address,
		spender: Address,
		amount: U256,
	) -> Result<(), ApprovalError> {
		let mut allowances = self.allowances.write().await;
		let entry = allowances
			.entry((owner, asset, spender))
			.or_insert(U256::ZERO);
		if *entry == U256::MAX {
			return Ok(());
		}
		if *entry < amount {
			return Err(ApprovalError::Insufficient {
				owner,
				asset,
				spender,
				required: amount,
				available: *entry,
			});
		}
		*entry -= amount;
		Ok(())
	}

	/// Batch "set many allowances" used once during setup.
	///
	/// A shape mismatch is fatal to setup, never to an individual route.
	pub async fn set_approvals_for(
		&self,
		owner: Address,
		assets: &[Address],
		spenders: &[Address],
		amounts: &[U256],
	) -> Result<(), ApprovalError> {
		if assets.len() != spenders.len() || assets.len() != amounts.len() {
			return Err(ApprovalError::BatchMismatch(format!(
				"{} assets, {} spenders, {} amounts",
				assets.len(),
				spenders.len(),
				amounts.len()
			)));
		}
		let mut allowances = self.allowances.write().await;
		for ((asset, spender), amount) in assets.iter().zip(spenders).zip(amounts) {
			allowances.insert((owner, *asset, *spender), *amount);
		}
		tracing::info!(count = assets.len(), %owner, "standing approvals installed");
		Ok(())
	}
}
