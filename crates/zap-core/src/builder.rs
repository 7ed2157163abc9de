//! Router assembly from configuration.
//!
//! Resolves the configured implementation names through each crate's
//! registry, builds the leg services, installs the standing approvals, and
//! hands back a ready router. Everything here runs during the
//! non-concurrent setup phase; any failure is fatal to setup and no route
//! is accepted before it completes.

use crate::engine::approvals::{ApprovalError, ApprovalManager};
use crate::engine::ZapRouter;
use alloy_primitives::{Address, U256};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use zap_config::Config;
use zap_permit::{PermitError, PermitService};
use zap_pool::{PoolError, PoolInterface, PoolService};
use zap_vault::{VaultError, VaultService};

/// Errors that can occur while assembling a router.
#[derive(Debug, Error)]
pub enum SetupError {
	/// The configuration document is unusable.
	#[error("Configuration error: {0}")]
	Config(#[from] zap_config::ConfigError),
	/// No implementation is registered under the configured name.
	#[error("Unknown {section} implementation '{name}'")]
	UnknownImplementation {
		section: &'static str,
		name: String,
	},
	/// A pool implementation rejected its configuration.
	#[error("Pool setup failed: {0}")]
	Pool(#[from] PoolError),
	/// The vault implementation rejected its configuration.
	#[error("Vault setup failed: {0}")]
	Vault(#[from] VaultError),
	/// The permit implementation rejected its configuration.
	#[error("Permit setup failed: {0}")]
	Permit(#[from] PermitError),
	/// Installing the standing approvals failed.
	#[error("Approval setup failed: {0}")]
	Approval(#[from] ApprovalError),
	/// Two pool entries share one address.
	#[error("Duplicate pool address {0}")]
	DuplicatePool(Address),
}

/// Builds a router from a validated configuration.
pub async fn build_router(config: &Config) -> Result<ZapRouter, SetupError> {
	let pool_factories: HashMap<&str, zap_pool::PoolFactory> =
		zap_pool::get_all_implementations().into_iter().collect();
	let mut pools: HashMap<Address, Arc<dyn PoolInterface>> = HashMap::new();
	for entry in &config.pools {
		let factory = pool_factories
			.get(entry.implementation.as_str())
			.ok_or_else(|| SetupError::UnknownImplementation {
				section: "pool",
				name: entry.implementation.clone(),
			})?;
		let implementation = factory(&entry.table)?;
		let address = implementation.descriptor().pool;
		if pools.insert(address, Arc::from(implementation)).is_some() {
			return Err(SetupError::DuplicatePool(address));
		}
	}
	let pools = Arc::new(PoolService::new(pools));

	let vault_factories: HashMap<&str, zap_vault::VaultFactory> =
		zap_vault::get_all_implementations().into_iter().collect();
	let vault_factory = vault_factories
		.get(config.vault.implementation.as_str())
		.ok_or_else(|| SetupError::UnknownImplementation {
			section: "vault",
			name: config.vault.implementation.clone(),
		})?;
	let vault = Arc::new(VaultService::new(vault_factory(&config.vault.table)?));

	let permit_factories: HashMap<&str, zap_permit::PermitFactory> =
		zap_permit::get_all_implementations().into_iter().collect();
	let permit_factory = permit_factories
		.get(config.permit.implementation.as_str())
		.ok_or_else(|| SetupError::UnknownImplementation {
			section: "permit",
			name: config.permit.implementation.clone(),
		})?;
	let permits = Arc::new(PermitService::new(permit_factory(&config.permit.table)?));

	let approvals = Arc::new(ApprovalManager::new());
	let router = ZapRouter::new(config.router_address, pools, vault, permits, approvals);

	let assets: Vec<Address> = config.approvals.iter().map(|entry| entry.asset).collect();
	let spenders: Vec<Address> = config.approvals.iter().map(|entry| entry.spender).collect();
	let amounts: Vec<U256> = config.approvals.iter().map(|entry| entry.amount).collect();
	router.set_approvals_for(&assets, &spenders, &amounts).await?;

	tracing::info!(
		pools = config.pools.len(),
		approvals = config.approvals.len(),
		"router assembled"
	);
	Ok(router)
}
