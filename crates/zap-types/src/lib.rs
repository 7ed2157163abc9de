//! Common types module for the zap router system.
//!
//! This module defines the core data types and structures shared by every
//! component of the router: assets, leg descriptors, route requests, permit
//! authorizations, the router-level error type, and the configuration
//! validation framework. Keeping them in one crate ensures the leg adapters,
//! the estimator, and the orchestrator all speak the same vocabulary.

/// Asset identifiers for native currency and ERC-20 style tokens.
pub mod asset;
/// Router-level error type surfaced at the caller boundary.
pub mod error;
/// Permit authorization types for one-shot allowance grants.
pub mod permit;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Route shapes, leg descriptors, and per-call request structures.
pub mod routes;
/// Utility functions and test fixtures.
pub mod utils;
/// Configuration validation framework for TOML-backed setups.
pub mod validation;

pub use asset::{Asset, NATIVE_ASSET_SENTINEL};
pub use error::ZapError;
pub use permit::{PermitAuthorization, PermitGrant, PermitKind};
pub use registry::ImplementationRegistry;
pub use routes::{
	BasketExitLeg, BasketJoinLeg, PoolLegDescriptor, RouteKind, VaultLegDescriptor, ZapInRequest,
	ZapOutRequest,
};
pub use utils::current_timestamp;
pub use validation::{ConfigSchema, Field, FieldType, Schema, ValidationError};
