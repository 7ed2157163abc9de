//! Core orchestration for the zap router system.
//!
//! This crate composes the leg adapters into the four supported route
//! shapes, enforces the per-call transactional contract, and owns the
//! process-wide approval registry. Callers reach the system exclusively
//! through [`ZapRouter`]: read-only estimates first, then the matching
//! state-changing operation with a fresh deadline and minimum.

/// Router assembly from configuration.
pub mod builder;
/// The orchestrator engine and approval registry.
pub mod engine;

pub use builder::{build_router, SetupError};
pub use engine::approvals::{ApprovalError, ApprovalManager};
pub use engine::ZapRouter;
