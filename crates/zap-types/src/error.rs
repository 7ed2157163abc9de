//! Router-level error type.
//!
//! Every failure at any leg aborts the entire call; the caller observes a
//! single error and no partial commit. There is no internal retry: after any
//! failure the caller resubmits with adjusted parameters.

use alloy_primitives::U256;
use thiserror::Error;

/// Errors surfaced at the caller-facing boundary of the router.
#[derive(Debug, Error)]
pub enum ZapError {
	/// A permit failed verification or had already expired, or the caller's
	/// allowance does not cover the requested pull.
	#[error("Authorization invalid: {0}")]
	AuthorizationInvalid(String),
	/// Ambient time passed the request deadline before or during a leg.
	#[error("Deadline expired: deadline {deadline}, now {now}")]
	DeadlineExpired {
		/// The request's deadline.
		deadline: u64,
		/// Ambient time at the moment of the check.
		now: u64,
	},
	/// The final or an intermediate amount fell below the caller's minimum.
	#[error("Slippage exceeded: minimum {minimum}, actual {actual}")]
	SlippageExceeded {
		/// Caller-supplied minimum acceptable output.
		minimum: U256,
		/// The amount the route would have delivered.
		actual: U256,
	},
	/// Zero-length, all-zero, or pool-mismatched basket.
	#[error("Invalid basket: {0}")]
	InvalidBasket(String),
	/// An external pool or vault call aborted for its own reasons.
	#[error("Leg execution failed: {0}")]
	LegExecutionFailed(String),
}
