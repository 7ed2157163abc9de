//! Utility functions shared across the router crates.

use alloy_primitives::{Address, U256};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Builder fixtures for tests.
#[cfg(any(test, feature = "testing"))]
pub mod builders;

/// Current unix timestamp in seconds.
///
/// This is the ambient clock every deadline is checked against.
pub fn current_timestamp() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}

/// Parses a 0x-prefixed hex address.
pub fn parse_address(value: &str) -> Result<Address, String> {
	Address::from_str(value).map_err(|e| format!("invalid address '{value}': {e}"))
}

/// Parses an amount string.
///
/// Accepts decimal, 0x-prefixed hex, or the literal `max` for the
/// conventional unbounded allowance.
pub fn parse_amount(value: &str) -> Result<U256, String> {
	if value.eq_ignore_ascii_case("max") {
		return Ok(U256::MAX);
	}
	U256::from_str(value).map_err(|e| format!("invalid amount '{value}': {e}"))
}
