//! Configuration loading for the zap router.
//!
//! A setup is one TOML document naming the router identity, the standing
//! approvals, the pool and vault implementations with their tables, the
//! permit verifier, and the per-route quote tolerances. The document is
//! validated before any service is built: a malformed setup fails here,
//! during the non-concurrent setup phase, never as a per-route error.
//!
//! Implementation tables are kept as raw TOML and handed to the selected
//! implementation's factory, which validates them against its own schema.

use alloy_primitives::{Address, U256};
use std::path::Path;
use thiserror::Error;
use zap_types::{utils, Field, FieldType, RouteKind, Schema, ValidationError};

/// Default per-route quote tolerance in basis points (7.5%).
const DEFAULT_TOLERANCE_BPS: u32 = 750;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The document is not readable or not TOML.
	#[error("Failed to parse config: {0}")]
	Parse(String),
	/// The document does not satisfy the setup schema.
	#[error("Validation error: {0}")]
	Validation(#[from] ValidationError),
	/// A field parsed but carries an unusable value.
	#[error("Invalid config value: {0}")]
	Invalid(String),
}

/// One standing approval installed during setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalEntry {
	/// The token the allowance is drawn on.
	pub asset: Address,
	/// The downstream spender, a pool or the vault.
	pub spender: Address,
	/// Allowance value; `max` in the document means unbounded.
	pub amount: U256,
}

/// A selected implementation and its raw configuration table.
#[derive(Debug, Clone)]
pub struct ImplementationEntry {
	/// Name the implementation registered under.
	pub implementation: String,
	/// The table handed to the implementation's factory.
	pub table: toml::Value,
}

/// Per-route quote tolerances in basis points.
///
/// The tolerance is how far below an estimate a caller-derived minimum is
/// placed; the right value depends on the external pools' fee schedules and
/// differs by route, so it is configuration rather than a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteTolerances {
	pub zap_in_bps: u32,
	pub zap_out_bps: u32,
	pub swap3crv_zap_in_bps: u32,
	pub zap_out_swap3crv_bps: u32,
}

impl Default for RouteTolerances {
	fn default() -> Self {
		Self {
			zap_in_bps: DEFAULT_TOLERANCE_BPS,
			zap_out_bps: DEFAULT_TOLERANCE_BPS,
			swap3crv_zap_in_bps: DEFAULT_TOLERANCE_BPS,
			zap_out_swap3crv_bps: DEFAULT_TOLERANCE_BPS,
		}
	}
}

impl RouteTolerances {
	/// Tolerance for one route shape.
	pub fn for_route(&self, kind: RouteKind) -> u32 {
		match kind {
			RouteKind::ZapIn => self.zap_in_bps,
			RouteKind::ZapOut => self.zap_out_bps,
			RouteKind::Swap3CrvZapIn => self.swap3crv_zap_in_bps,
			RouteKind::ZapOutSwap3Crv => self.zap_out_swap3crv_bps,
		}
	}
}

/// The full router setup.
#[derive(Debug, Clone)]
pub struct Config {
	/// The router's own identity, owner of the standing approvals.
	pub router_address: Address,
	/// Standing approvals installed once during setup.
	pub approvals: Vec<ApprovalEntry>,
	/// Pool leg implementations, one entry per pool.
	pub pools: Vec<ImplementationEntry>,
	/// The vault implementation.
	pub vault: ImplementationEntry,
	/// The permit verifier implementation.
	pub permit: ImplementationEntry,
	/// Per-route quote tolerances.
	pub tolerances: RouteTolerances,
}

impl Config {
	/// Loads and validates a configuration document from a string.
	pub fn from_str(document: &str) -> Result<Self, ConfigError> {
		let value: toml::Value = document
			.parse()
			.map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))?;
		Self::from_value(value)
	}

	/// Loads and validates a configuration document from a file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let document = std::fs::read_to_string(path.as_ref())
			.map_err(|e| ConfigError::Parse(e.to_string()))?;
		Self::from_str(&document)
	}

	fn from_value(value: toml::Value) -> Result<Self, ConfigError> {
		setup_schema().validate(&value)?;

		let router_address = value
			.get("router")
			.and_then(|t| t.get("address"))
			.and_then(|v| v.as_str())
			.ok_or_else(|| ConfigError::Invalid("router.address missing".to_string()))
			.and_then(|raw| utils::parse_address(raw).map_err(ConfigError::Invalid))?;

		let approvals = match value.get("approvals").and_then(|v| v.as_array()) {
			Some(entries) => entries
				.iter()
				.map(parse_approval)
				.collect::<Result<Vec<_>, _>>()?,
			None => Vec::new(),
		};

		let pools = match value.get("pools").and_then(|v| v.as_array()) {
			Some(entries) => entries
				.iter()
				.map(|table| parse_implementation(table, "pools"))
				.collect::<Result<Vec<_>, _>>()?,
			None => Vec::new(),
		};
		if pools.is_empty() {
			return Err(ConfigError::Invalid(
				"at least one pool must be configured".to_string(),
			));
		}

		let vault = value
			.get("vault")
			.map(|table| parse_implementation(table, "vault"))
			.transpose()?
			.ok_or_else(|| ConfigError::Invalid("vault section missing".to_string()))?;

		let permit = value
			.get("permit")
			.map(|table| parse_implementation(table, "permit"))
			.transpose()?
			.ok_or_else(|| ConfigError::Invalid("permit section missing".to_string()))?;

		let tolerances = parse_tolerances(value.get("tolerances"))?;

		Ok(Self {
			router_address,
			approvals,
			pools,
			vault,
			permit,
			tolerances,
		})
	}
}

fn setup_schema() -> Schema {
	let approval_schema = Schema::new(
		vec![
			Field::new("asset", FieldType::String),
			Field::new("spender", FieldType::String),
			Field::new("amount", FieldType::String),
		],
		vec![],
	);
	let tolerance_field = |name: &str| {
		Field::new(
			name,
			FieldType::Integer {
				min: Some(0),
				max: Some(10_000),
			},
		)
	};
	Schema::new(
		vec![Field::new(
			"router",
			FieldType::Table(Schema::new(
				vec![Field::new("address", FieldType::String)],
				vec![],
			)),
		)],
		vec![
			Field::new(
				"approvals",
				FieldType::Array(Box::new(FieldType::Table(approval_schema))),
			),
			Field::new(
				"tolerances",
				FieldType::Table(Schema::new(
					vec![],
					vec![
						tolerance_field("zap_in_bps"),
						tolerance_field("zap_out_bps"),
						tolerance_field("swap3crv_zap_in_bps"),
						tolerance_field("zap_out_swap3crv_bps"),
					],
				)),
			),
		],
	)
}

fn parse_approval(table: &toml::Value) -> Result<ApprovalEntry, ConfigError> {
	let field = |name: &str| -> Result<&str, ConfigError> {
		table
			.get(name)
			.and_then(|v| v.as_str())
			.ok_or_else(|| ConfigError::Invalid(format!("approvals.{name} missing")))
	};
	Ok(ApprovalEntry {
		asset: utils::parse_address(field("asset")?).map_err(ConfigError::Invalid)?,
		spender: utils::parse_address(field("spender")?).map_err(ConfigError::Invalid)?,
		amount: utils::parse_amount(field("amount")?).map_err(ConfigError::Invalid)?,
	})
}

fn parse_implementation(
	table: &toml::Value,
	section: &str,
) -> Result<ImplementationEntry, ConfigError> {
	let implementation = table
		.get("implementation")
		.and_then(|v| v.as_str())
		.ok_or_else(|| ConfigError::Invalid(format!("{section}.implementation missing")))?
		.to_string();
	Ok(ImplementationEntry {
		implementation,
		table: table.clone(),
	})
}

fn parse_tolerances(table: Option<&toml::Value>) -> Result<RouteTolerances, ConfigError> {
	let mut tolerances = RouteTolerances::default();
	let Some(table) = table else {
		return Ok(tolerances);
	};
	let read = |name: &str, default: u32| -> u32 {
		table
			.get(name)
			.and_then(|v| v.as_integer())
			.map(|v| v as u32)
			.unwrap_or(default)
	};
	tolerances.zap_in_bps = read("zap_in_bps", tolerances.zap_in_bps);
	tolerances.zap_out_bps = read("zap_out_bps", tolerances.zap_out_bps);
	tolerances.swap3crv_zap_in_bps = read("swap3crv_zap_in_bps", tolerances.swap3crv_zap_in_bps);
	tolerances.zap_out_swap3crv_bps =
		read("zap_out_swap3crv_bps", tolerances.zap_out_swap3crv_bps);
	Ok(tolerances)
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL: &str = r#"
		[router]
		address = "0x00000000000000000000000000000000000000f0"

		[[approvals]]
		asset = "0x0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a"
		spender = "0x0101010101010101010101010101010101010101"
		amount = "max"

		[[pools]]
		implementation = "stableswap"
		address = "0x0101010101010101010101010101010101010101"

		[vault]
		implementation = "weighted"
		address = "0xba12222222228d8ba445958a75a0704d566bf2c8"

		[permit]
		implementation = "local"

		[tolerances]
		zap_in_bps = 2000
	"#;

	#[test]
	fn minimal_document_loads() {
		let config = Config::from_str(MINIMAL).unwrap();
		assert_eq!(config.approvals.len(), 1);
		assert_eq!(config.approvals[0].amount, U256::MAX);
		assert_eq!(config.pools.len(), 1);
		assert_eq!(config.pools[0].implementation, "stableswap");
		assert_eq!(config.vault.implementation, "weighted");
		assert_eq!(config.permit.implementation, "local");
	}

	#[test]
	fn tolerances_default_and_override() {
		let config = Config::from_str(MINIMAL).unwrap();
		assert_eq!(config.tolerances.for_route(RouteKind::ZapIn), 2000);
		assert_eq!(
			config.tolerances.for_route(RouteKind::ZapOut),
			DEFAULT_TOLERANCE_BPS
		);
	}

	#[test]
	fn missing_router_section_is_rejected() {
		let result = Config::from_str("[[pools]]\nimplementation = \"stableswap\"");
		assert!(result.is_err());
	}

	#[test]
	fn missing_pools_are_rejected() {
		let document = r#"
			[router]
			address = "0x00000000000000000000000000000000000000f0"

			[vault]
			implementation = "weighted"

			[permit]
			implementation = "local"
		"#;
		let result = Config::from_str(document);
		assert!(matches!(result, Err(ConfigError::Invalid(_))));
	}

	#[test]
	fn bad_tolerance_bounds_are_rejected() {
		let document = MINIMAL.replace("zap_in_bps = 2000", "zap_in_bps = 20000");
		assert!(Config::from_str(&document).is_err());
	}
}
