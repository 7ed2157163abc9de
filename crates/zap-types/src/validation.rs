//! Configuration validation framework.
//!
//! Setups are described in TOML and validated before any service is built.
//! Each implementation publishes a schema for its own configuration table so
//! a malformed setup fails fast, during the non-concurrent setup phase, and
//! never as a per-route error.

use thiserror::Error;

/// Errors produced while validating a configuration table.
#[derive(Debug, Error)]
pub enum ValidationError {
	/// A required field is absent.
	#[error("Missing required field: {0}")]
	MissingField(String),
	/// A field is present but carries an unacceptable value.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue {
		field: String,
		message: String,
	},
	/// A field has the wrong TOML type.
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// The TOML type expected for a field.
#[derive(Debug)]
pub enum FieldType {
	/// A string value.
	String,
	/// An integer with optional inclusive bounds.
	Integer {
		min: Option<i64>,
		max: Option<i64>,
	},
	/// A boolean value.
	Boolean,
	/// An array whose elements all share one type.
	Array(Box<FieldType>),
	/// A nested table with its own schema.
	Table(Schema),
}

/// Custom validator run after type checking passes.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// One field of a schema.
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	/// Creates a field expecting the given TOML type.
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Attaches a custom validator run after the type check.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}
}

/// A set of required and optional fields describing one table.
#[derive(Debug, Default)]
pub struct Schema {
	required: Vec<Field>,
	optional: Vec<Field>,
}

impl Schema {
	/// Creates a schema from required and optional field lists.
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML table against this schema.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config.as_table().ok_or_else(|| ValidationError::TypeMismatch {
			field: "<root>".to_string(),
			expected: "table".to_string(),
			actual: type_name(config).to_string(),
		})?;

		for field in &self.required {
			match table.get(&field.name) {
				Some(value) => validate_field(field, value)?,
				None => return Err(ValidationError::MissingField(field.name.clone())),
			}
		}
		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				validate_field(field, value)?;
			}
		}
		Ok(())
	}
}

fn validate_field(field: &Field, value: &toml::Value) -> Result<(), ValidationError> {
	check_type(&field.name, &field.field_type, value)?;
	if let Some(validator) = &field.validator {
		validator(value).map_err(|message| ValidationError::InvalidValue {
			field: field.name.clone(),
			message,
		})?;
	}
	Ok(())
}

fn check_type(name: &str, expected: &FieldType, value: &toml::Value) -> Result<(), ValidationError> {
	let mismatch = |expected: &str| ValidationError::TypeMismatch {
		field: name.to_string(),
		expected: expected.to_string(),
		actual: type_name(value).to_string(),
	};
	match expected {
		FieldType::String => {
			value.as_str().ok_or_else(|| mismatch("string"))?;
		}
		FieldType::Boolean => {
			value.as_bool().ok_or_else(|| mismatch("boolean"))?;
		}
		FieldType::Integer { min, max } => {
			let int = value.as_integer().ok_or_else(|| mismatch("integer"))?;
			if let Some(min) = min {
				if int < *min {
					return Err(ValidationError::InvalidValue {
						field: name.to_string(),
						message: format!("{int} is below the minimum {min}"),
					});
				}
			}
			if let Some(max) = max {
				if int > *max {
					return Err(ValidationError::InvalidValue {
						field: name.to_string(),
						message: format!("{int} is above the maximum {max}"),
					});
				}
			}
		}
		FieldType::Array(element) => {
			let items = value.as_array().ok_or_else(|| mismatch("array"))?;
			for (index, item) in items.iter().enumerate() {
				check_type(&format!("{name}[{index}]"), element, item)?;
			}
		}
		FieldType::Table(schema) => {
			schema.validate(value)?;
		}
	}
	Ok(())
}

fn type_name(value: &toml::Value) -> &'static str {
	match value {
		toml::Value::String(_) => "string",
		toml::Value::Integer(_) => "integer",
		toml::Value::Float(_) => "float",
		toml::Value::Boolean(_) => "boolean",
		toml::Value::Datetime(_) => "datetime",
		toml::Value::Array(_) => "array",
		toml::Value::Table(_) => "table",
	}
}

/// Schema hook implemented by every configurable component.
pub trait ConfigSchema: Send + Sync {
	/// Validates the component's configuration table.
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(toml_str: &str) -> toml::Value {
		toml_str.parse().unwrap()
	}

	#[test]
	fn missing_required_field_is_reported() {
		let schema = Schema::new(vec![Field::new("address", FieldType::String)], vec![]);
		let err = schema.validate(&parse("fee_bps = 4")).unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(name) if name == "address"));
	}

	#[test]
	fn integer_bounds_are_enforced() {
		let schema = Schema::new(
			vec![Field::new(
				"fee_bps",
				FieldType::Integer {
					min: Some(0),
					max: Some(10_000),
				},
			)],
			vec![],
		);
		assert!(schema.validate(&parse("fee_bps = 30")).is_ok());
		assert!(schema.validate(&parse("fee_bps = 20000")).is_err());
	}

	#[test]
	fn array_elements_are_type_checked() {
		let schema = Schema::new(
			vec![Field::new(
				"assets",
				FieldType::Array(Box::new(FieldType::String)),
			)],
			vec![],
		);
		assert!(schema.validate(&parse("assets = [\"0xaa\", \"0xbb\"]")).is_ok());
		assert!(schema.validate(&parse("assets = [1, 2]")).is_err());
	}

	#[test]
	fn custom_validator_runs_after_type_check() {
		let schema = Schema::new(
			vec![
				Field::new("address", FieldType::String).with_validator(|value| {
					let s = value.as_str().unwrap_or_default();
					if s.starts_with("0x") {
						Ok(())
					} else {
						Err("must be 0x-prefixed".to_string())
					}
				}),
			],
			vec![],
		);
		assert!(schema.validate(&parse("address = \"0xabc\"")).is_ok());
		assert!(schema.validate(&parse("address = \"abc\"")).is_err());
	}
}
