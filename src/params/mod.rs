//! Typed parameter declaration and value conversion.
//!
//! Connectors declare the parameters they accept (connection-level
//! credentials and invocation-level inputs) up front in a [`ParamSet`],
//! then read raw, untyped input mappings through [`ParamSpec::read_value`].
//! Conversion either yields a value of the declared type or fails with a
//! descriptive [`ParamError`] before any network call is made.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;


/// Raw input mapping as supplied by the hosting platform.
pub type RawInputs = Map<String, Value>;

/// Primitive data type a declared parameter converts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Int,
    Float,
    Bool,
    Json,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::String => "string",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Bool => "bool",
            DataType::Json => "json",
        };
        write!(f, "{}", name)
    }
}

/// Conversion errors for parameter reads.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamError {
    /// A required parameter was absent from the input mapping.
    Missing { name: String },
    /// A parameter was present but could not be converted to its type.
    Conversion {
        name: String,
        raw: String,
        target: DataType,
    },
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::Missing { name } => {
                write!(f, "Missing required parameter: {}", name)
            }
            ParamError::Conversion { name, raw, target } => {
                write!(
                    f,
                    "Could not convert parameter '{}' value {} to {}",
                    name, raw, target
                )
            }
        }
    }
}

impl std::error::Error for ParamError {}

/// A single declared parameter: name, description, optionality, type.
///
/// Immutable once declared. The name is the lookup key into the raw input
/// mapping and must be unique within its [`ParamSet`].
#[derive(Clone, Debug)]
pub struct ParamSpec {
    name: String,
    description: String,
    optional: bool,
    data_type: DataType,
}

impl ParamSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Looks this parameter up in a raw input mapping and converts it.
    ///
    /// - Absent and required: `ParamError::Missing`
    /// - Absent and optional: [`ParamValue::Absent`] (distinct from any
    ///   zero/empty value, so callers can tell "not provided" apart from
    ///   "provided as empty")
    /// - Present: converted per the declared [`DataType`]
    pub fn read_value(&self, inputs: &RawInputs) -> Result<ParamValue, ParamError> {
        match inputs.get(&self.name) {
            None => {
                if self.optional {
                    Ok(ParamValue::Absent)
                } else {
                    Err(ParamError::Missing {
                        name: self.name.clone(),
                    })
                }
            }
            Some(raw) => convert_value(&self.name, raw, self.data_type),
        }
    }

    /// Convenience for required string parameters: reads and unwraps the
    /// converted text.
    pub fn read_string(&self, inputs: &RawInputs) -> Result<String, ParamError> {
        let value = self.read_value(inputs)?;
        match value {
            ParamValue::Str(s) => Ok(s),
            other => Err(ParamError::Conversion {
                name: self.name.clone(),
                raw: other.to_raw_string(),
                target: DataType::String,
            }),
        }
    }
}

/// Declares the full set of parameters one connector contract accepts.
///
/// Replaces the "global constants referenced by name" pattern: the set is an
/// explicit, constructed object passed into each operation.
#[derive(Clone, Debug, Default)]
pub struct ParamSet {
    specs: Vec<ParamSpec>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self { specs: Vec::new() }
    }

    /// Registers a parameter and returns its spec.
    ///
    /// # Panics
    /// Panics if `name` is already declared in this set. Contracts are built
    /// once at connector start, so a duplicate name is a programming error,
    /// not a runtime condition.
    pub fn declare(
        &mut self,
        name: &str,
        data_type: DataType,
        optional: bool,
        description: &str,
    ) -> ParamSpec {
        assert!(
            !self.specs.iter().any(|s| s.name == name),
            "duplicate parameter declaration: {}",
            name
        );
        let spec = ParamSpec {
            name: name.to_string(),
            description: description.to_string(),
            optional,
            data_type,
        };
        self.specs.push(spec.clone());
        spec
    }

    /// Shorthand for `declare(name, data_type, false, description)`.
    pub fn required(&mut self, name: &str, data_type: DataType, description: &str) -> ParamSpec {
        self.declare(name, data_type, false, description)
    }

    /// Shorthand for `declare(name, data_type, true, description)`.
    pub fn optional(&mut self, name: &str, data_type: DataType, description: &str) -> ParamSpec {
        self.declare(name, data_type, true, description)
    }

    /// Returns a declared spec by name.
    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// All declared specs, in declaration order.
    pub fn specs(&self) -> &[ParamSpec] {
        &self.specs
    }
}

/// A converted parameter value.
///
/// `Absent` marks an optional parameter that was not provided at all.
/// `Passthrough` carries structured values read under `String`/`Json`
/// declarations unchanged.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Absent,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Json(Value),
}

impl ParamValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, ParamValue::Absent)
    }

    /// Returns the text of a `Str` value, or `None` for anything else.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(f) => Some(*f),
            ParamValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Converts into a `serde_json::Value` for payload building.
    /// `Absent` becomes `Value::Null`.
    pub fn into_json(self) -> Value {
        match self {
            ParamValue::Absent => Value::Null,
            ParamValue::Str(s) => Value::String(s),
            ParamValue::Int(n) => Value::from(n),
            ParamValue::Float(f) => Value::from(f),
            ParamValue::Bool(b) => Value::Bool(b),
            ParamValue::Json(v) => v,
        }
    }

    fn to_raw_string(&self) -> String {
        match self {
            ParamValue::Absent => "<absent>".to_string(),
            ParamValue::Str(s) => s.clone(),
            other => format!("{:?}", other),
        }
    }
}

/// Converts one raw value according to the declared data type.
///
/// Conversion is idempotent: a value already of the declared type passes
/// through unchanged.
pub fn convert_value(name: &str, raw: &Value, data_type: DataType) -> Result<ParamValue, ParamError> {
    let fail = || ParamError::Conversion {
        name: name.to_string(),
        raw: raw.to_string(),
        target: data_type,
    };

    match data_type {
        DataType::String => match raw {
            Value::String(s) => Ok(ParamValue::Str(s.clone())),
            // Non-string raws pass through unchanged under a string
            // declaration, matching the contract's no-op behavior.
            other => Ok(ParamValue::Json(other.clone())),
        },
        DataType::Int => match raw {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(ParamValue::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(ParamValue::Int(f.trunc() as i64))
                } else {
                    Err(fail())
                }
            }
            Value::String(s) => s.trim().parse::<i64>().map(ParamValue::Int).map_err(|_| fail()),
            Value::Bool(b) => Ok(ParamValue::Int(*b as i64)),
            _ => Err(fail()),
        },
        DataType::Float => match raw {
            Value::Number(n) => n.as_f64().map(ParamValue::Float).ok_or_else(fail),
            Value::String(s) => s.trim().parse::<f64>().map(ParamValue::Float).map_err(|_| fail()),
            Value::Bool(b) => Ok(ParamValue::Float(*b as i64 as f64)),
            _ => Err(fail()),
        },
        DataType::Bool => Ok(ParamValue::Bool(truthy(raw))),
        DataType::Json => match raw {
            Value::String(s) => serde_json::from_str::<Value>(s)
                .map(ParamValue::Json)
                .map_err(|_| fail()),
            // Already structured: pass through unchanged.
            other => Ok(ParamValue::Json(other.clone())),
        },
    }
}

/// Truthiness coercion for bool parameters.
///
/// Strings compare case-insensitively against "true"; any other string is
/// false. Non-string values coerce: null is false, numbers by non-zero,
/// arrays/objects by non-emptiness.
fn truthy(raw: &Value) -> bool {
    match raw {
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
