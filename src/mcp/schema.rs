//! Structural argument schemas.
//!
//! An [`ObjectSchema`] serializes as a plain JSON Schema object so it can be
//! shown to clients verbatim, and it validates raw call arguments before
//! any handler runs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::trace;

use crate::error::{Error, Result};

/// Primitive type of a schema field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl FieldType {
    /// Check whether a JSON value has this type.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false)
            }
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

/// Schema of a single named field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldSchema {
    pub fn of(field_type: FieldType) -> Self {
        Self {
            field_type,
            ..Default::default()
        }
    }

    pub fn string() -> Self {
        Self::of(FieldType::String)
    }

    pub fn number() -> Self {
        Self::of(FieldType::Number)
    }

    pub fn integer() -> Self {
        Self::of(FieldType::Integer)
    }

    pub fn boolean() -> Self {
        Self::of(FieldType::Boolean)
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Restrict the field to a fixed set of values.
    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Value substituted when the caller omits the field.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    fn check(&self, name: &str, value: &Value) -> Result<()> {
        if !self.field_type.matches(value) {
            return Err(Error::InvalidArgument(format!(
                "field '{}' must be of type {}",
                name,
                self.field_type.as_str()
            )));
        }
        if let Some(allowed) = &self.enum_values {
            if !allowed.contains(value) {
                let listed: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
                return Err(Error::InvalidArgument(format!(
                    "field '{}' must be one of: {}",
                    name,
                    listed.join(", ")
                )));
            }
        }
        Ok(())
    }
}

fn object_type() -> String {
    "object".to_string()
}

/// Schema of an object: named fields plus the subset that is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSchema {
    #[serde(rename = "type", default = "object_type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: BTreeMap<String, FieldSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl Default for ObjectSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectSchema {
    /// An object schema with no fields.
    pub fn new() -> Self {
        Self {
            schema_type: object_type(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    /// Add an optional field.
    pub fn field(mut self, name: impl Into<String>, schema: FieldSchema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Mark a field as required.
    pub fn require(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.required.contains(&name) {
            self.required.push(name);
        }
        self
    }

    /// Add a field and mark it required.
    pub fn required_field(self, name: impl Into<String>, schema: FieldSchema) -> Self {
        let name = name.into();
        self.field(name.clone(), schema).require(name)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Validate raw arguments and return the normalized set.
    ///
    /// Declared fields are type- and enum-checked, absent fields with a
    /// default get the default, and undeclared fields are dropped unless
    /// they are required.
    pub fn validate(&self, args: &Map<String, Value>) -> Result<Map<String, Value>> {
        let mut validated = Map::new();

        // Required but undeclared: presence is the only constraint.
        for name in self.required.iter().filter(|n| !self.properties.contains_key(*n)) {
            let value = args.get(name).ok_or_else(|| {
                Error::InvalidArgument(format!("missing required field '{}'", name))
            })?;
            validated.insert(name.clone(), value.clone());
        }

        for (name, field) in &self.properties {
            match args.get(name) {
                Some(value) => {
                    field.check(name, value)?;
                    validated.insert(name.clone(), value.clone());
                }
                None if self.is_required(name) => {
                    return Err(Error::InvalidArgument(format!(
                        "missing required field '{}'",
                        name
                    )));
                }
                None => {
                    if let Some(default) = &field.default {
                        validated.insert(name.clone(), default.clone());
                    }
                }
            }
        }

        for name in args.keys() {
            if !validated.contains_key(name) {
                trace!("Ignoring undeclared argument: {}", name);
            }
        }

        Ok(validated)
    }

    /// Check that a structured value has this shape.
    pub fn conforms(&self, value: &Value) -> Result<()> {
        let object = value.as_object().ok_or_else(|| {
            Error::InvalidArgument("structured content must be an object".to_string())
        })?;
        self.validate(object).map(|_| ())
    }
}
