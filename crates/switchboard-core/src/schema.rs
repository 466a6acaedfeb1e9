//! Input Schemas
//!
//! Structural contracts for tool arguments and handoff payloads. The same
//! schema documents the input for the model and validates it at runtime.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON type of a parameter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }

    pub const fn as_str(self) -> &'static str {
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

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter definition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON type
    #[serde(rename = "type")]
    pub param_type: ParamType,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Default value if not provided
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Enum of allowed values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl ParameterSchema {
    pub fn required(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: true,
            default: None,
            enum_values: None,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    #[must_use]
    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }
}

/// One reason an input failed validation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaViolation {
    /// Input is not a JSON object
    NotAnObject,
    /// Required field absent
    MissingField(String),
    /// Field present with the wrong JSON type
    WrongType {
        field: String,
        expected: ParamType,
    },
    /// Field value outside its enum
    NotInEnum { field: String },
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "input must be a JSON object"),
            Self::MissingField(field) => write!(f, "missing required field '{field}'"),
            Self::WrongType { field, expected } => {
                write!(f, "field '{field}' must be of type {expected}")
            }
            Self::NotInEnum { field } => write!(f, "field '{field}' is not an allowed value"),
        }
    }
}

/// Structural contract for a JSON object input
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InputSchema {
    pub parameters: Vec<ParameterSchema>,
}

impl InputSchema {
    pub fn new(parameters: Vec<ParameterSchema>) -> Self {
        Self { parameters }
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Validate raw input, applying defaults for absent optional fields.
    ///
    /// `null` is accepted as an empty object. Unknown fields pass through.
    pub fn validate(&self, raw: &Value) -> Result<ValidatedArgs, Vec<SchemaViolation>> {
        let mut map = match raw {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            _ => return Err(vec![SchemaViolation::NotAnObject]),
        };

        let mut violations = Vec::new();
        for param in &self.parameters {
            match map.get(&param.name) {
                None | Some(Value::Null) => {
                    if let Some(default) = &param.default {
                        map.insert(param.name.clone(), default.clone());
                    } else if param.required {
                        violations.push(SchemaViolation::MissingField(param.name.clone()));
                    }
                }
                Some(value) if !param.param_type.matches(value) => {
                    violations.push(SchemaViolation::WrongType {
                        field: param.name.clone(),
                        expected: param.param_type,
                    });
                }
                Some(value) => {
                    if let Some(allowed) = &param.enum_values {
                        if !allowed.contains(value) {
                            violations.push(SchemaViolation::NotInEnum {
                                field: param.name.clone(),
                            });
                        }
                    }
                }
            }
        }

        if violations.is_empty() {
            Ok(ValidatedArgs(map))
        } else {
            Err(violations)
        }
    }

    /// JSON Schema rendering for providers with native function calling
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in &self.parameters {
            let mut prop = Map::new();
            prop.insert("type".into(), Value::String(param.param_type.as_str().into()));
            prop.insert("description".into(), Value::String(param.description.clone()));
            if let Some(values) = &param.enum_values {
                prop.insert("enum".into(), Value::Array(values.clone()));
            }
            if let Some(default) = &param.default {
                prop.insert("default".into(), default.clone());
            }
            properties.insert(param.name.clone(), Value::Object(prop));
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Input that passed schema validation
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidatedArgs(Map<String, Value>);

impl ValidatedArgs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(Value::as_f64)
    }

    /// Deserialize into a typed value
    pub fn parse<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(Value::Object(self.0.clone()))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn add_schema() -> InputSchema {
        InputSchema::new(vec![
            ParameterSchema::required("a", ParamType::Number, "first"),
            ParameterSchema::required("b", ParamType::Number, "second"),
            ParameterSchema::optional("unit", ParamType::String, "unit")
                .with_default(json!("none"))
                .with_enum(vec![json!("none"), json!("cm")]),
        ])
    }

    #[test]
    fn test_valid_input_gets_defaults() {
        let args = add_schema().validate(&json!({"a": 2, "b": 3.5})).unwrap();
        assert_eq!(args.get_f64("a"), Some(2.0));
        assert_eq!(args.get_str("unit"), Some("none"));
    }

    #[test]
    fn test_collects_every_violation() {
        let violations = add_schema()
            .validate(&json!({"a": "two", "unit": "km"}))
            .unwrap_err();
        assert_eq!(
            violations,
            vec![
                SchemaViolation::WrongType {
                    field: "a".into(),
                    expected: ParamType::Number
                },
                SchemaViolation::MissingField("b".into()),
                SchemaViolation::NotInEnum {
                    field: "unit".into()
                },
            ]
        );
    }

    #[test]
    fn test_non_object_rejected() {
        assert_eq!(
            add_schema().validate(&json!([1, 2])).unwrap_err(),
            vec![SchemaViolation::NotAnObject]
        );
        assert!(InputSchema::default().validate(&Value::Null).is_ok());
    }

    #[test]
    fn test_integer_is_strict() {
        let schema = InputSchema::new(vec![ParameterSchema::required(
            "n",
            ParamType::Integer,
            "count",
        )]);
        assert!(schema.validate(&json!({"n": 3})).is_ok());
        assert!(schema.validate(&json!({"n": 3.5})).is_err());
    }

    #[test]
    fn test_typed_parse() {
        #[derive(Deserialize)]
        struct Add {
            a: f64,
            b: f64,
        }
        let args = add_schema().validate(&json!({"a": 1, "b": 2})).unwrap();
        let add: Add = args.parse().unwrap();
        assert!((add.a + add.b - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_json_schema_rendering() {
        let rendered = add_schema().to_json_schema();
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["required"], json!(["a", "b"]));
        assert_eq!(rendered["properties"]["unit"]["enum"], json!(["none", "cm"]));
    }
}
