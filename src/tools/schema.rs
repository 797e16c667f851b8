//! Argument validation from declared tool schemas
//!
//! Translates a capability's JSON-Schema-like parameter declaration into a
//! rule table checked before any call frame is sent. Validation failures are
//! values, not faults: they are surfaced to the model as tool-result text so
//! it can correct itself.

use serde_json::{Map, Value};
use thiserror::Error;

/// Value kind accepted for an argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    Text,
    Integer,
    Number,
    Boolean,
    List,
    Map,
}

impl ArgumentKind {
    /// Map a declared schema type to an argument kind
    ///
    /// Unknown or absent types default to text.
    fn from_declared(declared: Option<&str>) -> Self {
        match declared {
            Some("integer") => ArgumentKind::Integer,
            Some("number") => ArgumentKind::Number,
            Some("boolean") => ArgumentKind::Boolean,
            Some("array") => ArgumentKind::List,
            Some("object") => ArgumentKind::Map,
            _ => ArgumentKind::Text,
        }
    }

    /// Whether the supplied value matches this kind
    fn matches(&self, value: &Value) -> bool {
        match self {
            ArgumentKind::Text => value.is_string(),
            ArgumentKind::Integer => value.is_i64() || value.is_u64(),
            ArgumentKind::Number => value.is_number(),
            ArgumentKind::Boolean => value.is_boolean(),
            ArgumentKind::List => value.is_array(),
            ArgumentKind::Map => value.is_object(),
        }
    }
}

impl std::fmt::Display for ArgumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgumentKind::Text => write!(f, "a string"),
            ArgumentKind::Integer => write!(f, "an integer"),
            ArgumentKind::Number => write!(f, "a number"),
            ArgumentKind::Boolean => write!(f, "a boolean"),
            ArgumentKind::List => write!(f, "an array"),
            ArgumentKind::Map => write!(f, "an object"),
        }
    }
}

/// Declarative rule for one argument
#[derive(Debug, Clone)]
pub struct ArgumentRule {
    pub name: String,
    pub kind: ArgumentKind,
    pub required: bool,
    pub description: String,
}

/// A rejected argument set, described well enough for the model to retry
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("missing required argument '{name}' for tool {tool}")]
    MissingRequired { tool: String, name: String },

    #[error("argument '{name}' for tool {tool} must be {expected}")]
    WrongKind {
        tool: String,
        name: String,
        expected: String,
    },

    #[error("unexpected argument '{name}' for tool {tool}")]
    Unexpected { tool: String, name: String },
}

/// Validates call arguments against a tool's declared schema
#[derive(Debug, Clone)]
pub struct ArgumentValidator {
    tool_name: String,
    rules: Vec<ArgumentRule>,
}

/// Build a validator from a capability's declared parameter schema
pub fn translate(name: &str, schema: &Value) -> ArgumentValidator {
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let rules = schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|properties| {
            properties
                .iter()
                .map(|(property, declaration)| ArgumentRule {
                    name: property.clone(),
                    kind: ArgumentKind::from_declared(
                        declaration.get("type").and_then(Value::as_str),
                    ),
                    required: required.contains(&property.as_str()),
                    description: declaration
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    ArgumentValidator {
        tool_name: name.to_string(),
        rules,
    }
}

impl ArgumentValidator {
    /// Check the supplied arguments against the rule table
    ///
    /// Returns the arguments to send: declared, present, and of the right
    /// kind. Optional arguments that are absent (or explicitly null) are
    /// omitted rather than forwarded as null.
    pub fn validate(&self, arguments: &Map<String, Value>) -> Result<Map<String, Value>, ArgumentError> {
        for name in arguments.keys() {
            if !self.rules.iter().any(|rule| rule.name == *name) {
                return Err(ArgumentError::Unexpected {
                    tool: self.tool_name.clone(),
                    name: name.clone(),
                });
            }
        }

        let mut validated = Map::new();
        for rule in &self.rules {
            match arguments.get(&rule.name).filter(|value| !value.is_null()) {
                None => {
                    if rule.required {
                        return Err(ArgumentError::MissingRequired {
                            tool: self.tool_name.clone(),
                            name: rule.name.clone(),
                        });
                    }
                }
                Some(value) => {
                    if !rule.kind.matches(value) {
                        return Err(ArgumentError::WrongKind {
                            tool: self.tool_name.clone(),
                            name: rule.name.clone(),
                            expected: rule.kind.to_string(),
                        });
                    }
                    validated.insert(rule.name.clone(), value.clone());
                }
            }
        }
        Ok(validated)
    }

    pub fn rules(&self) -> &[ArgumentRule] {
        &self.rules
    }

    /// Whether this tool accepts no arguments at all
    pub fn accepts_no_arguments(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "sql": {"type": "string", "description": "SQL to run"},
                "limit": {"type": "integer", "description": "Row cap"},
                "explain": {"type": "boolean"}
            },
            "required": ["sql"]
        })
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_empty_schema_accepts_no_arguments() {
        let validator = translate("list_tables", &json!({}));
        assert!(validator.accepts_no_arguments());
        assert!(validator.validate(&Map::new()).is_ok());

        let err = validator.validate(&args(json!({"surprise": 1}))).unwrap_err();
        assert!(matches!(err, ArgumentError::Unexpected { .. }));
    }

    #[test]
    fn test_missing_required_argument_is_named() {
        let validator = translate("query", &query_schema());
        let err = validator.validate(&args(json!({"limit": 5}))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing required argument 'sql' for tool query"
        );
    }

    #[test]
    fn test_wrong_kind_is_named() {
        let validator = translate("query", &query_schema());
        let err = validator
            .validate(&args(json!({"sql": "select 1", "limit": "five"})))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument 'limit' for tool query must be an integer"
        );
    }

    #[test]
    fn test_valid_arguments_pass_through() {
        let validator = translate("query", &query_schema());
        let validated = validator
            .validate(&args(json!({"sql": "select 1", "limit": 10})))
            .unwrap();
        assert_eq!(validated.get("sql"), Some(&json!("select 1")));
        assert_eq!(validated.get("limit"), Some(&json!(10)));
    }

    #[test]
    fn test_optional_absent_or_null_is_omitted() {
        let validator = translate("query", &query_schema());
        let validated = validator
            .validate(&args(json!({"sql": "select 1", "limit": null})))
            .unwrap();
        assert!(!validated.contains_key("limit"));
        assert!(!validated.contains_key("explain"));
    }

    #[test]
    fn test_required_null_counts_as_missing() {
        let validator = translate("query", &query_schema());
        let err = validator.validate(&args(json!({"sql": null}))).unwrap_err();
        assert!(matches!(err, ArgumentError::MissingRequired { .. }));
    }

    #[test]
    fn test_unknown_declared_type_defaults_to_text() {
        let schema = json!({
            "properties": {"odd": {"type": "tuple"}},
            "required": ["odd"]
        });
        let validator = translate("odd_tool", &schema);
        assert!(validator.validate(&args(json!({"odd": "fine"}))).is_ok());
        assert!(validator.validate(&args(json!({"odd": 3}))).is_err());
    }

    #[test]
    fn test_array_and_object_kinds() {
        let schema = json!({
            "properties": {
                "names": {"type": "array"},
                "filters": {"type": "object"}
            },
            "required": ["names", "filters"]
        });
        let validator = translate("search", &schema);
        assert!(validator
            .validate(&args(json!({"names": ["a"], "filters": {"x": 1}})))
            .is_ok());
        assert!(validator
            .validate(&args(json!({"names": "a", "filters": {}})))
            .is_err());
    }
}
