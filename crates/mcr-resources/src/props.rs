//! ---
//! mcr_section: "04-resource-handlers"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Resource handler contract and per-kind reconciliation."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! Property-bag access helpers shared by handler constructors.

use serde_json::{Map, Value};

use crate::handler::{HandlerError, Result};

/// A required non-empty string property.
pub fn required_str(props: &Map<String, Value>, key: &str) -> Result<String> {
    match props.get(key).and_then(Value::as_str) {
        Some(value) if !value.is_empty() => Ok(value.to_owned()),
        _ => Err(HandlerError::missing_parameter(key)),
    }
}

/// An optional string property; empty strings count as absent.
pub fn optional_str(props: &Map<String, Value>, key: &str) -> Option<String> {
    props
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// A required property of any non-null shape.
pub fn required_value(props: &Map<String, Value>, key: &str) -> Result<Value> {
    match props.get(key) {
        Some(value) if !value.is_null() => Ok(value.clone()),
        _ => Err(HandlerError::missing_parameter(key)),
    }
}

/// A required array-of-strings property.
pub fn required_str_array(props: &Map<String, Value>, key: &str) -> Result<Vec<String>> {
    match props.get(key) {
        None | Some(Value::Null) => Err(HandlerError::missing_parameter(key)),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_owned).ok_or_else(|| {
                    HandlerError::Validation(format!("{key} must be an Array of strings"))
                })
            })
            .collect(),
        Some(_) => Err(HandlerError::Validation(format!("{key} must be an Array"))),
    }
}

/// A boolean flag: `true` either as a JSON bool or as the string `"true"`
/// (the orchestrator's property pipeline stringifies scalars).
pub fn flag(props: &Map<String, Value>, key: &str) -> bool {
    match props.get(key) {
        Some(Value::Bool(value)) => *value,
        Some(Value::String(value)) => value == "true",
        _ => false,
    }
}

/// Extract the region segment from a colon-separated address or stack id
/// (segment index 3, as in `arn:cloud:service:REGION:account:rest`).
pub fn region_segment(value: &str, what: &str) -> Result<String> {
    value
        .split(':')
        .nth(3)
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| {
            HandlerError::Validation(format!("{what} does not carry a region segment"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bag(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn required_str_rejects_missing_and_empty() {
        let props = bag(json!({ "Empty": "", "Present": "x" }));
        assert_eq!(required_str(&props, "Present").expect("present"), "x");
        assert_eq!(
            required_str(&props, "Empty").unwrap_err(),
            HandlerError::missing_parameter("Empty")
        );
        assert_eq!(
            required_str(&props, "Absent").unwrap_err(),
            HandlerError::missing_parameter("Absent")
        );
    }

    #[test]
    fn array_shape_is_validated() {
        let props = bag(json!({ "Good": ["a", "b"], "Bad": "not-an-array" }));
        assert_eq!(
            required_str_array(&props, "Good").expect("array"),
            vec!["a".to_owned(), "b".to_owned()]
        );
        assert!(matches!(
            required_str_array(&props, "Bad").unwrap_err(),
            HandlerError::Validation(msg) if msg == "Bad must be an Array"
        ));
    }

    #[test]
    fn flags_accept_bool_and_stringified_bool() {
        let props = bag(json!({ "A": true, "B": "true", "C": "false", "D": 1 }));
        assert!(flag(&props, "A"));
        assert!(flag(&props, "B"));
        assert!(!flag(&props, "C"));
        assert!(!flag(&props, "D"));
        assert!(!flag(&props, "E"));
    }

    #[test]
    fn region_segment_extraction() {
        assert_eq!(
            region_segment("arn:cloud:topics:eu-west-1:123:alerts", "TopicAddress")
                .expect("region"),
            "eu-west-1"
        );
        assert!(region_segment("too:short", "TopicAddress").is_err());
    }
}
