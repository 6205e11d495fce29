//! Property value validation
//!
//! Checks an entered value against a property's declared constraints. Only
//! the first failing constraint is reported.

use regex::Regex;

use crate::template::{Feel, Pattern, PropertyDescriptor};

/// A violated property constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Empty,
    TooLong { max: usize },
    TooShort { min: usize },
    /// `message` replaces the default text when the template supplies one
    PatternMismatch {
        pattern: String,
        message: Option<String>,
    },
    NotAChoice,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Must not be empty."),
            Self::TooLong { max } => write!(f, "Must have max length {}.", max),
            Self::TooShort { min } => write!(f, "Must have min length {}.", min),
            Self::PatternMismatch {
                message: Some(message),
                ..
            } => write!(f, "{}", message),
            Self::PatternMismatch { pattern, .. } => write!(f, "Must match pattern {}.", pattern),
            Self::NotAChoice => write!(f, "Value must be one of the choices."),
        }
    }
}

impl std::error::Error for ValidationError {}

fn is_expression(property: &PropertyDescriptor, value: &str) -> bool {
    let feel = !matches!(property.feel, None | Some(Feel::Flag(false)));
    feel && value.starts_with('=')
}

/// Validate a (possibly absent) value against the property's constraints.
pub fn validate_property(value: Option<&str>, property: &PropertyDescriptor) -> Option<ValidationError> {
    let value = value.unwrap_or_default();
    let constraints = property.constraints.clone().unwrap_or_default();

    if value.is_empty() {
        return constraints.not_empty.then_some(ValidationError::Empty);
    }

    if property.is_dropdown() && !property.choices.iter().any(|c| c.value == value) {
        return Some(ValidationError::NotAChoice);
    }

    let length = value.chars().count();
    if let Some(max) = constraints.max_length {
        if length > max {
            return Some(ValidationError::TooLong { max });
        }
    }
    if let Some(min) = constraints.min_length {
        if length < min {
            return Some(ValidationError::TooShort { min });
        }
    }

    let (pattern, message) = match constraints.pattern {
        Some(Pattern::Plain(pattern)) => (pattern, None),
        Some(Pattern::WithMessage { value, message }) => (value, message),
        None => return None,
    };
    if is_expression(property, value) {
        return None;
    }
    match Regex::new(&pattern) {
        Ok(regex) if regex.is_match(value) => None,
        Ok(_) => Some(ValidationError::PatternMismatch { pattern, message }),
        Err(e) => {
            log::warn!("Ignoring invalid pattern '{}': {}", pattern, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn property(extra: serde_json::Value) -> PropertyDescriptor {
        let mut value = json!({ "binding": { "type": "zeebe:input", "name": "x" } });
        if let (Some(target), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            target.extend(extra.clone());
        }
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_not_empty() {
        let required = property(json!({ "constraints": { "notEmpty": true } }));
        assert_eq!(validate_property(None, &required), Some(ValidationError::Empty));
        assert_eq!(validate_property(Some(""), &required).unwrap().to_string(), "Must not be empty.");
        assert_eq!(validate_property(Some("x"), &required), None);

        let optional = property(json!({}));
        assert_eq!(validate_property(None, &optional), None);
    }

    #[test]
    fn test_length_bounds() {
        let bounded = property(json!({ "constraints": { "minLength": 2, "maxLength": 4 } }));
        assert_eq!(
            validate_property(Some("a"), &bounded).unwrap().to_string(),
            "Must have min length 2."
        );
        assert_eq!(
            validate_property(Some("abcde"), &bounded).unwrap().to_string(),
            "Must have max length 4."
        );
        assert_eq!(validate_property(Some("abc"), &bounded), None);
    }

    #[test]
    fn test_pattern_messages() {
        let plain = property(json!({ "constraints": { "pattern": "^[0-9]+$" } }));
        assert_eq!(
            validate_property(Some("12a"), &plain).unwrap().to_string(),
            "Must match pattern ^[0-9]+$."
        );
        assert_eq!(validate_property(Some("123"), &plain), None);

        let custom = property(json!({
            "constraints": { "pattern": { "value": "^https://", "message": "Must be a secure URL." } }
        }));
        assert_eq!(
            validate_property(Some("http://x"), &custom).unwrap().to_string(),
            "Must be a secure URL."
        );
    }

    #[test]
    fn test_expressions_skip_pattern() {
        let feel = property(json!({ "feel": "optional", "constraints": { "pattern": "^[0-9]+$" } }));
        assert_eq!(validate_property(Some("=count"), &feel), None);

        let literal = property(json!({ "constraints": { "pattern": "^[0-9]+$" } }));
        assert!(validate_property(Some("=count"), &literal).is_some());
    }

    #[test]
    fn test_invalid_pattern_is_ignored() {
        let broken = property(json!({ "constraints": { "pattern": "([" } }));
        assert_eq!(validate_property(Some("anything"), &broken), None);
    }

    #[test]
    fn test_dropdown_membership() {
        let dropdown = property(json!({
            "type": "Dropdown",
            "choices": [{ "name": "A", "value": "a" }]
        }));
        assert_eq!(validate_property(Some("a"), &dropdown), None);
        assert_eq!(validate_property(Some("b"), &dropdown), Some(ValidationError::NotAChoice));
    }
}
