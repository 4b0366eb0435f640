//! Placeholder scanning and required-variable checks

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::types::{TemplateError, TemplateResult, Variables};

lazy_static! {
    /// `{{ name }}` with optional whitespace inside the braces. Names are ASCII only.
    pub(super) static ref PLACEHOLDER: Regex =
        Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("placeholder pattern is valid");
}

/// Collect the distinct placeholder names in `template`, in first-seen order.
pub fn extract_variables(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for caps in PLACEHOLDER.captures_iter(template) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    names
}

/// Outcome of comparing required placeholders against provided variables
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableCheck {
    pub valid: bool,
    /// Required names absent from the provided mapping, in template order
    pub missing: Vec<String>,
}

/// Compare the placeholders referenced by `template` with `provided`.
pub fn validate_variables(template: &str, provided: &Variables) -> VariableCheck {
    let missing: Vec<String> = extract_variables(template)
        .into_iter()
        .filter(|name| !provided.contains_key(name))
        .collect();

    VariableCheck {
        valid: missing.is_empty(),
        missing,
    }
}

/// Fail with `MissingVariables` unless every placeholder in `template` is provided.
pub fn require_variables(template: &str, provided: &Variables) -> TemplateResult<()> {
    let check = validate_variables(template, provided);
    if check.valid {
        Ok(())
    } else {
        Err(TemplateError::MissingVariables(check.missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(value: serde_json::Value) -> Variables {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_extract_preserves_first_seen_order() {
        let names = extract_variables("{{b}} then {{a}} and {{b}} again, {{c}}");
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_extract_allows_inner_whitespace() {
        let names = extract_variables("Hello {{ name }}, order {{order_id }}");
        assert_eq!(names, vec!["name", "order_id"]);
    }

    #[test]
    fn test_extract_is_case_sensitive() {
        let names = extract_variables("{{Name}} {{name}}");
        assert_eq!(names, vec!["Name", "name"]);
    }

    #[test]
    fn test_extract_ignores_malformed_placeholders() {
        let names = extract_variables("{{}} {{ }} {name} {{first name}} {{ok}} {{bad-name}}");
        assert_eq!(names, vec!["ok"]);
    }

    #[test]
    fn test_extract_ignores_non_ascii_names() {
        let names = extract_variables("Hola {{café}} {{名前}} {{ok}}");
        assert_eq!(names, vec!["ok"]);

        let check = validate_variables("Hola {{café}}", &Variables::new());
        assert!(check.valid);
        assert!(check.missing.is_empty());
    }

    #[test]
    fn test_extract_from_plain_text() {
        assert!(extract_variables("no placeholders here").is_empty());
        assert!(extract_variables("").is_empty());
    }

    #[test]
    fn test_validate_reports_missing_in_order() {
        let check = validate_variables(
            "Hi {{name}}<p>{{amount}} {{currency}}</p>",
            &vars(json!({"name": "Ana"})),
        );
        assert!(!check.valid);
        assert_eq!(check.missing, vec!["amount", "currency"]);
    }

    #[test]
    fn test_validate_accepts_complete_mapping() {
        let check = validate_variables(
            "Hi {{name}}<p>{{amount}} {{currency}}</p>",
            &vars(json!({"name": "Ana", "amount": 10, "currency": "USD", "extra": "x"})),
        );
        assert!(check.valid);
        assert!(check.missing.is_empty());
    }

    #[test]
    fn test_require_variables_carries_missing_names() {
        let err = require_variables("{{a}} {{b}}", &vars(json!({"b": 1}))).unwrap_err();
        match err {
            TemplateError::MissingVariables(missing) => assert_eq!(missing, vec!["a"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
