//! Variable substitution engine for templates

use regex::Captures;

use super::extract::PLACEHOLDER;
use super::types::Variables;

/// Substitute `{{variable}}` placeholders in a template string.
///
/// Every placeholder whose name is present in `variables` is replaced with the
/// value's string form. Unknown placeholders are left in place; completeness is
/// checked separately by `require_variables`.
pub fn substitute_variables(template: &str, variables: &Variables) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match variables.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
