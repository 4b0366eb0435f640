//! Simulation marker and educational disclaimer decoration

use serde::Serialize;

use super::substitution::substitute_variables;
use super::types::Variables;

/// Marker prepended to every rendered subject
pub const SIMULATION_MARKER: &str = "[SIMULATION]";

/// HTML block appended to every rendered body
pub const EDUCATION_DISCLAIMER: &str = r#"
<div style="margin-top: 40px; padding: 20px; border-top: 2px solid #E5E7EB; background-color: #F9FAFB; text-align: center;">
  <p style="color: #6B7280; font-size: 14px; margin: 0;">
    ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
  </p>
  <p style="color: #EF4444; font-weight: 600; font-size: 14px; margin: 10px 0;">
    ⚠️ EDUCATIONAL SIMULATION
  </p>
  <p style="color: #6B7280; font-size: 12px; margin: 10px 0;">
    This email is a simulation for educational purposes only and does not represent a real transaction.
  </p>
  <p style="color: #6B7280; font-size: 14px; margin: 0;">
    ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
  </p>
</div>
"#;

const BODY_CLOSE: &str = "</body>";

/// Subject and HTML body ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedEmail {
    pub rendered_subject: String,
    pub rendered_html: String,
}

/// Prepend the simulation marker unless the subject already carries it (any case).
pub fn add_simulation_prefix(subject: &str) -> String {
    if subject.to_uppercase().contains(SIMULATION_MARKER) {
        subject.to_string()
    } else {
        format!("{} {}", SIMULATION_MARKER, subject)
    }
}

/// Insert the disclaimer before the first `</body>`, or append it when there is none.
///
/// Each call inserts another copy; render a body through this exactly once.
pub fn append_disclaimer(html_body: &str) -> String {
    if html_body.contains(BODY_CLOSE) {
        html_body.replacen(BODY_CLOSE, &format!("{}{}", EDUCATION_DISCLAIMER, BODY_CLOSE), 1)
    } else {
        format!("{}{}", html_body, EDUCATION_DISCLAIMER)
    }
}

/// Substitute variables into subject and body, then decorate both.
pub fn render_email(html_body: &str, subject: &str, variables: &Variables) -> RenderedEmail {
    let rendered_html = append_disclaimer(&substitute_variables(html_body, variables));
    let rendered_subject = add_simulation_prefix(&substitute_variables(subject, variables));

    RenderedEmail {
        rendered_subject,
        rendered_html,
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
    fn test_prefix_added_once() {
        let once = add_simulation_prefix("Your order");
        assert_eq!(once, "[SIMULATION] Your order");
        assert_eq!(add_simulation_prefix(&once), once);
    }

    #[test]
    fn test_prefix_detects_marker_in_any_case() {
        assert_eq!(add_simulation_prefix("Re: [simulation] test"), "Re: [simulation] test");
        assert_eq!(add_simulation_prefix("[Simulation] test"), "[Simulation] test");
    }

    #[test]
    fn test_disclaimer_inserted_before_body_close() {
        let html = "<html><body><p>Hi</p></body></html>";
        let result = append_disclaimer(html);

        let disclaimer_at = result.find("EDUCATIONAL SIMULATION").unwrap();
        let body_close_at = result.find("</body>").unwrap();
        assert!(disclaimer_at < body_close_at);
        assert!(result.ends_with("</body></html>"));
    }

    #[test]
    fn test_disclaimer_appended_without_body_tag() {
        let result = append_disclaimer("<p>Hi</p>");
        assert!(result.starts_with("<p>Hi</p>"));
        assert!(result.ends_with(EDUCATION_DISCLAIMER));
    }

    #[test]
    fn test_disclaimer_is_inserted_on_every_call() {
        let twice = append_disclaimer(&append_disclaimer("<p>Hi</p>"));
        assert_eq!(twice.matches("EDUCATIONAL SIMULATION").count(), 2);
    }

    #[test]
    fn test_render_email_example() {
        let rendered = render_email(
            "<p>{{amount}} {{currency}}</p>",
            "Hi {{name}}",
            &vars(json!({"name": "Ana", "amount": 10, "currency": "USD"})),
        );

        assert_eq!(rendered.rendered_subject, "[SIMULATION] Hi Ana");
        assert!(rendered.rendered_html.contains("10 USD"));
        assert!(rendered.rendered_html.ends_with(EDUCATION_DISCLAIMER));
    }

    #[test]
    fn test_render_substitutes_before_decorating() {
        let rendered = render_email(
            "<body>{{note}}</body>",
            "{{topic}}",
            &vars(json!({"note": "plain", "topic": "[SIMULATION] drill"})),
        );

        assert_eq!(rendered.rendered_subject, "[SIMULATION] drill");
        assert_eq!(rendered.rendered_html.matches("EDUCATIONAL SIMULATION").count(), 1);
    }
}
