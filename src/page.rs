//! Server-rendered input form.

use crate::types::PredictForm;

const INDEX_HTML: &str = include_str!("../templates/index.html");

/// Render the form page, echoing submitted values back into the inputs.
///
/// Placeholders are filled in a single pass over the template, so submitted
/// text is never scanned for further `{{name}}` tokens.
pub fn render_index(prediction_text: Option<&str>, form: Option<&PredictForm>) -> String {
    let value = |name: &str| -> Option<String> {
        let field = match name {
            "State_Name" => form.and_then(|f| f.state.as_deref()),
            "District_Name" => form.and_then(|f| f.district.as_deref()),
            "Season" => form.and_then(|f| f.season.as_deref()),
            "Crop" => form.and_then(|f| f.crop.as_deref()),
            "Area" => form.and_then(|f| f.area.as_deref()),
            "prediction_text" => prediction_text,
            _ => return None,
        };
        Some(escape_html(field.unwrap_or("")))
    };

    let mut out = String::with_capacity(INDEX_HTML.len() + 256);
    let mut rest = INDEX_HTML;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        match after.find("}}") {
            Some(close) => match value(&after[..close]) {
                Some(v) => {
                    out.push_str(&v);
                    rest = &after[close + 2..];
                }
                None => {
                    out.push_str("{{");
                    rest = after;
                }
            },
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_page_has_no_placeholders() {
        let html = render_index(None, None);
        assert!(!html.contains("{{"));
        assert!(html.contains(r#"action="/predict""#));
    }

    #[test]
    fn echoes_and_escapes() {
        let form = PredictForm {
            crop: Some("<script>".into()),
            area: Some("2500".into()),
            ..Default::default()
        };
        let html = render_index(Some("Error: bad \"crop\""), Some(&form));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains(r#"value="2500""#));
        assert!(html.contains("Error: bad &quot;crop&quot;"));
    }

    #[test]
    fn submitted_placeholders_are_not_expanded() {
        let form = PredictForm {
            state: Some("{{prediction_text}}".into()),
            district: Some("{{Area}}".into()),
            area: Some("2500".into()),
            ..Default::default()
        };
        let html = render_index(Some("Predicted Production: 1.00"), Some(&form));
        assert!(html.contains(r#"value="{{prediction_text}}""#));
        assert!(html.contains(r#"value="{{Area}}""#));
        assert_eq!(html.matches("Predicted Production: 1.00").count(), 1);
    }
}
