//! Strict-mode template rendering of raw manifest bytes.

use handlebars::Handlebars;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template render failed: {0}")]
    Template(String),
    #[error("manifest is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
}

/// Render `template` with a single root binding named `config` exposing
/// `values`. Strict mode is enabled, so any reference to a missing key
/// fails the render rather than substituting an empty string.
pub fn render(template_bytes: &[u8], values: &Value) -> Result<String, RenderError> {
    let source = std::str::from_utf8(template_bytes)?;

    let mut engine = Handlebars::new();
    engine.set_strict_mode(true);

    let mut data = serde_json::Map::new();
    data.insert("config".to_string(), values.clone());

    engine
        .render_template(source, &Value::Object(data))
        .map_err(|e| RenderError::Template(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn substitutes_present_config_values() {
        let rendered = render(
            b"name: {{config.name}}\nversion: {{config.version}}",
            &json!({"name": "check-tls", "version": "1.0.0"}),
        )
        .unwrap();
        assert_eq!(rendered, "name: check-tls\nversion: 1.0.0");
    }

    #[test]
    fn missing_key_fails_strict_render() {
        let err = render(b"name: {{config.missing}}", &json!({})).unwrap_err();
        assert!(matches!(err, RenderError::Template(_)));
    }

    #[test]
    fn literal_text_with_no_placeholders_passes_through() {
        let rendered = render(b"name: static-plugin\nversion: 1.0.0", &json!({})).unwrap();
        assert_eq!(rendered, "name: static-plugin\nversion: 1.0.0");
    }
}
