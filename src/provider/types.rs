use rust_i18n::t;
use serde_json::Value;
use thiserror::Error;

/// Transport-level failures of a single provider call. Each call makes
/// exactly one attempt; classification here lets the orchestrator tell
/// "key revoked" apart from "provider down" in its fallback logs.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{}", t!("provider.error.not_configured", provider = .provider))]
    NotConfigured { provider: String },

    /// HTTP 401/403.
    #[error("{}", t!("provider.error.auth_failed", provider = .provider, status = .status))]
    Auth { provider: String, status: u16 },

    /// Any other non-2xx status.
    #[error("{}", t!("provider.error.http_status", provider = .provider, status = .status, message = .message))]
    Http {
        provider: String,
        status: u16,
        message: String,
    },

    /// Malformed body or missing `choices[0].message.content`.
    #[error("{}", t!("provider.error.shape", provider = .provider, details = .details))]
    Shape { provider: String, details: String },

    #[error("{}", t!("provider.error.timeout", provider = .provider, seconds = .seconds))]
    Timeout { provider: String, seconds: u64 },

    /// Connection-level failure (DNS, refused, TLS).
    #[error("{}", t!("provider.error.request_failed", provider = .provider, details = .details))]
    Request { provider: String, details: String },
}

/// Parses an OpenAI-format error body into `(error_type, message)`.
///
/// Returns `None` when the body is not the expected `{"error": {...}}`
/// JSON, in which case the raw text is reported instead.
pub fn parse_error_body(error_text: &str) -> Option<(String, String)> {
    let json: Value = serde_json::from_str(error_text).ok()?;
    json.get("error").map(|error| {
        (
            error
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(error_text)
                .to_string(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_openai_error_body() {
        let body = r#"{"error":{"type":"invalid_request_error","message":"model not found"}}"#;
        let (error_type, message) = parse_error_body(body).unwrap();
        assert_eq!(error_type, "invalid_request_error");
        assert_eq!(message, "model not found");
    }

    #[test]
    fn non_json_body_is_not_parsed() {
        assert!(parse_error_body("Bad Gateway").is_none());
        assert!(parse_error_body(r#"{"message":"no error key"}"#).is_none());
    }
}
