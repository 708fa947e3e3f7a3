//! Errors surfaced by the backend client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error(
        "server responded with {status}: {}",
        .server_message.as_deref().unwrap_or("no details")
    )]
    Http {
        status: u16,
        server_message: Option<String>,
    },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text for a form message: the server's own `error`/`message` when it sent
    /// one, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Http {
                server_message: Some(message),
                ..
            } => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// Pulls `error`, then `message`, out of a JSON error body.
pub(crate) fn extract_server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "message"].iter().find_map(|field| {
        value
            .get(field)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_error_over_message() {
        assert_eq!(
            extract_server_message(r#"{"error":"Slot taken","message":"ignored"}"#),
            Some("Slot taken".to_string())
        );
        assert_eq!(
            extract_server_message(r#"{"message":"Pandit unavailable"}"#),
            Some("Pandit unavailable".to_string())
        );
        assert_eq!(extract_server_message("<html>oops</html>"), None);
        assert_eq!(extract_server_message(r#"{"error":"  "}"#), None);
    }

    #[test]
    fn user_message_falls_back() {
        let http = ApiError::Http {
            status: 400,
            server_message: Some("Date in the past".to_string()),
        };
        assert_eq!(http.user_message("Failed"), "Date in the past");
        assert_eq!(http.status(), Some(400));

        let bare = ApiError::Http {
            status: 500,
            server_message: None,
        };
        assert_eq!(bare.user_message("Failed"), "Failed");
        assert_eq!(bare.to_string(), "server responded with 500: no details");
        assert_eq!(ApiError::Timeout.user_message("Failed"), "Failed");
    }
}
