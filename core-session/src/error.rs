//! Error taxonomy for session and catalog API calls.
//!
//! Transport failures and HTTP status codes are folded into one enum so
//! callers can match on intent ("bad credentials" vs "server down") instead
//! of raw status numbers.

use bridge_traits::http::HttpResponse;
use bridge_traits::BridgeError;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Request never produced an HTTP response (DNS, connect, timeout)
    #[error("Network unreachable: {0}")]
    NetworkUnreachable(String),

    /// 401 from a credential-bearing endpoint
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// 401 from any other endpoint
    #[error("Not authorized")]
    Unauthorized,

    /// 400 with a server-provided validation message
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// 409, typically a duplicate email on registration
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any 5xx status
    #[error("Server error (status {status})")]
    ServerError { status: u16 },

    /// Anything that doesn't fit the categories above
    #[error("Unexpected error: {0}")]
    Unknown(String),

    /// An operation that requires a signed-in user was called signed out
    #[error("No authenticated session")]
    NotAuthenticated,

    /// Refresh was requested but the session holds no refresh token
    #[error("No refresh token available")]
    NoRefreshToken,

    /// Key-value store failure while persisting or loading session data
    #[error("Storage error: {0}")]
    Storage(String),

    /// Malformed JSON in a response body or persisted snapshot
    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Error body shape the store API uses. `message` is sometimes a string and
/// sometimes an array of per-field strings.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<serde_json::Value>,
}

fn extract_message(response: &HttpResponse) -> Option<String> {
    let body: ErrorBody = serde_json::from_slice(&response.body).ok()?;
    match body.message? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Array(items) => {
            let parts: Vec<String> = items
                .into_iter()
                .filter_map(|v| match v {
                    serde_json::Value::String(s) => Some(s),
                    _ => None,
                })
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("; "))
            }
        }
        _ => None,
    }
}

impl ApiError {
    /// Classifies a non-2xx HTTP response.
    ///
    /// `credential_endpoint` marks requests where a 401 means "wrong email or
    /// password" rather than "session expired".
    pub fn from_response(response: &HttpResponse, credential_endpoint: bool) -> Self {
        match response.status {
            401 if credential_endpoint => ApiError::InvalidCredentials,
            401 => ApiError::Unauthorized,
            400 => ApiError::ValidationFailed(
                extract_message(response).unwrap_or_else(|| "Invalid request".to_string()),
            ),
            409 => ApiError::Conflict(
                extract_message(response).unwrap_or_else(|| "Resource conflict".to_string()),
            ),
            status if (500..600).contains(&status) => ApiError::ServerError { status },
            status => ApiError::Unknown(
                extract_message(response)
                    .unwrap_or_else(|| format!("Unexpected status {}", status)),
            ),
        }
    }

    /// Returns `true` when retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::NetworkUnreachable(_) | ApiError::ServerError { .. }
        )
    }
}

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Network(msg) => ApiError::NetworkUnreachable(msg),
            other => ApiError::Unknown(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::HashMap;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn test_401_on_credential_endpoint() {
        let err = ApiError::from_response(&response(401, "{}"), true);
        assert!(matches!(err, ApiError::InvalidCredentials));
    }

    #[test]
    fn test_401_on_regular_endpoint() {
        let err = ApiError::from_response(&response(401, "{}"), false);
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[test]
    fn test_400_extracts_string_message() {
        let err = ApiError::from_response(
            &response(400, r#"{"message": "email must be an email"}"#),
            false,
        );
        match err {
            ApiError::ValidationFailed(msg) => assert_eq!(msg, "email must be an email"),
            other => panic!("Expected ValidationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_400_extracts_array_message() {
        let err = ApiError::from_response(
            &response(
                400,
                r#"{"message": ["email must be an email", "password too short"]}"#,
            ),
            false,
        );
        match err {
            ApiError::ValidationFailed(msg) => {
                assert!(msg.contains("email must be an email"));
                assert!(msg.contains("password too short"));
            }
            other => panic!("Expected ValidationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_400_with_unparseable_body() {
        let err = ApiError::from_response(&response(400, "not json"), false);
        match err {
            ApiError::ValidationFailed(msg) => assert_eq!(msg, "Invalid request"),
            other => panic!("Expected ValidationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_409_conflict() {
        let err = ApiError::from_response(
            &response(409, r#"{"message": "email already exists"}"#),
            false,
        );
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn test_5xx_server_error() {
        let err = ApiError::from_response(&response(503, ""), false);
        assert!(matches!(err, ApiError::ServerError { status: 503 }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_unmapped_status() {
        let err = ApiError::from_response(&response(418, "{}"), false);
        assert!(matches!(err, ApiError::Unknown(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_bridge_network_error_maps_to_unreachable() {
        let err = ApiError::from(BridgeError::Network("connection refused".to_string()));
        assert!(matches!(err, ApiError::NetworkUnreachable(_)));
        assert!(err.is_transient());
    }
}
