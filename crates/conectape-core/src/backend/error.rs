use serde::Deserialize;
use thiserror::Error;

/// Failure reading from the document store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Unauthenticated - session may be expired")]
    Unauthenticated,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Longest message kept from a response that carried no error envelope.
const MAX_RAW_MESSAGE_CHARS: usize = 200;

/// `{"error": {...}}` body returned by Google APIs on failure.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
    /// Canonical status such as `PERMISSION_DENIED`
    #[serde(default)]
    pub status: Option<String>,
}

impl ErrorBody {
    /// Decode an error body. Anything that is not an envelope becomes the
    /// message, cut to its first line.
    pub fn parse(text: &str) -> Self {
        serde_json::from_str::<ErrorEnvelope>(text)
            .map(|envelope| envelope.error)
            .unwrap_or_else(|_| ErrorBody {
                message: text
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .chars()
                    .take(MAX_RAW_MESSAGE_CHARS)
                    .collect(),
                status: None,
            })
    }
}

impl BackendError {
    /// Classify a failed Firestore response. The canonical status in the
    /// envelope wins; the HTTP code decides when it is missing or unknown.
    pub(crate) fn from_firestore(http: reqwest::StatusCode, body: ErrorBody) -> Self {
        let ErrorBody { message, status } = body;
        match status.as_deref() {
            Some("PERMISSION_DENIED") => return BackendError::PermissionDenied(message),
            Some("UNAUTHENTICATED") => return BackendError::Unauthenticated,
            Some("NOT_FOUND") => return BackendError::NotFound(message),
            Some("RESOURCE_EXHAUSTED") => return BackendError::RateLimited,
            Some("UNAVAILABLE" | "INTERNAL" | "DEADLINE_EXCEEDED") => {
                return BackendError::ServerError(message)
            }
            _ => {}
        }

        if http == reqwest::StatusCode::UNAUTHORIZED {
            BackendError::Unauthenticated
        } else if http == reqwest::StatusCode::FORBIDDEN {
            BackendError::PermissionDenied(message)
        } else if http == reqwest::StatusCode::NOT_FOUND {
            BackendError::NotFound(message)
        } else if http == reqwest::StatusCode::TOO_MANY_REQUESTS {
            BackendError::RateLimited
        } else if http.is_server_error() {
            BackendError::ServerError(message)
        } else {
            BackendError::InvalidResponse(format!("HTTP {}: {}", http.as_u16(), message))
        }
    }

    /// Whether a listener hitting this error can recover by polling again.
    /// A session or rules problem will not fix itself.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            BackendError::Unauthenticated | BackendError::PermissionDenied(_)
        )
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::InvalidResponse(e.to_string())
        } else {
            BackendError::Network(e.to_string())
        }
    }
}

/// Failure codes reported by the authentication service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    InvalidCredential,
    WrongPassword,
    UserNotFound,
    UserDisabled,
    TooManyRequests,
    NetworkRequestFailed,
    InvalidEmail,
    Other,
}

impl AuthErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthErrorCode::InvalidCredential => "auth/invalid-credential",
            AuthErrorCode::WrongPassword => "auth/wrong-password",
            AuthErrorCode::UserNotFound => "auth/user-not-found",
            AuthErrorCode::UserDisabled => "auth/user-disabled",
            AuthErrorCode::TooManyRequests => "auth/too-many-requests",
            AuthErrorCode::NetworkRequestFailed => "auth/network-request-failed",
            AuthErrorCode::InvalidEmail => "auth/invalid-email",
            AuthErrorCode::Other => "auth/internal-error",
        }
    }

    /// Map an Identity Toolkit error message such as
    /// `TOO_MANY_ATTEMPTS_TRY_LATER : Access to this account...` to a code.
    pub fn from_identity_toolkit(message: &str) -> Self {
        let key = message.split(':').next().unwrap_or_default().trim();
        match key {
            "INVALID_LOGIN_CREDENTIALS" => AuthErrorCode::InvalidCredential,
            "INVALID_PASSWORD" => AuthErrorCode::WrongPassword,
            "EMAIL_NOT_FOUND" => AuthErrorCode::UserNotFound,
            "USER_DISABLED" => AuthErrorCode::UserDisabled,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthErrorCode::TooManyRequests,
            "INVALID_EMAIL" => AuthErrorCode::InvalidEmail,
            _ => AuthErrorCode::Other,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} ({message})", .code.as_str())]
pub struct AuthError {
    pub code: AuthErrorCode,
    pub message: String,
}

impl AuthError {
    pub fn new(code: AuthErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::new(AuthErrorCode::NetworkRequestFailed, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_firestore_envelope_status_wins() {
        use reqwest::StatusCode;
        let body = ErrorBody::parse(
            r#"{"error":{"code":403,"message":"Missing or insufficient permissions.","status":"PERMISSION_DENIED"}}"#,
        );
        assert_eq!(
            BackendError::from_firestore(StatusCode::FORBIDDEN, body),
            BackendError::PermissionDenied("Missing or insufficient permissions.".into())
        );

        let body = ErrorBody::parse(r#"{"error":{"message":"Quota exceeded.","status":"RESOURCE_EXHAUSTED"}}"#);
        assert_eq!(BackendError::from_firestore(StatusCode::BAD_REQUEST, body), BackendError::RateLimited);
    }

    #[test]
    fn test_firestore_falls_back_to_http_code() {
        use reqwest::StatusCode;
        let body = ErrorBody::parse("<html>Bad Gateway</html>\n<body>...</body>");
        assert_eq!(body.message, "<html>Bad Gateway</html>");
        assert!(matches!(
            BackendError::from_firestore(StatusCode::BAD_GATEWAY, body),
            BackendError::ServerError(_)
        ));
        assert_eq!(
            BackendError::from_firestore(StatusCode::UNAUTHORIZED, ErrorBody::default()),
            BackendError::Unauthenticated
        );

        let long = "x".repeat(1000);
        assert_eq!(ErrorBody::parse(&long).message.len(), 200);
    }

    #[test]
    fn test_transient_errors() {
        assert!(BackendError::Network("reset".into()).is_transient());
        assert!(BackendError::RateLimited.is_transient());
        assert!(BackendError::ServerError("503".into()).is_transient());
        assert!(!BackendError::Unauthenticated.is_transient());
        assert!(!BackendError::PermissionDenied("rules".into()).is_transient());
    }

    #[test]
    fn test_identity_toolkit_messages() {
        assert_eq!(
            AuthErrorCode::from_identity_toolkit("INVALID_LOGIN_CREDENTIALS"),
            AuthErrorCode::InvalidCredential
        );
        assert_eq!(
            AuthErrorCode::from_identity_toolkit(
                "TOO_MANY_ATTEMPTS_TRY_LATER : Access to this account has been temporarily disabled"
            ),
            AuthErrorCode::TooManyRequests
        );
        assert_eq!(AuthErrorCode::from_identity_toolkit("USER_DISABLED"), AuthErrorCode::UserDisabled);
        assert_eq!(AuthErrorCode::from_identity_toolkit("EMAIL_NOT_FOUND"), AuthErrorCode::UserNotFound);
        assert_eq!(AuthErrorCode::from_identity_toolkit("INVALID_PASSWORD"), AuthErrorCode::WrongPassword);
        assert_eq!(AuthErrorCode::from_identity_toolkit("INVALID_EMAIL"), AuthErrorCode::InvalidEmail);
        assert_eq!(AuthErrorCode::from_identity_toolkit("WEAK_PASSWORD"), AuthErrorCode::Other);
    }
}
