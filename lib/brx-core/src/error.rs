//! Error types for brx.
//!
//! Two layers:
//! - [`TransportError`] is what a [`Transport`](crate::Transport) reports when
//!   no response could be obtained.
//! - [`ApiError`] is the normalized failure of the Request Service. Every
//!   transport failure and every non-2xx response becomes one.
//!
//! [`Error`] is the crate-wide error returned by services, controllers and the
//! query factory.

use bytes::Bytes;
use derive_more::{Display, Error, From};
use serde_json::{Map, Value};

use crate::Response;

/// Message of the error raised when a protected request has no token.
pub const AUTH_REQUIRED_MESSAGE: &str = "Authentication token is required for this request";

/// Default message for transport failures.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error occurred";

/// Fallback message when an error response carries no usable message.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred.";

/// Fields of an error body inspected for a backend message, in priority order.
const MESSAGE_FIELDS: [&str; 3] = ["message", "error", "detail"];

// ============================================================================
// Transport Error
// ============================================================================

/// Failure reported by a transport before any response was received.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum TransportError {
    /// DNS, refused connection, reset, or a body cut short.
    #[display("connection error: {_0}")]
    Connection(#[error(not(source))] String),

    /// Handshake or certificate failure.
    #[display("TLS error: {_0}")]
    Tls(#[error(not(source))] String),

    /// No response head within the configured timeout.
    #[display("request timeout")]
    Timeout,

    /// The request could not be turned into a wire request.
    #[display("invalid request: {_0}")]
    InvalidRequest(#[error(not(source))] String),
}

impl TransportError {
    /// [`TransportError::Connection`].
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// [`TransportError::Tls`].
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Timed out.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Could not connect or lost the connection.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

// ============================================================================
// Api Error
// ============================================================================

/// Where an [`ApiError`] originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ApiErrorKind {
    /// A protected request was attempted without a token. Synthesized locally.
    #[display("authentication required")]
    AuthRequired,
    /// The server answered with a non-2xx status.
    #[display("HTTP error")]
    Http,
    /// No response was received.
    #[display("transport error")]
    Transport,
}

/// A failed API request.
///
/// Invariant: a status of `0` (transport failure) never carries a response.
#[derive(Debug, Clone, Display, Error)]
#[display("{message}")]
pub struct ApiError {
    message: String,
    status: u16,
    body: Option<Map<String, Value>>,
    response: Option<Response<Bytes>>,
    kind: ApiErrorKind,
}

impl ApiError {
    /// Create an error with a status and no response attached.
    ///
    /// A status of `0` yields a transport error.
    #[must_use]
    pub fn new(message: impl Into<String>, status: u16) -> Self {
        let kind = if status == 0 {
            ApiErrorKind::Transport
        } else {
            ApiErrorKind::Http
        };
        Self {
            message: message.into(),
            status,
            body: None,
            response: None,
            kind,
        }
    }

    /// The pre-flight failure of a protected request without a token (401).
    #[must_use]
    pub fn auth_required() -> Self {
        Self {
            message: AUTH_REQUIRED_MESSAGE.to_string(),
            status: 401,
            body: None,
            response: None,
            kind: ApiErrorKind::AuthRequired,
        }
    }

    /// A failure before any response was received (status `0`).
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: 0,
            body: None,
            response: None,
            kind: ApiErrorKind::Transport,
        }
    }

    /// A non-2xx response. The status is taken from the response.
    #[must_use]
    pub fn from_response(
        message: impl Into<String>,
        body: Map<String, Value>,
        response: Response<Bytes>,
    ) -> Self {
        Self {
            message: message.into(),
            status: response.status(),
            body: Some(body),
            response: Some(response),
            kind: ApiErrorKind::Http,
        }
    }

    /// Raw error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status code, `0` for transport failures.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Parsed error body, if the failure came from a response.
    #[must_use]
    pub const fn body(&self) -> Option<&Map<String, Value>> {
        self.body.as_ref()
    }

    /// The originating response, if any.
    #[must_use]
    pub const fn response(&self) -> Option<&Response<Bytes>> {
        self.response.as_ref()
    }

    /// Origin of the failure.
    #[must_use]
    pub const fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    /// Returns `true` iff the status code is 401.
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        self.status == 401
    }

    /// User-facing message prefixed by the meaning of the status code.
    #[must_use]
    pub fn error_message(&self) -> String {
        let prefix = match self.status {
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            500 => "Internal Server Error",
            503 => "Service Unavailable",
            _ if self.message.is_empty() => return UNEXPECTED_ERROR_MESSAGE.to_string(),
            _ => return self.message.clone(),
        };
        format!("{prefix}: {}", self.message)
    }

    /// First usable message of an error body (`message`, then `error`, then `detail`).
    ///
    /// Strings must be non-empty; `null`, `false` and `0` are skipped, any other
    /// value is rendered as JSON.
    #[must_use]
    pub fn backend_message(body: &Map<String, Value>) -> Option<String> {
        MESSAGE_FIELDS
            .iter()
            .filter_map(|field| body.get(*field))
            .find_map(|value| match value {
                Value::Null | Value::Bool(false) => None,
                Value::String(s) if s.is_empty() => None,
                Value::String(s) => Some(s.clone()),
                Value::Number(n) if n.as_i64() == Some(0) => None,
                other => Some(other.to_string()),
            })
    }
}

// ============================================================================
// Error Type
// ============================================================================

/// Main error type for brx operations.
#[derive(Debug, Clone, Display, Error, From)]
pub enum Error {
    /// A request failed (auth precondition, HTTP status or transport).
    #[display("{_0}")]
    #[from]
    Api(ApiError),

    /// A resolved payload did not match its schema.
    #[display("validation error at '{path}': {message}")]
    #[from(skip)]
    Validation {
        /// Path to the offending value (e.g. "[0].title").
        path: String,
        /// What was wrong.
        message: String,
    },

    /// A caller-facing message produced by a controller.
    #[display("{_0}")]
    #[from(skip)]
    Message(#[error(not(source))] String),

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from(skip)]
    Serialization(#[error(not(source))] String),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// Missing or invalid configuration.
    #[display("configuration error: {_0}")]
    #[from(skip)]
    Config(#[error(not(source))] String),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a validation error.
    #[must_use]
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// The API error, if this is one.
    #[must_use]
    pub const fn as_api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the HTTP status code if this is an API error.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.as_api().map(ApiError::status)
    }

    /// Returns `true` if this is an API error with status 401.
    #[must_use]
    pub fn is_unauthenticated(&self) -> bool {
        self.as_api().is_some_and(ApiError::is_unauthenticated)
    }

    /// Returns `true` if this is a schema validation failure.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
