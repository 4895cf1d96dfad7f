//! Core types for the brx API-access layer.
//!
//! This crate provides the foundational types used by `brx`:
//! - [`Method`] - HTTP method enum (GET, POST, PUT, PATCH, DELETE)
//! - [`Request`] and [`RequestBuilder`] - HTTP request types
//! - [`Response`] - HTTP response type
//! - [`RequestBody`], [`Form`], [`Part`] - JSON and multipart payloads
//! - [`ApiError`], [`TransportError`], [`Error`] and [`Result`] - Error model
//! - [`Transport`] - The network seam

mod body;
mod error;
mod method;
mod multipart;
pub mod prelude;
mod request;
mod response;
mod transport;

pub use body::{ContentType, RequestBody, from_json, from_value, to_json, to_query_string};
pub use error::{
    AUTH_REQUIRED_MESSAGE, ApiError, ApiErrorKind, Error, NETWORK_ERROR_MESSAGE, Result,
    TransportError, UNKNOWN_ERROR_MESSAGE,
};
pub use method::Method;
pub use multipart::{Form, Part};
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use transport::Transport;

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};
