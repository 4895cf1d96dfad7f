//! What a [`Transport`](crate::Transport) hands back.
//!
//! A [`Response`] is a plain record of one round-trip. Whether its status is
//! a failure is decided by the Request Service, not here.

use std::collections::HashMap;

use bytes::Bytes;
use serde_json::{Map, Value};

/// Status, headers and body of a received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response<B = Bytes> {
    status: u16,
    headers: HashMap<String, String>,
    body: B,
}

impl<B> Response<B> {
    /// Assemble a response. Header names are expected lower-cased.
    #[must_use]
    pub fn new(status: u16, headers: HashMap<String, String>, body: B) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// All headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// One header, looked up without regard to case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .or_else(|| {
                self.headers
                    .iter()
                    .find_map(|(key, value)| key.eq_ignore_ascii_case(name).then_some(value))
            })
            .map(String::as_str)
    }

    /// The body.
    #[must_use]
    pub const fn body(&self) -> &B {
        &self.body
    }

    /// Take the body.
    #[must_use]
    pub fn into_body(self) -> B {
        self.body
    }

    /// `200..=299`, the range a fetch would call `ok`.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, 200..=299)
    }

    /// `400..=499`.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self.status, 400..=499)
    }
}

impl Response<Bytes> {
    /// Decode a success body.
    ///
    /// A blank body stands for JSON `null`, which lets `()` and `Option<T>`
    /// absorb `204 No Content`.
    ///
    /// # Errors
    ///
    /// [`Error::JsonDeserialization`](crate::Error::JsonDeserialization) with
    /// the path of the first mismatch.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        if self.body.trim_ascii().is_empty() {
            crate::from_json(b"null")
        } else {
            crate::from_json(&self.body)
        }
    }

    /// Read a failure body as a key-value mapping.
    ///
    /// Anything that is not a JSON object (HTML, an array, nothing at all)
    /// yields an empty map.
    #[must_use]
    pub fn error_body(&self) -> Map<String, Value> {
        serde_json::from_slice(&self.body).unwrap_or_default()
    }

    /// The body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Fails when the body is not valid UTF-8.
    pub fn text(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.to_vec())
    }
}
