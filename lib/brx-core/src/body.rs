//! Payload encoding and path-aware JSON decoding.

use bytes::Bytes;
use derive_more::Display;
use serde_json::{Map, Value};

use crate::{Error, Form, Result};

/// Media types the Request Service writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ContentType {
    /// `application/json`
    #[display("application/json")]
    Json,
    /// `multipart/form-data`, without its boundary parameter.
    #[display("multipart/form-data")]
    FormData,
}

impl ContentType {
    /// The bare media type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormData => "multipart/form-data",
        }
    }
}

/// What a POST, PUT or PATCH carries.
///
/// JSON payloads are always objects. A [`Form`] is passed through with its
/// own boundary.
///
/// ```
/// use brx_core::RequestBody;
/// use serde_json::json;
///
/// assert!(RequestBody::json(&json!({ "title": "foo" })).is_ok());
/// assert!(RequestBody::json(&[1, 2, 3]).is_err());
/// ```
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// Key-value mapping.
    Json(Map<String, Value>),
    /// Multipart form.
    Multipart(Form),
}

impl RequestBody {
    /// Serialize `value`, which must come out as a JSON object.
    ///
    /// # Errors
    ///
    /// [`Error::Serialization`] when serde fails, [`Error::InvalidRequest`]
    /// for arrays, strings, numbers and `null`.
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self> {
        let value = serde_json::to_value(value).map_err(|err| Error::Serialization(err.to_string()))?;
        let Value::Object(fields) = value else {
            return Err(Error::invalid_request(format!(
                "JSON body must be a key-value mapping, got {value}"
            )));
        };
        Ok(Self::Json(fields))
    }

    /// `(Content-Type, bytes)`.
    ///
    /// # Errors
    ///
    /// Only the JSON arm can fail.
    pub fn into_parts(self) -> Result<(String, Bytes)> {
        Ok(match self {
            Self::Json(fields) => (ContentType::Json.to_string(), to_json(&fields)?),
            Self::Multipart(form) => form.into_body(),
        })
    }
}

impl From<Map<String, Value>> for RequestBody {
    fn from(fields: Map<String, Value>) -> Self {
        Self::Json(fields)
    }
}

impl From<Form> for RequestBody {
    fn from(form: Form) -> Self {
        Self::Multipart(form)
    }
}

/// Compact JSON bytes.
///
/// # Errors
///
/// [`Error::Serialization`] when serde fails.
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|err| Error::Serialization(err.to_string()))
}

/// `application/x-www-form-urlencoded` query string.
///
/// `None` fields marked `skip_serializing_if` disappear, sequences repeat
/// the key.
///
/// ```
/// use brx_core::to_query_string;
///
/// #[derive(serde::Serialize)]
/// struct Page {
///     #[serde(rename = "_limit", skip_serializing_if = "Option::is_none")]
///     limit: Option<u32>,
/// }
///
/// assert_eq!(to_query_string(&Page { limit: Some(5) }).expect("query"), "_limit=5");
/// assert_eq!(to_query_string(&Page { limit: None }).expect("query"), "");
/// ```
///
/// # Errors
///
/// [`Error::InvalidRequest`] for shapes a query string cannot hold.
pub fn to_query_string<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_html_form::to_string(value).map_err(|err| Error::invalid_request(err.to_string()))
}

/// Decode JSON bytes.
///
/// # Errors
///
/// [`Error::JsonDeserialization`] naming the first offending path, e.g.
/// `[0].userId`.
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut input = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut input)
        .map_err(|err| Error::json_deserialization(err.path().to_string(), err.inner().to_string()))
}

/// Decode an already parsed value.
///
/// # Errors
///
/// `(path, message)` of the first mismatch.
pub fn from_value<T: serde::de::DeserializeOwned>(
    value: Value,
) -> std::result::Result<T, (String, String)> {
    serde_path_to_error::deserialize(value)
        .map_err(|err| (err.path().to_string(), err.inner().to_string()))
}
