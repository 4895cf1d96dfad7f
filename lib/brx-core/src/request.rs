//! Outgoing requests.
//!
//! Header names are stored lower-cased, so `Authorization` and
//! `authorization` name the same header and the last value set wins.
//!
//! ```
//! use brx_core::{Method, Request};
//! use bytes::Bytes;
//!
//! let url = "https://jsonplaceholder.typicode.com/posts".parse().expect("url");
//! let request = Request::<Bytes>::builder(Method::Get, url)
//!     .header("Accept", "application/json")
//!     .query("_limit", "5")
//!     .build();
//!
//! assert_eq!(request.header("accept"), Some("application/json"));
//! assert_eq!(request.url().query(), Some("_limit=5"));
//! ```

use std::collections::HashMap;

use bytes::Bytes;

use crate::{ContentType, Method, RequestBody, Result};

/// A fully built request, ready for a [`Transport`](crate::Transport).
#[derive(Debug, Clone)]
pub struct Request<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: HashMap<String, String>,
    body: Option<B>,
}

impl<B> Request<B> {
    /// Start building a request.
    #[must_use]
    pub fn builder(method: Method, url: url::Url) -> RequestBuilder<B> {
        RequestBuilder {
            request: Self {
                method,
                url,
                headers: HashMap::new(),
                body: None,
            },
        }
    }

    /// The verb.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// The absolute URL, query included.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Headers keyed by lower-case name.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// One header, in any casing.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The payload, if any.
    #[must_use]
    pub const fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }

    /// Split into `(method, url, headers, body)`.
    #[must_use]
    pub fn into_parts(self) -> (Method, url::Url, HashMap<String, String>, Option<B>) {
        (self.method, self.url, self.headers, self.body)
    }
}

/// Builder returned by [`Request::builder`].
#[derive(Debug, Clone)]
pub struct RequestBuilder<B = Bytes> {
    request: Request<B>,
}

impl<B> RequestBuilder<B> {
    /// Set a header, replacing an earlier value of the same name.
    #[must_use]
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.request
            .headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Set several headers, in order.
    #[must_use]
    pub fn headers<K, V>(self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        headers
            .into_iter()
            .fold(self, |builder, (name, value)| builder.header(name, value))
    }

    /// Append `name=value` to the query string.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.request.url.query_pairs_mut().append_pair(name, value);
        self
    }

    /// Set the payload as is.
    #[must_use]
    pub fn body(mut self, body: B) -> Self {
        self.request.body = Some(body);
        self
    }

    /// Finish.
    #[must_use]
    pub fn build(self) -> Request<B> {
        self.request
    }
}

impl RequestBuilder<Bytes> {
    /// Serialize `value` as the JSON payload.
    ///
    /// # Errors
    ///
    /// Fails when `value` cannot be serialized.
    pub fn json<T: serde::Serialize>(self, value: &T) -> Result<Self> {
        let bytes = crate::to_json(value)?;
        Ok(self.header("content-type", ContentType::Json.as_str()).body(bytes))
    }

    /// Encode a [`RequestBody`] along with its `Content-Type`.
    ///
    /// # Errors
    ///
    /// Fails when a JSON payload cannot be serialized.
    pub fn request_body(self, body: RequestBody) -> Result<Self> {
        let (content_type, bytes) = body.into_parts()?;
        Ok(self.header("content-type", content_type).body(bytes))
    }
}
