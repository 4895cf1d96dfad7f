//! The Request Service.
//!
//! [`ApiService`] turns `(method, path, headers, body)` into one HTTP
//! round-trip and normalizes every failure into an [`ApiError`]:
//!
//! | Situation                     | Status | Message                                         |
//! |-------------------------------|--------|-------------------------------------------------|
//! | protected request, no token   | 401    | `Authentication token is required ...`          |
//! | non-2xx response              | status | custom > `message`/`error`/`detail` > `Unknown error` |
//! | no response (network, TLS...) | 0      | custom > `Network error occurred`               |
//!
//! There is no retry: each call makes at most one attempt.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    ApiError, Error, HyperClient, Method, NETWORK_ERROR_MESSAGE, Request, RequestBody, Response,
    Result, Transport, UNKNOWN_ERROR_MESSAGE,
};

/// Settings fixed for the lifetime of an [`ApiService`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestConfig {
    /// Prefix of every request URL. Paths are appended verbatim.
    pub base_url: String,
    /// Bearer token for protected requests.
    pub token: Option<String>,
    /// Skip the `Authorization` header and the token requirement.
    pub bypass: bool,
}

impl RequestConfig {
    /// Configuration of a protected service.
    #[must_use]
    pub fn authenticated(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token,
            bypass: false,
        }
    }

    /// Configuration of a public service: never sends credentials.
    #[must_use]
    pub fn public(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            bypass: true,
        }
    }
}

/// Typed HTTP request service over a [`Transport`].
///
/// # Example
///
/// ```ignore
/// use brx::{ApiService, HyperClient, RequestConfig};
///
/// let service = ApiService::new(
///     RequestConfig::public("https://jsonplaceholder.typicode.com"),
///     HyperClient::new(),
/// );
/// let posts: Vec<serde_json::Value> = service.get("/posts?_limit=5", &[], None).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ApiService<T: Transport = HyperClient> {
    config: RequestConfig,
    transport: T,
}

impl<T: Transport> ApiService<T> {
    /// Create a service.
    pub const fn new(config: RequestConfig, transport: T) -> Self {
        Self { config, transport }
    }

    /// The service configuration.
    pub const fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// The underlying transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Perform a request and decode the JSON response into `R`.
    ///
    /// An empty success body decodes as JSON `null`, so `()` or `Option<_>`
    /// can be used for `204 No Content`.
    ///
    /// # Errors
    ///
    /// - [`Error::Api`] with status 401 when the service is protected and has
    ///   no token. Nothing is sent.
    /// - [`Error::InvalidRequest`] when a body is given to GET or DELETE.
    /// - [`Error::Api`] for any non-2xx response, and with status 0 when no
    ///   response was received.
    /// - [`Error::JsonDeserialization`] when a success body does not decode.
    pub async fn request<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        headers: &[(&str, &str)],
        body: Option<RequestBody>,
        custom_error_message: Option<&str>,
    ) -> Result<R> {
        let auth = self.authorization().inspect_err(|_| {
            warn!(%method, path, "protected request without authentication token");
        })?;

        if body.is_some() && !method.allows_body() {
            return Err(Error::invalid_request(format!("{method} requests cannot have a body")));
        }

        let raw_url = format!("{}{path}", self.config.base_url);
        let url = url::Url::parse(&raw_url).map_err(|err| {
            warn!(%method, url = raw_url, error = %err, "invalid request URL");
            ApiError::transport(custom_error_message.unwrap_or(NETWORK_ERROR_MESSAGE))
        })?;

        let mut builder = Request::builder(method, url).headers(headers.iter().copied());
        if let Some(value) = auth {
            builder = builder.header(http::header::AUTHORIZATION, value);
        }
        if let Some(body) = body {
            builder = builder.request_body(body)?;
        }

        let response = self
            .transport
            .execute(builder.build())
            .await
            .map_err(|err| {
                warn!(%method, path, error = %err, "request failed before any response");
                ApiError::transport(custom_error_message.unwrap_or(NETWORK_ERROR_MESSAGE))
            })?;

        if !response.is_success() {
            return Err(Self::http_error(response, custom_error_message).into());
        }

        debug!(%method, path, status = response.status(), "request succeeded");
        response.json()
    }

    /// Send a GET request.
    ///
    /// # Errors
    ///
    /// See [`ApiService::request`].
    pub async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        headers: &[(&str, &str)],
        custom_error_message: Option<&str>,
    ) -> Result<R> {
        self.request(Method::Get, path, headers, None, custom_error_message)
            .await
    }

    /// Send a POST request.
    ///
    /// # Errors
    ///
    /// See [`ApiService::request`].
    pub async fn post<R: DeserializeOwned>(
        &self,
        path: &str,
        headers: &[(&str, &str)],
        body: Option<RequestBody>,
        custom_error_message: Option<&str>,
    ) -> Result<R> {
        self.request(Method::Post, path, headers, body, custom_error_message)
            .await
    }

    /// Send a PUT request.
    ///
    /// # Errors
    ///
    /// See [`ApiService::request`].
    pub async fn put<R: DeserializeOwned>(
        &self,
        path: &str,
        headers: &[(&str, &str)],
        body: Option<RequestBody>,
        custom_error_message: Option<&str>,
    ) -> Result<R> {
        self.request(Method::Put, path, headers, body, custom_error_message)
            .await
    }

    /// Send a PATCH request.
    ///
    /// # Errors
    ///
    /// See [`ApiService::request`].
    pub async fn patch<R: DeserializeOwned>(
        &self,
        path: &str,
        headers: &[(&str, &str)],
        body: Option<RequestBody>,
        custom_error_message: Option<&str>,
    ) -> Result<R> {
        self.request(Method::Patch, path, headers, body, custom_error_message)
            .await
    }

    /// Send a DELETE request.
    ///
    /// # Errors
    ///
    /// See [`ApiService::request`].
    pub async fn delete<R: DeserializeOwned>(
        &self,
        path: &str,
        headers: &[(&str, &str)],
        custom_error_message: Option<&str>,
    ) -> Result<R> {
        self.request(Method::Delete, path, headers, None, custom_error_message)
            .await
    }

    /// `Authorization` header value, `None` when bypassing.
    fn authorization(&self) -> std::result::Result<Option<String>, ApiError> {
        if self.config.bypass {
            return Ok(None);
        }
        match self.config.token.as_deref() {
            Some(token) if !token.is_empty() => Ok(Some(format!("Bearer {token}"))),
            _ => Err(ApiError::auth_required()),
        }
    }

    fn http_error(response: Response<Bytes>, custom_error_message: Option<&str>) -> ApiError {
        let body = response.error_body();

        let message = custom_error_message.map_or_else(
            || ApiError::backend_message(&body).unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string()),
            str::to_string,
        );

        warn!(status = response.status(), message, "request failed with HTTP error");
        ApiError::from_response(message, body, response)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use assert2::{check, let_assert};
    use serde_json::{Map, Value};

    use super::*;
    use crate::{ApiErrorKind, TransportError};

    /// Records requests and answers with a canned result.
    struct FakeTransport {
        answer: std::result::Result<(u16, &'static str), TransportError>,
        seen: Mutex<Vec<Request<Bytes>>>,
    }

    impl FakeTransport {
        fn respond(status: u16, body: &'static str) -> Self {
            Self {
                answer: Ok((status, body)),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn fail(err: TransportError) -> Self {
            Self {
                answer: Err(err),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().expect("lock").len()
        }

        fn last(&self) -> Request<Bytes> {
            self.seen.lock().expect("lock").last().cloned().expect("a request")
        }
    }

    impl Transport for FakeTransport {
        async fn execute(
            &self,
            request: Request<Bytes>,
        ) -> std::result::Result<Response<Bytes>, TransportError> {
            self.seen.lock().expect("lock").push(request);
            self.answer.clone().map(|(status, body)| {
                Response::new(status, HashMap::new(), Bytes::from_static(body.as_bytes()))
            })
        }
    }

    fn protected(token: Option<&str>, transport: FakeTransport) -> ApiService<FakeTransport> {
        ApiService::new(
            RequestConfig::authenticated("http://api.test", token.map(str::to_string)),
            transport,
        )
    }

    #[tokio::test]
    async fn missing_token_fails_before_sending() {
        let service = protected(None, FakeTransport::respond(200, "{}"));

        let result = service.get::<Value>("/posts", &[], None).await;

        let_assert!(Err(Error::Api(err)) = result);
        check!(err.status() == 401);
        check!(err.kind() == ApiErrorKind::AuthRequired);
        check!(err.message() == "Authentication token is required for this request");
        check!(service.transport().calls() == 0);
    }

    #[tokio::test]
    async fn empty_token_counts_as_missing() {
        let service = protected(Some(""), FakeTransport::respond(200, "{}"));
        let result = service.get::<Value>("/posts", &[], None).await;
        check!(result.is_err_and(|err| err.is_unauthenticated()));
        check!(service.transport().calls() == 0);
    }

    #[tokio::test]
    async fn token_is_sent_as_bearer() {
        let service = protected(Some("abc"), FakeTransport::respond(200, "[]"));

        let posts: Vec<Value> = service
            .get("/posts", &[("X-Trace", "1")], None)
            .await
            .expect("success");

        check!(posts.is_empty());
        let request = service.transport().last();
        check!(request.header("authorization") == Some("Bearer abc"));
        check!(request.header("x-trace") == Some("1"));
        check!(request.url().as_str() == "http://api.test/posts");
    }

    #[tokio::test]
    async fn bypass_never_sends_authorization() {
        let service = ApiService::new(
            RequestConfig {
                base_url: "http://api.test".to_string(),
                token: Some("ignored".to_string()),
                bypass: true,
            },
            FakeTransport::respond(200, "null"),
        );

        let _: Option<Value> = service.get("/posts", &[], None).await.expect("success");
        check!(service.transport().last().header("authorization").is_none());
    }

    #[tokio::test]
    async fn body_on_get_is_rejected() {
        let service = ApiService::new(
            RequestConfig::public("http://api.test"),
            FakeTransport::respond(200, "{}"),
        );

        let body = RequestBody::json(&serde_json::json!({ "a": 1 })).expect("object");
        let result = service
            .request::<Value>(Method::Get, "/posts", &[], Some(body), None)
            .await;

        let_assert!(Err(Error::InvalidRequest(_)) = result);
        check!(service.transport().calls() == 0);
    }

    #[tokio::test]
    async fn json_body_sets_content_type() {
        let service = ApiService::new(
            RequestConfig::public("http://api.test"),
            FakeTransport::respond(201, r#"{"id":"t1"}"#),
        );

        let body = RequestBody::json(&serde_json::json!({ "text": "milk" })).expect("object");
        let created: Value = service
            .post("/tasks", &[], Some(body), None)
            .await
            .expect("created");

        check!(created["id"] == "t1");
        let request = service.transport().last();
        check!(request.header("content-type") == Some("application/json"));
        check!(request.body().map(Bytes::as_ref) == Some(br#"{"text":"milk"}"#.as_slice()));
    }

    #[tokio::test]
    async fn transport_failure_has_status_zero() {
        let service = ApiService::new(
            RequestConfig::public("http://api.test"),
            FakeTransport::fail(TransportError::Timeout),
        );

        let result = service.get::<Value>("/posts", &[], None).await;
        let_assert!(Err(Error::Api(err)) = result);
        check!(err.status() == 0);
        check!(err.message() == "Network error occurred");
        check!(err.response().is_none());

        let result = service.get::<Value>("/posts", &[], Some("Posts are down")).await;
        let_assert!(Err(Error::Api(err)) = result);
        check!(err.message() == "Posts are down");
    }

    #[tokio::test]
    async fn invalid_url_is_a_transport_failure() {
        let service = ApiService::new(
            RequestConfig::public(""),
            FakeTransport::respond(200, "{}"),
        );

        let result = service.get::<Value>("/posts", &[], None).await;
        let_assert!(Err(Error::Api(err)) = result);
        check!(err.status() == 0);
        check!(service.transport().calls() == 0);
    }

    #[tokio::test]
    async fn http_error_message_priority() {
        let service = ApiService::new(
            RequestConfig::public("http://api.test"),
            FakeTransport::respond(422, r#"{"error":"bad title","detail":"too long"}"#),
        );

        let result = service.get::<Value>("/posts", &[], None).await;
        let_assert!(Err(Error::Api(err)) = result);
        check!(err.message() == "bad title");
        check!(err.status() == 422);
        check!(err.response().map(Response::status) == Some(422));

        let result = service.get::<Value>("/posts", &[], Some("custom")).await;
        let_assert!(Err(Error::Api(err)) = result);
        check!(err.message() == "custom");
        check!(err.body().and_then(|b| b.get("detail")) == Some(&Value::from("too long")));
    }

    #[tokio::test]
    async fn unparsable_error_body_yields_empty_map() {
        let service = ApiService::new(
            RequestConfig::public("http://api.test"),
            FakeTransport::respond(502, "<html>bad gateway</html>"),
        );

        let result = service.get::<Value>("/posts", &[], None).await;
        let_assert!(Err(Error::Api(err)) = result);
        check!(err.message() == "Unknown error");
        check!(err.body().is_some_and(Map::is_empty));
    }

    #[tokio::test]
    async fn empty_success_body_decodes_as_null() {
        let service = ApiService::new(
            RequestConfig::public("http://api.test"),
            FakeTransport::respond(204, ""),
        );

        service
            .delete::<()>("/tasks/1", &[], None)
            .await
            .expect("no content");

        let missing: Option<Value> = service.delete("/tasks/1", &[], None).await.expect("null");
        check!(missing.is_none());
    }

    #[tokio::test]
    async fn malformed_success_body_is_a_decoding_error() {
        let service = ApiService::new(
            RequestConfig::public("http://api.test"),
            FakeTransport::respond(200, r#"{"id":"not a number"}"#),
        );

        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Created {
            id: u64,
        }

        let result = service.get::<Created>("/tasks/1", &[], None).await;
        let_assert!(Err(Error::JsonDeserialization { path, .. }) = result);
        check!(path == "id");
    }
}
