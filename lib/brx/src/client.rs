//! The default [`Transport`]: a pooled hyper client behind a tower stack.
//!
//! ```text
//! HyperClient ── Shared ── [layer N … layer 1] ── RoundTrip ── hyper pool ── network
//! ```
//!
//! `RoundTrip` is the only part that speaks hyper. Everything above it deals
//! in [`Request`]/[`Response`], so any tower layer written against those
//! types can be stacked with [`HyperClientBuilder::layer`].

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use tower::util::BoxCloneService;
use tower::{Layer, ServiceExt};
use tower_service::Service;

use crate::config::{ClientConfig, ClientConfigBuilder};
use crate::middleware::LoggingLayer;
use crate::{Request, Response, Transport, TransportError};

/// A type-erased middleware stack.
pub type BoxedService = BoxCloneService<Request<Bytes>, Response<Bytes>, TransportError>;

/// Future returned by every service in the stack.
pub type ServiceFuture =
    Pin<Box<dyn Future<Output = Result<Response<Bytes>, TransportError>> + Send + 'static>>;

type LayerFn = Arc<dyn Fn(BoxedService) -> BoxedService + Send + Sync>;

// `BoxCloneService` is not `Sync`; each call works on its own clone.
#[derive(Clone)]
struct Shared(Arc<Mutex<BoxedService>>);

impl Shared {
    fn call(&self, request: Request<Bytes>) -> ServiceFuture {
        let mut stack = self.0.lock().unwrap_or_else(PoisonError::into_inner).clone();
        Box::pin(async move { stack.ready().await?.call(request).await })
    }
}

/// One request through the hyper pool.
#[derive(Clone)]
struct RoundTrip {
    pool: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    timeout: Duration,
}

impl RoundTrip {
    fn new(config: &ClientConfig) -> Self {
        let pool = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(connector(config.connect_timeout));

        Self {
            pool,
            timeout: config.timeout,
        }
    }

    async fn send(self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        let request = to_hyper(request)?;

        let response = tokio::time::timeout(self.timeout, self.pool.request(request))
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|err| classify(&err))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
            .collect::<HashMap<_, _>>();

        // The timeout covers the head only; a stalled body surfaces as a connection error
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|err| TransportError::connection(err.to_string()))?
            .to_bytes();

        Ok(Response::new(status, headers, body))
    }
}

impl Service<Request<Bytes>> for RoundTrip {
    type Response = Response<Bytes>;
    type Error = TransportError;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), TransportError>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        Box::pin(self.clone().send(request))
    }
}

/// HTTPS (rustls, Mozilla roots) that also accepts plain `http://`.
fn connector(connect_timeout: Duration) -> HttpsConnector<HttpConnector> {
    let roots: rustls::RootCertStore = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    let tls = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(connect_timeout));

    HttpsConnectorBuilder::new()
        .with_tls_config(tls)
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .wrap_connector(http)
}

fn to_hyper(request: Request<Bytes>) -> Result<http::Request<Full<Bytes>>, TransportError> {
    let (method, url, headers, body) = request.into_parts();

    let mut builder = http::Request::builder()
        .method(http::Method::from(method))
        .uri(url.as_str());
    for (name, value) in &headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder
        .body(Full::new(body.unwrap_or_default()))
        .map_err(|err| TransportError::InvalidRequest(err.to_string()))
}

fn classify(err: &hyper_util::client::legacy::Error) -> TransportError {
    let message = err.to_string();
    let lower = message.to_ascii_lowercase();
    if !err.is_connect() && ["tls", "ssl", "certificate"].iter().any(|hint| lower.contains(hint)) {
        TransportError::tls(message)
    } else {
        TransportError::connection(message)
    }
}

/// Pooled HTTP/1.1 and HTTP/2 transport with TLS, a per-request timeout and
/// an optional tower middleware stack.
///
/// Each call makes exactly one attempt.
///
/// ```ignore
/// use brx::HyperClient;
///
/// let transport = HyperClient::builder()
///     .timeout(std::time::Duration::from_secs(10))
///     .with_logging()
///     .build();
/// ```
#[derive(Clone)]
pub struct HyperClient {
    stack: Shared,
    config: ClientConfig,
}

impl std::fmt::Debug for HyperClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for HyperClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperClient {
    /// Default configuration, no middleware.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Given configuration, no middleware.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        Self::builder().config(&config).build()
    }

    /// Start configuring a client.
    #[must_use]
    pub fn builder() -> HyperClientBuilder {
        HyperClientBuilder::default()
    }

    /// Effective configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Transport for HyperClient {
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        self.stack.call(request).await
    }
}

impl Service<Request<Bytes>> for HyperClient {
    type Response = Response<Bytes>;
    type Error = TransportError;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), TransportError>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        self.stack.call(request)
    }
}

/// Builder for [`HyperClient`].
#[derive(Default)]
pub struct HyperClientBuilder {
    config: ClientConfigBuilder,
    layers: Vec<LayerFn>,
}

impl std::fmt::Debug for HyperClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperClientBuilder")
            .field("config", &self.config)
            .field("layers", &self.layers.len())
            .finish()
    }
}

impl HyperClientBuilder {
    /// Start from an existing configuration.
    #[must_use]
    pub fn config(mut self, config: &ClientConfig) -> Self {
        self.config = ClientConfigBuilder::from(config);
        self
    }

    /// Limit on the time until response headers arrive.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Limit on establishing a connection.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    /// Idle connections kept per host.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config = self.config.pool_idle_per_host(count);
        self
    }

    /// Wrap the stack in `layer`. The first layer added sits closest to the network.
    #[must_use]
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request<Bytes>, Response = Response<Bytes>, Error = TransportError>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<Request<Bytes>>>::Future: Send,
    {
        self.layers
            .push(Arc::new(move |inner| BoxCloneService::new(layer.layer(inner))));
        self
    }

    /// Log a summary of every round-trip.
    #[must_use]
    pub fn with_logging(self) -> Self {
        self.layer(LoggingLayer::new())
    }

    /// Log every round-trip with its (redacted) headers.
    #[must_use]
    pub fn with_debug_logging(self) -> Self {
        self.layer(LoggingLayer::debug())
    }

    /// Assemble the client.
    #[must_use]
    pub fn build(self) -> HyperClient {
        let config = self.config.build();
        let stack = self
            .layers
            .iter()
            .fold(BoxCloneService::new(RoundTrip::new(&config)), |inner, wrap| wrap(inner));

        HyperClient {
            stack: Shared(Arc::new(Mutex::new(stack))),
            config,
        }
    }
}
