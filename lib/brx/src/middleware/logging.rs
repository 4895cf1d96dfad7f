//! One `tracing` record per round-trip.
//!
//! Every request runs inside an `api_call` span carrying the verb and URL.
//! Completion is logged at `info` for 2xx and `warn` for anything else,
//! along with the elapsed milliseconds.

use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use tower::{Layer, Service, ServiceExt};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::{Request, Response, ServiceFuture, TransportError};

/// How much of the request is written out before it is sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Verb and URL.
    #[default]
    Summary,
    /// Verb, URL and headers, at `debug`.
    Headers,
}

/// Tower layer producing [`RoundTripLog`].
///
/// ```ignore
/// use brx::{HyperClient, middleware::LoggingLayer};
///
/// let transport = HyperClient::builder().layer(LoggingLayer::debug()).build();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLayer {
    verbosity: Verbosity,
}

impl LoggingLayer {
    /// Summaries only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Include request headers. `Authorization` is always masked.
    #[must_use]
    pub const fn debug() -> Self {
        Self {
            verbosity: Verbosity::Headers,
        }
    }

    /// The chosen verbosity.
    #[must_use]
    pub const fn verbosity(&self) -> Verbosity {
        self.verbosity
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = RoundTripLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RoundTripLog {
            inner,
            verbosity: self.verbosity,
        }
    }
}

/// Service added by [`LoggingLayer`].
#[derive(Debug, Clone)]
pub struct RoundTripLog<S> {
    inner: S,
    verbosity: Verbosity,
}

/// `name: value` lines with credentials masked.
fn redacted_headers(request: &Request<Bytes>) -> Vec<String> {
    let mut lines: Vec<String> = request
        .headers()
        .iter()
        .map(|(name, value)| match name.as_str() {
            "authorization" => format!("{name}: ***"),
            _ => format!("{name}: {value}"),
        })
        .collect();
    lines.sort();
    lines
}

impl<S> Service<Request<Bytes>> for RoundTripLog<S>
where
    S: Service<Request<Bytes>, Response = Response<Bytes>, Error = TransportError>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
{
    type Response = Response<Bytes>;
    type Error = TransportError;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), TransportError>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let span = info_span!("api_call", method = %request.method(), url = %request.url());
        match self.verbosity {
            Verbosity::Headers => {
                span.in_scope(|| debug!(headers = ?redacted_headers(&request), "sending"));
            }
            Verbosity::Summary => span.in_scope(|| info!("sending")),
        }

        let inner = self.inner.clone();
        Box::pin(
            async move {
                let started = Instant::now();
                let outcome = inner.oneshot(request).await;
                let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

                match &outcome {
                    Ok(response) if response.is_success() => {
                        info!(status = response.status(), elapsed_ms, "done");
                    }
                    Ok(response) => warn!(status = response.status(), elapsed_ms, "http error"),
                    Err(err) => warn!(error = %err, elapsed_ms, "no response"),
                }
                outcome
            }
            .instrument(span),
        )
    }
}
