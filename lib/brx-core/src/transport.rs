//! The transport seam.
//!
//! A [`Transport`] performs exactly one network round-trip for a fully built
//! request. It knows nothing about base URLs, tokens or error bodies: a
//! non-2xx response is still `Ok`. The Request Service on top of it turns
//! statuses and [`TransportError`]s into [`ApiError`](crate::ApiError)s.
//!
//! Implement it to plug in another HTTP stack or a recording fake for tests.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;

use crate::{Request, Response, TransportError};

/// Executes HTTP requests.
pub trait Transport: Send + Sync {
    /// Execute an HTTP request and return the response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns an error when no response could be obtained:
    /// - Network errors
    /// - TLS errors
    /// - Timeouts
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Response<Bytes>, TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Response<Bytes>, TransportError>> + Send {
        T::execute(self, request)
    }
}
