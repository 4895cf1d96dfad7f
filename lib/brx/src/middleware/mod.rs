//! Tower middleware layers for the HTTP transport.
//!
//! Layers wrap the raw hyper service and are added through
//! [`HyperClientBuilder::layer`](crate::HyperClientBuilder::layer). The first
//! layer added is the innermost one.
//!
//! - [`LoggingLayer`] logs requests and responses using `tracing`
//! - [`ConcurrencyLimitLayer`] (tower) limits concurrent requests

mod logging;

pub use logging::{LoggingLayer, RoundTripLog, Verbosity};

pub use tower::limit::ConcurrencyLimitLayer;
pub use tower::{Layer, ServiceBuilder};
