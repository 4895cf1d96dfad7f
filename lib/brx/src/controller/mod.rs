//! Controller layer.
//!
//! A controller owns one [`HttpClient`] and exposes domain methods on top of
//! it. Clients come in two flavors, [`AuthenticatedClient`] and
//! [`PublicClient`], chosen at construction (directly or through a
//! [`ClientFactory`]).
//!
//! Domain methods convert request failures with [`handle_error`], so callers
//! only see a user-facing message for HTTP and transport failures.

mod client;
mod posts;
mod tasks;

use std::future::Future;

use serde::de::DeserializeOwned;

pub use client::{Access, AuthenticatedClient, ClientFactory, ConfiguredClient, PublicClient};
pub use posts::{Post, PostController, Posts};
pub use tasks::{Ack, NewTask, Task, TaskController, Tasks};

use crate::{ApiService, Error, RequestBody, Result, Transport};

/// Capability shared by every client a controller can hold.
///
/// Only [`HttpClient::service`] must be implemented; the verbs delegate to it.
pub trait HttpClient: Send + Sync {
    /// The transport of the owned service.
    type Transport: Transport;

    /// The owned Request Service.
    fn service(&self) -> &ApiService<Self::Transport>;

    /// Send a GET request.
    ///
    /// # Errors
    ///
    /// See [`ApiService::request`].
    fn get<R: DeserializeOwned + Send>(
        &self,
        path: &str,
        headers: &[(&str, &str)],
        custom_error_message: Option<&str>,
    ) -> impl Future<Output = Result<R>> + Send {
        self.service().get(path, headers, custom_error_message)
    }

    /// Send a POST request.
    ///
    /// # Errors
    ///
    /// See [`ApiService::request`].
    fn post<R: DeserializeOwned + Send>(
        &self,
        path: &str,
        headers: &[(&str, &str)],
        body: Option<RequestBody>,
        custom_error_message: Option<&str>,
    ) -> impl Future<Output = Result<R>> + Send {
        self.service().post(path, headers, body, custom_error_message)
    }

    /// Send a PUT request.
    ///
    /// # Errors
    ///
    /// See [`ApiService::request`].
    fn put<R: DeserializeOwned + Send>(
        &self,
        path: &str,
        headers: &[(&str, &str)],
        body: Option<RequestBody>,
        custom_error_message: Option<&str>,
    ) -> impl Future<Output = Result<R>> + Send {
        self.service().put(path, headers, body, custom_error_message)
    }

    /// Send a PATCH request.
    ///
    /// # Errors
    ///
    /// See [`ApiService::request`].
    fn patch<R: DeserializeOwned + Send>(
        &self,
        path: &str,
        headers: &[(&str, &str)],
        body: Option<RequestBody>,
        custom_error_message: Option<&str>,
    ) -> impl Future<Output = Result<R>> + Send {
        self.service().patch(path, headers, body, custom_error_message)
    }

    /// Send a DELETE request.
    ///
    /// # Errors
    ///
    /// See [`ApiService::request`].
    fn delete<R: DeserializeOwned + Send>(
        &self,
        path: &str,
        headers: &[(&str, &str)],
        custom_error_message: Option<&str>,
    ) -> impl Future<Output = Result<R>> + Send {
        self.service().delete(path, headers, custom_error_message)
    }
}

/// Convert a request failure into a user-facing [`Error::Message`].
///
/// [`Error::Api`] becomes its [`ApiError::error_message`](crate::ApiError::error_message);
/// every other error is returned unchanged.
#[must_use]
pub fn handle_error(error: Error) -> Error {
    match error {
        Error::Api(err) => Error::Message(err.error_message()),
        other => other,
    }
}
