use std::sync::Arc;

use super::HttpClient;
use crate::{ApiService, HyperClient, RequestConfig, TokenProvider, Transport};

/// Client of protected endpoints: every request carries `Authorization: Bearer`.
///
/// The token is read from the provider once, here. A missing token does not
/// fail construction; each request then fails with status 401 instead.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient<T: Transport = HyperClient> {
    service: ApiService<T>,
}

impl AuthenticatedClient {
    /// Create a client over a default [`HyperClient`].
    #[must_use]
    pub fn new(base_url: impl Into<String>, provider: &impl TokenProvider) -> Self {
        Self::with_transport(base_url, provider, HyperClient::new())
    }
}

impl<T: Transport> AuthenticatedClient<T> {
    /// Create a client over the given transport.
    pub fn with_transport(
        base_url: impl Into<String>,
        provider: &impl TokenProvider,
        transport: T,
    ) -> Self {
        let config = RequestConfig::authenticated(base_url, provider.token());
        Self {
            service: ApiService::new(config, transport),
        }
    }
}

impl<T: Transport> HttpClient for AuthenticatedClient<T> {
    type Transport = T;

    fn service(&self) -> &ApiService<T> {
        &self.service
    }
}

/// Client of public endpoints: never sends credentials.
#[derive(Debug, Clone)]
pub struct PublicClient<T: Transport = HyperClient> {
    service: ApiService<T>,
}

impl PublicClient {
    /// Create a client over a default [`HyperClient`].
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_transport(base_url, HyperClient::new())
    }
}

impl<T: Transport> PublicClient<T> {
    /// Create a client over the given transport.
    pub fn with_transport(base_url: impl Into<String>, transport: T) -> Self {
        Self {
            service: ApiService::new(RequestConfig::public(base_url), transport),
        }
    }
}

impl<T: Transport> HttpClient for PublicClient<T> {
    type Transport = T;

    fn service(&self) -> &ApiService<T> {
        &self.service
    }
}

/// Which client flavor to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Access {
    /// Requests require a token.
    Authenticated,
    /// Requests never carry a token.
    #[default]
    Public,
}

/// A client whose flavor was picked at runtime.
#[derive(Debug, Clone)]
pub enum ConfiguredClient<T: Transport = HyperClient> {
    /// See [`AuthenticatedClient`].
    Authenticated(AuthenticatedClient<T>),
    /// See [`PublicClient`].
    Public(PublicClient<T>),
}

impl<T: Transport> ConfiguredClient<T> {
    /// The flavor of this client.
    pub const fn access(&self) -> Access {
        match self {
            Self::Authenticated(_) => Access::Authenticated,
            Self::Public(_) => Access::Public,
        }
    }
}

impl<T: Transport> HttpClient for ConfiguredClient<T> {
    type Transport = T;

    fn service(&self) -> &ApiService<T> {
        match self {
            Self::Authenticated(client) => client.service(),
            Self::Public(client) => client.service(),
        }
    }
}

/// Builds clients sharing one base URL, credential provider and transport.
///
/// # Example
///
/// ```ignore
/// use brx::{Access, ClientFactory, HyperClient, TemplateToken};
///
/// let factory = ClientFactory::new("https://api.example.com", TemplateToken, HyperClient::new());
/// let tasks = TaskController::new(factory.authenticated());
/// let posts = PostController::new(factory.public());
/// let any = factory.client(Access::Authenticated);
/// ```
#[derive(Clone)]
pub struct ClientFactory<T: Transport + Clone = HyperClient> {
    base_url: String,
    provider: Arc<dyn TokenProvider>,
    transport: T,
}

impl<T: Transport + Clone + std::fmt::Debug> std::fmt::Debug for ClientFactory<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientFactory")
            .field("base_url", &self.base_url)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

impl<T: Transport + Clone> ClientFactory<T> {
    /// Create a factory.
    pub fn new(
        base_url: impl Into<String>,
        provider: impl TokenProvider + 'static,
        transport: T,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            provider: Arc::new(provider),
            transport,
        }
    }

    /// Build a client of the requested flavor.
    pub fn client(&self, access: Access) -> ConfiguredClient<T> {
        match access {
            Access::Authenticated => ConfiguredClient::Authenticated(self.authenticated()),
            Access::Public => ConfiguredClient::Public(self.public()),
        }
    }

    /// Build an authenticated client, reading the provider now.
    pub fn authenticated(&self) -> AuthenticatedClient<T> {
        AuthenticatedClient::with_transport(
            self.base_url.clone(),
            &self.provider,
            self.transport.clone(),
        )
    }

    /// Build a public client.
    pub fn public(&self) -> PublicClient<T> {
        PublicClient::with_transport(self.base_url.clone(), self.transport.clone())
    }
}
