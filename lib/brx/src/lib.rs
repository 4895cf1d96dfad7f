//! Typed API-access layer for a single-page application template.
//!
//! - [`ApiService`] performs one typed HTTP request and normalizes every
//!   failure into an [`ApiError`]
//! - controllers ([`PostController`], [`TaskController`]) hold an
//!   [`HttpClient`], either [`AuthenticatedClient`] or [`PublicClient`]
//! - [`create_query_method`] and [`create_mutation_method`] bind async
//!   functions to a shared [`QueryClient`] cache, with an optional [`Schema`]
//! - [`Router`] maps hrefs to [`Page`]s and applies the auth guards
//!
//! # Example
//!
//! ```ignore
//! use brx::prelude::*;
//!
//! let posts = PostController::new(PublicClient::new("https://jsonplaceholder.typicode.com"));
//! let page = PostsPage::new(posts);
//! let client = QueryClient::new();
//!
//! let router = Router::new("/", RouteContext::new(TemplateToken.token()));
//! if let Navigation::Render { page: Page::Posts, location } = router.navigate("/posts?limit=5") {
//!     let view = page.view(&client, &location).await;
//!     println!("{} posts", view.posts.len());
//! }
//! ```

mod client;
mod config;
mod controller;
mod credentials;
pub mod middleware;
mod pages;
pub mod prelude;
mod query;
mod router;
mod service;

pub use client::{BoxedService, HyperClient, HyperClientBuilder, ServiceFuture};
pub use config::{
    AppConfig, BACKEND_API_BASE_URL_VAR, BASEPATH_VAR, ClientConfig, ClientConfigBuilder,
    PORT_VAR, REPO_NAME_VAR,
};
pub use controller::{
    Access, Ack, AuthenticatedClient, ClientFactory, ConfiguredClient, HttpClient, NewTask, Post,
    PostController, Posts, PublicClient, Task, TaskController, Tasks, handle_error,
};
pub use credentials::{EnvToken, StaticToken, TemplateToken, TokenProvider};
pub use pages::{DEFAULT_POSTS_LIMIT, PostsPage, PostsView, TasksPage, TasksView};
pub use query::{
    CachedValue, JsonSchema, KeyPart, MutationDescriptor, MutationHook, MutationMethod,
    MutationOptions, MutationState, QueryClient, QueryClientBuilder, QueryDescriptor, QueryKey,
    QueryMethod, QueryOptions, QueryResult, Schema, Unchecked, Validator, create_mutation_method,
    create_query_method,
};
pub use router::{
    AuthState, Guard, HOME_PATH, LOGIN_PATH, Location, Navigation, POSTS_PATH, Page, ROUTES,
    Route, RouteContext, Router, SIGNUP_PATH,
};
pub use service::{ApiService, RequestConfig};

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use brx_core::{
    AUTH_REQUIRED_MESSAGE, ApiError, ApiErrorKind, ContentType, Error, Form, Method,
    NETWORK_ERROR_MESSAGE, Part, Request, RequestBody, RequestBuilder, Response, Result,
    StatusCode, Transport, TransportError, UNKNOWN_ERROR_MESSAGE, from_json, from_value, header,
    to_json, to_query_string,
};

pub use url;
