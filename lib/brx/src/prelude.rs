//! Prelude module for convenient imports.
//!
//! ```ignore
//! use brx::prelude::*;
//! ```

pub use crate::{
    ApiError, ApiService, AuthenticatedClient, Error, HttpClient, HyperClient, JsonSchema,
    MutationDescriptor, MutationOptions, Navigation, Page, PostController, PostsPage,
    PublicClient, QueryClient, QueryDescriptor, QueryKey, QueryOptions, RequestBody, RequestConfig,
    Result, RouteContext, Router, Schema, TaskController, TasksPage, TemplateToken, TokenProvider,
    create_mutation_method, create_query_method, query_key,
};
pub use serde::{Deserialize, Serialize};
