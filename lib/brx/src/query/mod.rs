//! Data-binding factory.
//!
//! [`create_query_method`] and [`create_mutation_method`] turn a descriptor
//! (key, async function, optional [`Schema`], options) into a reusable
//! binding. Caching, staleness and de-duplication of identical in-flight
//! keys are delegated to the [`QueryClient`]; a binding only adds key
//! normalization and the schema gate.
//!
//! ```ignore
//! use brx::{JsonSchema, QueryClient, QueryDescriptor, create_query_method, query_key};
//!
//! let client = QueryClient::new();
//! let posts = create_query_method(
//!     QueryDescriptor::new(query_key!["posts", 5], move || {
//!         let controller = controller.clone();
//!         async move { controller.get_posts_as::<serde_json::Value>(Some(5)).await }
//!     })
//!     .schema(JsonSchema::<Posts>::new()),
//! );
//!
//! let result = posts.use_hook(&client).await;
//! ```

mod client;
mod key;
mod mutation;
mod schema;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tracing::warn;

pub use client::{CachedValue, QueryClient, QueryClientBuilder};
pub use key::{KeyPart, QueryKey};
pub use mutation::{
    MutationDescriptor, MutationHook, MutationMethod, MutationOptions, MutationState,
    create_mutation_method,
};
pub use schema::{JsonSchema, Schema, Unchecked, Validator};

use crate::{Error, Result};

/// Options of a query binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Disabled queries never call their function.
    pub enabled: bool,
    /// Freshness window; the client default when `None`.
    pub stale_time: Option<Duration>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            stale_time: None,
        }
    }
}

/// What a query binding reports to its caller.
#[derive(Debug, Clone)]
pub struct QueryResult<T> {
    /// The resolved value.
    pub data: Option<T>,
    /// `true` while a value is expected but not available yet.
    pub is_loading: bool,
    /// The failure of the last fetch.
    pub error: Option<Error>,
}

impl<T> QueryResult<T> {
    fn settled(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self {
                data: Some(data),
                is_loading: false,
                error: None,
            },
            Err(error) => Self {
                data: None,
                is_loading: false,
                error: Some(error),
            },
        }
    }

    /// Returns `true` when data is available.
    pub const fn is_success(&self) -> bool {
        self.data.is_some()
    }

    /// Returns `true` when the last fetch failed.
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Input of [`create_query_method`].
pub struct QueryDescriptor<F, S> {
    /// Cache entry identity.
    pub key: QueryKey,
    /// Produces the value.
    pub fetch: F,
    /// Gate applied to the value before it is cached.
    pub schema: S,
    /// Query options.
    pub options: QueryOptions,
}

impl<F, T> QueryDescriptor<F, Unchecked<T>> {
    /// A descriptor without schema and with default options.
    pub fn new<Fut>(key: impl Into<QueryKey>, fetch: F) -> Self
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        Self {
            key: key.into(),
            fetch,
            schema: Unchecked::new(),
            options: QueryOptions::default(),
        }
    }
}

impl<F, S> QueryDescriptor<F, S> {
    /// Validate the fetched value with `schema`.
    pub fn schema<S2: Schema>(self, schema: S2) -> QueryDescriptor<F, S2> {
        QueryDescriptor {
            key: self.key,
            fetch: self.fetch,
            schema,
            options: self.options,
        }
    }

    /// Replace the options.
    #[must_use]
    pub const fn options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }
}

type QueryFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// A query binding, produced by [`create_query_method`].
pub struct QueryMethod<T> {
    key: QueryKey,
    options: QueryOptions,
    fetch: QueryFn<T>,
}

impl<T> Clone for QueryMethod<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            options: self.options,
            fetch: Arc::clone(&self.fetch),
        }
    }
}

impl<T> std::fmt::Debug for QueryMethod<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryMethod")
            .field("key", &self.key)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<T: Clone + Send + Sync + 'static> QueryMethod<T> {
    /// The cache key.
    pub const fn key(&self) -> &QueryKey {
        &self.key
    }

    /// The options.
    pub const fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Subscribe: serve the fresh cached value, or fetch and cache a new one.
    ///
    /// A disabled query only reports what is already cached.
    pub async fn use_hook(&self, client: &QueryClient) -> QueryResult<T> {
        if !self.options.enabled {
            return self.snapshot(client).await;
        }
        QueryResult::settled(self.fetch(client).await)
    }

    /// Current state without triggering a fetch.
    pub async fn snapshot(&self, client: &QueryClient) -> QueryResult<T> {
        let data = client.get_query_data(&self.key).await;
        QueryResult {
            is_loading: self.options.enabled && data.is_none(),
            data,
            error: None,
        }
    }

    /// Like [`QueryMethod::use_hook`], as a `Result`. Ignores `enabled`.
    ///
    /// # Errors
    ///
    /// Returns the fetch error or the schema [`Error::Validation`].
    pub async fn fetch(&self, client: &QueryClient) -> Result<T> {
        let stale_time = self
            .options
            .stale_time
            .unwrap_or_else(|| client.default_stale_time());
        client
            .fetch_query(&self.key, stale_time, || (self.fetch)())
            .await
    }
}

/// Build a query binding from a descriptor.
pub fn create_query_method<F, Fut, S>(descriptor: QueryDescriptor<F, S>) -> QueryMethod<S::Output>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<S::Input>> + Send + 'static,
    S: Schema + 'static,
{
    let QueryDescriptor {
        key,
        fetch,
        schema,
        options,
    } = descriptor;

    let schema = Arc::new(schema);
    let log_key = key.clone();
    let fetch: QueryFn<S::Output> = Arc::new(move || {
        let schema = Arc::clone(&schema);
        let key = log_key.clone();
        let pending = fetch();
        Box::pin(async move {
            let value = pending.await?;
            schema.parse(value).inspect_err(|err| {
                warn!(key = %key, error = %err, "query result rejected by schema");
            })
        })
    });

    QueryMethod {
        key,
        options,
        fetch,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert2::{check, let_assert};
    use serde_json::json;

    use super::*;
    use crate::{Posts, query_key};

    fn counting(calls: &Arc<AtomicUsize>, value: serde_json::Value) -> impl Fn() -> BoxFuture<'static, Result<serde_json::Value>> + Send + Sync + 'static {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let value = value.clone();
            Box::pin(async move { Ok(value) })
        }
    }

    #[tokio::test]
    async fn schema_gate_validates_before_caching() {
        let client = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let payload = json!([{ "userId": 1, "id": 1, "title": "t", "body": "b" }]);

        let posts = create_query_method(
            QueryDescriptor::new(query_key!["posts", 1], counting(&calls, payload))
                .schema(JsonSchema::<Posts>::new()),
        );

        let result = posts.use_hook(&client).await;
        check!(result.error.is_none());
        check!(result.data.as_ref().map(Vec::len) == Some(1));

        let again = posts.use_hook(&client).await;
        check!(again.is_success());
        check!(calls.load(Ordering::SeqCst) == 1);
    }

    #[tokio::test]
    async fn schema_failure_is_a_fetch_error() {
        let client = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let posts = create_query_method(
            QueryDescriptor::new(query_key!["posts", 2], counting(&calls, json!({ "not": "a list" })))
                .schema(JsonSchema::<Posts>::new()),
        );

        let result = posts.use_hook(&client).await;
        check!(result.data.is_none());
        let_assert!(Some(Error::Validation { .. }) = result.error);
        check!(client.get_query_data::<Posts>(posts.key()).await.is_none());
    }

    #[tokio::test]
    async fn disabled_query_never_fetches() {
        let client = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let query = create_query_method(
            QueryDescriptor::new(query_key!["posts"], counting(&calls, json!([]))).options(
                QueryOptions {
                    enabled: false,
                    ..QueryOptions::default()
                },
            ),
        );

        let result = query.use_hook(&client).await;
        check!(result.data.is_none());
        check!(!result.is_loading);
        check!(calls.load(Ordering::SeqCst) == 0);
    }

    #[tokio::test]
    async fn snapshot_reports_loading_until_cached() {
        let client = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let query = create_query_method(QueryDescriptor::new(
            query_key!["tasks"],
            counting(&calls, json!(["a"])),
        ));

        check!(query.snapshot(&client).await.is_loading);
        query.use_hook(&client).await;
        let snapshot = query.snapshot(&client).await;
        check!(!snapshot.is_loading);
        check!(snapshot.data == Some(json!(["a"])));
    }

    #[tokio::test]
    async fn stale_entries_are_refetched() {
        let client = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let query = create_query_method(
            QueryDescriptor::new(query_key!["posts", 9], counting(&calls, json!([]))).options(
                QueryOptions {
                    stale_time: Some(Duration::ZERO),
                    ..QueryOptions::default()
                },
            ),
        );

        query.use_hook(&client).await;
        query.use_hook(&client).await;
        check!(calls.load(Ordering::SeqCst) == 2);
    }
}
