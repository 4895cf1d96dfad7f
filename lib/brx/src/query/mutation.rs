use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::BoxFuture;
use tracing::{debug, warn};

use super::{QueryClient, QueryKey, Schema, Unchecked};
use crate::{Error, Result};

/// Options of a mutation binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationOptions {
    /// Query keys (prefixes) invalidated after a successful mutation.
    pub invalidates: Vec<QueryKey>,
}

impl MutationOptions {
    /// Invalidate `key` on success.
    #[must_use]
    pub fn invalidate(mut self, key: impl Into<QueryKey>) -> Self {
        self.invalidates.push(key.into());
        self
    }
}

/// State reported by a [`MutationHook`].
#[derive(Debug, Clone)]
pub struct MutationState<T> {
    /// Result of the last successful call.
    pub data: Option<T>,
    /// `true` while a call is running.
    pub is_pending: bool,
    /// Failure of the last call.
    pub error: Option<Error>,
}

impl<T> Default for MutationState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_pending: false,
            error: None,
        }
    }
}

/// Input of [`create_mutation_method`].
pub struct MutationDescriptor<F, S> {
    /// Identity of the mutation, used by [`QueryClient::is_mutating`].
    pub key: QueryKey,
    /// Performs the change.
    pub mutate: F,
    /// Gate applied to the result.
    pub schema: S,
    /// Mutation options.
    pub options: MutationOptions,
}

impl<F, T> MutationDescriptor<F, Unchecked<T>> {
    /// A descriptor without schema and with default options.
    pub fn new<V, Fut>(key: impl Into<QueryKey>, mutate: F) -> Self
    where
        F: Fn(V) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        Self {
            key: key.into(),
            mutate,
            schema: Unchecked::new(),
            options: MutationOptions::default(),
        }
    }
}

impl<F, S> MutationDescriptor<F, S> {
    /// Validate the result with `schema`.
    pub fn schema<S2: Schema>(self, schema: S2) -> MutationDescriptor<F, S2> {
        MutationDescriptor {
            key: self.key,
            mutate: self.mutate,
            schema,
            options: self.options,
        }
    }

    /// Replace the options.
    #[must_use]
    pub fn options(mut self, options: MutationOptions) -> Self {
        self.options = options;
        self
    }
}

type MutationFn<V, T> = Arc<dyn Fn(V) -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// A mutation binding, produced by [`create_mutation_method`].
pub struct MutationMethod<V, T> {
    key: QueryKey,
    options: MutationOptions,
    mutate: MutationFn<V, T>,
}

impl<V, T> Clone for MutationMethod<V, T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            options: self.options.clone(),
            mutate: Arc::clone(&self.mutate),
        }
    }
}

impl<V, T> std::fmt::Debug for MutationMethod<V, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationMethod")
            .field("key", &self.key)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<V, T: Clone> MutationMethod<V, T> {
    /// The mutation key.
    pub const fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Subscribe. Nothing runs until [`MutationHook::mutate`] is called.
    pub fn use_hook(&self, client: &QueryClient) -> MutationHook<V, T> {
        MutationHook {
            method: self.clone(),
            client: client.clone(),
            state: Arc::new(Mutex::new(MutationState::default())),
        }
    }
}

/// Trigger and state of one mutation subscription.
pub struct MutationHook<V, T> {
    method: MutationMethod<V, T>,
    client: QueryClient,
    state: Arc<Mutex<MutationState<T>>>,
}

impl<V, T> Clone for MutationHook<V, T> {
    fn clone(&self) -> Self {
        Self {
            method: self.method.clone(),
            client: self.client.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<V, T> std::fmt::Debug for MutationHook<V, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationHook")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl<V, T: Clone> MutationHook<V, T> {
    /// Snapshot of the current state.
    pub fn state(&self) -> MutationState<T> {
        self.lock().clone()
    }

    /// Forget the last result.
    pub fn reset(&self) {
        *self.lock() = MutationState::default();
    }

    /// Run the mutation with `variables`.
    ///
    /// On success the configured query keys are invalidated.
    ///
    /// # Errors
    ///
    /// Returns the error of the mutation function or of the schema.
    pub async fn mutate(&self, variables: V) -> Result<T> {
        {
            let mut state = self.lock();
            state.is_pending = true;
            state.data = None;
            state.error = None;
        }

        let result = {
            let _in_flight = self.client.begin_mutation(&self.method.key);
            (self.method.mutate)(variables).await
        };

        if result.is_ok() {
            for key in &self.method.options.invalidates {
                self.client.invalidate(key).await;
            }
        }

        let mut state = self.lock();
        state.is_pending = false;
        match &result {
            Ok(data) => state.data = Some(data.clone()),
            Err(error) => state.error = Some(error.clone()),
        }
        result
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MutationState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Build a mutation binding from a descriptor.
pub fn create_mutation_method<V, F, Fut, S>(
    descriptor: MutationDescriptor<F, S>,
) -> MutationMethod<V, S::Output>
where
    V: Send + 'static,
    F: Fn(V) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<S::Input>> + Send + 'static,
    S: Schema + 'static,
{
    let MutationDescriptor {
        key,
        mutate,
        schema,
        options,
    } = descriptor;

    let schema = Arc::new(schema);
    let log_key = key.clone();
    let mutate: MutationFn<V, S::Output> = Arc::new(move |variables| {
        let schema = Arc::clone(&schema);
        let key = log_key.clone();
        let pending = mutate(variables);
        Box::pin(async move {
            debug!(key = %key, "running mutation");
            let value = pending.await?;
            schema.parse(value).inspect_err(|err| {
                warn!(key = %key, error = %err, "mutation result rejected by schema");
            })
        })
    });

    MutationMethod {
        key,
        options,
        mutate,
    }
}
