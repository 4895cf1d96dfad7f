//! Page view-models.
//!
//! Each page wires a controller into query and mutation bindings and reduces
//! their state to what the page displays.

use std::sync::Arc;

use serde_json::Value;

use crate::{
    Ack, AuthenticatedClient, Error, HttpClient, JsonSchema, Location, MutationDescriptor,
    MutationMethod, MutationOptions, NewTask, PostController, Posts, PublicClient, QueryClient,
    QueryDescriptor, QueryKey, QueryMethod, TaskController, Tasks, create_mutation_method,
    create_query_method, query_key,
};

/// Number of posts shown when the location does not say otherwise.
pub const DEFAULT_POSTS_LIMIT: u32 = 1;

/// What the posts page shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostsView {
    /// Requested number of posts.
    pub limit: u32,
    /// Posts are on their way.
    pub is_loading: bool,
    /// Message of the last failure.
    pub error: Option<String>,
    /// Loaded posts.
    pub posts: Posts,
}

/// The `/posts` page.
#[derive(Debug)]
pub struct PostsPage<C: HttpClient = PublicClient> {
    controller: Arc<PostController<C>>,
}

impl<C: HttpClient> Clone for PostsPage<C> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
        }
    }
}

impl<C: HttpClient + 'static> PostsPage<C> {
    /// Create the page.
    pub fn new(controller: PostController<C>) -> Self {
        Self {
            controller: Arc::new(controller),
        }
    }

    /// The `limit` search parameter, [`DEFAULT_POSTS_LIMIT`] when absent or invalid.
    pub fn limit(location: &Location) -> u32 {
        location
            .search_param("limit")
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(DEFAULT_POSTS_LIMIT)
    }

    /// The posts query for `limit`, keyed `["posts", limit]`.
    pub fn query(&self, limit: u32) -> QueryMethod<Posts> {
        let controller = Arc::clone(&self.controller);
        create_query_method(
            QueryDescriptor::new(query_key!["posts", limit], move || {
                let controller = Arc::clone(&controller);
                async move { controller.get_posts_as::<Value>(Some(limit)).await }
            })
            .schema(JsonSchema::<Posts>::new()),
        )
    }

    /// State before anything is fetched: cached posts, or loading.
    pub async fn initial_view(&self, client: &QueryClient, location: &Location) -> PostsView {
        let limit = Self::limit(location);
        let result = self.query(limit).snapshot(client).await;
        PostsView {
            limit,
            is_loading: result.is_loading,
            error: None,
            posts: result.data.unwrap_or_default(),
        }
    }

    /// State once the posts query settled.
    pub async fn view(&self, client: &QueryClient, location: &Location) -> PostsView {
        let limit = Self::limit(location);
        let result = self.query(limit).use_hook(client).await;
        PostsView {
            limit,
            is_loading: result.is_loading,
            error: result.error.map(|err| err.to_string()),
            posts: result.data.unwrap_or_default(),
        }
    }
}

/// What the tasks page shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TasksView {
    /// Message of the last failure.
    pub error: Option<String>,
    /// Loaded tasks.
    pub tasks: Tasks,
}

/// The task list with its create, complete and delete actions.
///
/// Every action refreshes the list on success.
#[derive(Clone)]
pub struct TasksPage {
    list: QueryMethod<Tasks>,
    create: MutationMethod<NewTask, String>,
    complete: MutationMethod<String, Ack>,
    delete: MutationMethod<String, Ack>,
}

impl std::fmt::Debug for TasksPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TasksPage")
            .field("list", &self.list)
            .finish_non_exhaustive()
    }
}

impl TasksPage {
    /// Key of the task list.
    #[must_use]
    pub fn list_key() -> QueryKey {
        query_key!["tasks"]
    }

    /// Create the page over an authenticated task controller.
    #[must_use]
    pub fn authenticated(controller: TaskController<AuthenticatedClient>) -> Self {
        Self::new(controller)
    }

    /// Create the page.
    pub fn new<C: HttpClient + 'static>(controller: TaskController<C>) -> Self {
        let controller = Arc::new(controller);
        let refresh = MutationOptions::default().invalidate(Self::list_key());

        let list = {
            let controller = Arc::clone(&controller);
            create_query_method(QueryDescriptor::new(Self::list_key(), move || {
                let controller = Arc::clone(&controller);
                async move { controller.list().await }
            }))
        };

        let create = {
            let controller = Arc::clone(&controller);
            create_mutation_method(
                MutationDescriptor::new(query_key!["tasks", "create"], move |task: NewTask| {
                    let controller = Arc::clone(&controller);
                    async move {
                        let text = task.text.trim();
                        if text.is_empty() {
                            return Err(Error::validation("text", "task text is blank"));
                        }
                        let task = NewTask {
                            text: text.to_string(),
                            ..task
                        };
                        controller.create(&task).await
                    }
                })
                .options(refresh.clone()),
            )
        };

        let complete = {
            let controller = Arc::clone(&controller);
            create_mutation_method(
                MutationDescriptor::new(query_key!["tasks", "complete"], move |id: String| {
                    let controller = Arc::clone(&controller);
                    async move { controller.mark_completed(&id).await }
                })
                .options(refresh.clone()),
            )
        };

        let delete = {
            let controller = Arc::clone(&controller);
            create_mutation_method(
                MutationDescriptor::new(query_key!["tasks", "delete"], move |id: String| {
                    let controller = Arc::clone(&controller);
                    async move { controller.delete(&id).await }
                })
                .options(refresh),
            )
        };

        Self {
            list,
            create,
            complete,
            delete,
        }
    }

    /// The list query.
    pub const fn list(&self) -> &QueryMethod<Tasks> {
        &self.list
    }

    /// The create mutation, resolving to the new task id.
    ///
    /// Text is trimmed before posting. Blank text fails with
    /// [`Error::Validation`] and never reaches the backend.
    pub const fn create(&self) -> &MutationMethod<NewTask, String> {
        &self.create
    }

    /// The mark-as-completed mutation.
    pub const fn mark_completed(&self) -> &MutationMethod<String, Ack> {
        &self.complete
    }

    /// The delete mutation.
    pub const fn delete(&self) -> &MutationMethod<String, Ack> {
        &self.delete
    }

    /// State once the list query settled.
    pub async fn view(&self, client: &QueryClient) -> TasksView {
        let result = self.list.use_hook(client).await;
        TasksView {
            error: result.error.map(|err| err.to_string()),
            tasks: result.data.unwrap_or_default(),
        }
    }
}
