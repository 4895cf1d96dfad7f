use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{HttpClient, PublicClient, handle_error};
use crate::{Result, to_query_string};

/// A blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Author id.
    pub user_id: u64,
    /// Post id.
    pub id: u64,
    /// Title.
    pub title: String,
    /// Content.
    pub body: String,
}

/// A list of posts.
pub type Posts = Vec<Post>;

#[derive(Serialize)]
struct PostsQuery {
    #[serde(rename = "_limit", skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

/// Reads posts from a public endpoint.
#[derive(Debug, Clone)]
pub struct PostController<C: HttpClient = PublicClient> {
    client: C,
}

impl<C: HttpClient> PostController<C> {
    /// Wrap a client.
    pub const fn new(client: C) -> Self {
        Self { client }
    }

    /// The wrapped client.
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// `GET /posts`, at most `limit` posts. `None` or `0` means no limit.
    ///
    /// # Errors
    ///
    /// Request failures are returned as [`Error::Message`](crate::Error::Message).
    pub async fn get_all_posts(&self, limit: Option<u32>) -> Result<Posts> {
        self.get_posts_as(limit).await
    }

    /// Same request as [`PostController::get_all_posts`], decoded as `R`.
    ///
    /// Used with `serde_json::Value` when the payload is validated later.
    ///
    /// # Errors
    ///
    /// Request failures are returned as [`Error::Message`](crate::Error::Message).
    pub async fn get_posts_as<R: DeserializeOwned + Send>(&self, limit: Option<u32>) -> Result<R> {
        let query = to_query_string(&PostsQuery {
            limit: limit.filter(|limit| *limit > 0),
        })?;

        let path = if query.is_empty() {
            "/posts".to_string()
        } else {
            format!("/posts?{query}")
        };

        self.client
            .get(&path, &[], None)
            .await
            .map_err(handle_error)
    }
}
