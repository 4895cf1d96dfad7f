use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{AuthenticatedClient, HttpClient, handle_error};
use crate::{RequestBody, Result};

// Characters not allowed in a path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// A to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Task id.
    #[serde(alias = "_id")]
    pub id: String,
    /// Description.
    pub text: String,
    /// Completion flag.
    #[serde(default)]
    pub is_completed: bool,
}

/// A list of tasks.
pub type Tasks = Vec<Task>;

/// Payload creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    /// Description.
    pub text: String,
    /// Completion flag.
    pub is_completed: bool,
}

impl NewTask {
    /// An open task.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_completed: false,
        }
    }
}

/// Outcome of an update or a deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Whether the backend applied the change.
    pub success: bool,
}

#[derive(Deserialize)]
struct Created {
    #[serde(alias = "_id")]
    id: String,
}

/// Manages the signed-in user's tasks.
#[derive(Debug, Clone)]
pub struct TaskController<C: HttpClient = AuthenticatedClient> {
    client: C,
}

impl<C: HttpClient> TaskController<C> {
    /// Wrap a client.
    pub const fn new(client: C) -> Self {
        Self { client }
    }

    /// `GET /tasks`.
    ///
    /// # Errors
    ///
    /// Request failures are returned as [`Error::Message`](crate::Error::Message).
    pub async fn list(&self) -> Result<Tasks> {
        self.client
            .get("/tasks", &[], None)
            .await
            .map_err(handle_error)
    }

    /// `POST /tasks`, returning the id of the created task.
    ///
    /// # Errors
    ///
    /// Request failures are returned as [`Error::Message`](crate::Error::Message).
    pub async fn create(&self, task: &NewTask) -> Result<String> {
        let body = RequestBody::json(task)?;
        let created: Created = self
            .client
            .post("/tasks", &[], Some(body), None)
            .await
            .map_err(handle_error)?;
        Ok(created.id)
    }

    /// `PATCH /tasks/{id}` with `{"isCompleted": true}`.
    ///
    /// # Errors
    ///
    /// Request failures are returned as [`Error::Message`](crate::Error::Message).
    pub async fn mark_completed(&self, id: &str) -> Result<Ack> {
        let body = RequestBody::json(&json!({ "isCompleted": true }))?;
        self.client
            .patch(&task_path(id), &[], Some(body), None)
            .await
            .map_err(handle_error)
    }

    /// `DELETE /tasks/{id}`.
    ///
    /// # Errors
    ///
    /// Request failures are returned as [`Error::Message`](crate::Error::Message).
    pub async fn delete(&self, id: &str) -> Result<Ack> {
        self.client
            .delete(&task_path(id), &[], None)
            .await
            .map_err(handle_error)
    }
}

fn task_path(id: &str) -> String {
    format!("/tasks/{}", utf8_percent_encode(id, PATH_SEGMENT))
}
