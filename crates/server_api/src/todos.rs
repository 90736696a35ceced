use std::sync::Arc;

use shared::domain::{Todo, TodoId};
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

const CREATED_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TodoError {
    #[error("todo {0} does not exist")]
    NotFound(TodoId),
    #[error("todo text must not be empty")]
    EmptyText,
}

/// Ordered in-memory todo list shared by every connection.
///
/// Newly created todos are fanned out to `watch_created` receivers.
#[derive(Clone)]
pub struct TodoStore {
    todos: Arc<RwLock<Vec<Todo>>>,
    created: broadcast::Sender<Todo>,
}

impl Default for TodoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TodoStore {
    pub fn new() -> Self {
        Self::with_todos(Vec::new())
    }

    pub fn seeded() -> Self {
        Self::with_todos(vec![
            Todo::new("1", "Write the GraphQL server"),
            Todo::new("2", "Wire up the subscription client"),
        ])
    }

    pub fn with_todos(todos: Vec<Todo>) -> Self {
        let (created, _) = broadcast::channel(CREATED_CHANNEL_CAPACITY);
        Self {
            todos: Arc::new(RwLock::new(todos)),
            created,
        }
    }

    pub async fn list(&self) -> Vec<Todo> {
        self.todos.read().await.clone()
    }

    pub async fn add(&self, text: &str) -> Result<Todo, TodoError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TodoError::EmptyText);
        }
        let todo = {
            let mut guard = self.todos.write().await;
            let todo = Todo::new((guard.len() + 1).to_string(), text);
            guard.push(todo.clone());
            todo
        };
        info!(id = %todo.id, "todo: created");
        if self.created.send(todo.clone()).is_err() {
            debug!(id = %todo.id, "todo: no live subscribers for created todo");
        }
        Ok(todo)
    }

    pub async fn toggle(&self, id: &TodoId) -> Result<Todo, TodoError> {
        let mut guard = self.todos.write().await;
        let todo = guard
            .iter_mut()
            .find(|todo| &todo.id == id)
            .ok_or_else(|| TodoError::NotFound(id.clone()))?;
        todo.completed = !todo.completed;
        info!(id = %todo.id, completed = todo.completed, "todo: toggled");
        Ok(todo.clone())
    }

    pub fn watch_created(&self) -> broadcast::Receiver<Todo> {
        self.created.subscribe()
    }
}
