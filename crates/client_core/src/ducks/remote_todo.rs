use shared::{
    domain::{Todo, TodoId, TodoList},
    operations::{TODO_LIST_FIELD, TODO_LIST_QUERY, TOGGLE_TODO_FIELD, TOGGLE_TODO_MUTATION},
    protocol::GraphqlRequest,
};
use tracing::warn;

use super::decode_field;
use crate::{
    error::LogicError,
    logic::LogicDeps,
    store::{Action, Dispatcher},
};

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteTodoAction {
    Fetch,
    FetchSucceeded { todos: Vec<Todo> },
    FetchFailed { error: String },
    Toggle { id: TodoId },
    ToggleSucceeded { todo: Todo },
    ToggleFailed { error: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteTodoState {
    pub todos: Vec<Todo>,
    pub loading: bool,
    pub error: Option<String>,
}

pub fn reduce(mut state: RemoteTodoState, action: &Action) -> RemoteTodoState {
    let Action::RemoteTodo(action) = action else {
        return state;
    };
    match action {
        RemoteTodoAction::Fetch => {
            state.loading = true;
            state.error = None;
        }
        RemoteTodoAction::FetchSucceeded { todos } => {
            state.todos = todos.clone();
            state.loading = false;
        }
        RemoteTodoAction::FetchFailed { error } | RemoteTodoAction::ToggleFailed { error } => {
            state.loading = false;
            state.error = Some(error.clone());
        }
        RemoteTodoAction::Toggle { .. } => state.error = None,
        RemoteTodoAction::ToggleSucceeded { todo } => {
            match state.todos.iter_mut().find(|t| t.id == todo.id) {
                Some(existing) => *existing = todo.clone(),
                None => state.todos.push(todo.clone()),
            }
        }
    }
    state
}

pub fn fetch_todos() -> Action {
    RemoteTodoAction::Fetch.into()
}

pub fn fetch_todos_succeeded(todos: Vec<Todo>) -> Action {
    RemoteTodoAction::FetchSucceeded { todos }.into()
}

pub fn fetch_todos_failed(error: impl Into<String>) -> Action {
    RemoteTodoAction::FetchFailed {
        error: error.into(),
    }
    .into()
}

pub fn toggle_todo(id: impl Into<TodoId>) -> Action {
    RemoteTodoAction::Toggle { id: id.into() }.into()
}

pub fn toggle_todo_succeeded(todo: Todo) -> Action {
    RemoteTodoAction::ToggleSucceeded { todo }.into()
}

pub fn toggle_todo_failed(error: impl Into<String>) -> Action {
    RemoteTodoAction::ToggleFailed {
        error: error.into(),
    }
    .into()
}

pub async fn fetch_logic(deps: LogicDeps, dispatch: Dispatcher) -> Result<(), LogicError> {
    let fetched = match deps.transport.query(GraphqlRequest::new(TODO_LIST_QUERY)).await {
        Ok(data) => decode_field::<TodoList>(data, TODO_LIST_FIELD).map_err(|e| e.to_string()),
        Err(err) => Err(err.to_string()),
    };
    match fetched {
        Ok(list) => dispatch.dispatch(fetch_todos_succeeded(list.todos)),
        Err(error) => {
            warn!(%error, "remote-todo: fetch failed");
            dispatch.dispatch(fetch_todos_failed(error));
        }
    }
    Ok(())
}

pub async fn toggle_logic(
    deps: LogicDeps,
    dispatch: Dispatcher,
    id: TodoId,
) -> Result<(), LogicError> {
    let request = GraphqlRequest::new(TOGGLE_TODO_MUTATION).variable("id", id.0);
    let toggled = match deps.transport.mutate(request).await {
        Ok(data) => decode_field::<Todo>(data, TOGGLE_TODO_FIELD).map_err(|e| e.to_string()),
        Err(err) => Err(err.to_string()),
    };
    match toggled {
        Ok(todo) => dispatch.dispatch(toggle_todo_succeeded(todo)),
        Err(error) => {
            warn!(%error, "remote-todo: toggle failed");
            dispatch.dispatch(toggle_todo_failed(error));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../tests/remote_todo_tests.rs"]
mod tests;
