use shared::domain::Todo;
use tracing::warn;

use crate::store::Action;

#[derive(Debug, Clone, PartialEq)]
pub enum TodoAction {
    Create { text: String },
    Toggle { index: usize },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoState {
    pub todos: Vec<Todo>,
}

impl TodoState {
    pub fn sample() -> Self {
        Self {
            todos: vec![
                Todo {
                    completed: true,
                    ..Todo::new("0", "hello")
                },
                Todo::new("1", "world"),
            ],
        }
    }
}

pub fn reduce(mut state: TodoState, action: &Action) -> TodoState {
    let Action::Todo(action) = action else {
        return state;
    };
    match action {
        TodoAction::Create { text } => {
            // Ids follow list length; todos are never removed.
            let id = state.todos.len().to_string();
            state.todos.push(Todo::new(id, text.clone()));
        }
        TodoAction::Toggle { index } => toggle_at(&mut state.todos, *index),
    }
    state
}

/// Flips `completed` of the todo at `index`; out of range leaves the list as is.
pub(crate) fn toggle_at(todos: &mut [Todo], index: usize) {
    let len = todos.len();
    match todos.get_mut(index) {
        Some(todo) => todo.completed = !todo.completed,
        None => warn!(index, len, "todo: toggle index out of range"),
    }
}

pub fn create_todo(text: impl Into<String>) -> Action {
    TodoAction::Create { text: text.into() }.into()
}

pub fn toggle_todo(index: usize) -> Action {
    TodoAction::Toggle { index }.into()
}

#[cfg(test)]
#[path = "../tests/todo_tests.rs"]
mod tests;
