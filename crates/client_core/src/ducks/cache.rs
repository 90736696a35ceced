use std::collections::BTreeMap;

use shared::domain::{Todo, TodoId};

use super::{remote_todo::RemoteTodoAction, todo_pub_sub::TodoPubSubAction};
use crate::store::Action;

/// Normalized copy of every server-confirmed todo, keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheState {
    pub todos: BTreeMap<TodoId, Todo>,
}

impl CacheState {
    pub fn get(&self, id: &TodoId) -> Option<&Todo> {
        self.todos.get(id)
    }

    fn store(&mut self, todo: &Todo) {
        self.todos.insert(todo.id.clone(), todo.clone());
    }
}

pub fn reduce(mut state: CacheState, action: &Action) -> CacheState {
    match action {
        Action::TodoPubSub(TodoPubSubAction::Received { todo })
        | Action::TodoPubSub(TodoPubSubAction::CreateSucceeded { todo })
        | Action::RemoteTodo(RemoteTodoAction::ToggleSucceeded { todo }) => state.store(todo),
        Action::RemoteTodo(RemoteTodoAction::FetchSucceeded { todos }) => {
            todos.iter().for_each(|todo| state.store(todo));
        }
        _ => {}
    }
    state
}
