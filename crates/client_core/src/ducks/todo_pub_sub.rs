use serde_json::Value;
use shared::{
    domain::{SubscriptionId, Todo},
    operations::{ADD_TODO_FIELD, ADD_TODO_MUTATION, NEW_TODOS_FIELD, NEW_TODOS_SUBSCRIPTION},
    protocol::GraphqlRequest,
};
use tracing::{info, warn};

use super::{decode_field, todo::toggle_at};
use crate::{
    error::LogicError,
    logic::LogicDeps,
    store::{Action, Dispatcher},
    subscriptions::{Channel, ChannelEvents},
};

#[derive(Debug, Clone, PartialEq)]
pub enum TodoPubSubAction {
    Subscribe,
    SubscribeSucceeded { subid: SubscriptionId },
    Unsubscribe,
    UnsubscribeSucceeded { subid: SubscriptionId },
    Received { todo: Todo },
    Create { text: String },
    CreateSucceeded { todo: Todo },
    CreateFailed { error: String },
    Toggle { index: usize },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoPubSubState {
    pub subscription_id: Option<SubscriptionId>,
    pub todos: Vec<Todo>,
    pub create_error: Option<String>,
}

pub fn reduce(mut state: TodoPubSubState, action: &Action) -> TodoPubSubState {
    let Action::TodoPubSub(action) = action else {
        return state;
    };
    match action {
        TodoPubSubAction::SubscribeSucceeded { subid } => {
            state.subscription_id = Some(subid.clone());
        }
        TodoPubSubAction::UnsubscribeSucceeded { .. } => state.subscription_id = None,
        TodoPubSubAction::Received { todo } => state.todos.push(todo.clone()),
        TodoPubSubAction::Create { .. } => state.create_error = None,
        TodoPubSubAction::CreateFailed { error } => state.create_error = Some(error.clone()),
        TodoPubSubAction::Toggle { index } => toggle_at(&mut state.todos, *index),
        // The created todo arrives through the feed.
        TodoPubSubAction::CreateSucceeded { .. }
        | TodoPubSubAction::Subscribe
        | TodoPubSubAction::Unsubscribe => {}
    }
    state
}

pub fn subscribe_todos() -> Action {
    TodoPubSubAction::Subscribe.into()
}

pub fn subscribe_todos_succeeded(subid: SubscriptionId) -> Action {
    TodoPubSubAction::SubscribeSucceeded { subid }.into()
}

pub fn unsubscribe_todos() -> Action {
    TodoPubSubAction::Unsubscribe.into()
}

pub fn unsubscribe_todos_succeeded(subid: SubscriptionId) -> Action {
    TodoPubSubAction::UnsubscribeSucceeded { subid }.into()
}

pub fn todo_received(todo: Todo) -> Action {
    TodoPubSubAction::Received { todo }.into()
}

pub fn create_todo(text: impl Into<String>) -> Action {
    TodoPubSubAction::Create { text: text.into() }.into()
}

pub fn create_todo_succeeded(todo: Todo) -> Action {
    TodoPubSubAction::CreateSucceeded { todo }.into()
}

pub fn create_todo_failed(error: impl Into<String>) -> Action {
    TodoPubSubAction::CreateFailed {
        error: error.into(),
    }
    .into()
}

pub fn toggle_todo(index: usize) -> Action {
    TodoPubSubAction::Toggle { index }.into()
}

/// Perpetual feed of newly created todos; never completes on its own.
struct TodoFeed {
    dispatch: Dispatcher,
}

impl ChannelEvents for TodoFeed {
    fn on_data(&mut self, _id: &SubscriptionId, data: Value) -> bool {
        match decode_field::<Todo>(data, NEW_TODOS_FIELD) {
            Ok(todo) => self.dispatch.dispatch(todo_received(todo)),
            Err(err) => warn!(%err, "todo-pubsub: undecodable feed payload"),
        }
        false
    }
}

pub async fn subscribe_logic(deps: LogicDeps, dispatch: Dispatcher) -> Result<(), LogicError> {
    let feed = TodoFeed {
        dispatch: dispatch.clone(),
    };
    let subscribed = deps
        .subscriptions
        .subscribe(
            Channel::Todo,
            GraphqlRequest::new(NEW_TODOS_SUBSCRIPTION),
            feed,
        )
        .await?;
    dispatch.dispatch(subscribe_todos_succeeded(subscribed.id().clone()));
    Ok(())
}

pub async fn unsubscribe_logic(deps: LogicDeps, dispatch: Dispatcher) -> Result<(), LogicError> {
    let subid = deps.subscriptions.unsubscribe(Channel::Todo).await?;
    dispatch.dispatch(unsubscribe_todos_succeeded(subid));
    Ok(())
}

pub async fn create_logic(
    deps: LogicDeps,
    dispatch: Dispatcher,
    text: String,
) -> Result<(), LogicError> {
    let request = GraphqlRequest::new(ADD_TODO_MUTATION).variable("text", text);
    let created = match deps.transport.mutate(request).await {
        Ok(data) => decode_field::<Todo>(data, ADD_TODO_FIELD).map_err(|err| err.to_string()),
        Err(err) => Err(err.to_string()),
    };
    match created {
        Ok(todo) => {
            info!(id = %todo.id, "todo-pubsub: created");
            dispatch.dispatch(create_todo_succeeded(todo));
        }
        Err(error) => {
            warn!(%error, "todo-pubsub: create failed");
            dispatch.dispatch(create_todo_failed(error));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../tests/todo_pub_sub_tests.rs"]
mod tests;
