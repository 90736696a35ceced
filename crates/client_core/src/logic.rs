use std::sync::Arc;

use futures::{future::BoxFuture, FutureExt};

use crate::{
    ducks::{
        command::{self, CommandAction},
        remote_todo::{self, RemoteTodoAction},
        todo_pub_sub::{self, TodoPubSubAction},
    },
    error::LogicError,
    store::{Action, Dispatcher},
    subscriptions::SubscriptionManager,
    transport::GraphqlTransport,
};

pub type LogicUnit = BoxFuture<'static, Result<(), LogicError>>;

/// Collaborators available to every logic unit.
#[derive(Clone)]
pub struct LogicDeps {
    pub transport: Arc<dyn GraphqlTransport>,
    pub subscriptions: SubscriptionManager,
}

impl LogicDeps {
    pub fn new(transport: Arc<dyn GraphqlTransport>) -> Self {
        Self {
            subscriptions: SubscriptionManager::new(Arc::clone(&transport)),
            transport,
        }
    }
}

/// Selects the logic unit triggered by `action`.
pub fn route(action: &Action, deps: &LogicDeps, dispatch: &Dispatcher) -> Option<LogicUnit> {
    let deps = deps.clone();
    let dispatch = dispatch.clone();
    let unit = match action {
        Action::TodoPubSub(TodoPubSubAction::Subscribe) => {
            todo_pub_sub::subscribe_logic(deps, dispatch).boxed()
        }
        Action::TodoPubSub(TodoPubSubAction::Unsubscribe) => {
            todo_pub_sub::unsubscribe_logic(deps, dispatch).boxed()
        }
        Action::TodoPubSub(TodoPubSubAction::Create { text }) => {
            todo_pub_sub::create_logic(deps, dispatch, text.clone()).boxed()
        }
        Action::RemoteTodo(RemoteTodoAction::Fetch) => {
            remote_todo::fetch_logic(deps, dispatch).boxed()
        }
        Action::RemoteTodo(RemoteTodoAction::Toggle { id }) => {
            remote_todo::toggle_logic(deps, dispatch, id.clone()).boxed()
        }
        Action::Command(CommandAction::Execute { command }) => {
            command::execute_logic(deps, dispatch, command.clone()).boxed()
        }
        _ => return None,
    };
    Some(unit)
}
