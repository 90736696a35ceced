use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::{
    ducks::{
        cache::{self, CacheState},
        command::{self, CommandAction, CommandState},
        remote_todo::{self, RemoteTodoAction, RemoteTodoState},
        routing::{self, RoutingAction, RoutingState},
        todo::{self, TodoAction, TodoState},
        todo_pub_sub::{self, TodoPubSubAction, TodoPubSubState},
    },
    logic::{self, LogicDeps},
};

/// Every intent the store understands, grouped by the slice that owns it.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Routing(RoutingAction),
    Todo(TodoAction),
    TodoPubSub(TodoPubSubAction),
    RemoteTodo(RemoteTodoAction),
    Command(CommandAction),
}

macro_rules! action_from {
    ($variant:ident, $inner:ty) => {
        impl From<$inner> for Action {
            fn from(value: $inner) -> Self {
                Self::$variant(value)
            }
        }
    };
}

action_from!(Routing, RoutingAction);
action_from!(Todo, TodoAction);
action_from!(TodoPubSub, TodoPubSubAction);
action_from!(RemoteTodo, RemoteTodoAction);
action_from!(Command, CommandAction);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootState {
    pub routing: RoutingState,
    pub cache: CacheState,
    pub todo: TodoState,
    pub todo_pub_sub: TodoPubSubState,
    pub remote_todo: RemoteTodoState,
    pub command: CommandState,
}

/// Applies `action` to every slice.
pub fn reduce(state: RootState, action: &Action) -> RootState {
    RootState {
        routing: routing::reduce(state.routing, action),
        cache: cache::reduce(state.cache, action),
        todo: todo::reduce(state.todo, action),
        todo_pub_sub: todo_pub_sub::reduce(state.todo_pub_sub, action),
        remote_todo: remote_todo::reduce(state.remote_todo, action),
        command: command::reduce(state.command, action),
    }
}

/// Cloneable handle for queueing actions.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<Action>,
}

impl Dispatcher {
    pub fn dispatch(&self, action: impl Into<Action>) {
        let action = action.into();
        if self.tx.send(action).is_err() {
            debug!("store: dropped action, store is gone");
        }
    }
}

/// Single owner of the state tree.
///
/// Actions are applied one at a time in queue order. After each reduction
/// the new state is published and the matching logic unit, if any, is
/// spawned; logic units feed their results back through the queue.
pub struct Store {
    state: RootState,
    deps: LogicDeps,
    dispatcher: Dispatcher,
    queue: mpsc::UnboundedReceiver<Action>,
    published: watch::Sender<RootState>,
}

impl Store {
    pub fn new(initial: RootState, deps: LogicDeps) -> Self {
        let (tx, queue) = mpsc::unbounded_channel();
        let (published, _) = watch::channel(initial.clone());
        Self {
            state: initial,
            deps,
            dispatcher: Dispatcher { tx },
            queue,
            published,
        }
    }

    pub fn state(&self) -> &RootState {
        &self.state
    }

    pub fn deps(&self) -> &LogicDeps {
        &self.deps
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    pub fn dispatch(&self, action: impl Into<Action>) {
        self.dispatcher.dispatch(action);
    }

    pub fn watch(&self) -> watch::Receiver<RootState> {
        self.published.subscribe()
    }

    /// Waits for the next queued action and applies it.
    ///
    /// Cancel safe: an action is either fully applied or left in the queue.
    pub async fn step(&mut self) -> Option<Action> {
        let action = self.queue.recv().await?;
        self.apply(&action);
        Some(action)
    }

    /// Applies every action already queued without waiting for more.
    pub fn drain(&mut self) -> Vec<Action> {
        let mut applied = Vec::new();
        while let Ok(action) = self.queue.try_recv() {
            self.apply(&action);
            applied.push(action);
        }
        applied
    }

    fn apply(&mut self, action: &Action) {
        debug!(?action, "store: dispatch");
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action);
        self.published.send_replace(self.state.clone());

        if let Some(unit) = logic::route(action, &self.deps, &self.dispatcher) {
            tokio::spawn(async move {
                if let Err(err) = unit.await {
                    warn!(%err, "logic: unit failed");
                }
            });
        }
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
