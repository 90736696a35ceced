use std::time::Duration;

use futures::{stream::BoxStream, StreamExt};
use serde_json::{json, Value};
use shared::{
    domain::{TodoId, TodoList},
    error::GraphqlError,
    graphql::{parse_operation, Operation, OperationKind},
    operations::{
        ADD_TODO_FIELD, COMMAND_EXECUTE_FIELD, NEW_TODOS_FIELD, TODO_LIST_FIELD,
        TOGGLE_TODO_FIELD,
    },
    protocol::{GraphqlRequest, GraphqlResponse, Variables},
};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream, ReceiverStream};
use tracing::{info, warn};

pub mod commands;
pub mod todos;

use commands::CommandRunner;
use todos::TodoStore;

#[derive(Clone)]
pub struct ApiContext {
    pub todos: TodoStore,
    pub commands: CommandRunner,
}

impl ApiContext {
    pub fn new(todos: TodoStore, command_interval: Duration) -> Self {
        Self {
            todos,
            commands: CommandRunner::new(command_interval),
        }
    }
}

/// A live subscription: each item is one `subscription_data` payload.
pub struct SubscriptionStream {
    /// Operation name, or the root field for anonymous operations.
    pub key: String,
    pub events: BoxStream<'static, GraphqlResponse>,
}

/// Runs a query or mutation to completion.
pub async fn execute(
    ctx: &ApiContext,
    request: &GraphqlRequest,
) -> Result<GraphqlResponse, GraphqlError> {
    let operation = parse_operation(&request.query)?;
    let args = operation.resolve_arguments(&request.variables)?;
    let value = match (operation.kind, operation.field.as_str()) {
        (OperationKind::Query, TODO_LIST_FIELD) => {
            let todos = ctx.todos.list().await;
            to_value(&TodoList { todos })?
        }
        (OperationKind::Mutation, ADD_TODO_FIELD) => {
            let text = string_arg(&args, "text")?;
            let todo = ctx.todos.add(&text).await.map_err(resolver_error)?;
            to_value(&todo)?
        }
        (OperationKind::Mutation, TOGGLE_TODO_FIELD) => {
            let id = TodoId(string_arg(&args, "id")?);
            let todo = ctx.todos.toggle(&id).await.map_err(resolver_error)?;
            to_value(&todo)?
        }
        (OperationKind::Subscription, _) => {
            return Err(GraphqlError::new(
                "subscriptions must be started over the websocket endpoint",
            ))
        }
        (kind, field) => return Err(unknown_field(kind, field)),
    };
    info!(field = %operation.field, "graphql: executed");
    Ok(GraphqlResponse::data(keyed(&operation, value)))
}

/// Starts a subscription operation.
pub async fn subscribe(
    ctx: &ApiContext,
    query: &str,
    variables: &Variables,
) -> Result<SubscriptionStream, GraphqlError> {
    let operation = parse_operation(query)?;
    if operation.kind != OperationKind::Subscription {
        return Err(GraphqlError::new(format!(
            "expected a subscription operation, got {:?}",
            operation.kind
        )));
    }
    let args = operation.resolve_arguments(variables)?;
    let key = operation
        .name
        .clone()
        .unwrap_or_else(|| operation.field.clone());
    let events = match operation.field.as_str() {
        NEW_TODOS_FIELD => {
            let response_key = operation.response_key().to_string();
            BroadcastStream::new(ctx.todos.watch_created())
                .filter_map(move |item| {
                    let response_key = response_key.clone();
                    async move {
                        match item {
                            Ok(todo) => Some(data_event(&response_key, &todo)),
                            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                                warn!(skipped, "subscription: newTodos receiver lagged");
                                None
                            }
                        }
                    }
                })
                .boxed()
        }
        COMMAND_EXECUTE_FIELD => {
            let line = string_arg(&args, "command")?;
            let output = ctx.commands.spawn(&line).map_err(resolver_error)?;
            let response_key = operation.response_key().to_string();
            ReceiverStream::new(output)
                .map(move |event| data_event(&response_key, &event))
                .boxed()
        }
        field => return Err(unknown_field(operation.kind, field)),
    };
    info!(key = %key, field = %operation.field, "graphql: subscription started");
    Ok(SubscriptionStream { key, events })
}

fn keyed(operation: &Operation, value: Value) -> Value {
    let mut data = serde_json::Map::new();
    data.insert(operation.response_key().to_string(), value);
    Value::Object(data)
}

fn data_event<T: serde::Serialize>(response_key: &str, item: &T) -> GraphqlResponse {
    match serde_json::to_value(item) {
        Ok(value) => GraphqlResponse::data(json!({ response_key: value })),
        Err(err) => GraphqlResponse::errors(vec![GraphqlError::new(err.to_string())]),
    }
}

fn to_value<T: serde::Serialize>(item: &T) -> Result<Value, GraphqlError> {
    serde_json::to_value(item).map_err(|err| GraphqlError::new(err.to_string()))
}

fn string_arg(args: &Variables, name: &str) -> Result<String, GraphqlError> {
    match args.get(name) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(Value::Number(value)) => Ok(value.to_string()),
        Some(other) => Err(GraphqlError::new(format!(
            "argument '{name}' must be a string, got {other}"
        ))),
        None => Err(GraphqlError::new(format!("argument '{name}' is required"))),
    }
}

fn unknown_field(kind: OperationKind, field: &str) -> GraphqlError {
    GraphqlError::new(format!("unknown {kind:?} field '{field}'"))
}

fn resolver_error(err: impl std::fmt::Display) -> GraphqlError {
    GraphqlError::new(err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
