use shared::{domain::SubscriptionId, error::GraphqlError};
use thiserror::Error;

use crate::subscriptions::Channel;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid server url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("failed to connect websocket {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("websocket closed")]
    Closed,
    #[error("websocket failure: {0}")]
    Socket(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered with status {0}")]
    Status(u16),
    #[error("graphql error: {}", join_messages(.0))]
    Graphql(Vec<GraphqlError>),
    #[error("subscription {id} rejected: {}", join_messages(.errors))]
    Rejected {
        id: SubscriptionId,
        errors: Vec<GraphqlError>,
    },
    #[error("unexpected payload: {0}")]
    Decode(#[from] serde_json::Error),
}

fn join_messages(errors: &[GraphqlError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure of a logic unit.
#[derive(Debug, Error)]
pub enum LogicError {
    #[error("no active subscription on channel '{0}'")]
    NotSubscribed(Channel),
    #[error(transparent)]
    Transport(#[from] TransportError),
}
