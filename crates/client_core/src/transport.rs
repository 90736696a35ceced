use async_trait::async_trait;
use serde_json::Value;
use shared::{domain::SubscriptionId, protocol::GraphqlRequest};
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Data payloads of one subscription, in arrival order.
///
/// The channel closes when the server ends the stream or the connection is
/// lost; a lost connection is reported as one final `Err` first.
pub type SubscriptionEvents = mpsc::UnboundedReceiver<Result<Value, TransportError>>;

pub struct Subscription {
    pub id: SubscriptionId,
    pub events: SubscriptionEvents,
}

/// Network collaborator of the logic layer.
///
/// `query` and `mutate` resolve to the response's `data` object.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    async fn subscribe(&self, request: GraphqlRequest) -> Result<Subscription, TransportError>;
    async fn unsubscribe(&self, id: &SubscriptionId) -> Result<(), TransportError>;
    async fn query(&self, request: GraphqlRequest) -> Result<Value, TransportError>;
    async fn mutate(&self, request: GraphqlRequest) -> Result<Value, TransportError>;
}
