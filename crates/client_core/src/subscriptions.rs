use std::{fmt, sync::Arc};

use serde_json::Value;
use shared::{domain::SubscriptionId, protocol::GraphqlRequest};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
    error::{LogicError, TransportError},
    transport::GraphqlTransport,
};

/// Logical subscription stream; each has at most one live handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Todo,
    Command,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Todo, Channel::Command];
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Todo => "todo",
            Self::Command => "command",
        })
    }
}

struct SubscriptionHandle {
    id: SubscriptionId,
    forwarder: JoinHandle<()>,
}

type Slot = Mutex<Option<SubscriptionHandle>>;

/// One independently locked slot per channel.
///
/// A subscribe holds its channel's slot across the transport call, so a
/// request that never completes stalls that channel only.
#[derive(Default)]
pub struct SubscriptionTable {
    todo: Slot,
    command: Slot,
}

impl SubscriptionTable {
    fn slot(&self, channel: Channel) -> &Slot {
        match channel {
            Channel::Todo => &self.todo,
            Channel::Command => &self.command,
        }
    }
}

/// Translates the data payloads of one channel into dispatched actions.
pub trait ChannelEvents: Send + 'static {
    /// Called while the channel's slot is held, with the id of the stream
    /// this request ended up on: freshly opened or already live. Anything
    /// dispatched here is queued ahead of that stream's data and completion.
    fn on_attached(&mut self, _id: &SubscriptionId) {}

    /// Returns `true` when the payload signals that the stream has completed.
    fn on_data(&mut self, id: &SubscriptionId, data: Value) -> bool;

    /// Called once for a completed stream, before its remote end is closed.
    fn on_finished(&mut self, _id: &SubscriptionId) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscribed {
    Opened(SubscriptionId),
    Existing(SubscriptionId),
}

impl Subscribed {
    pub fn id(&self) -> &SubscriptionId {
        match self {
            Self::Opened(id) | Self::Existing(id) => id,
        }
    }
}

/// Owns the subscription table and the streams behind it.
///
/// Created once at the process root and handed to every logic unit.
/// Subscribe requests for the same channel are serialized by that channel's
/// slot; different channels never wait on each other.
#[derive(Clone)]
pub struct SubscriptionManager {
    transport: Arc<dyn GraphqlTransport>,
    table: Arc<SubscriptionTable>,
}

impl SubscriptionManager {
    pub fn new(transport: Arc<dyn GraphqlTransport>) -> Self {
        Self {
            transport,
            table: Arc::new(SubscriptionTable::default()),
        }
    }

    pub async fn active(&self, channel: Channel) -> Option<SubscriptionId> {
        self.table
            .slot(channel)
            .lock()
            .await
            .as_ref()
            .map(|handle| handle.id.clone())
    }

    /// Opens `channel` unless a handle already exists for it.
    ///
    /// An existing handle short-circuits without any network call; `handler`
    /// only sees `on_attached` in that case and is then dropped.
    pub async fn subscribe<H: ChannelEvents>(
        &self,
        channel: Channel,
        request: GraphqlRequest,
        mut handler: H,
    ) -> Result<Subscribed, TransportError> {
        let mut slot = self.table.slot(channel).lock().await;
        if let Some(handle) = slot.as_ref() {
            debug!(%channel, id = %handle.id, "subscriptions: reusing live handle");
            handler.on_attached(&handle.id);
            return Ok(Subscribed::Existing(handle.id.clone()));
        }

        let subscription = self.transport.subscribe(request).await?;
        let id = subscription.id.clone();
        handler.on_attached(&id);
        let forwarder = tokio::spawn(forward(
            self.clone(),
            channel,
            id.clone(),
            subscription.events,
            handler,
        ));
        *slot = Some(SubscriptionHandle {
            id: id.clone(),
            forwarder,
        });
        info!(%channel, %id, "subscriptions: opened");
        Ok(Subscribed::Opened(id))
    }

    /// Closes the stream on `channel` and returns the id it had.
    pub async fn unsubscribe(&self, channel: Channel) -> Result<SubscriptionId, LogicError> {
        let handle = self
            .table
            .slot(channel)
            .lock()
            .await
            .take()
            .ok_or(LogicError::NotSubscribed(channel))?;
        handle.forwarder.abort();
        self.close_remote(channel, &handle.id).await;
        info!(%channel, id = %handle.id, "subscriptions: closed");
        Ok(handle.id)
    }

    /// Closes every open stream.
    pub async fn reset(&self) {
        for channel in Channel::ALL {
            let taken = self.table.slot(channel).lock().await.take();
            if let Some(handle) = taken {
                handle.forwarder.abort();
                self.close_remote(channel, &handle.id).await;
            }
        }
    }

    /// Reports completion and frees the slot, then ends the remote stream.
    ///
    /// The finish is dispatched while the slot is still held, so it is queued
    /// ahead of anything a later subscribe on the channel produces.
    async fn complete<H: ChannelEvents>(
        &self,
        channel: Channel,
        id: &SubscriptionId,
        handler: &mut H,
    ) {
        let released = {
            let mut slot = self.table.slot(channel).lock().await;
            handler.on_finished(id);
            if slot.as_ref().is_some_and(|handle| &handle.id == id) {
                slot.take()
            } else {
                None
            }
        };
        if released.is_some() {
            self.close_remote(channel, id).await;
            info!(%channel, %id, "subscriptions: released completed stream");
        }
    }

    async fn close_remote(&self, channel: Channel, id: &SubscriptionId) {
        if let Err(err) = self.transport.unsubscribe(id).await {
            warn!(%channel, %id, %err, "subscriptions: failed to end remote stream");
        }
    }
}

async fn forward<H: ChannelEvents>(
    manager: SubscriptionManager,
    channel: Channel,
    id: SubscriptionId,
    mut events: crate::transport::SubscriptionEvents,
    mut handler: H,
) {
    while let Some(event) = events.recv().await {
        match event {
            Ok(data) => {
                if handler.on_data(&id, data) {
                    manager.complete(channel, &id, &mut handler).await;
                    return;
                }
            }
            // No retry: the handle stays in the table until unsubscribed.
            Err(err) => error!(%channel, %id, %err, "subscription error"),
        }
    }
    debug!(%channel, %id, "subscriptions: event stream ended");
}

#[cfg(test)]
#[path = "tests/subscriptions_tests.rs"]
mod tests;
