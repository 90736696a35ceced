use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use server_api::ApiContext;
use shared::{
    domain::SubscriptionId,
    protocol::{ClientMessage, ErrorsPayload, ServerMessage, Variables, SUBSCRIPTIONS_PROTOCOL},
};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::app_state::AppState;

pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.protocols([SUBSCRIPTIONS_PROTOCOL])
        .on_upgrade(move |socket| ws_connection(state, socket))
}

async fn ws_connection(state: Arc<AppState>, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerMessage>();
    info!("ws: connection opened");

    let send_task = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(v) => v,
                Err(_) => continue,
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut subscriptions = ConnectionSubscriptions::new(out_tx);
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::SubscriptionStart {
                    id,
                    query,
                    variables,
                }) => subscriptions.start(&state.api, id, &query, &variables).await,
                Ok(ClientMessage::SubscriptionEnd { id }) => subscriptions.end(&id),
                Err(err) => warn!(%err, "ws: ignoring invalid client message"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    subscriptions.clear();
    send_task.abort();
    info!("ws: connection closed");
}

/// Live subscriptions of one websocket connection.
///
/// At most one subscription per operation key is kept; starting the same
/// operation again replaces the earlier one.
pub(crate) struct ConnectionSubscriptions {
    out: mpsc::UnboundedSender<ServerMessage>,
    tasks: HashMap<SubscriptionId, (String, JoinHandle<()>)>,
    by_key: HashMap<String, SubscriptionId>,
}

impl ConnectionSubscriptions {
    pub(crate) fn new(out: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            out,
            tasks: HashMap::new(),
            by_key: HashMap::new(),
        }
    }

    pub(crate) async fn start(
        &mut self,
        api: &ApiContext,
        id: SubscriptionId,
        query: &str,
        variables: &Variables,
    ) {
        self.prune_finished();
        let stream = match server_api::subscribe(api, query, variables).await {
            Ok(stream) => stream,
            Err(err) => {
                warn!(%id, error = %err, "ws: subscription rejected");
                let _ = self.out.send(ServerMessage::SubscriptionFail {
                    id,
                    payload: ErrorsPayload { errors: vec![err] },
                });
                return;
            }
        };

        self.end(&id);
        if let Some(previous) = self.by_key.get(&stream.key).cloned() {
            info!(key = %stream.key, %previous, "ws: replacing subscription");
            self.end(&previous);
        }

        let _ = self
            .out
            .send(ServerMessage::SubscriptionSuccess { id: id.clone() });

        let out = self.out.clone();
        let task_id = id.clone();
        let mut events = stream.events;
        let task = tokio::spawn(async move {
            while let Some(payload) = events.next().await {
                let msg = ServerMessage::SubscriptionData {
                    id: task_id.clone(),
                    payload,
                };
                if out.send(msg).is_err() {
                    break;
                }
            }
            debug!(id = %task_id, "ws: subscription stream ended");
        });

        info!(%id, key = %stream.key, "ws: subscription started");
        self.by_key.insert(stream.key.clone(), id.clone());
        self.tasks.insert(id, (stream.key, task));
    }

    pub(crate) fn end(&mut self, id: &SubscriptionId) {
        if let Some((key, task)) = self.tasks.remove(id) {
            task.abort();
            if self.by_key.get(&key) == Some(id) {
                self.by_key.remove(&key);
            }
            info!(%id, key = %key, "ws: subscription ended");
        }
    }

    pub(crate) fn clear(&mut self) {
        for (_, (_, task)) in self.tasks.drain() {
            task.abort();
        }
        self.by_key.clear();
    }

    #[cfg(test)]
    pub(crate) fn active(&self) -> usize {
        self.tasks.len()
    }

    fn prune_finished(&mut self) {
        let finished: Vec<SubscriptionId> = self
            .tasks
            .iter()
            .filter(|(_, (_, task))| task.is_finished())
            .map(|(id, _)| id.clone())
            .collect();
        for id in finished {
            self.end(&id);
        }
    }
}

#[cfg(test)]
#[path = "tests/subscriptions_tests.rs"]
mod tests;
