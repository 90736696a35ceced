use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use reqwest::Client;
use serde_json::Value;
use shared::{
    domain::SubscriptionId,
    error::GraphqlError,
    protocol::{ClientMessage, GraphqlRequest, GraphqlResponse, ServerMessage, SUBSCRIPTIONS_PROTOCOL},
};
use tokio::{
    net::TcpStream,
    sync::{mpsc, oneshot, Mutex},
    task::JoinHandle,
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
    error::TransportError,
    transport::{GraphqlTransport, Subscription},
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type EventSender = mpsc::UnboundedSender<Result<Value, TransportError>>;

/// Subscriptions over one shared websocket, queries and mutations over HTTP.
///
/// The socket is opened on the first subscribe and reopened on demand after
/// it drops. Open subscriptions do not survive a drop.
pub struct WsTransport {
    http: Client,
    graphql_url: Url,
    ws_url: Url,
    next_id: AtomicU64,
    connection: Mutex<Option<Connection>>,
    routes: Arc<Mutex<Routes>>,
}

struct Connection {
    writer: SplitSink<WsStream, Message>,
    reader_task: JoinHandle<()>,
}

#[derive(Default)]
struct Routes {
    pending: HashMap<SubscriptionId, oneshot::Sender<Result<(), Vec<GraphqlError>>>>,
    streams: HashMap<SubscriptionId, EventSender>,
}

impl Routes {
    fn route(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::SubscriptionSuccess { id } => match self.pending.remove(&id) {
                Some(ack) => {
                    let _ = ack.send(Ok(()));
                }
                None => debug!(%id, "transport: ack for unknown subscription"),
            },
            ServerMessage::SubscriptionFail { id, payload } => {
                self.streams.remove(&id);
                match self.pending.remove(&id) {
                    Some(ack) => {
                        let _ = ack.send(Err(payload.errors));
                    }
                    None => warn!(%id, "transport: failure for unknown subscription"),
                }
            }
            ServerMessage::SubscriptionData { id, payload } => {
                let Some(events) = self.streams.get(&id) else {
                    debug!(%id, "transport: data for closed subscription");
                    return;
                };
                let event = payload.into_result().map_err(TransportError::Graphql);
                if events.send(event).is_err() {
                    self.streams.remove(&id);
                }
            }
        }
    }

    fn fail_all(&mut self, reason: &str) {
        self.pending.clear();
        for (_, events) in self.streams.drain() {
            let _ = events.send(Err(TransportError::Socket(reason.to_string())));
        }
    }
}

impl WsTransport {
    /// `server_url` is the HTTP base, e.g. `http://localhost:4000`.
    pub fn new(server_url: &str) -> Result<Self, TransportError> {
        let invalid = |reason: String| TransportError::InvalidUrl {
            url: server_url.to_string(),
            reason,
        };
        let base = Url::parse(server_url).map_err(|e| invalid(e.to_string()))?;
        let ws_scheme = match base.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => return Err(invalid(format!("unsupported scheme '{other}'"))),
        };
        let graphql_url = base.join("graphql").map_err(|e| invalid(e.to_string()))?;
        let mut ws_url = base.join("subscriptions").map_err(|e| invalid(e.to_string()))?;
        ws_url
            .set_scheme(ws_scheme)
            .map_err(|_| invalid("cannot derive websocket url".into()))?;
        Ok(Self {
            http: Client::new(),
            graphql_url,
            ws_url,
            next_id: AtomicU64::new(1),
            connection: Mutex::new(None),
            routes: Arc::new(Mutex::new(Routes::default())),
        })
    }

    pub fn graphql_url(&self) -> &Url {
        &self.graphql_url
    }

    pub fn ws_url(&self) -> &Url {
        &self.ws_url
    }

    async fn connect(&self) -> Result<Connection, TransportError> {
        let connect_error = |reason: String| TransportError::Connect {
            url: self.ws_url.to_string(),
            reason,
        };
        let mut request = self
            .ws_url
            .as_str()
            .into_client_request()
            .map_err(|e| connect_error(e.to_string()))?;
        request.headers_mut().insert(
            "Sec-WebSocket-Protocol",
            HeaderValue::from_static(SUBSCRIPTIONS_PROTOCOL),
        );
        let (ws_stream, _) = connect_async(request)
            .await
            .map_err(|e| connect_error(e.to_string()))?;
        info!(url = %self.ws_url, "transport: websocket connected");
        let (writer, reader) = ws_stream.split();
        let reader_task = tokio::spawn(read_loop(reader, Arc::clone(&self.routes)));
        Ok(Connection {
            writer,
            reader_task,
        })
    }

    async fn send(&self, msg: &ClientMessage, reconnect: bool) -> Result<(), TransportError> {
        let text = serde_json::to_string(msg)?;
        let mut guard = self.connection.lock().await;
        if guard
            .as_ref()
            .is_some_and(|conn| conn.reader_task.is_finished())
        {
            *guard = None;
        }
        if guard.is_none() {
            if !reconnect {
                return Err(TransportError::Closed);
            }
            *guard = Some(self.connect().await?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(TransportError::Closed);
        };
        if let Err(err) = conn.writer.send(Message::Text(text)).await {
            conn.reader_task.abort();
            *guard = None;
            return Err(TransportError::Socket(err.to_string()));
        }
        Ok(())
    }

    async fn forget(&self, id: &SubscriptionId) {
        let mut routes = self.routes.lock().await;
        routes.pending.remove(id);
        routes.streams.remove(id);
    }

    async fn post(&self, request: GraphqlRequest) -> Result<Value, TransportError> {
        let response = self
            .http
            .post(self.graphql_url.clone())
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        let body: GraphqlResponse = match response.json().await {
            Ok(body) => body,
            Err(_) if !status.is_success() => return Err(TransportError::Status(status.as_u16())),
            Err(err) => return Err(err.into()),
        };
        body.into_result().map_err(TransportError::Graphql)
    }
}

#[async_trait]
impl GraphqlTransport for WsTransport {
    async fn subscribe(&self, request: GraphqlRequest) -> Result<Subscription, TransportError> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (ack_tx, ack_rx) = oneshot::channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        {
            let mut routes = self.routes.lock().await;
            routes.pending.insert(id.clone(), ack_tx);
            routes.streams.insert(id.clone(), events_tx);
        }

        let start = ClientMessage::SubscriptionStart {
            id: id.clone(),
            query: request.query,
            variables: request.variables,
        };
        if let Err(err) = self.send(&start, true).await {
            self.forget(&id).await;
            return Err(err);
        }

        match ack_rx.await {
            Ok(Ok(())) => {
                debug!(%id, "transport: subscription acknowledged");
                Ok(Subscription {
                    id,
                    events: events_rx,
                })
            }
            Ok(Err(errors)) => {
                self.forget(&id).await;
                Err(TransportError::Rejected { id, errors })
            }
            Err(_) => {
                self.forget(&id).await;
                Err(TransportError::Closed)
            }
        }
    }

    async fn unsubscribe(&self, id: &SubscriptionId) -> Result<(), TransportError> {
        self.forget(id).await;
        let end = ClientMessage::SubscriptionEnd { id: id.clone() };
        match self.send(&end, false).await {
            // Nothing to end on a socket that is already gone.
            Err(TransportError::Closed) => Ok(()),
            other => other,
        }
    }

    async fn query(&self, request: GraphqlRequest) -> Result<Value, TransportError> {
        self.post(request).await
    }

    async fn mutate(&self, request: GraphqlRequest) -> Result<Value, TransportError> {
        self.post(request).await
    }
}

async fn read_loop(mut reader: SplitStream<WsStream>, routes: Arc<Mutex<Routes>>) {
    while let Some(msg) = reader.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                Ok(msg) => routes.lock().await.route(msg),
                Err(err) => warn!(%err, "transport: invalid server message"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                error!(%err, "transport: websocket receive failed");
                routes.lock().await.fail_all(&err.to_string());
                return;
            }
        }
    }
    info!("transport: websocket closed");
    routes.lock().await.fail_all("websocket closed");
}

#[cfg(test)]
#[path = "tests/ws_transport_tests.rs"]
mod tests;
