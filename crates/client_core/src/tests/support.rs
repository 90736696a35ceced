use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use serde_json::Value;
use shared::{domain::SubscriptionId, error::GraphqlError, protocol::GraphqlRequest};
use tokio::sync::mpsc;

use crate::{
    error::TransportError,
    logic::LogicDeps,
    store::{RootState, Store},
    transport::{GraphqlTransport, Subscription},
};

type EventSender = mpsc::UnboundedSender<Result<Value, TransportError>>;

/// In-memory transport that records every call and lets tests drive streams.
#[derive(Default)]
pub struct FakeTransport {
    next_id: AtomicU64,
    subscribes: Mutex<Vec<GraphqlRequest>>,
    unsubscribes: Mutex<Vec<SubscriptionId>>,
    mutations: Mutex<Vec<GraphqlRequest>>,
    queries: Mutex<Vec<GraphqlRequest>>,
    streams: Mutex<HashMap<SubscriptionId, EventSender>>,
    responses: Mutex<VecDeque<Result<Value, String>>>,
    reject_subscribe: Mutex<Option<String>>,
    stall_subscribe: Mutex<Option<String>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn deps(self: &Arc<Self>) -> LogicDeps {
        LogicDeps::new(Arc::clone(self) as Arc<dyn GraphqlTransport>)
    }

    pub fn store(self: &Arc<Self>, initial: RootState) -> Store {
        Store::new(initial, self.deps())
    }

    /// Queues the result of the next query or mutation.
    pub fn respond(&self, response: Result<Value, &str>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(response.map_err(str::to_string));
    }

    pub fn reject_subscriptions(&self, message: &str) {
        *self.reject_subscribe.lock().unwrap() = Some(message.to_string());
    }

    /// Subscribes whose query equals `query` never complete.
    pub fn stall_subscriptions(&self, query: &str) {
        *self.stall_subscribe.lock().unwrap() = Some(query.to_string());
    }

    pub fn push(&self, id: &SubscriptionId, event: Result<Value, TransportError>) {
        let streams = self.streams.lock().unwrap();
        let events = streams.get(id).expect("no stream for id");
        events.send(event).expect("stream receiver dropped");
    }

    pub fn subscribes(&self) -> Vec<GraphqlRequest> {
        self.subscribes.lock().unwrap().clone()
    }

    pub fn unsubscribes(&self) -> Vec<SubscriptionId> {
        self.unsubscribes.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<GraphqlRequest> {
        self.mutations.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<GraphqlRequest> {
        self.queries.lock().unwrap().clone()
    }

    fn next_response(&self) -> Result<Value, TransportError> {
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(data)) => Ok(data),
            Some(Err(message)) => Err(TransportError::Graphql(vec![GraphqlError::new(message)])),
            None => Err(TransportError::Status(500)),
        }
    }
}

#[async_trait]
impl GraphqlTransport for FakeTransport {
    async fn subscribe(&self, request: GraphqlRequest) -> Result<Subscription, TransportError> {
        let stalled = self.stall_subscribe.lock().unwrap().as_deref() == Some(request.query.as_str());
        self.subscribes.lock().unwrap().push(request);
        if stalled {
            std::future::pending::<()>().await;
        }
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        if let Some(message) = self.reject_subscribe.lock().unwrap().clone() {
            return Err(TransportError::Rejected {
                id,
                errors: vec![GraphqlError::new(message)],
            });
        }
        let (tx, events) = mpsc::unbounded_channel();
        self.streams.lock().unwrap().insert(id.clone(), tx);
        Ok(Subscription { id, events })
    }

    async fn unsubscribe(&self, id: &SubscriptionId) -> Result<(), TransportError> {
        self.unsubscribes.lock().unwrap().push(id.clone());
        self.streams.lock().unwrap().remove(id);
        Ok(())
    }

    async fn query(&self, request: GraphqlRequest) -> Result<Value, TransportError> {
        self.queries.lock().unwrap().push(request);
        self.next_response()
    }

    async fn mutate(&self, request: GraphqlRequest) -> Result<Value, TransportError> {
        self.mutations.lock().unwrap().push(request);
        self.next_response()
    }
}

/// Applies queued actions until `done` holds for the state.
pub async fn run_until(store: &mut Store, done: impl Fn(&RootState) -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done(store.state()) {
            store.step().await.expect("dispatch queue closed");
        }
    })
    .await
    .expect("store did not reach the expected state");
}

/// Lets spawned logic units run, then applies whatever they queued.
pub async fn settle(store: &mut Store) {
    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.drain();
    }
}
