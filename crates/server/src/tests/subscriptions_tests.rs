use super::*;
use crate::config::Settings;
use futures::{SinkExt, StreamExt};
use shared::{
    domain::{CommandOutput, Todo},
    operations::{COMMAND_EXECUTE_SUBSCRIPTION, NEW_TODOS_SUBSCRIPTION},
};
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

fn test_state() -> AppState {
    AppState::from_settings(&Settings {
        command_interval: Duration::ZERO,
        ..Settings::default()
    })
}

fn countdown(count: u32) -> Variables {
    let mut variables = Variables::new();
    variables.insert("command".into(), format!("countdown {count}").into());
    variables
}

#[tokio::test]
async fn start_acknowledges_then_forwards_data() {
    let state = test_state();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut subs = ConnectionSubscriptions::new(tx);

    subs.start(
        &state.api,
        SubscriptionId(1),
        NEW_TODOS_SUBSCRIPTION,
        &Variables::new(),
    )
    .await;
    assert_eq!(
        rx.recv().await,
        Some(ServerMessage::SubscriptionSuccess {
            id: SubscriptionId(1)
        })
    );

    let todo = state.api.todos.add("walk the dog").await.expect("add");
    let Some(ServerMessage::SubscriptionData { id, payload }) = rx.recv().await else {
        panic!("expected data");
    };
    assert_eq!(id, SubscriptionId(1));
    let pushed: Todo =
        serde_json::from_value(payload.into_result().expect("data")["newTodos"].clone())
            .expect("todo");
    assert_eq!(pushed, todo);
}

#[tokio::test]
async fn same_operation_replaces_previous_subscription() {
    let state = test_state();
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut subs = ConnectionSubscriptions::new(tx);

    for id in [1, 2] {
        subs.start(
            &state.api,
            SubscriptionId(id),
            NEW_TODOS_SUBSCRIPTION,
            &Variables::new(),
        )
        .await;
    }
    assert_eq!(subs.active(), 1);
    assert_eq!(subs.by_key.get("todos"), Some(&SubscriptionId(2)));

    subs.end(&SubscriptionId(2));
    assert_eq!(subs.active(), 0);
    assert!(subs.by_key.is_empty());
}

#[tokio::test]
async fn rejected_subscription_reports_failure() {
    let state = test_state();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut subs = ConnectionSubscriptions::new(tx);

    subs.start(
        &state.api,
        SubscriptionId(7),
        COMMAND_EXECUTE_SUBSCRIPTION,
        &Variables::new(),
    )
    .await;
    let Some(ServerMessage::SubscriptionFail { id, payload }) = rx.recv().await else {
        panic!("expected failure");
    };
    assert_eq!(id, SubscriptionId(7));
    assert_eq!(
        payload.errors[0].message,
        "variable '$command' was not provided"
    );
    assert_eq!(subs.active(), 0);
}

#[tokio::test]
async fn websocket_streams_command_output() {
    let settings = Settings {
        command_interval: Duration::ZERO,
        ..Settings::default()
    };
    let app = crate::build_router(Arc::new(AppState::from_settings(&settings)), &settings)
        .expect("router");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    let (mut ws, _) = connect_async(format!("ws://{addr}/subscriptions"))
        .await
        .expect("connect");
    let start = ClientMessage::SubscriptionStart {
        id: SubscriptionId(1),
        query: COMMAND_EXECUTE_SUBSCRIPTION.to_string(),
        variables: countdown(2),
    };
    ws.send(WsMessage::Text(serde_json::to_string(&start).expect("json")))
        .await
        .expect("send");

    let mut messages = Vec::new();
    while messages.len() < 4 {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timely message")
            .expect("open stream")
            .expect("message");
        if let WsMessage::Text(text) = msg {
            messages.push(serde_json::from_str::<ServerMessage>(&text).expect("server message"));
        }
    }

    assert_eq!(
        messages[0],
        ServerMessage::SubscriptionSuccess {
            id: SubscriptionId(1)
        }
    );
    let outputs: Vec<CommandOutput> = messages[1..]
        .iter()
        .map(|msg| match msg {
            ServerMessage::SubscriptionData { payload, .. } => serde_json::from_value(
                payload.clone().into_result().expect("data")["commandExecute"].clone(),
            )
            .expect("output"),
            other => panic!("unexpected message {other:?}"),
        })
        .collect();
    assert_eq!(outputs[0].stdout.as_deref(), Some("2"));
    assert_eq!(outputs[1].stdout.as_deref(), Some("1"));
    assert!(outputs[2].finished);
}
