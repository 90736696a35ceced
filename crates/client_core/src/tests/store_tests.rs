use serde_json::json;
use shared::domain::Todo;

use super::*;
use crate::{
    ducks::{command, remote_todo, routing::Route, todo, todo_pub_sub},
    subscriptions::Channel,
    test_support::{run_until, settle, FakeTransport},
};

#[test]
fn reduce_routes_each_action_to_its_slice() {
    let state = reduce(RootState::default(), &todo::create_todo("buy milk"));
    assert_eq!(state.todo.todos, vec![Todo::new("0", "buy milk")]);
    assert!(state.todo_pub_sub.todos.is_empty());
    assert_eq!(state.command, CommandState::default());

    let state = reduce(state, &routing::navigate(Route::Command));
    assert_eq!(state.routing.location, Route::Command);
    assert_eq!(state.todo.todos.len(), 1);
}

#[test]
fn toggles_never_change_the_number_of_todos() {
    let mut state = RootState {
        todo: TodoState::sample(),
        ..RootState::default()
    };
    for index in [0, 1, 1, 5, 0] {
        state = reduce(state, &todo::toggle_todo(index));
        state = reduce(state, &todo_pub_sub::toggle_todo(index));
        assert_eq!(state.todo.todos.len(), 2);
        assert!(state.todo_pub_sub.todos.is_empty());
    }
}

#[tokio::test]
async fn dispatched_actions_are_applied_in_order_and_published() {
    let transport = FakeTransport::new();
    let mut store = transport.store(RootState::default());
    let mut published = store.watch();

    store.dispatch(todo::create_todo("first"));
    store.dispatch(todo::create_todo("second"));
    store.dispatch(todo::toggle_todo(1));
    let applied = store.drain();

    assert_eq!(applied.len(), 3);
    let texts: Vec<_> = store.state().todo.todos.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "second"]);
    assert!(store.state().todo.todos[1].completed);

    assert!(published.has_changed().unwrap());
    assert_eq!(&*published.borrow_and_update(), store.state());
}

#[tokio::test]
async fn pure_actions_touch_no_transport() {
    let transport = FakeTransport::new();
    let mut store = transport.store(RootState::default());

    store.dispatch(todo::create_todo("local"));
    store.dispatch(routing::navigate(Route::Todo));
    settle(&mut store).await;

    assert!(transport.subscribes().is_empty());
    assert!(transport.mutations().is_empty());
    assert!(transport.queries().is_empty());
}

#[tokio::test]
async fn double_subscribe_makes_one_network_call() {
    let transport = FakeTransport::new();
    let mut store = transport.store(RootState::default());

    store.dispatch(todo_pub_sub::subscribe_todos());
    store.dispatch(todo_pub_sub::subscribe_todos());
    settle(&mut store).await;

    assert_eq!(transport.subscribes().len(), 1);
    let active = store.deps().subscriptions.active(Channel::Todo).await;
    assert_eq!(store.state().todo_pub_sub.subscription_id, active);
}

#[tokio::test]
async fn both_subscribe_requests_report_the_same_id() {
    let transport = FakeTransport::new();
    let deps = transport.deps();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let dispatcher = Dispatcher { tx };

    let (a, b) = tokio::join!(
        todo_pub_sub::subscribe_logic(deps.clone(), dispatcher.clone()),
        todo_pub_sub::subscribe_logic(deps.clone(), dispatcher.clone()),
    );
    a.unwrap();
    b.unwrap();

    let mut ids = Vec::new();
    while let Ok(Action::TodoPubSub(TodoPubSubAction::SubscribeSucceeded { subid })) = rx.try_recv() {
        ids.push(subid);
    }
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], ids[1]);
    assert_eq!(transport.subscribes().len(), 1);
}

#[tokio::test]
async fn countdown_end_to_end_through_the_store() {
    let transport = FakeTransport::new();
    let mut store = transport.store(RootState::default());

    store.dispatch(command::execute("countdown 3"));
    run_until(&mut store, |s| s.command.subscription_id.is_some()).await;
    let subid = store.state().command.subscription_id.clone().unwrap();

    for line in ["3", "2", "1"] {
        transport.push(
            &subid,
            Ok(json!({"commandExecute": {"stdout": line, "finished": false, "timestamp": 0.0}})),
        );
    }
    transport.push(
        &subid,
        Ok(json!({"commandExecute": {"stdout": null, "finished": true, "timestamp": 0.0}})),
    );
    run_until(&mut store, |s| s.command.status == command::CommandStatus::Finished).await;

    assert_eq!(store.state().command.output, vec!["3", "2", "1"]);
    assert_eq!(store.state().command.subscription_id, None);
    assert_eq!(store.deps().subscriptions.active(Channel::Command).await, None);
}

#[tokio::test]
async fn remote_fetch_populates_the_cache() {
    let transport = FakeTransport::new();
    transport.respond(Ok(json!({"todoList": {"todos": [
        {"id": "1", "text": "Learn GraphQL", "completed": false},
    ]}})));
    let mut store = transport.store(RootState::default());

    store.dispatch(remote_todo::fetch_todos());
    run_until(&mut store, |s| !s.cache.todos.is_empty()).await;
    assert_eq!(store.state().remote_todo.todos, vec![Todo::new("1", "Learn GraphQL")]);
}
