use super::*;
use commands::{parse_command, Command, CommandError};
use shared::{
    domain::{CommandOutput, Todo},
    operations::{
        ADD_TODO_MUTATION, COMMAND_EXECUTE_SUBSCRIPTION, NEW_TODOS_SUBSCRIPTION, TODO_LIST_QUERY,
        TOGGLE_TODO_MUTATION,
    },
};

fn context() -> ApiContext {
    ApiContext::new(TodoStore::seeded(), Duration::ZERO)
}

#[tokio::test]
async fn todo_list_returns_seeded_todos() {
    let ctx = context();
    let response = execute(&ctx, &GraphqlRequest::new(TODO_LIST_QUERY))
        .await
        .expect("execute");
    let data = response.into_result().expect("data");
    let list: TodoList = serde_json::from_value(data["todoList"].clone()).expect("list");
    assert_eq!(list.todos.len(), 2);
    assert_eq!(list.todos[0].id, TodoId("1".into()));
}

#[tokio::test]
async fn add_todo_assigns_next_id_and_notifies_subscribers() {
    let ctx = context();
    let mut sub = subscribe(&ctx, NEW_TODOS_SUBSCRIPTION, &Variables::new())
        .await
        .expect("subscribe");
    assert_eq!(sub.key, "todos");

    let request = GraphqlRequest::new(ADD_TODO_MUTATION).variable("text", "buy milk");
    let data = execute(&ctx, &request)
        .await
        .expect("execute")
        .into_result()
        .expect("data");
    let created: Todo = serde_json::from_value(data["addTodo"].clone()).expect("todo");
    assert_eq!(created.id, TodoId("3".into()));
    assert!(!created.completed);

    let event = sub.events.next().await.expect("event");
    let pushed: Todo =
        serde_json::from_value(event.into_result().expect("data")["newTodos"].clone())
            .expect("todo");
    assert_eq!(pushed, created);
}

#[tokio::test]
async fn add_todo_rejects_blank_text() {
    let ctx = context();
    let request = GraphqlRequest::new(ADD_TODO_MUTATION).variable("text", "   ");
    let err = execute(&ctx, &request).await.expect_err("should fail");
    assert_eq!(err.message, "todo text must not be empty");
}

#[tokio::test]
async fn toggle_todo_flips_and_rejects_unknown_ids() {
    let ctx = context();
    let request = GraphqlRequest::new(TOGGLE_TODO_MUTATION).variable("id", "2");
    let data = execute(&ctx, &request)
        .await
        .expect("execute")
        .into_result()
        .expect("data");
    assert_eq!(data["toggleTodo"]["completed"], true);

    let missing = GraphqlRequest::new(TOGGLE_TODO_MUTATION).variable("id", "42");
    let err = execute(&ctx, &missing).await.expect_err("should fail");
    assert_eq!(err.message, "todo 42 does not exist");
}

#[tokio::test]
async fn subscriptions_are_refused_over_execute() {
    let ctx = context();
    let err = execute(&ctx, &GraphqlRequest::new(NEW_TODOS_SUBSCRIPTION))
        .await
        .expect_err("should fail");
    assert!(err.message.contains("websocket"));
}

#[tokio::test]
async fn unknown_fields_are_reported() {
    let ctx = context();
    let err = execute(&ctx, &GraphqlRequest::new("{ users { id } }"))
        .await
        .expect_err("should fail");
    assert_eq!(err.message, "unknown Query field 'users'");
}

#[tokio::test]
async fn countdown_streams_lines_then_finishes() {
    let ctx = context();
    let mut variables = Variables::new();
    variables.insert("command".into(), "countdown 3".into());
    let sub = subscribe(&ctx, COMMAND_EXECUTE_SUBSCRIPTION, &variables)
        .await
        .expect("subscribe");
    assert_eq!(sub.key, "commandExecute");

    let events: Vec<CommandOutput> = sub
        .events
        .map(|event| {
            serde_json::from_value(event.into_result().expect("data")["commandExecute"].clone())
                .expect("output")
        })
        .collect()
        .await;
    let lines: Vec<_> = events.iter().filter_map(|e| e.stdout.clone()).collect();
    assert_eq!(lines, vec!["3", "2", "1"]);
    let last = events.last().expect("finished event");
    assert!(last.finished);
    assert_eq!(last.stdout, None);
}

#[tokio::test]
async fn unknown_command_fails_the_subscription() {
    let ctx = context();
    let mut variables = Variables::new();
    variables.insert("command".into(), "rm -rf /".into());
    let err = subscribe(&ctx, COMMAND_EXECUTE_SUBSCRIPTION, &variables)
        .await
        .err()
        .expect("should fail");
    assert_eq!(err.message, "unknown command 'rm'");
}

#[test]
fn countdown_arguments_are_parsed() {
    let default = Duration::from_millis(250);
    assert_eq!(
        parse_command("countdown", default),
        Ok(Command::Countdown {
            interval: default,
            count: 5
        })
    );
    assert_eq!(
        parse_command("countdown -i 0.5 2", default),
        Ok(Command::Countdown {
            interval: Duration::from_millis(500),
            count: 2
        })
    );
    assert_eq!(parse_command("   ", default), Err(CommandError::Empty));
    assert!(matches!(
        parse_command("countdown -i", default),
        Err(CommandError::InvalidArgument { .. })
    ));
    assert!(matches!(
        parse_command("countdown 1 2", default),
        Err(CommandError::InvalidArgument { .. })
    ));
    assert!(matches!(
        parse_command("countdown 5000", default),
        Err(CommandError::InvalidArgument { .. })
    ));
}
