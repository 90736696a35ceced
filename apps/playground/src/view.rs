use std::fmt::Write as _;

use client_core::{
    ducks::{command::CommandStatus, routing::Route},
    RootState,
};
use shared::domain::Todo;

/// Renders the slice shown at the current route.
pub fn render(state: &RootState) -> String {
    let mut out = String::new();
    let route = state.routing.location;
    let _ = writeln!(out, "== {route} ==");
    match route {
        Route::Home => {
            out.push_str("todo, remote, pubsub and command demos; 'help' lists commands\n");
        }
        Route::Todo => todo_list(&mut out, &state.todo.todos),
        Route::PubSub => {
            match &state.todo_pub_sub.subscription_id {
                Some(id) => {
                    let _ = writeln!(out, "subscribed (id {id})");
                }
                None => out.push_str("not subscribed\n"),
            }
            if let Some(error) = &state.todo_pub_sub.create_error {
                let _ = writeln!(out, "error: {error}");
            }
            todo_list(&mut out, &state.todo_pub_sub.todos);
        }
        Route::Remote => {
            let remote = &state.remote_todo;
            if remote.loading {
                out.push_str("loading...\n");
            }
            if let Some(error) = &remote.error {
                let _ = writeln!(out, "error: {error}");
            }
            todo_list(&mut out, &remote.todos);
        }
        Route::Command => {
            let command = &state.command;
            let title = command.command.as_deref().unwrap_or("-");
            let status = match command.status {
                CommandStatus::Idle => "idle",
                CommandStatus::Running => "running",
                CommandStatus::Finished => "finished",
                CommandStatus::Failed => "failed",
            };
            let _ = writeln!(out, "$ {title} [{status}]");
            for line in &command.output {
                let _ = writeln!(out, "{line}");
            }
            if let Some(error) = &command.error {
                let _ = writeln!(out, "error: {error}");
            }
        }
    }
    out
}

fn todo_list(out: &mut String, todos: &[Todo]) {
    if todos.is_empty() {
        out.push_str("(no todos)\n");
    }
    for (index, todo) in todos.iter().enumerate() {
        let mark = if todo.completed { 'x' } else { ' ' };
        let _ = writeln!(out, "{index:>3}. [{mark}] {} (id {})", todo.text, todo.id);
    }
}
