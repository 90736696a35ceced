use client_core::{
    ducks::{
        command, remote_todo,
        routing::{self, Route, UnknownRoute},
        todo, todo_pub_sub,
    },
    Action,
};
use thiserror::Error;

pub const HELP: &str = "\
commands:
  todo add <text>            add a local todo
  todo toggle <n>            toggle local todo n
  pubsub subscribe           follow todos created on the server
  pubsub unsubscribe         stop following
  pubsub add <text>          create a todo on the server
  pubsub toggle <n>          toggle received todo n
  remote fetch               load the server's todo list
  remote toggle <id>         toggle a server todo by id
  run <command>              run a command on the server, e.g. 'countdown 3'
  go <route>                 show / todo remote pubsub command
  state                      dump the whole state
  help                       show this text
  quit                       exit";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Dispatch(Action),
    State,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("'{0}' is not a todo index")]
    BadIndex(String),
    #[error(transparent)]
    Route(#[from] UnknownRoute),
}

pub fn parse(line: &str) -> Result<Option<ConsoleCommand>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (head, rest) = split_word(line);
    let command = match head {
        "todo" => ConsoleCommand::Dispatch(parse_todo(rest)?),
        "pubsub" => ConsoleCommand::Dispatch(parse_pub_sub(rest)?),
        "remote" => ConsoleCommand::Dispatch(parse_remote(rest)?),
        "run" if !rest.is_empty() => ConsoleCommand::Dispatch(command::execute(rest)),
        "run" => return Err(ParseError::Usage("run <command>")),
        "go" => ConsoleCommand::Dispatch(routing::navigate(rest.parse::<Route>()?)),
        "state" => ConsoleCommand::State,
        "help" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn parse_todo(args: &str) -> Result<Action, ParseError> {
    match split_word(args) {
        ("add", text) if !text.is_empty() => Ok(todo::create_todo(text)),
        ("toggle", index) => Ok(todo::toggle_todo(parse_index(index)?)),
        _ => Err(ParseError::Usage("todo add <text> | todo toggle <n>")),
    }
}

fn parse_pub_sub(args: &str) -> Result<Action, ParseError> {
    match split_word(args) {
        ("subscribe", "") => Ok(todo_pub_sub::subscribe_todos()),
        ("unsubscribe", "") => Ok(todo_pub_sub::unsubscribe_todos()),
        ("add", text) if !text.is_empty() => Ok(todo_pub_sub::create_todo(text)),
        ("toggle", index) => Ok(todo_pub_sub::toggle_todo(parse_index(index)?)),
        _ => Err(ParseError::Usage(
            "pubsub subscribe | unsubscribe | add <text> | toggle <n>",
        )),
    }
}

fn parse_remote(args: &str) -> Result<Action, ParseError> {
    match split_word(args) {
        ("fetch", "") => Ok(remote_todo::fetch_todos()),
        ("toggle", id) if !id.is_empty() => Ok(remote_todo::toggle_todo(id)),
        _ => Err(ParseError::Usage("remote fetch | remote toggle <id>")),
    }
}

fn parse_index(raw: &str) -> Result<usize, ParseError> {
    raw.parse()
        .map_err(|_| ParseError::BadIndex(raw.to_string()))
}

fn split_word(input: &str) -> (&str, &str) {
    match input.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (input, ""),
    }
}

#[cfg(test)]
#[path = "tests/console_tests.rs"]
mod tests;
