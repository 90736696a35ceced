use chrono::Utc;
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident, $inner:ty) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(TodoId, String);
id_newtype!(SubscriptionId, u64);

impl From<&str> for TodoId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub text: String,
    pub completed: bool,
}

impl Todo {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: TodoId(id.into()),
            text: text.into(),
            completed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoList {
    pub todos: Vec<Todo>,
}

/// One streamed event of a remotely executed command.
///
/// A command produces any number of `stdout` lines followed by exactly one
/// event with `finished` set and no `stdout`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOutput {
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub finished: bool,
    pub timestamp: f64,
}

impl CommandOutput {
    pub fn line(stdout: impl Into<String>) -> Self {
        Self {
            stdout: Some(stdout.into()),
            finished: false,
            timestamp: now_timestamp(),
        }
    }

    pub fn finished() -> Self {
        Self {
            stdout: None,
            finished: true,
            timestamp: now_timestamp(),
        }
    }
}

fn now_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
