//! One module per feature: its actions, action creators, reducer and logic.

use serde::de::DeserializeOwned;
use serde_json::Value;

pub mod cache;
pub mod command;
pub mod remote_todo;
pub mod routing;
pub mod todo;
pub mod todo_pub_sub;

/// Reads the root field `field` out of a response's `data` object.
fn decode_field<T: DeserializeOwned>(mut data: Value, field: &str) -> Result<T, serde_json::Error> {
    let value = data
        .get_mut(field)
        .map(Value::take)
        .unwrap_or(Value::Null);
    serde_json::from_value(value)
}
