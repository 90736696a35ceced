use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{domain::SubscriptionId, error::GraphqlError};

/// Websocket subprotocol spoken by the subscription endpoint.
pub const SUBSCRIPTIONS_PROTOCOL: &str = "graphql-subscriptions";

pub type Variables = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlRequest {
    pub query: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub variables: Variables,
    #[serde(
        rename = "operationName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_name: Option<String>,
}

impl GraphqlRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Variables::new(),
            operation_name: None,
        }
    }

    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphqlResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<GraphqlError>>,
}

impl GraphqlResponse {
    pub fn data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: None,
        }
    }

    pub fn errors(errors: Vec<GraphqlError>) -> Self {
        Self {
            data: None,
            errors: Some(errors),
        }
    }

    /// Collapses the envelope into its data, treating any reported error as failure.
    pub fn into_result(self) -> Result<Value, Vec<GraphqlError>> {
        match (self.data, self.errors) {
            (_, Some(errors)) if !errors.is_empty() => Err(errors),
            (Some(data), _) => Ok(data),
            (None, _) => Err(vec![GraphqlError::new("response carried no data")]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorsPayload {
    pub errors: Vec<GraphqlError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    SubscriptionStart {
        id: SubscriptionId,
        query: String,
        #[serde(default, deserialize_with = "null_as_empty")]
        variables: Variables,
    },
    SubscriptionEnd {
        id: SubscriptionId,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    SubscriptionSuccess {
        id: SubscriptionId,
    },
    SubscriptionFail {
        id: SubscriptionId,
        payload: ErrorsPayload,
    },
    SubscriptionData {
        id: SubscriptionId,
        payload: GraphqlResponse,
    },
}

impl ServerMessage {
    pub fn id(&self) -> &SubscriptionId {
        match self {
            Self::SubscriptionSuccess { id }
            | Self::SubscriptionFail { id, .. }
            | Self::SubscriptionData { id, .. } => id,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Variables, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Variables>::deserialize(deserializer)?.unwrap_or_default())
}
