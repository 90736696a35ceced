//! Client-side state container for the todo and command demos.
//!
//! A [`Store`] owns the state tree and applies [`Action`]s through pure
//! per-feature reducers. Side effects live in logic units that talk to the
//! server through a [`GraphqlTransport`] and report back by dispatching
//! further actions. Subscription streams are tracked by the
//! [`SubscriptionManager`], which guarantees one live stream per channel.

use std::sync::Arc;

pub mod ducks;
pub mod error;
pub mod logic;
pub mod store;
pub mod subscriptions;
pub mod transport;
pub mod ws_transport;

pub use error::{LogicError, TransportError};
pub use logic::LogicDeps;
pub use store::{Action, Dispatcher, RootState, Store};
pub use subscriptions::{Channel, ChannelEvents, Subscribed, SubscriptionManager};
pub use transport::{GraphqlTransport, Subscription, SubscriptionEvents};
pub use ws_transport::WsTransport;

/// Builds a store wired to the server at `server_url`.
pub fn connect_store(server_url: &str, initial: RootState) -> Result<Store, TransportError> {
    let transport: Arc<dyn GraphqlTransport> = Arc::new(WsTransport::new(server_url)?);
    Ok(Store::new(initial, LogicDeps::new(transport)))
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
