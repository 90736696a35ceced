use server_api::{todos::TodoStore, ApiContext};

use crate::config::Settings;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) api: ApiContext,
}

impl AppState {
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        let todos = if settings.seed_todos {
            TodoStore::seeded()
        } else {
            TodoStore::new()
        };
        Self {
            api: ApiContext::new(todos, settings.command_interval),
        }
    }
}
