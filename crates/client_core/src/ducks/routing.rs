use std::{fmt, str::FromStr};

use crate::store::Action;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Route {
    #[default]
    Home,
    Todo,
    Remote,
    PubSub,
    Command,
}

impl Route {
    pub const ALL: [Route; 5] = [
        Route::Home,
        Route::Todo,
        Route::Remote,
        Route::PubSub,
        Route::Command,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Todo => "/todo",
            Route::Remote => "/remote",
            Route::PubSub => "/pubsub",
            Route::Command => "/command",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRoute(pub String);

impl fmt::Display for UnknownRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown route '{}'", self.0)
    }
}

impl std::error::Error for UnknownRoute {}

impl FromStr for Route {
    type Err = UnknownRoute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('/');
        let path = if trimmed.is_empty() { "/" } else { s.trim() };
        Route::ALL
            .into_iter()
            .find(|route| route.path() == path || route.path().trim_start_matches('/') == trimmed)
            .ok_or_else(|| UnknownRoute(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoutingAction {
    Navigate { route: Route },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingState {
    pub location: Route,
    pub previous: Option<Route>,
}

pub fn reduce(mut state: RoutingState, action: &Action) -> RoutingState {
    let Action::Routing(RoutingAction::Navigate { route }) = action else {
        return state;
    };
    if state.location != *route {
        state.previous = Some(state.location);
        state.location = *route;
    }
    state
}

pub fn navigate(route: Route) -> Action {
    RoutingAction::Navigate { route }.into()
}
