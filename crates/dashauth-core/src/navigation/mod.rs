//! Client-visible routes and navigation.
//!
//! `Navigator` abstracts the host's location handling. `navigate` is an
//! in-app transition; `redirect` is a hard navigation that, in a browser,
//! reloads the page and discards in-memory state. `Router` is the
//! in-memory implementation used by the CLI and tests.

pub mod guard;

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use guard::{GuardDecision, RouteGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Login,
    Dashboard,
    Forbidden,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Dashboard => "/dashboard",
            Route::Forbidden => "/403",
        }
    }

    /// Parse a location path. `/` is an alias of the dashboard; query
    /// strings, fragments and trailing slashes are ignored.
    pub fn from_path(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" | "/dashboard" => Some(Route::Dashboard),
            "/login" => Some(Route::Login),
            "/403" => Some(Route::Forbidden),
            _ => None,
        }
    }

    /// Routes that require an authenticated session
    pub fn is_protected(self) -> bool {
        matches!(self, Route::Dashboard)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// In-app transition, state survives
    Push,
    /// Full page navigation, state is discarded
    Redirect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    pub route: Route,
    pub kind: NavigationKind,
}

pub trait Navigator: Send + Sync {
    fn current(&self) -> Route;

    fn navigate(&self, route: Route);

    fn redirect(&self, route: Route);
}

struct RouterState {
    current: Route,
    history: Vec<Navigation>,
}

/// In-memory navigator that records every transition.
pub struct Router {
    state: Mutex<RouterState>,
}

impl Router {
    pub fn new(start: Route) -> Self {
        Self {
            state: Mutex::new(RouterState {
                current: start,
                history: Vec::new(),
            }),
        }
    }

    /// All navigations since creation, oldest first
    pub fn history(&self) -> Vec<Navigation> {
        self.lock().history.clone()
    }

    pub fn last(&self) -> Option<Navigation> {
        self.lock().history.last().copied()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RouterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, route: Route, kind: NavigationKind) {
        let mut state = self.lock();
        debug!(from = %state.current, to = %route, ?kind, "Navigating");
        state.current = route;
        state.history.push(Navigation { route, kind });
    }
}

impl Navigator for Router {
    fn current(&self) -> Route {
        self.lock().current
    }

    fn navigate(&self, route: Route) {
        self.record(route, NavigationKind::Push);
    }

    fn redirect(&self, route: Route) {
        self.record(route, NavigationKind::Redirect);
    }
}
