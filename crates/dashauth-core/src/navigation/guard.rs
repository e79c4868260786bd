//! Gate protected content on the session state.

use crate::models::UserProfile;
use crate::session::SessionState;

use super::{Navigator, Route};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Show the requested content
    Render,
    /// Session check still running, show nothing yet
    Pending,
    /// Not signed in, go here instead
    Redirect(Route),
}

/// Stateless gate in front of protected routes.
pub struct RouteGuard;

impl RouteGuard {
    pub fn check(state: &SessionState, route: Route) -> GuardDecision {
        if !route.is_protected() {
            return GuardDecision::Render;
        }
        match state {
            SessionState::Authenticated(_) => GuardDecision::Render,
            SessionState::Initializing => GuardDecision::Pending,
            SessionState::Unauthenticated => GuardDecision::Redirect(Route::Login),
        }
    }

    /// Produce protected content for the signed-in user, or navigate to
    /// the login page. Returns `None` whenever nothing should be shown.
    pub fn protect<T, F>(state: &SessionState, navigator: &dyn Navigator, content: F) -> Option<T>
    where
        F: FnOnce(&UserProfile) -> T,
    {
        match state {
            SessionState::Authenticated(user) => Some(content(user)),
            SessionState::Initializing => None,
            SessionState::Unauthenticated => {
                navigator.navigate(Route::Login);
                None
            }
        }
    }
}
