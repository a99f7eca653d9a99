//! Navigation contract used on session teardown

use std::sync::{Mutex, PoisonError};

/// Named destinations the session layer can send the user to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Public landing page
    Home,
}

impl Route {
    pub fn name(&self) -> &'static str {
        match self {
            Route::Home => "home",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
        }
    }
}

/// Implemented by the routing layer. Called after the session is already cleared.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator that only remembers where it was sent.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> Vec<Route> {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route);
    }
}
