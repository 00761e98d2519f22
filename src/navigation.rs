//! Navigation surface: which screen a request lands on.

use serde::{Deserialize, Serialize};

use crate::storage::{KeyValueStore, WalletSessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Home,
    Setup,
    Dashboard,
}

/// Apply redirects: the dashboard needs a persisted session
pub fn resolve<S: KeyValueStore>(requested: Route, store: &WalletSessionStore<S>) -> Route {
    match requested {
        Route::Dashboard if !store.exists() => Route::Setup,
        other => other,
    }
}
