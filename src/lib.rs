pub mod config;
pub mod db;
pub mod error;
pub mod modules;
pub mod services;

use chrono::{DateTime, Utc};
use std::sync::Arc;

use config::environment::Deadlines;
use db::Datastore;
use services::clock::{Clock, SystemClock};

/// Shared handles every operation runs against.
///
/// The state carries no mutable data of its own; all coordination between
/// concurrent operations goes through the datastore's transactions.
pub struct AppState<S: Datastore> {
    pub store: S,
    pub clock: Arc<dyn Clock>,
    pub deadlines: Deadlines,
}

impl<S: Datastore> AppState<S> {
    pub fn new(store: S, deadlines: Deadlines) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), deadlines)
    }

    pub fn with_clock(store: S, clock: Arc<dyn Clock>, deadlines: Deadlines) -> Self {
        Self {
            store,
            clock,
            deadlines,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
