use std::sync::Arc;

use parlor_db::stores::MatchStore;
use parlor_events::EventBus;

/// Shared state for the match handlers.
#[derive(Clone)]
pub struct MatchState {
    pub store: Arc<dyn MatchStore>,
    pub event_bus: Arc<EventBus>,
}

impl MatchState {
    pub fn new(store: Arc<dyn MatchStore>, event_bus: Arc<EventBus>) -> Self {
        Self { store, event_bus }
    }
}
