//! Active event store: every event currently inside the window, by id.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;

/// Identifier assigned to an event when the writer accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An accepted event. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: EventId,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ActiveEventStore {
    events: HashMap<EventId, Event>,
}

impl ActiveEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, event: Event) {
        self.events.insert(event.id, event);
    }

    pub fn remove(&mut self, id: EventId) -> Option<Event> {
        self.events.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }
}
