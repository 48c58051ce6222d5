//! The `Event` threaded through processing: opaque to the engine beyond a
//! stable id, a data bag, and a handful of control bits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use ahash::HashMap;
use serde_json::Value;

use crate::phase::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(u64);

impl EventId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for EventId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Monotonic default id generator, used when the caller doesn't supply one.
#[derive(Debug, Default)]
pub struct EventIdGenerator(AtomicU64);

impl EventIdGenerator {
    pub fn next(&self) -> EventId {
        EventId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventType(String);

impl EventType {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Reserved data-bag key a caught handler panic is recorded under.
pub const HANDLER_PANIC_KEY: &str = "__handler_panic__";

/// Free-form key/value bag a handler can stash typed values into without
/// the engine needing to know any handler-specific types.
#[derive(Debug, Default, Clone)]
pub struct DataBag(HashMap<String, Value>);

impl DataBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}

#[derive(Debug, Clone)]
pub struct Event {
    pub id: EventId,
    pub event_type: EventType,
    pub created_at: SystemTime,
    pub data: DataBag,
    pub current_phase: Option<Phase>,
    is_cancelled: bool,
    has_failures: bool,
    is_completed: bool,
    completed_phases: ahash::HashSet<Phase>,
}

impl Event {
    pub fn new(id: impl Into<EventId>, event_type: impl Into<EventType>) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            created_at: SystemTime::now(),
            data: DataBag::new(),
            current_phase: None,
            is_cancelled: false,
            has_failures: false,
            is_completed: false,
            completed_phases: ahash::HashSet::default(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.is_cancelled
    }

    pub fn has_failures(&self) -> bool {
        self.has_failures
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    pub fn completed_phases(&self) -> &ahash::HashSet<Phase> {
        &self.completed_phases
    }

    pub(crate) fn mark_cancelled(&mut self) {
        self.is_cancelled = true;
    }

    pub(crate) fn mark_failure(&mut self) {
        self.has_failures = true;
    }

    pub(crate) fn mark_completed(&mut self) {
        self.is_completed = true;
    }

    pub(crate) fn mark_phase_complete(&mut self, phase: Phase) {
        self.completed_phases.insert(phase);
    }
}
