//! Test doubles for asserting execution order across resume/fail cycles,
//! in the spirit of the crate's own `LeafLogger`.

use std::sync::{Arc, Mutex};

use crate::event::Event;
use crate::handler::{HandlerFn, HandlerResult};
use crate::node_id::NodeId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub id: NodeId,
    pub result: HandlerResult,
}

/// Records the ids of and results returned by handlers in the order they
/// ran.
#[derive(Default, Clone)]
pub struct HandlerLog(Arc<Mutex<Vec<LogEntry>>>);

impl HandlerLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.0.lock().expect("log mutex poisoned").clone()
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.entries().into_iter().map(|e| e.id).collect()
    }

    /// A handler that always returns `result`, logging its own invocation.
    pub fn handler(&self, result: HandlerResult) -> HandlerFn {
        let log = self.clone();
        Arc::new(move |_event: &mut Event, id: &NodeId| {
            log.0
                .lock()
                .expect("log mutex poisoned")
                .push(LogEntry {
                    id: id.clone(),
                    result,
                });
            result
        })
    }
}
