//! Drives one event through its effective tree, exposing
//! `process`/`resume`/`fail`/`cancel`. Calls are serialized against each
//! other by a per-event mutex: single-threaded cooperative driving on the
//! calling thread, but `resume`/`fail`/`cancel` may be invoked from any
//! thread (see the crate's concurrency notes).

use std::sync::Mutex;

use crate::error::{EngineError, EngineResult};
use crate::event::{Event, EventId};
use crate::node_id::NodeId;
use crate::phase::PhaseTree;
use crate::status::NodeStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriveState {
    NotStarted,
    Waiting,
    Done(NodeStatus),
}

struct Inner {
    tree: PhaseTree,
    event: Event,
    state: DriveState,
}

/// Owns one event's effective tree for the lifetime of its processing.
pub struct EventHandle {
    inner: Mutex<Inner>,
}

impl EventHandle {
    pub fn new(event: Event, tree: PhaseTree) -> Self {
        Self {
            inner: Mutex::new(Inner {
                tree,
                event,
                state: DriveState::NotStarted,
            }),
        }
    }

    fn state_for(status: NodeStatus) -> DriveState {
        if status.is_waiting() {
            DriveState::Waiting
        } else {
            DriveState::Done(status)
        }
    }

    /// Drive the root from `VALIDATE`. May only be called once per event;
    /// a second call is a programming error.
    pub fn process(&self) -> EngineResult<NodeStatus> {
        let mut guard = self.inner.lock().expect("event mutex poisoned");
        if !matches!(guard.state, DriveState::NotStarted) {
            return Err(EngineError::AlreadyProcessed(guard.event.id));
        }
        let status = guard.tree.process(&mut guard.event);
        guard.state = Self::state_for(status);
        Ok(status)
    }

    pub fn resume(&self, ids: &[NodeId]) -> EngineResult<NodeStatus> {
        self.reenter(ids, |tree, event, ids| tree.resume(event, ids))
    }

    pub fn fail(&self, ids: &[NodeId]) -> EngineResult<NodeStatus> {
        self.reenter(ids, |tree, event, ids| tree.fail(event, ids))
    }

    fn reenter(
        &self,
        ids: &[NodeId],
        op: impl FnOnce(&mut PhaseTree, &mut Event, &[NodeId]) -> NodeStatus,
    ) -> EngineResult<NodeStatus> {
        let mut guard = self.inner.lock().expect("event mutex poisoned");
        match guard.state {
            DriveState::NotStarted => return Err(EngineError::NotYetProcessed(guard.event.id)),
            DriveState::Done(status) => return Ok(status),
            DriveState::Waiting => {}
        }
        let status = op(&mut guard.tree, &mut guard.event, ids);
        guard.state = Self::state_for(status);
        Ok(status)
    }

    /// Cancel is terminal and irreversible; calling it again just returns
    /// the settled status.
    pub fn cancel(&self) -> EngineResult<NodeStatus> {
        let mut guard = self.inner.lock().expect("event mutex poisoned");
        match guard.state {
            DriveState::NotStarted => return Err(EngineError::NotYetProcessed(guard.event.id)),
            DriveState::Done(status) => return Ok(status),
            DriveState::Waiting => {}
        }
        let status = guard.tree.cancel(&mut guard.event);
        guard.state = Self::state_for(status);
        Ok(status)
    }

    pub fn id(&self) -> EventId {
        self.inner.lock().expect("event mutex poisoned").event.id
    }

    pub fn with_event<R>(&self, f: impl FnOnce(&Event) -> R) -> R {
        let guard = self.inner.lock().expect("event mutex poisoned");
        f(&guard.event)
    }
}
