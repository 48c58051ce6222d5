//! Handler leaves: the tips of the tree holding user callbacks.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::event::{Event, HANDLER_PANIC_KEY};
use crate::node_id::NodeId;
use crate::status::{apply_inverter, NodeStatus, Priority};

/// Outcome a handler callback reports for a single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerResult {
    Done,
    Fail,
    Wait,
    Cancel,
}

pub type HandlerFn = Arc<dyn Fn(&mut Event, &NodeId) -> HandlerResult + Send + Sync>;
pub type ConditionFn = Arc<dyn Fn(&Event, &NodeId) -> bool + Send + Sync>;

/// A predicate chain gating node eligibility. Vacuously true when empty.
#[derive(Clone, Default)]
pub struct Conditions(Vec<ConditionFn>);

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, f: ConditionFn) {
        self.0.push(f);
    }

    pub fn with(mut self, f: ConditionFn) -> Self {
        self.0.push(f);
        self
    }

    /// A panicking predicate is treated as `false` (the node is skipped),
    /// mirroring the handler-exception policy.
    pub fn eval(&self, event: &Event, id: &NodeId) -> bool {
        self.0
            .iter()
            .all(|cond| panic::catch_unwind(AssertUnwindSafe(|| cond(event, id))).unwrap_or(false))
    }
}

impl std::fmt::Debug for Conditions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Conditions({} predicate(s))", self.0.len())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked with a non-string payload".to_string()
    }
}

#[derive(Clone)]
pub struct HandlerNode {
    id: NodeId,
    pub priority: Priority,
    pub order: u32,
    pub conditions: Conditions,
    pub with_inverter: bool,
    pub max_executions: Option<u64>,
    handler: HandlerFn,
    execution_count: Arc<AtomicU64>,
    status: NodeStatus,
}

impl std::fmt::Debug for HandlerNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerNode")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("order", &self.order)
            .field("with_inverter", &self.with_inverter)
            .field("max_executions", &self.max_executions)
            .field(
                "execution_count",
                &self.execution_count.load(Ordering::Relaxed),
            )
            .field("status", &self.status)
            .finish()
    }
}

impl HandlerNode {
    pub fn new(id: impl Into<NodeId>, handler: HandlerFn) -> Self {
        Self {
            id: id.into(),
            priority: Priority::default(),
            order: 0,
            conditions: Conditions::default(),
            with_inverter: false,
            max_executions: None,
            handler,
            execution_count: Arc::new(AtomicU64::new(0)),
            status: NodeStatus::Unknown,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    pub fn execution_count(&self) -> u64 {
        self.execution_count.load(Ordering::Relaxed)
    }

    /// Process this node. Terminal statuses are returned unchanged without
    /// invoking the handler or incrementing `ExecutionCount`.
    pub fn process(&mut self, event: &mut Event) -> NodeStatus {
        if self.status.is_terminal() {
            return self.status;
        }

        if !self.conditions.eval(event, &self.id) {
            // Conditions gate, they don't fail: an ineligible node succeeds
            // vacuously so it never blocks a Sequence or wins a Selector.
            self.status = NodeStatus::Success;
            return self.status;
        }

        if let Some(max) = self.max_executions {
            if self.execution_count.load(Ordering::Relaxed) >= max {
                self.status = NodeStatus::Success;
                return self.status;
            }
        }

        self.execution_count.fetch_add(1, Ordering::Relaxed);
        let handler = self.handler.clone();
        let id = self.id.clone();
        let raw = match panic::catch_unwind(AssertUnwindSafe(|| handler(event, &id))) {
            Ok(HandlerResult::Done) => NodeStatus::Success,
            Ok(HandlerResult::Fail) => NodeStatus::Failure,
            Ok(HandlerResult::Wait) => NodeStatus::Waiting,
            Ok(HandlerResult::Cancel) => NodeStatus::Cancelled,
            Err(payload) => {
                let message = panic_message(&*payload);
                log::error!("handler {} panicked: {message}", self.id);
                event
                    .data
                    .insert(HANDLER_PANIC_KEY, Value::String(message));
                NodeStatus::Failure
            }
        };

        self.status = apply_inverter(raw, self.with_inverter);
        if self.status.is_failure() {
            event.mark_failure();
        }
        self.status
    }

    pub fn resume(&mut self, event: &mut Event, ids: &[NodeId]) -> NodeStatus {
        if !self.status.is_waiting() {
            return self.status;
        }
        if ids.is_empty() || ids.iter().any(|i| i == &self.id) {
            self.status = apply_inverter(NodeStatus::Success, self.with_inverter);
            if self.status.is_failure() {
                event.mark_failure();
            }
        }
        self.status
    }

    pub fn fail(&mut self, event: &mut Event, ids: &[NodeId]) -> NodeStatus {
        if !self.status.is_waiting() {
            return self.status;
        }
        if ids.is_empty() || ids.iter().any(|i| i == &self.id) {
            self.status = apply_inverter(NodeStatus::Failure, self.with_inverter);
            if self.status.is_failure() {
                event.mark_failure();
            }
        }
        self.status
    }

    pub fn cancel(&mut self, _event: &mut Event) -> NodeStatus {
        self.status = NodeStatus::Cancelled;
        self.status
    }
}
