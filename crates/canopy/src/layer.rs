//! Sequence, Selector, and Parallel composite nodes.

use ahash::HashMap;

use crate::error::{EngineError, EngineResult};
use crate::event::Event;
use crate::handler::Conditions;
use crate::node::Node;
use crate::node_id::{resolve_for_child, NodeId};
use crate::status::{apply_inverter, NodeStatus, Priority};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Sequence,
    Selector,
    Parallel {
        success_threshold: Option<usize>,
        failure_threshold: usize,
    },
}

#[derive(Debug, Clone)]
pub struct LayerNode {
    id: NodeId,
    pub priority: Priority,
    pub order: u32,
    pub conditions: Conditions,
    pub with_inverter: bool,
    pub kind: LayerKind,
    pub(crate) children: HashMap<NodeId, Node>,
    insertion_order: Vec<NodeId>,
    status: NodeStatus,
    cursor: usize,
    available: Vec<NodeId>,
}

impl LayerNode {
    pub fn new(id: impl Into<NodeId>, kind: LayerKind) -> Self {
        Self {
            id: id.into(),
            priority: Priority::default(),
            order: 0,
            conditions: Conditions::default(),
            with_inverter: false,
            kind,
            children: HashMap::default(),
            insertion_order: Vec::new(),
            status: NodeStatus::Unknown,
            cursor: 0,
            available: Vec::new(),
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    pub fn children(&self) -> impl Iterator<Item = (&NodeId, &Node)> {
        self.insertion_order.iter().map(|id| (id, &self.children[id]))
    }

    pub fn child(&self, id: &NodeId) -> Option<&Node> {
        self.children.get(id)
    }

    pub fn add_child(&mut self, node: Node) -> EngineResult<()> {
        let id = node.id().clone();
        if self.children.contains_key(&id) {
            return Err(EngineError::DuplicateNodeId(id));
        }
        self.insertion_order.push(id.clone());
        self.children.insert(id, node);
        Ok(())
    }

    /// Insert or replace `node` by its `NodeId`, override-wins. Used by
    /// `ContextManager` to graft an event-scoped tree onto `EXECUTE`.
    pub(crate) fn adopt(&mut self, node: Node) {
        match node {
            Node::Layer(incoming) => {
                let id = incoming.id.clone();
                match self.children.get_mut(&id) {
                    Some(Node::Layer(existing)) => existing.merge_override(incoming),
                    _ => {
                        if !self.children.contains_key(&id) {
                            self.insertion_order.push(id.clone());
                        }
                        self.children.insert(id, Node::Layer(incoming));
                    }
                }
            }
            handler @ Node::Handler(_) => {
                let id = handler.id().clone();
                if !self.children.contains_key(&id) {
                    self.insertion_order.push(id.clone());
                }
                self.children.insert(id, handler);
            }
        }
    }

    /// Merge `other`'s children into `self` by `NodeId`, override-wins.
    /// Layers at the same path merge recursively; any other pairing (or a
    /// brand new id) replaces/inserts wholesale.
    pub(crate) fn merge_override(&mut self, other: LayerNode) {
        for id in other.insertion_order {
            if let Some(child) = other.children.get(&id) {
                self.adopt(child.clone());
            }
        }
    }

    fn snapshot_available(&self, event: &Event) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .children
            .iter()
            .filter(|(_, child)| !child.status().is_terminal())
            .filter(|(_, child)| child.is_eligible(event))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort_by(|a, b| {
            let ca = &self.children[a];
            let cb = &self.children[b];
            cb.priority()
                .cmp(&ca.priority())
                .then(ca.order().cmp(&cb.order()))
        });
        ids
    }

    pub fn process(&mut self, event: &mut Event) -> NodeStatus {
        self.drive(event, None)
    }

    pub fn drive(&mut self, event: &mut Event, incoming: Option<NodeStatus>) -> NodeStatus {
        if self.status.is_terminal() {
            return self.status;
        }
        match self.kind {
            LayerKind::Sequence | LayerKind::Selector => self.drive_sequential(event, incoming),
            LayerKind::Parallel { .. } => self.drive_parallel(event, incoming),
        }
    }

    fn drive_sequential(&mut self, event: &mut Event, incoming: Option<NodeStatus>) -> NodeStatus {
        if incoming.is_none() {
            self.available = self.snapshot_available(event);
            self.cursor = 0;
        }
        let is_sequence = matches!(self.kind, LayerKind::Sequence);
        let mut pending = incoming;

        loop {
            let outcome = match pending.take() {
                Some(status) => status,
                None => {
                    let Some(id) = self.available.get(self.cursor).cloned() else {
                        break;
                    };
                    let child = self.children.get_mut(&id).expect("snapshot is stale");
                    child.process(event)
                }
            };

            match outcome {
                NodeStatus::Waiting => {
                    self.status = NodeStatus::Waiting;
                    return self.status;
                }
                NodeStatus::Cancelled => {
                    self.status = apply_inverter(NodeStatus::Cancelled, self.with_inverter);
                    return self.status;
                }
                NodeStatus::Success if is_sequence => {
                    self.cursor += 1;
                }
                NodeStatus::Failure if !is_sequence => {
                    self.cursor += 1;
                }
                NodeStatus::Success => {
                    // Selector: first success wins.
                    self.status = apply_inverter(NodeStatus::Success, self.with_inverter);
                    return self.status;
                }
                NodeStatus::Failure => {
                    // Sequence: first failure stops it.
                    self.status = apply_inverter(NodeStatus::Failure, self.with_inverter);
                    return self.status;
                }
                NodeStatus::Unknown => unreachable!("a driven child never reports Unknown"),
            }
        }

        let exhaustion = if is_sequence {
            NodeStatus::Success
        } else {
            NodeStatus::Failure
        };
        self.status = apply_inverter(exhaustion, self.with_inverter);
        self.status
    }

    fn parallel_thresholds(&self) -> (usize, usize) {
        match self.kind {
            LayerKind::Parallel {
                success_threshold,
                failure_threshold,
            } => (
                success_threshold.unwrap_or(self.available.len()),
                failure_threshold.max(1),
            ),
            _ => unreachable!("parallel_thresholds called on a non-parallel layer"),
        }
    }

    fn check_parallel_thresholds(
        &self,
        success_threshold: usize,
        failure_threshold: usize,
    ) -> Option<NodeStatus> {
        let mut successes = 0usize;
        let mut failures = 0usize;
        let mut cancelled = 0usize;
        let mut all_terminal = true;

        for id in &self.available {
            let status = self.children[id].status();
            match status {
                NodeStatus::Success => successes += 1,
                NodeStatus::Failure => failures += 1,
                NodeStatus::Cancelled => cancelled += 1,
                _ => {}
            }
            if !status.is_terminal() {
                all_terminal = false;
            }
        }

        if successes >= success_threshold {
            return Some(NodeStatus::Success);
        }
        if failures >= failure_threshold {
            return Some(NodeStatus::Failure);
        }
        if all_terminal {
            return Some(if cancelled > 0 {
                NodeStatus::Cancelled
            } else if successes >= failures {
                NodeStatus::Success
            } else {
                NodeStatus::Failure
            });
        }
        None
    }

    fn drive_parallel(&mut self, event: &mut Event, incoming: Option<NodeStatus>) -> NodeStatus {
        if incoming.is_none() {
            self.available = self.snapshot_available(event);
            self.cursor = 0;
        }
        let (success_threshold, failure_threshold) = self.parallel_thresholds();
        let mut pending = incoming;

        loop {
            let outcome = match pending.take() {
                Some(status) => status,
                None => {
                    let Some(id) = self.available.get(self.cursor).cloned() else {
                        break;
                    };
                    let child = self.children.get_mut(&id).expect("snapshot is stale");
                    if child.status().is_terminal() {
                        self.cursor += 1;
                        continue;
                    }
                    child.process(event)
                }
            };

            if outcome.is_waiting() {
                self.status = NodeStatus::Waiting;
                return self.status;
            }

            self.cursor += 1;
            if let Some(result) = self.check_parallel_thresholds(success_threshold, failure_threshold) {
                self.status = apply_inverter(result, self.with_inverter);
                return self.status;
            }
        }

        let result = self
            .check_parallel_thresholds(success_threshold, failure_threshold)
            .expect("all eligible children terminal implies a resolvable result");
        self.status = apply_inverter(result, self.with_inverter);
        self.status
    }

    pub fn resume(&mut self, event: &mut Event, ids: &[NodeId]) -> NodeStatus {
        self.reenter(event, ids, |child, event, ids| child.resume(event, ids))
    }

    pub fn fail(&mut self, event: &mut Event, ids: &[NodeId]) -> NodeStatus {
        self.reenter(event, ids, |child, event, ids| child.fail(event, ids))
    }

    fn reenter(
        &mut self,
        event: &mut Event,
        ids: &[NodeId],
        op: impl Fn(&mut Node, &mut Event, &[NodeId]) -> NodeStatus,
    ) -> NodeStatus {
        if !self.status.is_waiting() {
            return self.status;
        }
        let Some(child_id) = self.available.get(self.cursor).cloned() else {
            return self.status;
        };
        let Some(remainder) = resolve_for_child(ids, &child_id) else {
            return self.status;
        };
        let child = self.children.get_mut(&child_id).expect("cursor out of sync");
        let child_status = op(child, event, &remainder);
        self.drive(event, Some(child_status))
    }

    /// All handler leaves reachable under this layer, depth-first in
    /// insertion order. Read-only; has no effect on drive state.
    pub fn iter_handlers(&self) -> Vec<&crate::handler::HandlerNode> {
        let mut out = Vec::new();
        self.collect_handlers(&mut out);
        out
    }

    fn collect_handlers<'a>(&'a self, out: &mut Vec<&'a crate::handler::HandlerNode>) {
        for (_, child) in self.children() {
            match child {
                Node::Handler(h) => out.push(h),
                Node::Layer(l) => l.collect_handlers(out),
            }
        }
    }

    /// All layer nodes reachable under this layer, including `self`,
    /// depth-first in insertion order.
    pub fn iter_layers(&self) -> Vec<&LayerNode> {
        let mut out = vec![self];
        for (_, child) in self.children() {
            if let Node::Layer(l) = child {
                out.extend(l.iter_layers());
            }
        }
        out
    }

    /// Resolve a dotted `NodeId` path (`a.b.c`) to the node it addresses,
    /// relative to this layer.
    pub fn node_at(&self, path: &NodeId) -> Option<&Node> {
        let mut segments = path.as_str().splitn(2, '.');
        let head = NodeId::new(segments.next()?);
        let rest = segments.next();
        let child = self.children.get(&head)?;
        match rest {
            None => Some(child),
            Some(rest) => match child {
                Node::Layer(l) => l.node_at(&NodeId::new(rest)),
                Node::Handler(_) => None,
            },
        }
    }

    /// Cascade `Cancel` to every non-terminal child and settle this layer.
    pub fn cancel(&mut self, event: &mut Event) -> NodeStatus {
        for id in self.insertion_order.clone() {
            if let Some(child) = self.children.get_mut(&id) {
                if !child.status().is_terminal() {
                    child.cancel(event);
                }
            }
        }
        self.status = apply_inverter(NodeStatus::Cancelled, self.with_inverter);
        self.status
    }
}
