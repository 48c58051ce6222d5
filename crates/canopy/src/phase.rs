//! Lifecycle phases and the fixed phase tree that sequences them.

use std::fmt;

use ahash::HashMap;

use crate::event::Event;
use crate::layer::{LayerKind, LayerNode};
use crate::node::Node;
use crate::node_id::NodeId;
use crate::status::NodeStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Validate,
    Prepare,
    Execute,
    Success,
    Failure,
    Cancel,
    Complete,
}

impl Phase {
    pub const ORDER: [Phase; 7] = [
        Phase::Validate,
        Phase::Prepare,
        Phase::Execute,
        Phase::Success,
        Phase::Failure,
        Phase::Cancel,
        Phase::Complete,
    ];

    pub fn node_id(self) -> NodeId {
        NodeId::new(self.as_str())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Validate => "validate",
            Phase::Prepare => "prepare",
            Phase::Execute => "execute",
            Phase::Success => "success",
            Phase::Failure => "failure",
            Phase::Cancel => "cancel",
            Phase::Complete => "complete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The root shape of an effective tree: `VALIDATE -> PREPARE -> EXECUTE ->
/// (SUCCESS | FAILURE) -> CANCEL? -> COMPLETE`, with phases absent from
/// `phases` elided (vacuously `Success`).
#[derive(Debug, Clone, Default)]
pub struct PhaseTree {
    pub(crate) phases: HashMap<Phase, LayerNode>,
    current: Option<Phase>,
    pending_result: Option<NodeStatus>,
}

impl PhaseTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_phase(&mut self, phase: Phase, layer: LayerNode) {
        self.phases.insert(phase, layer);
    }

    pub fn has_phase(&self, phase: Phase) -> bool {
        self.phases.contains_key(&phase)
    }

    pub fn phase_layer(&self, phase: Phase) -> Option<&LayerNode> {
        self.phases.get(&phase)
    }

    fn run_phase(&mut self, phase: Phase, event: &mut Event, incoming: Option<NodeStatus>) -> NodeStatus {
        match self.phases.get_mut(&phase) {
            Some(layer) => layer.drive(event, incoming),
            None => NodeStatus::Success,
        }
    }

    pub fn process(&mut self, event: &mut Event) -> NodeStatus {
        self.drive_phase(event, Phase::Validate, None)
    }

    fn drive_phase(&mut self, event: &mut Event, phase: Phase, incoming: Option<NodeStatus>) -> NodeStatus {
        event.current_phase = Some(phase);
        let status = self.run_phase(phase, event, incoming);
        self.handle_result(event, phase, status)
    }

    fn handle_result(&mut self, event: &mut Event, phase: Phase, status: NodeStatus) -> NodeStatus {
        match status {
            NodeStatus::Waiting => {
                self.current = Some(phase);
                NodeStatus::Waiting
            }
            // A CANCEL-phase subtree can itself resolve `Cancelled` (a
            // handler returning `HandlerResult::Cancel` while already in
            // CANCEL). That must terminate here rather than re-drive
            // CANCEL again, which would recurse forever.
            NodeStatus::Cancelled if phase == Phase::Cancel => {
                self.finish(event, self.pending_result.unwrap_or(NodeStatus::Cancelled))
            }
            NodeStatus::Cancelled => {
                event.mark_cancelled();
                self.pending_result = Some(NodeStatus::Cancelled);
                self.drive_phase(event, Phase::Cancel, None)
            }
            NodeStatus::Success | NodeStatus::Failure if phase == Phase::Cancel => {
                self.finish(event, self.pending_result.unwrap_or(NodeStatus::Cancelled))
            }
            NodeStatus::Success => match phase {
                Phase::Validate => {
                    event.mark_phase_complete(phase);
                    self.drive_phase(event, Phase::Prepare, None)
                }
                Phase::Prepare => {
                    event.mark_phase_complete(phase);
                    self.drive_phase(event, Phase::Execute, None)
                }
                Phase::Execute => {
                    event.mark_phase_complete(phase);
                    self.drive_phase(event, Phase::Success, None)
                }
                Phase::Success => {
                    event.mark_phase_complete(phase);
                    self.finish(event, NodeStatus::Success)
                }
                Phase::Failure => self.finish(event, NodeStatus::Failure),
                Phase::Cancel | Phase::Complete => unreachable!("handled by their own branches"),
            },
            NodeStatus::Failure => {
                event.mark_failure();
                match phase {
                    Phase::Validate | Phase::Prepare | Phase::Execute => {
                        self.drive_phase(event, Phase::Failure, None)
                    }
                    Phase::Success | Phase::Failure => self.finish(event, NodeStatus::Failure),
                    Phase::Cancel | Phase::Complete => unreachable!("handled by their own branches"),
                }
            }
            NodeStatus::Unknown => unreachable!("a driven phase never reports Unknown"),
        }
    }

    fn finish(&mut self, event: &mut Event, result: NodeStatus) -> NodeStatus {
        self.current = None;
        event.current_phase = Some(Phase::Complete);
        let complete_status = self.run_phase(Phase::Complete, event, None);
        if complete_status.is_waiting() {
            self.current = Some(Phase::Complete);
            self.pending_result = Some(result);
            return NodeStatus::Waiting;
        }
        event.mark_phase_complete(Phase::Complete);
        event.mark_completed();
        result
    }

    pub fn resume(&mut self, event: &mut Event, ids: &[NodeId]) -> NodeStatus {
        self.reenter(event, ids, |layer, event, ids| layer.resume(event, ids))
    }

    pub fn fail(&mut self, event: &mut Event, ids: &[NodeId]) -> NodeStatus {
        self.reenter(event, ids, |layer, event, ids| layer.fail(event, ids))
    }

    fn reenter(
        &mut self,
        event: &mut Event,
        ids: &[NodeId],
        op: impl Fn(&mut LayerNode, &mut Event, &[NodeId]) -> NodeStatus,
    ) -> NodeStatus {
        let Some(phase) = self.current else {
            return self.pending_result.unwrap_or(NodeStatus::Waiting);
        };
        let Some(layer) = self.phases.get_mut(&phase) else {
            return NodeStatus::Waiting;
        };
        let status = op(layer, event, ids);

        if phase == Phase::Complete {
            if status.is_waiting() {
                return NodeStatus::Waiting;
            }
            event.mark_phase_complete(Phase::Complete);
            event.mark_completed();
            self.current = None;
            return self.pending_result.take().unwrap_or(status);
        }

        self.handle_result(event, phase, status)
    }

    pub fn cancel(&mut self, event: &mut Event) -> NodeStatus {
        if let Some(phase) = self.current {
            if phase != Phase::Complete {
                if let Some(layer) = self.phases.get_mut(&phase) {
                    layer.cancel(event);
                }
            } else {
                // Already in COMPLETE: let it run to its natural end.
                return self.pending_result.unwrap_or(NodeStatus::Waiting);
            }
        }
        self.current = None;
        event.mark_cancelled();
        self.pending_result = Some(NodeStatus::Cancelled);
        self.drive_phase(event, Phase::Cancel, None)
    }

    /// Resolve a dotted `NodeId` path rooted at a given phase, for
    /// diagnostics/introspection only.
    pub fn node_at(&self, phase: Phase, path: &NodeId) -> Option<&Node> {
        self.phases.get(&phase)?.node_at(path)
    }

    pub(crate) fn merge_override(&mut self, other: PhaseTree) {
        for (phase, layer) in other.phases {
            match self.phases.get_mut(&phase) {
                Some(existing) => existing.merge_override(layer),
                None => {
                    self.phases.insert(phase, layer);
                }
            }
        }
    }

    pub(crate) fn merge_into_execute(&mut self, node: Node) {
        let execute = self
            .phases
            .entry(Phase::Execute)
            .or_insert_with(|| LayerNode::new(Phase::Execute.node_id(), LayerKind::Sequence));
        execute.adopt(node);
    }
}
