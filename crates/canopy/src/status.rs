//! Node status and priority.

use std::cmp::Ordering;

/// The result of processing a node.
///
/// `Unknown` is the initial state only; a node's status never leaves a
/// terminal state except through reconstruction (clone, re-registration).
/// `Waiting` is the only non-terminal status a node can report after having
/// been processed at least once.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    /// Not yet processed.
    #[default]
    Unknown,
    /// Terminal: the node completed successfully.
    Success,
    /// Terminal: the node completed unsuccessfully.
    Failure,
    /// Non-terminal: the node is suspended, expecting an external
    /// `Resume`/`Fail`/`Cancel`.
    Waiting,
    /// Terminal: the node was cancelled and will never re-enter processing.
    Cancelled,
}

impl NodeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure | Self::Cancelled)
    }

    pub fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn is_waiting(self) -> bool {
        matches!(self, Self::Waiting)
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failure)
    }

    pub fn is_cancelled(self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Flip `status` between [`NodeStatus::Success`] and [`NodeStatus::Failure`]
/// when `with_inverter` is set. `Waiting`, `Cancelled`, and `Unknown` pass
/// through unchanged -- an inverter never observes `Unknown` and never
/// inverts a suspension or a cancellation.
pub fn apply_inverter(status: NodeStatus, with_inverter: bool) -> NodeStatus {
    if !with_inverter {
        return status;
    }
    match status {
        NodeStatus::Success => NodeStatus::Failure,
        NodeStatus::Failure => NodeStatus::Success,
        other => other,
    }
}

/// Execution priority. Higher priority runs first: `Critical > High >
/// Normal > Low > Background`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    Background,
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl Priority {
    fn rank(self) -> u8 {
        match self {
            Priority::Background => 0,
            Priority::Low => 1,
            Priority::Normal => 2,
            Priority::High => 3,
            Priority::Critical => 4,
        }
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    /// Ascending by rank (`Background` < ... < `Critical`). Callers that need
    /// "higher priority first" ordering (e.g. sorting a layer's eligible
    /// children) should compare in reverse.
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}
