//! The engine's error taxonomy: programming errors only (see the crate
//! docs for why handler failures and exceptions never surface here).

use thiserror::Error;

use crate::event::EventId;
use crate::node_id::NodeId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("EngineError: duplicate sibling NodeId: {0:?}")]
    DuplicateNodeId(NodeId),

    #[error("EngineError: duplicate (priority, order) among siblings of {node:?}: ({priority:?}, {order})")]
    DuplicatePriorityOrder {
        node: NodeId,
        priority: crate::status::Priority,
        order: u32,
    },

    #[error("EngineError: layer {0:?} has no children")]
    DanglingLayer(NodeId),

    #[error(
        "EngineError: parallel node {node:?} has an invalid threshold \
         (success={success}, failure={failure}, children={children})"
    )]
    InvalidParallelThreshold {
        node: NodeId,
        success: usize,
        failure: usize,
        children: usize,
    },

    #[error("EngineError: event type {0:?} is not registered with this ContextManager")]
    UnregisteredEventType(crate::event::EventType),

    #[error("EngineError: Process called twice on event {0:?}")]
    AlreadyProcessed(EventId),

    #[error("EngineError: Resume/Fail/Cancel called before Process on event {0:?}")]
    NotYetProcessed(EventId),
}

pub type EngineResult<T> = Result<T, EngineError>;
