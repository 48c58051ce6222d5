/* Copyright (C) 2023 Admix Pty. Ltd. - All Rights Reserved.
Unauthorized copying of this file, via any medium is strictly prohibited.
Proprietary and confidential. */

//! # Canopy
//!
//! A hierarchical event-processing engine: a dispatcher that routes an
//! event through a user-composed tree of handler nodes with ordered,
//! prioritized, conditional, and pause/resume execution.
//!
//! ## Shape
//!
//! The tree mixes *layer* nodes ([`layer::LayerKind`]: `Sequence`/
//! `Selector`/`Parallel`) with *handler* leaves ([`handler::HandlerNode`])
//! holding user callbacks, and carries an [`event::Event`] through a fixed
//! sequence of lifecycle [`phase::Phase`]s: `Validate -> Prepare -> Execute
//! -> (Success | Failure) -> Cancel? -> Complete`.
//!
//! ## Suspension
//!
//! A handler may return [`handler::HandlerResult::Wait`], which bubbles up
//! through its ancestors as [`status::NodeStatus::Waiting`] and halts the
//! drive at the caller. [`context::EventHandle::resume`]/`fail`/`cancel`
//! re-enter the suspended node later by [`node_id::NodeId`] path -- never by
//! calling `process` again.
//!
//! ## Registries
//!
//! A [`manager::ContextManager`] holds prototype trees keyed by event type
//! (and optionally instance), and assembles the per-event *effective tree*
//! by cloning the type prototype and merging in instance and event-scoped
//! overrides, override-wins.
//!
//! ## Concurrency
//!
//! Driving is single-threaded and cooperative: handlers run synchronously
//! on the calling thread. `resume`/`fail`/`cancel` may be invoked from any
//! thread; `EventHandle` serializes them against an in-flight `process`
//! call via an internal mutex.

pub mod builder;
pub mod context;
pub mod error;
pub mod event;
pub mod handler;
pub mod layer;
pub mod manager;
pub mod node;
pub mod node_id;
pub mod phase;
pub mod status;
pub mod test_support;

pub mod prelude {
    pub use crate::builder::{build_layer, HandlerOptions, LayerBuilder, LayerOptions, TreeBuilder};
    pub use crate::context::EventHandle;
    pub use crate::error::{EngineError, EngineResult};
    pub use crate::event::{DataBag, Event, EventId, EventIdGenerator, EventType};
    pub use crate::handler::{Conditions, HandlerNode, HandlerResult};
    pub use crate::layer::{LayerKind, LayerNode};
    pub use crate::manager::ContextManager;
    pub use crate::node::Node;
    pub use crate::node_id::NodeId;
    pub use crate::phase::{Phase, PhaseTree};
    pub use crate::status::{NodeStatus, Priority};
}
