/* Copyright (C) 2023 Admix Pty. Ltd. - All Rights Reserved.
Unauthorized copying of this file, via any medium is strictly prohibited.
Proprietary and confidential. */

//! The fluent tree builder: `sequence`/`selector`/`parallel`/`handler`,
//! named phase sugar, and build-time validation.

use ahash::HashSet;

use crate::error::{EngineError, EngineResult};
use crate::handler::{Conditions, HandlerFn, HandlerNode};
use crate::layer::{LayerKind, LayerNode};
use crate::node::Node;
use crate::node_id::NodeId;
use crate::phase::{Phase, PhaseTree};
use crate::status::Priority;

/// Optional named arguments for `LayerBuilder::handler`.
#[derive(Clone, Default)]
pub struct HandlerOptions {
    priority: Priority,
    order: Option<u32>,
    conditions: Conditions,
    max_executions: Option<u64>,
    with_inverter: bool,
}

impl HandlerOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
    pub fn order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }
    pub fn conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }
    pub fn max_executions(mut self, max: u64) -> Self {
        self.max_executions = Some(max);
        self
    }
    pub fn with_inverter(mut self) -> Self {
        self.with_inverter = true;
        self
    }
}

/// Optional named arguments for `LayerBuilder::sequence`/`selector`.
#[derive(Clone, Default)]
pub struct LayerOptions {
    priority: Priority,
    order: Option<u32>,
    conditions: Conditions,
    with_inverter: bool,
}

impl LayerOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
    pub fn order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }
    pub fn conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }
    pub fn with_inverter(mut self) -> Self {
        self.with_inverter = true;
        self
    }
}

/// Builds one layer's worth of children. Obtained from `TreeBuilder`'s
/// phase-sugar methods, or recursively from `sequence`/`selector`/
/// `parallel`.
pub struct LayerBuilder {
    node: LayerNode,
    auto_order: u32,
    error: Option<EngineError>,
}

impl LayerBuilder {
    fn new(id: impl Into<NodeId>, kind: LayerKind) -> Self {
        Self {
            node: LayerNode::new(id, kind),
            auto_order: 0,
            error: None,
        }
    }

    fn from_existing(node: LayerNode) -> Self {
        let auto_order = node.children().map(|(_, c)| c.order()).max().map_or(0, |o| o + 1);
        Self {
            node,
            auto_order,
            error: None,
        }
    }

    fn take_order(&mut self, order: Option<u32>) -> u32 {
        match order {
            Some(o) => o,
            None => {
                let o = self.auto_order;
                self.auto_order += 1;
                o
            }
        }
    }

    fn record_err(&mut self, err: EngineError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Add a handler leaf with default priority/order/conditions.
    pub fn handler(&mut self, id: impl Into<NodeId>, callback: HandlerFn) -> &mut Self {
        self.handler_with(id, callback, HandlerOptions::default())
    }

    pub fn handler_with(
        &mut self,
        id: impl Into<NodeId>,
        callback: HandlerFn,
        opts: HandlerOptions,
    ) -> &mut Self {
        let order = self.take_order(opts.order);
        let mut node = HandlerNode::new(id, callback);
        node.priority = opts.priority;
        node.order = order;
        node.conditions = opts.conditions;
        node.with_inverter = opts.with_inverter;
        node.max_executions = opts.max_executions;
        if let Err(e) = self.node.add_child(Node::Handler(node)) {
            self.record_err(e);
        }
        self
    }

    pub fn sequence(&mut self, id: impl Into<NodeId>, f: impl FnOnce(&mut LayerBuilder)) -> &mut Self {
        self.sequence_with(id, LayerOptions::default(), f)
    }

    pub fn sequence_with(
        &mut self,
        id: impl Into<NodeId>,
        opts: LayerOptions,
        f: impl FnOnce(&mut LayerBuilder),
    ) -> &mut Self {
        self.layer(id, LayerKind::Sequence, opts, f)
    }

    pub fn selector(&mut self, id: impl Into<NodeId>, f: impl FnOnce(&mut LayerBuilder)) -> &mut Self {
        self.selector_with(id, LayerOptions::default(), f)
    }

    pub fn selector_with(
        &mut self,
        id: impl Into<NodeId>,
        opts: LayerOptions,
        f: impl FnOnce(&mut LayerBuilder),
    ) -> &mut Self {
        self.layer(id, LayerKind::Selector, opts, f)
    }

    pub fn parallel(
        &mut self,
        id: impl Into<NodeId>,
        success_threshold: Option<usize>,
        failure_threshold: usize,
        f: impl FnOnce(&mut LayerBuilder),
    ) -> &mut Self {
        self.parallel_with(
            id,
            success_threshold,
            failure_threshold,
            LayerOptions::default(),
            f,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn parallel_with(
        &mut self,
        id: impl Into<NodeId>,
        success_threshold: Option<usize>,
        failure_threshold: usize,
        opts: LayerOptions,
        f: impl FnOnce(&mut LayerBuilder),
    ) -> &mut Self {
        let kind = LayerKind::Parallel {
            success_threshold,
            failure_threshold: failure_threshold.max(1),
        };
        self.layer(id, kind, opts, f)
    }

    fn layer(
        &mut self,
        id: impl Into<NodeId>,
        kind: LayerKind,
        opts: LayerOptions,
        f: impl FnOnce(&mut LayerBuilder),
    ) -> &mut Self {
        let order = self.take_order(opts.order);
        let mut child_builder = LayerBuilder::new(id, kind);
        f(&mut child_builder);

        let mut child_node = child_builder.node;
        child_node.priority = opts.priority;
        child_node.order = order;
        child_node.conditions = opts.conditions;
        child_node.with_inverter = opts.with_inverter;

        if let Some(e) = child_builder.error {
            self.record_err(e);
        }
        if let Err(e) = self.node.add_child(Node::Layer(child_node)) {
            self.record_err(e);
        }
        self
    }
}

/// Assembles a `PhaseTree` prototype via named phase sugar
/// (`on_validate`/`on_prepare`/`on_execute`/`on_success`/`on_failure`/
/// `on_cancel`/`on_complete`), each backed by a `Sequence` layer by default.
#[derive(Default)]
pub struct TreeBuilder {
    phases: ahash::HashMap<Phase, LayerNode>,
    error: Option<EngineError>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_validate(&mut self, f: impl FnOnce(&mut LayerBuilder)) -> &mut Self {
        self.phase(Phase::Validate, f)
    }
    pub fn on_prepare(&mut self, f: impl FnOnce(&mut LayerBuilder)) -> &mut Self {
        self.phase(Phase::Prepare, f)
    }
    pub fn on_execute(&mut self, f: impl FnOnce(&mut LayerBuilder)) -> &mut Self {
        self.phase(Phase::Execute, f)
    }
    pub fn on_success(&mut self, f: impl FnOnce(&mut LayerBuilder)) -> &mut Self {
        self.phase(Phase::Success, f)
    }
    pub fn on_failure(&mut self, f: impl FnOnce(&mut LayerBuilder)) -> &mut Self {
        self.phase(Phase::Failure, f)
    }
    pub fn on_cancel(&mut self, f: impl FnOnce(&mut LayerBuilder)) -> &mut Self {
        self.phase(Phase::Cancel, f)
    }
    pub fn on_complete(&mut self, f: impl FnOnce(&mut LayerBuilder)) -> &mut Self {
        self.phase(Phase::Complete, f)
    }

    fn phase(&mut self, phase: Phase, f: impl FnOnce(&mut LayerBuilder)) -> &mut Self {
        let mut builder = match self.phases.remove(&phase) {
            Some(existing) => LayerBuilder::from_existing(existing),
            None => LayerBuilder::new(phase.node_id(), LayerKind::Sequence),
        };
        f(&mut builder);
        if let Some(e) = builder.error {
            if self.error.is_none() {
                self.error = Some(e);
            }
        }
        self.phases.insert(phase, builder.node);
        self
    }

    pub fn build(&mut self) -> EngineResult<PhaseTree> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        let mut tree = PhaseTree::new();
        for phase in Phase::ORDER {
            if let Some(layer) = self.phases.remove(&phase) {
                validate_layer(&layer)?;
                tree.set_phase(phase, layer);
            }
        }
        Ok(tree)
    }
}

/// Builds a single ad-hoc layer, e.g. for `Event::context`'s event-scoped
/// tree, which is grafted onto `EXECUTE` rather than carrying its own
/// phase structure.
pub fn build_layer(
    id: impl Into<NodeId>,
    kind: LayerKind,
    f: impl FnOnce(&mut LayerBuilder),
) -> EngineResult<LayerNode> {
    let mut builder = LayerBuilder::new(id, kind);
    f(&mut builder);
    if let Some(e) = builder.error {
        return Err(e);
    }
    validate_layer(&builder.node)?;
    Ok(builder.node)
}

fn validate_layer(layer: &LayerNode) -> EngineResult<()> {
    if layer.children().next().is_none() {
        return Err(EngineError::DanglingLayer(layer.id().clone()));
    }

    let mut seen = HashSet::default();
    for (_, child) in layer.children() {
        let key = (child.priority(), child.order());
        if !seen.insert(key) {
            return Err(EngineError::DuplicatePriorityOrder {
                node: child.id().clone(),
                priority: key.0,
                order: key.1,
            });
        }
    }

    if let LayerKind::Parallel {
        success_threshold,
        failure_threshold,
    } = layer.kind
    {
        let total = layer.children().count();
        if failure_threshold == 0 || failure_threshold > total {
            return Err(EngineError::InvalidParallelThreshold {
                node: layer.id().clone(),
                success: success_threshold.unwrap_or(total),
                failure: failure_threshold,
                children: total,
            });
        }
        if let Some(success_threshold) = success_threshold {
            if success_threshold == 0 || success_threshold > total {
                return Err(EngineError::InvalidParallelThreshold {
                    node: layer.id().clone(),
                    success: success_threshold,
                    failure: failure_threshold,
                    children: total,
                });
            }
        }
    }

    for (_, child) in layer.children() {
        if let Some(child_layer) = child.as_layer() {
            validate_layer(child_layer)?;
        }
    }
    Ok(())
}
