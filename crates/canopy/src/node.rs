//! The polymorphic node set: every node in the tree is either a handler
//! leaf or a layer composite, sharing one operation set.

use derive_more::From;

use crate::event::Event;
use crate::handler::HandlerNode;
use crate::layer::LayerNode;
use crate::node_id::NodeId;
use crate::status::{NodeStatus, Priority};

#[derive(Debug, Clone, From)]
pub enum Node {
    Handler(HandlerNode),
    Layer(LayerNode),
}

impl Node {
    pub fn id(&self) -> &NodeId {
        match self {
            Node::Handler(h) => h.id(),
            Node::Layer(l) => l.id(),
        }
    }

    pub fn priority(&self) -> Priority {
        match self {
            Node::Handler(h) => h.priority,
            Node::Layer(l) => l.priority,
        }
    }

    pub fn order(&self) -> u32 {
        match self {
            Node::Handler(h) => h.order,
            Node::Layer(l) => l.order,
        }
    }

    pub fn status(&self) -> NodeStatus {
        match self {
            Node::Handler(h) => h.status(),
            Node::Layer(l) => l.status(),
        }
    }

    pub fn is_eligible(&self, event: &Event) -> bool {
        match self {
            Node::Handler(h) => h.conditions.eval(event, h.id()),
            Node::Layer(l) => l.conditions.eval(event, l.id()),
        }
    }

    pub fn process(&mut self, event: &mut Event) -> NodeStatus {
        match self {
            Node::Handler(h) => h.process(event),
            Node::Layer(l) => l.drive(event, None),
        }
    }

    pub fn resume(&mut self, event: &mut Event, ids: &[NodeId]) -> NodeStatus {
        match self {
            Node::Handler(h) => h.resume(event, ids),
            Node::Layer(l) => l.resume(event, ids),
        }
    }

    pub fn fail(&mut self, event: &mut Event, ids: &[NodeId]) -> NodeStatus {
        match self {
            Node::Handler(h) => h.fail(event, ids),
            Node::Layer(l) => l.fail(event, ids),
        }
    }

    pub fn cancel(&mut self, event: &mut Event) -> NodeStatus {
        match self {
            Node::Handler(h) => h.cancel(event),
            Node::Layer(l) => l.cancel(event),
        }
    }

    pub fn as_layer(&self) -> Option<&LayerNode> {
        match self {
            Node::Layer(l) => Some(l),
            Node::Handler(_) => None,
        }
    }

    pub fn as_layer_mut(&mut self) -> Option<&mut LayerNode> {
        match self {
            Node::Layer(l) => Some(l),
            Node::Handler(_) => None,
        }
    }

    pub fn as_handler(&self) -> Option<&HandlerNode> {
        match self {
            Node::Handler(h) => Some(h),
            Node::Layer(_) => None,
        }
    }
}
