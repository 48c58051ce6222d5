/* Copyright (C) 2023 Admix Pty. Ltd. - All Rights Reserved.
Unauthorized copying of this file, via any medium is strictly prohibited.
Proprietary and confidential. */

//! Process-scoped registry of prototype trees, keyed by event type and
//! optionally by instance.

use ahash::HashMap;

use crate::context::EventHandle;
use crate::error::{EngineError, EngineResult};
use crate::event::{Event, EventType};
use crate::node::Node;
use crate::phase::PhaseTree;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InstanceKey {
    event_type: EventType,
    instance: String,
}

/// Registers event-type trees and merges per-instance and per-event
/// overrides into an effective tree. No process-wide singleton is
/// required; a `Default` instance is provided for convenience but every
/// API here also works via an explicit, injected manager.
#[derive(Default)]
pub struct ContextManager {
    by_type: HashMap<EventType, PhaseTree>,
    by_instance: HashMap<InstanceKey, PhaseTree>,
}

impl ContextManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, event_type: impl Into<EventType>, tree: PhaseTree) {
        self.by_type.insert(event_type.into(), tree);
    }

    pub fn register_for_instance(
        &mut self,
        event_type: impl Into<EventType>,
        instance: impl Into<String>,
        tree: PhaseTree,
    ) {
        let key = InstanceKey {
            event_type: event_type.into(),
            instance: instance.into(),
        };
        self.by_instance.insert(key, tree);
    }

    pub fn unregister(&mut self, event_type: &EventType, instance: Option<&str>) {
        match instance {
            Some(instance) => {
                let key = InstanceKey {
                    event_type: event_type.clone(),
                    instance: instance.to_string(),
                };
                self.by_instance.remove(&key);
            }
            None => {
                self.by_type.remove(event_type);
            }
        }
    }

    /// Assemble the effective tree for `event_type`: clone the type-level
    /// prototype, merge in the instance override if registered, then graft
    /// any event-scoped node onto `EXECUTE`. Conflicts resolve override-wins
    /// at every stage.
    pub fn get_context(
        &self,
        event_type: &EventType,
        instance: Option<&str>,
        event_scoped: Option<Node>,
    ) -> EngineResult<PhaseTree> {
        let base = self
            .by_type
            .get(event_type)
            .ok_or_else(|| EngineError::UnregisteredEventType(event_type.clone()))?;
        let mut effective = base.clone();

        if let Some(instance) = instance {
            let key = InstanceKey {
                event_type: event_type.clone(),
                instance: instance.to_string(),
            };
            if let Some(over) = self.by_instance.get(&key) {
                effective.merge_override(over.clone());
            }
        }

        if let Some(scoped) = event_scoped {
            effective.merge_into_execute(scoped);
        }

        Ok(effective)
    }

    /// Assemble the effective tree for `event` and wrap it into a handle
    /// ready for `EventHandle::process`.
    pub fn handle_for(
        &self,
        event: Event,
        instance: Option<&str>,
        event_scoped: Option<Node>,
    ) -> EngineResult<EventHandle> {
        let event_type = event.event_type.clone();
        let tree = self.get_context(&event_type, instance, event_scoped)?;
        Ok(EventHandle::new(event, tree))
    }
}
