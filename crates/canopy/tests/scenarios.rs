//! End-to-end scenarios driving a `ContextManager`-registered tree through
//! `EventHandle`.

use canopy::prelude::*;
use canopy::test_support::HandlerLog;

fn event(id: u64, ty: &str) -> Event {
    Event::new(id, ty)
}

#[test]
fn straight_path_runs_every_phase_in_order() {
    let log = HandlerLog::new();
    let mut manager = ContextManager::new();
    let tree = TreeBuilder::new()
        .on_validate(|l| {
            l.handler("v", log.handler(HandlerResult::Done));
        })
        .on_prepare(|l| {
            l.handler("p", log.handler(HandlerResult::Done));
        })
        .on_execute(|l| {
            l.handler("e", log.handler(HandlerResult::Done));
        })
        .on_success(|l| {
            l.handler("s", log.handler(HandlerResult::Done));
        })
        .on_complete(|l| {
            l.handler("c", log.handler(HandlerResult::Done));
        })
        .build()
        .unwrap();
    manager.register("order.created", tree);

    let handle = manager
        .handle_for(event(1, "order.created"), None, None)
        .unwrap();
    let status = handle.process().unwrap();

    assert!(status.is_success());
    assert_eq!(
        log.ids(),
        vec![
            NodeId::new("v"),
            NodeId::new("p"),
            NodeId::new("e"),
            NodeId::new("s"),
            NodeId::new("c"),
        ]
    );
    handle.with_event(|e| {
        assert!(e.is_completed());
        assert!(!e.has_failures());
    });
}

#[test]
fn failure_in_execute_routes_to_failure_then_complete() {
    let log = HandlerLog::new();
    let mut manager = ContextManager::new();
    let tree = TreeBuilder::new()
        .on_execute(|l| {
            l.handler("e", log.handler(HandlerResult::Fail));
        })
        .on_success(|l| {
            l.handler("s", log.handler(HandlerResult::Done));
        })
        .on_failure(|l| {
            l.handler("f", log.handler(HandlerResult::Done));
        })
        .on_complete(|l| {
            l.handler("c", log.handler(HandlerResult::Done));
        })
        .build()
        .unwrap();
    manager.register("payment.charged", tree);

    let handle = manager
        .handle_for(event(2, "payment.charged"), None, None)
        .unwrap();
    let status = handle.process().unwrap();

    assert!(status.is_failure());
    assert_eq!(
        log.ids(),
        vec![NodeId::new("e"), NodeId::new("f"), NodeId::new("c")]
    );
    handle.with_event(|e| assert!(e.has_failures()));
}

#[test]
fn waiting_handler_suspends_and_resume_completes() {
    let log = HandlerLog::new();
    let mut manager = ContextManager::new();
    let tree = TreeBuilder::new()
        .on_execute(|l| {
            l.handler("wait-me", log.handler(HandlerResult::Wait));
        })
        .on_success(|l| {
            l.handler("s", log.handler(HandlerResult::Done));
        })
        .build()
        .unwrap();
    manager.register("shipment.dispatch", tree);

    let handle = manager
        .handle_for(event(3, "shipment.dispatch"), None, None)
        .unwrap();
    let status = handle.process().unwrap();
    assert!(status.is_waiting());

    let status = handle.resume(&[]).unwrap();
    assert!(status.is_success());
    assert_eq!(
        log.ids(),
        vec![NodeId::new("wait-me"), NodeId::new("s")]
    );
}

#[test]
fn external_fail_while_waiting_routes_to_failure_phase() {
    let log = HandlerLog::new();
    let mut manager = ContextManager::new();
    let tree = TreeBuilder::new()
        .on_execute(|l| {
            l.handler("wait-me", log.handler(HandlerResult::Wait));
        })
        .on_failure(|l| {
            l.handler("f", log.handler(HandlerResult::Done));
        })
        .build()
        .unwrap();
    manager.register("refund.request", tree);

    let handle = manager
        .handle_for(event(4, "refund.request"), None, None)
        .unwrap();
    assert!(handle.process().unwrap().is_waiting());

    let status = handle.fail(&[]).unwrap();
    assert!(status.is_failure());
    assert_eq!(log.ids(), vec![NodeId::new("wait-me"), NodeId::new("f")]);
}

#[test]
fn selector_stops_at_first_success() {
    let log = HandlerLog::new();
    let mut manager = ContextManager::new();
    let tree = TreeBuilder::new()
        .on_execute(|l| {
            l.selector("try-providers", |l| {
                l.handler_with(
                    "primary",
                    log.handler(HandlerResult::Fail),
                    HandlerOptions::new().order(0),
                );
                l.handler_with(
                    "secondary",
                    log.handler(HandlerResult::Done),
                    HandlerOptions::new().order(1),
                );
                l.handler_with(
                    "tertiary",
                    log.handler(HandlerResult::Done),
                    HandlerOptions::new().order(2),
                );
            });
        })
        .build()
        .unwrap();
    manager.register("notification.send", tree);

    let handle = manager
        .handle_for(event(5, "notification.send"), None, None)
        .unwrap();
    let status = handle.process().unwrap();

    assert!(status.is_success());
    assert_eq!(
        log.ids(),
        vec![NodeId::new("primary"), NodeId::new("secondary")]
    );
}

#[test]
fn parallel_resolves_on_success_threshold_without_waiting_for_stragglers() {
    let log = HandlerLog::new();
    let mut manager = ContextManager::new();
    let tree = TreeBuilder::new()
        .on_execute(|l| {
            l.parallel("fan-out", Some(2), 2, |l| {
                l.handler_with(
                    "a",
                    log.handler(HandlerResult::Done),
                    HandlerOptions::new().order(0),
                );
                l.handler_with(
                    "b",
                    log.handler(HandlerResult::Done),
                    HandlerOptions::new().order(1),
                );
                l.handler_with(
                    "c",
                    log.handler(HandlerResult::Wait),
                    HandlerOptions::new().order(2),
                );
            });
        })
        .build()
        .unwrap();
    manager.register("fanout.job", tree);

    let handle = manager
        .handle_for(event(6, "fanout.job"), None, None)
        .unwrap();
    let status = handle.process().unwrap();

    assert!(status.is_success());
    assert_eq!(log.ids(), vec![NodeId::new("a"), NodeId::new("b")]);
}

#[test]
fn parallel_waits_when_under_threshold_then_resolves_on_resume() {
    let log = HandlerLog::new();
    let mut manager = ContextManager::new();
    let tree = TreeBuilder::new()
        .on_execute(|l| {
            l.parallel("fan-out", Some(2), 1, |l| {
                l.handler_with(
                    "a",
                    log.handler(HandlerResult::Wait),
                    HandlerOptions::new().order(0),
                );
                l.handler_with(
                    "b",
                    log.handler(HandlerResult::Done),
                    HandlerOptions::new().order(1),
                );
            });
        })
        .build()
        .unwrap();
    manager.register("fanout.partial", tree);

    let handle = manager
        .handle_for(event(7, "fanout.partial"), None, None)
        .unwrap();
    assert!(handle.process().unwrap().is_waiting());

    let status = handle.resume(&[NodeId::new("a")]).unwrap();
    assert!(status.is_success());
}

#[test]
fn inverter_flips_a_handler_failure_into_layer_success() {
    let log = HandlerLog::new();
    let mut manager = ContextManager::new();
    let tree = TreeBuilder::new()
        .on_execute(|l| {
            l.handler_with(
                "expect-fail",
                log.handler(HandlerResult::Fail),
                HandlerOptions::new().with_inverter(),
            );
        })
        .build()
        .unwrap();
    manager.register("guard.check", tree);

    let handle = manager
        .handle_for(event(8, "guard.check"), None, None)
        .unwrap();
    let status = handle.process().unwrap();
    assert!(status.is_success());
}

#[test]
fn conditions_gate_a_handler_to_vacuous_success() {
    let log = HandlerLog::new();
    let mut manager = ContextManager::new();
    let tree = TreeBuilder::new()
        .on_execute(|l| {
            l.handler_with(
                "skip-me",
                log.handler(HandlerResult::Done),
                HandlerOptions::new().conditions(Conditions::new().with(std::sync::Arc::new(
                    |_event: &Event, _id: &NodeId| false,
                ))),
            );
        })
        .build()
        .unwrap();
    manager.register("feature.gated", tree);

    let handle = manager
        .handle_for(event(9, "feature.gated"), None, None)
        .unwrap();
    let status = handle.process().unwrap();

    assert!(status.is_success());
    assert!(log.ids().is_empty());
}

#[test]
fn max_executions_budget_is_shared_across_clones_of_the_same_prototype() {
    // ExecutionCount lives behind an `Arc`, so every event drawn from the
    // same type-level prototype shares one budget: the third event never
    // invokes the handler at all.
    let log = HandlerLog::new();
    let mut manager = ContextManager::new();
    let tree = TreeBuilder::new()
        .on_execute(|l| {
            l.handler_with(
                "once",
                log.handler(HandlerResult::Done),
                HandlerOptions::new().max_executions(2),
            );
        })
        .build()
        .unwrap();
    manager.register("retry.capped", tree);

    for id in 10..13 {
        let handle = manager
            .handle_for(event(id, "retry.capped"), None, None)
            .unwrap();
        assert!(handle.process().unwrap().is_success());
    }

    assert_eq!(log.ids().len(), 2);
}

#[test]
fn instance_override_merges_on_top_of_the_type_prototype() {
    let type_log = HandlerLog::new();
    let instance_log = HandlerLog::new();
    let mut manager = ContextManager::new();

    let base = TreeBuilder::new()
        .on_execute(|l| {
            l.handler("base", type_log.handler(HandlerResult::Done));
        })
        .build()
        .unwrap();
    manager.register("ticket.opened", base);

    let override_tree = TreeBuilder::new()
        .on_execute(|l| {
            l.handler("special", instance_log.handler(HandlerResult::Done));
        })
        .build()
        .unwrap();
    manager.register_for_instance("ticket.opened", "vip-customer", override_tree);

    let handle = manager
        .handle_for(event(11, "ticket.opened"), Some("vip-customer"), None)
        .unwrap();
    let status = handle.process().unwrap();

    assert!(status.is_success());
    assert_eq!(type_log.ids(), vec![NodeId::new("base")]);
    assert_eq!(instance_log.ids(), vec![NodeId::new("special")]);
}

#[test]
fn event_scoped_node_grafts_onto_execute() {
    let log = HandlerLog::new();
    let mut manager = ContextManager::new();
    let base = TreeBuilder::new()
        .on_execute(|l| {
            l.handler("base", log.handler(HandlerResult::Done));
        })
        .build()
        .unwrap();
    manager.register("webhook.fired", base);

    let mut scoped = build_layer(NodeId::new("extra"), LayerKind::Sequence, |l| {
        l.handler("scoped", log.handler(HandlerResult::Done));
    })
    .unwrap();
    scoped.order = 1;

    let handle = manager
        .handle_for(event(12, "webhook.fired"), None, Some(Node::Layer(scoped)))
        .unwrap();
    let status = handle.process().unwrap();

    assert!(status.is_success());
    assert_eq!(log.ids(), vec![NodeId::new("base"), NodeId::new("scoped")]);
}

#[test]
fn cancel_bypasses_success_failure_but_still_runs_complete() {
    let log = HandlerLog::new();
    let mut manager = ContextManager::new();
    let tree = TreeBuilder::new()
        .on_execute(|l| {
            l.handler("wait-me", log.handler(HandlerResult::Wait));
        })
        .on_success(|l| {
            l.handler("s", log.handler(HandlerResult::Done));
        })
        .on_cancel(|l| {
            l.handler("undo", log.handler(HandlerResult::Done));
        })
        .on_complete(|l| {
            l.handler("c", log.handler(HandlerResult::Done));
        })
        .build()
        .unwrap();
    manager.register("order.cancel", tree);

    let handle = manager
        .handle_for(event(13, "order.cancel"), None, None)
        .unwrap();
    assert!(handle.process().unwrap().is_waiting());

    let status = handle.cancel().unwrap();
    assert!(status.is_cancelled());
    assert_eq!(
        log.ids(),
        vec![NodeId::new("wait-me"), NodeId::new("undo"), NodeId::new("c")]
    );
}

#[test]
fn process_called_twice_is_a_programming_error() {
    let log = HandlerLog::new();
    let mut manager = ContextManager::new();
    let tree = TreeBuilder::new()
        .on_execute(|l| {
            l.handler("e", log.handler(HandlerResult::Done));
        })
        .build()
        .unwrap();
    manager.register("dup.process", tree);

    let handle = manager
        .handle_for(event(14, "dup.process"), None, None)
        .unwrap();
    handle.process().unwrap();
    assert!(matches!(handle.process(), Err(EngineError::AlreadyProcessed(_))));
}

#[test]
fn node_at_resolves_a_dotted_path_for_introspection() {
    let log = HandlerLog::new();
    let mut manager = ContextManager::new();
    let tree = TreeBuilder::new()
        .on_execute(|l| {
            l.sequence("inner", |l| {
                l.handler("leaf", log.handler(HandlerResult::Done));
            });
        })
        .build()
        .unwrap();
    manager.register("introspect.me", tree.clone());

    let node = tree
        .node_at(Phase::Execute, &NodeId::new("inner.leaf"))
        .expect("dotted path should resolve");
    assert_eq!(node.id(), &NodeId::new("leaf"));

    let execute_layer = tree.phase_layer(Phase::Execute).unwrap();
    let handlers = execute_layer.iter_handlers();
    assert_eq!(handlers.len(), 1);
    assert_eq!(handlers[0].id(), &NodeId::new("leaf"));
}

#[test]
fn unregistered_event_type_is_rejected() {
    let manager = ContextManager::new();
    let err = manager
        .handle_for(event(15, "nobody.registered.me"), None, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::UnregisteredEventType(_)));
}
