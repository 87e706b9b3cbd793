//! End-to-end kernel scenarios: spawn/think, election priorities, IPC
//! ordering, and driver-level cascade shutdown.

use noesis_e2e_tests::harness::{deprecate_oldest, shutdown_cascade, KernelHarness};
use noesis_kernel::prelude::*;
use noesis_kernel::{NsEntry, NsLookup};
use serde_json::{json, Value};

#[test]
fn spawn_and_think_produces_queryable_knowledge() {
    let mut h = KernelHarness::new();

    let pid = h.spawn_root("A");
    assert_eq!(pid, 1);

    let reply = h
        .kernel
        .syscall(pid, Syscall::Think { input: "Q".into(), context: json!({}) })
        .unwrap();
    let SyscallReply::Thought { atom, .. } = reply else {
        panic!("expected a thought id");
    };
    assert!(h.kernel.store().get(&atom).is_some());

    let SyscallReply::Knowledge { matches } = h
        .kernel
        .syscall(pid, Syscall::QueryKnowledge { pattern: Pattern::by_type("ConceptNode") })
        .unwrap()
    else {
        panic!();
    };
    assert!(
        matches
            .iter()
            .any(|m| m.atom.name.as_deref().is_some_and(|n| n.starts_with("thought_"))),
        "at least one thought atom must be queryable"
    );
}

#[test]
fn higher_consciousness_wins_a_single_election() {
    let mut h = KernelHarness::new();

    let spawn = |h: &mut KernelHarness, name: &str, level: u8| -> Pid {
        let reply = h
            .kernel
            .syscall(
                KERNEL_PID,
                Syscall::SpawnAgent {
                    config: ProcessConfig {
                        name: name.into(),
                        priority: Some(5),
                        consciousness_level: Some(level),
                        ..Default::default()
                    },
                },
            )
            .unwrap();
        let SyscallReply::Spawned { pid, .. } = reply else {
            panic!("expected a spawn reply");
        };
        pid
    };

    let _p1 = spawn(&mut h, "P1", 1);
    let p2 = spawn(&mut h, "P2", 3);

    assert_eq!(h.kernel.schedule(), Some(p2));
}

#[test]
fn arousal_breaks_an_equal_level_tie() {
    let mut h = KernelHarness::new();

    let p1 = h.spawn_root("P1");
    let p2 = h.spawn_root("P2");

    // Drive arousal through the syscall surface, as an emotion processor
    // collaborator would.
    h.kernel
        .syscall(p1, Syscall::Feel { emotion: "fear".into(), intensity: 1.0 })
        .unwrap();
    h.kernel
        .syscall(p2, Syscall::Feel { emotion: "calm".into(), intensity: 0.1 })
        .unwrap();

    assert_eq!(h.kernel.schedule(), Some(p1));
}

#[test]
fn ipc_observes_fifo_order_with_single_delivery() {
    let mut h = KernelHarness::new();

    let a = h.spawn_root("A");
    let b = h.spawn_root("B");

    h.kernel
        .syscall(a, Syscall::SendThought { target: b, thought: "m1".into() })
        .unwrap();
    h.kernel
        .syscall(a, Syscall::SendThought { target: b, thought: "m2".into() })
        .unwrap();

    let mut received = Vec::new();
    for _ in 0..3 {
        let SyscallReply::Received { message } = h
            .kernel
            .syscall(b, Syscall::ReceiveThought { blocking: false })
            .unwrap()
        else {
            panic!();
        };
        received.push(message);
    }

    assert_eq!(received[0].as_ref().unwrap().payload, Value::from("m1"));
    assert_eq!(received[0].as_ref().unwrap().from, a);
    assert_eq!(received[1].as_ref().unwrap().payload, Value::from("m2"));
    assert!(received[2].is_none(), "third receive finds an empty mailbox");
}

#[test]
fn shutdown_cascades_through_the_driver() {
    let mut h = KernelHarness::new();

    let lead = h.spawn_root("lead");
    let sub_a = h.spawn_agent(lead, "sub-a");
    let sub_b = h.spawn_agent(lead, "sub-b");
    assert_eq!(h.kernel.ps().len(), 3);

    shutdown_cascade(&mut h.kernel, lead);

    assert!(h.kernel.ps().is_empty(), "neither parent nor children survive");
    for pid in [lead, sub_a, sub_b] {
        assert!(
            !h.kernel.open(&format!("/proc/{pid}")).is_found(),
            "no /proc entry may remain for {pid}"
        );
    }
}

#[test]
fn deprecation_removes_the_oldest_subordinate() {
    let mut h = KernelHarness::new();

    let lead = h.spawn_root("lead");
    h.tick_millis(10);
    let oldest = h.spawn_agent(lead, "first");
    h.tick_millis(10);
    let newer = h.spawn_agent(lead, "second");

    assert_eq!(deprecate_oldest(&mut h.kernel, lead), Some(oldest));
    assert!(h.kernel.open(&format!("/proc/{newer}")).is_found());
    assert_eq!(deprecate_oldest(&mut h.kernel, lead), Some(newer));
    assert_eq!(deprecate_oldest(&mut h.kernel, lead), None);
}

#[test]
fn quantum_expiry_rotates_between_agents() {
    let mut h = KernelHarness::new();

    let a = h.spawn_root("A");
    let b = h.spawn_root("B");

    let first = h.kernel.schedule().unwrap();
    h.tick_millis(50);
    assert_eq!(h.kernel.schedule(), Some(first), "within the quantum");

    h.tick_millis(100);
    let second = h.kernel.schedule().unwrap();
    assert_ne!(second, first, "past the quantum the other agent runs");
    assert!([a, b].contains(&second));
}

#[test]
fn namespace_exposes_cognitive_operations_and_views() {
    let mut h = KernelHarness::new();
    let pid = h.spawn_root("A");

    let NsLookup::Found { entry: NsEntry::Directory { entries } } = h.kernel.open("/cognitive")
    else {
        panic!();
    };
    assert_eq!(entries.len(), 14);

    assert!(matches!(
        h.kernel.open("/cognitive/send_thought"),
        NsLookup::Found { entry: NsEntry::SyscallHandle { .. } }
    ));
    assert!(matches!(
        h.kernel.open("/atomspace"),
        NsLookup::Found { entry: NsEntry::Atomspace }
    ));

    h.kernel
        .syscall(pid, Syscall::Feel { emotion: "joy".into(), intensity: 0.7 })
        .unwrap();
    h.kernel
        .syscall(pid, Syscall::ShiftConsciousness { level: 2 })
        .unwrap();
    assert!(h.kernel.open(&format!("/emotion/{pid}")).is_found());
    assert!(h.kernel.open(&format!("/consciousness/{pid}")).is_found());

    let NsLookup::Missing { reason } = h.kernel.open("/reservoir/state") else {
        panic!("nothing is published under /reservoir");
    };
    assert!(!reason.is_empty());
}

#[test]
fn raw_dispatch_drives_the_same_kernel() {
    let mut h = KernelHarness::new();
    let pid = h.spawn_root("A");

    h.kernel
        .dispatch_raw(
            pid,
            "remember",
            json!({ "key": "quest", "value": "find the grail", "importance": 0.9 }),
        )
        .unwrap();
    assert!(h.kernel.store().get_node("ConceptNode", "quest").is_some());

    let err = h.kernel.dispatch_raw(pid, "meditate", json!({})).unwrap_err();
    assert_eq!(err.errno, Errno::Enosys);
}
