//! Syscall dispatch - the sole entry point for cognitive operations
//!
//! One exhaustive match over the closed alphabet. Every call increments
//! the kernel-wide counter and, when the caller has a process record, its
//! per-process counter - failure is still a call. A call whose PID does
//! not resolve fails `ESRCH` and changes nothing else; argument
//! validation happens before any mutation so a failed call leaves the
//! kernel exactly as it was.
//!
//! [`KERNEL_PID`] (0) is accepted as a caller for bootstrap: it has no
//! process record, so operations that read or write caller state
//! (`feel`, `shift_consciousness`, `receive_thought`) fail `ESRCH` for it.

use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::debug;

use noesis_core::{Pattern, StoreError, TruthValue};

use crate::kernel::{Kernel, KERNEL_PID};
use crate::namespace::MemoryRegion;
use crate::process::{Pid, ProcessConfig, ThoughtMessage};
use crate::syscall::{Syscall, SyscallFailure, SyscallOutcome, SyscallReply};

// Constants the `think` and `remember` handlers stamp onto atoms. They
// feed attention-ranked retrieval downstream.
const THOUGHT_STRENGTH: f64 = 0.8;
const THOUGHT_CONFIDENCE: f64 = 0.9;
const THOUGHT_ATTENTION: f64 = 0.7;
const MEMORY_CONFIDENCE: f64 = 0.9;

/// Spread depth used by `attend`.
const ATTEND_SPREAD_DEPTH: i32 = 2;
/// Spread depth used by `spread_activation`.
const ACTIVATION_SPREAD_DEPTH: i32 = 3;

/// Dispatch one syscall for the given caller.
pub(crate) fn dispatch(kernel: &mut Kernel, pid: Pid, call: Syscall) -> SyscallOutcome {
    kernel.syscall_count += 1;

    if pid != KERNEL_PID && kernel.table.get(pid).is_none() {
        debug!(pid, syscall = call.name(), "caller does not resolve");
        return Err(SyscallFailure::esrch(pid));
    }
    if let Some(process) = kernel.table.get_mut(pid) {
        process.stats.syscalls += 1;
    }

    match call {
        Syscall::Think { input, context } => think(kernel, pid, input, context),
        Syscall::Reason { premise, query } => reason(kernel, premise, query),
        Syscall::Feel { emotion, intensity } => feel(kernel, pid, emotion, intensity),
        Syscall::Remember { key, value, importance } => remember(kernel, key, value, importance),
        Syscall::Forget { key, threshold } => forget(kernel, key, threshold),
        Syscall::Attend { target, spread_factor } => attend(kernel, pid, target, spread_factor),
        Syscall::SpawnAgent { config } => spawn_agent(kernel, pid, config),
        Syscall::QueryKnowledge { pattern } => query_knowledge(kernel, pattern),
        Syscall::SpreadActivation { source, strength } => {
            spread_activation(kernel, source, strength)
        }
        Syscall::ShiftConsciousness { level } => shift_consciousness(kernel, pid, level),
        Syscall::AllocateCognitive { size, resource_type } => {
            allocate_cognitive(kernel, pid, size, resource_type)
        }
        Syscall::FreeCognitive { resource_id } => free_cognitive(kernel, resource_id),
        Syscall::SendThought { target, thought } => send_thought(kernel, pid, target, thought),
        Syscall::ReceiveThought { blocking } => receive_thought(kernel, pid, blocking),
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

fn think(kernel: &mut Kernel, pid: Pid, input: Value, context: Value) -> SyscallOutcome {
    let timestamp = kernel.clock.now();
    let name = format!("thought_{}_{}", timestamp.timestamp_millis(), pid);
    let metadata: BTreeMap<String, Value> = [
        ("input".to_string(), input),
        ("context".to_string(), context),
    ]
    .into_iter()
    .collect();

    let atom = kernel
        .memory
        .add_node(
            "ConceptNode",
            &name,
            Some(TruthValue::new(THOUGHT_STRENGTH, THOUGHT_CONFIDENCE)),
            Some(THOUGHT_ATTENTION),
            Some(metadata),
        )
        .map_err(store_failure)?;

    Ok(SyscallReply::Thought { atom, timestamp })
}

fn reason(kernel: &mut Kernel, premise: String, query: String) -> SyscallOutcome {
    if premise.is_empty() || query.is_empty() {
        return Err(SyscallFailure::einval("premise and query must be named"));
    }
    let pattern = Pattern::link("InheritanceLink", vec![premise, query]);
    let matches = kernel.memory.store().query(&pattern);
    Ok(SyscallReply::Inferences { matches })
}

fn feel(kernel: &mut Kernel, pid: Pid, emotion: String, intensity: f64) -> SyscallOutcome {
    if !(0.0..=1.0).contains(&intensity) {
        return Err(SyscallFailure::einval("intensity must be in [0, 1]"));
    }
    let Some(process) = kernel.table.get_mut(pid) else {
        return Err(SyscallFailure::esrch(pid));
    };
    process.emotion.feel(&emotion, intensity);
    let view = serde_json::to_value(&process.emotion).unwrap_or(Value::Null);
    let applied = process.emotion.intensity;
    kernel.namespace.set_emotion(pid, view);

    Ok(SyscallReply::Felt {
        emotion,
        intensity: applied,
    })
}

fn remember(kernel: &mut Kernel, key: String, value: Value, importance: f64) -> SyscallOutcome {
    if key.is_empty() {
        return Err(SyscallFailure::einval("memory key must not be empty"));
    }
    if !(0.0..=1.0).contains(&importance) {
        return Err(SyscallFailure::einval("importance must be in [0, 1]"));
    }
    let metadata: BTreeMap<String, Value> = [("value".to_string(), value)].into_iter().collect();
    let atom = kernel
        .memory
        .add_node(
            "ConceptNode",
            &key,
            Some(TruthValue::new(importance, MEMORY_CONFIDENCE)),
            Some(importance),
            Some(metadata),
        )
        .map_err(store_failure)?;

    Ok(SyscallReply::Remembered { atom })
}

fn forget(kernel: &mut Kernel, key: String, threshold: f64) -> SyscallOutcome {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(SyscallFailure::einval("threshold must be in [0, 1]"));
    }
    let Some(atom) = kernel.memory.store().get_node("ConceptNode", &key) else {
        return Err(SyscallFailure::enoent(format!("no memory named '{key}'")));
    };
    let id = atom.id;
    let attention = atom.attention;

    // Strictly below the threshold forgets; at or above it merely fades.
    let (forgotten, next) = if attention < threshold {
        (true, 0.0)
    } else {
        (false, attention / 2.0)
    };
    kernel.memory.set_attention(&id, next).map_err(store_failure)?;

    Ok(SyscallReply::Forgot {
        forgotten,
        attention: next,
    })
}

fn attend(kernel: &mut Kernel, pid: Pid, target: String, spread_factor: f64) -> SyscallOutcome {
    if !(0.0..=1.0).contains(&spread_factor) {
        return Err(SyscallFailure::einval("spread factor must be in [0, 1]"));
    }
    let Some(atom) = kernel.memory.store().get_node("ConceptNode", &target) else {
        return Err(SyscallFailure::enoent(format!("no concept named '{target}'")));
    };
    let id = atom.id;

    kernel.memory.set_attention(&id, 1.0).map_err(store_failure)?;
    kernel
        .memory
        .spread_attention(&id, spread_factor, ATTEND_SPREAD_DEPTH)
        .map_err(store_failure)?;
    if let Some(process) = kernel.table.get_mut(pid) {
        process.attention_focus = Some(id);
    }

    Ok(SyscallReply::Attended { target: id })
}

fn spawn_agent(kernel: &mut Kernel, pid: Pid, config: ProcessConfig) -> SyscallOutcome {
    let child = kernel.spawn(pid, config);
    let summary = kernel
        .table
        .get(child)
        .map(|p| p.summary())
        .expect("freshly spawned process");
    debug!(parent = pid, child, "agent spawned");

    Ok(SyscallReply::Spawned { pid: child, summary })
}

fn query_knowledge(kernel: &mut Kernel, pattern: Pattern) -> SyscallOutcome {
    kernel.knowledge_queries += 1;
    let matches = kernel.memory.distributed_query(&pattern);
    Ok(SyscallReply::Knowledge { matches })
}

fn spread_activation(kernel: &mut Kernel, source: String, strength: f64) -> SyscallOutcome {
    if !(0.0..=1.0).contains(&strength) {
        return Err(SyscallFailure::einval("strength must be in [0, 1]"));
    }
    let Some(atom) = kernel.memory.store().get_node("ConceptNode", &source) else {
        return Err(SyscallFailure::enoent(format!("no concept named '{source}'")));
    };
    let id = atom.id;
    kernel
        .memory
        .spread_attention(&id, strength, ACTIVATION_SPREAD_DEPTH)
        .map_err(store_failure)?;

    Ok(SyscallReply::Activated { source: id })
}

fn shift_consciousness(kernel: &mut Kernel, pid: Pid, level: u8) -> SyscallOutcome {
    if level > crate::process::MAX_CONSCIOUSNESS_LEVEL {
        return Err(SyscallFailure::einval("consciousness level must be in 0..=3"));
    }
    let Some(process) = kernel.table.get_mut(pid) else {
        return Err(SyscallFailure::esrch(pid));
    };
    process.consciousness_level = level;
    kernel.namespace.set_consciousness(pid, json!({ "level": level }));

    Ok(SyscallReply::Shifted { level })
}

fn allocate_cognitive(kernel: &mut Kernel, pid: Pid, size: u64, resource_type: String) -> SyscallOutcome {
    if size == 0 {
        return Err(SyscallFailure::einval("region size must be positive"));
    }
    let resource_id = format!("res_{:016x}", kernel.random.next_u64(u64::MAX));
    kernel.namespace.insert_region(
        resource_id.clone(),
        MemoryRegion {
            owner: pid,
            size,
            region_type: resource_type,
            allocated_at: kernel.clock.now(),
        },
    );

    Ok(SyscallReply::Allocated { resource_id })
}

fn free_cognitive(kernel: &mut Kernel, resource_id: String) -> SyscallOutcome {
    if kernel.namespace.remove_region(&resource_id) {
        Ok(SyscallReply::Freed)
    } else {
        Err(SyscallFailure::enoent(format!(
            "no cognitive region '{resource_id}'"
        )))
    }
}

fn send_thought(kernel: &mut Kernel, pid: Pid, target: Pid, thought: Value) -> SyscallOutcome {
    let timestamp = kernel.clock.now();
    let Some(receiver) = kernel.table.get_mut(target) else {
        return Err(SyscallFailure::esrch(target));
    };
    receiver.deliver(ThoughtMessage {
        from: pid,
        payload: thought,
        timestamp,
    });
    if let Some(sender) = kernel.table.get_mut(pid) {
        sender.stats.messages_sent += 1;
    }

    Ok(SyscallReply::Delivered { target })
}

fn receive_thought(kernel: &mut Kernel, pid: Pid, blocking: bool) -> SyscallOutcome {
    if blocking {
        // No suspension mechanism exists inside a syscall; drivers that
        // need to wait should yield and retry.
        return Err(SyscallFailure::einval(
            "blocking receive is not supported under cooperative scheduling",
        ));
    }
    let Some(process) = kernel.table.get_mut(pid) else {
        return Err(SyscallFailure::esrch(pid));
    };
    let message = process.receive();

    Ok(SyscallReply::Received { message })
}

/// Map store rejections onto the errno taxonomy.
fn store_failure(err: StoreError) -> SyscallFailure {
    match err {
        StoreError::NotFound(id) => SyscallFailure::enoent(format!("no atom {id}")),
        other => SyscallFailure::einval(other.to_string()),
    }
}

// ============================================================================
// TESTS
// ============================================================================
