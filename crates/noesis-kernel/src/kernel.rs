//! The kernel - one struct that owns every subsystem
//!
//! Construction wires the process table, scheduler, namespace, and the
//! replicated hypergraph from a [`KernelConfig`] plus collaborator
//! handles. There is no ambient global: drivers hold an explicit kernel
//! handle and reach state only through syscalls, the namespace, and the
//! read accessors here. Control flow is strictly top-down - the kernel
//! calls into its subsystems, never the reverse.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use noesis_core::{
    AppliedBatch, AtomStore, Clock, NullTransport, PendingOp, Random, Replicator,
    ReplicationStats, StoreStats, SyncOutcome, SystemClock, ThreadRandom, Transport,
};

use crate::config::KernelConfig;
use crate::namespace::{Namespace, NsLookup};
use crate::personality::PersonalityProvider;
use crate::process::{Pid, ProcessConfig, ProcessSummary, ProcessTable};
use crate::sched::{Scheduler, SchedulerStats};
use crate::syscall::{dispatcher, Syscall, SyscallOutcome};

/// The kernel's own identity as a syscall caller. Drivers use it to
/// bootstrap the first agents; it has no process record.
pub const KERNEL_PID: Pid = 0;

// ============================================================================
// KERNEL
// ============================================================================

/// The cognitive kernel: process table, scheduler, syscall dispatch,
/// namespace, and the replicated hypergraph, under one owner.
pub struct Kernel {
    pub(crate) config: KernelConfig,
    pub(crate) table: ProcessTable,
    pub(crate) sched: Scheduler,
    pub(crate) memory: Replicator,
    pub(crate) namespace: Namespace,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) random: Arc<dyn Random>,
    pub(crate) personality: Option<Arc<dyn PersonalityProvider>>,
    pub(crate) syscall_count: u64,
    pub(crate) knowledge_queries: u64,
    started_at: DateTime<Utc>,
}

impl Kernel {
    /// A kernel with production collaborators: system clock, thread
    /// randomness, and a transport that delivers nowhere.
    pub fn new(config: KernelConfig) -> Self {
        Self::with_collaborators(
            config,
            Arc::new(NullTransport),
            Arc::new(SystemClock),
            Arc::new(ThreadRandom),
        )
    }

    /// A kernel with explicit collaborator handles (tests inject a manual
    /// clock, seeded randomness, and a recording transport here).
    pub fn with_collaborators(
        config: KernelConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        random: Arc<dyn Random>,
    ) -> Self {
        let store = AtomStore::with_config(
            config.atom_capacity,
            config.attention_decay_rate,
            clock.clone(),
        );
        let mut memory = Replicator::new(
            config.node_id.clone(),
            store,
            transport,
            clock.clone(),
            config.sync_interval,
        );
        for (peer_id, address) in &config.peers {
            memory.add_peer(peer_id.clone(), address.clone());
        }

        info!(
            node = %config.node_id,
            policy = %config.policy,
            peers = config.peers.len(),
            "kernel constructed"
        );

        let started_at = clock.now();
        Self {
            table: ProcessTable::with_working_memory_capacity(config.working_memory_capacity),
            sched: Scheduler::new(config.policy, config.time_quantum, random.clone()),
            memory,
            namespace: Namespace::new(),
            clock,
            random,
            personality: None,
            syscall_count: 0,
            knowledge_queries: 0,
            started_at,
            config,
        }
    }

    /// Attach a personality provider. The kernel only ever reads it.
    pub fn with_personality(mut self, provider: Arc<dyn PersonalityProvider>) -> Self {
        self.personality = Some(provider);
        self
    }

    // ========================================================================
    // SYSCALL SURFACE
    // ========================================================================

    /// Dispatch a cognitive syscall on behalf of a process.
    pub fn syscall(&mut self, pid: Pid, call: Syscall) -> SyscallOutcome {
        dispatcher::dispatch(self, pid, call)
    }

    /// Loose entry point for dynamic drivers: dispatch by syscall name
    /// with JSON arguments. Unknown names fail `ENOSYS` here and only
    /// here.
    pub fn dispatch_raw(&mut self, pid: Pid, name: &str, args: serde_json::Value) -> SyscallOutcome {
        match Syscall::from_raw(name, args) {
            Ok(call) => self.syscall(pid, call),
            Err(failure) => {
                // A malformed call is still a call.
                self.syscall_count += 1;
                if let Some(process) = self.table.get_mut(pid) {
                    process.stats.syscalls += 1;
                }
                debug!(pid, name, errno = %failure.errno, "raw dispatch rejected");
                Err(failure)
            }
        }
    }

    // ========================================================================
    // PROCESS MANAGEMENT
    // ========================================================================

    /// Spawn a process and enqueue it. Used by the `spawn_agent` handler
    /// and by drivers bootstrapping their first agents.
    pub fn spawn(&mut self, parent: Pid, config: ProcessConfig) -> Pid {
        let now = self.clock.now();
        let pid = self.table.allocate(parent, config, now);
        self.namespace.register_agent(pid);
        self.sched.enqueue(&mut self.table, pid, now);
        pid
    }

    /// Terminate a single process: table record, queue positions, and
    /// every namespace entry keyed by the PID. Children are untouched -
    /// cascading is the agent driver's decision.
    pub fn kill(&mut self, pid: Pid) -> bool {
        let existed = self.table.kill(pid);
        if existed {
            self.sched.remove(pid);
            self.namespace.remove_pid(pid);
            info!(pid, "process killed");
        }
        existed
    }

    /// Live process summaries, in PID order.
    pub fn ps(&self) -> Vec<ProcessSummary> {
        self.table.list()
    }

    /// Elect the next running process.
    pub fn schedule(&mut self) -> Option<Pid> {
        let now = self.clock.now();
        self.sched.schedule(&mut self.table, now)
    }

    /// Elect and then cycle the elected process (drain mailbox into
    /// working memory, decay emotion, prune stale items).
    pub fn run_cycle(&mut self) -> Option<Pid> {
        let pid = self.schedule()?;
        let now = self.clock.now();
        let retention = chrono::Duration::from_std(self.config.working_memory_retention)
            .unwrap_or_else(|_| chrono::Duration::seconds(300));
        if let Some(process) = self.table.get_mut(pid) {
            process.cycle(now, retention);
        }
        Some(pid)
    }

    /// Block a process until an explicit [`Kernel::unblock`].
    pub fn block(&mut self, pid: Pid, reason: &str) {
        let now = self.clock.now();
        self.sched.block(&mut self.table, pid, reason, now);
    }

    /// Release a blocked process back to the ready queue.
    pub fn unblock(&mut self, pid: Pid) {
        let now = self.clock.now();
        self.sched.unblock(&mut self.table, pid, now);
    }

    /// The running process volunteers the rest of its quantum.
    pub fn yield_now(&mut self) {
        let now = self.clock.now();
        self.sched.yield_now(&mut self.table, now);
    }

    /// Change a process's priority (clamped to 0..=10).
    pub fn set_priority(&mut self, pid: Pid, priority: u8) {
        self.sched.set_priority(&mut self.table, pid, priority);
    }

    // ========================================================================
    // NAMESPACE AND MEMORY
    // ========================================================================

    /// Resolve a namespace path.
    pub fn open(&self, path: &str) -> NsLookup {
        self.namespace.resolve(&self.table, path)
    }

    /// Read access to the hypergraph (introspection; mutations go through
    /// syscalls).
    pub fn store(&self) -> &AtomStore {
        self.memory.store()
    }

    /// The replication layer.
    pub fn replicator(&self) -> &Replicator {
        &self.memory
    }

    /// Run one attention-decay pass over every atom.
    pub fn decay_attention(&mut self) {
        self.memory.decay_attention();
    }

    /// Record a failure of purposeful completion (replicated).
    pub fn record_entelechy_failure(
        &mut self,
        description: &str,
        severity: f64,
    ) -> Result<uuid::Uuid, noesis_core::StoreError> {
        self.memory.record_entelechy_failure(description, severity)
    }

    /// Record a transcendent insight (replicated).
    pub fn record_transcendence(
        &mut self,
        concept: &str,
        insight: &str,
    ) -> Result<uuid::Uuid, noesis_core::StoreError> {
        self.memory.record_transcendence(concept, insight)
    }

    /// Drain pending replication ops toward peers (interval-gated).
    pub fn sync(&mut self) -> SyncOutcome {
        self.memory.sync()
    }

    /// Replay a batch of remote mutations.
    pub fn apply_remote_ops(&mut self, source: &str, ops: &[PendingOp]) -> AppliedBatch {
        self.memory.apply_remote_ops(source, ops)
    }

    /// The attached personality provider, if any.
    pub fn personality(&self) -> Option<&Arc<dyn PersonalityProvider>> {
        self.personality.as_ref()
    }

    /// The construction-time configuration.
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Kernel-wide counters and subsystem stats.
    pub fn stats(&self) -> KernelStats {
        KernelStats {
            node_id: self.config.node_id.clone(),
            uptime_seconds: (self.clock.now() - self.started_at).num_seconds(),
            syscalls: self.syscall_count,
            knowledge_queries: self.knowledge_queries,
            live_processes: self.table.live_count(),
            processes_allocated: self.table.allocated_count(),
            store: self.memory.store().stats(),
            scheduler: self.sched.stats(),
            replication: self.memory.stats(),
        }
    }
}

/// A point-in-time view of kernel counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelStats {
    /// Cluster identity
    pub node_id: String,
    /// Seconds since construction
    pub uptime_seconds: i64,
    /// Syscalls dispatched (failures included)
    pub syscalls: u64,
    /// Knowledge queries served
    pub knowledge_queries: u64,
    /// Live processes
    pub live_processes: usize,
    /// PIDs ever allocated
    pub processes_allocated: u64,
    /// Hypergraph stats
    pub store: StoreStats,
    /// Scheduler stats
    pub scheduler: SchedulerStats,
    /// Replication stats
    pub replication: ReplicationStats,
}

// ============================================================================
// TESTS
// ============================================================================
