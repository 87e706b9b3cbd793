//! # Consciousness-Aware Scheduler
//!
//! Cooperative election of cognitive processes. Two logical queues, ready
//! and blocked; a process sits in at most one. Three policies, chosen at
//! construction:
//!
//! - `round_robin`: FIFO
//! - `priority`: ascending priority number, stable on insertion order
//! - `consciousness_aware` (default): every ready process is scored on
//!   each election; the highest score wins
//!
//! The consciousness-aware score starts at `(10 - priority) * 10` and is
//! multiplied, in order, by the consciousness weight, the arousal factor
//! `1 + 0.5 * arousal`, a flat `1.3` when an attention focus is set, and a
//! starvation factor `1 + wait/100` once a process has waited more than
//! ten seconds. Ties fall to the oldest wait, then to the injected
//! [`Random`].
//!
//! There are no timeouts: a blocked process stays blocked until an
//! explicit unblock, and kill is the only unilateral terminator. The
//! scheduler itself never errors - dead PIDs are silently filtered as the
//! queues drain.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace};

use noesis_core::Random;

use crate::process::{Pid, ProcessState, ProcessTable};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Default cooperative time quantum.
pub const DEFAULT_TIME_QUANTUM_MS: i64 = 100;

/// Waits longer than this earn the starvation factor.
const STARVATION_THRESHOLD_SECS: f64 = 10.0;

/// Score multiplier per consciousness level.
fn consciousness_weight(level: u8) -> f64 {
    match level {
        0 => 1.0,
        1 => 1.5,
        2 => 2.0,
        _ => 3.0,
    }
}

// ============================================================================
// POLICY
// ============================================================================

/// Election policy, fixed at scheduler construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedPolicy {
    /// FIFO over the ready queue
    RoundRobin,
    /// Ascending priority number, stable with respect to insertion order
    Priority,
    /// Scored single pass over the ready queue
    #[default]
    ConsciousnessAware,
}

impl SchedPolicy {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedPolicy::RoundRobin => "round_robin",
            SchedPolicy::Priority => "priority",
            SchedPolicy::ConsciousnessAware => "consciousness_aware",
        }
    }

    /// Parse from string name.
    pub fn parse_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "round_robin" => SchedPolicy::RoundRobin,
            "priority" => SchedPolicy::Priority,
            _ => SchedPolicy::ConsciousnessAware,
        }
    }
}

impl std::fmt::Display for SchedPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// QUEUE ENTRIES AND STATS
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct ReadyEntry {
    pid: Pid,
    enqueued_at: DateTime<Utc>,
}

/// Why and since when a process is blocked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedEntry {
    /// Human-readable wait reason
    pub reason: String,
    /// When the block began
    pub since: DateTime<Utc>,
}

/// Election counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStats {
    /// Elections that produced a running process
    pub elections: u64,
    /// Elections with an empty ready queue
    pub idle_elections: u64,
    /// Quantum-expiry preemptions
    pub preemptions: u64,
    /// Voluntary yields
    pub yields: u64,
}

// ============================================================================
// SCHEDULER
// ============================================================================

/// The cooperative scheduler. Owns queue positions only; process records
/// stay in the table.
pub struct Scheduler {
    policy: SchedPolicy,
    ready: VecDeque<ReadyEntry>,
    blocked: BTreeMap<Pid, BlockedEntry>,
    current: Option<Pid>,
    last_switch: Option<DateTime<Utc>>,
    quantum: Duration,
    random: Arc<dyn Random>,
    stats: SchedulerStats,
}

impl Scheduler {
    /// Create a scheduler with the given policy, quantum, and randomness.
    pub fn new(policy: SchedPolicy, quantum: std::time::Duration, random: Arc<dyn Random>) -> Self {
        Self {
            policy,
            ready: VecDeque::new(),
            blocked: BTreeMap::new(),
            current: None,
            last_switch: None,
            quantum: Duration::from_std(quantum)
                .unwrap_or(Duration::milliseconds(DEFAULT_TIME_QUANTUM_MS)),
            random,
            stats: SchedulerStats::default(),
        }
    }

    // ========================================================================
    // QUEUE OPERATIONS
    // ========================================================================

    /// Put a process on the ready queue. Terminated PIDs and processes
    /// already queued, blocked, or running are ignored.
    pub fn enqueue(&mut self, table: &mut ProcessTable, pid: Pid, now: DateTime<Utc>) {
        if self.current == Some(pid)
            || self.blocked.contains_key(&pid)
            || self.ready.iter().any(|e| e.pid == pid)
        {
            return;
        }
        let Some(process) = table.get_mut(pid) else {
            trace!(pid, "enqueue of dead pid ignored");
            return;
        };
        process.state = ProcessState::Ready;
        self.ready.push_back(ReadyEntry { pid, enqueued_at: now });
    }

    /// Remove and return the next PID per policy. Dead entries are
    /// silently dropped on the way.
    pub fn dequeue(&mut self, table: &ProcessTable, now: DateTime<Utc>) -> Option<Pid> {
        self.ready.retain(|e| table.get(e.pid).is_some());
        if self.ready.is_empty() {
            return None;
        }

        let index = match self.policy {
            SchedPolicy::RoundRobin => 0,
            SchedPolicy::Priority => {
                let mut best = 0;
                let mut best_priority = u8::MAX;
                for (i, entry) in self.ready.iter().enumerate() {
                    let priority = table.get(entry.pid).map(|p| p.priority).unwrap_or(u8::MAX);
                    if priority < best_priority {
                        best_priority = priority;
                        best = i;
                    }
                }
                best
            }
            SchedPolicy::ConsciousnessAware => self.select_by_score(table, now),
        };

        self.ready.remove(index).map(|e| e.pid)
    }

    /// One scored pass over the ready queue. Highest score wins; ties go
    /// to the oldest wait, then to a uniform draw.
    fn select_by_score(&self, table: &ProcessTable, now: DateTime<Utc>) -> usize {
        let mut tied: Vec<usize> = Vec::new();
        let mut best_score = f64::NEG_INFINITY;
        let mut best_waited = f64::NEG_INFINITY;

        for (i, entry) in self.ready.iter().enumerate() {
            let Some(process) = table.get(entry.pid) else {
                continue;
            };
            let waited = (now - entry.enqueued_at).num_milliseconds() as f64 / 1000.0;
            let score = Self::score(
                process.priority,
                process.consciousness_level,
                process.emotion.arousal,
                process.attention_focus.is_some(),
                waited,
            );
            trace!(pid = entry.pid, score, waited, "scored");

            if score > best_score {
                best_score = score;
                best_waited = waited;
                tied = vec![i];
            } else if score == best_score {
                if waited > best_waited {
                    best_waited = waited;
                    tied = vec![i];
                } else if waited == best_waited {
                    tied.push(i);
                }
            }
        }

        if tied.len() > 1 {
            tied[self.random.next_u64(tied.len() as u64) as usize]
        } else {
            tied.first().copied().unwrap_or(0)
        }
    }

    /// The consciousness-aware scoring function. All multipliers apply
    /// unconditionally in this order; the result is always positive.
    pub fn score(priority: u8, level: u8, arousal: f64, has_focus: bool, waited_secs: f64) -> f64 {
        let mut score = (10.0 - priority as f64) * 10.0;
        score *= consciousness_weight(level);
        score *= 1.0 + 0.5 * arousal;
        if has_focus {
            score *= 1.3;
        }
        if waited_secs > STARVATION_THRESHOLD_SECS {
            score *= 1.0 + waited_secs / 100.0;
        }
        score.max(f64::MIN_POSITIVE)
    }

    // ========================================================================
    // ELECTION
    // ========================================================================

    /// Elect the next running process.
    ///
    /// While the quantum has not elapsed the incumbent keeps running.
    /// Otherwise the incumbent goes back to the ready tail and the next
    /// process per policy is marked running and stamped. Returns nothing
    /// when no ready process exists.
    pub fn schedule(&mut self, table: &mut ProcessTable, now: DateTime<Utc>) -> Option<Pid> {
        if let Some(pid) = self.current {
            let still_running = table
                .get(pid)
                .map(|p| p.state == ProcessState::Running)
                .unwrap_or(false);
            if still_running {
                if let Some(since) = self.last_switch {
                    if now - since < self.quantum {
                        return Some(pid);
                    }
                }
            } else {
                // Killed or externally transitioned; drop the stale claim.
                self.current = None;
            }
        }

        if let Some(pid) = self.current.take() {
            self.accrue_cpu(table, pid, now);
            self.stats.preemptions += 1;
            self.enqueue(table, pid, now);
        }

        let Some(next) = self.dequeue(table, now) else {
            self.stats.idle_elections += 1;
            return None;
        };

        if let Some(process) = table.get_mut(next) {
            process.state = ProcessState::Running;
            process.last_scheduled = Some(now);
        }
        self.current = Some(next);
        self.last_switch = Some(now);
        self.stats.elections += 1;
        debug!(pid = next, "elected");
        Some(next)
    }

    /// Move a process to the blocked queue with a reason.
    pub fn block(&mut self, table: &mut ProcessTable, pid: Pid, reason: &str, now: DateTime<Utc>) {
        self.ready.retain(|e| e.pid != pid);
        if self.current == Some(pid) {
            self.accrue_cpu(table, pid, now);
            self.current = None;
        }
        if let Some(process) = table.get_mut(pid) {
            process.state = ProcessState::Blocked;
            self.blocked.insert(
                pid,
                BlockedEntry {
                    reason: reason.to_string(),
                    since: now,
                },
            );
            debug!(pid, reason, "blocked");
        }
    }

    /// Release a blocked process back to the ready queue. A killed
    /// process cannot be unblocked - its entry just evaporates.
    pub fn unblock(&mut self, table: &mut ProcessTable, pid: Pid, now: DateTime<Utc>) {
        if self.blocked.remove(&pid).is_some() {
            self.enqueue(table, pid, now);
        }
    }

    /// The running process volunteers the rest of its quantum and goes to
    /// the ready tail.
    pub fn yield_now(&mut self, table: &mut ProcessTable, now: DateTime<Utc>) {
        if let Some(pid) = self.current.take() {
            self.accrue_cpu(table, pid, now);
            self.stats.yields += 1;
            self.enqueue(table, pid, now);
        }
    }

    /// Change a process's priority, clamped to 0..=10.
    pub fn set_priority(&mut self, table: &mut ProcessTable, pid: Pid, priority: u8) {
        if let Some(process) = table.get_mut(pid) {
            process.priority = priority.min(crate::process::MAX_PRIORITY);
        }
    }

    /// Forget a PID entirely (kill path): queue entries, block entry, and
    /// any running claim.
    pub fn remove(&mut self, pid: Pid) {
        self.ready.retain(|e| e.pid != pid);
        self.blocked.remove(&pid);
        if self.current == Some(pid) {
            self.current = None;
        }
    }

    fn accrue_cpu(&self, table: &mut ProcessTable, pid: Pid, now: DateTime<Utc>) {
        if let (Some(process), Some(since)) = (table.get_mut(pid), self.last_switch) {
            process.cpu_time += now - since;
        }
    }

    // ========================================================================
    // INTROSPECTION
    // ========================================================================

    /// The currently elected process, if any.
    pub fn current(&self) -> Option<Pid> {
        self.current
    }

    /// The configured policy.
    pub fn policy(&self) -> SchedPolicy {
        self.policy
    }

    /// Ready-queue length (dead entries may still be pending filtration).
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Blocked processes and their reasons.
    pub fn blocked(&self) -> &BTreeMap<Pid, BlockedEntry> {
        &self.blocked
    }

    /// Election counters.
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }
}

// ============================================================================
// TESTS
// ============================================================================
