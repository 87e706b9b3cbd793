//! Process table - PID allocation and record ownership
//!
//! The table exclusively owns every [`CognitiveProcess`]. PIDs come from a
//! monotonic counter starting at 1 and are never recycled; terminated
//! records are retired in place so their PIDs stay burned, but they are
//! invisible through the public lookups.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::process::proc::{CognitiveProcess, Pid, ProcessConfig, ProcessSummary};

/// Owner of all cognitive process records.
pub struct ProcessTable {
    processes: std::collections::BTreeMap<Pid, CognitiveProcess>,
    next_pid: Pid,
    working_memory_capacity: usize,
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable {
    /// An empty table. The first allocation returns PID 1.
    pub fn new() -> Self {
        Self::with_working_memory_capacity(crate::process::proc::DEFAULT_WORKING_MEMORY_CAPACITY)
    }

    /// An empty table with a per-process working-memory bound.
    pub fn with_working_memory_capacity(capacity: usize) -> Self {
        Self {
            processes: std::collections::BTreeMap::new(),
            next_pid: 1,
            working_memory_capacity: capacity,
        }
    }

    /// Allocate a fresh process. PIDs are monotonic and never reused.
    pub fn allocate(&mut self, parent: Pid, config: ProcessConfig, now: DateTime<Utc>) -> Pid {
        let pid = self.next_pid;
        self.next_pid += 1;
        let process = CognitiveProcess::new(pid, parent, config, now)
            .with_working_memory_capacity(self.working_memory_capacity);
        debug!(pid, parent, name = %process.name, "process allocated");
        self.processes.insert(pid, process);
        pid
    }

    /// Fetch a live process. Terminated PIDs resolve to nothing, forever.
    pub fn get(&self, pid: Pid) -> Option<&CognitiveProcess> {
        self.processes.get(&pid).filter(|p| p.state.is_live())
    }

    /// Mutable fetch of a live process.
    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut CognitiveProcess> {
        self.processes.get_mut(&pid).filter(|p| p.state.is_live())
    }

    /// Terminate a process, clearing its mailbox and working memory.
    ///
    /// Returns whether a live process existed. Children are untouched;
    /// cascading is the caller's decision.
    pub fn kill(&mut self, pid: Pid) -> bool {
        match self.processes.get_mut(&pid) {
            Some(process) if process.state.is_live() => {
                process.terminate();
                debug!(pid, "process terminated");
                true
            }
            _ => false,
        }
    }

    /// Summaries of every live process, in PID order.
    pub fn list(&self) -> Vec<ProcessSummary> {
        self.iter_live().map(CognitiveProcess::summary).collect()
    }

    /// Live processes, in PID order.
    pub fn iter_live(&self) -> impl Iterator<Item = &CognitiveProcess> {
        self.processes.values().filter(|p| p.state.is_live())
    }

    /// Live PIDs whose parent is the given process, in PID order.
    pub fn children_of(&self, parent: Pid) -> Vec<Pid> {
        self.iter_live()
            .filter(|p| p.parent == parent)
            .map(|p| p.pid)
            .collect()
    }

    /// Number of live processes.
    pub fn live_count(&self) -> usize {
        self.iter_live().count()
    }

    /// Total PIDs ever allocated.
    pub fn allocated_count(&self) -> u64 {
        self.next_pid - 1
    }
}

// ============================================================================
// TESTS
// ============================================================================
