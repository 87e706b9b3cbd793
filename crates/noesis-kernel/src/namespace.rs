//! Namespace - read-only hierarchical views over kernel state
//!
//! A `/`-separated directory in the spirit of procfs. Some roots resolve
//! live against the process table (`/proc`, `/agents`); others are
//! materialized synchronously by the syscall handlers that cause them
//! (`/emotion`, `/consciousness`, `/memory`). Lookups never mutate; a
//! missing path resolves to a reasoned miss instead of an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::process::{Pid, ProcessSummary, ProcessTable};
use crate::syscall::Syscall;

// ============================================================================
// ENTRIES
// ============================================================================

/// The guaranteed namespace roots.
pub const ROOTS: [&str; 8] = [
    "proc",
    "cognitive",
    "atomspace",
    "agents",
    "memory",
    "consciousness",
    "emotion",
    "reservoir",
];

/// A cognitive resource region under `/memory`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRegion {
    /// Owning process
    pub owner: Pid,
    /// Region size (abstract units)
    pub size: u64,
    /// Free-form region type
    pub region_type: String,
    /// When the region was allocated
    pub allocated_at: DateTime<Utc>,
}

/// A successfully resolved namespace entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NsEntry {
    /// A directory listing of child segment names.
    Directory {
        /// Child names, sorted
        entries: Vec<String>,
    },
    /// A live process summary (`/proc/<pid>`, `/agents/<pid>`).
    Process {
        /// The summary
        summary: ProcessSummary,
    },
    /// A handle naming a syscall (`/cognitive/<name>`).
    SyscallHandle {
        /// The syscall name
        name: String,
    },
    /// The hypergraph store itself (`/atomspace`). Introspection only -
    /// mutations still go through syscalls.
    Atomspace,
    /// A JSON view (`/emotion/<pid>`, `/consciousness/<pid>`, `/reservoir/...`).
    View {
        /// The value
        value: Value,
    },
    /// A cognitive resource region (`/memory/<id>`).
    Memory {
        /// The region record
        region: MemoryRegion,
    },
}

/// The outcome of a namespace lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum NsLookup {
    /// The path resolved.
    Found {
        /// The entry
        entry: NsEntry,
    },
    /// The path did not resolve; a null handle with a reason.
    Missing {
        /// Human-readable reason
        reason: String,
    },
}

impl NsLookup {
    fn missing(reason: impl Into<String>) -> Self {
        NsLookup::Missing {
            reason: reason.into(),
        }
    }

    /// The entry, if the lookup succeeded.
    pub fn entry(&self) -> Option<&NsEntry> {
        match self {
            NsLookup::Found { entry } => Some(entry),
            NsLookup::Missing { .. } => None,
        }
    }

    /// Whether the lookup succeeded.
    pub fn is_found(&self) -> bool {
        matches!(self, NsLookup::Found { .. })
    }
}

// ============================================================================
// NAMESPACE
// ============================================================================

/// The kernel's namespace state. Handler-materialized views live here;
/// live views resolve against the table at lookup time.
#[derive(Debug, Default)]
pub struct Namespace {
    emotions: BTreeMap<Pid, Value>,
    consciousness: BTreeMap<Pid, Value>,
    regions: BTreeMap<String, MemoryRegion>,
    agents: BTreeSet<Pid>,
    reservoir: BTreeMap<String, Value>,
}

impl Namespace {
    /// An empty namespace with the guaranteed roots.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // HANDLER-SIDE WRITES (same handlers that cause the state)
    // ========================================================================

    /// Record a process's emotion view (`feel`).
    pub fn set_emotion(&mut self, pid: Pid, view: Value) {
        self.emotions.insert(pid, view);
    }

    /// Record a process's consciousness view (`shift_consciousness`).
    pub fn set_consciousness(&mut self, pid: Pid, view: Value) {
        self.consciousness.insert(pid, view);
    }

    /// Register a spawned agent (`spawn_agent`).
    pub fn register_agent(&mut self, pid: Pid) {
        self.agents.insert(pid);
    }

    /// Create a `/memory/<id>` region (`allocate_cognitive`).
    pub fn insert_region(&mut self, id: String, region: MemoryRegion) {
        self.regions.insert(id, region);
    }

    /// Remove a `/memory/<id>` region (`free_cognitive`). Returns whether
    /// it existed.
    pub fn remove_region(&mut self, id: &str) -> bool {
        self.regions.remove(id).is_some()
    }

    /// Whether a region exists.
    pub fn has_region(&self, id: &str) -> bool {
        self.regions.contains_key(id)
    }

    /// Publish a value under `/reservoir` (external collaborator surface).
    pub fn publish_reservoir(&mut self, key: impl Into<String>, value: Value) {
        self.reservoir.insert(key.into(), value);
    }

    /// Drop every entry keyed by a PID (kill path).
    pub fn remove_pid(&mut self, pid: Pid) {
        self.emotions.remove(&pid);
        self.consciousness.remove(&pid);
        self.agents.remove(&pid);
    }

    // ========================================================================
    // LOOKUP
    // ========================================================================

    /// Resolve a `/`-separated path against the namespace and the live
    /// process table.
    pub fn resolve(&self, table: &ProcessTable, path: &str) -> NsLookup {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => NsLookup::Found {
                entry: NsEntry::Directory {
                    entries: ROOTS.iter().map(|r| r.to_string()).collect(),
                },
            },
            ["proc"] => self.list_processes(table.list()),
            ["proc", pid] => self.resolve_process(table, pid),
            ["agents"] => self.list_processes(
                table
                    .list()
                    .into_iter()
                    .filter(|s| self.agents.contains(&s.pid))
                    .collect(),
            ),
            ["agents", pid] => match parse_pid(pid) {
                Some(pid) if self.agents.contains(&pid) => self.resolve_process(table, &pid.to_string()),
                Some(pid) => NsLookup::missing(format!("pid {pid} is not a registered agent")),
                None => NsLookup::missing(format!("'{pid}' is not a pid")),
            },
            ["cognitive"] => NsLookup::Found {
                entry: NsEntry::Directory {
                    entries: Syscall::NAMES.iter().map(|n| n.to_string()).collect(),
                },
            },
            ["cognitive", name] => {
                if Syscall::NAMES.contains(name) {
                    NsLookup::Found {
                        entry: NsEntry::SyscallHandle {
                            name: name.to_string(),
                        },
                    }
                } else {
                    NsLookup::missing(format!("no cognitive operation named '{name}'"))
                }
            }
            ["atomspace"] => NsLookup::Found {
                entry: NsEntry::Atomspace,
            },
            ["memory"] => NsLookup::Found {
                entry: NsEntry::Directory {
                    entries: self.regions.keys().cloned().collect(),
                },
            },
            ["memory", id] => match self.regions.get(*id) {
                Some(region) => NsLookup::Found {
                    entry: NsEntry::Memory {
                        region: region.clone(),
                    },
                },
                None => NsLookup::missing(format!("no cognitive region '{id}'")),
            },
            ["emotion"] => self.list_pids(self.emotions.keys()),
            ["emotion", pid] => self.resolve_view(&self.emotions, pid, "emotion"),
            ["consciousness"] => self.list_pids(self.consciousness.keys()),
            ["consciousness", pid] => self.resolve_view(&self.consciousness, pid, "consciousness"),
            ["reservoir"] => NsLookup::Found {
                entry: NsEntry::Directory {
                    entries: self.reservoir.keys().cloned().collect(),
                },
            },
            ["reservoir", key] => match self.reservoir.get(*key) {
                Some(value) => NsLookup::Found {
                    entry: NsEntry::View {
                        value: value.clone(),
                    },
                },
                None => NsLookup::missing(format!("nothing published at /reservoir/{key}")),
            },
            [root, ..] if !ROOTS.contains(root) => {
                NsLookup::missing(format!("no such root: /{root}"))
            }
            _ => NsLookup::missing(format!("path too deep: {path}")),
        }
    }

    fn list_processes(&self, summaries: Vec<ProcessSummary>) -> NsLookup {
        NsLookup::Found {
            entry: NsEntry::Directory {
                entries: summaries.iter().map(|s| s.pid.to_string()).collect(),
            },
        }
    }

    fn list_pids<'a>(&self, pids: impl Iterator<Item = &'a Pid>) -> NsLookup {
        NsLookup::Found {
            entry: NsEntry::Directory {
                entries: pids.map(|p| p.to_string()).collect(),
            },
        }
    }

    fn resolve_process(&self, table: &ProcessTable, segment: &str) -> NsLookup {
        match parse_pid(segment) {
            Some(pid) => match table.get(pid) {
                Some(process) => NsLookup::Found {
                    entry: NsEntry::Process {
                        summary: process.summary(),
                    },
                },
                None => NsLookup::missing(format!("no such process: {pid}")),
            },
            None => NsLookup::missing(format!("'{segment}' is not a pid")),
        }
    }

    fn resolve_view(&self, views: &BTreeMap<Pid, Value>, segment: &str, what: &str) -> NsLookup {
        match parse_pid(segment) {
            Some(pid) => match views.get(&pid) {
                Some(value) => NsLookup::Found {
                    entry: NsEntry::View {
                        value: value.clone(),
                    },
                },
                None => NsLookup::missing(format!("no {what} recorded for pid {pid}")),
            },
            None => NsLookup::missing(format!("'{segment}' is not a pid")),
        }
    }
}

fn parse_pid(segment: &str) -> Option<Pid> {
    segment.parse().ok()
}

// ============================================================================
// TESTS
// ============================================================================
