//! # Noesis Kernel
//!
//! A single-process cognitive kernel: a userspace executive that
//! multiplexes lightweight cognitive processes, dispatches a closed set of
//! fourteen cognitive system calls, and mediates a shared, versioned
//! hypergraph memory (see `noesis-core`).
//!
//! The executive is **single-threaded cooperative**. At most one process
//! is running; a syscall runs to completion; suspension happens only at
//! explicit block/yield or when the time quantum expires at the next
//! election. Neural inference is never performed here - reservoirs,
//! inference orchestrators, and emotion processors are external
//! collaborators reached through the syscall surface, the namespace, and
//! the `PersonalityProvider` contract.
//!
//! ## Layers
//!
//! - [`process`]: `CognitiveProcess` records and the PID-allocating table
//! - [`sched`]: ready/blocked queues and consciousness-aware election
//! - [`syscall`]: the closed syscall alphabet and its dispatcher
//! - [`namespace`]: read-only hierarchical views (`/proc`, `/cognitive`, ...)
//! - [`kernel`]: the one owner that wires everything together
//!
//! ## Quick Start
//!
//! ```rust
//! use noesis_kernel::{Kernel, KernelConfig, Syscall, SyscallReply, KERNEL_PID};
//!
//! let mut kernel = Kernel::new(KernelConfig::default());
//!
//! // Bootstrap an agent and let it think.
//! let reply = kernel.syscall(KERNEL_PID, Syscall::SpawnAgent { config: Default::default() })?;
//! let SyscallReply::Spawned { pid, .. } = reply else { unreachable!() };
//!
//! kernel.syscall(pid, Syscall::Think {
//!     input: "what am I?".into(),
//!     context: serde_json::Value::Null,
//! })?;
//!
//! assert_eq!(kernel.schedule(), Some(pid));
//! # Ok::<(), noesis_kernel::SyscallFailure>(())
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod config;
pub mod kernel;
pub mod namespace;
pub mod personality;
pub mod process;
pub mod sched;
pub mod syscall;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Kernel surface
pub use config::KernelConfig;
pub use kernel::{Kernel, KernelStats, KERNEL_PID};

// Processes
pub use process::{
    CognitiveProcess, EmotionState, Pid, ProcessConfig, ProcessState, ProcessStats,
    ProcessSummary, ProcessTable, ThoughtMessage, WorkingMemoryItem,
};

// Scheduling
pub use sched::{BlockedEntry, SchedPolicy, Scheduler, SchedulerStats};

// Syscalls
pub use syscall::{Errno, Syscall, SyscallFailure, SyscallOutcome, SyscallReply};

// Namespace
pub use namespace::{MemoryRegion, Namespace, NsEntry, NsLookup, ROOTS};

// Collaborator contract
pub use personality::{PersonalityProvider, TraitProfile};

// Re-export the memory engine for drivers that introspect the hypergraph.
pub use noesis_core;

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of operations in the closed syscall alphabet.
pub const SYSCALL_COUNT: usize = Syscall::NAMES.len();

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        EmotionState, Errno, Kernel, KernelConfig, KernelStats, Pid, ProcessConfig, ProcessState,
        ProcessSummary, SchedPolicy, Syscall, SyscallFailure, SyscallOutcome, SyscallReply,
        KERNEL_PID,
    };
    pub use noesis_core::{AtomStore, Pattern, QueryMatch, TruthValue};
}
