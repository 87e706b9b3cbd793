//! # Cognitive Processes
//!
//! Process records and their owning table. A process is data, not a
//! thread: the scheduler elects one at a time and the driver advances it
//! through syscalls and cooperative cycles. Termination retires the PID
//! permanently - the table's counter never runs backward.

pub mod proc;
pub mod table;

pub use proc::{
    CognitiveProcess, EmotionState, Pid, ProcessConfig, ProcessState, ProcessStats,
    ProcessSummary, ThoughtMessage, WorkingMemoryItem, DEFAULT_CONSCIOUSNESS_LEVEL,
    DEFAULT_PRIORITY, DEFAULT_WORKING_MEMORY_CAPACITY, DEFAULT_WORKING_MEMORY_RETENTION_SECS,
    INTENSITY_DECAY, MAX_CONSCIOUSNESS_LEVEL, MAX_PRIORITY, VALENCE_DECAY,
};
pub use table::ProcessTable;
