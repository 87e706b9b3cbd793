//! # Cognitive System Calls
//!
//! The closed alphabet of operations by which a process effects state.
//! Fourteen operations, no more: the public dispatcher is an exhaustive
//! match over the [`Syscall`] enum, so `ENOSYS` is unreachable there and
//! only produced by the loose, string-keyed entry point used by dynamic
//! drivers ([`Syscall::from_raw`]).
//!
//! Failures are data, not panics: every call returns a
//! [`SyscallOutcome`], and a failed call leaves the kernel exactly as it
//! was apart from the syscall counters.

pub mod dispatcher;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::process::{Pid, ProcessConfig, ProcessSummary, ThoughtMessage};
use noesis_core::{Pattern, QueryMatch};

// ============================================================================
// ERRNO
// ============================================================================

/// Error tags carried by failure records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Errno {
    /// No such process
    #[serde(rename = "ESRCH")]
    Esrch,
    /// Unknown syscall (loose entry point only)
    #[serde(rename = "ENOSYS")]
    Enosys,
    /// Bad argument
    #[serde(rename = "EINVAL")]
    Einval,
    /// Target not found
    #[serde(rename = "ENOENT")]
    Enoent,
}

impl Errno {
    /// Convert to the conventional tag string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Errno::Esrch => "ESRCH",
            Errno::Enosys => "ENOSYS",
            Errno::Einval => "EINVAL",
            Errno::Enoent => "ENOENT",
        }
    }
}

impl std::fmt::Display for Errno {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failed syscall: an errno tag plus a human-readable message.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{errno}: {message}")]
#[serde(rename_all = "camelCase")]
pub struct SyscallFailure {
    /// Error tag
    pub errno: Errno,
    /// What went wrong
    pub message: String,
}

impl SyscallFailure {
    /// No such process.
    pub fn esrch(pid: Pid) -> Self {
        Self {
            errno: Errno::Esrch,
            message: format!("no such process: {pid}"),
        }
    }

    /// Unknown syscall name.
    pub fn enosys(name: &str) -> Self {
        Self {
            errno: Errno::Enosys,
            message: format!("unknown syscall: {name}"),
        }
    }

    /// Bad argument.
    pub fn einval(message: impl Into<String>) -> Self {
        Self {
            errno: Errno::Einval,
            message: message.into(),
        }
    }

    /// Target not found.
    pub fn enoent(message: impl Into<String>) -> Self {
        Self {
            errno: Errno::Enoent,
            message: message.into(),
        }
    }
}

/// What every syscall returns.
pub type SyscallOutcome = Result<SyscallReply, SyscallFailure>;

// ============================================================================
// THE CLOSED SYSCALL ALPHABET
// ============================================================================

/// The fourteen cognitive system calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "syscall", rename_all = "snake_case")]
pub enum Syscall {
    /// Record a thought as a high-attention concept.
    Think {
        /// Arbitrary thought content
        input: Value,
        /// Arbitrary context, stored alongside
        #[serde(default)]
        context: Value,
    },
    /// Query inheritance between two named concepts.
    Reason {
        /// Premise concept name
        premise: String,
        /// Queried concept name
        query: String,
    },
    /// Update the caller's emotional state.
    Feel {
        /// Emotion label
        emotion: String,
        /// Intensity in `[0, 1]`
        intensity: f64,
    },
    /// Store a keyed memory with an importance weight.
    Remember {
        /// Memory key (concept name)
        key: String,
        /// Opaque value
        value: Value,
        /// Importance in `[0, 1]`; becomes truth strength and attention
        importance: f64,
    },
    /// Let a memory fade if its attention is below a threshold.
    Forget {
        /// Memory key
        key: String,
        /// Threshold in `[0, 1]`; strictly-below zeroes, otherwise halves
        threshold: f64,
    },
    /// Focus attention on a concept and spread it to neighbors.
    Attend {
        /// Concept name
        target: String,
        /// Spread factor in `[0, 1]`
        spread_factor: f64,
    },
    /// Spawn a child cognitive process.
    SpawnAgent {
        /// Child configuration
        #[serde(default)]
        config: ProcessConfig,
    },
    /// Declarative pattern query over the hypergraph.
    QueryKnowledge {
        /// The pattern
        pattern: Pattern,
    },
    /// Depth-3 attention spread from a named concept.
    SpreadActivation {
        /// Source concept name
        source: String,
        /// Spread strength in `[0, 1]`
        strength: f64,
    },
    /// Change the caller's consciousness level.
    ShiftConsciousness {
        /// Level in 0..=3
        level: u8,
    },
    /// Allocate a named cognitive resource region.
    AllocateCognitive {
        /// Region size (abstract units)
        size: u64,
        /// Free-form region type
        resource_type: String,
    },
    /// Release a cognitive resource region.
    FreeCognitive {
        /// Region id from allocation
        resource_id: String,
    },
    /// Deliver a thought to another process's mailbox.
    SendThought {
        /// Receiving process
        target: Pid,
        /// Opaque thought
        thought: Value,
    },
    /// Pop the caller's next inbound thought.
    ReceiveThought {
        /// Reserved; `true` is rejected with `EINVAL` - the cooperative
        /// model has no in-syscall suspension
        #[serde(default)]
        blocking: bool,
    },
}

impl Syscall {
    /// The canonical name of this syscall.
    pub fn name(&self) -> &'static str {
        match self {
            Syscall::Think { .. } => "think",
            Syscall::Reason { .. } => "reason",
            Syscall::Feel { .. } => "feel",
            Syscall::Remember { .. } => "remember",
            Syscall::Forget { .. } => "forget",
            Syscall::Attend { .. } => "attend",
            Syscall::SpawnAgent { .. } => "spawn_agent",
            Syscall::QueryKnowledge { .. } => "query_knowledge",
            Syscall::SpreadActivation { .. } => "spread_activation",
            Syscall::ShiftConsciousness { .. } => "shift_consciousness",
            Syscall::AllocateCognitive { .. } => "allocate_cognitive",
            Syscall::FreeCognitive { .. } => "free_cognitive",
            Syscall::SendThought { .. } => "send_thought",
            Syscall::ReceiveThought { .. } => "receive_thought",
        }
    }

    /// Every syscall name, for namespace listings.
    pub const NAMES: [&'static str; 14] = [
        "think",
        "reason",
        "feel",
        "remember",
        "forget",
        "attend",
        "spawn_agent",
        "query_knowledge",
        "spread_activation",
        "shift_consciousness",
        "allocate_cognitive",
        "free_cognitive",
        "send_thought",
        "receive_thought",
    ];

    /// Loose entry point: parse a string-keyed call with JSON arguments.
    ///
    /// Unknown names produce `ENOSYS`; malformed arguments produce
    /// `EINVAL`. This is the only place `ENOSYS` can arise.
    pub fn from_raw(name: &str, args: Value) -> Result<Syscall, SyscallFailure> {
        if !Self::NAMES.contains(&name) {
            return Err(SyscallFailure::enosys(name));
        }
        let mut tagged = match args {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            _ => return Err(SyscallFailure::einval("syscall arguments must be an object")),
        };
        tagged.insert("syscall".to_string(), Value::from(name));
        serde_json::from_value(Value::Object(tagged))
            .map_err(|e| SyscallFailure::einval(format!("invalid arguments for {name}: {e}")))
    }
}

// ============================================================================
// REPLIES
// ============================================================================

/// What a successful syscall returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "camelCase")]
pub enum SyscallReply {
    /// A thought atom was recorded.
    #[serde(rename_all = "camelCase")]
    Thought {
        /// The thought's atom id
        atom: Uuid,
        /// When it was recorded
        timestamp: DateTime<Utc>,
    },
    /// Inheritance matches for a reasoning query.
    Inferences {
        /// Matching links
        matches: Vec<QueryMatch>,
    },
    /// The emotion took hold.
    Felt {
        /// Label as applied
        emotion: String,
        /// Intensity as applied
        intensity: f64,
    },
    /// The memory was stored or refreshed.
    Remembered {
        /// The memory's atom id
        atom: Uuid,
    },
    /// Result of a forget attempt.
    #[serde(rename_all = "camelCase")]
    Forgot {
        /// Whether attention was zeroed
        forgotten: bool,
        /// Attention after the operation
        attention: f64,
    },
    /// Attention was focused and spread.
    Attended {
        /// The focused atom
        target: Uuid,
    },
    /// A child process exists.
    Spawned {
        /// Child pid
        pid: Pid,
        /// Child summary
        summary: ProcessSummary,
    },
    /// Knowledge query results.
    Knowledge {
        /// Matches with bindings
        matches: Vec<QueryMatch>,
    },
    /// Activation was spread.
    Activated {
        /// The source atom
        source: Uuid,
    },
    /// Consciousness level changed.
    Shifted {
        /// Level as applied
        level: u8,
    },
    /// A cognitive resource region exists.
    #[serde(rename_all = "camelCase")]
    Allocated {
        /// Region id under `/memory`
        resource_id: String,
    },
    /// The region was released.
    Freed,
    /// The thought was delivered.
    Delivered {
        /// Receiving pid
        target: Pid,
    },
    /// The next inbound thought, or nothing.
    Received {
        /// Popped message, `None` on an empty mailbox
        message: Option<ThoughtMessage>,
    },
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_tags() {
        assert_eq!(Errno::Esrch.as_str(), "ESRCH");
        assert_eq!(Errno::Enosys.to_string(), "ENOSYS");
        assert_eq!(serde_json::to_value(Errno::Einval).unwrap(), "EINVAL");
    }

    #[test]
    fn test_names_cover_the_alphabet() {
        assert_eq!(Syscall::NAMES.len(), 14);
        let think = Syscall::Think {
            input: Value::from("q"),
            context: Value::Null,
        };
        assert!(Syscall::NAMES.contains(&think.name()));
    }

    #[test]
    fn test_from_raw_parses_known_call() {
        let call = Syscall::from_raw(
            "feel",
            serde_json::json!({ "emotion": "joy", "intensity": 0.8 }),
        )
        .unwrap();
        assert!(matches!(call, Syscall::Feel { ref emotion, intensity }
            if emotion.as_str() == "joy" && intensity == 0.8));
    }

    #[test]
    fn test_from_raw_unknown_name_is_enosys() {
        let err = Syscall::from_raw("dream", Value::Null).unwrap_err();
        assert_eq!(err.errno, Errno::Enosys);
    }

    #[test]
    fn test_from_raw_bad_args_is_einval() {
        let err = Syscall::from_raw("feel", serde_json::json!({ "emotion": 3 })).unwrap_err();
        assert_eq!(err.errno, Errno::Einval);

        let err = Syscall::from_raw("feel", Value::from("nope")).unwrap_err();
        assert_eq!(err.errno, Errno::Einval);
    }

    #[test]
    fn test_from_raw_defaults_optional_fields() {
        let call = Syscall::from_raw("receive_thought", Value::Null).unwrap();
        assert!(matches!(call, Syscall::ReceiveThought { blocking: false }));

        let call = Syscall::from_raw("spawn_agent", serde_json::json!({})).unwrap();
        assert!(matches!(call, Syscall::SpawnAgent { .. }));
    }

    #[test]
    fn test_syscall_serde_round_trip() {
        let call = Syscall::SendThought {
            target: 3,
            thought: Value::from("hello"),
        };
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["syscall"], "send_thought");
        let back: Syscall = serde_json::from_value(json).unwrap();
        assert!(matches!(back, Syscall::SendThought { target: 3, .. }));
    }
}
