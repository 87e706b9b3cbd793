//! Cognitive processes - the units the executive multiplexes
//!
//! A cognitive process is a lightweight record: lifecycle state, priority,
//! consciousness level, an emotion in valence/arousal space, a bounded
//! working memory, and a FIFO mailbox of inbound thoughts. Processes do
//! not own threads; the scheduler elects one at a time and the driver
//! makes its progress through syscalls and `cycle`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use uuid::Uuid;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Priority range is 0..=10, lower is more urgent.
pub const MAX_PRIORITY: u8 = 10;

/// Default priority when a spawn config names none.
pub const DEFAULT_PRIORITY: u8 = 5;

/// Consciousness levels are 0..=3.
pub const MAX_CONSCIOUSNESS_LEVEL: u8 = 3;

/// Default consciousness level at spawn.
pub const DEFAULT_CONSCIOUSNESS_LEVEL: u8 = 1;

/// Emotion intensity decays by this factor each cycle while above the floor.
pub const INTENSITY_DECAY: f64 = 0.98;
const INTENSITY_DECAY_FLOOR: f64 = 0.3;

/// Emotion valence decays by this factor each cycle while outside the dead zone.
pub const VALENCE_DECAY: f64 = 0.95;
const VALENCE_DECAY_FLOOR: f64 = 0.1;

/// Default bound on working-memory entries per process.
pub const DEFAULT_WORKING_MEMORY_CAPACITY: usize = 64;

/// Working-memory entries older than this are pruned during a cycle.
pub const DEFAULT_WORKING_MEMORY_RETENTION_SECS: i64 = 300;

// ============================================================================
// PROCESS IDENTITY AND STATE
// ============================================================================

/// Process identifier. Allocated monotonically from 1, never reused
/// within a kernel lifetime.
pub type Pid = u64;

/// Lifecycle state of a cognitive process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    /// Eligible for election by the scheduler.
    #[default]
    Ready,
    /// Currently elected; at most one process is running at any moment.
    Running,
    /// Waiting on an explicit unblock. No timeout ever fires.
    Blocked,
    /// Ended by kill or voluntary exit. Terminal; the PID is retired.
    Terminated,
}

impl ProcessState {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessState::Ready => "ready",
            ProcessState::Running => "running",
            ProcessState::Blocked => "blocked",
            ProcessState::Terminated => "terminated",
        }
    }

    /// Whether the process can still make progress.
    #[inline]
    pub fn is_live(&self) -> bool {
        !matches!(self, ProcessState::Terminated)
    }
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// EMOTION
// ============================================================================

/// A process's emotional state in the valence/arousal plane.
///
/// Arousal feeds the consciousness-aware scheduler; valence and intensity
/// decay toward neutral during cycles so emotions are episodes, not
/// settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionState {
    /// Emotion label, an open set ("joy", "frustration", ...)
    pub emotion: String,
    /// Intensity in `[0, 1]`
    pub intensity: f64,
    /// Valence in `[-1, 1]`
    pub valence: f64,
    /// Arousal in `[0, 1]`
    pub arousal: f64,
}

impl Default for EmotionState {
    fn default() -> Self {
        Self {
            emotion: "neutral".to_string(),
            intensity: 0.5,
            valence: 0.0,
            arousal: 0.5,
        }
    }
}

impl EmotionState {
    /// Replace the felt emotion, deriving valence and arousal from the
    /// label when the caller provides only a label and intensity.
    pub fn feel(&mut self, emotion: &str, intensity: f64) {
        let (valence, arousal) = emotion_coordinates(emotion);
        self.emotion = emotion.to_string();
        self.intensity = intensity.clamp(0.0, 1.0);
        self.valence = valence;
        self.arousal = (arousal * self.intensity.max(0.1) / 0.5).clamp(0.0, 1.0);
    }

    /// One cycle of emotional decay toward neutral.
    pub fn decay(&mut self) {
        if self.intensity > INTENSITY_DECAY_FLOOR {
            self.intensity *= INTENSITY_DECAY;
        }
        if self.valence.abs() > VALENCE_DECAY_FLOOR {
            self.valence *= VALENCE_DECAY;
        }
    }
}

/// Rough placement of common emotion labels in the valence/arousal plane
/// (Russell's circumplex). Unknown labels land at neutral coordinates.
fn emotion_coordinates(emotion: &str) -> (f64, f64) {
    match emotion.to_lowercase().as_str() {
        "joy" | "happiness" | "delight" => (0.8, 0.6),
        "excitement" | "anticipation" => (0.6, 0.9),
        "curiosity" | "interest" => (0.5, 0.6),
        "calm" | "contentment" => (0.6, 0.2),
        "surprise" => (0.1, 0.8),
        "fear" | "anxiety" => (-0.7, 0.9),
        "anger" | "frustration" => (-0.6, 0.8),
        "sadness" | "grief" => (-0.7, 0.3),
        "boredom" => (-0.3, 0.1),
        "disgust" => (-0.6, 0.5),
        _ => (0.0, 0.5),
    }
}

// ============================================================================
// IPC AND WORKING MEMORY
// ============================================================================

/// A thought delivered between processes. The payload is opaque to the
/// kernel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThoughtMessage {
    /// Sending process
    pub from: Pid,
    /// Opaque payload
    pub payload: Value,
    /// Delivery time
    pub timestamp: DateTime<Utc>,
}

/// One timestamped working-memory entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingMemoryItem {
    /// Stored content
    pub content: Value,
    /// When it entered working memory
    pub stored_at: DateTime<Utc>,
}

/// Per-process activity counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStats {
    /// Syscalls made by this process (failures included)
    pub syscalls: u64,
    /// Thoughts drained from the mailbox into working memory
    pub thoughts_processed: u64,
    /// Thoughts sent to other processes
    pub messages_sent: u64,
    /// Thoughts taken off the mailbox
    pub messages_received: u64,
}

// ============================================================================
// SPAWN CONFIG AND SUMMARY
// ============================================================================

/// Configuration for spawning a process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProcessConfig {
    /// Process name
    #[serde(default)]
    pub name: String,
    /// Free-form role label
    #[serde(default)]
    pub role: String,
    /// Priority 0..=10, defaults to 5
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    /// Consciousness level 0..=3, defaults to 1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consciousness_level: Option<u8>,
}

/// Externally visible view of a process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSummary {
    /// Process id
    pub pid: Pid,
    /// Parent process id (0 for kernel-rooted processes)
    pub parent: Pid,
    /// Name
    pub name: String,
    /// Role
    pub role: String,
    /// Lifecycle state
    pub state: ProcessState,
    /// Priority 0..=10
    pub priority: u8,
    /// Consciousness level 0..=3
    pub consciousness_level: u8,
    /// Current emotion
    pub emotion: EmotionState,
    /// Activity counters
    pub stats: ProcessStats,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// COGNITIVE PROCESS
// ============================================================================

/// One cognitive process record, exclusively owned by the process table.
#[derive(Debug, Clone)]
pub struct CognitiveProcess {
    /// Process id, never reused
    pub pid: Pid,
    /// Parent pid, 0 when rooted at the kernel
    pub parent: Pid,
    /// Name
    pub name: String,
    /// Role
    pub role: String,
    /// Lifecycle state
    pub state: ProcessState,
    /// Priority 0..=10, lower is more urgent
    pub priority: u8,
    /// Consciousness level 0..=3
    pub consciousness_level: u8,
    /// Emotional state
    pub emotion: EmotionState,
    /// Atom currently in focus, if any
    pub attention_focus: Option<Uuid>,
    /// Bounded, time-stamped working memory
    pub working_memory: VecDeque<WorkingMemoryItem>,
    /// Inbound thought mailbox (FIFO)
    pub mailbox: VecDeque<ThoughtMessage>,
    /// Activity counters
    pub stats: ProcessStats,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// When the scheduler last elected this process
    pub last_scheduled: Option<DateTime<Utc>>,
    /// Cumulative elected time
    pub cpu_time: Duration,
    working_memory_capacity: usize,
}

impl CognitiveProcess {
    /// Create a fresh process in the ready state.
    pub fn new(pid: Pid, parent: Pid, config: ProcessConfig, now: DateTime<Utc>) -> Self {
        Self {
            pid,
            parent,
            name: if config.name.is_empty() {
                format!("process-{pid}")
            } else {
                config.name
            },
            role: config.role,
            state: ProcessState::Ready,
            priority: config.priority.unwrap_or(DEFAULT_PRIORITY).min(MAX_PRIORITY),
            consciousness_level: config
                .consciousness_level
                .unwrap_or(DEFAULT_CONSCIOUSNESS_LEVEL)
                .min(MAX_CONSCIOUSNESS_LEVEL),
            emotion: EmotionState::default(),
            attention_focus: None,
            working_memory: VecDeque::new(),
            mailbox: VecDeque::new(),
            stats: ProcessStats::default(),
            created_at: now,
            last_scheduled: None,
            cpu_time: Duration::zero(),
            working_memory_capacity: DEFAULT_WORKING_MEMORY_CAPACITY,
        }
    }

    /// Override the working-memory bound (kernel config).
    pub fn with_working_memory_capacity(mut self, capacity: usize) -> Self {
        self.working_memory_capacity = capacity.max(1);
        self
    }

    /// Enqueue an inbound thought.
    pub fn deliver(&mut self, message: ThoughtMessage) {
        self.mailbox.push_back(message);
    }

    /// Pop the next inbound thought, FIFO.
    pub fn receive(&mut self) -> Option<ThoughtMessage> {
        let message = self.mailbox.pop_front();
        if message.is_some() {
            self.stats.messages_received += 1;
        }
        message
    }

    /// Store an item in working memory, evicting the oldest at capacity.
    pub fn memorize(&mut self, content: Value, now: DateTime<Utc>) {
        if self.working_memory.len() >= self.working_memory_capacity {
            self.working_memory.pop_front();
        }
        self.working_memory.push_back(WorkingMemoryItem {
            content,
            stored_at: now,
        });
    }

    /// One cooperative cycle: drain the mailbox into working memory,
    /// decay emotion, prune stale working memory. A no-op unless the
    /// process is running.
    pub fn cycle(&mut self, now: DateTime<Utc>, retention: Duration) {
        if self.state != ProcessState::Running {
            return;
        }

        while let Some(message) = self.mailbox.pop_front() {
            self.stats.messages_received += 1;
            self.stats.thoughts_processed += 1;
            let content = serde_json::json!({
                "from": message.from,
                "thought": message.payload,
                "receivedAt": message.timestamp,
            });
            self.memorize(content, now);
        }

        self.emotion.decay();

        let cutoff = now - retention;
        self.working_memory.retain(|item| item.stored_at >= cutoff);
    }

    /// Terminate: empty the mailbox and working memory, retire the record.
    pub fn terminate(&mut self) {
        self.state = ProcessState::Terminated;
        self.mailbox.clear();
        self.working_memory.clear();
        self.attention_focus = None;
    }

    /// Externally visible summary.
    pub fn summary(&self) -> ProcessSummary {
        ProcessSummary {
            pid: self.pid,
            parent: self.parent,
            name: self.name.clone(),
            role: self.role.clone(),
            state: self.state,
            priority: self.priority,
            consciousness_level: self.consciousness_level,
            emotion: self.emotion.clone(),
            stats: self.stats,
            created_at: self.created_at,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
