//! Kernel test harness
//!
//! Builds kernels with deterministic collaborators and carries the
//! driver-level agent behaviors: cascading shutdown and
//! oldest-subordinate deprecation. Each harness is fully isolated -
//! nothing is shared between tests.

use std::sync::{Arc, Once};

use noesis_core::{ManualClock, SeededRandom};
use noesis_kernel::{Kernel, KernelConfig, Pid, ProcessConfig, Syscall, SyscallReply, KERNEL_PID};

use crate::mocks::RecordingTransport;

static TRACING: Once = Once::new();

/// Install a test tracing subscriber once per process.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// A kernel wired to a manual clock, seeded randomness, and a recording
/// transport.
pub struct KernelHarness {
    /// The kernel under test
    pub kernel: Kernel,
    /// Drive time explicitly
    pub clock: Arc<ManualClock>,
    /// Inspect sync deliveries
    pub transport: Arc<RecordingTransport>,
}

impl KernelHarness {
    /// A harness over the default configuration.
    pub fn new() -> Self {
        Self::with_config(KernelConfig::default())
    }

    /// A harness over an explicit configuration.
    pub fn with_config(config: KernelConfig) -> Self {
        init_tracing();
        tracing::debug!(node = %config.node_id, "building test kernel");
        let clock = Arc::new(ManualClock::default());
        let transport = Arc::new(RecordingTransport::new());
        let kernel = Kernel::with_collaborators(
            config,
            transport.clone(),
            clock.clone(),
            Arc::new(SeededRandom::from_seed(0x0e51)),
        );
        Self {
            kernel,
            clock,
            transport,
        }
    }

    /// Spawn an agent through the syscall surface, as a driver would.
    pub fn spawn_agent(&mut self, parent: Pid, name: &str) -> Pid {
        let reply = self
            .kernel
            .syscall(
                parent,
                Syscall::SpawnAgent {
                    config: ProcessConfig {
                        name: name.to_string(),
                        ..Default::default()
                    },
                },
            )
            .expect("spawn_agent");
        match reply {
            SyscallReply::Spawned { pid, .. } => pid,
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    /// Spawn an agent rooted at the kernel.
    pub fn spawn_root(&mut self, name: &str) -> Pid {
        self.spawn_agent(KERNEL_PID, name)
    }

    /// Advance the clock by milliseconds.
    pub fn tick_millis(&self, millis: i64) {
        self.clock.advance_millis(millis);
    }

    /// Advance the clock by whole seconds.
    pub fn tick_secs(&self, secs: i64) {
        self.clock.advance_millis(secs * 1_000);
    }
}

impl Default for KernelHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// AGENT DRIVER BEHAVIORS
// ============================================================================

/// Kill a process and every transitive child, children first. The kernel
/// itself never cascades; this is the agent driver's contract.
pub fn shutdown_cascade(kernel: &mut Kernel, root: Pid) {
    let children: Vec<Pid> = kernel
        .ps()
        .into_iter()
        .filter(|summary| summary.parent == root)
        .map(|summary| summary.pid)
        .collect();
    for child in children {
        shutdown_cascade(kernel, child);
    }
    kernel.kill(root);
}

/// Remove the oldest live subordinate of a parent, by creation time.
/// Returns the deprecated PID, if any subordinate existed.
pub fn deprecate_oldest(kernel: &mut Kernel, parent: Pid) -> Option<Pid> {
    let oldest = kernel
        .ps()
        .into_iter()
        .filter(|summary| summary.parent == parent)
        .min_by_key(|summary| (summary.created_at, summary.pid))
        .map(|summary| summary.pid)?;
    kernel.kill(oldest);
    Some(oldest)
}
