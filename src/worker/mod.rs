//! Isolated one-shot compile workers.
//!
//! A worker compiles exactly one source document and is then discarded.
//! Workers are never pooled: a hung or corrupted compilation cannot leak
//! into the next request.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──► Spawning ──► Loading ──► Ready ──► Invoking ──► Terminated
//!             │            │                     │              ▲
//!             └────────────┴──────► Failed ◄─────┘              │
//!                                     └─────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`manager`]: scoped spawn → load → invoke → terminate
//! - [`process`]: host side of a child-process worker
//! - [`server`]: the child process itself (TeX → SVG)
//! - [`protocol`]: JSON-lines messages between the two

mod error;
pub mod manager;
pub mod process;
pub mod protocol;
pub mod server;

#[cfg(test)]
pub mod stub;

pub use error::{CompileError, LoadError, SpawnError, WorkerError};
pub use manager::WorkerManager;
pub use process::ProcessFactory;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Options forwarded to the worker with each invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Embed glyph outlines as web fonts instead of dropping text fonts.
    pub embed_fonts: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { embed_fonts: true }
    }
}

/// A spawned execution unit.
///
/// `terminate` consumes the worker; it is called exactly once for every
/// worker a [`WorkerFactory`] hands out.
#[allow(async_fn_in_trait)]
pub trait Worker {
    /// Load runtime resources from `root` before first use.
    async fn load(&mut self, root: &Path) -> Result<(), LoadError>;

    /// Compile `source`, suspending until the worker answers.
    async fn invoke(&mut self, source: &str, options: &RenderOptions)
    -> Result<Vec<u8>, CompileError>;

    /// Release the worker unconditionally.
    async fn terminate(self);
}

/// Creates one fresh [`Worker`] per compile request.
#[allow(async_fn_in_trait)]
pub trait WorkerFactory {
    type Worker: Worker;

    async fn spawn(&self) -> Result<Self::Worker, SpawnError>;
}

/// Lifecycle state of a single worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Spawning,
    Loading,
    Ready,
    Invoking,
    Failed,
    Terminated,
}

impl WorkerState {
    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: Self) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Idle, Spawning)
                | (Spawning, Loading)
                | (Loading, Ready)
                | (Ready, Invoking)
                | (Invoking, Terminated)
                | (Spawning | Loading | Invoking, Failed)
                | (Failed, Terminated)
        )
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Spawning => "spawning",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Invoking => "invoking",
            Self::Failed => "failed",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::WorkerState::*;
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [Idle, Spawning, Loading, Ready, Invoking, Terminated];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_failure_transitions() {
        for from in [Spawning, Loading, Invoking] {
            assert!(from.can_transition_to(Failed));
        }
        assert!(Failed.can_transition_to(Terminated));
        assert!(!Idle.can_transition_to(Failed));
        assert!(!Ready.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Ready));
        assert!(!Terminated.can_transition_to(Spawning));
    }

    #[test]
    fn test_render_options_default_embeds_fonts() {
        assert!(RenderOptions::default().embed_fonts);
    }
}
