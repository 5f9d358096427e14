//! Source → artifact compilation.
//!
//! ```text
//! source ──► WorkerManager::run ──► rendered bytes ──► embed ──► Artifact
//!                 │                       │
//!                 │                       └─ blank ──► placeholder
//!                 └─ spawn/load/invoke error ──► CompileResult { ok: false }
//! ```
//!
//! Every failure is folded into the [`CompileResult`]; `compile` itself
//! never fails.

use chrono::Utc;
use std::time::Instant;

use crate::artifact::{Artifact, EmbedError, embed, placeholder};
use crate::debug;
use crate::worker::{RenderOptions, Worker, WorkerFactory, WorkerManager};

/// Shown when a failure carries no text of its own.
const FALLBACK_MESSAGE: &str = "compilation failed";

/// Outcome of one compile.
#[derive(Debug, Clone)]
pub struct CompileResult {
    pub ok: bool,
    /// Present exactly when `ok`.
    pub artifact: Option<Artifact>,
    /// The source that was compiled.
    pub source: String,
    /// Error text when not `ok`, otherwise empty.
    pub message: String,
}

impl CompileResult {
    fn success(source: &str, artifact: Artifact) -> Self {
        Self {
            ok: true,
            artifact: Some(artifact),
            source: source.to_owned(),
            message: String::new(),
        }
    }

    fn failure(source: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            FALLBACK_MESSAGE.to_owned()
        } else {
            message
        };
        Self {
            ok: false,
            artifact: None,
            source: source.to_owned(),
            message,
        }
    }
}

pub struct CompilePipeline<F> {
    manager: WorkerManager<F>,
    options: RenderOptions,
}

impl<F: WorkerFactory> CompilePipeline<F> {
    pub fn new(manager: WorkerManager<F>, options: RenderOptions) -> Self {
        Self { manager, options }
    }

    /// Compile `source` in a fresh worker.
    pub async fn compile(&self, source: &str) -> CompileResult {
        let start = Instant::now();
        let options = self.options;

        let rendered = self
            .manager
            .run(async |worker: &mut F::Worker| worker.invoke(source, &options).await)
            .await;

        let result = match rendered {
            Ok(bytes) => match build_artifact(&bytes, source) {
                Ok(artifact) => CompileResult::success(source, artifact),
                Err(e) => CompileResult::failure(source, e.to_string()),
            },
            Err(e) => CompileResult::failure(source, e.to_string()),
        };

        debug!(
            "compile";
            "{} in {:.0?}",
            if result.ok { "ok" } else { "failed" },
            start.elapsed()
        );
        result
    }
}

/// Embed `source` into the rendered bytes; blank output becomes a placeholder.
fn build_artifact(rendered: &[u8], source: &str) -> Result<Artifact, EmbedError> {
    if rendered.iter().all(u8::is_ascii_whitespace) {
        return Ok(placeholder(source));
    }
    embed(rendered, source, Utc::now())
}
