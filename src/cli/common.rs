//! Shared helpers for command handlers.

use anyhow::Result;

use crate::config::Config;
use crate::logger::{status_error, status_success};
use crate::pipeline::{CompilePipeline, CompileResult};
use crate::session::FsStore;
use crate::worker::{ProcessFactory, WorkerManager};

/// Pipeline spawning one worker process per compile.
pub fn pipeline(config: &Config) -> Result<CompilePipeline<ProcessFactory>> {
    let factory = ProcessFactory::new(config.worker_command()?);
    let manager = WorkerManager::new(factory, &config.worker);
    Ok(CompilePipeline::new(manager, config.render_options()))
}

pub fn store(config: &Config) -> FsStore {
    FsStore::new(&config.store.assets_dir)
}

/// Show a compile outcome in the status block.
pub fn report(target: &str, result: &CompileResult) {
    if result.ok {
        status_success(&format!("compiled {target}"));
    } else {
        status_error(&format!("failed to compile {target}"), &result.message);
    }
}
