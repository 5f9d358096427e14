//! Scoped worker acquisition.

use std::path::PathBuf;

use super::{CompileError, LoadError, SpawnError, Worker, WorkerError, WorkerFactory, WorkerState};
use crate::config::WorkerConfig;
use crate::{debug, log};

/// Spawns, loads and terminates one worker per task.
pub struct WorkerManager<F> {
    factory: F,
    resource_root: Option<PathBuf>,
    strict_load: bool,
}

impl<F: WorkerFactory> WorkerManager<F> {
    pub fn new(factory: F, config: &WorkerConfig) -> Self {
        Self {
            factory,
            resource_root: config.resource_root.clone(),
            strict_load: config.strict_load,
        }
    }

    /// Run `task` against a fresh, loaded worker.
    ///
    /// The worker is terminated after `task` returns, whether it succeeded
    /// or not, and also when loading fails. A worker that fails to spawn
    /// has nothing to terminate.
    pub async fn run<T>(
        &self,
        task: impl AsyncFnOnce(&mut F::Worker) -> Result<T, CompileError>,
    ) -> Result<T, WorkerError> {
        let mut state = Lifecycle::new();

        state.advance(WorkerState::Spawning);
        let mut worker = match self.spawn().await {
            Ok(worker) => worker,
            Err(e) => {
                state.advance(WorkerState::Failed);
                // Nothing was created.
                state.advance(WorkerState::Terminated);
                return Err(e.into());
            }
        };

        state.advance(WorkerState::Loading);
        if let Err(e) = self.load(&mut worker).await {
            state.advance(WorkerState::Failed);
            self.terminate(worker, &mut state).await;
            return Err(e.into());
        }
        state.advance(WorkerState::Ready);

        state.advance(WorkerState::Invoking);
        let result = task(&mut worker).await;
        if result.is_err() {
            state.advance(WorkerState::Failed);
        }
        self.terminate(worker, &mut state).await;

        Ok(result?)
    }

    async fn spawn(&self) -> Result<F::Worker, SpawnError> {
        self.factory.spawn().await
    }

    /// Load resources. Lenient mode logs the failure and carries on.
    async fn load(&self, worker: &mut F::Worker) -> Result<(), LoadError> {
        let Some(root) = &self.resource_root else {
            debug!("worker"; "no resource root configured");
            return Ok(());
        };
        match worker.load(root).await {
            Ok(()) => Ok(()),
            Err(e) if self.strict_load => Err(e),
            Err(e) => {
                log!("worker"; "{e}, continuing without resources");
                Ok(())
            }
        }
    }

    async fn terminate(&self, worker: F::Worker, state: &mut Lifecycle) {
        worker.terminate().await;
        state.advance(WorkerState::Terminated);
    }
}

/// Tracks one worker's state for diagnostics.
struct Lifecycle {
    state: WorkerState,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            state: WorkerState::Idle,
        }
    }

    fn advance(&mut self, next: WorkerState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal worker transition {} -> {next}",
            self.state
        );
        debug!("worker"; "{} -> {next}", self.state);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::RenderOptions;
    use crate::worker::stub::{Behavior, Event, StubFactory, StubWorker};

    fn config(strict_load: bool) -> WorkerConfig {
        WorkerConfig {
            resource_root: Some("/opt/tex".into()),
            strict_load,
            ..WorkerConfig::default()
        }
    }

    async fn run_once(manager: &WorkerManager<StubFactory>) -> Result<Vec<u8>, WorkerError> {
        manager
            .run(async |worker: &mut StubWorker| {
                worker.invoke("x", &RenderOptions::default()).await
            })
            .await
    }

    #[tokio::test]
    async fn test_run_sequence() {
        let factory = StubFactory::rendering();
        let manager = WorkerManager::new(factory.clone(), &config(true));
        run_once(&manager).await.unwrap();

        assert_eq!(
            factory.events(),
            vec![
                Event::Spawn(0),
                Event::Load(0, "/opt/tex".into()),
                Event::Invoke(0, "x".into()),
                Event::Terminate(0),
            ]
        );
    }

    #[tokio::test]
    async fn test_terminate_after_failed_invoke() {
        let factory = StubFactory::new(Behavior::Fail("boom".into()));
        let manager = WorkerManager::new(factory.clone(), &config(true));
        let err = run_once(&manager).await.unwrap_err();

        assert!(matches!(err, WorkerError::Compile(_)));
        assert_eq!(factory.spawns(), 1);
        assert_eq!(factory.terminates(), 1);
    }

    #[tokio::test]
    async fn test_strict_load_aborts() {
        let factory = StubFactory::rendering().failing_load();
        let manager = WorkerManager::new(factory.clone(), &config(true));
        let err = run_once(&manager).await.unwrap_err();

        assert!(matches!(err, WorkerError::Load(_)));
        assert_eq!(factory.count(|e| matches!(e, Event::Invoke(..))), 0);
        assert_eq!(factory.terminates(), 1);
    }

    #[tokio::test]
    async fn test_lenient_load_continues() {
        let factory = StubFactory::rendering().failing_load();
        let manager = WorkerManager::new(factory.clone(), &config(false));
        run_once(&manager).await.unwrap();

        assert_eq!(factory.count(|e| matches!(e, Event::Invoke(..))), 1);
        assert_eq!(factory.terminates(), 1);
    }

    #[tokio::test]
    async fn test_no_resource_root_skips_load() {
        let factory = StubFactory::rendering().failing_load();
        let config = WorkerConfig {
            resource_root: None,
            ..config(true)
        };
        let manager = WorkerManager::new(factory.clone(), &config);
        run_once(&manager).await.unwrap();

        assert_eq!(
            factory.events(),
            vec![Event::Spawn(0), Event::Invoke(0, "x".into()), Event::Terminate(0)]
        );
    }

    #[tokio::test]
    async fn test_failed_spawn_has_nothing_to_terminate() {
        let factory = StubFactory::rendering().failing_spawn();
        let manager = WorkerManager::new(factory.clone(), &config(true));
        let err = run_once(&manager).await.unwrap_err();

        assert!(matches!(err, WorkerError::Spawn(_)));
        assert!(factory.events().is_empty());
    }

    #[tokio::test]
    async fn test_one_worker_per_run() {
        let factory = StubFactory::rendering();
        let manager = WorkerManager::new(factory.clone(), &config(true));
        for _ in 0..3 {
            run_once(&manager).await.unwrap();
        }
        assert_eq!(factory.spawns(), 3);
        assert_eq!(factory.terminates(), 3);
    }
}
