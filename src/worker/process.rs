//! Child-process workers.
//!
//! Each [`ProcessWorker`] owns one OS process running the hidden `worker`
//! subcommand (or any command speaking the same protocol).

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::protocol::{self, ProtocolError, Request, Response};
use super::{CompileError, LoadError, RenderOptions, SpawnError, Worker, WorkerFactory};
use crate::{debug, log};

/// How long a worker may take to exit after `shutdown` before it is killed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Spawns one child process per compile.
#[derive(Debug, Clone)]
pub struct ProcessFactory {
    command: Vec<OsString>,
}

impl ProcessFactory {
    /// `command[0]` is the program, the rest are its arguments.
    pub fn new(command: Vec<OsString>) -> Self {
        Self { command }
    }
}

impl WorkerFactory for ProcessFactory {
    type Worker = ProcessWorker;

    async fn spawn(&self) -> Result<ProcessWorker, SpawnError> {
        let (program, args) = self.command.split_first().ok_or(SpawnError::EmptyCommand)?;
        let name = program.to_string_lossy().into_owned();

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SpawnError::Io {
                program: name.clone(),
                source,
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(SpawnError::Handshake {
                program: name,
                reason: "stdio not captured".into(),
            });
        };

        let mut worker = ProcessWorker {
            program: name,
            child,
            stdin: Some(BufWriter::new(stdin)),
            stdout: BufReader::new(stdout),
        };

        let reason = match worker.request(&Request::Ping).await {
            Ok(Response::Pong) => {
                debug!("worker"; "spawned `{}` (pid {:?})", worker.program, worker.child.id());
                return Ok(worker);
            }
            Ok(other) => format!("unexpected response {other:?}"),
            Err(e) => e.to_string(),
        };

        let program = worker.program.clone();
        worker.terminate().await;
        Err(SpawnError::Handshake { program, reason })
    }
}

/// Host-side handle to a running worker process.
pub struct ProcessWorker {
    program: String,
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    stdout: BufReader<ChildStdout>,
}

impl ProcessWorker {
    async fn request(&mut self, request: &Request) -> Result<Response, ProtocolError> {
        let stdin = self.stdin.as_mut().ok_or(ProtocolError::Closed)?;
        protocol::send(stdin, request).await?;
        protocol::recv(&mut self.stdout).await
    }
}

impl Worker for ProcessWorker {
    async fn load(&mut self, root: &Path) -> Result<(), LoadError> {
        let request = Request::Load {
            root: root.to_owned(),
        };
        match self.request(&request).await {
            Ok(Response::Loaded) => Ok(()),
            Ok(Response::Error { message }) => Err(LoadError::new(root, message)),
            Ok(other) => Err(LoadError::new(root, format!("unexpected response {other:?}"))),
            Err(e) => Err(LoadError::new(root, e.to_string())),
        }
    }

    async fn invoke(
        &mut self,
        source: &str,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, CompileError> {
        let request = Request::Texify {
            source: source.to_owned(),
            options: *options,
        };
        match self.request(&request).await? {
            Response::Image { svg } => Ok(svg.into_bytes()),
            Response::Error { message } => Err(CompileError::Rejected(message)),
            other => Err(CompileError::Unexpected(format!("{other:?}"))),
        }
    }

    async fn terminate(mut self) {
        if let Some(mut stdin) = self.stdin.take() {
            // A worker that already exited cannot read this; the wait below decides.
            let _ = protocol::send(&mut stdin, &Request::Shutdown).await;
        }

        match tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => debug!("worker"; "`{}` exited with {status}", self.program),
            Ok(Err(e)) => log!("worker"; "failed to wait for `{}`: {e}", self.program),
            Err(_) => {
                debug!("worker"; "`{}` ignored shutdown, killing", self.program);
                if let Err(e) = self.child.kill().await {
                    log!("worker"; "failed to kill `{}`: {e}", self.program);
                }
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> ProcessFactory {
        ProcessFactory::new(vec!["sh".into(), "-c".into(), script.into()])
    }

    #[tokio::test]
    async fn test_empty_command() {
        let err = ProcessFactory::new(Vec::new()).spawn().await.err().unwrap();
        assert!(matches!(err, SpawnError::EmptyCommand));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let factory = ProcessFactory::new(vec!["tikzsvg-no-such-program".into()]);
        let err = factory.spawn().await.err().unwrap();
        assert!(matches!(err, SpawnError::Io { .. }));
    }

    #[tokio::test]
    async fn test_handshake_failure() {
        let err = sh("exit 0").spawn().await.err().unwrap();
        assert!(matches!(err, SpawnError::Handshake { .. }));
    }

    #[tokio::test]
    async fn test_scripted_worker_roundtrip() {
        let factory = sh(concat!(
            "read _; echo '{\"status\":\"pong\"}'; ",
            "read _; echo '{\"status\":\"loaded\"}'; ",
            "read _; echo '{\"status\":\"image\",\"svg\":\"<svg/>\"}'; ",
            "read _",
        ));
        let mut worker = factory.spawn().await.unwrap();
        worker.load(Path::new("/tex")).await.unwrap();
        let bytes = worker
            .invoke("x", &RenderOptions::default())
            .await
            .unwrap();
        assert_eq!(bytes, b"<svg/>");
        worker.terminate().await;
    }

    #[tokio::test]
    async fn test_rejected_compile_keeps_message() {
        let factory = sh(concat!(
            "read _; echo '{\"status\":\"pong\"}'; ",
            "read _; echo '{\"status\":\"error\",\"message\":\"! Emergency stop.\"}'; ",
            "read _",
        ));
        let mut worker = factory.spawn().await.unwrap();
        let err = worker
            .invoke("x", &RenderOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "! Emergency stop.");
        worker.terminate().await;
    }

    fn is_alive(pid: u32) -> bool {
        std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }

    #[tokio::test]
    async fn test_terminate_reaps_cooperative_worker() {
        let factory = sh("read _; echo '{\"status\":\"pong\"}'; read _");
        let worker = factory.spawn().await.unwrap();
        let pid = worker.child.id().unwrap();

        let started = std::time::Instant::now();
        worker.terminate().await;
        assert!(started.elapsed() < SHUTDOWN_GRACE);
        assert!(!is_alive(pid));
    }

    #[tokio::test]
    async fn test_terminate_kills_worker_ignoring_shutdown() {
        let factory = sh(concat!(
            "read _; echo '{\"status\":\"pong\"}'; ",
            "trap '' TERM; exec sleep 60",
        ));
        let worker = factory.spawn().await.unwrap();
        let pid = worker.child.id().unwrap();
        assert!(is_alive(pid));

        let started = std::time::Instant::now();
        worker.terminate().await;
        let elapsed = started.elapsed();
        assert!(elapsed >= SHUTDOWN_GRACE, "returned after {elapsed:?}");
        assert!(elapsed < SHUTDOWN_GRACE + Duration::from_secs(1), "returned after {elapsed:?}");
        assert!(!is_alive(pid));
    }
}
