//! Process group launcher.

use std::{io, process::Stdio};

use async_trait::async_trait;
use command_group::{AsyncCommandGroup, AsyncGroupChild};
use linetap_core::{
    BoxedReader, ChildControl, ProcessHandle,
    handle::exit_code_of,
};
use tokio::process::Command;

use crate::{CommandSpec, LaunchError, resolve_executable_path};

/// Trait for process launchers.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Start the command with stdout and stderr piped separately.
    async fn spawn(&self, spec: &CommandSpec) -> Result<ProcessHandle, LaunchError>;
}

/// Launches each command as the leader of its own process group, so that
/// terminating it also reaches anything it spawned.
///
/// Stdin is connected to the null device. Output decoding is left to the
/// reader: bytes arrive unmodified.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupLauncher;

impl GroupLauncher {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Launcher for GroupLauncher {
    async fn spawn(&self, spec: &CommandSpec) -> Result<ProcessHandle, LaunchError> {
        let parts = spec.build()?;

        if let Some(dir) = &spec.cwd {
            if !dir.is_dir() {
                return Err(LaunchError::InvalidWorkingDir(dir.clone()));
            }
        }

        let executable = resolve_executable_path(&parts.program)
            .await
            .ok_or_else(|| LaunchError::NotFound(parts.program.clone()))?;

        let mut cmd = Command::new(&executable);
        cmd.args(&parts.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let mut child = cmd.group_spawn().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LaunchError::NotFound(parts.program.clone()),
            _ => LaunchError::Spawn(e),
        })?;
        let Some(pid) = child.id() else {
            return Err(LaunchError::MissingPid);
        };

        let stdout = child
            .inner()
            .stdout
            .take()
            .map(|s| Box::new(s) as BoxedReader);
        let stderr = child
            .inner()
            .stderr
            .take()
            .map(|s| Box::new(s) as BoxedReader);

        tracing::debug!(
            pid,
            program = %executable.display(),
            args = ?parts.args,
            cwd = ?spec.cwd,
            "Spawned child process"
        );

        Ok(ProcessHandle::new(
            pid,
            Box::new(GroupChild(child)),
            stdout,
            stderr,
        ))
    }
}

struct GroupChild(AsyncGroupChild);

#[async_trait]
impl ChildControl for GroupChild {
    fn try_wait(&mut self) -> io::Result<Option<i32>> {
        Ok(self.0.try_wait()?.map(exit_code_of))
    }

    async fn wait(&mut self) -> io::Result<i32> {
        self.0.wait().await.map(exit_code_of)
    }

    fn start_kill(&mut self) -> io::Result<()> {
        self.0.start_kill()
    }
}
