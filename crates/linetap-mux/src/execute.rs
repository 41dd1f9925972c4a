//! Launch-and-drain in one call.

use std::sync::Arc;

use linetap_core::{LineSink, MuxConfig, RunResult};
use linetap_launcher::{CommandSpec, GroupLauncher, Launcher};
use tokio::sync::oneshot;

use crate::{ExecuteError, Multiplexer};

/// Run `spec` to completion and return its exit code.
///
/// # Errors
/// `ExecuteError::Launch` if the command could not be started (no exit code
/// exists then); `ExecuteError::Mux` if draining failed.
pub async fn execute(
    spec: &CommandSpec,
    sink: Arc<dyn LineSink>,
    config: &MuxConfig,
) -> Result<i32, ExecuteError> {
    Ok(execute_detailed(spec, sink, config).await?.exit_code)
}

/// Run `spec` to completion and return the full [`RunResult`].
///
/// # Errors
/// See [`execute`].
pub async fn execute_detailed(
    spec: &CommandSpec,
    sink: Arc<dyn LineSink>,
    config: &MuxConfig,
) -> Result<RunResult, ExecuteError> {
    execute_with(&GroupLauncher::new(), spec, sink, config, None).await
}

/// Run `spec` with a specific launcher and an optional interrupt.
///
/// # Errors
/// See [`execute`].
pub async fn execute_with<L>(
    launcher: &L,
    spec: &CommandSpec,
    sink: Arc<dyn LineSink>,
    config: &MuxConfig,
    interrupt: Option<oneshot::Receiver<()>>,
) -> Result<RunResult, ExecuteError>
where
    L: Launcher + ?Sized,
{
    let handle = launcher.spawn(spec).await.inspect_err(|e| {
        tracing::error!(command = %spec.display(), error = %e, "Failed to start command");
    })?;

    let result = Multiplexer::new(config.clone())
        .run_with_interrupt(handle, sink, interrupt)
        .await?;

    tracing::info!(
        command = %spec.display(),
        exit_code = result.exit_code,
        "Command finished"
    );
    Ok(result)
}
