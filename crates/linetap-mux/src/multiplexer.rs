//! Strategy selection and run lifecycle.

use std::{sync::Arc, time::Duration};

use linetap_core::{LineCounts, LineSink, MuxConfig, ProcessHandle, RunResult, Strategy, StreamTag};
use tokio::{sync::oneshot, time::Instant};
use tracing::Instrument;

use crate::{MuxError, control::RunControl, readiness, reader_tasks, stream_state::StreamSummary};

/// What a strategy hands back once exit and drain are both confirmed.
#[derive(Debug)]
pub(crate) struct Drained {
    pub exit_code: i32,
    pub stdout: StreamSummary,
    pub stderr: StreamSummary,
}

impl Drained {
    fn into_result(self, strategy: Strategy, duration: Duration) -> RunResult {
        let read_errors = [(StreamTag::Stdout, self.stdout), (StreamTag::Stderr, self.stderr)]
            .into_iter()
            .filter(|(_, summary)| summary.read_error)
            .map(|(tag, _)| tag)
            .collect();
        RunResult {
            exit_code: self.exit_code,
            lines: LineCounts {
                stdout: self.stdout.lines,
                stderr: self.stderr.lines,
            },
            read_errors,
            strategy,
            duration,
        }
    }
}

/// Drains a child's stdout and stderr into a sink until the child has
/// exited and both streams are exhausted.
#[derive(Debug, Clone, Default)]
pub struct Multiplexer {
    config: MuxConfig,
}

impl Multiplexer {
    #[must_use]
    pub const fn new(config: MuxConfig) -> Self {
        Self { config }
    }

    /// Strategy this multiplexer runs with.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        self.config.strategy()
    }

    /// Drain `handle` into `sink` and return once the run is complete.
    ///
    /// # Errors
    /// See [`Multiplexer::run_with_interrupt`].
    pub async fn run(
        &self,
        handle: ProcessHandle,
        sink: Arc<dyn LineSink>,
    ) -> Result<RunResult, MuxError> {
        self.run_with_interrupt(handle, sink, None).await
    }

    /// Like [`Multiplexer::run`], stopping early when `interrupt` fires.
    ///
    /// On every error path the child's process group is killed and reaped
    /// before returning, and both readers are closed. The sink's `finish`
    /// is called once either way.
    ///
    /// # Errors
    /// - `Setup` if the handle lacks a reader
    /// - `Sink` if the sink rejects a delivery
    /// - `Interrupted` / `TimedOut` when stopped early
    /// - `Wait` / `Join` on OS or task failures
    pub async fn run_with_interrupt(
        &self,
        mut handle: ProcessHandle,
        sink: Arc<dyn LineSink>,
        interrupt: Option<oneshot::Receiver<()>>,
    ) -> Result<RunResult, MuxError> {
        let strategy = self.strategy();
        let span = tracing::debug_span!("run", pid = handle.pid(), %strategy);

        async move {
            let started = Instant::now();
            let control = RunControl::new(interrupt, self.config.run_timeout());

            let outcome = match strategy {
                Strategy::Readiness => {
                    readiness::drain(
                        &mut handle,
                        sink.as_ref(),
                        control,
                        self.config.poll_interval(),
                    )
                    .await
                }
                Strategy::ReaderTasks => reader_tasks::drain(&mut handle, &sink, control).await,
            };

            match outcome {
                Ok(drained) => {
                    let result = drained.into_result(strategy, started.elapsed());
                    tracing::debug!(
                        exit_code = result.exit_code,
                        stdout_lines = result.lines.stdout,
                        stderr_lines = result.lines.stderr,
                        "Run complete"
                    );
                    sink.finish(Some(result.exit_code))?;
                    Ok(result)
                }
                Err(err) => {
                    tracing::debug!(error = %err, "Run failed, terminating child");
                    let code = handle
                        .terminate()
                        .await
                        .inspect_err(|e| tracing::warn!(error = %e, "Failed to terminate child"))
                        .ok();
                    if let Err(e) = sink.finish(code) {
                        tracing::warn!(error = %e, "Sink failed to finish");
                    }
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }
}
