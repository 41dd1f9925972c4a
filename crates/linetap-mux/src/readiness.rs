//! Single-task readiness strategy.
//!
//! Both readers are awaited in one `select!` next to a bounded timer, so the
//! loop wakes for whichever reader has data or, when neither does, to poll
//! the process again. Reads only happen on readers that became ready, except
//! for the drain passes after exit, which never wait.

use std::time::Duration;

use linetap_core::{LineSink, ProcessHandle, StreamTag};

use crate::{
    MuxError,
    control::RunControl,
    multiplexer::Drained,
    stream_state::StreamState,
};

/// Per-run lifecycle.
///
/// `Drained` needs both a known exit code and both readers closed (EOF or a
/// read error). Exit alone never ends the run: output written just before
/// exit may not have surfaced as readiness yet, and a descendant may still
/// hold the pipes open. After exit, every quiet iteration runs a
/// non-blocking drain pass over both readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Running,
    ExitDetected(i32),
    Drained(i32),
}

enum Event {
    Read(StreamTag, std::io::Result<Option<String>>),
    Exited(i32),
    Idle,
}

pub(crate) async fn drain(
    handle: &mut ProcessHandle,
    sink: &dyn LineSink,
    control: RunControl,
    poll_interval: Duration,
) -> Result<Drained, MuxError> {
    let (stdout, stderr) = handle.take_streams()?;
    let mut out = StreamState::new(StreamTag::Stdout, stdout);
    let mut err = StreamState::new(StreamTag::Stderr, stderr);

    let stopped = control.stopped();
    tokio::pin!(stopped);

    let mut state = RunState::Running;
    let mut held_open = false;
    let exit_code = loop {
        let both_closed = !out.is_open() && !err.is_open();
        state = match state {
            RunState::ExitDetected(code) if both_closed => RunState::Drained(code),
            other => other,
        };
        if let RunState::Drained(code) = state {
            break code;
        }

        let waiting = both_closed && state == RunState::Running;
        let event = tokio::select! {
            reason = &mut stopped => return Err(reason.into()),
            read = out.next_line(), if out.is_open() => Event::Read(StreamTag::Stdout, read),
            read = err.next_line(), if err.is_open() => Event::Read(StreamTag::Stderr, read),
            code = handle.wait(), if waiting => Event::Exited(code.map_err(MuxError::Wait)?),
            () = tokio::time::sleep(poll_interval) => Event::Idle,
        };

        let ready = match event {
            Event::Read(StreamTag::Stdout, read) => {
                out.on_read(read, sink)?;
                true
            }
            Event::Read(StreamTag::Stderr, read) => {
                err.on_read(read, sink)?;
                true
            }
            Event::Exited(code) => {
                state = RunState::Drained(code);
                continue;
            }
            Event::Idle => false,
        };

        state = match state {
            RunState::Running => match handle.poll().map_err(MuxError::Wait)? {
                Some(code) => {
                    tracing::debug!(code, "Process exit detected, draining");
                    RunState::ExitDetected(code)
                }
                None => RunState::Running,
            },
            RunState::ExitDetected(code) if !ready => {
                let delivered = out.drain_ready(sink)? + err.drain_ready(sink)?;
                if delivered > 0 {
                    tracing::trace!(delivered, "Drain pass found more output");
                } else if (out.is_open() || err.is_open()) && !held_open {
                    tracing::debug!(code, "Process exited but its output is still open, waiting for EOF");
                    held_open = true;
                }
                RunState::ExitDetected(code)
            }
            other => other,
        };
    };

    Ok(Drained {
        exit_code,
        stdout: out.close(),
        stderr: err.close(),
    })
}
