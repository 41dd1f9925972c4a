//! Interrupt and deadline handling for a run.

use std::time::Duration;

use tokio::{sync::oneshot, time::Instant};

use crate::MuxError;

/// Why a run was stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopReason {
    Interrupted,
    TimedOut(Duration),
}

impl From<StopReason> for MuxError {
    fn from(reason: StopReason) -> Self {
        match reason {
            StopReason::Interrupted => Self::Interrupted,
            StopReason::TimedOut(after) => Self::TimedOut(after),
        }
    }
}

/// External stop conditions for one run.
pub(crate) struct RunControl {
    interrupt: Option<oneshot::Receiver<()>>,
    timeout: Option<Duration>,
    started: Instant,
}

impl RunControl {
    pub(crate) fn new(interrupt: Option<oneshot::Receiver<()>>, timeout: Option<Duration>) -> Self {
        Self {
            interrupt,
            timeout,
            started: Instant::now(),
        }
    }

    /// Resolves when the run must stop. Never resolves if neither an
    /// interrupt nor a timeout can fire.
    ///
    /// A dropped interrupt sender is not a request to stop.
    pub(crate) async fn stopped(self) -> StopReason {
        let Self {
            interrupt,
            timeout,
            started,
        } = self;

        let interrupted = async move {
            let requested = match interrupt {
                Some(rx) => rx.await.is_ok(),
                None => false,
            };
            if !requested {
                futures::future::pending::<()>().await;
            }
        };
        let expired = async move {
            match timeout {
                Some(after) => {
                    tokio::time::sleep_until(started + after).await;
                    after
                }
                None => futures::future::pending().await,
            }
        };

        tokio::select! {
            () = interrupted => StopReason::Interrupted,
            after = expired => StopReason::TimedOut(after),
        }
    }
}
