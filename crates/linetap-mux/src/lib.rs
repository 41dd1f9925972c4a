//! Stream multiplexer for child process output.
//!
//! Provides:
//! - `Multiplexer` - Drains stdout and stderr into a `LineSink` until the
//!   child has exited and both streams are exhausted
//! - Two interchangeable strategies: a single-task readiness loop and one
//!   reader task per stream, chosen per platform by `Strategy::detect`
//! - `execute` - Launch + drain in one call, returning the exit code

pub mod error;
pub mod execute;
pub mod line_reader;
pub mod multiplexer;

mod control;
mod reader_tasks;
mod readiness;
mod stream_state;

#[cfg(test)]
mod testing;

pub use error::{ExecuteError, MuxError};
pub use execute::{execute, execute_detailed, execute_with};
pub use line_reader::LineReader;
pub use multiplexer::Multiplexer;
