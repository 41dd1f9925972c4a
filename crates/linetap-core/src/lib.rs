//! Core abstractions for capturing child process output line by line.
//!
//! This crate provides the fundamental building blocks:
//! - `StreamTag` / `LogMsg` - Typed output of a child process
//! - `ProcessHandle` - A running child with its two output readers
//! - `LineSink` - Where completed lines are delivered (`MsgStore`, `TracingSink`)
//! - `RunResult` / `MuxConfig` - What a run returns and how it is tuned

pub mod config;
pub mod error;
pub mod handle;
pub mod log_msg;
pub mod msg_store;
pub mod result;
pub mod sink;
pub mod stream;

pub use config::{MuxConfig, Strategy};
pub use error::{ConfigError, SetupError, SinkError};
pub use handle::{BoxedReader, ChildControl, ProcessHandle};
pub use log_msg::LogMsg;
pub use msg_store::MsgStore;
pub use result::{LineCounts, RunResult};
pub use sink::{FnSink, LineSink, TracingSink};
pub use stream::StreamTag;
