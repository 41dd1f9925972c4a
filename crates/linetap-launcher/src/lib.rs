//! Child process launching.
//!
//! Provides:
//! - `CommandSpec` - What to run, where, and whether through the shell
//! - `GroupLauncher` - Spawns the child in its own process group with
//!   stdout and stderr piped separately
//! - Shell detection and executable resolution

pub mod command;
pub mod error;
pub mod launcher;
pub mod shell;

pub use command::{CommandParts, CommandSpec, Invocation};
pub use error::LaunchError;
pub use launcher::{GroupLauncher, Launcher};
pub use shell::{get_shell_command, resolve_executable_path};
