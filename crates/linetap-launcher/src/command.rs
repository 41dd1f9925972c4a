//! Command construction.

use std::path::PathBuf;

use crate::{LaunchError, shell::get_shell_command};

/// How the command was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Program followed by its arguments.
    Argv(Vec<String>),
    /// A single command line.
    Line(String),
}

/// Parsed command parts (program + args).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandParts {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandParts {
    /// Create new command parts.
    #[must_use]
    pub const fn new(program: String, args: Vec<String>) -> Self {
        Self { program, args }
    }
}

/// What to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// The command itself.
    pub invocation: Invocation,
    /// Working directory; inherits the caller's when `None`.
    pub cwd: Option<PathBuf>,
    /// Hand the command line to the platform command interpreter.
    ///
    /// Required for interpreter built-ins with no standalone executable.
    pub use_shell: bool,
    /// Extra environment variables.
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    /// Launch a program with arguments.
    #[must_use]
    pub fn argv<I>(argv: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::from_invocation(Invocation::Argv(argv.into_iter().map(Into::into).collect()))
    }

    /// Launch a command line. Split into argv unless `shell(true)` is set.
    #[must_use]
    pub fn line<S: Into<String>>(line: S) -> Self {
        Self::from_invocation(Invocation::Line(line.into()))
    }

    const fn from_invocation(invocation: Invocation) -> Self {
        Self {
            invocation,
            cwd: None,
            use_shell: false,
            env: Vec::new(),
        }
    }

    /// Set the working directory.
    #[must_use]
    pub fn cwd<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Run through the command interpreter.
    #[must_use]
    pub const fn shell(mut self, use_shell: bool) -> Self {
        self.use_shell = use_shell;
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Resolve into the program and arguments actually spawned.
    ///
    /// # Errors
    /// Returns error if the command is empty or cannot be parsed or quoted.
    pub fn build(&self) -> Result<CommandParts, LaunchError> {
        if self.use_shell {
            let line = match &self.invocation {
                Invocation::Line(line) => line.clone(),
                Invocation::Argv(argv) => join_command_line(argv)?,
            };
            if line.trim().is_empty() {
                return Err(LaunchError::EmptyCommand);
            }
            let (shell, flag) = get_shell_command();
            return Ok(CommandParts::new(shell, vec![flag.to_string(), line]));
        }

        let mut parts = match &self.invocation {
            Invocation::Argv(argv) => argv.clone(),
            Invocation::Line(line) => split_command_line(line)?,
        };
        if parts.is_empty() || parts[0].is_empty() {
            return Err(LaunchError::EmptyCommand);
        }
        let program = parts.remove(0);
        Ok(CommandParts::new(program, parts))
    }

    /// Human-readable form for logs.
    #[must_use]
    pub fn display(&self) -> String {
        match &self.invocation {
            Invocation::Line(line) => line.clone(),
            Invocation::Argv(argv) => argv.join(" "),
        }
    }
}

fn join_command_line(argv: &[String]) -> Result<String, LaunchError> {
    #[cfg(windows)]
    {
        // cmd.exe applies its own quoting rules.
        Ok(argv.join(" "))
    }

    #[cfg(not(windows))]
    {
        Ok(shlex::try_join(argv.iter().map(String::as_str))?)
    }
}

fn split_command_line(input: &str) -> Result<Vec<String>, LaunchError> {
    #[cfg(windows)]
    {
        let parts = winsplit::split(input);
        if parts.is_empty() {
            Err(LaunchError::EmptyCommand)
        } else {
            Ok(parts)
        }
    }

    #[cfg(not(windows))]
    {
        shlex::split(input).ok_or_else(|| LaunchError::InvalidCommandLine(input.to_string()))
    }
}
