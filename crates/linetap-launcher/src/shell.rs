//! Cross-platform shell and executable lookup.

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

/// Returns the command interpreter and its "run this line" argument.
///
/// Returns `(shell_program, shell_arg)` where:
/// - Windows: `("cmd", "/C")`
/// - Unix-like: the user's `$SHELL` with `-c`, falling back to `/bin/sh`
#[must_use]
pub fn get_shell_command() -> (String, &'static str) {
    if cfg!(windows) {
        ("cmd".into(), "/C")
    } else {
        UnixShell::current_shell().get_shell_command()
    }
}

/// Resolve an executable by name.
///
/// The search order is:
/// 1. Explicit absolute paths that exist.
/// 2. Paths containing a separator are left for the OS to resolve.
/// 3. The current process PATH via `which`.
pub async fn resolve_executable_path(executable: &str) -> Option<PathBuf> {
    if executable.trim().is_empty() {
        return None;
    }

    let path = Path::new(executable);
    if path.is_absolute() {
        return path.is_file().then(|| path.to_path_buf());
    }
    if path.components().count() > 1 {
        return Some(path.to_path_buf());
    }

    which_async(executable).await
}

async fn which_async(executable: &str) -> Option<PathBuf> {
    let executable = executable.to_string();
    tokio::task::spawn_blocking(move || which::which(executable))
        .await
        .ok()
        .and_then(Result::ok)
}

/// Unix shell types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnixShell {
    Zsh(PathBuf),
    Bash(PathBuf),
    Sh(PathBuf),
    Other(PathBuf),
}

impl UnixShell {
    /// Get the shell path.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Zsh(p) | Self::Bash(p) | Self::Sh(p) | Self::Other(p) => p,
        }
    }

    /// Get the current shell from `$SHELL`.
    #[must_use]
    pub fn current_shell() -> Self {
        if let Ok(shell) = std::env::var("SHELL") {
            if let Some(shell) = Self::from_path(Path::new(&shell)) {
                return shell;
            }
        }
        Self::Sh(PathBuf::from("/bin/sh"))
    }

    /// Create from a path. The path must be absolute and exist.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        if !(path.is_absolute() && path.is_file()) {
            return None;
        }
        let path_buf = path.to_path_buf();
        let shell = match path.file_name().and_then(OsStr::to_str) {
            Some("zsh") => Self::Zsh(path_buf),
            Some("bash") => Self::Bash(path_buf),
            Some("sh") => Self::Sh(path_buf),
            _ => Self::Other(path_buf),
        };
        Some(shell)
    }

    /// Get shell command tuple.
    #[must_use]
    pub fn get_shell_command(&self) -> (String, &'static str) {
        (self.path().to_string_lossy().into_owned(), "-c")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_from_path_classifies_shells() {
        assert_eq!(
            UnixShell::from_path(Path::new("/bin/sh")),
            Some(UnixShell::Sh(PathBuf::from("/bin/sh")))
        );
        assert_eq!(UnixShell::from_path(Path::new("sh")), None);
        assert_eq!(UnixShell::from_path(Path::new("/definitely/not/a/shell")), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_command_uses_dash_c() {
        let (shell, flag) = get_shell_command();
        assert_eq!(flag, "-c");
        assert!(Path::new(&shell).is_absolute());
    }

    #[tokio::test]
    async fn test_resolve_missing_executable() {
        assert_eq!(resolve_executable_path("").await, None);
        assert_eq!(
            resolve_executable_path("linetap-no-such-program-xyz").await,
            None
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_from_path() {
        let found = resolve_executable_path("sh").await.unwrap();
        assert!(found.is_absolute());
    }
}
