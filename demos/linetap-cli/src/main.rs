//! Run a command and log its output line by line.
//!
//! Run with: cargo run -p linetap-cli -- -- ls -la
//!
//! Stdout lines are logged at INFO, stderr lines at ERROR. The process exits
//! with the child's exit code.

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result, bail};
use clap::Parser;
use linetap_core::{LineSink, MuxConfig, RunResult, Strategy, TracingSink};
use linetap_launcher::{CommandSpec, GroupLauncher};
use linetap_mux::execute_with;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "linetap", version, about = "Run a command and log its output line by line")]
struct Cli {
    /// Run the command through the platform command interpreter.
    #[arg(long)]
    shell: bool,

    /// Working directory for the command.
    #[arg(long, value_name = "DIR")]
    cwd: Option<PathBuf>,

    /// Drain strategy: auto, readiness or reader-tasks.
    #[arg(long, default_value = "auto")]
    strategy: String,

    /// Readiness wait before the process is polled again.
    #[arg(long, value_name = "MS")]
    poll_interval_ms: Option<u64>,

    /// Kill the command after this many milliseconds.
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Print the run summary as JSON when the command finishes.
    #[arg(long)]
    json: bool,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,

    /// Run the built-in demonstration commands.
    #[arg(long, conflicts_with = "command")]
    demo: bool,

    /// Command and arguments.
    #[arg(last = true, value_name = "COMMAND")]
    command: Vec<String>,
}

impl Cli {
    fn config(&self) -> Result<MuxConfig> {
        let mut config = MuxConfig::from_env().context("Invalid LINETAP_* environment")?;
        if self.strategy != "auto" {
            config.strategy = Some(self.strategy.parse::<Strategy>()?);
        }
        if let Some(ms) = self.poll_interval_ms {
            if ms == 0 {
                bail!("--poll-interval-ms must be greater than zero");
            }
            config.poll_interval_ms = ms;
        }
        if self.timeout_ms.is_some() {
            config.run_timeout_ms = self.timeout_ms;
        }
        Ok(config)
    }

    fn command_spec(&self) -> Result<CommandSpec> {
        let spec = match self.command.as_slice() {
            [] => bail!("No command given (use `linetap -- <command>` or --demo)"),
            [line] if self.shell => CommandSpec::line(line.as_str()),
            argv => CommandSpec::argv(argv.iter().cloned()),
        };
        let spec = spec.shell(self.shell);
        Ok(match &self.cwd {
            Some(dir) => spec.cwd(dir),
            None => spec,
        })
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config()?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(ExitCode::SUCCESS);
    }

    if cli.demo {
        return run_demo(&config).await;
    }

    let spec = cli.command_spec()?;
    let result = run(&spec, &config).await?;
    if cli.json {
        println!("{}", serde_json::to_string(&result)?);
    }
    Ok(exit_code(result.exit_code))
}

/// Run one command, interrupting it on Ctrl-C.
async fn run(spec: &CommandSpec, config: &MuxConfig) -> Result<RunResult> {
    let (interrupt_tx, interrupt_rx) = tokio::sync::oneshot::channel();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping command");
            let _ = interrupt_tx.send(());
        }
    });

    let sink: Arc<dyn LineSink> = Arc::new(TracingSink::labeled(spec.display()));
    let result = execute_with(&GroupLauncher::new(), spec, sink, config, Some(interrupt_rx))
        .await
        .with_context(|| format!("Failed to run `{}`", spec.display()));
    ctrl_c.abort();

    let result = result?;
    if !result.success() {
        tracing::warn!(exit_code = result.exit_code, "Command exited with a failure code");
    }
    Ok(result)
}

/// A shell built-in, then a directory listing.
async fn run_demo(config: &MuxConfig) -> Result<ExitCode> {
    let listing = if cfg!(windows) {
        CommandSpec::argv(["cmd", "/c", "dir"]).shell(true)
    } else {
        CommandSpec::argv(["ls", "-la"])
    };
    let commands = [
        CommandSpec::line("echo this is a test command").shell(true),
        listing,
    ];

    let mut last = 0;
    for spec in &commands {
        last = run(spec, config).await?.exit_code;
    }
    Ok(exit_code(last))
}

fn exit_code(code: i32) -> ExitCode {
    u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
}
