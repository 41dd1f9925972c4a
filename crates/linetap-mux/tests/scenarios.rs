//! End-to-end runs against real child processes, under both strategies.

#![cfg(unix)]

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use futures::StreamExt;
use linetap_core::{LineSink, LogMsg, MsgStore, MuxConfig, RunResult, Strategy, StreamTag};
use linetap_launcher::{CommandSpec, GroupLauncher, LaunchError};
use linetap_mux::{ExecuteError, MuxError, execute, execute_detailed, execute_with};

const STRATEGIES: [Strategy; 2] = [Strategy::Readiness, Strategy::ReaderTasks];

fn config(strategy: Strategy) -> MuxConfig {
    MuxConfig {
        strategy: Some(strategy),
        ..MuxConfig::default()
    }
}

async fn run_shell(script: &str, strategy: Strategy) -> (RunResult, Arc<MsgStore>) {
    let store = Arc::new(MsgStore::new());
    let sink: Arc<dyn LineSink> = store.clone();
    let result = execute_detailed(&CommandSpec::line(script).shell(true), sink, &config(strategy))
        .await
        .unwrap();
    (result, store)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_lines_with_gap_arrive_in_order() {
    for strategy in STRATEGIES {
        let (result, store) = run_shell("echo A; sleep 0.5; echo B", strategy).await;

        assert_eq!(result.exit_code, 0, "{strategy}");
        assert_eq!(result.strategy, strategy);
        assert_eq!(store.lines(StreamTag::Stdout), vec!["A", "B"], "{strategy}");
        assert!(store.lines(StreamTag::Stderr).is_empty(), "{strategy}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stderr_only_with_exit_code() {
    for strategy in STRATEGIES {
        let (result, store) = run_shell("echo X >&2; exit 7", strategy).await;

        assert_eq!(result.exit_code, 7, "{strategy}");
        assert!(store.lines(StreamTag::Stdout).is_empty(), "{strategy}");
        assert_eq!(store.lines(StreamTag::Stderr), vec!["X"], "{strategy}");
        assert_eq!(result.lines.stderr, 1);
    }
}

#[tokio::test]
async fn test_missing_command_is_launch_error() {
    for strategy in STRATEGIES {
        let sink: Arc<dyn LineSink> = Arc::new(MsgStore::new());
        let err = execute(
            &CommandSpec::argv(["linetap-no-such-program-xyz"]),
            sink,
            &config(strategy),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExecuteError::Launch(LaunchError::NotFound(_))));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_interleaved_bursts_keep_per_stream_order() {
    let script = "i=0; while [ $i -lt 300 ]; do echo out$i; echo err$i >&2; i=$((i+1)); done";
    let expected_out: Vec<String> = (0..300).map(|i| format!("out{i}")).collect();
    let expected_err: Vec<String> = (0..300).map(|i| format!("err{i}")).collect();

    for strategy in STRATEGIES {
        let (result, store) = run_shell(script, strategy).await;

        assert_eq!(result.exit_code, 0);
        assert_eq!(store.lines(StreamTag::Stdout), expected_out, "{strategy}");
        assert_eq!(store.lines(StreamTag::Stderr), expected_err, "{strategy}");
        assert_eq!(result.lines.total(), 600);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_output_larger_than_pipe_buffer() {
    // Far beyond a 64 KiB pipe buffer on both streams at once.
    let script = "i=0; while [ $i -lt 20000 ]; do echo \"line $i of stdout padding padding\"; \
                  echo \"line $i of stderr padding padding\" >&2; i=$((i+1)); done";
    for strategy in STRATEGIES {
        let (result, store) = run_shell(script, strategy).await;

        assert_eq!(result.lines.stdout, 20000, "{strategy}");
        assert_eq!(result.lines.stderr, 20000, "{strategy}");
        assert_eq!(
            store.lines(StreamTag::Stdout).last().map(String::as_str),
            Some("line 19999 of stdout padding padding")
        );
    }
}

#[tokio::test]
async fn test_unterminated_final_fragment() {
    for strategy in STRATEGIES {
        let (_, store) = run_shell("printf 'one\\ntwo'; printf 'tail' >&2", strategy).await;

        assert_eq!(store.lines(StreamTag::Stdout), vec!["one", "two"], "{strategy}");
        assert_eq!(store.lines(StreamTag::Stderr), vec!["tail"], "{strategy}");
    }
}

#[tokio::test]
async fn test_silent_command_delivers_nothing() {
    for strategy in STRATEGIES {
        let (result, store) = run_shell("true", strategy).await;

        assert_eq!(result.exit_code, 0);
        assert_eq!(result.lines.total(), 0);
        assert!(result.read_errors.is_empty());
        assert!(store.get_history().is_empty(), "{strategy}");
    }
}

#[tokio::test]
async fn test_output_written_right_before_exit() {
    for strategy in STRATEGIES {
        for _ in 0..20 {
            let (result, store) = run_shell("echo last; echo gone >&2; exit 3", strategy).await;

            assert_eq!(result.exit_code, 3);
            assert_eq!(store.lines(StreamTag::Stdout), vec!["last"], "{strategy}");
            assert_eq!(store.lines(StreamTag::Stderr), vec!["gone"], "{strategy}");
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_background_job_output_after_exit() {
    // The shell exits at once; its background job keeps both pipes open.
    let script = "echo hi; (sleep 0.5; echo late; echo late-err >&2) &";
    for strategy in STRATEGIES {
        let (result, store) = run_shell(script, strategy).await;

        assert_eq!(result.exit_code, 0, "{strategy}");
        assert_eq!(store.lines(StreamTag::Stdout), vec!["hi", "late"], "{strategy}");
        assert_eq!(store.lines(StreamTag::Stderr), vec!["late-err"], "{strategy}");
    }
}

#[tokio::test]
async fn test_line_stream_ends_with_the_run() {
    for strategy in STRATEGIES {
        let (result, store) = run_shell("echo a; echo b", strategy).await;

        let lines = tokio::time::timeout(
            Duration::from_secs(5),
            store.line_stream(StreamTag::Stdout).collect::<Vec<_>>(),
        )
        .await
        .expect("line stream should end once the run finishes");

        let lines: Vec<String> = lines.into_iter().map(Result::unwrap).collect();
        assert_eq!(lines, vec!["a", "b"], "{strategy}");
        assert_eq!(
            store.get_history().last(),
            Some(&LogMsg::Finished),
            "{strategy}"
        );
        assert_eq!(result.exit_code, 0);
    }
}

#[tokio::test]
async fn test_signal_exit_code() {
    for strategy in STRATEGIES {
        let (result, _) = run_shell("kill -9 $$", strategy).await;
        assert_eq!(result.exit_code, 128 + 9, "{strategy}");
    }
}

#[tokio::test]
async fn test_working_directory() {
    let dir = std::env::temp_dir().canonicalize().unwrap();
    let store = Arc::new(MsgStore::new());
    let sink: Arc<dyn LineSink> = store.clone();

    let code = execute(
        &CommandSpec::argv(["pwd", "-P"]).cwd(&dir),
        sink,
        &MuxConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(code, 0);
    assert_eq!(
        store.lines(StreamTag::Stdout),
        vec![dir.display().to_string()]
    );
}

#[tokio::test]
async fn test_interrupt_kills_long_running_child() {
    for strategy in STRATEGIES {
        let store = Arc::new(MsgStore::new());
        let sink: Arc<dyn LineSink> = store.clone();
        let (tx, rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = tx.send(());
        });

        let started = Instant::now();
        let err = execute_with(
            &GroupLauncher::new(),
            &CommandSpec::line("echo started; sleep 30").shell(true),
            sink,
            &config(strategy),
            Some(rx),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExecuteError::Mux(MuxError::Interrupted)), "{strategy}");
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(store.lines(StreamTag::Stdout), vec!["started"]);
    }
}

#[tokio::test]
async fn test_run_timeout() {
    for strategy in STRATEGIES {
        let sink: Arc<dyn LineSink> = Arc::new(MsgStore::new());
        let config = MuxConfig {
            strategy: Some(strategy),
            run_timeout_ms: Some(150),
            ..MuxConfig::default()
        };

        let started = Instant::now();
        let err = execute(&CommandSpec::argv(["sleep", "30"]), sink, &config)
            .await
            .unwrap_err();

        assert!(matches!(err, ExecuteError::Mux(MuxError::TimedOut(_))), "{strategy}");
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
