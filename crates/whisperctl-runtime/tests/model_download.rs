//! Integration tests for model downloads.
//!
//! Downloads run custom `/bin/sh -c` commands so no network or transcription
//! package is involved.

#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Fixture, TestStore, lines_on, wait_for_line};
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};
use whisperctl_core::{ControlError, StreamTag};
use whisperctl_runtime::{
    CancellationToken, DownloadCommand, ModelDownloader, NoopSink, ProcessSupervisor,
    channel_sink,
};

fn sh(script: &str) -> DownloadCommand {
    // `$0` inside the snippet is the model name
    DownloadCommand::custom("/bin/sh", ["-c", script, "{model}"])
}

#[tokio::test]
async fn successful_download_streams_progress() {
    let downloader = ModelDownloader::new("python3")
        .with_command(sh("echo \"fetching $0\"; echo '50%' >&2; echo done"));
    let (sink, mut rx) = channel_sink();

    assert_ok!(
        downloader
            .download("tiny", sink, CancellationToken::new())
            .await
    );

    let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert_eq!(
        lines_on(&events, StreamTag::Out),
        [
            "fetching tiny",
            "done",
            "Model 'tiny' downloaded successfully"
        ]
    );
    assert_eq!(lines_on(&events, StreamTag::Err), ["50%"]);
}

#[tokio::test]
async fn failed_download_has_no_completion_line() {
    let downloader = ModelDownloader::new("python3").with_command(sh("echo partial; exit 2"));
    let (sink, mut rx) = channel_sink();

    assert_err!(
        downloader
            .download("tiny", sink, CancellationToken::new())
            .await
    );
    let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert_eq!(lines_on(&events, StreamTag::Out), ["partial"]);
}

#[tokio::test]
async fn failed_download_reports_exit_code_and_stderr_tail() {
    let downloader = ModelDownloader::new("python3").with_command(sh(
        "i=0; while [ $i -lt 30 ]; do echo \"err $i\" >&2; i=$((i+1)); done; exit 4",
    ));

    let err = assert_err!(
        downloader
            .download("base", Arc::new(NoopSink), CancellationToken::new())
            .await
    );
    let ControlError::DownloadFailed {
        model,
        code,
        stderr_tail,
    } = err
    else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!(model, "base");
    assert_eq!(code, Some(4));
    assert_eq!(stderr_tail.len(), 20);
    assert_eq!(stderr_tail.first().map(String::as_str), Some("err 10"));
    assert_eq!(stderr_tail.last().map(String::as_str), Some("err 29"));
}

#[tokio::test]
async fn cancelled_download_stops_the_subprocess() {
    let downloader = ModelDownloader::new("python3")
        .with_command(sh("echo started; exec sleep 30"))
        .with_timings(Duration::from_secs(1), Duration::from_secs(1));
    let (sink, mut rx) = channel_sink();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    let begun = Instant::now();
    let (result, ()) = tokio::join!(downloader.download("small", sink, cancel), async move {
        wait_for_line(&mut rx, "started").await;
        trigger.cancel();
    });

    assert!(matches!(result, Err(ControlError::Cancelled)));
    assert!(begun.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn spawn_failure_is_reported() {
    let downloader = ModelDownloader::new("python3").with_command(DownloadCommand::custom(
        "/nonexistent/downloader",
        ["{model}"],
    ));

    let err = assert_err!(
        downloader
            .download("base", Arc::new(NoopSink), CancellationToken::new())
            .await
    );
    assert!(matches!(err, ControlError::SpawnFailed { .. }));
}

#[tokio::test]
async fn default_command_runs_through_the_validated_interpreter() {
    // The fake interpreter hands `-c <snippet>` to /bin/sh, which cannot
    // run Python, so the download fails after validation succeeded.
    let fixture = Fixture::new();
    let downloader = ModelDownloader::new(fixture.interpreter.display().to_string());

    let err = assert_err!(
        downloader
            .download("base", Arc::new(NoopSink), CancellationToken::new())
            .await
    );
    assert!(matches!(err, ControlError::DownloadFailed { .. }));
    assert!(!err.context_lines().is_empty());
}

#[tokio::test]
async fn supervisor_download_leaves_worker_state_alone() {
    let fixture = Fixture::new();
    let script = fixture.script("worker", "echo ready\nexec sleep 30\n");
    let (sink, mut rx) = channel_sink();
    let supervisor = ProcessSupervisor::new(fixture.store(&script), sink)
        .with_config(common::fast_config())
        .with_download_command(sh("echo \"got $0\""));

    assert_ok!(supervisor.start("base").await);
    wait_for_line(&mut rx, "ready").await;
    let before = supervisor.status().await;

    let (progress, mut progress_rx) = channel_sink();
    assert_ok!(
        supervisor
            .download_model("turbo", progress, CancellationToken::new())
            .await
    );
    wait_for_line(&mut progress_rx, "got turbo").await;

    let after = supervisor.status().await;
    assert!(after.is_running);
    assert_eq!(after.pid, before.pid);
    assert_eq!(after.model.as_deref(), Some("base"));
    assert!(rx.try_recv().is_err(), "download output must not reach the worker sink");

    assert_ok!(supervisor.stop(Duration::from_secs(5)).await);
}

#[tokio::test]
async fn supervisor_download_failure_sets_last_error() {
    let supervisor = ProcessSupervisor::new(TestStore::empty(), Arc::new(NoopSink))
        .with_download_command(sh("exit 1"));

    assert_err!(
        supervisor
            .download_model("base", Arc::new(NoopSink), CancellationToken::new())
            .await
    );
    let status = supervisor.status().await;
    assert!(
        status
            .last_error
            .is_some_and(|e| e.contains("Download of model 'base' failed"))
    );
}
