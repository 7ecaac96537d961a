use std::sync::Arc;

use runcast::errors::RuncastError;
use runcast::exec::CommandSpec;
use runcast::install::{FallbackInstaller, InstallAttempt, InstallOutcome};
use runcast_test_utils::builders::registry_with;
use runcast_test_utils::doubles::RecordingSink;
use runcast_test_utils::fake_runner::{FakeRunner, ScriptedRun};

fn attempts() -> Vec<InstallAttempt> {
    vec![
        InstallAttempt::new("A", CommandSpec::new("attempt-a")),
        InstallAttempt::new("B", CommandSpec::new("attempt-b")),
        InstallAttempt::new("C", CommandSpec::new("attempt-c")),
    ]
}

fn installer(runner: &Arc<FakeRunner>, sink: &Arc<RecordingSink>) -> FallbackInstaller {
    let (_, broadcaster) = registry_with(runner.clone());
    FallbackInstaller::new(broadcaster, sink.clone())
}

#[tokio::test]
async fn test_first_success_stops_the_chain() {
    let runner = Arc::new(
        FakeRunner::new()
            .on("attempt-a", ScriptedRun::exits(1).chunk("mirror unreachable\n"))
            .on("attempt-b", ScriptedRun::exits(0).chunk("installed\n")),
    );
    let sink = Arc::new(RecordingSink::new());

    let outcome = installer(&runner, &sink)
        .install("deps", &attempts(), false)
        .await
        .unwrap();

    match &outcome {
        InstallOutcome::Installed {
            target,
            label,
            failures,
            ..
        } => {
            assert_eq!(target, "deps");
            assert_eq!(label, "B");
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].label, "A");
        }
        other => panic!("expected install, got {other:?}"),
    }
    assert_eq!(outcome.label(), Some("B"));
    assert!(outcome.run_id().is_some());

    assert_eq!(runner.launched_lines(), vec!["attempt-a", "attempt-b"]);
    assert_eq!(
        sink.steps(),
        vec![
            "Attempt 1/3: A",
            "Failed: A",
            "Attempt 2/3: B",
            "Success: B",
        ]
    );
    let output = sink.output_lines();
    assert!(output.contains(&"mirror unreachable".to_string()));
    assert!(output.contains(&"installed".to_string()));
}

#[tokio::test]
async fn test_all_attempts_failing_reports_each_one() {
    let runner = Arc::new(FakeRunner::new().with_default(ScriptedRun::exits(2)));
    let sink = Arc::new(RecordingSink::new());
    let list = &attempts()[..2];

    let err = installer(&runner, &sink)
        .install("deps", list, false)
        .await
        .unwrap_err();

    match &err {
        RuncastError::AggregateInstallFailure { target, failures } => {
            assert_eq!(target, "deps");
            let labels: Vec<_> = failures.iter().map(|f| f.label.as_str()).collect();
            assert_eq!(labels, vec!["A", "B"]);
            assert!(failures[1].error.contains("exited with code 2"));
        }
        other => panic!("expected aggregate failure, got {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains("All 2 install attempts failed for deps"));
    assert!(message.contains("B: 'attempt-b' exited with code 2"));
}

#[tokio::test]
async fn test_launch_error_falls_through_to_next_attempt() {
    let runner = Arc::new(
        FakeRunner::new()
            .on("attempt-a", ScriptedRun::launch_error("no such file"))
            .on("attempt-b", ScriptedRun::exits(0)),
    );
    let sink = Arc::new(RecordingSink::new());

    let outcome = installer(&runner, &sink)
        .install("deps", &attempts(), false)
        .await
        .unwrap();

    assert_eq!(outcome.label(), Some("B"));
    if let InstallOutcome::Installed { failures, .. } = outcome {
        assert!(failures[0].error.contains("attempt-a"));
    }
}

#[tokio::test]
async fn test_signal_and_cancel_count_as_failures() {
    let runner = Arc::new(
        FakeRunner::new()
            .on("attempt-a", ScriptedRun::killed_by_signal())
            .on("attempt-b", ScriptedRun::fails("wait failed"))
            .on("attempt-c", ScriptedRun::exits(0)),
    );
    let sink = Arc::new(RecordingSink::new());

    let outcome = installer(&runner, &sink)
        .install("deps", &attempts(), false)
        .await
        .unwrap();
    assert_eq!(outcome.label(), Some("C"));
}

#[tokio::test]
async fn test_dry_run_reports_without_launching() {
    let runner = Arc::new(FakeRunner::new());
    let sink = Arc::new(RecordingSink::new());

    let outcome = installer(&runner, &sink)
        .install("deps", &attempts(), true)
        .await
        .unwrap();

    let reports = match outcome {
        InstallOutcome::DryRun { reports, .. } => reports,
        other => panic!("expected dry run, got {other:?}"),
    };
    assert_eq!(reports.len(), 3);
    let positions: Vec<_> = reports.iter().map(|r| (r.position, r.total)).collect();
    assert_eq!(positions, vec![(1, 3), (2, 3), (3, 3)]);
    assert_eq!(reports[0].to_string(), "[DRY] Attempt 1/3: A (attempt-a)");

    assert!(runner.launched().is_empty());
    assert!(sink.has_step("[DRY] Attempt 3/3: C"));
}

#[tokio::test]
async fn test_empty_attempt_list_fails() {
    let runner = Arc::new(FakeRunner::new());
    let sink = Arc::new(RecordingSink::new());

    let err = installer(&runner, &sink)
        .install("deps", &[], false)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RuncastError::AggregateInstallFailure { ref failures, .. } if failures.is_empty()
    ));
}

#[tokio::test]
async fn test_same_target_installs_are_serialised() {
    let gate = Arc::new(tokio::sync::Notify::new());
    let runner = Arc::new(
        FakeRunner::new()
            .on("first", ScriptedRun::exits(0).gate(&gate))
            .on("second", ScriptedRun::exits(0)),
    );
    let sink = Arc::new(RecordingSink::new());
    let installer = installer(&runner, &sink);

    let first = [InstallAttempt::new("first", CommandSpec::new("first"))];
    let second = [InstallAttempt::new("second", CommandSpec::new("second"))];

    let a = installer.install("shared", &first, false);
    let b = installer.install("shared", &second, false);
    let observe = async {
        // Give both installs a chance to start.
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        let launched = runner.launched_lines();
        gate.notify_one();
        launched
    };

    let (a, b, launched_while_gated) = tokio::join!(a, b, observe);
    assert!(a.is_ok() && b.is_ok());
    assert_eq!(launched_while_gated, vec!["first"]);
    assert_eq!(runner.launched_lines(), vec!["first", "second"]);
}
