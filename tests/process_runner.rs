#![cfg(unix)]

mod common;

use std::sync::Arc;

use common::{init_tracing, wait_lines, wait_terminal};
use runcast::errors::RuncastError;
use runcast::exec::{CommandSpec, ProcessRunner, SystemProbe, ToolProbe};
use runcast::registry::RunState;
use runcast_test_utils::builders::registry_with;

fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("sh").args(["-c", script])
}

#[tokio::test]
async fn test_real_process_output_and_exit_code() {
    init_tracing();
    let (registry, _) = registry_with(Arc::new(ProcessRunner::new()));

    let id = registry
        .create_run(sh("echo hello; echo oops 1>&2; exit 3"))
        .unwrap();
    let state = wait_terminal(&registry, &id).await;
    assert_eq!(state, RunState::Exited { code: Some(3) });

    let lines = registry.get_run(&id).unwrap().lines;
    assert!(lines.contains(&"hello".to_string()));
    assert!(lines.contains(&"oops".to_string()));
    assert_eq!(lines.last().map(String::as_str), Some("Process exited with code 3"));
}

#[tokio::test]
async fn test_cwd_and_env_are_applied() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, _) = registry_with(Arc::new(ProcessRunner::new()));

    let spec = sh("echo \"$GREETING\"; pwd")
        .current_dir(dir.path())
        .env("GREETING", "hi there");
    let id = registry.create_run(spec).unwrap();
    assert!(wait_terminal(&registry, &id).await.is_success());

    let lines = registry.get_run(&id).unwrap().lines;
    assert_eq!(lines[0], "hi there");
    let canonical = dir.path().canonicalize().unwrap();
    assert_eq!(
        std::path::Path::new(&lines[1]).canonicalize().unwrap(),
        canonical
    );
}

#[tokio::test]
async fn test_progress_redraw_keeps_final_text() {
    let (registry, _) = registry_with(Arc::new(ProcessRunner::new()));

    let id = registry
        .create_run(sh("printf 'step 1\\n'; printf '10%%\\r50%%\\r100%%\\n'"))
        .unwrap();
    wait_terminal(&registry, &id).await;

    assert_eq!(
        registry.get_run(&id).unwrap().lines,
        vec!["step 1", "100%", "Process exited with code 0"]
    );
}

#[tokio::test]
async fn test_missing_binary_is_launch_error() {
    let (registry, _) = registry_with(Arc::new(ProcessRunner::new()));

    let err = registry
        .create_run(CommandSpec::new("definitely-not-a-real-binary-4821"))
        .unwrap_err();
    assert!(matches!(err, RuncastError::Launch { .. }));
}

#[tokio::test]
async fn test_cancel_kills_real_process() {
    let (registry, _) = registry_with(Arc::new(ProcessRunner::new()));

    let id = registry.create_run(sh("echo started; exec sleep 30")).unwrap();
    wait_lines(&registry, &id, 1).await;

    registry.cancel_run(&id).unwrap();
    let state = wait_terminal(&registry, &id).await;
    assert_eq!(state, RunState::Cancelled { code: None });
    assert_eq!(
        registry.get_run(&id).unwrap().lines.last().map(String::as_str),
        Some("Process terminated by signal")
    );
}

#[tokio::test]
async fn test_system_probe_detects_tools() {
    let probe = SystemProbe;
    assert!(probe.probe("sh", &["-c", "exit 0"]).await);
    assert!(!probe.probe("sh", &["-c", "exit 1"]).await);
    assert!(!probe.probe("definitely-not-a-real-binary-4821", &["--version"]).await);
}

#[tokio::test]
async fn test_venv_interpreter_launches_from_relative_project_dir() {
    use std::os::unix::fs::PermissionsExt;
    use runcast::install::plan::{pip_upgrade, python_requirement_attempts, venv_python_path};

    // A project directory given relative to our own working directory.
    let dir = tempfile::tempdir_in(".").unwrap();
    let project_dir = std::path::Path::new(".").join(dir.path().file_name().unwrap());
    assert!(project_dir.is_relative());

    let bin = project_dir.join(".venv/bin");
    std::fs::create_dir_all(&bin).unwrap();
    let python = bin.join("python");
    std::fs::write(&python, "#!/bin/sh\necho \"fake python $1 $2\"\n").unwrap();
    std::fs::set_permissions(&python, std::fs::Permissions::from_mode(0o755)).unwrap();

    let venv_python = venv_python_path(&project_dir.join(".venv"));
    let attempts = python_requirement_attempts(&project_dir, &venv_python, None, false);
    let (registry, _) = registry_with(Arc::new(ProcessRunner::new()));

    for spec in [pip_upgrade(&project_dir, &venv_python), attempts[0].spec.clone()] {
        assert!(std::path::Path::new(&spec.program).is_absolute());
        let id = registry.create_run(spec).unwrap();
        assert_eq!(
            wait_terminal(&registry, &id).await,
            RunState::Exited { code: Some(0) }
        );
        assert_eq!(registry.get_run(&id).unwrap().lines[0], "fake python -m pip");
    }
}
