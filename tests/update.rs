use std::path::Path;
use std::sync::Arc;

use runcast::errors::RuncastError;
use runcast::fs::mock::MockFileSystem;
use runcast::types::{InstallAfter, PackageManagerChoice, UpdateMode, UpdateScope};
use runcast::update::branch::parse_head_ref;
use runcast::update::{
    BranchSource, ReinstallOutcome, UpdateOptions, UpdateOrchestrator, resolve_branch,
};
use runcast_test_utils::builders::{ConfigFileBuilder, registry_with};
use runcast_test_utils::doubles::{RecordingSink, StaticHeadQuery, StaticProbe};
use runcast_test_utils::fake_runner::{FakeRunner, ScriptedRun};

/// Root checkout with one node project and one nested checkout.
fn repo_fs() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_dir("/ws/.git");
    fs.add_file("/ws/.git/HEAD", "ref: refs/heads/feature/x\n");
    fs.add_file("/ws/package.json", "{}");
    fs.add_dir("/ws/node_modules");
    fs.add_dir("/ws/sentra-a/.git");
    fs.add_dir("/ws/sentra-b");
    fs
}

struct Harness {
    runner: Arc<FakeRunner>,
    sink: Arc<RecordingSink>,
    orchestrator: UpdateOrchestrator,
}

fn harness(fs: MockFileSystem, probe: StaticProbe, head: Option<&str>, runner: FakeRunner) -> Harness {
    harness_with(ConfigFileBuilder::new(), fs, probe, head, runner)
}

fn harness_with(
    config: ConfigFileBuilder,
    fs: MockFileSystem,
    probe: StaticProbe,
    head: Option<&str>,
    runner: FakeRunner,
) -> Harness {
    let runner = Arc::new(runner);
    let sink = Arc::new(RecordingSink::new());
    let (_, broadcaster) = registry_with(runner.clone());
    let config = config
        .with_root("/ws")
        .with_default_branch("trunk")
        .build();
    let orchestrator = UpdateOrchestrator::new(
        broadcaster,
        Arc::new(fs),
        Arc::new(probe),
        sink.clone(),
        config,
    )
    .with_head_query(Arc::new(StaticHeadQuery(head.map(str::to_string))));
    Harness {
        runner,
        sink,
        orchestrator,
    }
}

fn opts(mode: UpdateMode, scope: UpdateScope, install_after: InstallAfter) -> UpdateOptions {
    UpdateOptions {
        mode,
        scope,
        install_after,
        ..UpdateOptions::default()
    }
}

fn git_lines(runner: &FakeRunner) -> Vec<String> {
    runner
        .launched_lines()
        .into_iter()
        .filter(|l| l.starts_with("git "))
        .collect()
}

#[test]
fn test_parse_head_ref_variants() {
    assert_eq!(parse_head_ref("ref: refs/heads/main\n").as_deref(), Some("main"));
    assert_eq!(
        parse_head_ref("ref: refs/heads/release/1.2-rc\n").as_deref(),
        Some("release/1.2-rc")
    );
    assert_eq!(
        parse_head_ref("ref: refs/remotes/origin/dev").as_deref(),
        Some("dev")
    );
    assert_eq!(parse_head_ref("4f1c2b9e0d1a2b3c4d5e6f708192a3b4c5d6e7f8\n"), None);
    assert_eq!(parse_head_ref(""), None);
}

#[tokio::test]
async fn test_branch_resolution_tiers() {
    let fs = repo_fs();
    let repo = Path::new("/ws");

    let from_git = resolve_branch(&StaticHeadQuery(Some("dev".into())), &fs, repo, "main").await;
    assert_eq!((from_git.name.as_str(), from_git.source), ("dev", BranchSource::GitQuery));

    let from_file = resolve_branch(&StaticHeadQuery(None), &fs, repo, "main").await;
    assert_eq!(
        (from_file.name.as_str(), from_file.source),
        ("feature/x", BranchSource::HeadFile)
    );

    let detached = MockFileSystem::new();
    detached.add_file("/ws/.git/HEAD", "4f1c2b9e\n");
    let fallback = resolve_branch(&StaticHeadQuery(None), &detached, repo, "main").await;
    assert_eq!((fallback.name.as_str(), fallback.source), ("main", BranchSource::Default));
}

#[tokio::test]
async fn test_safe_update_fast_forwards() {
    let h = harness(repo_fs(), StaticProbe::none(), None, FakeRunner::new());

    let report = h
        .orchestrator
        .run(&opts(UpdateMode::Safe, UpdateScope::Root, InstallAfter::None))
        .await
        .unwrap();

    assert_eq!(
        git_lines(&h.runner),
        vec!["git fetch --all --prune", "git pull --ff-only"]
    );
    let steps: Vec<_> = report.checkouts[0].steps.iter().map(|s| s.name).collect();
    assert_eq!(steps, vec!["fetch", "pull --ff-only"]);
    assert_eq!(report.reinstall, ReinstallOutcome::NotRequested);
    assert!(!report.is_partial());
    assert!(h.sink.has_step("Update complete."));
}

#[tokio::test]
async fn test_safe_update_falls_back_to_rebase() {
    let runner = FakeRunner::new().on("--ff-only", ScriptedRun::exits(128));
    let h = harness(repo_fs(), StaticProbe::none(), None, runner);

    let report = h
        .orchestrator
        .run(&opts(UpdateMode::Safe, UpdateScope::Root, InstallAfter::None))
        .await
        .unwrap();

    assert_eq!(
        git_lines(&h.runner),
        vec![
            "git fetch --all --prune",
            "git pull --ff-only",
            "git pull --rebase --autostash",
        ]
    );
    let steps: Vec<_> = report.checkouts[0].steps.iter().map(|s| s.name).collect();
    assert_eq!(steps, vec!["fetch", "pull --rebase --autostash"]);
    assert!(h.sink.has_step("retrying with rebase"));
}

#[tokio::test]
async fn test_failed_rebase_aborts_without_reinstall() {
    let runner = FakeRunner::new()
        .on("--ff-only", ScriptedRun::exits(128))
        .on("--rebase", ScriptedRun::exits(1).chunk("CONFLICT (content)\n"));
    let h = harness(repo_fs(), StaticProbe::with(["pnpm"]), None, runner);

    let err = h
        .orchestrator
        .run(&opts(UpdateMode::Safe, UpdateScope::All, InstallAfter::Node))
        .await
        .unwrap_err();

    match err {
        RuncastError::UpdateAborted { step, reason } => {
            assert_eq!(step, "pull --rebase --autostash");
            assert!(reason.contains("exited with code 1"));
        }
        other => panic!("expected aborted update, got {other:?}"),
    }
    let lines = h.runner.launched_lines();
    assert!(!lines.iter().any(|l| l.starts_with("pnpm")));
    // The nested checkout is never reached.
    assert_eq!(lines.len(), 3);
    assert!(h.sink.output_lines().contains(&"CONFLICT (content)".to_string()));
}

#[tokio::test]
async fn test_forced_update_resets_onto_detected_branch() {
    let h = harness(repo_fs(), StaticProbe::none(), Some("dev"), FakeRunner::new());

    let report = h
        .orchestrator
        .run(&opts(UpdateMode::Force, UpdateScope::Root, InstallAfter::None))
        .await
        .unwrap();

    assert_eq!(
        git_lines(&h.runner),
        vec![
            "git fetch --all --prune",
            "git reset --hard origin/dev",
            "git clean -fdx",
        ]
    );
    let branch = report.checkouts[0].branch.clone().unwrap();
    assert_eq!(branch.source, BranchSource::GitQuery);
    assert!(h
        .runner
        .launched()
        .iter()
        .all(|s| s.cwd.as_deref() == Some(Path::new("/ws"))));
}

#[tokio::test]
async fn test_forced_update_uses_head_file_then_default() {
    let h = harness(repo_fs(), StaticProbe::none(), None, FakeRunner::new());
    h.orchestrator
        .run(&opts(UpdateMode::Force, UpdateScope::Root, InstallAfter::None))
        .await
        .unwrap();
    assert!(git_lines(&h.runner).contains(&"git reset --hard origin/feature/x".to_string()));

    let fs = MockFileSystem::new();
    fs.add_dir("/ws/.git");
    let h = harness(fs, StaticProbe::none(), None, FakeRunner::new());
    let report = h
        .orchestrator
        .run(&opts(UpdateMode::Force, UpdateScope::Root, InstallAfter::None))
        .await
        .unwrap();
    assert!(git_lines(&h.runner).contains(&"git reset --hard origin/trunk".to_string()));
    assert_eq!(
        report.checkouts[0].branch.as_ref().map(|b| b.source),
        Some(BranchSource::Default)
    );
}

#[tokio::test]
async fn test_forced_update_stops_at_failed_fetch() {
    let runner = FakeRunner::new().on("git fetch", ScriptedRun::exits(1));
    let h = harness(repo_fs(), StaticProbe::none(), Some("main"), runner);

    let err = h
        .orchestrator
        .run(&opts(UpdateMode::Force, UpdateScope::Root, InstallAfter::None))
        .await
        .unwrap_err();
    assert!(matches!(err, RuncastError::UpdateAborted { ref step, .. } if step == "fetch"));
    assert_eq!(git_lines(&h.runner), vec!["git fetch --all --prune"]);
}

#[tokio::test]
async fn test_scope_all_updates_nested_checkouts() {
    let h = harness(repo_fs(), StaticProbe::none(), None, FakeRunner::new());

    let report = h
        .orchestrator
        .run(&opts(UpdateMode::Safe, UpdateScope::All, InstallAfter::None))
        .await
        .unwrap();

    let labels: Vec<_> = report.checkouts.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec![".", "sentra-a"]);
    assert_eq!(h.runner.launched().len(), 4);
    assert_eq!(
        h.runner.launched()[2].cwd.as_deref(),
        Some(Path::new("/ws/sentra-a"))
    );
}

#[tokio::test]
async fn test_missing_repository_is_a_hard_failure() {
    let fs = MockFileSystem::new();
    fs.add_file("/ws/package.json", "{}");
    let h = harness(fs, StaticProbe::none(), None, FakeRunner::new());

    let err = h
        .orchestrator
        .run(&opts(UpdateMode::Safe, UpdateScope::Root, InstallAfter::None))
        .await
        .unwrap_err();
    assert!(matches!(err, RuncastError::NoGitRepository(_)));
    assert!(h.runner.launched().is_empty());
}

#[tokio::test]
async fn test_missing_package_manager_fails_before_git() {
    let h = harness(repo_fs(), StaticProbe::none(), None, FakeRunner::new());

    let err = h
        .orchestrator
        .run(&opts(UpdateMode::Safe, UpdateScope::Root, InstallAfter::Node))
        .await
        .unwrap_err();
    assert!(matches!(err, RuncastError::NoPackageManager(_)));
    assert!(h.runner.launched().is_empty());
}

#[tokio::test]
async fn test_configured_package_manager_is_used_when_none_requested() {
    let h = harness_with(
        ConfigFileBuilder::new().with_package_manager(PackageManagerChoice::Npm),
        repo_fs(),
        StaticProbe::with(["pnpm", "npm"]),
        None,
        FakeRunner::new(),
    );

    h.orchestrator
        .run(&opts(UpdateMode::Safe, UpdateScope::Root, InstallAfter::Node))
        .await
        .unwrap();
    let lines = h.runner.launched_lines();
    assert!(lines.contains(&"npm install --production=false".to_string()));
    assert!(!lines.iter().any(|l| l.starts_with("pnpm ")));

    // An explicit choice still wins over the config.
    let h = harness_with(
        ConfigFileBuilder::new().with_package_manager(PackageManagerChoice::Npm),
        repo_fs(),
        StaticProbe::with(["pnpm", "npm"]),
        None,
        FakeRunner::new(),
    );
    h.orchestrator
        .run(&UpdateOptions {
            package_manager: Some(PackageManagerChoice::Pnpm),
            ..opts(UpdateMode::Safe, UpdateScope::Root, InstallAfter::Node)
        })
        .await
        .unwrap();
    assert!(h.runner.launched_lines().iter().any(|l| l.starts_with("pnpm install")));
}

#[tokio::test]
async fn test_reinstall_is_forced_after_update() {
    let h = harness(repo_fs(), StaticProbe::with(["npm"]), None, FakeRunner::new());

    let report = h
        .orchestrator
        .run(&opts(UpdateMode::Safe, UpdateScope::Root, InstallAfter::Node))
        .await
        .unwrap();

    // /ws has node_modules, yet the re-install still runs.
    assert!(h
        .runner
        .launched_lines()
        .contains(&"npm install --production=false".to_string()));
    assert!(matches!(report.reinstall, ReinstallOutcome::Completed(_)));
}

#[tokio::test]
async fn test_failed_reinstall_is_partial_success() {
    let runner = FakeRunner::new().on("pnpm install", ScriptedRun::exits(1));
    let h = harness(repo_fs(), StaticProbe::with(["pnpm"]), None, runner);

    let report = h
        .orchestrator
        .run(&opts(UpdateMode::Safe, UpdateScope::Root, InstallAfter::Node))
        .await
        .unwrap();

    assert!(report.is_partial());
    assert_eq!(report.checkouts[0].steps.len(), 2);
    match &report.reinstall {
        ReinstallOutcome::Failed(reason) => assert!(reason.contains("install attempts failed")),
        other => panic!("expected failed re-install, got {other:?}"),
    }
    assert!(h.sink.has_step("re-install failed"));
}
