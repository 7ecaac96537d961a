use clap::Parser;
use runcast::cli::{CliArgs, Command};
use runcast::types::{InstallAfter, InstallOnly, PackageManagerChoice, UpdateMode, UpdateScope};

#[test]
fn test_install_flags() {
    let args = CliArgs::try_parse_from([
        "runcast",
        "install",
        "--only",
        "python",
        "--py",
        "uv",
        "--force",
        "--dry-run",
        "--pip-index",
        "https://mirror.example/simple",
    ])
    .unwrap();

    match args.command {
        Command::Install(install) => {
            assert_eq!(install.only, InstallOnly::Python);
            assert!(install.force && install.dry_run);
            assert_eq!(install.pm, None);
            assert_eq!(
                install.pip_index.as_deref(),
                Some("https://mirror.example/simple")
            );
        }
        other => panic!("expected install, got {other:?}"),
    }
}

#[test]
fn test_update_defaults() {
    let args = CliArgs::try_parse_from(["runcast", "update"]).unwrap();
    match args.command {
        Command::Update(update) => {
            assert_eq!(update.mode, UpdateMode::Safe);
            assert_eq!(update.scope, UpdateScope::All);
            assert_eq!(update.install, InstallAfter::Node);
            assert_eq!(update.pm, None);
        }
        other => panic!("expected update, got {other:?}"),
    }
}

#[test]
fn test_update_accepts_aliases_and_global_flags() {
    let args = CliArgs::try_parse_from([
        "runcast",
        "update",
        "--mode",
        "forced",
        "--install",
        "dependencies-only",
        "--config",
        "ops/Runcast.toml",
        "--log-level",
        "debug",
    ])
    .unwrap();

    assert_eq!(args.config.as_deref(), Some("ops/Runcast.toml"));
    assert!(args.log_level.is_some());
    match args.command {
        Command::Update(update) => {
            assert_eq!(update.mode, UpdateMode::Force);
            assert_eq!(update.install, InstallAfter::Node);
        }
        other => panic!("expected update, got {other:?}"),
    }
}

#[test]
fn test_update_package_manager_is_optional() {
    let args = CliArgs::try_parse_from(["runcast", "update", "--pm", "npm"]).unwrap();
    match args.command {
        Command::Update(update) => assert_eq!(update.pm, Some(PackageManagerChoice::Npm)),
        other => panic!("expected update, got {other:?}"),
    }
}

#[test]
fn test_invalid_values_are_rejected() {
    assert!(CliArgs::try_parse_from(["runcast", "update", "--mode", "sideways"]).is_err());
    assert!(CliArgs::try_parse_from(["runcast", "install", "--pm", "yarn"]).is_err());
    assert!(CliArgs::try_parse_from(["runcast"]).is_err());
}
