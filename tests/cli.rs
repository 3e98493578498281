// tests/cli.rs

use clap::{CommandFactory, Parser};
use crontask::cli::{CliArgs, LogLevel};

#[test]
fn config_mode_flags() {
    let args = CliArgs::try_parse_from([
        "crontask",
        "--config",
        "/etc/crontask/backup.toml",
        "--log-level",
        "debug",
        "--dry-run",
    ])
    .expect("parses");

    assert_eq!(args.config.as_deref(), Some("/etc/crontask/backup.toml"));
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    assert!(args.dry_run);
    assert!(!args.once);
    assert!(args.command.is_empty());
}

#[test]
fn trailing_command_keeps_its_own_flags() {
    let args = CliArgs::try_parse_from(["crontask", "--once", "backup.sh", "--full", "-v"])
        .expect("parses");

    assert!(args.once);
    assert_eq!(args.command, vec!["backup.sh", "--full", "-v"]);
}

#[test]
fn unknown_log_level_is_rejected() {
    assert!(CliArgs::try_parse_from(["crontask", "--log-level", "loud"]).is_err());
}

#[test]
fn config_help_mentions_changed_defaults() {
    let help = CliArgs::command().render_long_help().to_string();

    assert!(help.contains("Crontask.toml"), "{help}");
    assert!(help.contains("./config.json"), "{help}");
    assert!(help.contains("Asia/Shanghai"), "{help}");
}
