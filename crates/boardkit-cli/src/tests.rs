use super::*;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use boardkit_core::{parse_version, PlatformId, PlatformReference, ToolId};
use boardkit_installer::{
    write_install_receipt, CancellationToken, InstallError, InstallLock, InstallOptions,
    InstallOutcome, InstallReceipt, InstallStatus, PostInstallFlags, PrefixLayout, ReceiptKind,
    TaskProgress,
};
use clap::error::ErrorKind;
use tracing::metadata::LevelFilter;

use crate::config::Settings;
use crate::core_flows::{
    command_error, exit_for_errors, format_list_lines, install_result, run_core_install,
    run_core_list, run_core_uninstall, InstallCommand, ListedPlatform,
};
use crate::logging::default_level;
use crate::render::{
    render_download_line, render_status_line, resolve_output_style, task_status, OutputStyle,
};

#[test]
fn core_install_parses_references_and_flags() {
    let cli = Cli::try_parse_from([
        "boardkit",
        "core",
        "install",
        "arduino:samd@1.8.9",
        "arduino:avr",
        "--skip-post-install",
        "--format",
        "json",
    ])
    .expect("command must parse");

    assert_eq!(cli.format, OutputFormat::Json);
    let Commands::Core(CoreCommands::Install(args)) = cli.command else {
        panic!("expected core install");
    };
    assert_eq!(args.references, vec!["arduino:samd@1.8.9", "arduino:avr"]);
    assert!(args.skip_post_install);
    assert!(!args.run_post_install);
    assert!(!args.continue_on_tool_error);
}

#[test]
fn core_install_requires_a_reference() {
    let err = Cli::try_parse_from(["boardkit", "core", "install"])
        .expect_err("missing reference must fail");
    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn global_options_are_accepted_after_the_subcommand() {
    let cli = Cli::try_parse_from([
        "boardkit",
        "core",
        "list",
        "--prefix",
        "/tmp/boardkit-prefix",
        "--index-root",
        "/tmp/boardkit-index",
        "-vv",
    ])
    .expect("command must parse");

    assert_eq!(cli.prefix, Some(PathBuf::from("/tmp/boardkit-prefix")));
    assert_eq!(cli.index_root, Some(PathBuf::from("/tmp/boardkit-index")));
    assert_eq!(cli.verbose, 2);
    assert!(matches!(cli.command, Commands::Core(CoreCommands::List)));
}

#[test]
fn exit_codes_match_documented_classes() {
    assert_eq!(CliExit::Success.code(), 0);
    assert_eq!(CliExit::Failure.code(), 1);
    assert_eq!(CliExit::BadArgument.code(), 6);
}

#[test]
fn exit_for_errors_prefers_bad_argument() {
    let locked = InstallError::Locked {
        holder: "pid=1".to_string(),
    };
    assert_eq!(exit_for_errors(Vec::<&InstallError>::new()), CliExit::Success);
    assert_eq!(exit_for_errors([&locked]), CliExit::Failure);
    assert_eq!(
        exit_for_errors([&locked, &InstallError::ConflictingFlags]),
        CliExit::BadArgument
    );
}

#[test]
fn conflicting_flags_fail_before_touching_the_prefix() {
    let settings = test_settings();
    let references = vec!["arduino:samd".to_string()];

    let exit = run_core_install(
        &settings,
        InstallCommand {
            references: &references,
            flags: PostInstallFlags {
                run_post_install: true,
                skip_post_install: true,
            },
            options: InstallOptions::default(),
        },
        &CancellationToken::new(),
    );

    assert_eq!(exit, CliExit::BadArgument);
    assert!(!settings.layout.prefix().exists());
}

#[test]
fn unparseable_reference_is_a_bad_argument() {
    let settings = test_settings();
    let references = vec!["arduino".to_string()];

    let install = run_core_install(
        &settings,
        InstallCommand {
            references: &references,
            flags: PostInstallFlags::default(),
            options: InstallOptions::default(),
        },
        &CancellationToken::new(),
    );
    let uninstall = run_core_uninstall(&settings, &references, &CancellationToken::new());

    assert_eq!(install, CliExit::BadArgument);
    assert_eq!(uninstall, CliExit::BadArgument);
    assert!(!settings.layout.prefix().exists());
}

#[test]
fn install_fails_while_another_operation_holds_the_lock() {
    let settings = test_settings();
    let _lock = InstallLock::acquire(&settings.layout, "uninstall").expect("must lock");
    let references = vec!["arduino:samd".to_string()];

    let exit = run_core_install(
        &settings,
        InstallCommand {
            references: &references,
            flags: PostInstallFlags::default(),
            options: InstallOptions::default(),
        },
        &CancellationToken::new(),
    );

    assert_eq!(exit, CliExit::Failure);
    assert!(settings.layout.lock_path().exists());

    let _ = fs::remove_dir_all(settings.layout.prefix());
}

#[test]
fn unknown_platform_fails_and_releases_the_lock() {
    let settings = test_settings();
    let references = vec!["arduino:samd".to_string(), "arduino:avr".to_string()];

    let exit = run_core_install(
        &settings,
        InstallCommand {
            references: &references,
            flags: PostInstallFlags::default(),
            options: InstallOptions::default(),
        },
        &CancellationToken::new(),
    );

    assert_eq!(exit, CliExit::Failure);
    assert!(!settings.layout.lock_path().exists());

    let _ = fs::remove_dir_all(settings.layout.prefix());
}

#[test]
fn list_reports_installed_platforms() {
    let settings = test_settings();
    assert_eq!(run_core_list(&settings), CliExit::Success);

    write_install_receipt(
        &settings.layout,
        &InstallReceipt {
            kind: ReceiptKind::Platform,
            packager: "arduino".to_string(),
            name: "samd".to_string(),
            version: "1.8.9".to_string(),
            archive_file_name: None,
            checksum: None,
            installed_at_unix: 7,
        },
    )
    .expect("must write receipt");
    assert_eq!(run_core_list(&settings), CliExit::Success);

    let _ = fs::remove_dir_all(settings.layout.prefix());
}

#[test]
fn format_list_lines_aligns_versions() {
    assert_eq!(format_list_lines(&[]), vec!["No platforms installed."]);

    let lines = format_list_lines(&[
        listed("arduino", "samd", "1.8.9"),
        listed("esp32", "esp32s3", "2.0.11"),
    ]);
    assert_eq!(
        lines,
        vec!["arduino:samd   1.8.9", "esp32:esp32s3  2.0.11"]
    );
}

#[test]
fn install_result_serializes_upgrades() {
    let outcome = InstallOutcome {
        platform: samd_id("1.8.9"),
        status: InstallStatus::Upgraded {
            from: samd_id("1.6.9"),
        },
        installed_tools: vec![ToolId::new(
            "arduino",
            "bossac",
            parse_version("1.9.1").expect("valid version"),
        )],
        warnings: Vec::new(),
    };
    let reference = PlatformReference::parse("arduino:samd").expect("reference must parse");

    let value = serde_json::to_value(install_result(&reference, &outcome)).expect("must serialize");
    assert_eq!(
        value,
        serde_json::json!({
            "event": "result",
            "operation": "install",
            "reference": "arduino:samd",
            "platform": "arduino:samd@1.8.9",
            "status": "upgraded",
            "upgraded_from": "arduino:samd@1.6.9",
            "installed_tools": ["arduino:bossac@1.9.1"],
        })
    );
}

#[test]
fn command_error_carries_the_whole_chain() {
    let reference = PlatformReference::parse("arduino:samd").expect("reference must parse");
    let err = InstallError::ToolInstall {
        tool: ToolId::new(
            "arduino",
            "bossac",
            parse_version("1.9.1").expect("valid version"),
        ),
        source: anyhow::anyhow!("disk full"),
    };

    let rendered = command_error("install", Some(&reference), &err);
    assert_eq!(rendered.message, "installing tool arduino:bossac@1.9.1: disk full");
    assert_eq!(rendered.reference.as_deref(), Some("arduino:samd"));
    assert!(!rendered.bad_argument);
    assert!(command_error("install", None, &InstallError::ConflictingFlags).bad_argument);
}

#[test]
fn task_status_maps_installer_messages() {
    assert_eq!(
        task_status(&TaskProgress::named("Installing arduino:samd@1.8.9")),
        ("step", "Installing arduino:samd@1.8.9")
    );
    assert_eq!(
        task_status(&TaskProgress::named("arduino:samd@1.8.9 installed").completed()),
        ("ok", "arduino:samd@1.8.9 installed")
    );
    assert_eq!(
        task_status(&TaskProgress::message("WARNING: cannot run post install: boom")),
        ("warn", "WARNING: cannot run post install: boom")
    );
    assert_eq!(
        task_status(&TaskProgress::message("Error updating platform: boom")),
        ("warn", "Error updating platform: boom")
    );
    assert_eq!(
        task_status(&TaskProgress::message("Configuring platform")),
        ("step", "Configuring platform")
    );
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "arduino:samd@1.8.9 installed"),
        "arduino:samd@1.8.9 installed"
    );
}

#[test]
fn render_status_line_rich_includes_ascii_badge() {
    assert_eq!(
        render_status_line(OutputStyle::Rich, "ok", "arduino:samd@1.8.9 installed"),
        "[OK] arduino:samd@1.8.9 installed"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "warn", "cannot run post install"),
        "[WARN] cannot run post install"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "step", "Configuring platform"),
        "[..] Configuring platform"
    );
}

#[test]
fn resolve_output_style_needs_a_terminal_and_color() {
    assert_eq!(resolve_output_style(true, false), OutputStyle::Rich);
    assert_eq!(resolve_output_style(true, true), OutputStyle::Plain);
    assert_eq!(resolve_output_style(false, false), OutputStyle::Plain);
}

#[test]
fn render_download_line_reports_size() {
    assert_eq!(
        render_download_line("arduino:bossac@1.9.1", 2048, None),
        "arduino:bossac@1.9.1 downloaded (2.00 KiB)"
    );
}

#[test]
fn settings_default_index_root_and_json_forces_plain() {
    let layout = PrefixLayout::new("/opt/boardkit");
    let settings = Settings::from_parts(
        layout.clone(),
        None,
        OutputFormat::Json,
        OutputStyle::Rich,
        true,
    );
    assert_eq!(settings.index_root, PathBuf::from("/opt/boardkit/index"));
    assert_eq!(settings.style, OutputStyle::Plain);

    let settings = Settings::from_parts(
        layout,
        Some(Path::new("/srv/index")),
        OutputFormat::Text,
        OutputStyle::Rich,
        false,
    );
    assert_eq!(settings.index_root, PathBuf::from("/srv/index"));
    assert_eq!(settings.style, OutputStyle::Rich);
}

#[test]
fn verbosity_raises_default_log_level() {
    assert_eq!(default_level(0), LevelFilter::WARN);
    assert_eq!(default_level(1), LevelFilter::INFO);
    assert_eq!(default_level(2), LevelFilter::DEBUG);
    assert_eq!(default_level(9), LevelFilter::TRACE);
}

fn samd_id(raw: &str) -> PlatformId {
    PlatformId::new("arduino", "samd", parse_version(raw).expect("valid version"))
}

fn listed(package: &str, architecture: &str, version: &str) -> ListedPlatform {
    ListedPlatform {
        event: "platform",
        id: format!("{package}:{architecture}@{version}"),
        package: package.to_string(),
        architecture: architecture.to_string(),
        version: version.to_string(),
        installed_at_unix: 0,
    }
}

static TEST_LAYOUT_COUNTER: AtomicU64 = AtomicU64::new(0);

fn test_settings() -> Settings {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!(
        "boardkit-cli-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        TEST_LAYOUT_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    Settings::from_parts(
        PrefixLayout::new(path),
        None,
        OutputFormat::Text,
        OutputStyle::Plain,
        false,
    )
}
