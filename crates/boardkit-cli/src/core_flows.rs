use boardkit_core::{parse_reference_args, PlatformId, PlatformReference};
use boardkit_index::PlatformIndex;
use boardkit_installer::{
    detect_skip_post_install, error_chain, platform_uninstall, read_platform_receipts,
    CancellationToken, DownloadManager, InstallError, InstallLock, InstallOptions, InstallOutcome,
    InstallReceipt, InstallRequest, InstallStatus, Orchestrator, PostInstallFlags,
    PrefixPackageManager, ProgressSender,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{OutputFormat, Settings};
use crate::dispatch::CliExit;
use crate::render::{print_json_line, spawn_progress_renderer, TerminalRenderer};

#[derive(Debug, Clone, Copy)]
pub(crate) struct InstallCommand<'a> {
    pub(crate) references: &'a [String],
    pub(crate) flags: PostInstallFlags,
    pub(crate) options: InstallOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct CommandResult {
    pub(crate) event: &'static str,
    pub(crate) operation: &'static str,
    pub(crate) reference: String,
    pub(crate) platform: String,
    pub(crate) status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) upgraded_from: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) installed_tools: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct CommandError {
    pub(crate) event: &'static str,
    pub(crate) operation: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) reference: Option<String>,
    pub(crate) message: String,
    pub(crate) bad_argument: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ListedPlatform {
    pub(crate) event: &'static str,
    pub(crate) id: String,
    pub(crate) package: String,
    pub(crate) architecture: String,
    pub(crate) version: String,
    pub(crate) installed_at_unix: u64,
}

pub(crate) fn run_core_install(
    settings: &Settings,
    command: InstallCommand<'_>,
    cancel: &CancellationToken,
) -> CliExit {
    let references = match parse_references(command.references) {
        Ok(references) => references,
        Err(err) => return report_early_failure(settings, "install", &err),
    };
    let skip_post_install = match detect_skip_post_install(command.flags, settings.interactive) {
        Ok(skip) => skip,
        Err(err) => return report_early_failure(settings, "install", &err),
    };

    let (_lock, pm) = match open_prefix(settings, "install") {
        Ok(opened) => opened,
        Err(err) => return report_early_failure(settings, "install", &err),
    };
    let downloader = match DownloadManager::new(settings.layout.clone()) {
        Ok(downloader) => downloader,
        Err(err) => {
            let err = InstallError::registry("preparing downloads", err);
            return report_early_failure(settings, "install", &err);
        }
    };

    let (progress, rx) = ProgressSender::channel();
    let renderer_thread = spawn_progress_renderer(rx, settings.format, settings.style);

    let mut results = Vec::with_capacity(references.len());
    {
        let orchestrator =
            Orchestrator::new(&pm, &downloader, command.options, progress, cancel.clone());
        for reference in references {
            let request = InstallRequest {
                reference: reference.clone(),
                skip_post_install,
            };
            let result = orchestrator.platform_install(&request);
            let stop = matches!(&result, Err(err) if err.is_cancelled());
            results.push((reference, result));
            if stop {
                break;
            }
        }
    }
    if renderer_thread.join().is_err() {
        warn!("progress renderer stopped unexpectedly");
    }

    let mut errors = Vec::new();
    for (reference, result) in &results {
        match result {
            Ok(outcome) => report_result(settings, &install_result(reference, outcome)),
            Err(err) => {
                report_error(settings, &command_error("install", Some(reference), err));
                errors.push(err);
            }
        }
    }
    exit_for_errors(errors)
}

pub(crate) fn run_core_uninstall(
    settings: &Settings,
    references: &[String],
    cancel: &CancellationToken,
) -> CliExit {
    let references = match parse_references(references) {
        Ok(references) => references,
        Err(err) => return report_early_failure(settings, "uninstall", &err),
    };
    let (_lock, pm) = match open_prefix(settings, "uninstall") {
        Ok(opened) => opened,
        Err(err) => return report_early_failure(settings, "uninstall", &err),
    };

    let (progress, rx) = ProgressSender::channel();
    let renderer_thread = spawn_progress_renderer(rx, settings.format, settings.style);

    let mut results = Vec::with_capacity(references.len());
    for reference in references {
        let result = platform_uninstall(&pm, &reference, &progress, cancel);
        let stop = matches!(&result, Err(err) if err.is_cancelled());
        results.push((reference, result));
        if stop {
            break;
        }
    }
    drop(progress);
    if renderer_thread.join().is_err() {
        warn!("progress renderer stopped unexpectedly");
    }

    let mut errors = Vec::new();
    for (reference, result) in &results {
        match result {
            Ok(platform) => report_result(settings, &uninstall_result(reference, platform)),
            Err(err) => {
                report_error(settings, &command_error("uninstall", Some(reference), err));
                errors.push(err);
            }
        }
    }
    exit_for_errors(errors)
}

pub(crate) fn run_core_list(settings: &Settings) -> CliExit {
    let receipts = match read_platform_receipts(&settings.layout) {
        Ok(receipts) => receipts,
        Err(err) => {
            let err = InstallError::registry("reading installed platforms", err);
            return report_early_failure(settings, "list", &err);
        }
    };

    let platforms = match receipts
        .iter()
        .map(listed_platform)
        .collect::<anyhow::Result<Vec<_>>>()
    {
        Ok(platforms) => platforms,
        Err(err) => {
            let err = InstallError::registry("reading installed platforms", err);
            return report_early_failure(settings, "list", &err);
        }
    };

    match settings.format {
        OutputFormat::Json => {
            for platform in &platforms {
                print_json_line(platform);
            }
        }
        OutputFormat::Text => {
            let renderer = TerminalRenderer::from_style(settings.style);
            renderer.print_lines(&format_list_lines(&platforms));
        }
    }
    CliExit::Success
}

fn parse_references(raw: &[String]) -> Result<Vec<PlatformReference>, InstallError> {
    parse_reference_args(raw)
        .map_err(|err| InstallError::invalid_argument("invalid platform reference", err))
}

fn open_prefix(
    settings: &Settings,
    operation: &str,
) -> Result<(InstallLock, PrefixPackageManager), InstallError> {
    settings
        .layout
        .ensure_base_dirs()
        .map_err(|err| InstallError::registry("preparing install prefix", err))?;
    let lock = InstallLock::acquire(&settings.layout, operation)?;
    debug!(
        prefix = %settings.layout.prefix().display(),
        index = %settings.index_root.display(),
        operation,
        "opened install prefix"
    );
    let pm = PrefixPackageManager::new(
        settings.layout.clone(),
        PlatformIndex::open(&settings.index_root),
    );
    Ok((lock, pm))
}

fn report_early_failure(
    settings: &Settings,
    operation: &'static str,
    err: &InstallError,
) -> CliExit {
    report_error(settings, &command_error(operation, None, err));
    exit_for_errors([err])
}

fn report_result(settings: &Settings, result: &CommandResult) {
    if settings.format == OutputFormat::Json {
        print_json_line(result);
    }
}

fn report_error(settings: &Settings, error: &CommandError) {
    match settings.format {
        OutputFormat::Json => print_json_line(error),
        OutputFormat::Text => TerminalRenderer::from_style(settings.style).print_error(&format!(
            "Error during {}: {}",
            error.operation, error.message
        )),
    }
}

pub(crate) fn exit_for_errors<'a>(errors: impl IntoIterator<Item = &'a InstallError>) -> CliExit {
    let mut exit = CliExit::Success;
    for err in errors {
        if err.is_bad_argument() {
            return CliExit::BadArgument;
        }
        exit = CliExit::Failure;
    }
    exit
}

pub(crate) fn install_result(
    reference: &PlatformReference,
    outcome: &InstallOutcome,
) -> CommandResult {
    let upgraded_from = match &outcome.status {
        InstallStatus::Upgraded { from } => Some(from.to_string()),
        InstallStatus::Installed | InstallStatus::AlreadyInstalled => None,
    };
    CommandResult {
        event: "result",
        operation: "install",
        reference: reference.to_string(),
        platform: outcome.platform.to_string(),
        status: outcome.status.as_str(),
        upgraded_from,
        installed_tools: outcome
            .installed_tools
            .iter()
            .map(ToString::to_string)
            .collect(),
        warnings: outcome.warnings.clone(),
    }
}

pub(crate) fn uninstall_result(
    reference: &PlatformReference,
    platform: &PlatformId,
) -> CommandResult {
    CommandResult {
        event: "result",
        operation: "uninstall",
        reference: reference.to_string(),
        platform: platform.to_string(),
        status: "uninstalled",
        upgraded_from: None,
        installed_tools: Vec::new(),
        warnings: Vec::new(),
    }
}

pub(crate) fn command_error(
    operation: &'static str,
    reference: Option<&PlatformReference>,
    err: &InstallError,
) -> CommandError {
    CommandError {
        event: "error",
        operation,
        reference: reference.map(ToString::to_string),
        message: error_chain(err),
        bad_argument: err.is_bad_argument(),
    }
}

fn listed_platform(receipt: &InstallReceipt) -> anyhow::Result<ListedPlatform> {
    let id = receipt.platform_id()?;
    Ok(ListedPlatform {
        event: "platform",
        id: id.to_string(),
        package: id.package.clone(),
        architecture: id.architecture.clone(),
        version: id.version.to_string(),
        installed_at_unix: receipt.installed_at_unix,
    })
}

pub(crate) fn format_list_lines(platforms: &[ListedPlatform]) -> Vec<String> {
    if platforms.is_empty() {
        return vec!["No platforms installed.".to_string()];
    }

    let width = platforms
        .iter()
        .map(|platform| platform.package.len() + platform.architecture.len() + 1)
        .max()
        .unwrap_or_default();
    platforms
        .iter()
        .map(|platform| {
            let name = format!("{}:{}", platform.package, platform.architecture);
            format!("{name:<width$}  {}", platform.version)
        })
        .collect()
}
