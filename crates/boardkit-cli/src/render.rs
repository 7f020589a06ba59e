use std::collections::HashMap;
use std::io::IsTerminal;
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anstyle::{AnsiColor, Effects, Style};
use boardkit_installer::{DownloadProgress, ProgressEvent, TaskProgress};
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::warn;

use crate::config::OutputFormat;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn current_output_style() -> OutputStyle {
    resolve_output_style(
        std::io::stdout().is_terminal(),
        std::env::var_os("NO_COLOR").is_some(),
    )
}

pub(crate) fn resolve_output_style(stdout_is_tty: bool, no_color: bool) -> OutputStyle {
    if stdout_is_tty && !no_color {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct TerminalRenderer {
    style: OutputStyle,
}

struct TerminalProgress {
    style: OutputStyle,
    label: String,
    downloaded: u64,
    progress_bar: Option<ProgressBar>,
    started_at: Instant,
}

impl TerminalRenderer {
    pub(crate) fn from_style(style: OutputStyle) -> Self {
        Self { style }
    }

    pub(crate) fn print_status(self, status: &str, message: &str) {
        println!("{}", paint_status_line(self.style, status, message));
    }

    pub(crate) fn print_error(self, message: &str) {
        eprintln!("{}", paint_status_line(self.style, "error", message));
    }

    pub(crate) fn print_lines(self, lines: &[String]) {
        for line in lines {
            println!("{line}");
        }
    }

    fn start_download(self, label: &str, total: Option<u64>) -> TerminalProgress {
        let progress_bar = if self.style == OutputStyle::Rich {
            let (progress_bar, template) = match total {
                Some(total) => (
                    ProgressBar::new(total.max(1)),
                    "{spinner:.cyan.bold} {msg} [{bar:20.cyan/blue}] {bytes}/{total_bytes} {elapsed}",
                ),
                None => (
                    ProgressBar::new_spinner(),
                    "{spinner:.cyan.bold} {msg} {bytes} {elapsed_precise}",
                ),
            };
            if let Ok(style) = ProgressStyle::with_template(template) {
                progress_bar.set_style(style.tick_chars("|/-\\ ").progress_chars("=>-"));
            }
            progress_bar.set_message(label.to_string());
            progress_bar.enable_steady_tick(Duration::from_millis(80));
            Some(progress_bar)
        } else {
            None
        };

        TerminalProgress {
            style: self.style,
            label: label.to_string(),
            downloaded: 0,
            progress_bar,
            started_at: Instant::now(),
        }
    }
}

impl TerminalProgress {
    fn set(&mut self, downloaded: u64, total: Option<u64>) {
        self.downloaded = downloaded;

        let Some(progress_bar) = &self.progress_bar else {
            return;
        };
        if let Some(total) = total {
            progress_bar.set_length(total.max(1));
        }
        progress_bar.set_position(downloaded);
    }

    fn finish_success(mut self, downloaded: u64) {
        self.downloaded = downloaded;
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.finish_and_clear();
        }
        println!(
            "{}",
            paint_status_line(
                self.style,
                "ok",
                &render_download_line(
                    &self.label,
                    self.downloaded,
                    Some(self.started_at.elapsed())
                ),
            )
        );
    }

    fn finish_abandon(mut self) {
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.finish_and_clear();
        }
    }
}

/// Prints progress events as they arrive, one line (or bar) per event.
pub(crate) struct ProgressPrinter {
    format: OutputFormat,
    renderer: TerminalRenderer,
    downloads: HashMap<String, TerminalProgress>,
}

impl ProgressPrinter {
    pub(crate) fn new(format: OutputFormat, style: OutputStyle) -> Self {
        Self {
            format,
            renderer: TerminalRenderer::from_style(style),
            downloads: HashMap::new(),
        }
    }

    pub(crate) fn handle(&mut self, event: &ProgressEvent) {
        match self.format {
            OutputFormat::Json => print_json_line(event),
            OutputFormat::Text => match event {
                ProgressEvent::Task(task) => {
                    let (status, text) = task_status(task);
                    if !text.is_empty() {
                        self.renderer.print_status(status, text);
                    }
                }
                ProgressEvent::Download(download) => self.handle_download(download),
            },
        }
    }

    fn handle_download(&mut self, download: &DownloadProgress) {
        if download.completed {
            match self.downloads.remove(&download.artifact) {
                Some(progress) => progress.finish_success(download.downloaded),
                None => self.renderer.print_status(
                    "ok",
                    &format!("{} already downloaded", download.artifact),
                ),
            }
            return;
        }

        let renderer = self.renderer;
        self.downloads
            .entry(download.artifact.clone())
            .or_insert_with(|| renderer.start_download(&download.artifact, download.total))
            .set(download.downloaded, download.total);
    }

    pub(crate) fn finish(&mut self) {
        for (_, progress) in self.downloads.drain() {
            progress.finish_abandon();
        }
    }
}

/// Drains `rx` on a dedicated thread until every sender is dropped.
pub(crate) fn spawn_progress_renderer(
    rx: Receiver<ProgressEvent>,
    format: OutputFormat,
    style: OutputStyle,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut printer = ProgressPrinter::new(format, style);
        for event in rx {
            printer.handle(&event);
        }
        printer.finish();
    })
}

pub(crate) fn print_json_line<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(err) => warn!(error = %err, "failed to serialize output"),
    }
}

/// Status and text for a task event: warnings and errors reported by the
/// installer arrive as bare messages.
pub(crate) fn task_status(task: &TaskProgress) -> (&'static str, &str) {
    if task.name.is_empty() {
        let status = if task.message.starts_with("WARNING") || task.message.starts_with("Error") {
            "warn"
        } else {
            "step"
        };
        return (status, &task.message);
    }
    if task.completed {
        ("ok", &task.name)
    } else {
        ("step", &task.name)
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {message}", status_badge(status)),
    }
}

fn paint_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => render_status_line(style, status, message),
        OutputStyle::Rich => format!(
            "{} {message}",
            colorize(badge_style(status), status_badge(status))
        ),
    }
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "warn" => "[WARN]",
        "error" => "[ERR]",
        _ => "[..]",
    }
}

fn badge_style(status: &str) -> Style {
    let color = match status {
        "ok" => AnsiColor::BrightGreen,
        "warn" => AnsiColor::BrightYellow,
        "error" => AnsiColor::BrightRed,
        _ => AnsiColor::BrightBlue,
    };
    Style::new()
        .fg_color(Some(color.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let millis = elapsed.subsec_millis();
    format!("{secs}.{millis:03}s")
}

pub(crate) fn render_download_line(
    label: &str,
    downloaded: u64,
    elapsed: Option<Duration>,
) -> String {
    let suffix = elapsed
        .map(|value| format!(" in {}", format_elapsed(value)))
        .unwrap_or_default();
    format!("{label} downloaded ({}){suffix}", HumanBytes(downloaded))
}
