//! CLI output formatting

use crate::backup::leftover_install_dir;
use crate::core::Outcome;
use crate::execution::OutlineItem;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static PACKAGE: Emoji<'_, '_> = Emoji("📦 ", "# ");

/// Spinner shown while the backup runs
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        spinner.set_style(template);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Horizontal rule as wide as the terminal
pub fn separator() -> String {
    // Get terminal width, default to 80 if unavailable
    let width = term_size::dimensions_stdout().map(|(w, _)| w).unwrap_or(80);
    "─".repeat(width)
}

/// Steps of a dry run, indented by nesting level
pub fn format_outline(items: &[OutlineItem]) -> String {
    items
        .iter()
        .map(|item| {
            let indent = "  ".repeat(item.depth + 1);
            if item.is_fallback {
                format!("{}{} {}", indent, style("or else").dim(), item.description)
            } else {
                format!("{}{}", indent, item.description)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Final report for a run
pub fn format_outcome(outcome: &Outcome, elapsed: Duration) -> String {
    if outcome.is_success() {
        let mut lines = vec![format!(
            "{} Backed up {} tarball(s) in {}",
            CHECK,
            style(outcome.payload().len()).cyan(),
            format_duration(elapsed)
        )];
        lines.extend(
            outcome
                .payload()
                .iter()
                .filter_map(|value| value.as_str())
                .map(|path| format!("  {}{}", PACKAGE, path)),
        );
        lines.join("\n")
    } else {
        let mut report = format!(
            "{} Backup {} (exit code {})\n{}",
            CROSS,
            style("failed").red(),
            outcome.exit_code(),
            style(outcome.error_message()).dim()
        );
        if let Some(dir) = leftover_install_dir(outcome) {
            report.push_str(&format!(
                "\n{}Temporary install directory left in place: {}",
                WARN,
                style(dir.display()).bold()
            ));
        }
        report
    }
}

/// Format a duration as a short human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}.{}s", secs, duration.subsec_millis() / 100)
    } else {
        format!("{}ms", duration.as_millis())
    }
}
