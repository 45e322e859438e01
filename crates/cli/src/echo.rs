use std::time::{Duration, SystemTime};

use owo_colors::OwoColorize;
use xtractor_core::{Extraction, InlineReport};

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!(
        "\n{} {} {}",
        "X-Tractor".bold().bright_blue(),
        "v".dimmed(),
        VERSION.dimmed()
    );
    eprintln!("{}", "Save X posts, Medium stories and web articles\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Labelled value, indented under the current step.
pub fn print_field(label: &str, value: &str) {
    eprintln!("  {} {}", format!("{}:", label).dimmed(), value.bright_white());
}

/// "Images converted: N/M", colored by how many made it.
pub fn print_images(report: &InlineReport) {
    let line = format!("Images converted: {}/{}", report.converted, report.found);
    if report.failures.is_empty() {
        print_success(&line);
    } else {
        print_warning(&line);
        for failure in &report.failures {
            eprintln!("  {} {} {}", "✗".red(), failure.url.dimmed(), failure.reason.bright_red());
        }
    }
}

/// One-screen summary of a finished run.
pub fn print_extraction_details(extraction: &Extraction, elapsed: Duration) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Extraction Details".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());
    print_field("Source", extraction.source.label());
    if !extraction.title.is_empty() {
        print_field("Title", &extraction.title);
    }
    if !extraction.byline.is_empty() {
        print_field("Author", &extraction.byline);
    }
    print_field("Format", &extraction.format);
    print_field("Size", &format_size(extraction.artifact.len()));
    print_field("Elapsed", &format!("{:.2}s", elapsed.as_secs_f64()));
    eprintln!("{}", "═".repeat(60).dimmed());
}

/// Age of a saved session, in whole hours.
pub fn session_age_hours(saved_at: SystemTime) -> u64 {
    SystemTime::now()
        .duration_since(saved_at)
        .map(|age| age.as_secs() / 3600)
        .unwrap_or_default()
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_session_age_hours() {
        let saved = SystemTime::now() - Duration::from_secs(5 * 3600 + 120);
        assert_eq!(session_age_hours(saved), 5);
        assert_eq!(session_age_hours(SystemTime::now() + Duration::from_secs(60)), 0);
    }
}
