//! Progress reporting and console output for scan/list/compare modes.

use crate::scan::walker::WalkStats;
use crate::scan::ScanResult;
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while a scan is running
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .expect("Invalid progress template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Refresh the spinner message with the current counters
    pub fn update(&self, stats: &WalkStats) {
        let msg = format!(
            "Dirs: {} | Files: {} | Size: {} | Errors: {}",
            format_number(stats.dirs),
            format_number(stats.files),
            format_size(stats.bytes, BINARY),
            format_number(stats.errors),
        );
        self.bar.set_message(msg);
    }

    /// Finish the spinner with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header at the start of a scan
pub fn print_scan_header(root: &str, hashing: bool, catalog: &str) {
    println!();
    println!(
        "{} {}",
        style("dircat").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Root:").bold(), root);
    println!(
        "  {} {}",
        style("Hashing:").bold(),
        if hashing { "enabled" } else { "disabled" }
    );
    println!("  {} {}", style("Catalog:").bold(), catalog);
    println!();
}

/// Print a summary after one root's scan commits
pub fn print_scan_summary(result: &ScanResult) {
    let stats = &result.stats;
    let secs = result.duration.as_secs_f64();

    println!();
    if stats.completed {
        println!("{}", style("Scan Complete").green().bold());
    } else {
        println!("{}", style("Scan Interrupted (partial results committed)").yellow().bold());
    }
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Scan id:").bold(), result.scan_id);
    println!(
        "  {} {}",
        style("Directories:").bold(),
        format_number(stats.dirs)
    );
    println!("  {} {}", style("Files:").bold(), format_number(stats.files));
    println!(
        "  {} {} ({} bytes)",
        style("Total Size:").bold(),
        format_size(stats.bytes, BINARY),
        format_number(stats.bytes)
    );
    println!(
        "  {} {:.2}s ({} KB/s)",
        style("Duration:").bold(),
        secs,
        format_number(result.kb_per_sec())
    );
    if stats.errors > 0 {
        println!(
            "  {} {}",
            style("Errors:").yellow().bold(),
            format_number(stats.errors)
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(1234567890), "1,234,567,890");
    }

    #[test]
    fn test_kb_per_sec() {
        let result = ScanResult {
            scan_id: 1,
            stats: WalkStats {
                dirs: 1,
                files: 1,
                bytes: 2048 * 1024,
                errors: 0,
                completed: true,
            },
            duration: Duration::from_secs(2),
        };
        assert_eq!(result.kb_per_sec(), 1024);
    }
}
