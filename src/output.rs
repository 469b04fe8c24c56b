//! Simple Output and Reporting
//!
//! This module provides output formatting for run summaries.

use atty;
use std::time::Duration;

use crate::cli::VerbosityLevel;
use crate::pipeline::RunSummary;

/// Simple output formatter for human-readable results
pub struct Output {
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_summary(&self, summary: &RunSummary) -> String {
        let mut output = String::new();

        match self.verbosity {
            VerbosityLevel::Quiet => {
                if summary.documents_skipped > 0 || summary.shards_skipped > 0 {
                    output.push_str(&format!(
                        "Skipped documents: {} Skipped shards: {}\n",
                        summary.documents_skipped, summary.shards_skipped
                    ));
                }
            }
            VerbosityLevel::Normal | VerbosityLevel::Verbose => {
                output.push_str("Run Summary:\n");
                if summary.cancelled {
                    output.push_str(&format!("  {}\n", self.colorize("Cancelled early", "33")));
                }
                output.push_str(&format!("  Shards: {}\n", summary.shards));
                if summary.shards_skipped > 0 {
                    output.push_str(&format!(
                        "  {} {}\n",
                        self.colorize("Shards skipped:", "33"),
                        summary.shards_skipped
                    ));
                }
                output.push_str(&format!(
                    "  {} {}\n",
                    self.colorize("Documents processed:", "32"),
                    summary.documents_processed
                ));
                if summary.documents_skipped > 0 {
                    output.push_str(&format!(
                        "  {} {}\n",
                        self.colorize("Documents skipped:", "31"),
                        summary.documents_skipped
                    ));
                }
                output.push_str(&format!("  Rows written: {}\n", summary.rows_written));
                output.push_str(&format!("  Unmapped paths: {}\n", summary.unmapped_paths));
                output.push_str(&format!(
                    "  Duration: {}\n",
                    format_duration(summary.duration)
                ));

                if self.verbosity == VerbosityLevel::Verbose {
                    output.push_str(&format!(
                        "  Throughput: {:.1} documents/sec\n",
                        summary.throughput_documents_per_second()
                    ));
                }
            }
        }

        output
    }
}

fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{:.0}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}
