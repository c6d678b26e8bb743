//! Run summary and human-readable formatting.

use super::{RunNode, VisualState};

/// Aggregate view of a run graph.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Sum of `records_out` over all steps
    pub rows_out: u64,
    /// Sum of `bytes_processed` over all steps
    pub bytes_processed: u64,
}

impl RunSummary {
    pub fn from_nodes(nodes: &[RunNode]) -> Self {
        let mut summary = RunSummary {
            total: nodes.len(),
            ..RunSummary::default()
        };
        for node in nodes {
            match node.state() {
                VisualState::Pending => summary.pending += 1,
                VisualState::Running => summary.running += 1,
                VisualState::Success => summary.succeeded += 1,
                VisualState::Failed => summary.failed += 1,
            }
            if let Some(step) = &node.step {
                summary.rows_out += step.records_out.unwrap_or(0);
                summary.bytes_processed += step.bytes_processed.unwrap_or(0);
            }
        }
        summary
    }

    pub fn finished(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Finished steps over total, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.finished() as f64 / self.total as f64
        }
    }
}

/// Format a row rate, e.g. `40.0 rows/s`, `1.5K rows/s`.
pub fn format_throughput(rows_per_second: f64) -> String {
    const K: f64 = 1_000.0;
    const M: f64 = 1_000_000.0;

    if rows_per_second >= M {
        format!("{:.1}M rows/s", rows_per_second / M)
    } else if rows_per_second >= K {
        format!("{:.1}K rows/s", rows_per_second / K)
    } else {
        format!("{:.1} rows/s", rows_per_second)
    }
}

/// Helper to format bytes as human-readable size
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Format a step duration, e.g. `2.0s`, `1m 05s`, `2h 03m`.
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "-".to_string();
    }
    if seconds < 60.0 {
        return format!("{:.1}s", seconds);
    }
    let total = seconds.round() as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else {
        format!("{}m {:02}s", minutes, secs)
    }
}
