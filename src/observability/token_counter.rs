use std::time::Duration;
use tracing::info;

/// Estimate the number of tokens in `text`.
///
/// Uses a lightweight heuristic (`bytes / 4`); the endpoint reports no usage.
#[must_use]
pub fn estimate_tokens(text: &str) -> u64 {
    (text.len() as u64).div_ceil(4)
}

/// Running totals for one response cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
    pub deltas: u64,
    pub bytes: u64,
    pub estimated_tokens: u64,
}

impl CycleStats {
    pub fn record(&mut self, text: &str) {
        self.deltas += 1;
        self.bytes += text.len() as u64;
        self.estimated_tokens += estimate_tokens(text);
    }
}

/// Log output totals for a completed cycle.
pub fn log_cycle_usage(model: &str, stats: &CycleStats, duration: Duration) {
    info!(
        model = model,
        deltas = stats.deltas,
        bytes = stats.bytes,
        estimated_output_tokens = stats.estimated_tokens,
        duration_seconds = duration.as_secs_f64(),
        "chat cycle completed"
    );
}
