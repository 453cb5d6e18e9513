use serde::Serialize;

/// Aggregated view of session progress, useful for hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    /// Distinct words scheduled at start.
    pub scheduled: usize,
    /// Questions graded so far, misses and timeouts included.
    pub answered: usize,
    /// Entries still queued, re-queued misses included.
    pub remaining: usize,
    pub correct: u32,
    pub is_finished: bool,
}
