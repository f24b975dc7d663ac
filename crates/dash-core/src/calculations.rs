use serde::{Deserialize, Serialize};

/// `numerator / denominator` as a percentage, or `0.0` when the denominator
/// is zero.
pub fn rate(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64 * 100.0
}

/// Relative change from `prior` to `current`, in percent.
///
/// Defined as `0.0` when `prior` is zero so that new entities never surface
/// infinite or NaN deltas. Whether a positive value is good news depends on
/// the metric (a rising bounce rate is a regression); that reading is left to
/// the caller.
pub fn percent_change(current: f64, prior: f64) -> f64 {
    if prior == 0.0 {
        return 0.0;
    }
    (current - prior) / prior * 100.0
}

// ── FunnelBreakdown ───────────────────────────────────────────────────────────

/// Partition of the sent population into three engagement segments, each a
/// percentage of `sent`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FunnelBreakdown {
    pub not_opened: f64,
    pub opened_not_clicked: f64,
    pub clicked: f64,
}

impl FunnelBreakdown {
    /// Build the funnel from raw counts.
    ///
    /// Segments sum to 100 whenever `sent > 0` and are all zero otherwise.
    /// Counts that break the funnel order (more clicks than opens, more opens
    /// than sends) are clamped so the partition stays valid.
    pub fn from_counts(sent: u64, opened: u64, clicked: u64) -> Self {
        if sent == 0 {
            return Self::default();
        }
        let clicked = clicked.min(sent);
        let opened = opened.clamp(clicked, sent);
        Self {
            not_opened: rate(sent - opened, sent),
            opened_not_clicked: rate(opened - clicked, sent),
            clicked: rate(clicked, sent),
        }
    }

    pub fn total(&self) -> f64 {
        self.not_opened + self.opened_not_clicked + self.clicked
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
