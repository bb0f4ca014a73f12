//! Peak-to-trough drawdown along a value path.

use serde::{Deserialize, Serialize};

/// Incremental drawdown tracker over portfolio values.
///
/// # Examples
///
/// ```
/// use wealth_risk::drawdown::DrawdownTracker;
///
/// let mut tracker = DrawdownTracker::with_initial(100.0);
/// for v in [110.0, 88.0, 99.0, 120.0] {
///     tracker.update(v);
/// }
/// assert!((tracker.max_drawdown() - 0.2).abs() < 1e-12);
/// assert_eq!(tracker.max_duration(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawdownTracker {
    peak: f64,
    current: f64,
    max: f64,
    duration: usize,
    max_duration: usize,
}

impl DrawdownTracker {
    /// Tracker starting at `initial`.
    pub fn with_initial(initial: f64) -> Self {
        Self {
            peak: initial,
            ..Self::default()
        }
    }

    /// Records the next value.
    pub fn update(&mut self, value: f64) {
        if value >= self.peak {
            self.peak = value;
            self.current = 0.0;
            self.duration = 0;
            return;
        }
        self.current = if self.peak > 0.0 {
            (self.peak - value) / self.peak
        } else {
            0.0
        };
        self.duration += 1;
        self.max = self.max.max(self.current);
        self.max_duration = self.max_duration.max(self.duration);
    }

    /// Largest fractional decline from a running peak.
    #[inline]
    pub fn max_drawdown(&self) -> f64 {
        self.max
    }

    /// Drawdown at the last update.
    #[inline]
    pub fn current_drawdown(&self) -> f64 {
        self.current
    }

    /// Longest run of periods spent below a peak.
    #[inline]
    pub fn max_duration(&self) -> usize {
        self.max_duration
    }

    /// Running peak.
    #[inline]
    pub fn peak(&self) -> f64 {
        self.peak
    }
}

/// Drawdown summary of one path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawdownStats {
    /// Maximum drawdown as a fraction of the peak
    pub max_drawdown: f64,
    /// Longest underwater spell in periods
    pub max_duration: usize,
}

/// Drawdown summary of a value series.
pub fn drawdown_stats(values: &[f64]) -> DrawdownStats {
    let Some((&first, rest)) = values.split_first() else {
        return DrawdownStats::default();
    };
    let mut tracker = DrawdownTracker::with_initial(first);
    for &v in rest {
        tracker.update(v);
    }
    DrawdownStats {
        max_drawdown: tracker.max_drawdown(),
        max_duration: tracker.max_duration(),
    }
}

/// Maximum drawdown of a value series.
pub fn max_drawdown(values: &[f64]) -> f64 {
    drawdown_stats(values).max_drawdown
}
