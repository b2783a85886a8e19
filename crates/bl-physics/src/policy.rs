//! Fallback policy for gap lookups on uncalibrated elements.
//!
//! Default behavior keeps the service running: an element missing from its
//! beamline table gets a gap of zero, which flows on into the BPM offset
//! computation. [`StrictPolicy`] instead reports the gap as unavailable so
//! the caller can skip dependent writes.

use std::sync::atomic::{AtomicUsize, Ordering};

use bl_core::{ElementName, Length, mm};

/// Result of a gap lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GapOutcome {
    /// Interpolated from the element's calibration curve.
    Calibrated(Length),
    /// Element not calibrated; value supplied by the fallback policy.
    Fallback(Length),
    /// Element not calibrated and the policy supplies nothing.
    Unavailable,
}

impl GapOutcome {
    pub fn gap(&self) -> Option<Length> {
        match self {
            Self::Calibrated(g) | Self::Fallback(g) => Some(*g),
            Self::Unavailable => None,
        }
    }

    pub fn used_fallback(&self) -> bool {
        !matches!(self, Self::Calibrated(_))
    }
}

/// Decides what a lookup miss returns.
pub trait GapFallbackPolicy: Send + Sync {
    fn on_miss(&self, element: &ElementName) -> GapOutcome;

    /// Number of misses handled, for diagnostics.
    fn miss_count(&self) -> usize {
        0
    }
}

/// Returns a zero gap for unknown elements and counts misses.
#[derive(Debug, Default)]
pub struct SentinelZeroPolicy {
    misses: AtomicUsize,
}

impl SentinelZeroPolicy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GapFallbackPolicy for SentinelZeroPolicy {
    fn on_miss(&self, _element: &ElementName) -> GapOutcome {
        self.misses.fetch_add(1, Ordering::Relaxed);
        GapOutcome::Fallback(mm(0.0))
    }

    fn miss_count(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }
}

/// Never invents a gap.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictPolicy;

impl GapFallbackPolicy for StrictPolicy {
    fn on_miss(&self, _element: &ElementName) -> GapOutcome {
        GapOutcome::Unavailable
    }
}
