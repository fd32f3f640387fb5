//! Damping of GPS jitter by averaging over a short trailing time window.
//!
//! Consumer-grade fixes wander by several meters between samples even when the device is at
//! rest. Averaging everything received during the last [`DEFAULT_SMOOTHING_WINDOW`] steadies the
//! estimate while keeping the perceived lag below a second.

use crate::geodedic::GeoPoint;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::trace;
use uom::si::f64::Length;
use uom::ConstZero;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How far back [`PositionSmoother::average`] looks unless configured otherwise.
pub const DEFAULT_SMOOTHING_WINDOW: Duration = Duration::from_millis(800);

/// A single reading from a geolocation source.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GpsFix {
    pub geo: GeoPoint,
    /// Radius of the source's confidence circle, if it reports one.
    ///
    /// Negative or non-finite values are treated as unreported.
    pub accuracy: Option<Length>,
    /// Milliseconds on the source's clock at which the reading was taken.
    pub timestamp_ms: u64,
}

/// The average of all fixes inside the smoothing window.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SmoothedFix {
    pub geo: GeoPoint,
    /// Mean of the accuracies of the fixes that reported a usable one.
    pub accuracy: Option<Length>,
    pub sample_count: usize,
}

#[derive(Debug, Clone)]
pub struct PositionSmoother {
    window: Duration,
    buffer: VecDeque<GpsFix>,
}

impl Default for PositionSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_WINDOW)
    }
}

impl PositionSmoother {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            buffer: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn push(&mut self, fix: GpsFix) {
        self.buffer.push_back(fix);
    }

    /// Drops every fix older than the window relative to `now_ms` and averages the rest.
    ///
    /// A fix taken exactly `window` before `now_ms` is still included. Returns `None` once
    /// nothing is left.
    pub fn average(&mut self, now_ms: u64) -> Option<SmoothedFix> {
        let window_ms = u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX);
        let cutoff = now_ms.saturating_sub(window_ms);
        let before = self.buffer.len();
        self.buffer.retain(|fix| fix.timestamp_ms >= cutoff);
        if self.buffer.len() != before {
            trace!(
                pruned = before - self.buffer.len(),
                cutoff,
                "pruned stale fixes"
            );
        }

        if self.buffer.is_empty() {
            return None;
        }

        let count = self.buffer.len();
        let (lat_sum, lng_sum) = self
            .buffer
            .iter()
            .fold((0., 0.), |(lat, lng), fix| (lat + fix.geo.lat(), lng + fix.geo.lng()));
        let (accuracy_sum, accuracy_count) = self
            .buffer
            .iter()
            .filter_map(|fix| fix.accuracy)
            .filter(|accuracy| accuracy.value.is_finite() && accuracy.value >= 0.)
            .fold((Length::ZERO, 0_usize), |(sum, n), accuracy| (sum + accuracy, n + 1));

        Some(SmoothedFix {
            geo: GeoPoint::from_degrees_unchecked(lat_sum / count as f64, lng_sum / count as f64),
            accuracy: (accuracy_count > 0).then(|| accuracy_sum / accuracy_count as f64),
            sample_count: count,
        })
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
