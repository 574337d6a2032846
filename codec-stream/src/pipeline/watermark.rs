//! Edge detector over ready-queue occupancy.
//!
//! The start-of-stream policy needs a single "enough is buffered" signal, not
//! a level: starting the transfer engine on every sample at or above the
//! threshold would re-trigger it continuously. The monitor therefore compares
//! each occupancy sample against the previous one and reports only the upward
//! crossing, re-arming once occupancy falls back below the threshold.

/// Previous-occupancy edge detector for the low watermark.
pub(crate) struct WatermarkMonitor {
    threshold: usize,
    /// Occupancy at the previous observation.
    last: usize,
    /// Highest occupancy observed since the last re-arm.
    peak: usize,
}

impl WatermarkMonitor {
    pub(crate) const fn new(threshold: usize) -> Self {
        WatermarkMonitor {
            threshold,
            last: 0,
            peak: 0,
        }
    }

    /// Record a new occupancy sample. Returns `true` exactly when the sample
    /// crosses the threshold from strictly below.
    pub(crate) fn observe(&mut self, occupancy: usize) -> bool {
        let crossed_up = occupancy >= self.threshold && self.last < self.threshold;
        self.last = occupancy;
        if occupancy > self.peak {
            self.peak = occupancy;
        }
        crossed_up
    }

    /// Highest occupancy seen since the last [`rearm`](Self::rearm).
    pub(crate) fn peak(&self) -> usize {
        self.peak
    }

    /// Restore the initial below-threshold condition.
    pub(crate) fn rearm(&mut self) {
        self.last = 0;
        self.peak = 0;
    }
}
