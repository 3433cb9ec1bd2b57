//! Throttle for the "nearby objects" list.
//!
//! The solver produces a fresh pointing several times a second, but the
//! nearby list only needs recomputing when the telescope has moved noticeably
//! or the list has aged.

use std::time::{Duration, Instant};

/// Decides when the nearby list must be recomputed.
#[derive(Debug, Clone)]
pub struct NearbyRefresh {
    /// Movement in RA or Dec, degrees, that forces a refresh
    pub threshold_deg: f64,
    /// Maximum age of the list
    pub max_age: Duration,
    last: Option<(f64, f64, Instant)>,
}

impl Default for NearbyRefresh {
    fn default() -> Self {
        Self::new(0.1, Duration::from_secs(2))
    }
}

impl NearbyRefresh {
    pub fn new(threshold_deg: f64, max_age: Duration) -> Self {
        Self {
            threshold_deg,
            max_age,
            last: None,
        }
    }

    /// Whether a pointing at (`ra_deg`, `dec_deg`) observed at `now` calls
    /// for a new list.
    pub fn should_refresh(&self, ra_deg: f64, dec_deg: f64, now: Instant) -> bool {
        match self.last {
            None => true,
            Some((ra, dec, at)) => {
                (ra_deg - ra).abs() > self.threshold_deg
                    || (dec_deg - dec).abs() > self.threshold_deg
                    || now.saturating_duration_since(at) > self.max_age
            }
        }
    }

    /// Record that the list was recomputed for this pointing.
    pub fn mark_refreshed(&mut self, ra_deg: f64, dec_deg: f64, now: Instant) {
        self.last = Some((ra_deg, dec_deg, now));
    }

    /// Check and record in one step. Returns true if the caller should refresh.
    pub fn update(&mut self, ra_deg: f64, dec_deg: f64, now: Instant) -> bool {
        let refresh = self.should_refresh(ra_deg, dec_deg, now);
        if refresh {
            self.mark_refreshed(ra_deg, dec_deg, now);
        }
        refresh
    }

    /// Forget the last pointing so the next check refreshes.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
