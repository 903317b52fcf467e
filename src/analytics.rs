//! Online analytics over the accepted-sample stream
//!
//! Stateful per-session engine: energy integration with an elapsed-time
//! clamp, energy stall detection, overload detection, and frequency
//! deviation/spike detection. State is private to one controller instance
//! and reset at session start.

use crate::sample::ChargingSample;
use chrono::{DateTime, Utc};

/// Real power max above this raises an overload warning (kW)
pub const OVERLOAD_THRESHOLD_KW: f64 = 6.0;

/// Nominal grid frequency (Hz)
pub const NOMINAL_FREQUENCY_HZ: f64 = 50.0;

/// Tolerated deviation of the average frequency from nominal (Hz)
pub const FREQUENCY_DEVIATION_LIMIT_HZ: f64 = 0.5;

/// Max tolerated min/max frequency delta between adjacent samples (Hz)
pub const FREQUENCY_SPIKE_THRESHOLD_HZ: f64 = 0.20;

/// Consecutive negligible-growth rows before a stall warning fires
pub const STALL_CONSECUTIVE_LIMIT: u32 = 10;

/// Energy delta at or below this counts as negligible growth (kWh)
pub const STALL_NEGLIGIBLE_DELTA_KWH: f64 = 0.0;

/// Clamp for non-positive elapsed time between samples (hours)
pub const MIN_ELAPSED_HOURS: f64 = 1.0 / 60.0;

/// Anomaly raised by one accepted sample
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    /// Cumulative energy stagnated across a full run of negligible increments
    EnergyStall { consecutive_rows: u32 },

    /// Real power max exceeded the overload threshold
    Overload { real_power_max_kw: f64 },

    /// Average frequency drifted from nominal beyond the deviation limit
    FrequencyDeviation {
        frequency_avg_hz: f64,
        deviation_hz: f64,
    },

    /// Abrupt min/max frequency excursion versus the previous sample
    FrequencySpike {
        delta_min_hz: f64,
        delta_max_hz: f64,
    },
}

/// Per-session online analytics state
#[derive(Debug, Default)]
pub struct AnalyticsEngine {
    /// Timestamp of the previous accepted sample
    prev_timestamp: Option<DateTime<Utc>>,

    /// Frequency min/max of the previous accepted sample
    prev_frequency: Option<(f64, f64)>,

    /// Running energy integral (kWh)
    cumulative_energy_kwh: f64,

    /// Consecutive rows with negligible energy growth
    stall_run: u32,
}

impl AnalyticsEngine {
    /// Create a fresh engine with zeroed state
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all state for a new session
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Running energy integral (kWh)
    pub fn cumulative_energy_kwh(&self) -> f64 {
        self.cumulative_energy_kwh
    }

    /// Fold one accepted sample into the session state.
    ///
    /// Returns the anomalies this sample raised, in evaluation order:
    /// stall, overload, frequency deviation, frequency spike.
    pub fn observe(&mut self, sample: &ChargingSample) -> Vec<Finding> {
        let mut findings = Vec::new();

        // Energy integral: first sample contributes a zero-elapsed delta;
        // non-positive elapsed time is clamped rather than subtracting.
        let dt_hours = match self.prev_timestamp {
            Some(prev) => {
                let hours = (sample.timestamp - prev).num_milliseconds() as f64 / 3_600_000.0;
                if hours <= 0.0 { MIN_ELAPSED_HOURS } else { hours }
            }
            None => 0.0,
        };

        let delta_kwh = (sample.real_power_avg * dt_hours).max(0.0);
        self.cumulative_energy_kwh += delta_kwh;

        if delta_kwh <= STALL_NEGLIGIBLE_DELTA_KWH {
            self.stall_run += 1;
            if self.stall_run > STALL_CONSECUTIVE_LIMIT {
                findings.push(Finding::EnergyStall {
                    consecutive_rows: STALL_CONSECUTIVE_LIMIT,
                });
                self.stall_run = 0;
            }
        } else {
            self.stall_run = 0;
        }

        if sample.real_power_max > OVERLOAD_THRESHOLD_KW {
            findings.push(Finding::Overload {
                real_power_max_kw: sample.real_power_max,
            });
        }

        let deviation = (sample.frequency_avg - NOMINAL_FREQUENCY_HZ).abs();
        if deviation > FREQUENCY_DEVIATION_LIMIT_HZ {
            findings.push(Finding::FrequencyDeviation {
                frequency_avg_hz: sample.frequency_avg,
                deviation_hz: deviation,
            });
        }

        // Spike check is skipped for the first sample: no predecessor
        if let Some((prev_min, prev_max)) = self.prev_frequency {
            let delta_min = (sample.frequency_min - prev_min).abs();
            let delta_max = (sample.frequency_max - prev_max).abs();
            if delta_min > FREQUENCY_SPIKE_THRESHOLD_HZ || delta_max > FREQUENCY_SPIKE_THRESHOLD_HZ
            {
                findings.push(Finding::FrequencySpike {
                    delta_min_hz: delta_min,
                    delta_max_hz: delta_max,
                });
            }
        }

        self.prev_frequency = Some((sample.frequency_min, sample.frequency_max));
        self.prev_timestamp = Some(sample.timestamp);

        findings
    }
}
