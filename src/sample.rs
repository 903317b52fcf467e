//! Charging sample wire type
//!
//! One row of per-interval electrical telemetry as delivered by the client:
//! six min/avg/max measurement triads plus a client-assigned row index and
//! the vehicle the session belongs to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single telemetry row for an EV charging session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargingSample {
    /// UTC instant the row was measured at
    pub timestamp: DateTime<Utc>,

    /// Voltage RMS triad (V)
    pub voltage_rms_min: f64,
    pub voltage_rms_avg: f64,
    pub voltage_rms_max: f64,

    /// Current RMS triad (A)
    pub current_rms_min: f64,
    pub current_rms_avg: f64,
    pub current_rms_max: f64,

    /// Real power triad (kW)
    pub real_power_min: f64,
    pub real_power_avg: f64,
    pub real_power_max: f64,

    /// Reactive power triad (kvar); advisory only, not validated
    pub reactive_power_min: f64,
    pub reactive_power_avg: f64,
    pub reactive_power_max: f64,

    /// Apparent power triad (kVA); advisory only, not validated
    pub apparent_power_min: f64,
    pub apparent_power_avg: f64,
    pub apparent_power_max: f64,

    /// Frequency triad (Hz)
    pub frequency_min: f64,
    pub frequency_avg: f64,
    pub frequency_max: f64,

    /// Client-assigned row index; intended monotonic but not enforced.
    /// Duplicates are deduplicated, not rejected.
    pub row_index: u32,

    /// Vehicle the session belongs to
    pub vehicle_id: String,
}
