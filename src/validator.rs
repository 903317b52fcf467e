//! Per-sample validation rules
//!
//! Pure rule checker evaluated in fixed order; the first failing rule wins.
//! Reactive, apparent and real power ranges are intentionally not validated
//! (advisory only).

use crate::sample::ChargingSample;
use chrono::{DateTime, Utc};

/// Reason string for the first rule a sample fails, or `Ok(())` if it passes
pub fn validate(sample: &ChargingSample) -> std::result::Result<(), &'static str> {
    if sample.timestamp == DateTime::<Utc>::UNIX_EPOCH {
        return Err("Invalid Timestamp.");
    }

    if !all_strictly_positive(&[
        sample.voltage_rms_min,
        sample.voltage_rms_avg,
        sample.voltage_rms_max,
    ]) {
        return Err("Voltage RMS must be > 0.");
    }

    if !all_non_negative(&[
        sample.current_rms_min,
        sample.current_rms_avg,
        sample.current_rms_max,
    ]) {
        return Err("Current RMS must be >= 0.");
    }

    if !all_strictly_positive(&[
        sample.frequency_min,
        sample.frequency_avg,
        sample.frequency_max,
    ]) {
        return Err("Frequency must be > 0.");
    }

    Ok(())
}

fn all_strictly_positive(vals: &[f64]) -> bool {
    vals.iter().all(|v| *v > 0.0)
}

fn all_non_negative(vals: &[f64]) -> bool {
    vals.iter().all(|v| *v >= 0.0)
}
