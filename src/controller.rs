//! Session lifecycle state machine
//!
//! The controller owns the one active session, orchestrating the validator,
//! analytics engine and session log, and notifying the event bus at each
//! meaningful transition. States are Idle and Active; the three operations
//! must be externally serialized (see [`crate::service::SessionService`]).
//!
//! Ordering contract: an event reflecting a state change is emitted only
//! after the corresponding log write for that change has completed.

use crate::analytics::{
    AnalyticsEngine, FREQUENCY_DEVIATION_LIMIT_HZ, FREQUENCY_SPIKE_THRESHOLD_HZ, Finding,
    OVERLOAD_THRESHOLD_KW,
};
use crate::error::{FaradayError, Result};
use crate::events::{
    EventBus, FrequencyDeviation, FrequencySpike, SampleReceived, TransferCompleted,
    TransferStarted, Warning,
};
use crate::logging::{LogContext, get_logger, get_logger_with_context};
use crate::sample::ChargingSample;
use crate::session_log::SessionLog;
use crate::validator;
use chrono::Utc;
use std::collections::HashSet;
use std::path::PathBuf;

/// State of the one session the controller may own
struct ActiveSession {
    /// Correlation id for logs and the TransferStarted event
    id: String,
    vehicle_id: String,
    accepted: HashSet<u32>,
    rejected: HashSet<u32>,
    accepted_count: u64,
    rejected_count: u64,
    analytics: AnalyticsEngine,
    log: SessionLog,
}

/// Owns session state and drives validation, analytics and persistence
pub struct SessionController {
    data_dir: PathBuf,
    bus: EventBus,
    logger: crate::logging::StructuredLogger,
    session: Option<ActiveSession>,
}

impl SessionController {
    /// Create an idle controller writing logs under `data_dir`
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            bus: EventBus::new(),
            logger: get_logger("controller"),
            session: None,
        }
    }

    /// Observer registries for lifecycle and warning events
    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Whether a session is currently active
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Status snapshot for the web transport
    pub fn snapshot(&self) -> serde_json::Value {
        match &self.session {
            Some(s) => serde_json::json!({
                "active": true,
                "session_id": s.id,
                "vehicle_id": s.vehicle_id,
                "accepted_count": s.accepted_count,
                "rejected_count": s.rejected_count,
                "cumulative_energy_kwh": s.analytics.cumulative_energy_kwh(),
            }),
            None => serde_json::json!({ "active": false }),
        }
    }

    /// Idle → Active: open (or resume) the session log and reset all state
    pub fn start_session(&mut self, vehicle_id: &str) -> Result<()> {
        if self.session.is_some() {
            return Err(FaradayError::state(
                "Session already active.",
                self.session.as_ref().map(|s| s.vehicle_id.clone()),
            ));
        }
        if vehicle_id.trim().is_empty() {
            return Err(FaradayError::state("VehicleId is required.", None));
        }

        let vehicle_id = vehicle_id.trim().to_string();
        let log = SessionLog::open(&self.data_dir, &vehicle_id, Utc::now().date_naive())?;

        let session = ActiveSession {
            id: uuid::Uuid::new_v4().to_string(),
            vehicle_id: vehicle_id.clone(),
            accepted: HashSet::new(),
            rejected: HashSet::new(),
            accepted_count: 0,
            rejected_count: 0,
            analytics: AnalyticsEngine::new(),
            log,
        };

        self.logger = get_logger_with_context(
            LogContext::new("controller")
                .with_vehicle_id(vehicle_id.clone())
                .with_session_id(session.id.clone()),
        );
        self.logger.info("StartSession: transfer in progress");

        let event = TransferStarted {
            session_id: session.id.clone(),
            vehicle_id,
            utc_started: Utc::now(),
        };
        self.session = Some(session);
        self.bus.emit_transfer_started(&event);

        Ok(())
    }

    /// Validate, analyze and persist one sample.
    ///
    /// A row index already in the accepted set is a silent no-op. Validation
    /// failures reject the row (first occurrence logged and counted), emit a
    /// Warning, and return a typed validation fault; the session stays
    /// Active.
    pub fn push_sample(&mut self, sample: &ChargingSample) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Err(FaradayError::state("No active session.", None));
        };

        // Idempotent replay: no re-validation, no side effects, no event
        if sample.row_index > 0 && session.accepted.contains(&sample.row_index) {
            return Ok(());
        }

        if let Err(reason) = validator::validate(sample) {
            let vehicle_id = session.vehicle_id.clone();
            if sample.row_index > 0 && session.rejected.insert(sample.row_index) {
                session
                    .log
                    .append_reject(sample.row_index, reason, &vehicle_id)?;
                session.rejected_count += 1;
            }
            self.bus.emit_warning(&Warning {
                vehicle_id: vehicle_id.clone(),
                row_index: Some(sample.row_index),
                reason: reason.to_string(),
                utc_raised: Utc::now(),
            });
            return Err(FaradayError::validation(
                reason,
                Some(sample.row_index),
                Some(vehicle_id),
            ));
        }

        let findings = session.analytics.observe(sample);
        let vehicle_id = session.vehicle_id.clone();
        for finding in &findings {
            Self::emit_finding(&self.bus, &vehicle_id, sample.row_index, finding);
        }

        let cumulative = session.analytics.cumulative_energy_kwh();
        session.log.append_accepted(sample, cumulative)?;
        session.accepted.insert(sample.row_index);
        session.accepted_count += 1;

        self.bus.emit_sample_received(&SampleReceived {
            vehicle_id,
            row_index: sample.row_index,
            timestamp: sample.timestamp,
        });

        if sample.row_index % 100 == 0 {
            self.logger
                .info(&format!("Received {} rows so far", sample.row_index));
        }

        Ok(())
    }

    /// Active → Idle: emit TransferCompleted and release log resources.
    ///
    /// The vehicle id is matched case-insensitively after trimming; a
    /// mismatch fails without terminating the session.
    pub fn end_session(&mut self, vehicle_id: &str) -> Result<()> {
        let Some(session) = self.session.as_ref() else {
            return Err(FaradayError::state("No active session.", None));
        };

        if !vehicle_id.trim().eq_ignore_ascii_case(&session.vehicle_id) {
            return Err(FaradayError::state(
                "VehicleId mismatch.",
                Some(session.vehicle_id.clone()),
            ));
        }

        self.logger.info(&format!(
            "EndSession: accepted={} rejected={}",
            session.accepted_count, session.rejected_count
        ));

        self.bus.emit_transfer_completed(&TransferCompleted {
            vehicle_id: session.vehicle_id.clone(),
            accepted_count: session.accepted_count,
            rejected_count: session.rejected_count,
            utc_completed: Utc::now(),
        });

        if let Some(mut session) = self.session.take() {
            session.log.close();
        }
        self.logger = get_logger("controller");

        Ok(())
    }

    /// Turn one analytics finding into its event(s) plus a Warning
    fn emit_finding(bus: &EventBus, vehicle_id: &str, row_index: u32, finding: &Finding) {
        let now = Utc::now();
        match finding {
            Finding::EnergyStall { consecutive_rows } => {
                bus.emit_warning(&Warning {
                    vehicle_id: vehicle_id.to_string(),
                    row_index: Some(row_index),
                    reason: format!(
                        "EnergyStallWarning: cumulative E stagnated for more than {} rows.",
                        consecutive_rows
                    ),
                    utc_raised: now,
                });
            }
            Finding::Overload { real_power_max_kw } => {
                bus.emit_warning(&Warning {
                    vehicle_id: vehicle_id.to_string(),
                    row_index: Some(row_index),
                    reason: format!(
                        "OverloadWarning: RealPowerMax={:.3} kW > {} kW",
                        real_power_max_kw, OVERLOAD_THRESHOLD_KW
                    ),
                    utc_raised: now,
                });
            }
            Finding::FrequencyDeviation {
                frequency_avg_hz,
                deviation_hz,
            } => {
                bus.emit_frequency_deviation(&FrequencyDeviation {
                    vehicle_id: vehicle_id.to_string(),
                    row_index: Some(row_index),
                    frequency_avg_hz: *frequency_avg_hz,
                    deviation_hz: *deviation_hz,
                    limit_hz: FREQUENCY_DEVIATION_LIMIT_HZ,
                    utc_raised: now,
                });
                bus.emit_warning(&Warning {
                    vehicle_id: vehicle_id.to_string(),
                    row_index: Some(row_index),
                    reason: format!(
                        "FrequencyDeviationWarning: f_avg={:.3} Hz, dev={:.3} Hz > {:.3} Hz",
                        frequency_avg_hz, deviation_hz, FREQUENCY_DEVIATION_LIMIT_HZ
                    ),
                    utc_raised: now,
                });
            }
            Finding::FrequencySpike {
                delta_min_hz,
                delta_max_hz,
            } => {
                bus.emit_frequency_spike(&FrequencySpike {
                    vehicle_id: vehicle_id.to_string(),
                    row_index: Some(row_index),
                    delta_min_hz: *delta_min_hz,
                    delta_max_hz: *delta_max_hz,
                    threshold_hz: FREQUENCY_SPIKE_THRESHOLD_HZ,
                    utc_raised: now,
                });
                bus.emit_warning(&Warning {
                    vehicle_id: vehicle_id.to_string(),
                    row_index: Some(row_index),
                    reason: format!(
                        "FrequencySpikeWarning: df_min={:.3} Hz, df_max={:.3} Hz (threshold={:.3} Hz)",
                        delta_min_hz, delta_max_hz, FREQUENCY_SPIKE_THRESHOLD_HZ
                    ),
                    utc_raised: now,
                });
            }
        }
    }
}
