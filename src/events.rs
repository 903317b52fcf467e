//! Synchronous observer notification
//!
//! Registries of zero or more observers per event kind. Delivery is
//! synchronous and in-line with the triggering call: no queuing, no
//! buffering, no retry. Events reflecting a state change are emitted only
//! after the corresponding log write has completed; with nobody registered
//! an event is silently dropped.

use chrono::{DateTime, Utc};

/// A session began
#[derive(Debug, Clone)]
pub struct TransferStarted {
    pub session_id: String,
    pub vehicle_id: String,
    pub utc_started: DateTime<Utc>,
}

/// A sample was validated, logged and accepted
#[derive(Debug, Clone)]
pub struct SampleReceived {
    pub vehicle_id: String,
    pub row_index: u32,
    pub timestamp: DateTime<Utc>,
}

/// A session ended normally
#[derive(Debug, Clone)]
pub struct TransferCompleted {
    pub vehicle_id: String,
    pub accepted_count: u64,
    pub rejected_count: u64,
    pub utc_completed: DateTime<Utc>,
}

/// An advisory condition was raised (rejection or analytics anomaly)
#[derive(Debug, Clone)]
pub struct Warning {
    pub vehicle_id: String,
    pub row_index: Option<u32>,
    pub reason: String,
    pub utc_raised: DateTime<Utc>,
}

/// Average frequency drifted from nominal beyond the limit
#[derive(Debug, Clone)]
pub struct FrequencyDeviation {
    pub vehicle_id: String,
    pub row_index: Option<u32>,
    pub frequency_avg_hz: f64,
    pub deviation_hz: f64,
    pub limit_hz: f64,
    pub utc_raised: DateTime<Utc>,
}

/// Abrupt frequency excursion between adjacent accepted samples
#[derive(Debug, Clone)]
pub struct FrequencySpike {
    pub vehicle_id: String,
    pub row_index: Option<u32>,
    pub delta_min_hz: f64,
    pub delta_max_hz: f64,
    pub threshold_hz: f64,
    pub utc_raised: DateTime<Utc>,
}

type Handler<E> = Box<dyn Fn(&E) + Send + Sync>;

/// Per-kind observer registries with synchronous delivery
#[derive(Default)]
pub struct EventBus {
    started: Vec<Handler<TransferStarted>>,
    received: Vec<Handler<SampleReceived>>,
    completed: Vec<Handler<TransferCompleted>>,
    warnings: Vec<Handler<Warning>>,
    deviations: Vec<Handler<FrequencyDeviation>>,
    spikes: Vec<Handler<FrequencySpike>>,
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer for session starts
    pub fn on_transfer_started<F: Fn(&TransferStarted) + Send + Sync + 'static>(&mut self, f: F) {
        self.started.push(Box::new(f));
    }

    /// Register an observer for accepted samples
    pub fn on_sample_received<F: Fn(&SampleReceived) + Send + Sync + 'static>(&mut self, f: F) {
        self.received.push(Box::new(f));
    }

    /// Register an observer for session completion
    pub fn on_transfer_completed<F: Fn(&TransferCompleted) + Send + Sync + 'static>(&mut self, f: F) {
        self.completed.push(Box::new(f));
    }

    /// Register an observer for warnings
    pub fn on_warning<F: Fn(&Warning) + Send + Sync + 'static>(&mut self, f: F) {
        self.warnings.push(Box::new(f));
    }

    /// Register an observer for frequency deviations
    pub fn on_frequency_deviation<F: Fn(&FrequencyDeviation) + Send + Sync + 'static>(
        &mut self,
        f: F,
    ) {
        self.deviations.push(Box::new(f));
    }

    /// Register an observer for frequency spikes
    pub fn on_frequency_spike<F: Fn(&FrequencySpike) + Send + Sync + 'static>(&mut self, f: F) {
        self.spikes.push(Box::new(f));
    }

    pub(crate) fn emit_transfer_started(&self, event: &TransferStarted) {
        for handler in &self.started {
            handler(event);
        }
    }

    pub(crate) fn emit_sample_received(&self, event: &SampleReceived) {
        for handler in &self.received {
            handler(event);
        }
    }

    pub(crate) fn emit_transfer_completed(&self, event: &TransferCompleted) {
        for handler in &self.completed {
            handler(event);
        }
    }

    pub(crate) fn emit_warning(&self, event: &Warning) {
        for handler in &self.warnings {
            handler(event);
        }
    }

    pub(crate) fn emit_frequency_deviation(&self, event: &FrequencyDeviation) {
        for handler in &self.deviations {
            handler(event);
        }
    }

    pub(crate) fn emit_frequency_spike(&self, event: &FrequencySpike) {
        for handler in &self.spikes {
            handler(event);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("started", &self.started.len())
            .field("received", &self.received.len())
            .field("completed", &self.completed.len())
            .field("warnings", &self.warnings.len())
            .field("deviations", &self.deviations.len())
            .field("spikes", &self.spikes.len())
            .finish()
    }
}
