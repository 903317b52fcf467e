//! Client-side resilient row sender
//!
//! Reads an ordered CSV sample sequence (delimiter auto-detected, header
//! skipped when recognized), parses each row into a sample and pushes it
//! across the service boundary one call at a time. Failures are classified
//! into server validation faults, transport faults, timeouts and local
//! parse faults, each appended to a local reject log tagged by cause.
//! An operator-specified simulated disconnection aborts the channel
//! mid-stream, after which EndSession is deliberately skipped.

use crate::error::{FaradayError, Result};
use crate::logging::{LogContext, get_logger_with_context};
use crate::sample::ChargingSample;
use crate::service::ChargingService;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Client view of the RPC channel; abortable like a real transport handle
pub struct ServiceChannel {
    service: Arc<dyn ChargingService>,
    aborted: AtomicBool,
}

impl ServiceChannel {
    /// Wrap a service endpoint
    pub fn new(service: Arc<dyn ChargingService>) -> Self {
        Self {
            service,
            aborted: AtomicBool::new(false),
        }
    }

    /// Abort the channel: every subsequent call fails with a transport error
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    /// Whether the channel has been aborted
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    fn check_open(&self) -> Result<()> {
        if self.is_aborted() {
            return Err(FaradayError::transport("Channel aborted."));
        }
        Ok(())
    }

    /// Forward StartSession over the channel
    pub async fn start_session(&self, vehicle_id: &str) -> Result<()> {
        self.check_open()?;
        self.service.start_session(vehicle_id).await
    }

    /// Forward PushSample over the channel
    pub async fn push_sample(&self, sample: ChargingSample) -> Result<()> {
        self.check_open()?;
        self.service.push_sample(sample).await
    }

    /// Forward EndSession over the channel
    pub async fn end_session(&self, vehicle_id: &str) -> Result<()> {
        self.check_open()?;
        self.service.end_session(vehicle_id).await
    }
}

/// Outcome classification for one sent row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// The service accepted and persisted the row
    Accepted,
    /// Typed server fault (validation or state); row-scoped, stream continues
    ServerFault(String),
    /// Channel-level failure; may abort the remaining stream
    TransportFault(String),
    /// Call timed out; treated like a transport failure for policy purposes
    TimeoutFault(String),
    /// Malformed input that never reached the service
    LocalParseFault(String),
}

/// Summary of one send run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReport {
    /// Data rows read from the source (header excluded)
    pub rows_read: u32,
    /// Rows accepted by the service
    pub accepted: u32,
    /// Rows rejected with a typed server fault
    pub server_rejected: u32,
    /// Rows dropped on local parse failures
    pub parse_rejected: u32,
    /// Rows lost to transport/timeout failures
    pub transport_failed: u32,
    /// The remaining stream was abandoned after a transport failure
    pub stream_aborted: bool,
    /// The operator-requested disconnection simulation fired
    pub disconnect_simulated: bool,
    /// EndSession completed cleanly
    pub session_ended: bool,
}

/// Drives one CSV source through the service, row by row
pub struct RowSender {
    channel: ServiceChannel,
    vehicle_id: String,
    rejects_path: PathBuf,
    fail_after_rows: Option<u32>,
    abort_on_transport_fault: bool,
    logger: crate::logging::StructuredLogger,
}

impl RowSender {
    /// Create a sender for one vehicle writing local rejects to `rejects_path`
    pub fn new(
        service: Arc<dyn ChargingService>,
        vehicle_id: &str,
        rejects_path: impl Into<PathBuf>,
    ) -> Self {
        let logger = get_logger_with_context(
            LogContext::new("sender").with_vehicle_id(vehicle_id.to_string()),
        );
        Self {
            channel: ServiceChannel::new(service),
            vehicle_id: vehicle_id.to_string(),
            rejects_path: rejects_path.into(),
            fail_after_rows: None,
            abort_on_transport_fault: true,
            logger,
        }
    }

    /// Simulate a mid-stream disconnection after `rows` sent rows
    pub fn with_fail_after(mut self, rows: u32) -> Self {
        self.fail_after_rows = if rows > 0 { Some(rows) } else { None };
        self
    }

    /// Whether a transport fault abandons the remaining stream
    pub fn with_abort_on_transport_fault(mut self, abort: bool) -> Self {
        self.abort_on_transport_fault = abort;
        self
    }

    /// Send every row of `path`, returning the run summary.
    ///
    /// The stream is sent strictly sequentially over one channel; there is
    /// no retry. A validation fault never halts the stream; a transport
    /// fault abandons it when the abort policy says so.
    pub async fn send_file(&mut self, path: &Path) -> Result<SendReport> {
        let contents = std::fs::read_to_string(path)?;
        let mut lines = contents.lines();

        let Some(first_line) = lines.next() else {
            return Err(FaradayError::parse("CSV source is empty."));
        };
        let delimiter = detect_delimiter(first_line);

        self.channel.start_session(&self.vehicle_id).await?;
        self.logger.info("StartSession acknowledged");

        let mut report = SendReport::default();

        let first_cols: Vec<&str> = first_line.split(delimiter).collect();
        if header_looks_like_data(&first_cols) {
            report.rows_read += 1;
            let row = report.rows_read;
            if !self.send_row(&mut report, row, first_line, &first_cols).await {
                return Ok(self.finish(report).await);
            }
            if self.maybe_simulate_drop(&mut report) {
                return Ok(self.finish(report).await);
            }
        } else {
            self.logger.info("Header recognized and skipped");
        }

        for line in lines {
            report.rows_read += 1;
            let row = report.rows_read;
            let cols: Vec<&str> = line.split(delimiter).collect();
            if !self.send_row(&mut report, row, line, &cols).await {
                return Ok(self.finish(report).await);
            }
            if self.maybe_simulate_drop(&mut report) {
                return Ok(self.finish(report).await);
            }
            if report.rows_read % 100 == 0 {
                self.logger.info(&format!("Sent {} rows", report.rows_read));
            }
        }

        Ok(self.finish(report).await)
    }

    /// Send one row; returns false when the remaining stream must be abandoned
    async fn send_row(
        &mut self,
        report: &mut SendReport,
        row: u32,
        raw_line: &str,
        cols: &[&str],
    ) -> bool {
        let outcome = match parse_sample(cols, row, &self.vehicle_id) {
            Ok(sample) => match self.channel.push_sample(sample).await {
                Ok(()) => RowOutcome::Accepted,
                Err(e) => classify_fault(&e),
            },
            Err(e) => RowOutcome::LocalParseFault(e.to_string()),
        };

        match outcome {
            RowOutcome::Accepted => {
                report.accepted += 1;
                true
            }
            RowOutcome::ServerFault(reason) => {
                report.server_rejected += 1;
                self.log_reject(row, raw_line, &format!("SERVER_FAULT: {}", reason));
                true
            }
            RowOutcome::LocalParseFault(reason) => {
                report.parse_rejected += 1;
                self.log_reject(row, raw_line, &format!("PARSE_ERROR: {}", reason));
                true
            }
            RowOutcome::TimeoutFault(reason) => {
                report.transport_failed += 1;
                self.log_reject(row, raw_line, &format!("TIMEOUT: {}", reason));
                self.handle_transport_policy(report)
            }
            RowOutcome::TransportFault(reason) => {
                report.transport_failed += 1;
                self.log_reject(row, raw_line, &format!("COMM_ERROR: {}", reason));
                self.handle_transport_policy(report)
            }
        }
    }

    fn handle_transport_policy(&self, report: &mut SendReport) -> bool {
        if self.abort_on_transport_fault {
            self.logger
                .error("Transport fault: abandoning the remaining stream");
            report.stream_aborted = true;
            false
        } else {
            true
        }
    }

    /// Deliberate fault injection, not a graceful cancellation: the channel
    /// is aborted and the session is left active server-side.
    fn maybe_simulate_drop(&mut self, report: &mut SendReport) -> bool {
        match self.fail_after_rows {
            Some(n) if report.rows_read >= n => {
                self.logger
                    .warn(&format!("Simulating transport drop after {} rows", n));
                self.channel.abort();
                report.disconnect_simulated = true;
                true
            }
            _ => false,
        }
    }

    /// Close out the run: EndSession only over a healthy channel
    async fn finish(&mut self, mut report: SendReport) -> SendReport {
        if self.channel.is_aborted() {
            self.logger
                .info("Channel aborted - skipping EndSession");
            return report;
        }
        if report.stream_aborted {
            self.logger
                .info("Stream abandoned after transport fault - skipping EndSession");
            return report;
        }

        match self.channel.end_session(&self.vehicle_id).await {
            Ok(()) => {
                report.session_ended = true;
                self.logger.info("EndSession acknowledged");
            }
            Err(e) => {
                self.logger.error(&format!("EndSession fault: {}", e));
            }
        }
        report
    }

    /// Append one tagged failure to the local reject log, raw line included
    fn log_reject(&self, row: u32, raw_line: &str, reason: &str) {
        self.logger.warn(&format!("row={} - {}", row, reason));
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.rejects_path)
            .and_then(|mut f| writeln!(f, "{};{};{}", row, reason, raw_line));
        if let Err(e) = result {
            self.logger
                .error(&format!("Failed to write reject log: {}", e));
        }
    }
}

/// Classify a service-call error into a row outcome
fn classify_fault(err: &FaradayError) -> RowOutcome {
    match err {
        FaradayError::Validation { fault } | FaradayError::State { fault } => {
            RowOutcome::ServerFault(fault.reason.clone())
        }
        FaradayError::Timeout { message } => RowOutcome::TimeoutFault(message.clone()),
        FaradayError::Transport { message } => RowOutcome::TransportFault(message.clone()),
        other => RowOutcome::TransportFault(other.to_string()),
    }
}

/// Delimiter priority: tab, then semicolon, else comma
pub fn detect_delimiter(first_line: &str) -> char {
    if first_line.contains('\t') {
        '\t'
    } else if first_line.contains(';') {
        ';'
    } else {
        ','
    }
}

/// A header is recognized by column 0 failing to parse as a timestamp
pub fn header_looks_like_data(cols: &[&str]) -> bool {
    !cols.is_empty() && parse_timestamp(cols[0].trim()).is_ok()
}

/// Parse a source timestamp: RFC 3339 or common date-time forms, assumed UTC
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(FaradayError::parse(format!("Not a timestamp: '{}'", value)))
}

/// Parse one CSV row into a sample; fails if fewer than 19 data columns are
/// present or any numeric field is malformed
pub fn parse_sample(cols: &[&str], row_index: u32, vehicle_id: &str) -> Result<ChargingSample> {
    if cols.len() < 19 {
        return Err(FaradayError::parse("Too few columns in CSV row."));
    }

    Ok(ChargingSample {
        timestamp: parse_timestamp(cols[0].trim())?,
        voltage_rms_min: parse_number(cols[1])?,
        voltage_rms_avg: parse_number(cols[2])?,
        voltage_rms_max: parse_number(cols[3])?,
        current_rms_min: parse_number(cols[4])?,
        current_rms_avg: parse_number(cols[5])?,
        current_rms_max: parse_number(cols[6])?,
        real_power_min: parse_number(cols[7])?,
        real_power_avg: parse_number(cols[8])?,
        real_power_max: parse_number(cols[9])?,
        reactive_power_min: parse_number(cols[10])?,
        reactive_power_avg: parse_number(cols[11])?,
        reactive_power_max: parse_number(cols[12])?,
        apparent_power_min: parse_number(cols[13])?,
        apparent_power_avg: parse_number(cols[14])?,
        apparent_power_max: parse_number(cols[15])?,
        frequency_min: parse_number(cols[16])?,
        frequency_avg: parse_number(cols[17])?,
        frequency_max: parse_number(cols[18])?,
        row_index,
        vehicle_id: vehicle_id.to_string(),
    })
}

fn parse_number(value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| FaradayError::parse(format!("Not a number: '{}'", value.trim())))
}
