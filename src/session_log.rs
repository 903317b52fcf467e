//! Append-only durable session logs
//!
//! Two CSV streams per (vehicle, UTC day): the accepted-row log and the
//! reject log. Existing files are resumed by appending without rewriting
//! the header, and every write is flushed immediately. The log itself does
//! no deduplication; idempotency lives in the controller's accepted set.

use crate::error::Result;
use crate::logging::get_logger;
use crate::sample::ChargingSample;
use chrono::{NaiveDate, SecondsFormat};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const SESSION_HEADER: &str = "RowIndex,Timestamp,VoltMin,VoltAvg,VoltMax,\
CurrMin,CurrAvg,CurrMax,\
RealMin,RealAvg,RealMax,\
ReacMin,ReacAvg,ReacMax,\
AppMin,AppAvg,AppMax,\
FreqMin,FreqAvg,FreqMax,\
VehicleId,E_kWh";

const REJECTS_HEADER: &str = "RowIndex,Reason,VehicleId";

/// Append-only CSV pair for one (vehicle, day)
pub struct SessionLog {
    session_path: PathBuf,
    rejects_path: PathBuf,
    session_file: File,
    rejects_file: File,
    logger: crate::logging::StructuredLogger,
}

impl SessionLog {
    /// Open (or resume) the log pair under `data_dir/<vehicle>/<date>/`.
    ///
    /// Headers are written only when a file is newly created.
    pub fn open(data_dir: &Path, vehicle_id: &str, date: NaiveDate) -> Result<Self> {
        let dir = data_dir.join(vehicle_id).join(date.format("%Y-%m-%d").to_string());
        std::fs::create_dir_all(&dir)?;

        let session_path = dir.join("session.csv");
        let rejects_path = dir.join("rejects.csv");

        let session_file = Self::open_append(&session_path, SESSION_HEADER)?;
        let rejects_file = Self::open_append(&rejects_path, REJECTS_HEADER)?;

        let logger = get_logger("session_log");
        logger.info(&format!("Session log open at {}", dir.display()));

        Ok(Self {
            session_path,
            rejects_path,
            session_file,
            rejects_file,
            logger,
        })
    }

    fn open_append(path: &Path, header: &str) -> Result<File> {
        let is_new = !path.exists();
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        if is_new {
            writeln!(file, "{}", header)?;
            file.flush()?;
        }
        Ok(file)
    }

    /// Path of the accepted-row log
    pub fn session_path(&self) -> &Path {
        &self.session_path
    }

    /// Path of the reject log
    pub fn rejects_path(&self) -> &Path {
        &self.rejects_path
    }

    /// Append one accepted row with the running energy integral
    pub fn append_accepted(
        &mut self,
        sample: &ChargingSample,
        cumulative_energy_kwh: f64,
    ) -> Result<()> {
        let line = format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            sample.row_index,
            sample.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            sample.voltage_rms_min,
            sample.voltage_rms_avg,
            sample.voltage_rms_max,
            sample.current_rms_min,
            sample.current_rms_avg,
            sample.current_rms_max,
            sample.real_power_min,
            sample.real_power_avg,
            sample.real_power_max,
            sample.reactive_power_min,
            sample.reactive_power_avg,
            sample.reactive_power_max,
            sample.apparent_power_min,
            sample.apparent_power_avg,
            sample.apparent_power_max,
            sample.frequency_min,
            sample.frequency_avg,
            sample.frequency_max,
            sample.vehicle_id,
            cumulative_energy_kwh,
        );
        writeln!(self.session_file, "{}", line)?;
        self.session_file.flush()?;
        Ok(())
    }

    /// Append one rejected row; the controller guarantees first-occurrence-only
    pub fn append_reject(&mut self, row_index: u32, reason: &str, vehicle_id: &str) -> Result<()> {
        writeln!(self.rejects_file, "{},{},{}", row_index, reason, vehicle_id)?;
        self.rejects_file.flush()?;
        Ok(())
    }

    /// Flush both streams; called on session end before handles are dropped
    pub fn close(&mut self) {
        if let Err(e) = self.session_file.flush() {
            self.logger.warn(&format!("Flush of accepted log failed: {}", e));
        }
        if let Err(e) = self.rejects_file.flush() {
            self.logger.warn(&format!("Flush of reject log failed: {}", e));
        }
    }
}
