use async_trait::async_trait;
use faraday::controller::SessionController;
use faraday::error::{FaradayError, Result};
use faraday::sample::ChargingSample;
use faraday::sender::{RowSender, detect_delimiter, header_looks_like_data, parse_sample};
use faraday::service::{ChargingService, SessionService};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

const GOOD_ROW: &str =
    "2024-05-12T10:00:00Z,229,230,231,14,15,16,3.2,3.5,3.7,0.1,0.2,0.3,3.3,3.6,3.8,49.95,50.0,50.05";
const BAD_VOLTAGE_ROW: &str =
    "2024-05-12T10:01:00Z,0,230,231,14,15,16,3.2,3.5,3.7,0.1,0.2,0.3,3.3,3.6,3.8,49.95,50.0,50.05";
const HEADER: &str =
    "Timestamp,VoltMin,VoltAvg,VoltMax,CurrMin,CurrAvg,CurrMax,RealMin,RealAvg,RealMax,\
ReacMin,ReacAvg,ReacMax,AppMin,AppAvg,AppMax,FreqMin,FreqAvg,FreqMax";

fn write_source(dir: &std::path::Path, lines: &[&str]) -> PathBuf {
    let path = dir.join("vehicle.csv");
    std::fs::write(&path, lines.join("\n")).unwrap();
    path
}

fn server(dir: &std::path::Path) -> SessionService {
    SessionService::new(SessionController::new(dir.join("data")))
}

/// Wraps a real service, failing the transport on chosen row indices
struct FlakyService {
    inner: SessionService,
    comm_fail_rows: HashSet<u32>,
    timeout_rows: HashSet<u32>,
}

#[async_trait]
impl ChargingService for FlakyService {
    async fn start_session(&self, vehicle_id: &str) -> Result<()> {
        self.inner.start_session(vehicle_id).await
    }

    async fn push_sample(&self, sample: ChargingSample) -> Result<()> {
        if self.comm_fail_rows.contains(&sample.row_index) {
            return Err(FaradayError::transport("connection reset"));
        }
        if self.timeout_rows.contains(&sample.row_index) {
            return Err(FaradayError::timeout("no reply within deadline"));
        }
        self.inner.push_sample(sample).await
    }

    async fn end_session(&self, vehicle_id: &str) -> Result<()> {
        self.inner.end_session(vehicle_id).await
    }
}

#[test]
fn delimiter_priority_tab_semicolon_comma() {
    assert_eq!(detect_delimiter("a\tb;c,d"), '\t');
    assert_eq!(detect_delimiter("a;b,c"), ';');
    assert_eq!(detect_delimiter("a,b,c"), ',');
    assert_eq!(detect_delimiter("plain"), ',');
}

#[test]
fn header_detected_by_timestamp_parseability() {
    let header: Vec<&str> = HEADER.split(',').collect();
    assert!(!header_looks_like_data(&header));

    let data: Vec<&str> = GOOD_ROW.split(',').collect();
    assert!(header_looks_like_data(&data));
}

#[test]
fn parse_sample_requires_19_columns() {
    let cols: Vec<&str> = GOOD_ROW.split(',').take(18).collect();
    let err = parse_sample(&cols, 1, "EV1").unwrap_err();
    assert!(matches!(err, FaradayError::Parse { .. }));
}

#[test]
fn parse_sample_rejects_bad_numbers() {
    let row = GOOD_ROW.replace("3.5", "not-a-number");
    let cols: Vec<&str> = row.split(',').collect();
    let err = parse_sample(&cols, 1, "EV1").unwrap_err();
    assert!(err.to_string().contains("not-a-number"));
}

#[test]
fn parse_sample_maps_all_triads() {
    let cols: Vec<&str> = GOOD_ROW.split(',').collect();
    let s = parse_sample(&cols, 12, "EV1").unwrap();
    assert_eq!(s.row_index, 12);
    assert_eq!(s.vehicle_id, "EV1");
    assert!((s.voltage_rms_avg - 230.0).abs() < 1e-9);
    assert!((s.real_power_max - 3.7).abs() < 1e-9);
    assert!((s.frequency_max - 50.05).abs() < 1e-9);
}

#[tokio::test]
async fn sends_whole_file_and_ends_session() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), &[HEADER, GOOD_ROW, GOOD_ROW, GOOD_ROW]);
    let service = server(dir.path());
    let controller = service.controller();

    let mut sender = RowSender::new(
        Arc::new(service),
        "EV1",
        dir.path().join("rejects.csv"),
    );
    let report = sender.send_file(&source).await.unwrap();

    assert_eq!(report.rows_read, 3);
    // Identical payloads, but the sender assigns distinct row indices
    assert_eq!(report.accepted, 3);
    assert_eq!(report.server_rejected, 0);
    assert!(report.session_ended);
    assert!(!controller.lock().await.is_active());
}

#[tokio::test]
async fn server_validation_fault_is_row_scoped() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), &[HEADER, GOOD_ROW, BAD_VOLTAGE_ROW, GOOD_ROW]);
    let service = server(dir.path());

    let rejects = dir.path().join("rejects.csv");
    let mut sender = RowSender::new(Arc::new(service), "EV1", &rejects);
    let report = sender.send_file(&source).await.unwrap();

    assert_eq!(report.accepted, 2);
    assert_eq!(report.server_rejected, 1);
    assert!(report.session_ended, "validation faults never halt the stream");

    let contents = std::fs::read_to_string(&rejects).unwrap();
    assert!(contents.contains("2;SERVER_FAULT: Voltage RMS must be > 0.;"));
    assert!(contents.contains(BAD_VOLTAGE_ROW));
}

#[tokio::test]
async fn local_parse_fault_never_reaches_service() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(
        dir.path(),
        &[HEADER, GOOD_ROW, "2024-05-12T10:01:00Z,only,three"],
    );
    let service = server(dir.path());

    let rejects = dir.path().join("rejects.csv");
    let mut sender = RowSender::new(Arc::new(service), "EV1", &rejects);
    let report = sender.send_file(&source).await.unwrap();

    assert_eq!(report.accepted, 1);
    assert_eq!(report.parse_rejected, 1);
    assert!(report.session_ended);

    let contents = std::fs::read_to_string(&rejects).unwrap();
    assert!(contents.contains("2;PARSE_ERROR:"));
}

#[tokio::test]
async fn transport_fault_aborts_stream_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), &[HEADER, GOOD_ROW, GOOD_ROW, GOOD_ROW]);
    let service = server(dir.path());
    let flaky = FlakyService {
        inner: service,
        comm_fail_rows: HashSet::from([2]),
        timeout_rows: HashSet::new(),
    };

    let rejects = dir.path().join("rejects.csv");
    let mut sender = RowSender::new(Arc::new(flaky), "EV1", &rejects);
    let report = sender.send_file(&source).await.unwrap();

    assert_eq!(report.accepted, 1);
    assert_eq!(report.transport_failed, 1);
    assert!(report.stream_aborted);
    assert!(!report.session_ended, "no EndSession after an aborted stream");

    let contents = std::fs::read_to_string(&rejects).unwrap();
    assert!(contents.contains("2;COMM_ERROR: connection reset;"));
}

#[tokio::test]
async fn transport_fault_can_continue_per_policy() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), &[HEADER, GOOD_ROW, GOOD_ROW, GOOD_ROW]);
    let service = server(dir.path());
    let flaky = FlakyService {
        inner: service,
        comm_fail_rows: HashSet::new(),
        timeout_rows: HashSet::from([2]),
    };

    let rejects = dir.path().join("rejects.csv");
    let mut sender = RowSender::new(Arc::new(flaky), "EV1", &rejects)
        .with_abort_on_transport_fault(false);
    let report = sender.send_file(&source).await.unwrap();

    assert_eq!(report.accepted, 2);
    assert_eq!(report.transport_failed, 1);
    assert!(!report.stream_aborted);
    assert!(report.session_ended);

    let contents = std::fs::read_to_string(&rejects).unwrap();
    assert!(contents.contains("2;TIMEOUT: no reply within deadline;"));
}

#[tokio::test]
async fn simulated_disconnect_skips_end_session() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), &[HEADER, GOOD_ROW, GOOD_ROW, GOOD_ROW, GOOD_ROW]);
    let service = server(dir.path());
    let controller = service.controller();

    let mut sender = RowSender::new(
        Arc::new(service),
        "EV1",
        dir.path().join("rejects.csv"),
    )
    .with_fail_after(2);
    let report = sender.send_file(&source).await.unwrap();

    assert_eq!(report.accepted, 2);
    assert!(report.disconnect_simulated);
    assert!(!report.session_ended);
    // Unclean termination: the session is left active server-side
    assert!(controller.lock().await.is_active());
}

#[tokio::test]
async fn file_without_header_sends_first_line_as_data() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), &[GOOD_ROW, GOOD_ROW]);
    let service = server(dir.path());

    let mut sender = RowSender::new(
        Arc::new(service),
        "EV1",
        dir.path().join("rejects.csv"),
    );
    let report = sender.send_file(&source).await.unwrap();

    assert_eq!(report.rows_read, 2);
    assert_eq!(report.accepted, 2);
}

#[tokio::test]
async fn semicolon_delimited_source_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let row = GOOD_ROW.replace(',', ";");
    let source = write_source(dir.path(), &[&HEADER.replace(',', ";"), &row]);
    let service = server(dir.path());

    let mut sender = RowSender::new(
        Arc::new(service),
        "EV1",
        dir.path().join("rejects.csv"),
    );
    let report = sender.send_file(&source).await.unwrap();
    assert_eq!(report.accepted, 1);
}

#[tokio::test]
async fn empty_source_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("vehicle.csv");
    std::fs::write(&source, "").unwrap();
    let service = server(dir.path());

    let mut sender = RowSender::new(
        Arc::new(service),
        "EV1",
        dir.path().join("rejects.csv"),
    );
    let err = sender.send_file(&source).await.unwrap_err();
    assert!(matches!(err, FaradayError::Parse { .. }));
}
