use anyhow::Result;
use faraday::config::Config;
use faraday::controller::SessionController;
use faraday::service::SessionService;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    faraday::logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Faraday {} starting up", env!("APP_VERSION"));

    let mut controller = SessionController::new(config.storage.data_dir.clone());
    register_console_observers(&mut controller);

    let service = SessionService::new(controller);
    faraday::web::serve(service, &config.web.host, config.web.port).await
}

/// Mirror lifecycle and warning events onto the server console
fn register_console_observers(controller: &mut SessionController) {
    let bus = controller.bus_mut();

    bus.on_transfer_started(|e| {
        info!(
            "[SERVER] StartSession: {} (session {})",
            e.vehicle_id, e.session_id
        );
    });
    bus.on_sample_received(|e| {
        if e.row_index % 100 == 0 {
            info!("[SERVER] received {} rows...", e.row_index);
        }
    });
    bus.on_warning(|e| {
        tracing::warn!(
            "[SERVER] warning row={:?} vehicle={}: {}",
            e.row_index,
            e.vehicle_id,
            e.reason
        );
    });
    bus.on_frequency_deviation(|e| {
        tracing::warn!(
            "[SERVER] frequency deviation row={:?}: f_avg={:.3} Hz (limit {:.1} Hz)",
            e.row_index,
            e.frequency_avg_hz,
            e.limit_hz
        );
    });
    bus.on_frequency_spike(|e| {
        tracing::warn!(
            "[SERVER] frequency spike row={:?}: df_min={:.3} df_max={:.3} Hz",
            e.row_index,
            e.delta_min_hz,
            e.delta_max_hz
        );
    });
    bus.on_transfer_completed(|e| {
        info!(
            "[SERVER] EndSession: {} accepted={} rejected={}",
            e.vehicle_id, e.accepted_count, e.rejected_count
        );
    });
}
