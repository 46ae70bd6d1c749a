// Main entry point - Build the CloudServer dashboard and export it
use std::sync::Arc;

use anyhow::Context;
use cloudserver_dashboard::application::cloudserver::cloudserver_dashboard;
use cloudserver_dashboard::application::dashboard_service::DashboardService;
use cloudserver_dashboard::infrastructure::config::load_export_config;
use cloudserver_dashboard::infrastructure::json_exporter::JsonExporter;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays clean for the dashboard JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_export_config().context("Failed to load dashboard configuration")?;

    let exporter = Arc::new(JsonExporter::from_settings(&config.output));
    let service = DashboardService::new(exporter);

    let document = cloudserver_dashboard(&config.constants)?;
    service.publish(document)?;

    Ok(())
}
