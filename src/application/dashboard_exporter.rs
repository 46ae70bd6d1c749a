// Exporter trait for publishing finished dashboards
use crate::infrastructure::grafana_mapper::GrafanaDashboard;

pub trait DashboardExporter: Send + Sync {
    /// Write one serialized dashboard to its destination
    fn export(&self, dashboard: &GrafanaDashboard) -> anyhow::Result<()>;
}
