// JSON exporter - writes the dashboard model to a file or stdout
use crate::application::dashboard_exporter::DashboardExporter;
use crate::infrastructure::config::OutputSettings;
use crate::infrastructure::grafana_mapper::GrafanaDashboard;
use anyhow::Context;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct JsonExporter {
    path: Option<PathBuf>,
    pretty: bool,
}

impl JsonExporter {
    pub fn new(path: Option<PathBuf>, pretty: bool) -> Self {
        Self { path, pretty }
    }

    pub fn from_settings(settings: &OutputSettings) -> Self {
        Self::new(settings.path.as_ref().map(PathBuf::from), settings.pretty)
    }

    pub fn render(&self, dashboard: &GrafanaDashboard) -> anyhow::Result<String> {
        let mut json = if self.pretty {
            serde_json::to_string_pretty(dashboard)
        } else {
            serde_json::to_string(dashboard)
        }
        .context("Failed to serialize dashboard")?;
        json.push('\n');
        Ok(json)
    }
}

impl DashboardExporter for JsonExporter {
    fn export(&self, dashboard: &GrafanaDashboard) -> anyhow::Result<()> {
        let json = self.render(dashboard)?;

        match &self.path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
                std::fs::write(path, &json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                tracing::debug!("Wrote {} bytes to {}", json.len(), path.display());
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout
                    .write_all(json.as_bytes())
                    .context("Failed to write dashboard to stdout")?;
            }
        }

        Ok(())
    }
}
