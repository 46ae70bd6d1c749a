// Dashboard service - Use case for finishing and publishing dashboards
use crate::application::dashboard_exporter::DashboardExporter;
use crate::domain::dashboard::DashboardDocument;
use crate::domain::error::DashboardError;
use crate::infrastructure::grafana_mapper::dashboard_to_grafana;
use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct DashboardService {
    exporter: Arc<dyn DashboardExporter>,
}

impl DashboardService {
    pub fn new(exporter: Arc<dyn DashboardExporter>) -> Self {
        Self { exporter }
    }

    /// Assign panel IDs, then check datasource references.
    pub fn finish(document: DashboardDocument) -> Result<DashboardDocument, DashboardError> {
        document.auto_panel_ids().verify_datasources()
    }

    /// Finish the document and hand it to the exporter. Nothing is exported
    /// unless every check passes.
    pub fn publish(&self, document: DashboardDocument) -> anyhow::Result<DashboardDocument> {
        let title = document.title.clone();
        let document = Self::finish(document)
            .with_context(|| format!("Dashboard '{}' failed validation", title))?;

        for (panel, placeholder) in document.undeclared_placeholders() {
            tracing::warn!(
                "Panel '{}' uses placeholder ${{{}}} which is not a declared input",
                panel,
                placeholder
            );
        }

        let grafana = dashboard_to_grafana(&document);
        self.exporter
            .export(&grafana)
            .with_context(|| format!("Failed to export dashboard '{}'", title))?;

        tracing::info!(
            dashboard = %title,
            panels = document.walk().len(),
            inputs = document.inputs().len(),
            "published dashboard"
        );
        Ok(document)
    }
}
