// Build-time errors raised while assembling a dashboard
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashboardError {
    #[error("invalid panel '{title}': {reason}")]
    InvalidPanel { title: String, reason: String },

    #[error("row {row} is {total_width} units wide, grid is only {grid_width}")]
    LayoutOverflow {
        row: usize,
        total_width: u32,
        grid_width: u32,
    },

    #[error("invalid row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    #[error("panel '{panel}' references unknown datasource '{datasource}'")]
    UnknownDataSource { panel: String, datasource: String },

    #[error("input variable '{name}' is declared more than once")]
    DuplicateInput { name: String },

    #[error("invalid input variable '{name}': {reason}")]
    InvalidInput { name: String, reason: String },
}

impl DashboardError {
    pub(crate) fn invalid_panel(title: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPanel {
            title: title.to_string(),
            reason: reason.into(),
        }
    }
}
