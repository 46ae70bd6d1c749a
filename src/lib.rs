// Dashboard-as-code: panel model, grid layout and Grafana export
pub mod application;
pub mod domain;
pub mod infrastructure;
