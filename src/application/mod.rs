// Application layer - Use cases over the dashboard model
pub mod cloudserver;
pub mod dashboard_exporter;
pub mod dashboard_service;
