// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod grafana_mapper;
pub mod json_exporter;
