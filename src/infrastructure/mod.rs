// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod csv_dataset;
pub mod influx_repository;
pub mod memory_repository;
pub mod sql_renderer;
