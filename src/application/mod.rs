// Application layer - Use cases and ports
pub mod aggregate_cache;
pub mod generation_repository;
pub mod intensity_service;
pub mod query_planner;
