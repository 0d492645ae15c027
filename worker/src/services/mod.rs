//! Business logic services

pub mod assignment_filter;
pub mod cache;
pub mod engine;
pub mod geo;
pub mod geocoding;
pub mod nominatim;
pub mod request_tracker;
pub mod schedule_resolver;
pub mod segment_estimator;
pub mod sources;
pub mod stop_assembler;
pub mod travel;
