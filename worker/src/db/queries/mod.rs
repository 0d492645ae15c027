//! Database queries

pub mod assignment;
pub mod holiday;
