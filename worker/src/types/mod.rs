//! Type definitions

pub mod assignment;
pub mod messages;
pub mod route;
pub mod schedule;

pub use assignment::*;
pub use messages::*;
pub use route::*;
pub use schedule::*;
