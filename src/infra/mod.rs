//! Infrastructure: errors, telemetry, HTTP surface, persistence, outbound APIs.

pub mod error;
pub mod external;
pub mod http;
pub mod repo;
pub mod telemetry;

pub use error::InfraError;
