//! Command ingress.

pub mod ndjson;
pub mod traits;

pub use ndjson::NdjsonSource;
pub use traits::CommandSource;
