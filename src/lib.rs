pub mod aggregate;
pub mod config;
pub mod discover;
pub mod join;
pub mod observability;
pub mod pipeline;
pub mod sinks;
pub mod sources;
pub mod timestamp;

pub use pipeline::{ImportError, ImportSummary};
