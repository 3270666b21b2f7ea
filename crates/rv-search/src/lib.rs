//! # RANGEVIEW Search
//!
//! The Elasticsearch data layer: a thin HTTP client, query-DSL builders,
//! typed response decoding, and the three DAOs (training events, console
//! commands, adaptive statistics). All reshaping of decoded records is
//! delegated to `rv-core`; this crate owns everything that touches the
//! wire.

pub mod client;
pub mod commands;
pub mod error;
pub mod events;
pub mod query;
pub mod response;
pub mod stats;

pub use client::EsClient;
pub use commands::{CommandFilter, CommandsDao};
pub use error::SearchError;
pub use events::EventsDao;
pub use stats::StatisticsDao;
