//! Service layer: orchestration between the REST handlers and the DAOs.

mod commands;
mod events;
mod stats;

pub use commands::CommandsService;
pub use events::EventsService;
pub use stats::{KeywordsMapping, StatisticsService};
