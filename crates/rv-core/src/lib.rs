//! # RANGEVIEW Core
//!
//! Domain logic for the training-range telemetry service: the document
//! field registry, index path scoping, the grouped reshaper that turns
//! collapsed search hits into nested run maps, and the per-phase
//! statistics arithmetic.
//!
//! This crate performs no I/O. Everything here operates on decoded JSON
//! records and is exercised directly by unit tests.

pub mod error;
pub mod fields;
pub mod grouped;
pub mod index;
pub mod reshape;
pub mod stats;
pub mod value;

pub use error::ReshapeError;
pub use fields::FieldNames;
pub use grouped::GroupedMap;
pub use index::{CommandType, IndexRoots, TrainingType};
pub use reshape::{regroup, CollapsedGroup, Record};
pub use stats::{CommandsStatistics, OverallPhaseStatistics, PhaseBoundary};
pub use value::GroupKey;
