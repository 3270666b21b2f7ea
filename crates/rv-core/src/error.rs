use thiserror::Error;

use crate::value::{GroupKey, NonScalarKey};

/// Failures while regrouping collapsed search hits.
///
/// Every variant is a contract violation on the backend's side: the
/// search layer guarantees at least one record per collapsed hit and a
/// stable sort on the secondary field. These surface loudly instead of
/// silently dropping or merging groups.
#[derive(Debug, Error, PartialEq)]
pub enum ReshapeError {
    #[error("collapsed group `{0}` has no records")]
    EmptyGroup(GroupKey),

    #[error("record in group `{group}` is missing scalar field `{field}`")]
    MissingField { group: GroupKey, field: String },

    #[error("secondary key `{key}` in group `{group}` re-appears after its run ended")]
    SplitRun { group: GroupKey, key: GroupKey },

    #[error("bad grouping key: {0}")]
    BadKey(#[from] NonScalarKey),
}
