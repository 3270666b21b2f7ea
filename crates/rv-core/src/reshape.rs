//! Regrouping of collapsed search hits.
//!
//! A collapse query returns one hit per distinct primary key, each
//! carrying an ordered list of inner records pre-sorted by the secondary
//! field (then timestamp). [`regroup`] walks each list once and slices it
//! into runs of equal secondary-field values, producing the nested
//! primary → secondary → records map the API serves.

use serde_json::Value;

use crate::error::ReshapeError;
use crate::grouped::GroupedMap;
use crate::value::GroupKey;

/// A decoded telemetry document.
pub type Record = serde_json::Map<String, Value>;

/// One collapsed hit: the primary key plus its inner records, in the
/// order the backend returned them.
#[derive(Debug, Clone)]
pub struct CollapsedGroup {
    pub key: GroupKey,
    pub records: Vec<Record>,
}

/// Regroup collapsed hits into a two-level map keyed by the primary key
/// and runs of `secondary_field`.
///
/// Record order within a run and group order across the map follow the
/// input exactly. The trailing run of every group is always flushed.
pub fn regroup(
    groups: Vec<CollapsedGroup>,
    secondary_field: &str,
) -> Result<GroupedMap<GroupKey, GroupKey, Record>, ReshapeError> {
    let mut out = GroupedMap::new();

    for group in groups {
        if group.records.is_empty() {
            return Err(ReshapeError::EmptyGroup(group.key));
        }

        let mut current_key: Option<GroupKey> = None;
        let mut run: Vec<Record> = Vec::new();

        for record in group.records {
            let key = secondary_key(&group.key, &record, secondary_field)?;
            match &current_key {
                Some(k) if *k == key => {}
                Some(k) => {
                    flush(&mut out, &group.key, k.clone(), std::mem::take(&mut run))?;
                    current_key = Some(key);
                }
                None => current_key = Some(key),
            }
            run.push(record);
        }

        if let Some(k) = current_key {
            flush(&mut out, &group.key, k, run)?;
        }
    }

    Ok(out)
}

fn secondary_key(
    group: &GroupKey,
    record: &Record,
    field: &str,
) -> Result<GroupKey, ReshapeError> {
    let value = record.get(field).ok_or_else(|| ReshapeError::MissingField {
        group: group.clone(),
        field: field.to_string(),
    })?;
    GroupKey::from_json(value).map_err(|_| ReshapeError::MissingField {
        group: group.clone(),
        field: field.to_string(),
    })
}

fn flush(
    out: &mut GroupedMap<GroupKey, GroupKey, Record>,
    primary: &GroupKey,
    secondary: GroupKey,
    run: Vec<Record>,
) -> Result<(), ReshapeError> {
    if !out.insert_run(primary.clone(), secondary.clone(), run) {
        return Err(ReshapeError::SplitRun {
            group: primary.clone(),
            key: secondary,
        });
    }
    Ok(())
}
