//! Typed decoding of search responses.
//!
//! This is the only place the loosely typed backend JSON is interpreted:
//! collapse keys, named inner hits, and aggregation buckets all come
//! through here before anything in `rv-core` sees them.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use rv_core::{GroupKey, Record};

use crate::error::SearchError;

#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: HitsEnvelope,
    #[serde(default)]
    pub aggregations: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HitsEnvelope {
    #[serde(default)]
    pub total: TotalHits,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TotalHits {
    #[serde(default)]
    pub value: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct Hit {
    #[serde(rename = "_source", default)]
    pub source: Record,
    /// Doc-value fields; the collapse field shows up here as a
    /// single-element array.
    #[serde(default)]
    pub fields: HashMap<String, Vec<Value>>,
    #[serde(default)]
    pub inner_hits: HashMap<String, InnerHits>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InnerHits {
    #[serde(default)]
    pub hits: HitsEnvelope,
}

impl Hit {
    /// The collapse key of this hit, read from the doc-value fields.
    pub fn collapse_key(&self, field: &str) -> Result<GroupKey, SearchError> {
        let value = self
            .fields
            .get(field)
            .and_then(|values| values.first())
            .ok_or_else(|| {
                SearchError::Malformed(format!("collapsed hit has no `{}` field value", field))
            })?;
        GroupKey::from_json(value)
            .map_err(|e| SearchError::Malformed(format!("bad collapse key for `{}`: {}", field, e)))
    }

    /// Inner-hit sources for the named collapse, in response order.
    pub fn inner_records(&self, name: &str) -> Result<Vec<Record>, SearchError> {
        let inner = self.inner_hits.get(name).ok_or_else(|| {
            SearchError::Malformed(format!("collapsed hit has no `{}` inner hits", name))
        })?;
        Ok(inner.hits.hits.iter().map(|h| h.source.clone()).collect())
    }

    pub fn source_i64(&self, field: &str) -> Result<i64, SearchError> {
        self.source
            .get(field)
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                SearchError::Malformed(format!("hit source has no numeric `{}` field", field))
            })
    }
}

/// Walk the named terms aggregation and return its buckets.
pub fn terms_buckets<'a>(
    aggregations: &'a Option<Value>,
    name: &str,
) -> Result<&'a [Value], SearchError> {
    let buckets = aggregations
        .as_ref()
        .and_then(|aggs| aggs.get(name))
        .and_then(|agg| agg.get("buckets"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            SearchError::Malformed(format!("response has no `{}` terms aggregation", name))
        })?;
    Ok(buckets)
}

pub fn bucket_key_i64(bucket: &Value) -> Result<i64, SearchError> {
    bucket
        .get("key")
        .and_then(Value::as_i64)
        .ok_or_else(|| SearchError::Malformed("terms bucket has a non-numeric key".into()))
}

/// Value of a min/max sub-aggregation, truncated from the backend's
/// float representation.
pub fn sub_agg_value_i64(bucket: &Value, name: &str) -> Result<i64, SearchError> {
    bucket
        .get(name)
        .and_then(|agg| agg.get("value"))
        .and_then(Value::as_f64)
        .map(|v| v as i64)
        .ok_or_else(|| {
            SearchError::Malformed(format!("bucket has no `{}` sub-aggregation value", name))
        })
}

/// Per-key doc counts of a keyed `filters` aggregation nested in a terms
/// bucket (or at the response top level when `container` is the
/// aggregations object itself).
pub fn keyed_filter_counts(
    container: &Value,
    name: &str,
) -> Result<IndexMap<String, u64>, SearchError> {
    let buckets = container
        .get(name)
        .and_then(|agg| agg.get("buckets"))
        .and_then(Value::as_object)
        .ok_or_else(|| {
            SearchError::Malformed(format!("response has no `{}` filters aggregation", name))
        })?;

    Ok(buckets
        .iter()
        .map(|(key, bucket)| {
            let count = bucket.get("doc_count").and_then(Value::as_u64).unwrap_or(0);
            (key.clone(), count)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> SearchResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_decodes_flat_hits() {
        let resp = decode(json!({
            "hits": {
                "total": {"value": 2},
                "hits": [
                    {"_source": {"timestamp": 5, "level": 1}},
                    {"_source": {"timestamp": 9, "level": 1}}
                ]
            }
        }));
        assert_eq!(resp.hits.total.value, 2);
        assert_eq!(resp.hits.hits.len(), 2);
        assert_eq!(resp.hits.hits[0].source["timestamp"], json!(5));
    }

    #[test]
    fn test_collapse_key_and_inner_records() {
        let resp = decode(json!({
            "hits": {"hits": [{
                "_source": {"training_run_id": 3},
                "fields": {"training_run_id": [3]},
                "inner_hits": {
                    "by_training_run_id": {
                        "hits": {"hits": [
                            {"_source": {"level": 1, "timestamp": 10}},
                            {"_source": {"level": 1, "timestamp": 20}}
                        ]}
                    }
                }
            }]}
        }));
        let hit = &resp.hits.hits[0];
        assert_eq!(hit.collapse_key("training_run_id").unwrap(), GroupKey::Int(3));
        let records = hit.inner_records("by_training_run_id").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["timestamp"], json!(20));
    }

    #[test]
    fn test_missing_inner_hits_is_malformed() {
        let resp = decode(json!({
            "hits": {"hits": [{"_source": {}, "fields": {"level": [2]}}]}
        }));
        let hit = &resp.hits.hits[0];
        assert!(hit.inner_records("by_level").is_err());
    }

    #[test]
    fn test_terms_buckets_with_min_max() {
        let resp = decode(json!({
            "hits": {"total": {"value": 0}, "hits": []},
            "aggregations": {
                "phases_aggregation": {
                    "buckets": [
                        {
                            "key": 1,
                            "doc_count": 2,
                            "min_timestamp": {"value": 100.0},
                            "max_timestamp": {"value": 450.0}
                        }
                    ]
                }
            }
        }));
        let buckets = terms_buckets(&resp.aggregations, "phases_aggregation").unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(bucket_key_i64(&buckets[0]).unwrap(), 1);
        assert_eq!(sub_agg_value_i64(&buckets[0], "min_timestamp").unwrap(), 100);
        assert_eq!(sub_agg_value_i64(&buckets[0], "max_timestamp").unwrap(), 450);
    }

    #[test]
    fn test_keyed_filter_counts_keep_zeros() {
        let bucket = json!({
            "key": 1,
            "type_filter": {
                "buckets": {
                    "SolutionDisplayed": {"doc_count": 1},
                    "WrongAnswerSubmitted": {"doc_count": 0}
                }
            }
        });
        let counts = keyed_filter_counts(&bucket, "type_filter").unwrap();
        assert_eq!(counts["SolutionDisplayed"], 1);
        assert_eq!(counts["WrongAnswerSubmitted"], 0);
    }

    #[test]
    fn test_empty_response_decodes() {
        let resp = decode(json!({}));
        assert!(resp.hits.hits.is_empty());
        assert!(resp.aggregations.is_none());
    }
}
