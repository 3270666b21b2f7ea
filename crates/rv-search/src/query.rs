//! Query DSL builders.
//!
//! Everything the DAOs send is assembled here as `serde_json` values, so
//! the exact request bodies can be asserted in tests without a live
//! backend.

use serde_json::{json, Map, Value};

/// Backend-side ceiling for every search issued by this service.
pub const SEARCH_TIMEOUT: &str = "300s";

pub fn match_all() -> Value {
    json!({ "match_all": {} })
}

pub fn term(field: &str, value: impl Into<Value>) -> Value {
    json!({ "term": { field: value.into() } })
}

pub fn match_query(field: &str, value: impl Into<Value>) -> Value {
    json!({ "match": { field: value.into() } })
}

pub fn wildcard(field: &str, pattern: &str) -> Value {
    json!({ "wildcard": { field: { "value": pattern } } })
}

pub fn regexp(field: &str, pattern: &str) -> Value {
    json!({ "regexp": { field: { "value": pattern } } })
}

pub fn range(field: &str, gte: i64, lte: i64) -> Value {
    json!({ "range": { field: { "gte": gte, "lte": lte } } })
}

/// `bool` query matching any of the given clauses.
pub fn should_any(clauses: Vec<Value>) -> Value {
    json!({ "bool": { "should": clauses } })
}

/// `bool` query requiring all of the given clauses.
pub fn must_all(clauses: Vec<Value>) -> Value {
    json!({ "bool": { "must": clauses } })
}

/// `bool` query with scoring clauses and non-scoring filters.
pub fn must_with_filter(must: Vec<Value>, filter: Vec<Value>) -> Value {
    json!({ "bool": { "must": must, "filter": filter } })
}

pub fn sort_asc(field: &str) -> Value {
    json!({ field: { "order": "asc" } })
}

/// Field collapse with named inner hits.
pub fn collapse(field: &str, inner_name: &str, inner_size: usize, inner_sorts: Vec<Value>) -> Value {
    let mut inner = json!({ "name": inner_name, "size": inner_size });
    if !inner_sorts.is_empty() {
        inner["sort"] = Value::Array(inner_sorts);
    }
    json!({ "field": field, "inner_hits": inner })
}

pub fn terms_agg(field: &str) -> Value {
    json!({ "terms": { "field": field } })
}

pub fn min_agg(field: &str) -> Value {
    json!({ "min": { "field": field } })
}

pub fn max_agg(field: &str) -> Value {
    json!({ "max": { "field": field } })
}

/// Keyed `filters` aggregation matching `*<key>*` on the given field,
/// one bucket per key. Buckets come back keyed, zero counts included.
pub fn keyed_wildcard_filters(field: &str, keys: &[String]) -> Value {
    let filters: Map<String, Value> = keys
        .iter()
        .map(|key| (key.clone(), wildcard(field, &format!("*{}*", key))))
        .collect();
    json!({ "filters": { "filters": filters } })
}

/// Search request body under construction. Mirrors the shape the backend
/// expects: size, timeout, query, sort, collapse, aggs.
pub struct SearchBody {
    body: Map<String, Value>,
}

impl SearchBody {
    pub fn new(size: usize) -> Self {
        let mut body = Map::new();
        body.insert("size".into(), json!(size));
        body.insert("timeout".into(), json!(SEARCH_TIMEOUT));
        Self { body }
    }

    pub fn query(mut self, query: Value) -> Self {
        self.body.insert("query".into(), query);
        self
    }

    pub fn sort(mut self, sort: Value) -> Self {
        match self.body.get_mut("sort") {
            Some(Value::Array(sorts)) => sorts.push(sort),
            _ => {
                self.body.insert("sort".into(), json!([sort]));
            }
        }
        self
    }

    pub fn collapse(mut self, collapse: Value) -> Self {
        self.body.insert("collapse".into(), collapse);
        self
    }

    pub fn agg(mut self, name: &str, mut agg: Value, sub_aggs: Vec<(&str, Value)>) -> Self {
        if !sub_aggs.is_empty() {
            let subs: Map<String, Value> = sub_aggs
                .into_iter()
                .map(|(n, a)| (n.to_string(), a))
                .collect();
            agg["aggs"] = Value::Object(subs);
        }
        let aggs = self
            .body
            .entry("aggs".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = aggs {
            map.insert(name.to_string(), agg);
        }
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_body_shape() {
        let body = SearchBody::new(10000)
            .query(match_all())
            .sort(sort_asc("timestamp"))
            .build();
        assert_eq!(body["size"], 10000);
        assert_eq!(body["timeout"], SEARCH_TIMEOUT);
        assert_eq!(body["query"], json!({"match_all": {}}));
        assert_eq!(body["sort"], json!([{"timestamp": {"order": "asc"}}]));
    }

    #[test]
    fn test_collapse_with_inner_sorts() {
        let c = collapse(
            "training_run_id",
            "by_training_run_id",
            10000,
            vec![sort_asc("timestamp")],
        );
        assert_eq!(c["field"], "training_run_id");
        assert_eq!(c["inner_hits"]["name"], "by_training_run_id");
        assert_eq!(c["inner_hits"]["size"], 10000);
        assert_eq!(
            c["inner_hits"]["sort"],
            json!([{"timestamp": {"order": "asc"}}])
        );
    }

    #[test]
    fn test_terms_agg_with_min_max_subs() {
        let body = SearchBody::new(0)
            .agg(
                "phases_aggregation",
                terms_agg("phase_id"),
                vec![
                    ("max_timestamp", max_agg("timestamp")),
                    ("min_timestamp", min_agg("timestamp")),
                ],
            )
            .build();
        let agg = &body["aggs"]["phases_aggregation"];
        assert_eq!(agg["terms"]["field"], "phase_id");
        assert_eq!(agg["aggs"]["min_timestamp"], json!({"min": {"field": "timestamp"}}));
        assert_eq!(agg["aggs"]["max_timestamp"], json!({"max": {"field": "timestamp"}}));
    }

    #[test]
    fn test_keyed_wildcard_filters() {
        let agg = keyed_wildcard_filters("cmd", &["ls".into(), "cat".into()]);
        assert_eq!(
            agg["filters"]["filters"]["ls"],
            json!({"wildcard": {"cmd": {"value": "*ls*"}}})
        );
        assert_eq!(
            agg["filters"]["filters"]["cat"],
            json!({"wildcard": {"cmd": {"value": "*cat*"}}})
        );
    }

    #[test]
    fn test_bool_combinators() {
        let q = must_with_filter(
            vec![should_any(vec![match_query("phase_id", 1)])],
            vec![wildcard("type", "*PhaseStarted")],
        );
        assert_eq!(q["bool"]["must"][0]["bool"]["should"][0]["match"]["phase_id"], 1);
        assert_eq!(
            q["bool"]["filter"][0]["wildcard"]["type"]["value"],
            "*PhaseStarted"
        );
    }
}
