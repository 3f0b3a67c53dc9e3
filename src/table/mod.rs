use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Rank returned when a label cannot be resolved.
///
/// A stored rank of exactly `-1` (the default `off` level) is
/// indistinguishable from not-found. That collision is load-bearing: a
/// minimum level of `off` looks unresolved and therefore falls back to the
/// table minimum when fallback is requested, while more negative ranks
/// (e.g. a custom `no: -2`) stay resolvable.
pub const NOT_FOUND: f64 = -1.0;

/// Label reported when no minimum level can be determined.
pub const FALLBACK_LEVEL: &str = "trace";

const DEFAULT_LEVELS: [(&str, f64); 7] = [
    ("off", -1.0),
    ("fatal", 16.0),
    ("error", 8.0),
    ("warn", 4.0),
    ("info", 2.0),
    ("debug", 1.0),
    ("trace", 0.0),
];

/// Shape of a dynamic table candidate. Constructor and setter inputs are
/// classified once and branched exhaustively instead of duck-typed.
#[derive(Debug, Clone, Copy)]
pub(crate) enum TableCandidate<'a> {
    Absent,
    InvalidShape,
    Mapping(&'a serde_json::Map<String, Value>),
}

impl<'a> TableCandidate<'a> {
    pub(crate) fn classify(candidate: Option<&'a Value>) -> Self {
        match candidate {
            None | Some(Value::Null) => Self::Absent,
            Some(Value::Object(mapping)) => Self::Mapping(mapping),
            Some(_) => Self::InvalidShape,
        }
    }
}

/// Active mapping from lower-cased level name to numeric rank.
///
/// Every key is stored lower-case and every value is finite. Tables are
/// rebuilt wholesale on each update, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelTable(IndexMap<String, f64>);

impl Default for LevelTable {
    fn default() -> Self {
        Self(
            DEFAULT_LEVELS
                .iter()
                .map(|(name, rank)| ((*name).to_string(), *rank))
                .collect(),
        )
    }
}

impl LevelTable {
    /// Builds a table from a mapping candidate: keys are lower-cased and
    /// entries without a finite numeric rank are dropped. When two keys
    /// fold to the same lower-case name the later value wins.
    pub(crate) fn from_mapping(mapping: &serde_json::Map<String, Value>) -> Self {
        let mut table = IndexMap::with_capacity(mapping.len());
        for (name, value) in mapping {
            let Some(rank) = finite_rank(value) else {
                debug!(level = %name, "dropping level without a finite rank");
                continue;
            };
            table.insert(name.to_lowercase(), rank);
        }
        Self(table)
    }

    /// Rank of a lower-cased label, `NOT_FOUND` when absent.
    pub fn rank(&self, label: &str) -> f64 {
        self.0.get(label).copied().unwrap_or(NOT_FOUND)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains_key(label)
    }

    /// Label of the lowest-ranked level that is still enabled (rank >= 0).
    /// Ties go to the entry encountered first.
    pub fn minimum_level(&self) -> &str {
        let mut minimum = FALLBACK_LEVEL;
        let mut lowest = f64::INFINITY;
        for (name, rank) in &self.0 {
            if *rank >= 0.0 && *rank < lowest {
                lowest = *rank;
                minimum = name;
            }
        }
        minimum
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Minimum-level label of an arbitrary candidate value.
///
/// Non-mappings yield `"trace"`. Otherwise the key of the smallest finite
/// rank >= 0 wins; disabled (negative) and non-finite entries are never
/// chosen. Keys are reported as-is, without normalization.
pub fn minimum_level(candidate: &Value) -> String {
    let TableCandidate::Mapping(mapping) = TableCandidate::classify(Some(candidate)) else {
        return FALLBACK_LEVEL.to_string();
    };

    let mut minimum = FALLBACK_LEVEL;
    let mut lowest = f64::INFINITY;
    for (name, value) in mapping {
        let Some(rank) = finite_rank(value) else {
            continue;
        };
        if rank >= 0.0 && rank < lowest {
            lowest = rank;
            minimum = name;
        }
    }
    minimum.to_string()
}

fn finite_rank(value: &Value) -> Option<f64> {
    value.as_f64().filter(|rank| rank.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_table_ranks() {
        let table = LevelTable::default();
        assert_eq!(table.rank("off"), -1.0);
        assert_eq!(table.rank("fatal"), 16.0);
        assert_eq!(table.rank("trace"), 0.0);
        assert_eq!(table.len(), 7);
    }

    #[test]
    fn test_default_table_minimum_skips_off() {
        let table = LevelTable::default();
        assert_eq!(table.minimum_level(), "trace");
    }

    #[test]
    fn test_from_mapping_lower_cases_keys() {
        let mapping = json!({"INFO": 2, "Warn": 4});
        let table = LevelTable::from_mapping(mapping.as_object().unwrap());
        assert_eq!(table.rank("info"), 2.0);
        assert_eq!(table.rank("warn"), 4.0);
        assert!(!table.contains("INFO"));
    }

    #[test]
    fn test_from_mapping_later_duplicate_wins() {
        let mapping = json!({"none": -2, "trace": 0, "TRACE": 1, "tracE": 2, "information": 3});
        let table = LevelTable::from_mapping(mapping.as_object().unwrap());
        assert_eq!(table.len(), 3);
        assert_eq!(table.rank("trace"), 2.0);
        assert_eq!(table.rank("none"), -2.0);
        assert_eq!(table.rank("information"), 3.0);
    }

    #[test]
    fn test_from_mapping_drops_non_numeric_and_null() {
        let mapping = json!({"info": 0, "trace": 1, "not-finite": "bla", "null": null});
        let table = LevelTable::from_mapping(mapping.as_object().unwrap());
        assert_eq!(table.len(), 2);
        assert_eq!(table.rank("not-finite"), NOT_FOUND);
        assert_eq!(table.rank("null"), NOT_FOUND);
    }

    #[test]
    fn test_minimum_level_of_candidate_values() {
        assert_eq!(minimum_level(&json!({"info": 0, "trace": 1})), "info");
        assert_eq!(minimum_level(&json!([])), "trace");
        assert_eq!(minimum_level(&Value::Null), "trace");
        assert_eq!(minimum_level(&json!({})), "trace");
        assert_eq!(minimum_level(&json!("warn")), "trace");
    }

    #[test]
    fn test_minimum_level_ignores_disabled_and_non_finite() {
        let candidate = json!({"off": -1, "loud": 10, "quiet": 3, "bad": "x"});
        assert_eq!(minimum_level(&candidate), "quiet");
    }
}
