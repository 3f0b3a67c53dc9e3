use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::table::{LevelTable, NOT_FOUND, TableCandidate};

/// Outcome of an importance check: whether the entry clears the configured
/// minimum, and the lower-cased label the decision was made against.
/// `level` is `None` when no level could be resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub important: bool,
    pub level: Option<String>,
}

/// Decides whether a log entry is important enough to emit.
///
/// The gate owns exactly two pieces of state, both plain public fields:
/// the active level table and the configured level label. `levels` set to
/// `None` means "not yet initialized"; any resolution operation lazily
/// rebuilds the default table. The `level` label is free-form and may go
/// stale when the table is later replaced.
///
/// Every operation takes `&mut self`, so sharing a gate across threads is
/// the caller's concern: wrap it in a lock or swap immutable snapshots.
/// Single-call atomicity under concurrent table replacement is not
/// guaranteed.
#[derive(Debug, Clone)]
pub struct LevelGate {
    pub levels: Option<LevelTable>,
    pub level: String,
}

impl Default for LevelGate {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl LevelGate {
    /// Dual-convention constructor: a mapping first argument is treated as
    /// the custom level table; a string first argument that names a level
    /// in the built table is kept verbatim as the instance level, anything
    /// else defaults to the table's minimum level. Invalid-shape custom
    /// tables fall back to the default table silently.
    #[must_use]
    pub fn new(init: Option<&Value>, levels: Option<&Value>) -> Self {
        let table = match (TableCandidate::classify(init), TableCandidate::classify(levels)) {
            (TableCandidate::Mapping(mapping), _) | (_, TableCandidate::Mapping(mapping)) => {
                LevelTable::from_mapping(mapping)
            }
            _ => LevelTable::default(),
        };

        let level = match init.and_then(Value::as_str) {
            Some(label) if table.contains(&label.to_lowercase()) => label.to_string(),
            _ => table.minimum_level().to_string(),
        };

        Self {
            levels: Some(table),
            level,
        }
    }

    /// Wholesale-replaces the active table. Candidates that are not a
    /// mapping (null, arrays, scalars) are a silent no-op; entries without
    /// a finite numeric rank are dropped. Entries absent from the
    /// candidate are gone afterwards, even if they existed before.
    pub fn set_levels(&mut self, candidate: &Value) {
        match TableCandidate::classify(Some(candidate)) {
            TableCandidate::Mapping(mapping) => {
                let table = LevelTable::from_mapping(mapping);
                debug!(levels = table.len(), "replacing level table");
                self.levels = Some(table);
            }
            TableCandidate::Absent | TableCandidate::InvalidShape => {
                trace!("ignoring level table candidate with invalid shape");
            }
        };
    }

    /// Numeric rank of a level label; `NOT_FOUND` for non-strings and
    /// unknown labels. With `use_minimum_fallback` set, a label whose
    /// lookup yields the sentinel is replaced by the table's minimum level
    /// before the final lookup.
    pub fn resolve(&mut self, level: &Value, use_minimum_fallback: bool) -> f64 {
        let Some(label) = level.as_str() else {
            return NOT_FOUND;
        };

        let table = self.active_table();
        let mut key = label.to_lowercase();
        if use_minimum_fallback && table.rank(&key) == NOT_FOUND {
            key = table.minimum_level().to_string();
        }
        table.rank(&key)
    }

    /// Loudest label among an array of candidate tags, lower-cased.
    ///
    /// Returns `None` for non-arrays and when no candidate resolves to a
    /// rank >= 0. Ties favor the later candidate; unresolvable entries
    /// never win and never error.
    pub fn level_from_array(&mut self, tags: &Value) -> Option<String> {
        let tags = tags.as_array()?;

        let mut winner = None;
        let mut top_rank = 0.0;
        for tag in tags {
            let rank = self.resolve(tag, false);
            if rank >= top_rank {
                top_rank = rank;
                winner = tag.as_str().map(str::to_lowercase);
            }
        }
        winner
    }

    /// Resolved rank of `level` when it clears `min_rank`, `NOT_FOUND`
    /// otherwise. The minimum is truncated toward zero; a non-finite
    /// minimum counts as zero.
    pub fn compare(&mut self, level: &Value, min_rank: f64) -> f64 {
        let min_rank = if min_rank.is_finite() {
            min_rank.trunc()
        } else {
            0.0
        };

        let resolved = self.resolve(level, false);
        if resolved < 0.0 {
            return NOT_FOUND;
        }
        if resolved >= min_rank { resolved } else { NOT_FOUND }
    }

    /// Synchronous importance check: `level` (or the loudest of an array
    /// of levels) against `min_level`, which is resolved with the
    /// minimum-level fallback enabled.
    #[must_use]
    pub fn important_sync(&mut self, level: &Value, min_level: &Value) -> bool {
        self.decide(level, min_level, true).important
    }

    /// Asynchronous importance check.
    ///
    /// With `min_level` absent the instance's own `level` field is used,
    /// resolved without the minimum-level fallback: an instance configured
    /// at `off` stays silent for every input, while an explicit `"off"`
    /// argument falls back to the table minimum. The decision is computed
    /// before the first await; the future then yields to the scheduler
    /// once, so it never completes within the caller's current stack
    /// frame. It completes exactly once and cannot fail.
    pub async fn important(&mut self, level: &Value, min_level: Option<&Value>) -> Decision {
        let decision = match min_level {
            Some(min_level) => self.decide(level, min_level, true),
            None => {
                let configured = Value::String(self.level.clone());
                self.decide(level, &configured, false)
            }
        };
        tokio::task::yield_now().await;
        decision
    }

    fn decide(&mut self, level: &Value, min_level: &Value, use_minimum_fallback: bool) -> Decision {
        let mut decision = Decision::default();

        let min_rank = self.resolve(min_level, use_minimum_fallback);
        if min_rank == NOT_FOUND {
            return decision;
        }

        let level = if level.is_array() {
            let Some(winner) = self.level_from_array(level) else {
                return decision;
            };
            Value::String(winner)
        } else {
            level.clone()
        };

        if self.resolve(&level, false) < 0.0 {
            return decision;
        }

        // The label is reported even when the entry does not clear the bar.
        decision.level = level.as_str().map(str::to_lowercase);
        decision.important = self.compare(&level, min_rank) >= 0.0;
        decision
    }

    /// Active table, lazily rebuilt from the defaults when a consumer has
    /// cleared it.
    fn active_table(&mut self) -> &LevelTable {
        self.levels.get_or_insert_with(|| {
            trace!("level table missing, rebuilding the defaults");
            LevelTable::default()
        })
    }
}
