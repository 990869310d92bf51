use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::warn;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Tag that marks a statistics line in a step log:
/// `*RESULT: <key>: <value>`.
pub const INFO_TAG: &str = "*RESULT";

/// Sheets caps cells at 50 000 characters; text values stop accumulating
/// before crossing it.
pub const CELL_CHAR_LIMIT: usize = 50_000;

/// Counter keys that are expected to sum to the `Total` key when present.
pub const PARTIAL_SUM_KEYS: [&str; 6] = [
    "Passed",
    "Failed",
    "Skipped",
    "Not Supported",
    "Exception",
    "Crashed",
];

// ---------------------------------------------------------------------------
// StatValue
// ---------------------------------------------------------------------------

/// One parsed statistic. Integer values for a repeated key are summed;
/// non-integer values are concatenated line by line (capped, see
/// [`CELL_CHAR_LIMIT`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatValue {
    Int(i64),
    Text(String),
}

impl StatValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            StatValue::Int(n) => Some(*n),
            StatValue::Text(_) => None,
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Int(n) => write!(f, "{n}"),
            StatValue::Text(s) => f.write_str(s),
        }
    }
}

// ---------------------------------------------------------------------------
// StepStats
// ---------------------------------------------------------------------------

/// Statistics parsed from a single step log: `stat key → value`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepStats {
    values: BTreeMap<String, StatValue>,
}

impl StepStats {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&StatValue> {
        self.values.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }
}

impl<const N: usize> From<[(&str, StatValue); N]> for StepStats {
    fn from(entries: [(&str, StatValue); N]) -> Self {
        Self {
            values: entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse every `*RESULT: <key>: <value>` line out of a step log.
///
/// The text after the tag must split on `:` into exactly three fields (the
/// empty head, the key, and the value); anything else is logged and skipped.
/// A value whose trimmed form parses as an integer is summed into the key;
/// any other value is treated as text and appended under the per-cell cap.
/// A key that first appeared as text keeps accumulating raw value text even
/// if later values look numeric; a numeric key that meets a non-numeric
/// value skips the line with a warning.
pub fn parse_step_log(log: &str) -> StepStats {
    let mut stats = StepStats::default();
    let mut capped: BTreeSet<String> = BTreeSet::new();

    for line in log.lines() {
        let Some(tag_at) = line.find(INFO_TAG) else {
            continue;
        };
        let tail = &line[tag_at + INFO_TAG.len()..];
        let columns: Vec<&str> = tail.split(':').collect();
        if columns.len() != 3 {
            warn!("line improperly formatted: '{line}'");
            continue;
        }
        let key = columns[1].trim();
        let value = columns[2];

        match value.trim().parse::<i64>() {
            Ok(n) => match stats.values.get_mut(key) {
                None => {
                    stats.values.insert(key.to_string(), StatValue::Int(n));
                }
                Some(StatValue::Int(total)) => *total += n,
                Some(StatValue::Text(text)) => {
                    append_text(key, text, value.trim(), &mut capped);
                }
            },
            Err(_) => match stats.values.get_mut(key) {
                None => {
                    stats
                        .values
                        .insert(key.to_string(), StatValue::Text(value.trim().to_string()));
                }
                Some(StatValue::Text(text)) => {
                    append_text(key, text, value.trim(), &mut capped);
                }
                Some(StatValue::Int(_)) => {
                    warn!("non-numeric value for numeric stat '{key}': '{line}'");
                }
            },
        }
    }

    stats
}

fn append_text(key: &str, text: &mut String, addition: &str, capped: &mut BTreeSet<String>) {
    if text.len() + 1 + addition.len() < CELL_CHAR_LIMIT {
        text.push('\n');
        text.push_str(addition);
    } else if capped.insert(key.to_string()) {
        warn!("too many characters in column '{key}', output capped");
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A declared `Total` that disagrees with the sum of the partial counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalsMismatch {
    pub declared: StatValue,
    pub computed: i64,
}

/// Check the `Total` key (when present) against the sum of the partial
/// counters in [`PARTIAL_SUM_KEYS`]. Returns the mismatch, if any; callers
/// log it and keep the stats.
pub fn totals_mismatch(stats: &StepStats) -> Option<TotalsMismatch> {
    let declared = stats.get("Total")?;
    let computed: i64 = PARTIAL_SUM_KEYS
        .iter()
        .filter_map(|key| stats.get(key).and_then(StatValue::as_int))
        .sum();
    match declared.as_int() {
        Some(total) if total == computed => None,
        _ => Some(TotalsMismatch {
            declared: declared.clone(),
            computed,
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
