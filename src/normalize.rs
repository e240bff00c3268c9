//! Normalizer - canonicalizing heterogeneous device schemas.
//!
//! Device firmware variants report the same quantities under different field
//! shapes: positional lists, legacy key names, nested stat blocks. The
//! normalizer rewrites one record at a time through a fixed, ordered pipeline
//! of declarative [`Rule`]s so that downstream consumers see a single
//! canonical shape. Supporting a new firmware field means adding a rule, never
//! touching framing or pump code.
//!
//! Every rule removes the source key it consumes, which makes the pipeline
//! idempotent: normalizing an already-normalized record is a no-op.
//!
//! # Example
//!
//! ```
//! use nodeline::normalize::Normalizer;
//! use serde_json::json;
//!
//! let record = json!({
//!     "sender_node_id": 7,
//!     "spl": 61.2,
//!     "sender_battery": [1, 2, 3, 4],
//! });
//! let record = record.as_object().unwrap().clone();
//!
//! let canonical = Normalizer::standard().normalize(record);
//!
//! assert_eq!(canonical.get("laeq"), Some(&json!(61.2)));
//! assert_eq!(canonical.get("battery_total"), Some(&json!(1)));
//! assert!(canonical.get("spl").is_none());
//! ```

use serde_json::Value;

use crate::decode::{Message, SENDER_KEY};

/// Default key receiving the injected compound identifier.
pub const DEFAULT_ID_KEY: &str = "fqdn";

/// Infix marking records from this sensor generation in compound ids.
const ID_PREFIX: &str = "m2";

/// Marker key identifying an audio-event classification payload.
const CLASSIFIER_MARKER: &str = "dog";

/// One structural transform over a single record.
///
/// Rules are pure and independently testable; each consumes (removes) its
/// source key, so re-applying a rule to its own output changes nothing.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Replace a positional list with one key per position.
    ///
    /// `key: [a, b, ...]` becomes `{prefix}_{labels[0]}: a`,
    /// `{prefix}_{labels[1]}: b`, ... Positions beyond the label sequence are
    /// dropped; a non-list value leaves the record untouched.
    ExpandList {
        key: &'static str,
        prefix: &'static str,
        labels: &'static [&'static str],
    },
    /// Move a value from an old key to its canonical name.
    Rename {
        from: &'static str,
        to: &'static str,
    },
    /// Merge a nested object's entries into the top level, last write wins.
    FlattenMap { key: &'static str },
    /// Rename a generic payload object to `target` when it carries `marker`.
    PromotePayload {
        key: &'static str,
        marker: &'static str,
        target: &'static str,
    },
}

impl Rule {
    /// Apply this rule to `record` in place.
    pub fn apply(&self, record: &mut Message) {
        match *self {
            Rule::ExpandList {
                key,
                prefix,
                labels,
            } => {
                if !matches!(record.get(key), Some(Value::Array(_))) {
                    return;
                }
                // shift_remove keeps the order of the remaining keys stable.
                let Some(Value::Array(items)) = record.shift_remove(key) else {
                    return;
                };
                for (label, item) in labels.iter().zip(items) {
                    record.insert(format!("{}_{}", prefix, label), item);
                }
            }
            Rule::Rename { from, to } => {
                if let Some(value) = record.shift_remove(from) {
                    record.insert(to.to_string(), value);
                }
            }
            Rule::FlattenMap { key } => {
                if !matches!(record.get(key), Some(Value::Object(_))) {
                    return;
                }
                let Some(Value::Object(inner)) = record.shift_remove(key) else {
                    return;
                };
                for (k, v) in inner {
                    record.insert(k, v);
                }
            }
            Rule::PromotePayload {
                key,
                marker,
                target,
            } => {
                let is_marked = record
                    .get(key)
                    .and_then(Value::as_object)
                    .is_some_and(|m| m.contains_key(marker));
                if is_marked {
                    if let Some(payload) = record.shift_remove(key) {
                        record.insert(target.to_string(), payload);
                    }
                }
            }
        }
    }
}

/// The fixed transform table for current device firmware.
pub fn standard_rules() -> Vec<Rule> {
    vec![
        // Rolling averages at two fixed lookback windows.
        Rule::ExpandList {
            key: "sender_power",
            prefix: "power",
            labels: &["1h", "24h"],
        },
        Rule::ExpandList {
            key: "sender_solar",
            prefix: "solar",
            labels: &["1h", "24h"],
        },
        // Pack total followed by the four cell readings.
        Rule::ExpandList {
            key: "sender_battery",
            prefix: "battery",
            labels: &["total", "cell0", "cell1", "cell2", "cell3"],
        },
        Rule::Rename {
            from: "spl",
            to: "laeq",
        },
        Rule::Rename {
            from: "class_probs",
            to: "classification",
        },
        Rule::FlattenMap { key: "spl_stats" },
        Rule::PromotePayload {
            key: "payload",
            marker: CLASSIFIER_MARKER,
            target: "classification",
        },
    ]
}

/// Applies the transform pipeline, optionally injecting a compound identity.
pub struct Normalizer {
    rules: Vec<Rule>,
    identity: Option<Identity>,
}

struct Identity {
    base: String,
    key: String,
}

impl Normalizer {
    /// Normalizer with the standard rule set and no identity injection.
    pub fn standard() -> Self {
        Self {
            rules: standard_rules(),
            identity: None,
        }
    }

    /// Normalizer with a caller-provided rule set.
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            identity: None,
        }
    }

    /// Inject `"<base>-m2-<sender_node_id>"` under the default `fqdn` key.
    pub fn with_identity(self, base: impl Into<String>) -> Self {
        self.with_identity_key(base, DEFAULT_ID_KEY)
    }

    /// Inject the compound identity under a custom key.
    pub fn with_identity_key(mut self, base: impl Into<String>, key: impl Into<String>) -> Self {
        self.identity = Some(Identity {
            base: base.into(),
            key: key.into(),
        });
        self
    }

    /// Rewrite one record into its canonical shape.
    pub fn normalize(&self, mut record: Message) -> Message {
        if let Some(identity) = &self.identity {
            if let Some(node) = record.get(SENDER_KEY) {
                let compound = format!("{}-{}-{}", identity.base, ID_PREFIX, value_label(node));
                record.insert(identity.key.clone(), Value::String(compound));
            }
        }
        for rule in &self.rules {
            rule.apply(&mut record);
        }
        record
    }

    /// Normalize a whole batch, preserving order.
    pub fn normalize_batch(&self, records: Vec<Message>) -> Vec<Message> {
        records.into_iter().map(|r| self.normalize(r)).collect()
    }
}

/// Render a JSON value as a bare label (no quotes around strings).
pub(crate) fn value_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
