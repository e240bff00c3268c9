//! Grouper - partitioning record batches by sender.
//!
//! Batches arriving from the pump interleave messages from every node on the
//! network. [`group_by`] partitions a batch by a key's value (normally
//! `sender_node_id`) so each node's records can be consumed, merged or
//! persisted together.

use serde_json::Value;

use crate::decode::{Message, SENDER_KEY};

/// Records partitioned by key value.
///
/// Group order is first-seen order; within a group, records keep their input
/// order. Records missing the key land in a `Null`-keyed group.
pub struct Groups {
    groups: Vec<(Value, Vec<Message>)>,
}

impl Groups {
    /// Look up one group by its key value.
    pub fn get(&self, key: &Value) -> Option<&[Message]> {
        self.groups
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, records)| records.as_slice())
    }

    /// Iterate groups in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&Value, &[Message])> {
        self.groups.iter().map(|(k, records)| (k, records.as_slice()))
    }

    /// The distinct key values, in first-seen order.
    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.groups.iter().map(|(k, _)| k)
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there are no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl IntoIterator for Groups {
    type Item = (Value, Vec<Message>);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

/// Partition `records` by the value under `key`.
///
/// Every record lands in exactly one group. Sender counts are small, so
/// groups live in a plain vector scanned linearly.
pub fn group_by(records: impl IntoIterator<Item = Message>, key: &str) -> Groups {
    let mut groups: Vec<(Value, Vec<Message>)> = Vec::new();

    for record in records {
        let k = record.get(key).cloned().unwrap_or(Value::Null);
        match groups.iter_mut().find(|(existing, _)| *existing == k) {
            Some((_, bucket)) => bucket.push(record),
            None => groups.push((k, vec![record])),
        }
    }

    Groups { groups }
}

/// Partition `records` by `sender_node_id`.
pub fn group_by_sender(records: impl IntoIterator<Item = Message>) -> Groups {
    group_by(records, SENDER_KEY)
}

/// Fold each group into one record by sequential key-value update.
///
/// Later records override earlier ones on key collision (last write wins);
/// this is a flat reduction, not a structural merge of nested values. Returns
/// one record per group, in group order.
pub fn merge(groups: Groups) -> Vec<Message> {
    merge_from(groups, None)
}

/// Like [`merge`], but every fold starts from a clone of `base`.
pub fn merge_with_base(groups: Groups, base: &Message) -> Vec<Message> {
    merge_from(groups, Some(base))
}

fn merge_from(groups: Groups, base: Option<&Message>) -> Vec<Message> {
    groups
        .into_iter()
        .map(|(_, records)| {
            let mut out = base.cloned().unwrap_or_default();
            for record in records {
                for (k, v) in record {
                    out.insert(k, v);
                }
            }
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Message {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_two_senders_partition() {
        let records = vec![
            record(json!({ "sender_node_id": 5, "spl": 60.0 })),
            record(json!({ "sender_node_id": 9, "spl": 55.0 })),
        ];

        let groups = group_by_sender(records);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups.get(&json!(5)).unwrap().len(), 1);
        assert_eq!(groups.get(&json!(9)).unwrap().len(), 1);
    }

    #[test]
    fn test_every_record_in_exactly_one_group() {
        let records: Vec<Message> = (0..20)
            .map(|i| record(json!({ "sender_node_id": i % 3, "seq": i })))
            .collect();

        let groups = group_by_sender(records);

        let total: usize = groups.iter().map(|(_, r)| r.len()).sum();
        assert_eq!(total, 20);
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn test_group_order_is_first_seen() {
        let records = vec![
            record(json!({ "sender_node_id": 9 })),
            record(json!({ "sender_node_id": 5 })),
            record(json!({ "sender_node_id": 9 })),
        ];

        let groups = group_by_sender(records);

        let keys: Vec<Value> = groups.keys().cloned().collect();
        assert_eq!(keys, vec![json!(9), json!(5)]);
    }

    #[test]
    fn test_within_group_order_matches_input() {
        let records = vec![
            record(json!({ "sender_node_id": 1, "seq": 0 })),
            record(json!({ "sender_node_id": 2, "seq": 1 })),
            record(json!({ "sender_node_id": 1, "seq": 2 })),
            record(json!({ "sender_node_id": 1, "seq": 3 })),
        ];

        let groups = group_by_sender(records);

        let seqs: Vec<i64> = groups
            .get(&json!(1))
            .unwrap()
            .iter()
            .map(|r| r.get("seq").and_then(|v| v.as_i64()).unwrap())
            .collect();
        assert_eq!(seqs, vec![0, 2, 3]);
    }

    #[test]
    fn test_missing_key_groups_under_null() {
        let records = vec![
            record(json!({ "spl": 60.0 })),
            record(json!({ "sender_node_id": 1 })),
        ];

        let groups = group_by_sender(records);

        assert_eq!(groups.get(&Value::Null).unwrap().len(), 1);
    }

    #[test]
    fn test_merge_last_write_wins() {
        let records = vec![
            record(json!({ "sender_node_id": 1, "spl": 60.0, "uptime": 10 })),
            record(json!({ "sender_node_id": 1, "spl": 62.5 })),
        ];

        let merged = merge(group_by_sender(records));

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].get("spl"), Some(&json!(62.5)));
        assert_eq!(merged[0].get("uptime"), Some(&json!(10)));
    }

    #[test]
    fn test_merge_with_base() {
        let base = record(json!({ "site": "rooftop", "spl": 0.0 }));
        let records = vec![record(json!({ "sender_node_id": 1, "spl": 61.0 }))];

        let merged = merge_with_base(group_by_sender(records), &base);

        assert_eq!(merged[0].get("site"), Some(&json!("rooftop")));
        assert_eq!(merged[0].get("spl"), Some(&json!(61.0)));
    }

    #[test]
    fn test_merge_one_record_per_group() {
        let records = vec![
            record(json!({ "sender_node_id": 5, "a": 1 })),
            record(json!({ "sender_node_id": 9, "b": 2 })),
            record(json!({ "sender_node_id": 5, "c": 3 })),
        ];

        let merged = merge(group_by_sender(records));

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].get("a"), Some(&json!(1)));
        assert_eq!(merged[0].get("c"), Some(&json!(3)));
        assert_eq!(merged[1].get("b"), Some(&json!(2)));
    }
}
