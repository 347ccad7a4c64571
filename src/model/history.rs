use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A value captured in a transition snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Number(i64),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<i64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Form data captured when a transition committed, keyed by normalized
/// field key. Insertion order is preserved for display.
pub type Snapshot = IndexMap<String, FieldValue>;

/// Reserved snapshot keys recording an amount change made during the
/// transition.
pub const PREVIOUS_AMOUNT_KEY: &str = "previous_amount";
pub const NEW_AMOUNT_KEY: &str = "new_amount";

/// Record an amount change under the reserved key pair.
pub fn record_amount_change(snapshot: &mut Snapshot, previous: i64, new: i64) {
    snapshot.insert(PREVIOUS_AMOUNT_KEY.to_string(), FieldValue::Number(previous));
    snapshot.insert(NEW_AMOUNT_KEY.to_string(), FieldValue::Number(new));
}

/// Read back an amount change, if the snapshot recorded one.
pub fn amount_change(snapshot: &Snapshot) -> Option<(i64, i64)> {
    let previous = snapshot.get(PREVIOUS_AMOUNT_KEY)?.as_number()?;
    let new = snapshot.get(NEW_AMOUNT_KEY)?.as_number()?;
    Some((previous, new))
}

/// One entry in an entity's append-only stage ledger.
///
/// The last entry always names the entity's current stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageHistoryEntry {
    pub stage_id: String,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub snapshot: Snapshot,
}

impl StageHistoryEntry {
    pub fn new(stage_id: &str, snapshot: Snapshot) -> Self {
        StageHistoryEntry {
            stage_id: stage_id.to_string(),
            at: Utc::now(),
            snapshot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn amount_change_round_trip() {
        let mut snapshot = Snapshot::new();
        record_amount_change(&mut snapshot, 100_000, 120_000);
        assert_eq!(amount_change(&snapshot), Some((100_000, 120_000)));
    }

    #[test]
    fn amount_change_absent_when_not_recorded() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("precio".into(), FieldValue::Number(120_000));
        assert_eq!(amount_change(&snapshot), None);
    }

    #[test]
    fn snapshot_serde_preserves_order_and_types() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("precio".into(), FieldValue::Number(120_000));
        snapshot.insert("nota".into(), FieldValue::Text("urgente".into()));
        snapshot.insert("aprobado".into(), FieldValue::Flag(true));
        snapshot.insert(
            "fotos".into(),
            FieldValue::List(vec!["a.jpg".into(), "b.jpg".into()]),
        );

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
        let keys: Vec<&str> = back.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["precio", "nota", "aprobado", "fotos"]);
    }
}
