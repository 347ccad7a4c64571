use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::history::{Snapshot, StageHistoryEntry};
use crate::model::stage::PipelineKind;
use crate::model::workflow::SubRecord;

/// A record tracked by a pipeline: a sales quote or a fabrication
/// project. Occupies exactly one stage at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEntity {
    /// `Q-001` / `P-001` style id, prefix per pipeline.
    pub id: String,
    pub kind: PipelineKind,
    /// Current stage. Always equals the last ledger entry's stage.
    pub stage_id: String,
    /// Intra-stage ordering index: unique within the stage, smaller is
    /// closer to the head. Dense but not necessarily contiguous.
    pub position: i64,
    /// Monetary amount in whole currency units.
    pub amount: i64,
    pub client: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
    /// For projects: the quote this project was spawned from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_quote: Option<String>,
    /// For projects: per-stage sub-documents, keyed by stage id.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub sub_records: IndexMap<String, SubRecord>,
    /// Append-only stage ledger, oldest first.
    pub history: Vec<StageHistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PipelineEntity {
    /// Create an entity in its pipeline's first stage. Appends the
    /// creation entry so the ledger invariant holds from the start.
    pub fn new(id: &str, kind: PipelineKind, first_stage: &str, client: &str) -> Self {
        let now = Utc::now();
        PipelineEntity {
            id: id.to_string(),
            kind,
            stage_id: first_stage.to_string(),
            position: 0,
            amount: 0,
            client: client.to_string(),
            assignee: None,
            detail: None,
            attachments: Vec::new(),
            source_quote: None,
            sub_records: IndexMap::new(),
            history: vec![StageHistoryEntry::new(first_stage, Snapshot::new())],
            created_at: now,
            updated_at: now,
        }
    }

    /// The ledger entry behind the current one, i.e. where undo would
    /// take this entity.
    pub fn previous_stage(&self) -> Option<&str> {
        if self.history.len() < 2 {
            return None;
        }
        self.history
            .get(self.history.len() - 2)
            .map(|e| e.stage_id.as_str())
    }

    pub fn sub_record(&self, stage_id: &str) -> Option<&SubRecord> {
        self.sub_records.get(stage_id)
    }
}

/// Seed data for creating a new entity through the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntitySeed {
    pub client: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub source_quote: Option<String>,
}
