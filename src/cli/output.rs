use serde::Serialize;

use crate::model::entity::PipelineEntity;
use crate::model::history::{Snapshot, StageHistoryEntry};
use crate::model::stage::Stage;
use crate::ops::side_effects::SideEffectOutcome;
use crate::ops::transition::CommitOutcome;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct StageJson {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub locked: bool,
    pub terminal: bool,
    pub position: u32,
    pub count: usize,
}

impl StageJson {
    pub fn from_stage(stage: &Stage, count: usize) -> Self {
        StageJson {
            id: stage.id.clone(),
            name: stage.name.clone(),
            color: stage.color.clone(),
            locked: stage.locked,
            terminal: stage.terminal,
            position: stage.position,
            count,
        }
    }
}

#[derive(Serialize)]
pub struct EntityJson {
    pub id: String,
    pub stage: String,
    pub position: i64,
    pub amount: i64,
    pub client: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_quote: Option<String>,
}

impl EntityJson {
    pub fn from_entity(entity: &PipelineEntity) -> Self {
        EntityJson {
            id: entity.id.clone(),
            stage: entity.stage_id.clone(),
            position: entity.position,
            amount: entity.amount,
            client: entity.client.clone(),
            assignee: entity.assignee.clone(),
            detail: entity.detail.clone(),
            attachments: entity.attachments.clone(),
            source_quote: entity.source_quote.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct StageEntitiesJson {
    #[serde(flatten)]
    pub stage: StageJson,
    pub entities: Vec<EntityJson>,
}

#[derive(Serialize)]
pub struct BoardJson {
    pub pipeline: String,
    pub stages: Vec<StageEntitiesJson>,
}

#[derive(Serialize)]
pub struct HistoryEntryJson {
    pub stage: String,
    pub at: String,
    #[serde(skip_serializing_if = "Snapshot::is_empty")]
    pub snapshot: Snapshot,
}

impl HistoryEntryJson {
    pub fn from_entry(entry: &StageHistoryEntry) -> Self {
        HistoryEntryJson {
            stage: entry.stage_id.clone(),
            at: entry.at.to_rfc3339(),
            snapshot: entry.snapshot.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct SideEffectJson {
    pub kind: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct MoveJson {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side_effect: Option<SideEffectJson>,
}

impl MoveJson {
    pub fn from_outcome(outcome: &CommitOutcome) -> Self {
        let side_effect = match &outcome.side_effect {
            SideEffectOutcome::None => None,
            SideEffectOutcome::SpawnedProject { project_id } => Some(SideEffectJson {
                kind: "spawn-project".into(),
                ok: true,
                created: Some(project_id.clone()),
                error: None,
            }),
            SideEffectOutcome::QuoteFinished { quote_id } => Some(SideEffectJson {
                kind: "finish-source-quote".into(),
                ok: true,
                created: Some(quote_id.clone()),
                error: None,
            }),
            SideEffectOutcome::Failed { effect, message } => Some(SideEffectJson {
                kind: effect.to_string(),
                ok: false,
                created: None,
                error: Some(message.clone()),
            }),
        };
        MoveJson {
            id: outcome.entity_id.clone(),
            from: outcome.from.clone(),
            to: outcome.to.clone(),
            new_amount: outcome.new_amount,
            side_effect,
        }
    }
}

#[derive(Serialize)]
pub struct UndoJson {
    pub id: String,
    pub reverted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

/// Human-readable one-liner for a side-effect outcome, or None when the
/// destination triggers nothing.
pub fn describe_side_effect(outcome: &SideEffectOutcome) -> Option<String> {
    match outcome {
        SideEffectOutcome::None => None,
        SideEffectOutcome::SpawnedProject { project_id } => {
            Some(format!("spawned project {project_id}"))
        }
        SideEffectOutcome::QuoteFinished { quote_id } => {
            Some(format!("finished source quote {quote_id}"))
        }
        SideEffectOutcome::Failed { effect, message } => {
            Some(format!("warning: {effect} failed: {message}"))
        }
    }
}
