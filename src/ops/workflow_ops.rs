use tracing::info;

use crate::board::BoardState;
use crate::model::config::BoardConfig;
use crate::model::stage::PipelineKind;
use crate::model::workflow::{Advance, SubRecord};
use crate::ops::refetch;
use crate::ops::transition::{CommitOutcome, TransitionError, commit_move};
use crate::store::{PipelineStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("entity not found: {0}")]
    UnknownEntity(String),
    #[error("{0} is not a project")]
    NotAProject(String),
    #[error("stage not found: {0}")]
    UnknownStage(String),
    #[error("needs at least {need} attachments, have {have}")]
    NotEnoughAttachments { need: usize, have: usize },
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("persistence failed: {0}")]
    Store(#[from] StoreError),
}

/// What saving a sub-record did.
#[derive(Debug)]
pub enum SaveOutcome {
    /// Data persisted; the project stays where it is.
    Saved,
    /// Data persisted and the project advanced.
    Advanced { to: String, commit: CommitOutcome },
}

/// Save a project stage's sub-document and, when the record says so,
/// advance the project.
///
/// Rules: the attachment guard blocks submission locally; a workshop
/// route names the next stage directly; otherwise only `advance: yes`
/// moves the project, to the stage's configured successor. Editing a
/// stage the project already passed persists the data but never moves
/// the project retroactively.
pub fn save_sub_record(
    board: &mut BoardState,
    store: &mut dyn PipelineStore,
    config: &BoardConfig,
    entity_id: &str,
    stage_id: &str,
    record: SubRecord,
) -> Result<SaveOutcome, WorkflowError> {
    let entity = board
        .entity(entity_id)
        .ok_or_else(|| WorkflowError::UnknownEntity(entity_id.to_string()))?;
    if entity.kind != PipelineKind::Projects {
        return Err(WorkflowError::NotAProject(entity_id.to_string()));
    }
    let current_stage = entity.stage_id.clone();
    match config.find_stage(stage_id) {
        Some((PipelineKind::Projects, _)) => {}
        Some(_) | None => return Err(WorkflowError::UnknownStage(stage_id.to_string())),
    }

    // local guard, before any store call
    let need = config.min_attachments_for(stage_id);
    let have = record.attachments.len();
    if have < need {
        return Err(WorkflowError::NotEnoughAttachments { need, have });
    }

    store.save_sub_record(entity_id, stage_id, record.clone())?;
    refetch(board, store)?;
    info!(project = %entity_id, stage = %stage_id, "sub-record saved");

    // advancement only applies when editing the current stage
    if stage_id != current_stage {
        return Ok(SaveOutcome::Saved);
    }
    let dest = if let Some(route) = record.route {
        Some(route.stage_id().to_string())
    } else if record.advance == Advance::Yes {
        config.next_for(stage_id).map(str::to_string)
    } else {
        None
    };
    let Some(dest) = dest else {
        return Ok(SaveOutcome::Saved);
    };

    let commit = commit_move(board, store, config, entity_id, &dest, record.fields.clone())?;
    Ok(SaveOutcome::Advanced { to: dest, commit })
}
