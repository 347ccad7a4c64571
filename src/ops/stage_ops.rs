use tracing::info;

use crate::board::{BoardAction, BoardState};
use crate::model::stage::Stage;
use crate::ops::refetch;
use crate::store::{PipelineStore, StoreError};

/// Error type for stage-registry operations.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("stage not found: {0}")]
    NotFound(String),
    #[error("stage already exists: {0}")]
    AlreadyExists(String),
    #[error("cannot delete {stage_id}: move its {count} entities first")]
    NotEmpty { stage_id: String, count: usize },
    #[error("stage {0} is locked and cannot be deleted")]
    Locked(String),
    #[error("persistence failed: {0}")]
    Store(StoreError),
}

fn map_store_err(stage_id: &str, e: StoreError) -> StageError {
    match e {
        StoreError::UnknownStage(id) => StageError::NotFound(id),
        StoreError::StageExists(id) => StageError::AlreadyExists(id),
        StoreError::StageNotEmpty(count) => StageError::NotEmpty {
            stage_id: stage_id.to_string(),
            count,
        },
        StoreError::StageLocked => StageError::Locked(stage_id.to_string()),
        other => StageError::Store(other),
    }
}

/// Create a stage at the end of the board's pipeline.
pub fn create_stage(
    board: &mut BoardState,
    store: &mut dyn PipelineStore,
    id: &str,
    name: &str,
) -> Result<Stage, StageError> {
    let stage = Stage::new(id, name, 0);
    store
        .create_stage(board.kind, stage)
        .map_err(|e| map_store_err(id, e))?;
    // read back the assigned position
    let created = store
        .list_stages(board.kind)
        .map_err(StageError::Store)?
        .into_iter()
        .find(|s| s.id == id)
        .ok_or_else(|| StageError::NotFound(id.to_string()))?;
    board.apply(BoardAction::StageCreated {
        stage: created.clone(),
    });
    info!(stage = %id, "stage created");
    Ok(created)
}

pub fn rename_stage(
    board: &mut BoardState,
    store: &mut dyn PipelineStore,
    stage_id: &str,
    name: &str,
) -> Result<(), StageError> {
    store
        .rename_stage(stage_id, name)
        .map_err(|e| map_store_err(stage_id, e))?;
    refetch(board, store).map_err(StageError::Store)?;
    Ok(())
}

/// Rewrite the pipeline's stage order.
pub fn reorder_stages(
    board: &mut BoardState,
    store: &mut dyn PipelineStore,
    ordered_ids: &[String],
) -> Result<(), StageError> {
    store
        .reorder_stages(board.kind, ordered_ids)
        .map_err(|e| map_store_err("", e))?;
    refetch(board, store).map_err(StageError::Store)?;
    Ok(())
}

/// Delete a stage. Rejected before any mutation when the stage is
/// locked or still holds entities — the caller can tell the operator to
/// move them first.
pub fn delete_stage(
    board: &mut BoardState,
    store: &mut dyn PipelineStore,
    stage_id: &str,
) -> Result<(), StageError> {
    store
        .delete_stage(stage_id)
        .map_err(|e| map_store_err(stage_id, e))?;
    board.apply(BoardAction::StageDeleted {
        stage_id: stage_id.to_string(),
    });
    info!(stage = %stage_id, "stage deleted");
    Ok(())
}
