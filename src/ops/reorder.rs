use tracing::{info, warn};

use crate::board::{BoardAction, BoardState};
use crate::ops::refetch;
use crate::store::{PipelineStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ReorderError {
    #[error("stage not found: {0}")]
    UnknownStage(String),
    #[error("ids are not a permutation of stage {0}")]
    NotAPermutation(String),
    #[error("persistence failed: {0}")]
    Store(#[from] StoreError),
}

/// Persist a new intra-stage order. Same-stage drops land here
/// directly — the form resolver is never consulted.
///
/// The local sequence is rewritten synchronously; on persistence
/// failure the stage is refetched, which may visibly snap the order
/// back. No partial merge is attempted.
pub fn reorder(
    board: &mut BoardState,
    store: &mut dyn PipelineStore,
    stage_id: &str,
    ordered_ids: Vec<String>,
) -> Result<(), ReorderError> {
    if board.stage(stage_id).is_none() {
        return Err(ReorderError::UnknownStage(stage_id.to_string()));
    }
    let lane = board.lane(stage_id);
    if lane.len() != ordered_ids.len() || !lane.iter().all(|id| ordered_ids.contains(id)) {
        return Err(ReorderError::NotAPermutation(stage_id.to_string()));
    }
    if lane == ordered_ids.as_slice() {
        return Ok(());
    }

    board.apply(BoardAction::Reorder {
        stage_id: stage_id.to_string(),
        ordered_ids: ordered_ids.clone(),
    });

    if let Err(e) = store.reorder_stage(stage_id, &ordered_ids) {
        warn!(stage = %stage_id, error = %e, "reorder rolled back");
        if let Err(refetch_err) = refetch(board, store) {
            warn!(error = %refetch_err, "refetch after rollback failed");
        }
        return Err(e.into());
    }
    info!(stage = %stage_id, "reorder persisted");
    Ok(())
}
