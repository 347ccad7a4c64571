use tracing::{info, warn};

use crate::board::{BoardAction, BoardState};
use crate::ops::refetch;
use crate::store::{PipelineStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum UndoError {
    #[error("entity not found: {0}")]
    UnknownEntity(String),
    #[error("persistence failed: {0}")]
    Store(#[from] StoreError),
}

/// What a requested undo did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    /// The most recent ledger entry was reverted.
    Reverted { from: String, to: String },
    /// Nothing to revert: a soft no-op, reported with a notice rather
    /// than treated as a failure.
    NothingToUndo,
}

/// Revert an entity's most recent stage entry. Single level only — no
/// redo, no multi-step rewind.
pub fn undo(
    board: &mut BoardState,
    store: &mut dyn PipelineStore,
    entity_id: &str,
) -> Result<UndoOutcome, UndoError> {
    let entity = board
        .entity(entity_id)
        .ok_or_else(|| UndoError::UnknownEntity(entity_id.to_string()))?;
    let from = entity.stage_id.clone();
    let to = entity.previous_stage().map(str::to_string);

    match store.undo_entity(entity_id) {
        Ok(()) => {}
        Err(StoreError::NothingToUndo(_)) => {
            info!(entity = %entity_id, "undo requested with no prior entry");
            return Ok(UndoOutcome::NothingToUndo);
        }
        Err(e) => {
            warn!(entity = %entity_id, error = %e, "undo failed");
            if let Err(refetch_err) = refetch(board, store) {
                warn!(error = %refetch_err, "refetch after failed undo failed");
            }
            return Err(e.into());
        }
    }

    board.apply(BoardAction::Undo {
        entity_id: entity_id.to_string(),
    });
    let to = to.unwrap_or_else(|| from.clone());
    info!(entity = %entity_id, from = %from, to = %to, "undo applied");
    Ok(UndoOutcome::Reverted { from, to })
}
