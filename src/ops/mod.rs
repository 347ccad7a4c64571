pub mod reorder;
pub mod side_effects;
pub mod stage_ops;
pub mod transition;
pub mod undo;
pub mod workflow_ops;

use crate::board::{BoardAction, BoardState};
use crate::store::{PipelineStore, StoreError};

/// Reload a board projection from the store. The server is the source
/// of truth: this discards whatever optimistic state diverged.
pub fn refetch(board: &mut BoardState, store: &dyn PipelineStore) -> Result<(), StoreError> {
    let stages = store.list_stages(board.kind)?;
    let entities = store.list_entities(board.kind)?;
    board.apply(BoardAction::Refresh { stages, entities });
    Ok(())
}
