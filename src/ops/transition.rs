use tracing::{info, warn};

use crate::board::{BoardAction, BoardState};
use crate::model::config::BoardConfig;
use crate::model::form::{self, FormError, StageFormField};
use crate::model::history::{FieldValue, Snapshot, record_amount_change};
use crate::ops::refetch;
use crate::ops::side_effects::{self, SideEffectOutcome};
use crate::store::{PipelineStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("another transition is already in flight")]
    Busy,
    #[error("no transition is awaiting input")]
    NotAwaitingInput,
    #[error("entity not found: {0}")]
    UnknownEntity(String),
    #[error("stage not found: {0}")]
    UnknownStage(String),
    #[error("entity is already in stage {0}")]
    SameStage(String),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("persistence failed: {0}")]
    Store(#[from] StoreError),
}

/// A transition waiting on the collection form: the gesture's triple
/// plus the resolved requirements, pre-seeded with defaults. No board
/// mutation has happened yet; cancel drops it without a trace.
#[derive(Debug, Clone)]
pub struct PendingTransition {
    pub entity_id: String,
    pub from: String,
    pub to: String,
    pub fields: Vec<StageFormField>,
    /// Pre-seeded values: a money field starts at the entity's current
    /// amount so the operator edits rather than re-enters it.
    pub defaults: Snapshot,
}

/// Result of a committed transition, side-effect outcome included. The
/// two are reported separately: a failed side effect never un-commits
/// the move.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub entity_id: String,
    pub from: String,
    pub to: String,
    pub new_amount: Option<i64>,
    pub side_effect: SideEffectOutcome,
}

/// How a begun transition proceeded.
#[derive(Debug)]
pub enum Begun {
    /// Destination required no data; the move committed immediately.
    Committed(CommitOutcome),
    /// Destination requires data; the coordinator holds the pending
    /// transition until `submit` or `cancel`.
    NeedsInput,
}

/// Orchestrates one move at a time: resolve requirements, collect data
/// if needed, apply the optimistic splice, persist, roll back via
/// refetch on failure, then fire side effects.
///
/// Phases: idle → resolving → (awaiting input →) committing → side
/// effects → idle, with rollback on persistence failure. Resolving and
/// committing happen within one call; awaiting-input spans calls and is
/// what `is_busy` guards.
#[derive(Debug, Default)]
pub struct Coordinator {
    pending: Option<PendingTransition>,
}

impl Coordinator {
    pub fn new() -> Self {
        Coordinator { pending: None }
    }

    /// A transition is awaiting input; further gestures are rejected
    /// with `Busy` until it resolves.
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingTransition> {
        self.pending.as_ref()
    }

    /// Handle a gesture: (entity, source, destination). Same-stage
    /// drops are rejected here — they are reorders, not transitions.
    pub fn begin(
        &mut self,
        board: &mut BoardState,
        store: &mut dyn PipelineStore,
        config: &BoardConfig,
        entity_id: &str,
        dest_stage: &str,
    ) -> Result<Begun, TransitionError> {
        if self.pending.is_some() {
            return Err(TransitionError::Busy);
        }
        let entity = board
            .entity(entity_id)
            .ok_or_else(|| TransitionError::UnknownEntity(entity_id.to_string()))?;
        let from = entity.stage_id.clone();
        let amount = entity.amount;
        if from == dest_stage {
            return Err(TransitionError::SameStage(from));
        }
        if board.stage(dest_stage).is_none() {
            return Err(TransitionError::UnknownStage(dest_stage.to_string()));
        }

        let fields = store.form_schema(dest_stage)?;
        if fields.is_empty() {
            // free transition: commit with an empty data set
            let outcome = commit_move(board, store, config, entity_id, dest_stage, Snapshot::new())?;
            return Ok(Begun::Committed(outcome));
        }

        let mut defaults = Snapshot::new();
        if let Some(money) = form::money_field(&fields) {
            defaults.insert(money.key(), FieldValue::Number(amount));
        }
        self.pending = Some(PendingTransition {
            entity_id: entity_id.to_string(),
            from,
            to: dest_stage.to_string(),
            fields,
            defaults,
        });
        Ok(Begun::NeedsInput)
    }

    /// Commit the awaited transition with the collected values.
    /// Validation failures leave the form open (the pending transition
    /// stays) and mutate nothing.
    pub fn submit(
        &mut self,
        board: &mut BoardState,
        store: &mut dyn PipelineStore,
        config: &BoardConfig,
        values: Snapshot,
    ) -> Result<CommitOutcome, TransitionError> {
        let pending = self.pending.take().ok_or(TransitionError::NotAwaitingInput)?;
        if let Err(e) = form::validate(&pending.fields, &values) {
            self.pending = Some(pending);
            return Err(e.into());
        }
        commit_move(board, store, config, &pending.entity_id, &pending.to, values)
    }

    /// Drop the awaited transition. No mutation has occurred.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// The committing phase, shared by the coordinator and the project
/// workflow: optimistic splice, persist, refetch on failure, dispatch
/// side effects on success.
pub fn commit_move(
    board: &mut BoardState,
    store: &mut dyn PipelineStore,
    config: &BoardConfig,
    entity_id: &str,
    dest_stage: &str,
    mut snapshot: Snapshot,
) -> Result<CommitOutcome, TransitionError> {
    let entity = board
        .entity(entity_id)
        .ok_or_else(|| TransitionError::UnknownEntity(entity_id.to_string()))?;
    let from = entity.stage_id.clone();
    let current_amount = entity.amount;
    if from == dest_stage {
        return Err(TransitionError::SameStage(from));
    }

    // a submitted money field that differs from the current amount
    // becomes the new amount, recorded under the reserved key pair
    let dest_fields = store.form_schema(dest_stage).unwrap_or_default();
    let mut new_amount = None;
    if let Some(money) = form::money_field(&dest_fields)
        && let Some(submitted) = snapshot.get(&money.key()).and_then(FieldValue::as_number)
        && submitted != current_amount
    {
        record_amount_change(&mut snapshot, current_amount, submitted);
        new_amount = Some(submitted);
    }

    board.apply(BoardAction::Move {
        entity_id: entity_id.to_string(),
        to_stage: dest_stage.to_string(),
        snapshot: snapshot.clone(),
        new_amount,
    });

    if let Err(e) = store.move_entity(entity_id, dest_stage, snapshot, new_amount) {
        warn!(entity = %entity_id, from = %from, to = %dest_stage, error = %e, "transition rolled back");
        if let Err(refetch_err) = refetch(board, store) {
            warn!(error = %refetch_err, "refetch after rollback failed");
        }
        return Err(e.into());
    }
    info!(entity = %entity_id, from = %from, to = %dest_stage, "transition committed");

    let moved = board
        .entity(entity_id)
        .cloned()
        .ok_or_else(|| TransitionError::UnknownEntity(entity_id.to_string()))?;
    let side_effect = side_effects::dispatch(store, config, &moved, dest_stage);

    Ok(CommitOutcome {
        entity_id: entity_id.to_string(),
        from,
        to: dest_stage.to_string(),
        new_amount,
        side_effect,
    })
}
