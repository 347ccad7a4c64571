pub mod document;
pub mod json_store;
pub mod memory;

use std::path::PathBuf;

use crate::model::config::BoardConfig;
use crate::model::entity::{EntitySeed, PipelineEntity};
use crate::model::form::StageFormField;
use crate::model::history::Snapshot;
use crate::model::stage::{PipelineKind, Stage};
use crate::model::workflow::SubRecord;

pub use document::BoardDocument;
pub use json_store::JsonStore;
pub use memory::MemoryStore;

/// Error type for the persistence boundary.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("stage not found: {0}")]
    UnknownStage(String),
    #[error("entity not found: {0}")]
    UnknownEntity(String),
    #[error("stage is not empty: {0} entities remain")]
    StageNotEmpty(usize),
    #[error("stage is locked")]
    StageLocked,
    #[error("stage already exists: {0}")]
    StageExists(String),
    #[error("pipeline {0} has no stages")]
    EmptyPipeline(PipelineKind),
    #[error("entity {0} has no prior stage to undo")]
    NothingToUndo(String),
    #[error("stage {0} does not allow deleting entities")]
    NotRemovable(String),
    #[error("{0} is not a project")]
    NotAProject(String),
    #[error("ids are not a permutation of stage {0}")]
    NotAPermutation(String),
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("persistence rejected: {0}")]
    Rejected(String),
}

/// The persistence API the engine consumes, verbs abstracted from
/// transport. The implementation is the source of truth: after any
/// failure the engine refetches through `list_stages`/`list_entities`.
pub trait PipelineStore {
    fn list_stages(&self, kind: PipelineKind) -> Result<Vec<Stage>, StoreError>;
    fn list_entities(&self, kind: PipelineKind) -> Result<Vec<PipelineEntity>, StoreError>;
    fn form_schema(&self, stage_id: &str) -> Result<Vec<StageFormField>, StoreError>;

    fn move_entity(
        &mut self,
        entity_id: &str,
        dest_stage: &str,
        snapshot: Snapshot,
        new_amount: Option<i64>,
    ) -> Result<(), StoreError>;
    fn reorder_stage(&mut self, stage_id: &str, ordered_ids: &[String]) -> Result<(), StoreError>;
    fn undo_entity(&mut self, entity_id: &str) -> Result<(), StoreError>;

    fn create_entity(
        &mut self,
        kind: PipelineKind,
        seed: EntitySeed,
    ) -> Result<PipelineEntity, StoreError>;
    /// Hard deletion, allowed only from stages flagged removable.
    fn delete_entity(&mut self, entity_id: &str) -> Result<(), StoreError>;
    /// Create the dependent record for a trigger stage (a project bound
    /// to the quote's client and id). Returns the new entity's id.
    fn create_dependent_record(
        &mut self,
        source_entity_id: &str,
        client: &str,
    ) -> Result<String, StoreError>;
    fn save_sub_record(
        &mut self,
        entity_id: &str,
        stage_id: &str,
        record: SubRecord,
    ) -> Result<(), StoreError>;

    fn create_stage(&mut self, kind: PipelineKind, stage: Stage) -> Result<(), StoreError>;
    fn rename_stage(&mut self, stage_id: &str, name: &str) -> Result<(), StoreError>;
    fn reorder_stages(
        &mut self,
        kind: PipelineKind,
        ordered_ids: &[String],
    ) -> Result<(), StoreError>;
    /// Fails with `StageNotEmpty` when occupied and `StageLocked` when
    /// flagged, before any mutation.
    fn delete_stage(&mut self, stage_id: &str) -> Result<(), StoreError>;

    fn config(&self) -> &BoardConfig;
}
