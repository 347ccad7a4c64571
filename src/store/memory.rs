use crate::model::config::BoardConfig;
use crate::model::entity::{EntitySeed, PipelineEntity};
use crate::model::form::StageFormField;
use crate::model::history::Snapshot;
use crate::model::stage::{PipelineKind, Stage};
use crate::model::workflow::SubRecord;

use super::document::BoardDocument;
use super::{PipelineStore, StoreError};

/// In-memory store with the same server semantics as `JsonStore`.
///
/// Engine tests drive it directly: verbs can be told to fail on their
/// next call, and every mutating call is recorded so tests can assert
/// exactly what the engine sent.
pub struct MemoryStore {
    pub config: BoardConfig,
    pub doc: BoardDocument,
    fail_move: bool,
    fail_reorder: bool,
    fail_undo: bool,
    fail_dependent: bool,
    fail_sub_record: bool,
    /// (entity_id, dest_stage, snapshot, new_amount)
    pub move_calls: Vec<(String, String, Snapshot, Option<i64>)>,
    /// (stage_id, ordered_ids)
    pub reorder_calls: Vec<(String, Vec<String>)>,
    pub undo_calls: Vec<String>,
    /// (source_entity_id, client)
    pub dependent_calls: Vec<(String, String)>,
}

impl MemoryStore {
    pub fn new(config: BoardConfig) -> Self {
        MemoryStore {
            config,
            doc: BoardDocument::default(),
            fail_move: false,
            fail_reorder: false,
            fail_undo: false,
            fail_dependent: false,
            fail_sub_record: false,
            move_calls: Vec::new(),
            reorder_calls: Vec::new(),
            undo_calls: Vec::new(),
            dependent_calls: Vec::new(),
        }
    }

    pub fn fail_next_move(&mut self) {
        self.fail_move = true;
    }

    pub fn fail_next_reorder(&mut self) {
        self.fail_reorder = true;
    }

    pub fn fail_next_undo(&mut self) {
        self.fail_undo = true;
    }

    pub fn fail_next_dependent(&mut self) {
        self.fail_dependent = true;
    }

    pub fn fail_next_sub_record(&mut self) {
        self.fail_sub_record = true;
    }

    fn injected(flag: &mut bool) -> Result<(), StoreError> {
        if *flag {
            *flag = false;
            return Err(StoreError::Rejected("injected failure".into()));
        }
        Ok(())
    }
}

impl PipelineStore for MemoryStore {
    fn list_stages(&self, kind: PipelineKind) -> Result<Vec<Stage>, StoreError> {
        Ok(self.config.stages(kind))
    }

    fn list_entities(&self, kind: PipelineKind) -> Result<Vec<PipelineEntity>, StoreError> {
        Ok(self.doc.pipeline_entities(kind))
    }

    fn form_schema(&self, stage_id: &str) -> Result<Vec<StageFormField>, StoreError> {
        if self.config.find_stage(stage_id).is_none() {
            return Err(StoreError::UnknownStage(stage_id.to_string()));
        }
        Ok(self.config.requirements_for(stage_id).to_vec())
    }

    fn move_entity(
        &mut self,
        entity_id: &str,
        dest_stage: &str,
        snapshot: Snapshot,
        new_amount: Option<i64>,
    ) -> Result<(), StoreError> {
        self.move_calls.push((
            entity_id.to_string(),
            dest_stage.to_string(),
            snapshot.clone(),
            new_amount,
        ));
        Self::injected(&mut self.fail_move)?;
        self.doc
            .apply_move(&self.config, entity_id, dest_stage, snapshot, new_amount)
    }

    fn reorder_stage(&mut self, stage_id: &str, ordered_ids: &[String]) -> Result<(), StoreError> {
        self.reorder_calls
            .push((stage_id.to_string(), ordered_ids.to_vec()));
        Self::injected(&mut self.fail_reorder)?;
        self.doc.apply_reorder(&self.config, stage_id, ordered_ids)
    }

    fn undo_entity(&mut self, entity_id: &str) -> Result<(), StoreError> {
        self.undo_calls.push(entity_id.to_string());
        Self::injected(&mut self.fail_undo)?;
        self.doc.apply_undo(entity_id)
    }

    fn create_entity(
        &mut self,
        kind: PipelineKind,
        seed: EntitySeed,
    ) -> Result<PipelineEntity, StoreError> {
        self.doc.create(&self.config, kind, seed)
    }

    fn delete_entity(&mut self, entity_id: &str) -> Result<(), StoreError> {
        self.doc.delete(&self.config, entity_id)
    }

    fn create_dependent_record(
        &mut self,
        source_entity_id: &str,
        client: &str,
    ) -> Result<String, StoreError> {
        self.dependent_calls
            .push((source_entity_id.to_string(), client.to_string()));
        Self::injected(&mut self.fail_dependent)?;
        self.doc.spawn_dependent(&self.config, source_entity_id, client)
    }

    fn save_sub_record(
        &mut self,
        entity_id: &str,
        stage_id: &str,
        record: SubRecord,
    ) -> Result<(), StoreError> {
        Self::injected(&mut self.fail_sub_record)?;
        self.doc
            .save_sub_record(&self.config, entity_id, stage_id, record)
    }

    fn create_stage(&mut self, kind: PipelineKind, stage: Stage) -> Result<(), StoreError> {
        if self.config.find_stage(&stage.id).is_some() {
            return Err(StoreError::StageExists(stage.id));
        }
        self.config.add_stage(kind, stage);
        Ok(())
    }

    fn rename_stage(&mut self, stage_id: &str, name: &str) -> Result<(), StoreError> {
        if !self.config.rename_stage(stage_id, name) {
            return Err(StoreError::UnknownStage(stage_id.to_string()));
        }
        Ok(())
    }

    fn reorder_stages(
        &mut self,
        kind: PipelineKind,
        ordered_ids: &[String],
    ) -> Result<(), StoreError> {
        self.config.reorder_stages(kind, ordered_ids);
        Ok(())
    }

    fn delete_stage(&mut self, stage_id: &str) -> Result<(), StoreError> {
        let Some((_, sc)) = self.config.find_stage(stage_id) else {
            return Err(StoreError::UnknownStage(stage_id.to_string()));
        };
        if sc.stage.locked {
            return Err(StoreError::StageLocked);
        }
        let count = self.doc.stage_count(stage_id);
        if count > 0 {
            return Err(StoreError::StageNotEmpty(count));
        }
        self.config.remove_stage(stage_id);
        Ok(())
    }

    fn config(&self) -> &BoardConfig {
        &self.config
    }
}
