use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::config::BoardConfig;
use crate::model::entity::{EntitySeed, PipelineEntity};
use crate::model::history::{Snapshot, StageHistoryEntry, amount_change};
use crate::model::stage::PipelineKind;
use crate::model::workflow::SubRecord;

use super::StoreError;

/// The store-side record set: every entity across both pipelines plus
/// the id counters. Both store implementations share these semantics so
/// the "server" behaves identically whether it lives on disk or in
/// memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardDocument {
    #[serde(default)]
    pub entities: Vec<PipelineEntity>,
    /// Last issued id number per pipeline.
    #[serde(default)]
    pub counters: IndexMap<String, u32>,
}

impl BoardDocument {
    pub fn entity(&self, entity_id: &str) -> Result<&PipelineEntity, StoreError> {
        self.entities
            .iter()
            .find(|e| e.id == entity_id)
            .ok_or_else(|| StoreError::UnknownEntity(entity_id.to_string()))
    }

    fn entity_mut(&mut self, entity_id: &str) -> Result<&mut PipelineEntity, StoreError> {
        self.entities
            .iter_mut()
            .find(|e| e.id == entity_id)
            .ok_or_else(|| StoreError::UnknownEntity(entity_id.to_string()))
    }

    pub fn stage_count(&self, stage_id: &str) -> usize {
        self.entities.iter().filter(|e| e.stage_id == stage_id).count()
    }

    fn head_position(&self, stage_id: &str) -> i64 {
        self.entities
            .iter()
            .filter(|e| e.stage_id == stage_id)
            .map(|e| e.position)
            .min()
            .map(|min| min - 1)
            .unwrap_or(0)
    }

    fn next_id(&mut self, kind: PipelineKind, prefix: &str) -> String {
        let counter = self.counters.entry(kind.to_string()).or_insert(0);
        *counter += 1;
        format!("{}-{:03}", prefix, counter)
    }

    /// Entities of one pipeline, sorted stage by stage by position.
    pub fn pipeline_entities(&self, kind: PipelineKind) -> Vec<PipelineEntity> {
        let mut out: Vec<PipelineEntity> = self
            .entities
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.stage_id.cmp(&b.stage_id).then(a.position.cmp(&b.position)));
        out
    }

    pub fn apply_move(
        &mut self,
        config: &BoardConfig,
        entity_id: &str,
        dest_stage: &str,
        snapshot: Snapshot,
        new_amount: Option<i64>,
    ) -> Result<(), StoreError> {
        if config.find_stage(dest_stage).is_none() {
            return Err(StoreError::UnknownStage(dest_stage.to_string()));
        }
        let position = self.head_position(dest_stage);
        let entity = self.entity_mut(entity_id)?;
        entity.stage_id = dest_stage.to_string();
        entity.position = position;
        if let Some(amount) = new_amount {
            entity.amount = amount;
        }
        entity
            .history
            .push(StageHistoryEntry::new(dest_stage, snapshot));
        entity.updated_at = Utc::now();
        Ok(())
    }

    pub fn apply_reorder(
        &mut self,
        config: &BoardConfig,
        stage_id: &str,
        ordered_ids: &[String],
    ) -> Result<(), StoreError> {
        if config.find_stage(stage_id).is_none() {
            return Err(StoreError::UnknownStage(stage_id.to_string()));
        }
        let current: Vec<&str> = self
            .entities
            .iter()
            .filter(|e| e.stage_id == stage_id)
            .map(|e| e.id.as_str())
            .collect();
        if current.len() != ordered_ids.len()
            || !current.iter().all(|id| ordered_ids.iter().any(|o| o == id))
        {
            return Err(StoreError::NotAPermutation(stage_id.to_string()));
        }
        for (idx, id) in ordered_ids.iter().enumerate() {
            let entity = self.entity_mut(id)?;
            entity.position = idx as i64;
            entity.updated_at = Utc::now();
        }
        Ok(())
    }

    pub fn apply_undo(&mut self, entity_id: &str) -> Result<(), StoreError> {
        // compute the restore position before borrowing the entity mutably
        let previous_stage = {
            let entity = self.entity(entity_id)?;
            if entity.history.len() < 2 {
                return Err(StoreError::NothingToUndo(entity_id.to_string()));
            }
            entity.history[entity.history.len() - 2].stage_id.clone()
        };
        let position = self.head_position(&previous_stage);
        let entity = self.entity_mut(entity_id)?;
        let reverted = entity.history.pop().expect("checked above");
        if let Some((previous, _)) = amount_change(&reverted.snapshot) {
            entity.amount = previous;
        }
        entity.stage_id = previous_stage;
        entity.position = position;
        entity.updated_at = Utc::now();
        Ok(())
    }

    pub fn create(
        &mut self,
        config: &BoardConfig,
        kind: PipelineKind,
        seed: EntitySeed,
    ) -> Result<PipelineEntity, StoreError> {
        let first = config
            .first_stage(kind)
            .ok_or(StoreError::EmptyPipeline(kind))?;
        let id = self.next_id(kind, config.prefix(kind));
        let position = self.head_position(&first.id);
        let mut entity = PipelineEntity::new(&id, kind, &first.id, &seed.client);
        entity.position = position;
        entity.amount = seed.amount;
        entity.assignee = seed.assignee;
        entity.detail = seed.detail;
        entity.source_quote = seed.source_quote;
        self.entities.push(entity.clone());
        Ok(entity)
    }

    pub fn delete(&mut self, config: &BoardConfig, entity_id: &str) -> Result<(), StoreError> {
        let stage_id = self.entity(entity_id)?.stage_id.clone();
        let removable = config
            .find_stage(&stage_id)
            .map(|(_, sc)| sc.stage.removable)
            .unwrap_or(false);
        if !removable {
            return Err(StoreError::NotRemovable(stage_id));
        }
        self.entities.retain(|e| e.id != entity_id);
        Ok(())
    }

    /// Create the project spawned by a quote's kickoff stage.
    pub fn spawn_dependent(
        &mut self,
        config: &BoardConfig,
        source_entity_id: &str,
        client: &str,
    ) -> Result<String, StoreError> {
        let amount = self.entity(source_entity_id)?.amount;
        let seed = EntitySeed {
            client: client.to_string(),
            amount,
            assignee: None,
            detail: None,
            source_quote: Some(source_entity_id.to_string()),
        };
        let project = self.create(config, PipelineKind::Projects, seed)?;
        Ok(project.id)
    }

    pub fn save_sub_record(
        &mut self,
        config: &BoardConfig,
        entity_id: &str,
        stage_id: &str,
        record: SubRecord,
    ) -> Result<(), StoreError> {
        match config.find_stage(stage_id) {
            Some((PipelineKind::Projects, _)) => {}
            Some(_) | None => return Err(StoreError::UnknownStage(stage_id.to_string())),
        }
        let entity = self.entity_mut(entity_id)?;
        if entity.kind != PipelineKind::Projects {
            return Err(StoreError::NotAProject(entity_id.to_string()));
        }
        entity.sub_records.insert(stage_id.to_string(), record);
        entity.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> BoardConfig {
        BoardConfig::default_board("test")
    }

    fn doc_with_quote(config: &BoardConfig) -> (BoardDocument, String) {
        let mut doc = BoardDocument::default();
        let quote = doc
            .create(
                config,
                PipelineKind::Quotes,
                EntitySeed {
                    client: "ACME".into(),
                    amount: 100_000,
                    ..Default::default()
                },
            )
            .unwrap();
        (doc, quote.id)
    }

    #[test]
    fn create_assigns_sequential_prefixed_ids() {
        let config = config();
        let mut doc = BoardDocument::default();
        let a = doc
            .create(&config, PipelineKind::Quotes, EntitySeed::default())
            .unwrap();
        let b = doc
            .create(&config, PipelineKind::Quotes, EntitySeed::default())
            .unwrap();
        let p = doc
            .create(&config, PipelineKind::Projects, EntitySeed::default())
            .unwrap();
        assert_eq!(a.id, "Q-001");
        assert_eq!(b.id, "Q-002");
        assert_eq!(p.id, "P-001");
        assert_eq!(a.stage_id, "contacted");
        assert_eq!(p.stage_id, "technical-visit");
    }

    #[test]
    fn created_entities_prepend_within_first_stage() {
        let config = config();
        let mut doc = BoardDocument::default();
        doc.create(&config, PipelineKind::Quotes, EntitySeed::default())
            .unwrap();
        doc.create(&config, PipelineKind::Quotes, EntitySeed::default())
            .unwrap();
        let entities = doc.pipeline_entities(PipelineKind::Quotes);
        assert_eq!(entities[0].id, "Q-002");
        assert_eq!(entities[1].id, "Q-001");
    }

    #[test]
    fn move_to_unknown_stage_is_rejected_before_mutation() {
        let config = config();
        let (mut doc, id) = doc_with_quote(&config);
        let err = doc
            .apply_move(&config, &id, "nonexistent", Snapshot::new(), None)
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownStage(_)));
        assert_eq!(doc.entity(&id).unwrap().stage_id, "contacted");
        assert_eq!(doc.entity(&id).unwrap().history.len(), 1);
    }

    #[test]
    fn move_appends_history_and_updates_amount() {
        let config = config();
        let (mut doc, id) = doc_with_quote(&config);
        let mut snapshot = Snapshot::new();
        crate::model::history::record_amount_change(&mut snapshot, 100_000, 120_000);
        doc.apply_move(&config, &id, "negotiation", snapshot, Some(120_000))
            .unwrap();
        let entity = doc.entity(&id).unwrap();
        assert_eq!(entity.stage_id, "negotiation");
        assert_eq!(entity.amount, 120_000);
        assert_eq!(entity.history.len(), 2);
        assert_eq!(entity.history.last().unwrap().stage_id, "negotiation");
    }

    #[test]
    fn reorder_requires_a_permutation() {
        let config = config();
        let mut doc = BoardDocument::default();
        let a = doc
            .create(&config, PipelineKind::Quotes, EntitySeed::default())
            .unwrap();
        let b = doc
            .create(&config, PipelineKind::Quotes, EntitySeed::default())
            .unwrap();
        let err = doc
            .apply_reorder(&config, "contacted", &[a.id.clone()])
            .unwrap_err();
        assert!(matches!(err, StoreError::NotAPermutation(_)));
        doc.apply_reorder(&config, "contacted", &[a.id.clone(), b.id.clone()])
            .unwrap();
        let entities = doc.pipeline_entities(PipelineKind::Quotes);
        assert_eq!(entities[0].id, a.id);
        assert_eq!(entities[1].id, b.id);
    }

    #[test]
    fn undo_restores_stage_and_amount() {
        let config = config();
        let (mut doc, id) = doc_with_quote(&config);
        let mut snapshot = Snapshot::new();
        crate::model::history::record_amount_change(&mut snapshot, 100_000, 120_000);
        doc.apply_move(&config, &id, "negotiation", snapshot, Some(120_000))
            .unwrap();
        doc.apply_undo(&id).unwrap();
        let entity = doc.entity(&id).unwrap();
        assert_eq!(entity.stage_id, "contacted");
        assert_eq!(entity.amount, 100_000);
        assert_eq!(entity.history.len(), 1);
    }

    #[test]
    fn undo_without_prior_entry_reports_nothing_to_undo() {
        let config = config();
        let (mut doc, id) = doc_with_quote(&config);
        let err = doc.apply_undo(&id).unwrap_err();
        assert!(matches!(err, StoreError::NothingToUndo(_)));
    }

    #[test]
    fn delete_only_from_removable_stage() {
        let config = config();
        let (mut doc, id) = doc_with_quote(&config);
        // contacted is removable in the default board
        doc.delete(&config, &id).unwrap();
        assert!(doc.entity(&id).is_err());

        let (mut doc, id) = doc_with_quote(&config);
        doc.apply_move(&config, &id, "quoted", Snapshot::new(), None)
            .unwrap();
        let err = doc.delete(&config, &id).unwrap_err();
        assert!(matches!(err, StoreError::NotRemovable(_)));
    }

    #[test]
    fn spawn_dependent_links_source_quote() {
        let config = config();
        let (mut doc, id) = doc_with_quote(&config);
        let project_id = doc.spawn_dependent(&config, &id, "ACME").unwrap();
        let project = doc.entity(&project_id).unwrap();
        assert_eq!(project.kind, PipelineKind::Projects);
        assert_eq!(project.source_quote.as_deref(), Some(id.as_str()));
        assert_eq!(project.amount, 100_000);
        assert_eq!(project.stage_id, "technical-visit");
    }

    #[test]
    fn save_sub_record_rejects_quotes() {
        let config = config();
        let (mut doc, id) = doc_with_quote(&config);
        let err = doc
            .save_sub_record(&config, &id, "measurement", SubRecord::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotAProject(_)));
    }

    #[test]
    fn save_sub_record_stores_by_stage() {
        let config = config();
        let mut doc = BoardDocument::default();
        let project = doc
            .create(&config, PipelineKind::Projects, EntitySeed::default())
            .unwrap();
        let mut record = SubRecord::default();
        record.attachments = vec!["a.jpg".into()];
        doc.save_sub_record(&config, &project.id, "measurement", record)
            .unwrap();
        let entity = doc.entity(&project.id).unwrap();
        assert_eq!(
            entity.sub_record("measurement").unwrap().attachments,
            vec!["a.jpg"]
        );
    }
}
