use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::BoardConfig;
use crate::model::entity::{EntitySeed, PipelineEntity};
use crate::model::form::StageFormField;
use crate::model::history::Snapshot;
use crate::model::stage::{PipelineKind, Stage};
use crate::model::workflow::SubRecord;

use super::document::BoardDocument;
use super::{PipelineStore, StoreError};

pub const BOARD_DIR: &str = "tablero";
const CONFIG_FILE: &str = "config.toml";
const BOARD_FILE: &str = "board.json";

/// File-backed store: a `tablero/` directory holding `config.toml`
/// (stages, form schemas, triggers, guards) and `board.json` (entities
/// and their ledgers). Every mutating verb persists before returning,
/// so the files are the source of truth the engine reconciles against.
#[derive(Debug)]
pub struct JsonStore {
    dir: PathBuf,
    config: BoardConfig,
    doc: BoardDocument,
}

impl JsonStore {
    /// Walk up from `start` looking for a `tablero/config.toml`.
    pub fn discover(start: &Path) -> Result<PathBuf, StoreError> {
        let mut current = start.to_path_buf();
        loop {
            let dir = current.join(BOARD_DIR);
            if dir.is_dir() && dir.join(CONFIG_FILE).exists() {
                return Ok(current);
            }
            if !current.pop() {
                return Err(StoreError::Rejected(format!(
                    "no {BOARD_DIR}/ directory found (run `tb init` first)"
                )));
            }
        }
    }

    /// Create a new board directory with the default config and an
    /// empty record set.
    pub fn init(root: &Path, name: &str) -> Result<JsonStore, StoreError> {
        let dir = root.join(BOARD_DIR);
        fs::create_dir_all(&dir)?;
        let store = JsonStore {
            dir,
            config: BoardConfig::default_board(name),
            doc: BoardDocument::default(),
        };
        store.save_config()?;
        store.save_doc()?;
        Ok(store)
    }

    pub fn open(root: &Path) -> Result<JsonStore, StoreError> {
        let dir = root.join(BOARD_DIR);
        let config_path = dir.join(CONFIG_FILE);
        let config_text = fs::read_to_string(&config_path).map_err(|e| StoreError::Read {
            path: config_path.clone(),
            source: e,
        })?;
        let config: BoardConfig = toml::from_str(&config_text).map_err(|e| StoreError::Parse {
            path: config_path,
            message: e.to_string(),
        })?;

        let board_path = dir.join(BOARD_FILE);
        let doc = if board_path.exists() {
            let text = fs::read_to_string(&board_path).map_err(|e| StoreError::Read {
                path: board_path.clone(),
                source: e,
            })?;
            serde_json::from_str(&text).map_err(|e| StoreError::Parse {
                path: board_path,
                message: e.to_string(),
            })?
        } else {
            BoardDocument::default()
        };

        Ok(JsonStore { dir, config, doc })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a file atomically: temp file in the same directory, then
    /// rename over the target.
    fn write_atomic(&self, name: &str, content: &str) -> Result<(), StoreError> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        std::io::Write::write_all(&mut tmp, content.as_bytes())?;
        tmp.persist(self.dir.join(name))
            .map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    fn save_config(&self) -> Result<(), StoreError> {
        let text = toml::to_string_pretty(&self.config).map_err(|e| StoreError::Parse {
            path: self.dir.join(CONFIG_FILE),
            message: e.to_string(),
        })?;
        self.write_atomic(CONFIG_FILE, &text)
    }

    fn save_doc(&self) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(&self.doc).map_err(|e| StoreError::Parse {
            path: self.dir.join(BOARD_FILE),
            message: e.to_string(),
        })?;
        self.write_atomic(BOARD_FILE, &text)
    }
}

impl PipelineStore for JsonStore {
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
        self.doc
            .apply_move(&self.config, entity_id, dest_stage, snapshot, new_amount)?;
        self.save_doc()
    }

    fn reorder_stage(&mut self, stage_id: &str, ordered_ids: &[String]) -> Result<(), StoreError> {
        self.doc.apply_reorder(&self.config, stage_id, ordered_ids)?;
        self.save_doc()
    }

    fn undo_entity(&mut self, entity_id: &str) -> Result<(), StoreError> {
        self.doc.apply_undo(entity_id)?;
        self.save_doc()
    }

    fn create_entity(
        &mut self,
        kind: PipelineKind,
        seed: EntitySeed,
    ) -> Result<PipelineEntity, StoreError> {
        let entity = self.doc.create(&self.config, kind, seed)?;
        self.save_doc()?;
        Ok(entity)
    }

    fn delete_entity(&mut self, entity_id: &str) -> Result<(), StoreError> {
        self.doc.delete(&self.config, entity_id)?;
        self.save_doc()
    }

    fn create_dependent_record(
        &mut self,
        source_entity_id: &str,
        client: &str,
    ) -> Result<String, StoreError> {
        let id = self.doc.spawn_dependent(&self.config, source_entity_id, client)?;
        self.save_doc()?;
        Ok(id)
    }

    fn save_sub_record(
        &mut self,
        entity_id: &str,
        stage_id: &str,
        record: SubRecord,
    ) -> Result<(), StoreError> {
        self.doc
            .save_sub_record(&self.config, entity_id, stage_id, record)?;
        self.save_doc()
    }

    fn create_stage(&mut self, kind: PipelineKind, stage: Stage) -> Result<(), StoreError> {
        if self.config.find_stage(&stage.id).is_some() {
            return Err(StoreError::StageExists(stage.id));
        }
        self.config.add_stage(kind, stage);
        self.save_config()
    }

    fn rename_stage(&mut self, stage_id: &str, name: &str) -> Result<(), StoreError> {
        if !self.config.rename_stage(stage_id, name) {
            return Err(StoreError::UnknownStage(stage_id.to_string()));
        }
        self.save_config()
    }

    fn reorder_stages(
        &mut self,
        kind: PipelineKind,
        ordered_ids: &[String],
    ) -> Result<(), StoreError> {
        self.config.reorder_stages(kind, ordered_ids);
        self.save_config()
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
        self.save_config()
    }

    fn config(&self) -> &BoardConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn init_writes_config_and_board() {
        let tmp = TempDir::new().unwrap();
        JsonStore::init(tmp.path(), "demo").unwrap();
        assert!(tmp.path().join("tablero/config.toml").exists());
        assert!(tmp.path().join("tablero/board.json").exists());
    }

    #[test]
    fn open_round_trips_entities() {
        let tmp = TempDir::new().unwrap();
        {
            let mut store = JsonStore::init(tmp.path(), "demo").unwrap();
            store
                .create_entity(
                    PipelineKind::Quotes,
                    EntitySeed {
                        client: "ACME".into(),
                        amount: 100_000,
                        ..Default::default()
                    },
                )
                .unwrap();
        }
        let store = JsonStore::open(tmp.path()).unwrap();
        let entities = store.list_entities(PipelineKind::Quotes).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].id, "Q-001");
        assert_eq!(entities[0].amount, 100_000);
    }

    #[test]
    fn discover_walks_up() {
        let tmp = TempDir::new().unwrap();
        JsonStore::init(tmp.path(), "demo").unwrap();
        let nested = tmp.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        let found = JsonStore::discover(&nested).unwrap();
        assert_eq!(found, tmp.path());
    }

    #[test]
    fn discover_without_board_errors() {
        let tmp = TempDir::new().unwrap();
        assert!(JsonStore::discover(tmp.path()).is_err());
    }

    #[test]
    fn open_malformed_board_is_a_parse_error() {
        let tmp = TempDir::new().unwrap();
        JsonStore::init(tmp.path(), "demo").unwrap();
        fs::write(tmp.path().join("tablero/board.json"), "not json {{{").unwrap();
        let err = JsonStore::open(tmp.path()).unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[test]
    fn delete_stage_guards() {
        let tmp = TempDir::new().unwrap();
        let mut store = JsonStore::init(tmp.path(), "demo").unwrap();
        // locked
        let err = store.delete_stage("finished").unwrap_err();
        assert!(matches!(err, StoreError::StageLocked));
        // occupied
        store
            .create_entity(PipelineKind::Quotes, EntitySeed::default())
            .unwrap();
        let err = store.delete_stage("contacted").unwrap_err();
        assert!(matches!(err, StoreError::StageNotEmpty(1)));
        // empty and unlocked
        store.delete_stage("quoted").unwrap();
        assert!(store.config().find_stage("quoted").is_none());
    }

    #[test]
    fn mutations_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let mut store = JsonStore::init(tmp.path(), "demo").unwrap();
            let quote = store
                .create_entity(PipelineKind::Quotes, EntitySeed::default())
                .unwrap();
            store
                .move_entity(&quote.id, "quoted", Snapshot::new(), None)
                .unwrap();
        }
        let store = JsonStore::open(tmp.path()).unwrap();
        let entities = store.list_entities(PipelineKind::Quotes).unwrap();
        assert_eq!(entities[0].stage_id, "quoted");
        assert_eq!(entities[0].history.len(), 2);
    }

    #[test]
    fn discover_finds_exact_root() {
        let tmp = TempDir::new().unwrap();
        JsonStore::init(tmp.path(), "demo").unwrap();
        assert_eq!(JsonStore::discover(tmp.path()).unwrap(), tmp.path());
    }
}
