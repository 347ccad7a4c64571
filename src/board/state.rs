use chrono::Utc;
use indexmap::IndexMap;

use crate::model::entity::PipelineEntity;
use crate::model::history::{Snapshot, StageHistoryEntry, amount_change};
use crate::model::stage::{PipelineKind, Stage, configured_order, display_order};

/// A mutation of the board projection. The reducer in `apply` is the
/// only place local board state changes, so it can be tested without
/// any rendering layer.
#[derive(Debug, Clone)]
pub enum BoardAction {
    /// Splice the entity out of its stage and prepend it to `to_stage`
    /// (most-recent-first), appending a ledger entry.
    Move {
        entity_id: String,
        to_stage: String,
        snapshot: Snapshot,
        new_amount: Option<i64>,
    },
    /// Rewrite one stage's sequence. `ordered_ids` must be a
    /// permutation of the lane; callers validate before dispatching.
    Reorder {
        stage_id: String,
        ordered_ids: Vec<String>,
    },
    /// Revert the entity's most recent ledger entry.
    Undo { entity_id: String },
    StageCreated { stage: Stage },
    StageDeleted { stage_id: String },
    /// Replace the whole projection with server truth.
    Refresh {
        stages: Vec<Stage>,
        entities: Vec<PipelineEntity>,
    },
}

/// The in-memory projection one pipeline's UI renders: per-stage
/// ordered sequences of entities.
#[derive(Debug, Clone)]
pub struct BoardState {
    pub kind: PipelineKind,
    stages: Vec<Stage>,
    /// stage id → entity ids, head first. Lane order mirrors the
    /// configured stage order.
    lanes: IndexMap<String, Vec<String>>,
    entities: IndexMap<String, PipelineEntity>,
}

impl BoardState {
    pub fn new(kind: PipelineKind, stages: Vec<Stage>, entities: Vec<PipelineEntity>) -> Self {
        let mut board = BoardState {
            kind,
            stages: Vec::new(),
            lanes: IndexMap::new(),
            entities: IndexMap::new(),
        };
        board.rebuild(stages, entities);
        board
    }

    /// Rebuild lanes from scratch: stages in configured order, each
    /// lane sorted by stored position. Entities referencing a stage the
    /// config no longer lists still get a lane, so every entity appears
    /// exactly once.
    fn rebuild(&mut self, stages: Vec<Stage>, entities: Vec<PipelineEntity>) {
        self.lanes.clear();
        self.entities.clear();
        for stage in configured_order(&stages) {
            self.lanes.insert(stage.id.clone(), Vec::new());
        }
        self.stages = stages;

        let mut by_stage: IndexMap<String, Vec<(i64, String)>> = IndexMap::new();
        for entity in entities {
            by_stage
                .entry(entity.stage_id.clone())
                .or_default()
                .push((entity.position, entity.id.clone()));
            self.entities.insert(entity.id.clone(), entity);
        }
        for (stage_id, mut members) in by_stage {
            members.sort_by_key(|(pos, _)| *pos);
            let lane = self.lanes.entry(stage_id).or_default();
            *lane = members.into_iter().map(|(_, id)| id).collect();
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Stages in display order (terminal stages last).
    pub fn display_stages(&self) -> Vec<&Stage> {
        display_order(&self.stages)
    }

    pub fn stage(&self, stage_id: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == stage_id)
    }

    pub fn lane(&self, stage_id: &str) -> &[String] {
        self.lanes.get(stage_id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn entity(&self, entity_id: &str) -> Option<&PipelineEntity> {
        self.entities.get(entity_id)
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(|k| k.as_str())
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Position a newly-inserted head entity gets: one below the
    /// current minimum, so indices stay unique without renumbering the
    /// rest of the lane.
    fn head_position(&self, stage_id: &str) -> i64 {
        self.lane(stage_id)
            .iter()
            .filter_map(|id| self.entities.get(id))
            .map(|e| e.position)
            .min()
            .map(|min| min - 1)
            .unwrap_or(0)
    }

    pub fn apply(&mut self, action: BoardAction) {
        match action {
            BoardAction::Move {
                entity_id,
                to_stage,
                snapshot,
                new_amount,
            } => {
                let Some(entity) = self.entities.get(&entity_id) else {
                    return;
                };
                let from = entity.stage_id.clone();
                if let Some(lane) = self.lanes.get_mut(&from) {
                    lane.retain(|id| id != &entity_id);
                }
                let position = self.head_position(&to_stage);
                self.lanes
                    .entry(to_stage.clone())
                    .or_default()
                    .insert(0, entity_id.clone());
                let entity = self.entities.get_mut(&entity_id).unwrap();
                entity.stage_id = to_stage.clone();
                entity.position = position;
                if let Some(amount) = new_amount {
                    entity.amount = amount;
                }
                entity.history.push(StageHistoryEntry::new(&to_stage, snapshot));
                entity.updated_at = Utc::now();
            }
            BoardAction::Reorder {
                stage_id,
                ordered_ids,
            } => {
                let Some(lane) = self.lanes.get_mut(&stage_id) else {
                    return;
                };
                *lane = ordered_ids.clone();
                for (idx, id) in ordered_ids.iter().enumerate() {
                    if let Some(entity) = self.entities.get_mut(id) {
                        entity.position = idx as i64;
                        entity.updated_at = Utc::now();
                    }
                }
            }
            BoardAction::Undo { entity_id } => {
                let Some(entity) = self.entities.get(&entity_id) else {
                    return;
                };
                if entity.history.len() < 2 {
                    return;
                }
                let from = entity.stage_id.clone();
                let to = entity.history[entity.history.len() - 2].stage_id.clone();
                if let Some(lane) = self.lanes.get_mut(&from) {
                    lane.retain(|id| id != &entity_id);
                }
                let position = self.head_position(&to);
                self.lanes
                    .entry(to.clone())
                    .or_default()
                    .insert(0, entity_id.clone());
                let entity = self.entities.get_mut(&entity_id).unwrap();
                let reverted = entity.history.pop().unwrap();
                if let Some((previous, _)) = amount_change(&reverted.snapshot) {
                    entity.amount = previous;
                }
                entity.stage_id = to;
                entity.position = position;
                entity.updated_at = Utc::now();
            }
            BoardAction::StageCreated { stage } => {
                self.stages.push(stage);
                let stages = std::mem::take(&mut self.stages);
                let entities: Vec<PipelineEntity> =
                    self.entities.values().cloned().collect();
                self.rebuild(stages, entities);
            }
            BoardAction::StageDeleted { stage_id } => {
                self.stages.retain(|s| s.id != stage_id);
                self.lanes.shift_remove(&stage_id);
            }
            BoardAction::Refresh { stages, entities } => {
                self.rebuild(stages, entities);
            }
        }
    }

    /// Check the board's structural invariants. Used by tests.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for (stage_id, lane) in &self.lanes {
            let mut positions = std::collections::HashSet::new();
            for id in lane {
                if !seen.insert(id.clone()) {
                    return Err(format!("entity {id} appears in more than one stage"));
                }
                let entity = self
                    .entities
                    .get(id)
                    .ok_or_else(|| format!("lane {stage_id} references unknown entity {id}"))?;
                if entity.stage_id != *stage_id {
                    return Err(format!(
                        "entity {id} is in lane {stage_id} but records stage {}",
                        entity.stage_id
                    ));
                }
                if !positions.insert(entity.position) {
                    return Err(format!(
                        "duplicate position {} in stage {stage_id}",
                        entity.position
                    ));
                }
                if let Some(last) = entity.history.last()
                    && last.stage_id != entity.stage_id
                {
                    return Err(format!("entity {id} ledger tail != current stage"));
                }
            }
        }
        if seen.len() != self.entities.len() {
            return Err(format!(
                "{} entities tracked but {} appear in lanes",
                self.entities.len(),
                seen.len()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stage(id: &str, pos: u32) -> Stage {
        Stage::new(id, id, pos)
    }

    fn entity(id: &str, stage_id: &str, position: i64) -> PipelineEntity {
        let mut e = PipelineEntity::new(id, PipelineKind::Quotes, stage_id, "ACME");
        e.position = position;
        e
    }

    fn sample_board() -> BoardState {
        BoardState::new(
            PipelineKind::Quotes,
            vec![stage("contacted", 0), stage("quoted", 1), stage("won", 2)],
            vec![
                entity("Q-001", "contacted", 0),
                entity("Q-002", "contacted", 1),
                entity("Q-003", "quoted", 0),
            ],
        )
    }

    #[test]
    fn lanes_built_in_position_order() {
        let board = sample_board();
        assert_eq!(board.lane("contacted"), ["Q-001", "Q-002"]);
        assert_eq!(board.lane("quoted"), ["Q-003"]);
        assert_eq!(board.lane("won"), Vec::<String>::new());
        board.check_invariants().unwrap();
    }

    #[test]
    fn move_prepends_at_destination_head() {
        let mut board = sample_board();
        board.apply(BoardAction::Move {
            entity_id: "Q-002".into(),
            to_stage: "quoted".into(),
            snapshot: Snapshot::new(),
            new_amount: None,
        });
        assert_eq!(board.lane("quoted"), ["Q-002", "Q-003"]);
        assert_eq!(board.lane("contacted"), ["Q-001"]);
        let moved = board.entity("Q-002").unwrap();
        assert_eq!(moved.stage_id, "quoted");
        assert!(moved.position < board.entity("Q-003").unwrap().position);
        assert_eq!(moved.history.last().unwrap().stage_id, "quoted");
        board.check_invariants().unwrap();
    }

    #[test]
    fn move_with_amount_updates_entity() {
        let mut board = sample_board();
        let mut snapshot = Snapshot::new();
        crate::model::history::record_amount_change(&mut snapshot, 0, 120_000);
        board.apply(BoardAction::Move {
            entity_id: "Q-001".into(),
            to_stage: "quoted".into(),
            snapshot,
            new_amount: Some(120_000),
        });
        assert_eq!(board.entity("Q-001").unwrap().amount, 120_000);
    }

    #[test]
    fn reorder_rewrites_lane_and_positions() {
        let mut board = sample_board();
        board.apply(BoardAction::Reorder {
            stage_id: "contacted".into(),
            ordered_ids: vec!["Q-002".into(), "Q-001".into()],
        });
        assert_eq!(board.lane("contacted"), ["Q-002", "Q-001"]);
        assert_eq!(board.entity("Q-002").unwrap().position, 0);
        assert_eq!(board.entity("Q-001").unwrap().position, 1);
        board.check_invariants().unwrap();
    }

    #[test]
    fn undo_restores_previous_stage_and_amount() {
        let mut board = sample_board();
        let mut snapshot = Snapshot::new();
        crate::model::history::record_amount_change(&mut snapshot, 100_000, 120_000);
        // seed the original amount
        {
            let mut entities: Vec<PipelineEntity> =
                board.entities.values().cloned().collect();
            for e in &mut entities {
                if e.id == "Q-001" {
                    e.amount = 100_000;
                }
            }
            let stages = board.stages.clone();
            board.rebuild(stages, entities);
        }
        board.apply(BoardAction::Move {
            entity_id: "Q-001".into(),
            to_stage: "quoted".into(),
            snapshot,
            new_amount: Some(120_000),
        });
        board.apply(BoardAction::Undo {
            entity_id: "Q-001".into(),
        });
        let e = board.entity("Q-001").unwrap();
        assert_eq!(e.stage_id, "contacted");
        assert_eq!(e.amount, 100_000);
        assert_eq!(e.history.len(), 1);
        board.check_invariants().unwrap();
    }

    #[test]
    fn undo_with_single_entry_is_a_no_op() {
        let mut board = sample_board();
        board.apply(BoardAction::Undo {
            entity_id: "Q-001".into(),
        });
        assert_eq!(board.entity("Q-001").unwrap().stage_id, "contacted");
        board.check_invariants().unwrap();
    }

    #[test]
    fn stage_created_and_deleted() {
        let mut board = sample_board();
        board.apply(BoardAction::StageCreated {
            stage: stage("archived", 3),
        });
        assert!(board.stage("archived").is_some());
        assert_eq!(board.lane("archived"), Vec::<String>::new());
        board.apply(BoardAction::StageDeleted {
            stage_id: "archived".into(),
        });
        assert!(board.stage("archived").is_none());
        board.check_invariants().unwrap();
    }

    #[test]
    fn refresh_replaces_projection() {
        let mut board = sample_board();
        board.apply(BoardAction::Refresh {
            stages: vec![stage("contacted", 0)],
            entities: vec![entity("Q-009", "contacted", 0)],
        });
        assert_eq!(board.entity_count(), 1);
        assert_eq!(board.lane("contacted"), ["Q-009"]);
        board.check_invariants().unwrap();
    }
}
