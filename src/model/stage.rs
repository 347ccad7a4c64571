use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::util::text::fold_name;

/// Which pipeline an entity or stage belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    Quotes,
    Projects,
}

impl PipelineKind {
    /// Default entity-id prefix for the pipeline (`Q-001`, `P-001`).
    pub fn default_prefix(self) -> &'static str {
        match self {
            PipelineKind::Quotes => "Q",
            PipelineKind::Projects => "P",
        }
    }
}

impl std::fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineKind::Quotes => write!(f, "quotes"),
            PipelineKind::Projects => write!(f, "projects"),
        }
    }
}

/// A named position in a pipeline.
///
/// `position` defines the configured linear order. `terminal` stages are
/// re-sorted to the end for display only. `locked` stages can never be
/// deleted, even when empty. `removable` marks the stages whose entities
/// may be hard-deleted instead of retired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub terminal: bool,
    #[serde(default)]
    pub removable: bool,
    pub position: u32,
}

impl Stage {
    pub fn new(id: &str, name: &str, position: u32) -> Self {
        Stage {
            id: id.to_string(),
            name: name.to_string(),
            color: None,
            locked: false,
            terminal: false,
            removable: false,
            position,
        }
    }
}

/// Stages in configured order (by `position`, stable on ties).
pub fn configured_order(stages: &[Stage]) -> Vec<&Stage> {
    let mut out: Vec<&Stage> = stages.iter().collect();
    out.sort_by_key(|s| s.position);
    out
}

/// Stages in display order: configured order, except terminal stages
/// always come last. This is a presentation re-sort, not a data change.
pub fn display_order(stages: &[Stage]) -> Vec<&Stage> {
    let ordered = configured_order(stages);
    let mut out: Vec<&Stage> = ordered.iter().copied().filter(|s| !s.terminal).collect();
    out.extend(ordered.iter().copied().filter(|s| s.terminal));
    out
}

/// Accent- and case-insensitive display-name lookup, built once per
/// config load instead of folding on every comparison.
#[derive(Debug, Clone, Default)]
pub struct StageIndex {
    by_name: HashMap<String, String>,
}

impl StageIndex {
    pub fn build(stages: &[Stage]) -> Self {
        let mut by_name = HashMap::new();
        for stage in stages {
            by_name.insert(fold_name(&stage.name), stage.id.clone());
        }
        StageIndex { by_name }
    }

    /// Resolve a display name (any casing, accents optional) to a stage id.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.by_name.get(&fold_name(name)).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_stages() -> Vec<Stage> {
        let mut finished = Stage::new("finished", "Finished", 5);
        finished.terminal = true;
        let mut not_realized = Stage::new("not-realized", "Not realized", 2);
        not_realized.terminal = true;
        vec![
            Stage::new("contacted", "Contacted", 0),
            Stage::new("quoted", "Quoted", 1),
            not_realized,
            Stage::new("negotiation", "Negociación", 3),
            Stage::new("project-to-start", "Project to start", 4),
            finished,
        ]
    }

    #[test]
    fn configured_order_sorts_by_position() {
        let mut stages = sample_stages();
        stages.reverse();
        let ids: Vec<&str> = configured_order(&stages).iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "contacted",
                "quoted",
                "not-realized",
                "negotiation",
                "project-to-start",
                "finished"
            ]
        );
    }

    #[test]
    fn display_order_puts_terminal_last() {
        let stages = sample_stages();
        let ids: Vec<&str> = display_order(&stages).iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "contacted",
                "quoted",
                "negotiation",
                "project-to-start",
                "not-realized",
                "finished"
            ]
        );
    }

    #[test]
    fn stage_index_resolves_accents_and_case() {
        let stages = sample_stages();
        let index = StageIndex::build(&stages);
        assert_eq!(index.resolve("negociacion"), Some("negotiation"));
        assert_eq!(index.resolve("NEGOCIACIÓN"), Some("negotiation"));
        assert_eq!(index.resolve("Quoted"), Some("quoted"));
        assert_eq!(index.resolve("nope"), None);
    }
}
