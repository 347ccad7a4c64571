use serde::{Deserialize, Serialize};

use crate::model::form::{FieldKind, StageFormField};
use crate::model::stage::{PipelineKind, Stage, configured_order};

/// An automated action fired when an entity enters a trigger stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SideEffect {
    /// Create a project bound to the quote's client and id.
    SpawnProject,
    /// Move the originating quote into its finished stage.
    FinishSourceQuote,
}

impl std::fmt::Display for SideEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SideEffect::SpawnProject => write!(f, "spawn-project"),
            SideEffect::FinishSourceQuote => write!(f, "finish-source-quote"),
        }
    }
}

/// A stage plus the configured data that hangs off it: the form schema
/// the resolver serves, the side effect fired on entry, the attachment
/// guard for sub-record submission, and the explicit successor used by
/// the advance decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    #[serde(flatten)]
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<SideEffect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default)]
    pub min_attachments: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub form: Vec<StageFormField>,
}

impl StageConfig {
    pub fn plain(stage: Stage) -> Self {
        StageConfig {
            stage,
            form: Vec::new(),
            effect: None,
            next: None,
            min_attachments: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipelines {
    pub quotes: PipelineConfig,
    pub projects: PipelineConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardMeta {
    pub name: String,
}

/// The board's configured data: stage graphs, per-stage form schemas,
/// side-effect triggers, and guards. Not user-programmable rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub board: BoardMeta,
    pub pipelines: Pipelines,
}

impl BoardConfig {
    pub fn pipeline(&self, kind: PipelineKind) -> &PipelineConfig {
        match kind {
            PipelineKind::Quotes => &self.pipelines.quotes,
            PipelineKind::Projects => &self.pipelines.projects,
        }
    }

    pub fn pipeline_mut(&mut self, kind: PipelineKind) -> &mut PipelineConfig {
        match kind {
            PipelineKind::Quotes => &mut self.pipelines.quotes,
            PipelineKind::Projects => &mut self.pipelines.projects,
        }
    }

    pub fn prefix(&self, kind: PipelineKind) -> &str {
        self.pipeline(kind)
            .prefix
            .as_deref()
            .unwrap_or(kind.default_prefix())
    }

    /// Stages of a pipeline in configured order.
    pub fn stages(&self, kind: PipelineKind) -> Vec<Stage> {
        let stages: Vec<Stage> = self
            .pipeline(kind)
            .stages
            .iter()
            .map(|sc| sc.stage.clone())
            .collect();
        configured_order(&stages).into_iter().cloned().collect()
    }

    /// First stage of a pipeline — where new entities are created.
    pub fn first_stage(&self, kind: PipelineKind) -> Option<Stage> {
        self.stages(kind).into_iter().next()
    }

    /// Look a stage up by id across both pipelines.
    pub fn find_stage(&self, stage_id: &str) -> Option<(PipelineKind, &StageConfig)> {
        for kind in [PipelineKind::Quotes, PipelineKind::Projects] {
            if let Some(sc) = self
                .pipeline(kind)
                .stages
                .iter()
                .find(|sc| sc.stage.id == stage_id)
            {
                return Some((kind, sc));
            }
        }
        None
    }

    /// The form requirement resolver: fields the destination stage
    /// requires before a transition may commit. Empty means the
    /// transition is free.
    pub fn requirements_for(&self, stage_id: &str) -> &[StageFormField] {
        self.find_stage(stage_id)
            .map(|(_, sc)| sc.form.as_slice())
            .unwrap_or(&[])
    }

    /// Side effect fired when an entity enters the given stage.
    pub fn effect_for(&self, stage_id: &str) -> Option<SideEffect> {
        self.find_stage(stage_id).and_then(|(_, sc)| sc.effect)
    }

    /// Minimum attachment count before the stage's sub-record may be
    /// submitted.
    pub fn min_attachments_for(&self, stage_id: &str) -> usize {
        self.find_stage(stage_id)
            .map(|(_, sc)| sc.min_attachments)
            .unwrap_or(0)
    }

    /// Explicit successor stage for the advance decision.
    pub fn next_for(&self, stage_id: &str) -> Option<&str> {
        self.find_stage(stage_id).and_then(|(_, sc)| sc.next.as_deref())
    }

    /// Target of the finish-source-quote effect: the quotes pipeline's
    /// finished stage.
    pub fn finished_quote_stage(&self) -> Option<&str> {
        let terminals: Vec<&str> = self
            .pipelines
            .quotes
            .stages
            .iter()
            .filter(|sc| sc.stage.terminal)
            .map(|sc| sc.stage.id.as_str())
            .collect();
        terminals
            .iter()
            .copied()
            .find(|id| *id == "finished")
            .or_else(|| terminals.last().copied())
    }

    /// Default board: the quote pipeline and the project multi-stage
    /// workflow, with the stock form schemas, guards, and triggers.
    pub fn default_board(name: &str) -> BoardConfig {
        let mut quotes: Vec<StageConfig> = Vec::new();
        let mut s = Stage::new("contacted", "Contacted", 0);
        s.color = Some("blue".into());
        s.removable = true;
        quotes.push(StageConfig::plain(s));

        let mut s = Stage::new("quoted", "Quoted", 1);
        s.color = Some("cyan".into());
        quotes.push(StageConfig::plain(s));

        let mut s = Stage::new("negotiation", "Negotiation", 2);
        s.color = Some("yellow".into());
        let mut sc = StageConfig::plain(s);
        sc.form = vec![StageFormField::new("Precio", FieldKind::Money)];
        quotes.push(sc);

        let mut s = Stage::new("project-to-start", "Project to start", 3);
        s.color = Some("green".into());
        let mut sc = StageConfig::plain(s);
        sc.effect = Some(SideEffect::SpawnProject);
        quotes.push(sc);

        let mut s = Stage::new("not-realized", "Not realized", 4);
        s.color = Some("red".into());
        s.terminal = true;
        quotes.push(StageConfig::plain(s));

        let mut s = Stage::new("finished", "Finished", 5);
        s.color = Some("green".into());
        s.terminal = true;
        s.locked = true;
        quotes.push(StageConfig::plain(s));

        let mut projects: Vec<StageConfig> = Vec::new();
        let mut s = Stage::new("technical-visit", "Technical visit", 0);
        s.color = Some("blue".into());
        let mut sc = StageConfig::plain(s);
        sc.next = Some("measurement".into());
        projects.push(sc);

        let s = Stage::new("measurement", "Measurement", 1);
        let mut sc = StageConfig::plain(s);
        sc.next = Some("verification".into());
        sc.min_attachments = 3;
        projects.push(sc);

        let s = Stage::new("verification", "Verification", 2);
        let mut sc = StageConfig::plain(s);
        sc.next = Some("workshop".into());
        projects.push(sc);

        // Workshop branches through the route field, so no `next`.
        let mut s = Stage::new("workshop", "Workshop", 3);
        s.color = Some("yellow".into());
        projects.push(StageConfig::plain(s));

        let s = Stage::new("deposit", "Deposit", 4);
        let mut sc = StageConfig::plain(s);
        sc.next = Some("completed".into());
        projects.push(sc);

        let s = Stage::new("logistics", "Logistics", 5);
        let mut sc = StageConfig::plain(s);
        sc.next = Some("completed".into());
        projects.push(sc);

        let s = Stage::new("on-site-install", "On-site install", 6);
        let mut sc = StageConfig::plain(s);
        sc.next = Some("completed".into());
        projects.push(sc);

        let s = Stage::new("customer-pickup", "Customer pickup", 7);
        let mut sc = StageConfig::plain(s);
        sc.next = Some("completed".into());
        projects.push(sc);

        let mut s = Stage::new("completed", "Completed", 8);
        s.color = Some("green".into());
        s.terminal = true;
        s.locked = true;
        let mut sc = StageConfig::plain(s);
        sc.effect = Some(SideEffect::FinishSourceQuote);
        projects.push(sc);

        let mut s = Stage::new("rejected", "Rejected", 9);
        s.color = Some("red".into());
        s.terminal = true;
        projects.push(StageConfig::plain(s));

        BoardConfig {
            board: BoardMeta {
                name: name.to_string(),
            },
            pipelines: Pipelines {
                quotes: PipelineConfig {
                    prefix: None,
                    stages: quotes,
                },
                projects: PipelineConfig {
                    prefix: None,
                    stages: projects,
                },
            },
        }
    }

    // -----------------------------------------------------------------
    // Unguarded config edits. Guards (locked, occupancy) live with the
    // store, which can see entity counts.
    // -----------------------------------------------------------------

    /// Append a stage at the end of a pipeline's configured order.
    pub fn add_stage(&mut self, kind: PipelineKind, mut stage: Stage) {
        let pipeline = self.pipeline_mut(kind);
        let max = pipeline
            .stages
            .iter()
            .map(|sc| sc.stage.position)
            .max()
            .unwrap_or(0);
        stage.position = if pipeline.stages.is_empty() { 0 } else { max + 1 };
        pipeline.stages.push(StageConfig::plain(stage));
    }

    pub fn rename_stage(&mut self, stage_id: &str, name: &str) -> bool {
        for kind in [PipelineKind::Quotes, PipelineKind::Projects] {
            if let Some(sc) = self
                .pipeline_mut(kind)
                .stages
                .iter_mut()
                .find(|sc| sc.stage.id == stage_id)
            {
                sc.stage.name = name.to_string();
                return true;
            }
        }
        false
    }

    /// Rewrite a pipeline's positions to match `ordered_ids`. Ids not
    /// listed keep their relative order after the listed ones.
    pub fn reorder_stages(&mut self, kind: PipelineKind, ordered_ids: &[String]) {
        let pipeline = self.pipeline_mut(kind);
        let mut next_pos: u32 = 0;
        for id in ordered_ids {
            if let Some(sc) = pipeline.stages.iter_mut().find(|sc| &sc.stage.id == id) {
                sc.stage.position = next_pos;
                next_pos += 1;
            }
        }
        let mut rest: Vec<&mut StageConfig> = pipeline
            .stages
            .iter_mut()
            .filter(|sc| !ordered_ids.contains(&sc.stage.id))
            .collect();
        rest.sort_by_key(|sc| sc.stage.position);
        for sc in rest {
            sc.stage.position = next_pos;
            next_pos += 1;
        }
    }

    pub fn remove_stage(&mut self, stage_id: &str) -> bool {
        for kind in [PipelineKind::Quotes, PipelineKind::Projects] {
            let pipeline = self.pipeline_mut(kind);
            let before = pipeline.stages.len();
            pipeline.stages.retain(|sc| sc.stage.id != stage_id);
            if pipeline.stages.len() != before {
                return true;
            }
        }
        false
    }
}
