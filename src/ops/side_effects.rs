use tracing::{info, warn};

use crate::model::config::{BoardConfig, SideEffect};
use crate::model::entity::PipelineEntity;
use crate::model::history::Snapshot;
use crate::store::PipelineStore;

/// What the dispatcher did after a committed transition. A `Failed`
/// outcome never reverts the transition that triggered it; it is
/// surfaced as its own notice.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffectOutcome {
    /// The destination stage triggers nothing.
    None,
    SpawnedProject { project_id: String },
    QuoteFinished { quote_id: String },
    Failed { effect: SideEffect, message: String },
}

impl SideEffectOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, SideEffectOutcome::Failed { .. })
    }
}

/// Fire the side effect configured for `dest_stage`, if any. `entity`
/// is the already-moved entity as committed.
pub fn dispatch(
    store: &mut dyn PipelineStore,
    config: &BoardConfig,
    entity: &PipelineEntity,
    dest_stage: &str,
) -> SideEffectOutcome {
    let Some(effect) = config.effect_for(dest_stage) else {
        return SideEffectOutcome::None;
    };
    match effect {
        SideEffect::SpawnProject => {
            match store.create_dependent_record(&entity.id, &entity.client) {
                Ok(project_id) => {
                    info!(quote = %entity.id, project = %project_id, "spawned project");
                    SideEffectOutcome::SpawnedProject { project_id }
                }
                Err(e) => {
                    warn!(quote = %entity.id, error = %e, "dependent creation failed");
                    SideEffectOutcome::Failed {
                        effect,
                        message: e.to_string(),
                    }
                }
            }
        }
        SideEffect::FinishSourceQuote => {
            let Some(quote_id) = entity.source_quote.clone() else {
                // nothing to move for a project without an originating quote
                return SideEffectOutcome::None;
            };
            let Some(finished) = config.finished_quote_stage().map(str::to_string) else {
                return SideEffectOutcome::Failed {
                    effect,
                    message: "quotes pipeline has no finished stage".into(),
                };
            };
            match store.move_entity(&quote_id, &finished, Snapshot::new(), None) {
                Ok(()) => {
                    info!(project = %entity.id, quote = %quote_id, "source quote finished");
                    SideEffectOutcome::QuoteFinished { quote_id }
                }
                Err(e) => {
                    warn!(project = %entity.id, quote = %quote_id, error = %e, "source quote move failed");
                    SideEffectOutcome::Failed {
                        effect,
                        message: e.to_string(),
                    }
                }
            }
        }
    }
}
