use crossterm::event::{KeyCode, KeyEvent};

use crate::model::history::FieldValue;
use crate::model::stage::PipelineKind;
use crate::ops::reorder;
use crate::ops::transition::Begun;

use super::super::app::{App, Cursor, FormInput, FormState, Mode};

pub(super) fn handle(app: &mut App, key: KeyEvent) {
    match key.code {
        // Cancel: the ghost is dropped, nothing was mutated
        KeyCode::Esc => {
            app.move_state = None;
            app.mode = Mode::Navigate;
        }
        KeyCode::Left | KeyCode::Char('h') => move_ghost_stage(app, -1),
        KeyCode::Right | KeyCode::Char('l') => move_ghost_stage(app, 1),
        KeyCode::Up | KeyCode::Char('k') => move_ghost_row(app, -1),
        KeyCode::Down | KeyCode::Char('j') => move_ghost_row(app, 1),
        KeyCode::Enter | KeyCode::Char('m') => confirm(app),
        _ => {}
    }
}

fn move_ghost_stage(app: &mut App, direction: i32) {
    let stage_count = app.visible_stage_ids().len();
    let Some(ms) = &mut app.move_state else {
        return;
    };
    let stage = (ms.stage as i32 + direction).clamp(0, stage_count as i32 - 1) as usize;
    ms.stage = stage;
    // a cross-stage drop always lands at the head; rows only matter at home
    ms.row = if stage == ms.from_stage { ms.from_row } else { 0 };
}

fn move_ghost_row(app: &mut App, direction: i32) {
    let stage_ids = app.visible_stage_ids();
    let Some(ms) = &app.move_state else {
        return;
    };
    if ms.stage != ms.from_stage {
        return;
    }
    let lane_len = stage_ids
        .get(ms.stage)
        .map(|id| app.board().lane(id).len())
        .unwrap_or(0);
    if lane_len == 0 {
        return;
    }
    let row = (ms.row as i32 + direction).clamp(0, lane_len as i32 - 1) as usize;
    if let Some(ms) = &mut app.move_state {
        ms.row = row;
    }
}

/// Drop the ghost: same stage goes to reorder persistence, a different
/// stage becomes a transition gesture through the coordinator.
fn confirm(app: &mut App) {
    let Some(ms) = app.move_state.take() else {
        app.mode = Mode::Navigate;
        return;
    };
    app.mode = Mode::Navigate;
    let stage_ids = app.visible_stage_ids();

    if ms.stage == ms.from_stage {
        if ms.row != ms.from_row
            && let Some(stage_id) = stage_ids.get(ms.stage)
        {
            let mut order: Vec<String> = app.board().lane(stage_id).to_vec();
            order.retain(|id| id != &ms.entity_id);
            let at = ms.row.min(order.len());
            order.insert(at, ms.entity_id.clone());
            let result = match app.view {
                PipelineKind::Quotes => {
                    reorder::reorder(&mut app.quotes, &mut app.store, stage_id, order)
                }
                PipelineKind::Projects => {
                    reorder::reorder(&mut app.projects, &mut app.store, stage_id, order)
                }
            };
            match result {
                Ok(()) => {
                    *app.cursor_mut() = Cursor {
                        stage: ms.stage,
                        row: ms.row,
                    };
                }
                Err(e) => app.push_error(format!("reorder failed: {e}")),
            }
        }
        app.clamp_cursor();
        return;
    }

    let Some(dest) = stage_ids.get(ms.stage).cloned() else {
        return;
    };
    let config = app.config.clone();
    let begun = match app.view {
        PipelineKind::Quotes => app.coordinator.begin(
            &mut app.quotes,
            &mut app.store,
            &config,
            &ms.entity_id,
            &dest,
        ),
        PipelineKind::Projects => app.coordinator.begin(
            &mut app.projects,
            &mut app.store,
            &config,
            &ms.entity_id,
            &dest,
        ),
    };
    match begun {
        Ok(Begun::Committed(outcome)) => {
            app.report_commit(&outcome);
            *app.cursor_mut() = Cursor {
                stage: ms.stage,
                row: 0,
            };
        }
        Ok(Begun::NeedsInput) => {
            open_form(app, &dest);
        }
        Err(e) => app.push_error(format!("move failed: {e}")),
    }
    app.clamp_cursor();
}

/// Build the collection form from the pending transition, pre-seeding
/// each buffer from the resolver's defaults.
fn open_form(app: &mut App, dest: &str) {
    let Some(pending) = app.coordinator.pending() else {
        return;
    };
    let inputs: Vec<FormInput> = pending
        .fields
        .iter()
        .map(|field| {
            let buffer = match pending.defaults.get(&field.key()) {
                Some(FieldValue::Number(n)) => n.to_string(),
                Some(FieldValue::Text(s)) => s.clone(),
                _ => String::new(),
            };
            FormInput {
                field: field.clone(),
                buffer,
            }
        })
        .collect();
    let title = format!(
        "Move {} to {}",
        pending.entity_id,
        app.stage_display_name(dest)
    );
    app.form = Some(FormState {
        title,
        inputs,
        focus: 0,
        error: None,
    });
    app.mode = Mode::Form;
}
