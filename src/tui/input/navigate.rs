use crossterm::event::{KeyCode, KeyEvent};

use crate::model::stage::PipelineKind;
use crate::ops::undo::{self, UndoOutcome};
use crate::store::PipelineStore;

use super::super::app::{App, Cursor, Mode, MoveState};

pub(super) fn handle(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Tab => {
            app.view = match app.view {
                PipelineKind::Quotes => PipelineKind::Projects,
                PipelineKind::Projects => PipelineKind::Quotes,
            };
            app.clamp_cursor();
        }
        KeyCode::Char('r') => {
            app.refetch_all();
            app.push_notice("refreshed");
        }
        KeyCode::Left | KeyCode::Char('h') => move_cursor_stage(app, -1),
        KeyCode::Right | KeyCode::Char('l') => move_cursor_stage(app, 1),
        KeyCode::Up | KeyCode::Char('k') => move_cursor_row(app, -1),
        KeyCode::Down | KeyCode::Char('j') => move_cursor_row(app, 1),
        KeyCode::Char('m') | KeyCode::Char(' ') | KeyCode::Enter => enter_move_mode(app),
        KeyCode::Char('u') => request_undo(app),
        KeyCode::Char('x') => delete_entity(app),
        _ => {}
    }
}

fn move_cursor_stage(app: &mut App, direction: i32) {
    let stage_count = app.visible_stage_ids().len();
    if stage_count == 0 {
        return;
    }
    let cursor = app.cursor();
    let stage =
        (cursor.stage as i32 + direction).clamp(0, stage_count as i32 - 1) as usize;
    *app.cursor_mut() = Cursor { stage, row: 0 };
    app.clamp_cursor();
}

fn move_cursor_row(app: &mut App, direction: i32) {
    let cursor = app.cursor();
    let lane_len = app
        .visible_stage_ids()
        .get(cursor.stage)
        .map(|id| app.board().lane(id).len())
        .unwrap_or(0);
    if lane_len == 0 {
        return;
    }
    let row = (cursor.row as i32 + direction).clamp(0, lane_len as i32 - 1) as usize;
    *app.cursor_mut() = Cursor {
        stage: cursor.stage,
        row,
    };
}

/// Pick up the entity under the cursor. The ghost follows the cursor
/// until confirmed; nothing is mutated until then.
fn enter_move_mode(app: &mut App) {
    if app.coordinator.is_busy() {
        app.push_error("a transition is still in flight");
        return;
    }
    let Some(entity_id) = app.entity_under_cursor() else {
        return;
    };
    let cursor = app.cursor();
    app.move_state = Some(MoveState {
        entity_id,
        from_stage: cursor.stage,
        from_row: cursor.row,
        stage: cursor.stage,
        row: cursor.row,
    });
    app.mode = Mode::Move;
}

fn request_undo(app: &mut App) {
    let Some(entity_id) = app.entity_under_cursor() else {
        return;
    };
    let result = match app.view {
        PipelineKind::Quotes => undo::undo(&mut app.quotes, &mut app.store, &entity_id),
        PipelineKind::Projects => undo::undo(&mut app.projects, &mut app.store, &entity_id),
    };
    match result {
        Ok(UndoOutcome::Reverted { to, .. }) => {
            let to = app.stage_display_name(&to);
            app.push_notice(format!("{entity_id} returned to {to}"));
        }
        Ok(UndoOutcome::NothingToUndo) => {
            app.push_error(format!("nothing to undo for {entity_id}"));
        }
        Err(e) => app.push_error(format!("undo failed: {e}")),
    }
    app.clamp_cursor();
}

/// Guarded hard delete: only entities in removable stages go away.
fn delete_entity(app: &mut App) {
    let Some(entity_id) = app.entity_under_cursor() else {
        return;
    };
    match app.store.delete_entity(&entity_id) {
        Ok(()) => {
            app.push_notice(format!("deleted {entity_id}"));
            let view = app.view;
            app.refetch_view(view);
        }
        Err(e) => app.push_error(format!("delete failed: {e}")),
    }
}
