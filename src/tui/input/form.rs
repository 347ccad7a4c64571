use crossterm::event::{KeyCode, KeyEvent};

use crate::model::form::parse_value;
use crate::model::history::Snapshot;
use crate::model::stage::PipelineKind;
use crate::ops::transition::TransitionError;

use super::super::app::{App, Mode};

pub(super) fn handle(app: &mut App, key: KeyEvent) {
    match key.code {
        // Cancel: no mutation has occurred
        KeyCode::Esc => {
            app.coordinator.cancel();
            app.form = None;
            app.mode = Mode::Navigate;
            app.push_notice("move cancelled");
        }
        KeyCode::Tab | KeyCode::Down => focus_next(app, 1),
        KeyCode::BackTab | KeyCode::Up => focus_next(app, -1),
        KeyCode::Backspace => {
            if let Some(form) = &mut app.form
                && let Some(input) = form.inputs.get_mut(form.focus)
            {
                input.buffer.pop();
            }
        }
        KeyCode::Char(c) => {
            if let Some(form) = &mut app.form
                && let Some(input) = form.inputs.get_mut(form.focus)
            {
                input.buffer.push(c);
            }
        }
        KeyCode::Enter => submit(app),
        _ => {}
    }
}

fn focus_next(app: &mut App, direction: i32) {
    if let Some(form) = &mut app.form {
        let len = form.inputs.len() as i32;
        if len > 0 {
            form.focus = ((form.focus as i32 + direction).rem_euclid(len)) as usize;
        }
    }
}

fn submit(app: &mut App) {
    let Some(form) = app.form.clone() else {
        return;
    };

    // local validation first: a bad field blocks before any store call
    let mut values = Snapshot::new();
    for input in &form.inputs {
        match parse_value(&input.field, &input.buffer) {
            Ok(Some(value)) => {
                values.insert(input.field.key(), value);
            }
            Ok(None) => {}
            Err(e) => {
                if let Some(form) = &mut app.form {
                    form.error = Some(e.to_string());
                }
                return;
            }
        }
    }

    let config = app.config.clone();
    let result = match app.view {
        PipelineKind::Quotes => {
            app.coordinator
                .submit(&mut app.quotes, &mut app.store, &config, values)
        }
        PipelineKind::Projects => {
            app.coordinator
                .submit(&mut app.projects, &mut app.store, &config, values)
        }
    };
    match result {
        Ok(outcome) => {
            app.form = None;
            app.mode = Mode::Navigate;
            app.report_commit(&outcome);
            app.clamp_cursor();
        }
        Err(TransitionError::Form(e)) => {
            // form stays open for another attempt
            if let Some(form) = &mut app.form {
                form.error = Some(e.to_string());
            }
        }
        Err(e) => {
            // rolled back and refetched inside the coordinator
            app.form = None;
            app.mode = Mode::Navigate;
            app.push_error(format!("move failed: {e}"));
            app.clamp_cursor();
        }
    }
}
