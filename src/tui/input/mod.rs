mod form;
mod move_mode;
mod navigate;

use crossterm::event::KeyEvent;

use super::app::{App, Mode};

pub fn handle_key(app: &mut App, key: KeyEvent) {
    if app.show_help {
        app.show_help = false;
        return;
    }
    match app.mode {
        Mode::Navigate => navigate::handle(app, key),
        Mode::Move => move_mode::handle(app, key),
        Mode::Form => form::handle(app, key),
    }
}
