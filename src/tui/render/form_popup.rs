use ratatui::Frame;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use super::super::app::App;
use super::helpers::centered_rect;

/// The collection form: one input per required field, submit on enter,
/// cancel on esc. Doubles as the blocking overlay — board input is
/// unreachable while it is open.
pub fn draw(frame: &mut Frame, app: &App) {
    let Some(form) = &app.form else {
        return;
    };
    let height = (form.inputs.len() as u16) * 2 + 4;
    let area = centered_rect(48, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines: Vec<Line> = Vec::new();
    for (idx, input) in form.inputs.iter().enumerate() {
        let focused = idx == form.focus;
        let label_style = if focused {
            Style::default()
                .fg(app.theme.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let value = if focused {
            format!("{}▏", input.buffer)
        } else {
            input.buffer.clone()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{}: ", input.field.title), label_style),
            Span::raw(value),
        ]));
        lines.push(Line::raw(""));
    }
    if let Some(error) = &form.error {
        lines.push(Line::styled(
            error.clone(),
            Style::default().fg(app.theme.error),
        ));
    } else {
        lines.push(Line::styled(
            "enter: submit   esc: cancel",
            Style::default().fg(app.theme.dim),
        ));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.accent))
        .title(format!(" {} ", form.title));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
