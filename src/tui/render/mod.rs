pub mod board_view;
pub mod form_popup;
pub mod helpers;

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::model::stage::PipelineKind;

use super::app::{App, Mode};
use helpers::centered_rect;

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .split(frame.area());

    tab_bar(frame, app, chunks[0]);
    board_view::draw(frame, app, chunks[1]);
    status_row(frame, app, chunks[2]);

    if app.mode == Mode::Form {
        form_popup::draw(frame, app);
    }
    if app.show_help {
        help_overlay(frame, app);
    }
}

fn tab_bar(frame: &mut Frame, app: &App, area: Rect) {
    let tab = |kind: PipelineKind, label: &str| -> Span<'static> {
        if app.view == kind {
            Span::styled(
                format!(" {} ", label),
                Style::default()
                    .fg(app.theme.accent)
                    .add_modifier(Modifier::BOLD | Modifier::REVERSED),
            )
        } else {
            Span::styled(format!(" {} ", label), Style::default().fg(app.theme.dim))
        }
    };
    let line = Line::from(vec![
        tab(PipelineKind::Quotes, "QUOTES"),
        Span::raw(" "),
        tab(PipelineKind::Projects, "PROJECTS"),
        Span::raw("   "),
        Span::styled(
            app.config.board.name.clone(),
            Style::default().fg(app.theme.dim),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn status_row(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans: Vec<Span> = Vec::new();

    if app.coordinator.is_busy() {
        // blocking overlay marker: one transition at a time
        spans.push(Span::styled(
            "[transition pending] ",
            Style::default()
                .fg(app.theme.overlay)
                .add_modifier(Modifier::BOLD),
        ));
    }
    for notice in app.last_notices(2) {
        let style = if notice.error {
            Style::default().fg(app.theme.error)
        } else {
            Style::default()
        };
        spans.push(Span::styled(format!("{}  ", notice.text), style));
    }

    let hints = match app.mode {
        Mode::Navigate => "tab:pipeline  m:move  u:undo  x:delete  r:refresh  ?:help  q:quit",
        Mode::Move => "h/l:stage  j/k:position  enter:drop  esc:cancel",
        Mode::Form => "tab:next field  enter:submit  esc:cancel",
    };
    spans.push(Span::styled(hints, Style::default().fg(app.theme.dim)));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn help_overlay(frame: &mut Frame, app: &App) {
    let lines = vec![
        Line::raw("h/l, arrows   move between stages"),
        Line::raw("j/k, arrows   move within a stage"),
        Line::raw("tab           switch pipeline"),
        Line::raw("m, space      pick up / drop an entity"),
        Line::raw("u             undo the last transition"),
        Line::raw("x             delete (removable stages only)"),
        Line::raw("r             refresh from the store"),
        Line::raw("q             quit"),
        Line::raw(""),
        Line::styled(
            "any key to close",
            Style::default().fg(app.theme.dim),
        ),
    ];
    let area = centered_rect(46, lines.len() as u16 + 2, frame.area());
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.accent))
        .title(" keys ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
