use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::util::text::truncate_to_width;

use super::super::app::{App, Mode};
use super::super::theme::stage_color;

/// One row of a stage column.
struct Row {
    text: String,
    selected: bool,
    ghost: bool,
    dimmed: bool,
}

pub fn draw(frame: &mut Frame, app: &App, area: Rect) {
    let stages = app.board().display_stages();
    if stages.is_empty() {
        return;
    }
    let constraints = vec![Constraint::Ratio(1, stages.len() as u32); stages.len()];
    let columns = Layout::horizontal(constraints).split(area);

    for (col_idx, stage) in stages.iter().enumerate() {
        let rows = column_rows(app, col_idx, &stage.id);
        let title = format!(" {} ({}) ", stage.name, app.board().lane(&stage.id).len());
        let border_style = if col_idx == app.cursor().stage {
            Style::default()
                .fg(stage_color(stage.color.as_deref()))
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(app.theme.dim)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(title);
        let inner_width = columns[col_idx].width.saturating_sub(2) as usize;

        let lines: Vec<Line> = rows
            .iter()
            .map(|row| {
                let marker = if row.ghost { "▸ " } else { "  " };
                let text = truncate_to_width(
                    &format!("{}{}", marker, row.text),
                    inner_width,
                );
                let mut style = Style::default();
                if row.ghost {
                    style = style.fg(app.theme.overlay).add_modifier(Modifier::BOLD);
                } else if row.dimmed {
                    style = style.fg(app.theme.dim);
                } else if row.selected {
                    style = style
                        .bg(app.theme.selection_bg)
                        .add_modifier(Modifier::BOLD);
                }
                Line::styled(text, style)
            })
            .collect();

        frame.render_widget(Paragraph::new(lines).block(block), columns[col_idx]);
    }
}

/// Rows for one column, with the move ghost spliced in: a same-stage
/// ghost previews the reorder, a cross-stage ghost lands at the head
/// (where the drop will prepend it).
fn column_rows(app: &App, col_idx: usize, stage_id: &str) -> Vec<Row> {
    let board = app.board();
    let cursor = app.cursor();
    let lane = board.lane(stage_id);

    let entity_text = |id: &str| -> String {
        board
            .entity(id)
            .map(|e| format!("{}  {}  {}", e.id, e.client, e.amount))
            .unwrap_or_else(|| id.to_string())
    };

    if let Some(ms) = &app.move_state {
        let in_home = ms.stage == ms.from_stage;
        if col_idx == ms.from_stage && in_home {
            // reorder preview within the home stage
            let mut ids: Vec<&String> = lane.iter().filter(|id| **id != ms.entity_id).collect();
            let at = ms.row.min(ids.len());
            ids.insert(at, &ms.entity_id);
            return ids
                .into_iter()
                .enumerate()
                .map(|(idx, id)| Row {
                    text: entity_text(id),
                    selected: false,
                    ghost: idx == ms.row,
                    dimmed: false,
                })
                .collect();
        }
        if col_idx == ms.from_stage {
            // ghost hovers elsewhere: show the origin dimmed
            return lane
                .iter()
                .map(|id| Row {
                    text: entity_text(id),
                    selected: false,
                    ghost: false,
                    dimmed: *id == ms.entity_id,
                })
                .collect();
        }
        if col_idx == ms.stage {
            // cross-stage drop lands at the head
            let mut rows = vec![Row {
                text: entity_text(&ms.entity_id),
                selected: false,
                ghost: true,
                dimmed: false,
            }];
            rows.extend(lane.iter().map(|id| Row {
                text: entity_text(id),
                selected: false,
                ghost: false,
                dimmed: false,
            }));
            return rows;
        }
    }

    lane.iter()
        .enumerate()
        .map(|(idx, id)| Row {
            text: entity_text(id),
            selected: app.mode == Mode::Navigate
                && col_idx == cursor.stage
                && idx == cursor.row,
            ghost: false,
            dimmed: false,
        })
        .collect()
}
