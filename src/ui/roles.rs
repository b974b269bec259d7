use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};

use crate::app::{AppState, Pane};
use crate::model::cell::CellKey;
use crate::model::{Field, RowId};

fn pane_border(app: &AppState, pane: Pane) -> Style {
    if app.focus == pane {
        Style::default().fg(app.theme.title)
    } else {
        Style::default().fg(app.theme.border)
    }
}

/// Text shown for one cell: the live input when it is being edited,
/// the stored value (or `-`) otherwise. Pass phrases are masked unless
/// edit mode is on.
fn cell_text(app: &AppState, id: &RowId, field: Field) -> String {
    let key = CellKey::new(id.clone(), field);
    if let Some(state) = app.editor.get(&key) {
        let cursor = if app.editing.as_ref() == Some(&key) { "▏" } else { "" };
        return format!("{}{cursor}", state.pending);
    }
    let Some(row) = app.model.get(id) else {
        return String::new();
    };
    let value = row.value(field);
    if field == Field::PassPhrase && !value.is_unset() && !app.session.is_on() {
        return "•••••".to_string();
    }
    value.display().to_string()
}

pub fn render_roles_table(f: &mut Frame, area: Rect, app: &mut AppState) {
    let body_height = area.height.saturating_sub(3) as usize;
    if body_height > 0 {
        app.rows_per_page = body_height;
    }
    let app: &AppState = app;
    let rpp = app.rows_per_page.max(1);
    let start = (app.selected_row / rpp) * rpp;
    let end = (start + rpp).min(app.visible.len());
    let slice = app.visible.get(start..end).unwrap_or(&[]);

    let rows: Vec<Row> = slice
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let absolute_index = start + i;
            let is_selected = absolute_index == app.selected_row;
            let members = app.model.get(id).map_or(0, |r| r.members.len());
            let marker = if id.is_staged() { "+" } else { " " };
            let mut cells = vec![Cell::from(marker)];
            for field in Field::ALL {
                let mut cell = Cell::from(cell_text(app, id, field));
                let key = CellKey::new(id.clone(), field);
                if app.editor.is_open(&key) {
                    cell = cell.style(
                        Style::default()
                            .fg(app.theme.highlight_fg)
                            .add_modifier(Modifier::UNDERLINED),
                    );
                } else if is_selected && app.session.is_on() && field == app.selected_field && app.focus == Pane::Roles {
                    cell = cell.style(Style::default().add_modifier(Modifier::REVERSED));
                }
                cells.push(cell);
            }
            cells.push(Cell::from(if id.is_staged() { String::new() } else { members.to_string() }));
            let mut style = if id.is_staged() {
                Style::default().fg(app.theme.staged)
            } else {
                Style::default().fg(app.theme.text)
            };
            if is_selected {
                style = style.fg(app.theme.highlight_fg).add_modifier(Modifier::BOLD);
            }
            Row::new(cells).style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(1),
        Constraint::Length(12),
        Constraint::Percentage(35),
        Constraint::Percentage(15),
        Constraint::Percentage(15),
        Constraint::Length(10),
        Constraint::Length(5),
    ];
    let mut header_cells = vec![Cell::from(" ")];
    header_cells.extend(Field::ALL.iter().map(|f| Cell::from(f.label())));
    header_cells.push(Cell::from("USERS"));
    let header = Row::new(header_cells)
        .style(Style::default().fg(app.theme.title).add_modifier(Modifier::BOLD));

    let title = if app.view.is_active() {
        format!("Roles (filtered {}/{})", app.visible.len(), app.model.len())
    } else {
        "Roles".to_string()
    };
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(pane_border(app, Pane::Roles)),
        )
        .column_spacing(1);
    f.render_widget(table, area);
}

pub fn render_role_details(f: &mut Frame, area: Rect, app: &AppState) {
    let text = match app.selected_row() {
        Some(row) => {
            let mut lines = vec![Line::from(vec![
                Span::raw("State: "),
                if row.id.is_staged() {
                    Span::styled("new (not saved)", Style::default().fg(app.theme.staged))
                } else {
                    Span::raw(format!("saved as {}", row.id))
                },
            ])];
            for field in Field::ALL {
                lines.push(Line::raw(format!(
                    "{}: {}",
                    field.label(),
                    cell_text(app, &row.id, field)
                )));
            }
            lines
        }
        None if !app.loaded => vec![Line::raw("Loading roles...")],
        None => vec![Line::raw("No role selected")],
    };
    let p = Paragraph::new(text).style(Style::default().fg(app.theme.text)).block(
        Block::default()
            .title("Details")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border)),
    );
    f.render_widget(p, area);
}

pub fn render_role_members(f: &mut Frame, area: Rect, app: &AppState) {
    let members = app.selected_row().map(|r| r.members.as_slice()).unwrap_or(&[]);
    let body_height = (area.height.saturating_sub(3) as usize).max(1);
    let start = (app.selected_member / body_height) * body_height;
    let end = (start + body_height).min(members.len());

    let rows = members
        .get(start..end)
        .unwrap_or(&[])
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let style = if app.focus == Pane::Members && start + i == app.selected_member {
                Style::default()
                    .fg(app.theme.highlight_fg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(app.theme.text)
            };
            Row::new(vec![
                Cell::from(m.user_id.clone()),
                Cell::from(m.user_name.clone().unwrap_or_else(|| "-".to_string())),
            ])
            .style(style)
        });

    let widths = [Constraint::Length(14), Constraint::Percentage(100)];
    let header = Row::new(vec!["USER ID", "NAME"])
        .style(Style::default().fg(app.theme.title).add_modifier(Modifier::BOLD));
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(format!("Users ({})", members.len()))
                .borders(Borders::ALL)
                .border_style(pane_border(app, Pane::Members)),
        )
        .column_spacing(1);
    f.render_widget(table, area);
}
