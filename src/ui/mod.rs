//! Rendering of the roles screen and its modals.
pub mod components;
pub mod roles;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::{AppState, InputMode, ModalState};

pub fn render(f: &mut Frame, app: &mut AppState) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5), Constraint::Length(1)].as_ref())
        .split(f.area());
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)].as_ref())
        .split(root[1]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(5)].as_ref())
        .split(body[1]);

    render_header(f, root[0], app);
    roles::render_roles_table(f, body[0], app);
    roles::render_role_details(f, right[0], app);
    roles::render_role_members(f, right[1], app);
    components::render_status_bar(f, root[2], app);

    if app.modal.is_some() {
        render_modal(f, f.area(), app);
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &AppState) {
    let mode = if app.session.is_on() { "[EDIT]" } else { "[VIEW]" };
    let prompt = match app.input_mode {
        InputMode::Search => format!("  Search: {}▏", app.view.query),
        _ if !app.view.query.is_empty() => format!("  Search: {}", app.view.query),
        _ => String::new(),
    };
    let staged = app.model.staged_count();
    let staged = if staged > 0 {
        format!("  unsaved new:{staged}")
    } else {
        String::new()
    };
    let p = Paragraph::new(format!(
        "{}  {mode}  roles:{}/{}{staged}{prompt}",
        app.config.base_url,
        app.visible.len(),
        app.model.len(),
    ))
    .block(
        Block::default()
            .title("roles-manager")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border)),
    )
    .style(Style::default().fg(app.theme.header_fg).bg(app.theme.header_bg));
    f.render_widget(p, area);
}

fn render_modal(f: &mut Frame, area: Rect, app: &mut AppState) {
    if let Some(state) = app.modal.clone() {
        match &state {
            ModalState::Info { .. } => components::render_info_modal(f, area, app, &state),
            ModalState::Confirm { .. } => components::render_confirm_modal(f, area, app, &state),
            ModalState::AddMember { .. } => components::render_add_member_modal(f, area, app, &state),
            ModalState::Help { offset } => {
                let max = components::help_line_count(app).saturating_sub(1);
                let clamped = (*offset).min(max);
                if clamped != *offset {
                    app.modal = Some(ModalState::Help { offset: clamped });
                }
                components::render_help_modal(f, area, app, clamped as u16);
            }
        }
    }
}
