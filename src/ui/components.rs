//! Shared UI components (status bar, modal helpers).
//!
use std::collections::{BTreeMap, BTreeSet};

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::app::keymap::{KeyAction, Keymap, describe_action};
use crate::app::{AppState, ConfirmAction, InputMode, MemberField, ModalState};

/// Bottom status bar: mode, filters, then the flash or the key hints.
pub fn render_status_bar(f: &mut Frame, area: Rect, app: &AppState) {
    let mode = match app.input_mode {
        InputMode::Normal => "NORMAL",
        InputMode::Search => "SEARCH",
        InputMode::Editing => "EDITING",
        InputMode::Modal => "MODAL",
    };
    let mut chips = Vec::new();
    if let Some(g) = &app.view.group {
        chips.push(format!("group={g}"));
    }
    if app.view.only_with_users {
        chips.push("with_users".to_string());
    }
    let chips_str = if chips.is_empty() {
        String::new()
    } else {
        format!("  filters:[{}]", chips.join(","))
    };

    let hint = |action: KeyAction, label: &str| {
        app.keymap
            .key_for(action)
            .map(|k| format!("{k}: {label}"))
    };
    let tail = if app.saving && app.pending_reload.is_none() {
        "Saving...".to_string()
    } else if let Some(flash) = &app.flash {
        flash.message.clone()
    } else if app.input_mode == InputMode::Editing {
        "Enter/Esc: commit  Tab: next field".to_string()
    } else if app.session.controls_visible() {
        [
            hint(KeyAction::Save, "save"),
            hint(KeyAction::AddRow, "add row"),
            hint(KeyAction::DeleteRow, "delete row"),
            hint(KeyAction::ToggleEditMode, "leave edit mode"),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("  ")
    } else {
        [
            hint(KeyAction::ToggleEditMode, "edit mode"),
            hint(KeyAction::OpenHelp, "help"),
            hint(KeyAction::Quit, "quit"),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("  ")
    };

    let tail_style = match &app.flash {
        Some(f) if f.message == crate::app::sync::SAVED_MESSAGE => Style::default().fg(app.theme.success),
        _ => Style::default(),
    };
    let line = Line::from(vec![
        Span::raw(format!("mode: {mode}{chips_str}  ")),
        Span::styled(tail, tail_style),
    ]);
    let p = Paragraph::new(line).style(
        Style::default()
            .fg(app.theme.status_fg)
            .bg(app.theme.status_bg),
    );
    f.render_widget(p, area);
}

/// Compute a rectangle centered within `area` with a maximum size.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

/// Render a generic informational modal dialog.
pub fn render_info_modal(f: &mut Frame, area: Rect, app: &AppState, state: &ModalState) {
    if let ModalState::Info { message } = state {
        let max_w = area.width.saturating_sub(6).max(30);
        let width = 56u16.min(max_w);
        let inner_w = width.saturating_sub(4).max(10) as usize;
        let wrapped: usize = message
            .lines()
            .map(|l| l.chars().count().div_ceil(inner_w).max(1))
            .sum();
        let max_h = area.height.saturating_sub(6).max(5);
        let height = (wrapped as u16 + 4).min(max_h).max(5);
        let rect = centered_rect(width, height, area);
        let mut text = message.clone();
        text.push_str("\n\n[Enter] OK");
        let p = Paragraph::new(text)
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title("Info")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(app.theme.border)),
            );
        f.render_widget(Clear, rect);
        f.render_widget(p, rect);
    }
}

pub fn render_confirm_modal(f: &mut Frame, area: Rect, app: &AppState, state: &ModalState) {
    if let ModalState::Confirm {
        prompt,
        action,
        selected,
    } = state
    {
        let title = match action {
            ConfirmAction::DeleteRow(_) => "Delete role",
            ConfirmAction::RemoveMember { .. } => "Remove user",
            ConfirmAction::RegeneratePassPhrase(_) => "Regenerate password",
            ConfirmAction::SendPassPhrase(_) => "Send password",
        };
        let width = 60u16.min(area.width.saturating_sub(4)).max(30);
        let rect = centered_rect(width, 7, area);
        let button = |idx: usize, label: &'static str| {
            if idx == *selected {
                Span::styled(
                    format!("[ {label} ]"),
                    Style::default()
                        .fg(app.theme.highlight_fg)
                        .add_modifier(Modifier::BOLD | Modifier::REVERSED),
                )
            } else {
                Span::raw(format!("  {label}  "))
            }
        };
        let lines = vec![
            Line::raw(prompt.clone()),
            Line::raw(""),
            Line::from(vec![button(0, "Yes"), Span::raw("   "), button(1, "No")]),
        ];
        let p = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border)),
        );
        f.render_widget(Clear, rect);
        f.render_widget(p, rect);
    }
}

pub fn render_add_member_modal(f: &mut Frame, area: Rect, app: &AppState, state: &ModalState) {
    if let ModalState::AddMember {
        role_id,
        user_id,
        user_name,
        field,
        error,
    } = state
    {
        let width = 54u16.min(area.width.saturating_sub(4)).max(40);
        let height = if error.as_ref().is_some_and(|e| !e.is_empty()) {
            9
        } else {
            7
        };
        let rect = centered_rect(width, height, area);
        let input = |label: &str, value: &str, active: bool| {
            let marker = if active { "▶" } else { " " };
            let cursor = if active { "▏" } else { "" };
            Line::raw(format!("{marker} {label}: {value}{cursor}"))
        };
        let mut lines = vec![
            input("User ID", user_id, *field == MemberField::UserId),
            input("Name (optional)", user_name, *field == MemberField::UserName),
            Line::raw(""),
            Line::raw("Enter: add  Tab: next field  Esc: cancel"),
        ];
        if let Some(err) = error
            && !err.is_empty()
        {
            lines.push(Line::raw(""));
            lines.push(Line::from(Span::styled(
                err.clone(),
                Style::default().fg(app.theme.error),
            )));
        }
        let p = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
            Block::default()
                .title(format!("Add user to {role_id}"))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border)),
        );
        f.render_widget(Clear, rect);
        f.render_widget(p, rect);
    }
}

fn help_lines(keymap: &Keymap) -> Vec<Line<'static>> {
    let mut by_action: BTreeMap<&'static str, BTreeSet<String>> = BTreeMap::new();
    for ((mods, code), action) in keymap.all_bindings() {
        if action == KeyAction::Ignore {
            continue;
        }
        by_action
            .entry(describe_action(action))
            .or_default()
            .insert(Keymap::format_key(mods, code));
    }
    let col1_w = by_action.keys().map(|k| k.len()).max().unwrap_or(0);

    let mut lines = vec![
        Line::from(Span::styled(
            "Keys",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::raw(""),
    ];
    for (label, keys) in by_action {
        let joined = keys.into_iter().collect::<Vec<_>>().join(", ");
        lines.push(Line::from(vec![
            Span::raw(format!("  {label:>col1_w$}  ")),
            Span::styled(joined, Style::default().add_modifier(Modifier::ITALIC)),
        ]));
    }
    lines.push(Line::raw(""));
    lines.push(Line::from(Span::styled(
        "Editing",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    for text in [
        "Cells are editable only in edit mode; changes stay local until saved.",
        "Enter or Esc commits a cell, Tab commits and moves to the next one.",
        "An empty optional cell is shown as '-' and sent as empty.",
        "New rows are marked '+' and created on save.",
    ] {
        lines.push(Line::raw(format!("  {text}")));
    }
    lines.push(Line::raw(""));
    lines.push(Line::raw("Close help: Esc / Enter"));
    lines
}

/// Number of lines in the help modal, for scroll clamping.
pub fn help_line_count(app: &AppState) -> usize {
    help_lines(&app.keymap).len()
}

/// Render the help modal with the current key bindings.
pub fn render_help_modal(f: &mut Frame, area: Rect, app: &AppState, scroll: u16) {
    let width = 80u16.min(area.width.saturating_sub(4)).max(60);
    let height = 24u16.min(area.height.saturating_sub(4)).max(14);
    let rect = centered_rect(width, height, area);
    let p = Paragraph::new(help_lines(&app.keymap))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0))
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border)),
        );
    f.render_widget(Clear, rect);
    f.render_widget(p, rect);
}
