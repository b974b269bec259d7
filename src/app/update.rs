//! Key handling and the async event loop.
//!
//! [`handle_key`] is synchronous: it mutates local state and returns a
//! [`Command`] when backend work is needed. [`execute`] performs that work.
//! The loop runs one command at a time, so nothing else mutates the model
//! while a save is in flight.
//!
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::Terminal;
use ratatui::backend::Backend;

use crate::api::RoleBackend;
use crate::app::deletion::{self, DeletionOutcome};
use crate::app::keymap::KeyAction;
use crate::app::membership::{self, ADD_FAILED, REMOVE_FAILED};
use crate::app::{
    AppState, Command, ConfirmAction, InputMode, MemberField, ModalState, Pane, reload, sync,
};
use crate::error::ValidationError;
use crate::model::cell::BeginEdit;
use crate::model::session;
use crate::search::{apply_filters_and_search, cycle_group_filter};
use crate::ui;

const HINT_TTL: Duration = Duration::from_secs(3);

/// Route a key press according to the current input mode.
pub fn handle_key(app: &mut AppState, key: KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return None;
    }
    match app.input_mode {
        InputMode::Normal => handle_normal(app, key),
        InputMode::Search => {
            handle_search(app, key);
            None
        }
        InputMode::Editing => {
            handle_editing(app, key);
            None
        }
        InputMode::Modal => handle_modal(app, key),
    }
}

fn require_edit_mode(app: &mut AppState) -> bool {
    if app.session.controls_visible() {
        return true;
    }
    let hint = app
        .keymap
        .key_for(KeyAction::ToggleEditMode)
        .map(|k| format!("Edit mode is off (press {k})"))
        .unwrap_or_else(|| "Edit mode is off".to_string());
    app.set_flash(hint, HINT_TTL);
    false
}

fn report_rejections(app: &mut AppState, rejected: &[ValidationError]) {
    if rejected.is_empty() {
        return;
    }
    let mut msgs: Vec<String> = rejected.iter().map(ToString::to_string).collect();
    msgs.dedup();
    app.show_info(msgs.join("\n"));
}

fn handle_normal(app: &mut AppState, key: KeyEvent) -> Option<Command> {
    let action = app.keymap.resolve(&key)?;
    match action {
        KeyAction::Quit => app.should_quit = true,
        KeyAction::OpenHelp => {
            app.modal = Some(ModalState::Help { offset: 0 });
            app.input_mode = InputMode::Modal;
        }
        KeyAction::StartSearch => app.input_mode = InputMode::Search,
        KeyAction::ToggleEditMode => {
            let outcome = session::toggle(&mut app.session, &mut app.editor, &mut app.model);
            app.editing = None;
            let msg = if outcome.now_on { "Edit mode on" } else { "Edit mode off" };
            app.set_flash(msg, HINT_TTL);
            let rejected: Vec<ValidationError> = outcome.rejected.into_iter().map(|(_, e)| e).collect();
            report_rejections(app, &rejected);
        }
        KeyAction::Save => {
            if app.saving || !require_edit_mode(app) {
                return None;
            }
            app.saving = true;
            return Some(Command::Save);
        }
        KeyAction::AddRow => {
            if !require_edit_mode(app) {
                return None;
            }
            let id = app.model.add_staged_row().id.clone();
            apply_filters_and_search(app);
            if let Some(idx) = app.visible.iter().position(|v| *v == id) {
                app.selected_row = idx;
            }
            app.selected_field = crate::model::Field::Identifier;
            app.focus = Pane::Roles;
        }
        KeyAction::DeleteRow | KeyAction::EditCell if app.focus == Pane::Members => {
            open_remove_member(app);
        }
        KeyAction::DeleteRow => {
            if !require_edit_mode(app) {
                return None;
            }
            let pending = app
                .selected_row_id()
                .and_then(|id| deletion::request_deletion(&app.model, id))?;
            app.modal = Some(ModalState::Confirm {
                prompt: pending.prompt(),
                action: ConfirmAction::DeleteRow(pending),
                selected: 1,
            });
            app.input_mode = InputMode::Modal;
        }
        KeyAction::EditCell => {
            if !require_edit_mode(app) {
                return None;
            }
            let cell = app.selected_cell()?;
            match app.editor.begin_edit(&app.session, &app.model, cell.clone()) {
                BeginEdit::Opened | BeginEdit::AlreadyOpen => {
                    app.editing = Some(cell);
                    app.input_mode = InputMode::Editing;
                }
                BeginEdit::EditModeOff | BeginEdit::NoSuchRow => {}
            }
        }
        KeyAction::MoveUp => match app.focus {
            Pane::Roles => {
                if app.selected_row > 0 {
                    app.selected_row -= 1;
                    app.selected_member = 0;
                }
            }
            Pane::Members => app.selected_member = app.selected_member.saturating_sub(1),
        },
        KeyAction::MoveDown => match app.focus {
            Pane::Roles => {
                if app.selected_row + 1 < app.visible.len() {
                    app.selected_row += 1;
                    app.selected_member = 0;
                }
            }
            Pane::Members => {
                let n = app.selected_row().map_or(0, |r| r.members.len());
                if app.selected_member + 1 < n {
                    app.selected_member += 1;
                }
            }
        },
        KeyAction::MoveLeft => app.selected_field = app.selected_field.prev(),
        KeyAction::MoveRight => app.selected_field = app.selected_field.next(),
        KeyAction::PageUp => {
            let rpp = app.rows_per_page.max(1);
            app.selected_row = app.selected_row.saturating_sub(rpp);
            app.selected_member = 0;
        }
        KeyAction::PageDown => {
            let rpp = app.rows_per_page.max(1);
            let last = app.visible.len().saturating_sub(1);
            app.selected_row = app.selected_row.saturating_add(rpp).min(last);
            app.selected_member = 0;
        }
        KeyAction::ToggleMembersFocus => {
            app.focus = match app.focus {
                Pane::Roles => Pane::Members,
                Pane::Members => Pane::Roles,
            };
        }
        KeyAction::AddMember => {
            let row = app.selected_row()?;
            let Some(role_id) = row.id.persisted().map(str::to_string) else {
                app.set_flash("Save the new role before adding users", HINT_TTL);
                return None;
            };
            app.modal = Some(ModalState::AddMember {
                role_id,
                user_id: String::new(),
                user_name: String::new(),
                field: MemberField::UserId,
                error: None,
            });
            app.input_mode = InputMode::Modal;
        }
        KeyAction::CycleGroupFilter => cycle_group_filter(app),
        KeyAction::ToggleOnlyWithUsers => {
            app.view.only_with_users = !app.view.only_with_users;
            apply_filters_and_search(app);
        }
        KeyAction::Refresh => return Some(Command::Reload),
        KeyAction::RegeneratePassPhrase | KeyAction::SendPassPhrase => {
            let row = app.selected_row()?;
            let Some(role_id) = row.id.persisted().map(str::to_string) else {
                app.set_flash("Save the new role first", HINT_TTL);
                return None;
            };
            let (prompt, action) = if action == KeyAction::RegeneratePassPhrase {
                (
                    format!(
                        "Regenerate password for {role_id}? All users will be unbound and notified."
                    ),
                    ConfirmAction::RegeneratePassPhrase(role_id),
                )
            } else {
                (
                    format!("Send the password of {role_id} to all its users?"),
                    ConfirmAction::SendPassPhrase(role_id),
                )
            };
            app.modal = Some(ModalState::Confirm {
                prompt,
                action,
                selected: 1,
            });
            app.input_mode = InputMode::Modal;
        }
        KeyAction::Ignore => {}
    }
    None
}

fn open_remove_member(app: &mut AppState) {
    let Some(row) = app.selected_row() else {
        return;
    };
    let (Some(role_id), Some(member)) = (row.id.persisted(), row.members.get(app.selected_member))
    else {
        return;
    };
    let who = member
        .user_name
        .as_deref()
        .map(|n| format!("{n} ({})", member.user_id))
        .unwrap_or_else(|| member.user_id.clone());
    app.modal = Some(ModalState::Confirm {
        prompt: format!("Remove {who} from role {role_id}?"),
        action: ConfirmAction::RemoveMember {
            role_id: role_id.to_string(),
            user_id: member.user_id.clone(),
        },
        selected: 1,
    });
    app.input_mode = InputMode::Modal;
}

fn handle_search(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.view.query.clear();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => app.input_mode = InputMode::Normal,
        KeyCode::Backspace => {
            app.view.query.pop();
        }
        KeyCode::Char(c) => app.view.query.push(c),
        _ => return,
    }
    apply_filters_and_search(app);
}

/// Commit the focused editor (the blur of a cell). A rejection is shown in
/// an info modal; the model keeps the original value either way.
fn commit_focused(app: &mut AppState) -> bool {
    let Some(cell) = app.editing.take() else {
        return true;
    };
    app.input_mode = InputMode::Normal;
    match app.editor.commit(&mut app.model, &cell) {
        Some(Err(err)) => {
            app.show_info(err.to_string());
            false
        }
        _ => true,
    }
}

fn handle_editing(app: &mut AppState, key: KeyEvent) {
    let Some(cell) = app.editing.clone() else {
        app.input_mode = InputMode::Normal;
        return;
    };
    match key.code {
        KeyCode::Enter | KeyCode::Esc => {
            commit_focused(app);
        }
        KeyCode::Tab | KeyCode::BackTab => {
            if !commit_focused(app) {
                return;
            }
            app.selected_field = if key.code == KeyCode::Tab {
                app.selected_field.next()
            } else {
                app.selected_field.prev()
            };
            if app.selected_field != cell.field
                && let Some(next) = app.selected_cell()
                && app.editor.begin_edit(&app.session, &app.model, next.clone()) == BeginEdit::Opened
            {
                app.editing = Some(next);
                app.input_mode = InputMode::Editing;
            }
        }
        KeyCode::Backspace => {
            if let Some(p) = app.editor.pending_mut(&cell) {
                p.pop();
            }
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(p) = app.editor.pending_mut(&cell) {
                p.push(c);
            }
        }
        _ => {}
    }
}

fn handle_modal(app: &mut AppState, key: KeyEvent) -> Option<Command> {
    let Some(mut modal) = app.modal.take() else {
        app.input_mode = InputMode::Normal;
        return None;
    };
    let mut keep_open = true;
    let mut command = None;
    match &mut modal {
        ModalState::Info { .. } => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                keep_open = false;
            }
        }
        ModalState::Help { offset } => match key.code {
            KeyCode::Up | KeyCode::Char('k') => *offset = offset.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => *offset += 1,
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::Char('?') => {
                keep_open = false;
            }
            _ => {}
        },
        ModalState::Confirm {
            action, selected, ..
        } => match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::Char('h') | KeyCode::Char('l') => {
                *selected = 1 - (*selected).min(1);
            }
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                keep_open = false;
                command = Some(confirmed(action.clone()));
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => keep_open = false,
            KeyCode::Enter => {
                keep_open = false;
                if *selected == 0 {
                    command = Some(confirmed(action.clone()));
                }
            }
            _ => {}
        },
        ModalState::AddMember {
            role_id,
            user_id,
            user_name,
            field,
            error,
        } => match key.code {
            KeyCode::Esc => keep_open = false,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                *field = match *field {
                    MemberField::UserId => MemberField::UserName,
                    MemberField::UserName => MemberField::UserId,
                };
            }
            KeyCode::Backspace => {
                match *field {
                    MemberField::UserId => user_id.pop(),
                    MemberField::UserName => user_name.pop(),
                };
            }
            KeyCode::Char(c) => match *field {
                MemberField::UserId => user_id.push(c),
                MemberField::UserName => user_name.push(c),
            },
            KeyCode::Enter => {
                if membership::is_valid_user_id(user_id.trim()) {
                    *error = None;
                    command = Some(Command::AddMember {
                        role_id: role_id.clone(),
                        user_id: user_id.trim().to_string(),
                        user_name: user_name.clone(),
                    });
                } else {
                    *error = Some(ValidationError::InvalidUserId.to_string());
                }
            }
            _ => {}
        },
    }
    if keep_open {
        app.modal = Some(modal);
    } else {
        app.close_modal();
    }
    command
}

fn confirmed(action: ConfirmAction) -> Command {
    match action {
        ConfirmAction::DeleteRow(pending) => Command::Delete(pending),
        ConfirmAction::RemoveMember { role_id, user_id } => Command::RemoveMember { role_id, user_id },
        ConfirmAction::RegeneratePassPhrase(id) => Command::RegeneratePassPhrase(id),
        ConfirmAction::SendPassPhrase(id) => Command::SendPassPhrase(id),
    }
}

async fn reload_or_report(app: &mut AppState, backend: &dyn RoleBackend) {
    if let Err(err) = reload::reload(app, backend).await {
        app.show_info(format!("Failed to load roles: {err}"));
    }
}

/// Run a command against the backend and fold the result into `app`.
pub async fn execute(app: &mut AppState, backend: &dyn RoleBackend, cmd: Command) {
    match cmd {
        Command::Save => {
            app.saving = true;
            app.editing = None;
            if app.input_mode == InputMode::Editing {
                app.input_mode = InputMode::Normal;
            }
            let rejected: Vec<ValidationError> = app
                .editor
                .commit_all(&mut app.model)
                .into_iter()
                .map(|(_, e)| e)
                .collect();
            let report = sync::save(backend, &app.model).await;
            let mut lines: Vec<String> = rejected.iter().map(ToString::to_string).collect();
            lines.extend(
                [&report.updates, &report.creates]
                    .into_iter()
                    .filter_map(|p| p.failure_message()),
            );
            if !lines.is_empty() {
                app.show_info(lines.join("\n"));
            }
            if report.should_reload() {
                let ttl = app.config.success_flash;
                app.set_flash(sync::SAVED_MESSAGE, ttl);
                app.pending_reload = Some(Instant::now() + ttl);
            } else {
                app.saving = false;
            }
        }
        Command::Delete(pending) => {
            match deletion::confirm_deletion(backend, &mut app.model, &mut app.editor, &pending).await {
                DeletionOutcome::RemovedLocally | DeletionOutcome::NotFound => {
                    if app.editing.as_ref().is_some_and(|c| c.row == pending.row) {
                        app.editing = None;
                    }
                    apply_filters_and_search(app);
                }
                DeletionOutcome::DeletedOnServer => reload_or_report(app, backend).await,
                DeletionOutcome::Failed(err) => {
                    app.show_info(format!("Failed to delete role: {err}"));
                }
            }
        }
        Command::AddMember {
            role_id,
            user_id,
            user_name,
        } => {
            let name = Some(user_name.as_str());
            match membership::add_membership(backend, &role_id, &user_id, name).await {
                Ok(()) => {
                    if matches!(app.modal, Some(ModalState::AddMember { .. })) {
                        app.close_modal();
                    }
                    reload_or_report(app, backend).await;
                }
                Err(err) => {
                    let msg = err.user_message(ADD_FAILED);
                    match &mut app.modal {
                        Some(ModalState::AddMember { error, .. }) => *error = Some(msg),
                        _ => app.show_info(msg),
                    }
                }
            }
        }
        Command::RemoveMember { role_id, user_id } => {
            match membership::remove_membership(backend, &role_id, &user_id).await {
                Ok(()) => reload_or_report(app, backend).await,
                Err(err) => app.show_info(err.user_message(REMOVE_FAILED)),
            }
        }
        Command::RegeneratePassPhrase(role_id) => {
            match membership::regenerate_pass_phrase(backend, &role_id).await {
                Ok(()) => {
                    reload_or_report(app, backend).await;
                    app.set_flash("Password regenerated, users unbound", HINT_TTL);
                }
                Err(err) => app.show_info(format!("Failed to regenerate password: {err}")),
            }
        }
        Command::SendPassPhrase(role_id) => {
            match membership::send_pass_phrase(backend, &role_id).await {
                Ok(()) => app.set_flash("Password sent", HINT_TTL),
                Err(err) => app.show_info(format!("Failed to send password: {err}")),
            }
        }
        Command::Reload => reload_or_report(app, backend).await,
    }
}

/// Drive the TUI until quit: terminal events and a 100 ms tick for the
/// status flash and the post-save reload.
pub async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut AppState,
    backend: Arc<dyn RoleBackend>,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(100));

    terminal.draw(|f| ui::render(f, app))?;
    execute(app, backend.as_ref(), Command::Reload).await;

    while !app.should_quit {
        terminal.draw(|f| ui::render(f, app))?;
        tokio::select! {
            maybe = events.next() => match maybe {
                Some(Ok(Event::Key(key))) => {
                    if let Some(cmd) = handle_key(app, key) {
                        // Show "Saving..." and similar before blocking on the backend.
                        terminal.draw(|f| ui::render(f, app))?;
                        execute(app, backend.as_ref(), cmd).await;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err.into()),
                None => break,
            },
            _ = tick.tick() => {
                let now = Instant::now();
                app.expire_flash(now);
                if app.reload_due(now) {
                    execute(app, backend.as_ref(), Command::Reload).await;
                }
            }
        }
    }
    Ok(())
}
