//! Application state types and entry glue.
//!
//! Defines enums and structs that model the TUI state, as well as helpers
//! to construct defaults and to run the application loop (re-exported as `run`).
//!
pub mod config;
pub mod deletion;
pub mod keymap;
pub mod membership;
pub mod reload;
pub mod sync;
pub mod update;

use ratatui::style::Color;
use std::time::{Duration, Instant};

use crate::model::cell::{CellEditor, CellKey};
use crate::model::session::EditSession;
use crate::model::{Field, Row, RowId, RowModel};

pub use config::{
    ClientConfig, KEYBINDS_FILE, ReloadPolicy, config_dir, config_file_read_path,
    config_file_write_path,
};
use deletion::PendingDeletion;
use keymap::Keymap;

/// Which pane receives navigation keys.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pane {
    Roles,
    Members,
}

/// Current input mode for key handling.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    /// Typing into the focused cell's editor.
    Editing,
    Modal,
}

/// Color palette. Fixed; there is no theme file.
#[derive(Clone, Copy, Debug)]
pub struct Theme {
    pub text: Color,
    pub muted: Color,
    pub title: Color,
    pub border: Color,
    pub header_bg: Color,
    pub header_fg: Color,
    pub status_bg: Color,
    pub status_fg: Color,
    pub highlight_fg: Color,
    pub highlight_bg: Color,
    pub staged: Color,
    pub error: Color,
    pub success: Color,
}

impl Theme {
    /// Catppuccin Mocha.
    pub fn mocha() -> Self {
        // Palette reference: https://github.com/catppuccin/catppuccin
        Self {
            text: Color::Rgb(0xcd, 0xd6, 0xf4),         // text
            muted: Color::Rgb(0x7f, 0x84, 0x9c),        // overlay1
            title: Color::Rgb(0xcb, 0xa6, 0xf7),        // mauve
            border: Color::Rgb(0x58, 0x5b, 0x70),       // surface2
            header_bg: Color::Rgb(0x31, 0x32, 0x44),    // surface0
            header_fg: Color::Rgb(0xb4, 0xbe, 0xfe),    // lavender
            status_bg: Color::Rgb(0x45, 0x47, 0x5a),    // surface1
            status_fg: Color::Rgb(0xcd, 0xd6, 0xf4),    // text
            highlight_fg: Color::Rgb(0xf9, 0xe2, 0xaf), // yellow
            highlight_bg: Color::Rgb(0x45, 0x47, 0x5a), // surface1
            staged: Color::Rgb(0xa6, 0xe3, 0xa1),       // green
            error: Color::Rgb(0xf3, 0x8b, 0xa8),        // red
            success: Color::Rgb(0x94, 0xe2, 0xd5),      // teal
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::mocha()
    }
}

/// Client-side narrowing of the visible rows. Staged rows are always shown.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewFilter {
    pub query: String,
    pub group: Option<String>,
    pub only_with_users: bool,
}

impl ViewFilter {
    pub fn is_active(&self) -> bool {
        !self.query.is_empty() || self.group.is_some() || self.only_with_users
    }
}

/// Fields of the add-member dialog.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MemberField {
    UserId,
    UserName,
}

/// Operations that need a yes/no from the operator first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmAction {
    DeleteRow(PendingDeletion),
    RemoveMember { role_id: String, user_id: String },
    RegeneratePassPhrase(String),
    SendPassPhrase(String),
}

/// Modal dialog states.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModalState {
    Info {
        message: String,
    },
    Confirm {
        prompt: String,
        action: ConfirmAction,
        /// 0 = Yes, 1 = No.
        selected: usize,
    },
    AddMember {
        role_id: String,
        user_id: String,
        user_name: String,
        field: MemberField,
        error: Option<String>,
    },
    Help {
        offset: usize,
    },
}

/// Backend work requested by a key press, run by the event loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Save,
    Delete(PendingDeletion),
    AddMember {
        role_id: String,
        user_id: String,
        user_name: String,
    },
    RemoveMember {
        role_id: String,
        user_id: String,
    },
    RegeneratePassPhrase(String),
    SendPassPhrase(String),
    Reload,
}

/// Transient status line message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Flash {
    pub message: String,
    pub until: Instant,
}

pub struct AppState {
    pub config: ClientConfig,
    pub model: RowModel,
    pub session: EditSession,
    pub editor: CellEditor,
    /// Cell whose editor is shown in the table and receives typing.
    pub editing: Option<CellKey>,
    /// Rows passing the view filter, in model order.
    pub visible: Vec<RowId>,
    pub selected_row: usize,
    pub selected_field: Field,
    pub selected_member: usize,
    pub focus: Pane,
    pub rows_per_page: usize,
    pub input_mode: InputMode,
    pub view: ViewFilter,
    pub theme: Theme,
    pub keymap: Keymap,
    pub modal: Option<ModalState>,
    pub flash: Option<Flash>,
    /// A save is in flight; the save key is disabled.
    pub saving: bool,
    /// Reload scheduled after a successful save, once the flash expires.
    pub pending_reload: Option<Instant>,
    /// At least one list fetch succeeded.
    pub loaded: bool,
    pub should_quit: bool,
}

impl AppState {
    /// Empty state; the role list is fetched by the event loop.
    pub fn new(config: ClientConfig, keymap: Keymap) -> Self {
        Self {
            config,
            model: RowModel::default(),
            session: EditSession::default(),
            editor: CellEditor::default(),
            editing: None,
            visible: Vec::new(),
            selected_row: 0,
            selected_field: Field::Identifier,
            selected_member: 0,
            focus: Pane::Roles,
            rows_per_page: 10,
            input_mode: InputMode::Normal,
            view: ViewFilter::default(),
            theme: Theme::mocha(),
            keymap,
            modal: None,
            flash: None,
            saving: false,
            pending_reload: None,
            loaded: false,
            should_quit: false,
        }
    }

    pub fn selected_row_id(&self) -> Option<&RowId> {
        self.visible.get(self.selected_row)
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.selected_row_id().and_then(|id| self.model.get(id))
    }

    /// The cell under the cursor in the roles table.
    pub fn selected_cell(&self) -> Option<CellKey> {
        self.selected_row_id()
            .map(|id| CellKey::new(id.clone(), self.selected_field))
    }

    /// Show `message` in an info modal.
    pub fn show_info(&mut self, message: impl Into<String>) {
        self.modal = Some(ModalState::Info {
            message: message.into(),
        });
        self.input_mode = InputMode::Modal;
    }

    pub fn close_modal(&mut self) {
        self.modal = None;
        self.input_mode = if self.editing.is_some() {
            InputMode::Editing
        } else {
            InputMode::Normal
        };
    }

    pub fn set_flash(&mut self, message: impl Into<String>, ttl: Duration) {
        self.flash = Some(Flash {
            message: message.into(),
            until: Instant::now() + ttl,
        });
    }

    /// Drop an expired flash; `true` if something changed.
    pub fn expire_flash(&mut self, now: Instant) -> bool {
        match &self.flash {
            Some(f) if f.until <= now => {
                self.flash = None;
                true
            }
            _ => false,
        }
    }

    /// Whether the scheduled post-save reload is due.
    pub fn reload_due(&self, now: Instant) -> bool {
        self.pending_reload.is_some_and(|at| at <= now)
    }
}

/// Re-export the application event loop entry function.
pub use update::run_app as run;
