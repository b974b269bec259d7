//! Keybinding configuration: parse `keybinds.conf`, provide defaults, and map keys to actions.
//!
//! Custom bindings are layered over the defaults, so a file only needs the
//! lines it changes. Both `<Action> = <KeySpec>` and `<KeySpec> = <Action>`
//! are accepted.

use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Semantic keyboard actions that can be bound to key combinations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyAction {
    Quit,
    /// Display the help/keybindings reference.
    OpenHelp,
    /// Start typing a filter query.
    StartSearch,
    /// Switch edit mode on or off.
    ToggleEditMode,
    /// Submit every pending change to the backend.
    Save,
    /// Append a staged row.
    AddRow,
    /// Delete the selected row (asks for confirmation).
    DeleteRow,
    /// Open the focused cell for editing, or act on the selected member.
    EditCell,
    MoveUp,
    MoveDown,
    /// Previous field in the roles table.
    MoveLeft,
    /// Next field in the roles table.
    MoveRight,
    PageUp,
    PageDown,
    /// Toggle focus between the roles table and the members pane.
    ToggleMembersFocus,
    /// Open the add-member dialog for the selected role.
    AddMember,
    /// Cycle the group filter through the known groups.
    CycleGroupFilter,
    /// Only show roles that have at least one member.
    ToggleOnlyWithUsers,
    /// Re-fetch the role list.
    Refresh,
    RegeneratePassPhrase,
    SendPassPhrase,
    /// Ignore this key.
    Ignore,
}

const ALL_ACTIONS: [KeyAction; 22] = [
    KeyAction::Quit,
    KeyAction::OpenHelp,
    KeyAction::StartSearch,
    KeyAction::ToggleEditMode,
    KeyAction::Save,
    KeyAction::AddRow,
    KeyAction::DeleteRow,
    KeyAction::EditCell,
    KeyAction::MoveUp,
    KeyAction::MoveDown,
    KeyAction::MoveLeft,
    KeyAction::MoveRight,
    KeyAction::PageUp,
    KeyAction::PageDown,
    KeyAction::ToggleMembersFocus,
    KeyAction::AddMember,
    KeyAction::CycleGroupFilter,
    KeyAction::ToggleOnlyWithUsers,
    KeyAction::Refresh,
    KeyAction::RegeneratePassPhrase,
    KeyAction::SendPassPhrase,
    KeyAction::Ignore,
];

/// Maps `(KeyModifiers, KeyCode)` pairs to [`KeyAction`]s.
#[derive(Clone, Debug)]
pub struct Keymap {
    bindings: HashMap<(KeyModifiers, KeyCode), KeyAction>,
}

impl Keymap {
    /// Arrow keys plus hjkl for navigation, single letters for everything else.
    pub fn new_defaults() -> Self {
        use KeyCode::*;
        use KeyModifiers as M;
        let mut bindings = HashMap::new();
        bindings.insert((M::NONE, Char('q')), KeyAction::Quit);
        bindings.insert((M::NONE, Esc), KeyAction::Ignore);
        bindings.insert((M::NONE, Char('?')), KeyAction::OpenHelp);
        bindings.insert((M::NONE, Char('/')), KeyAction::StartSearch);
        bindings.insert((M::NONE, Char('e')), KeyAction::ToggleEditMode);
        bindings.insert((M::NONE, Char('s')), KeyAction::Save);
        bindings.insert((M::CONTROL, Char('s')), KeyAction::Save);
        bindings.insert((M::NONE, Char('n')), KeyAction::AddRow);
        bindings.insert((M::NONE, Delete), KeyAction::DeleteRow);
        bindings.insert((M::NONE, Char('d')), KeyAction::DeleteRow);
        bindings.insert((M::NONE, Enter), KeyAction::EditCell);
        bindings.insert((M::NONE, Tab), KeyAction::ToggleMembersFocus);
        bindings.insert((M::NONE, BackTab), KeyAction::ToggleMembersFocus);
        bindings.insert((M::NONE, Char('a')), KeyAction::AddMember);
        bindings.insert((M::NONE, Char('g')), KeyAction::CycleGroupFilter);
        bindings.insert((M::NONE, Char('u')), KeyAction::ToggleOnlyWithUsers);
        bindings.insert((M::NONE, Char('r')), KeyAction::Refresh);
        bindings.insert((M::NONE, Char('R')), KeyAction::RegeneratePassPhrase);
        bindings.insert((M::NONE, Char('p')), KeyAction::SendPassPhrase);
        // Navigation
        bindings.insert((M::NONE, Up), KeyAction::MoveUp);
        bindings.insert((M::NONE, Down), KeyAction::MoveDown);
        bindings.insert((M::NONE, Left), KeyAction::MoveLeft);
        bindings.insert((M::NONE, Right), KeyAction::MoveRight);
        bindings.insert((M::NONE, Char('k')), KeyAction::MoveUp);
        bindings.insert((M::NONE, Char('j')), KeyAction::MoveDown);
        bindings.insert((M::NONE, Char('h')), KeyAction::MoveLeft);
        bindings.insert((M::NONE, Char('l')), KeyAction::MoveRight);
        bindings.insert((M::NONE, PageUp), KeyAction::PageUp);
        bindings.insert((M::NONE, PageDown), KeyAction::PageDown);
        Self { bindings }
    }

    /// Load a keymap from `path`, or from the standard config locations, or
    /// write the defaults to `path` for later customization.
    pub fn load_or_init(path: &str) -> Self {
        let p = std::path::Path::new(path);
        if p.exists() {
            return Self::from_file(path).unwrap_or_default();
        }
        if let Some(existing) = crate::app::config_file_read_path(crate::app::KEYBINDS_FILE) {
            return Self::from_file(&existing.to_string_lossy()).unwrap_or_default();
        }
        let km = Self::default();
        if let Err(err) = km.write_file(path) {
            tracing::warn!(path, %err, "could not write default keybindings");
        }
        km
    }

    /// `Some(keymap)` if the file exists and is readable; `None` otherwise.
    pub fn from_file(path: &str) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        Some(Self::parse(&contents))
    }

    /// Defaults overridden by every valid line of `contents`.
    pub fn parse(contents: &str) -> Self {
        let mut map = Self::default();
        for raw in contents.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((lhs, rhs)) = split_binding(line) else {
                continue;
            };
            if let (Some(action), Some(key)) = (parse_action(lhs), parse_key(rhs)) {
                map.bindings.insert(key, action);
                continue;
            }
            if let (Some(key), Some(action)) = (parse_key(lhs), parse_action(rhs)) {
                map.bindings.insert(key, action);
            }
        }
        map
    }

    /// Write every binding, grouped by action, in `<Action> = <KeySpec>` form.
    pub fn write_file(&self, path: &str) -> std::io::Result<()> {
        use std::fmt::Write as _;
        let mut buf = String::new();
        buf.push_str("# roles-manager keybindings\n");
        buf.push_str("# Format: <Action> = <KeySpec>\n");
        buf.push_str("# KeySpec examples: q, Ctrl+s, Enter, Esc, Tab, BackTab, Up, Down, Left, Right, PageUp, PageDown, Delete, /, =\n");
        let names: Vec<&str> = ALL_ACTIONS.iter().map(|a| format_action(*a)).collect();
        let _ = writeln!(&mut buf, "# Actions: {}\n", names.join(", "));

        for action in ALL_ACTIONS {
            let mut keys: Vec<String> = self
                .bindings
                .iter()
                .filter(|(_, a)| **a == action)
                .map(|((m, c), _)| Self::format_key(*m, *c))
                .collect();
            keys.sort();
            for k in keys {
                let _ = writeln!(&mut buf, "{} = {}", format_action(action), k);
            }
        }
        std::fs::write(path, buf)
    }

    /// Resolve a key event to its action.
    ///
    /// Terminals disagree on whether uppercase letters carry SHIFT, so for
    /// character keys SHIFT is ignored and the character itself decides.
    pub fn resolve(&self, key: &KeyEvent) -> Option<KeyAction> {
        let mut mods = key.modifiers;
        if matches!(key.code, KeyCode::Char(_) | KeyCode::BackTab) {
            mods.remove(KeyModifiers::SHIFT);
        }
        self.bindings.get(&(mods, key.code)).copied()
    }

    /// Snapshot of all bindings as ((modifiers, code), action) pairs.
    pub fn all_bindings(&self) -> Vec<((KeyModifiers, KeyCode), KeyAction)> {
        self.bindings.iter().map(|(k, v)| (*k, *v)).collect()
    }

    /// First key (in display order) bound to `action`, for hints.
    pub fn key_for(&self, action: KeyAction) -> Option<String> {
        let mut keys: Vec<String> = self
            .bindings
            .iter()
            .filter(|(_, a)| **a == action)
            .map(|((m, c), _)| Self::format_key(*m, *c))
            .collect();
        keys.sort_by_key(|k| (k.len(), k.clone()));
        keys.into_iter().next()
    }

    /// Human-readable spec like "Ctrl+s" or "BackTab".
    pub fn format_key(mods: KeyModifiers, code: KeyCode) -> String {
        use KeyCode::*;
        let base = match code {
            Enter => "Enter".to_string(),
            Delete => "Delete".to_string(),
            Esc => "Esc".to_string(),
            Tab => "Tab".to_string(),
            BackTab => "BackTab".to_string(),
            Up => "Up".to_string(),
            Down => "Down".to_string(),
            Left => "Left".to_string(),
            Right => "Right".to_string(),
            PageUp => "PageUp".to_string(),
            PageDown => "PageDown".to_string(),
            Char(c) => c.to_string(),
            _ => format!("{:?}", code),
        };
        if mods.contains(KeyModifiers::CONTROL) {
            format!("Ctrl+{}", base)
        } else {
            base
        }
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new_defaults()
    }
}

/// Split on the first `=` that is not the whole key spec, so `Quit = =`
/// and `= = Quit` both work.
fn split_binding(line: &str) -> Option<(&str, &str)> {
    if let Some(rest) = line.strip_prefix('=') {
        let (_, rhs) = rest.split_once('=')?;
        return Some(("=", rhs.trim()));
    }
    let (lhs, rhs) = line.split_once('=')?;
    let (lhs, rhs) = (lhs.trim(), rhs.trim());
    if lhs.is_empty() || rhs.is_empty() {
        return None;
    }
    Some((lhs, rhs))
}

fn parse_key(spec: &str) -> Option<(KeyModifiers, KeyCode)> {
    use KeyCode::*;
    let s = spec.trim();
    let mut rest = s;
    let mut mods = KeyModifiers::NONE;
    if let Some(after) = s.strip_prefix("Ctrl+") {
        mods |= KeyModifiers::CONTROL;
        rest = after;
    }
    let code = match rest {
        "Enter" => Enter,
        "Delete" | "Del" => Delete,
        "Esc" | "Escape" => Esc,
        "Tab" => Tab,
        "BackTab" => BackTab,
        "Up" => Up,
        "Down" => Down,
        "Left" => Left,
        "Right" => Right,
        "PageUp" => PageUp,
        "PageDown" => PageDown,
        _ => {
            let mut chars = rest.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Char(c),
                _ => return None,
            }
        }
    };
    Some((mods, code))
}

fn parse_action(s: &str) -> Option<KeyAction> {
    let s = s.trim();
    ALL_ACTIONS.iter().copied().find(|a| format_action(*a) == s)
}

pub fn format_action(a: KeyAction) -> &'static str {
    match a {
        KeyAction::Quit => "Quit",
        KeyAction::OpenHelp => "OpenHelp",
        KeyAction::StartSearch => "StartSearch",
        KeyAction::ToggleEditMode => "ToggleEditMode",
        KeyAction::Save => "Save",
        KeyAction::AddRow => "AddRow",
        KeyAction::DeleteRow => "DeleteRow",
        KeyAction::EditCell => "EditCell",
        KeyAction::MoveUp => "MoveUp",
        KeyAction::MoveDown => "MoveDown",
        KeyAction::MoveLeft => "MoveLeft",
        KeyAction::MoveRight => "MoveRight",
        KeyAction::PageUp => "PageUp",
        KeyAction::PageDown => "PageDown",
        KeyAction::ToggleMembersFocus => "ToggleMembersFocus",
        KeyAction::AddMember => "AddMember",
        KeyAction::CycleGroupFilter => "CycleGroupFilter",
        KeyAction::ToggleOnlyWithUsers => "ToggleOnlyWithUsers",
        KeyAction::Refresh => "Refresh",
        KeyAction::RegeneratePassPhrase => "RegeneratePassPhrase",
        KeyAction::SendPassPhrase => "SendPassPhrase",
        KeyAction::Ignore => "Ignore",
    }
}

/// One-line description used by the help modal.
pub fn describe_action(a: KeyAction) -> &'static str {
    match a {
        KeyAction::Quit => "Quit",
        KeyAction::OpenHelp => "Show this help",
        KeyAction::StartSearch => "Filter roles",
        KeyAction::ToggleEditMode => "Toggle edit mode",
        KeyAction::Save => "Save all changes",
        KeyAction::AddRow => "Add a new role row",
        KeyAction::DeleteRow => "Delete selected role",
        KeyAction::EditCell => "Edit cell / act on member",
        KeyAction::MoveUp => "Move up",
        KeyAction::MoveDown => "Move down",
        KeyAction::MoveLeft => "Previous column",
        KeyAction::MoveRight => "Next column",
        KeyAction::PageUp => "Page up",
        KeyAction::PageDown => "Page down",
        KeyAction::ToggleMembersFocus => "Switch roles/members pane",
        KeyAction::AddMember => "Add user to role",
        KeyAction::CycleGroupFilter => "Cycle group filter",
        KeyAction::ToggleOnlyWithUsers => "Only roles with users",
        KeyAction::Refresh => "Reload from server",
        KeyAction::RegeneratePassPhrase => "Regenerate password",
        KeyAction::SendPassPhrase => "Send password to members",
        KeyAction::Ignore => "Ignored",
    }
}
