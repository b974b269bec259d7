//! Cell editor: opens a single cell for editing and commits it back into
//! the [`RowModel`] after applying the per-field rules.
//!
//! Edits are purely local; nothing here touches the network.
//!
use std::collections::BTreeMap;

use super::session::EditSession;
use super::{CellValue, Field, RowId, RowModel};
use crate::error::ValidationError;

/// Address of one cell.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    pub row: RowId,
    pub field: Field,
}

impl CellKey {
    pub fn new(row: RowId, field: Field) -> Self {
        Self { row, field }
    }
}

/// Transient state of a cell that is currently being edited.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellEditState {
    pub field: Field,
    pub original: CellValue,
    pub pending: String,
}

/// Result of [`CellEditor::begin_edit`].
#[derive(Debug, PartialEq, Eq)]
pub enum BeginEdit {
    Opened,
    /// The cell already has a live editor; nothing changed.
    AlreadyOpen,
    EditModeOff,
    NoSuchRow,
}

/// `true` for a non-empty string of ASCII letters and digits.
pub fn is_valid_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Client-side rule for one field.
///
/// An empty identifier is accepted here (it is stored as unset); the
/// backend decides whether a row without one is acceptable.
pub fn validate(field: Field, raw: &str) -> Result<(), ValidationError> {
    match field {
        Field::Identifier if !raw.is_empty() && !is_valid_identifier(raw) => {
            Err(ValidationError::InvalidIdentifier)
        }
        Field::FullName if CellValue::from_input(raw).is_unset() => {
            Err(ValidationError::EmptyFullName)
        }
        _ => Ok(()),
    }
}

/// Validate `raw` and store it for `row`/`field`.
///
/// On rejection `original` is written back so the model and the display
/// show the value the edit started from.
pub fn commit_edit(
    model: &mut RowModel,
    row: &RowId,
    field: Field,
    raw: &str,
    original: &CellValue,
) -> Result<CellValue, ValidationError> {
    if let Err(err) = validate(field, raw) {
        model.set_value(row, field, original.clone());
        tracing::debug!(row = %row, ?field, %err, "cell edit rejected");
        return Err(err);
    }
    let value = CellValue::from_input(raw);
    model.set_value(row, field, value.clone());
    tracing::debug!(row = %row, ?field, "cell edit committed");
    Ok(value)
}

/// Every live [`CellEditState`], keyed by cell.
#[derive(Debug, Default)]
pub struct CellEditor {
    open: BTreeMap<CellKey, CellEditState>,
}

impl CellEditor {
    /// Open `key` for editing, pre-filled with its current value.
    pub fn begin_edit(&mut self, session: &EditSession, model: &RowModel, key: CellKey) -> BeginEdit {
        if !session.is_on() {
            return BeginEdit::EditModeOff;
        }
        if self.open.contains_key(&key) {
            return BeginEdit::AlreadyOpen;
        }
        let Some(row) = model.get(&key.row) else {
            return BeginEdit::NoSuchRow;
        };
        let original = row.value(key.field).clone();
        let state = CellEditState {
            field: key.field,
            pending: original.as_input().to_string(),
            original,
        };
        self.open.insert(key, state);
        BeginEdit::Opened
    }

    pub fn get(&self, key: &CellKey) -> Option<&CellEditState> {
        self.open.get(key)
    }

    pub fn pending_mut(&mut self, key: &CellKey) -> Option<&mut String> {
        self.open.get_mut(key).map(|s| &mut s.pending)
    }

    pub fn is_open(&self, key: &CellKey) -> bool {
        self.open.contains_key(key)
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Commit and close one editor. `None` if the cell was not open.
    pub fn commit(
        &mut self,
        model: &mut RowModel,
        key: &CellKey,
    ) -> Option<Result<CellValue, ValidationError>> {
        let state = self.open.remove(key)?;
        Some(commit_edit(model, &key.row, state.field, &state.pending, &state.original))
    }

    /// Commit every open editor with its pending value. Returns the
    /// rejected cells; no editor remains open afterwards.
    pub fn commit_all(&mut self, model: &mut RowModel) -> Vec<(CellKey, ValidationError)> {
        let open = std::mem::take(&mut self.open);
        let mut rejected = Vec::new();
        for (key, state) in open {
            if let Err(err) = commit_edit(model, &key.row, state.field, &state.pending, &state.original) {
                rejected.push((key, err));
            }
        }
        rejected
    }

    /// Drop editors of a row that left the model.
    pub fn discard_row(&mut self, row: &RowId) {
        self.open.retain(|k, _| &k.row != row);
    }

    /// Drop every editor without committing (model replaced wholesale).
    pub fn clear(&mut self) {
        self.open.clear();
    }
}
