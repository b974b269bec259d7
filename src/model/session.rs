//! Edit-mode controller.
//!
//! [`EditSession`] is passed explicitly to everything that depends on edit
//! mode instead of living in ambient state.
//!
use super::RowModel;
use super::cell::{CellEditor, CellKey};
use crate::error::ValidationError;

/// Page-lifetime edit state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EditSession {
    edit_mode_on: bool,
}

impl EditSession {
    pub fn is_on(&self) -> bool {
        self.edit_mode_on
    }

    /// Whether add-row, delete-row and save are offered.
    pub fn controls_visible(&self) -> bool {
        self.edit_mode_on
    }

    pub(crate) fn set_on(&mut self, on: bool) {
        self.edit_mode_on = on;
    }
}

/// Result of [`toggle`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub now_on: bool,
    /// Editors committed because edit mode was switched off.
    pub flushed: usize,
    pub rejected: Vec<(CellKey, ValidationError)>,
}

/// Flip edit mode. Switching off commits every open editor before the
/// structural controls disappear, so no in-progress edit is lost.
pub fn toggle(session: &mut EditSession, editor: &mut CellEditor, model: &mut RowModel) -> ToggleOutcome {
    if session.is_on() {
        switch_off(session, editor, model)
    } else {
        session.set_on(true);
        tracing::info!("edit mode on");
        ToggleOutcome {
            now_on: true,
            ..Default::default()
        }
    }
}

/// Switch edit mode off (no-op when already off).
pub fn switch_off(session: &mut EditSession, editor: &mut CellEditor, model: &mut RowModel) -> ToggleOutcome {
    if !session.is_on() {
        return ToggleOutcome::default();
    }
    let flushed = editor.open_count();
    let rejected = editor.commit_all(model);
    session.set_on(false);
    tracing::info!(flushed, rejected = rejected.len(), "edit mode off");
    ToggleOutcome {
        now_on: false,
        flushed,
        rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cell::BeginEdit;
    use crate::model::{CellValue, Field};

    #[test]
    fn toggle_flips_and_gates_controls() {
        let mut s = EditSession::default();
        let mut ed = CellEditor::default();
        let mut m = RowModel::default();
        assert!(!s.controls_visible());
        assert!(toggle(&mut s, &mut ed, &mut m).now_on);
        assert!(s.controls_visible());
        assert!(!toggle(&mut s, &mut ed, &mut m).now_on);
        assert!(!s.controls_visible());
    }

    #[test]
    fn switching_off_flushes_every_open_editor() {
        let mut s = EditSession::default();
        let mut ed = CellEditor::default();
        let mut m = RowModel::default();
        toggle(&mut s, &mut ed, &mut m);

        let rows: Vec<_> = (0..3).map(|_| m.add_staged_row().id.clone()).collect();
        for (i, row) in rows.iter().enumerate() {
            let key = CellKey::new(row.clone(), Field::Group);
            assert_eq!(ed.begin_edit(&s, &m, key.clone()), BeginEdit::Opened);
            *ed.pending_mut(&key).unwrap() = format!("g{i}");
        }

        let out = toggle(&mut s, &mut ed, &mut m);
        assert_eq!(out.flushed, 3);
        assert!(out.rejected.is_empty());
        assert_eq!(ed.open_count(), 0);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(m.get(row).unwrap().value(Field::Group), &CellValue::Set(format!("g{i}")));
        }
    }

    #[test]
    fn switch_off_when_off_is_noop() {
        let mut s = EditSession::default();
        let mut ed = CellEditor::default();
        let mut m = RowModel::default();
        assert_eq!(switch_off(&mut s, &mut ed, &mut m), ToggleOutcome::default());
    }
}
