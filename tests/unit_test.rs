// Unit tests for roles-manager
// These tests exercise the public API of the model, keymap and config layers

#[cfg(test)]
mod cell_editor_tests {
    use roles_manager::ValidationError;
    use roles_manager::api::{CreateRoleRequest, RoleRecord};
    use roles_manager::model::cell::{BeginEdit, CellEditor, CellKey, commit_edit};
    use roles_manager::model::session::{self, EditSession};
    use roles_manager::model::{CellValue, Field, RowId, RowModel, UNSET_MARKER};

    fn model() -> RowModel {
        RowModel::from_records(vec![
            RoleRecord {
                identifier: "R1".into(),
                full_name: Some("Ops".into()),
                group: Some("IT".into()),
                subgroup: None,
                pass_phrase: None,
                members: Vec::new(),
            },
            RoleRecord {
                identifier: "R2".into(),
                full_name: Some("Finance".into()),
                group: None,
                subgroup: None,
                pass_phrase: Some("abc1234".into()),
                members: Vec::new(),
            },
        ])
    }

    fn r1() -> RowId {
        RowId::Persisted("R1".into())
    }

    const SAMPLES: &[&str] = &[
        "", "a", "Z", "0", "abc123", "ABCdef789", " ", "a b", "a-b", "a_b", "ops.1", "-", "é",
        "роль1", "1\n", "\t", "a/", "１２３",
    ];

    #[test]
    fn identifier_accepts_iff_empty_or_alphanumeric() {
        for s in SAMPLES {
            let mut m = model();
            let original = m.get(&r1()).unwrap().value(Field::Identifier).clone();
            let res = commit_edit(&mut m, &r1(), Field::Identifier, s, &original);
            let expect_ok = s.is_empty() || s.chars().all(|c| c.is_ascii_alphanumeric());
            assert_eq!(res.is_ok(), expect_ok, "input {s:?}");
            let stored = m.get(&r1()).unwrap().value(Field::Identifier).clone();
            if expect_ok {
                assert_eq!(stored, CellValue::from_input(s));
            } else {
                assert_eq!(res, Err(ValidationError::InvalidIdentifier));
                assert_eq!(stored, original, "rejection must keep {original:?}");
            }
        }
    }

    #[test]
    fn empty_full_name_always_rejected() {
        let mut m = model();
        let original = CellValue::from_input("Ops");
        let res = commit_edit(&mut m, &r1(), Field::FullName, "", &original);
        assert_eq!(res, Err(ValidationError::EmptyFullName));
        assert_eq!(m.get(&r1()).unwrap().value(Field::FullName), &original);
    }

    #[test]
    fn unset_sentinel_round_trip() {
        let mut m = model();
        let mut s = EditSession::default();
        let mut ed = CellEditor::default();
        session::toggle(&mut s, &mut ed, &mut m);

        // Committing empty into an optional field stores Unset, shown as "-".
        let key = CellKey::new(r1(), Field::Group);
        assert_eq!(ed.begin_edit(&s, &m, key.clone()), BeginEdit::Opened);
        ed.pending_mut(&key).unwrap().clear();
        assert_eq!(ed.commit(&mut m, &key), Some(Ok(CellValue::Unset)));
        let v = m.get(&r1()).unwrap().value(Field::Group);
        assert!(v.is_unset());
        assert_eq!(v.display(), UNSET_MARKER);

        // Re-editing a "-" cell starts from an empty input.
        assert_eq!(ed.begin_edit(&s, &m, key.clone()), BeginEdit::Opened);
        assert_eq!(ed.get(&key).unwrap().pending, "");
    }

    #[test]
    fn typed_marker_is_unset() {
        let mut m = model();
        let mut s = EditSession::default();
        let mut ed = CellEditor::default();
        session::toggle(&mut s, &mut ed, &mut m);
        let staged = m.add_staged_row().id.clone();
        m.set_value(&staged, Field::FullName, CellValue::Set("Ops Lead 2".into()));

        let key = CellKey::new(staged.clone(), Field::Group);
        assert_eq!(ed.begin_edit(&s, &m, key.clone()), BeginEdit::Opened);
        ed.pending_mut(&key).unwrap().push_str(UNSET_MARKER);
        assert_eq!(ed.commit(&mut m, &key), Some(Ok(CellValue::Unset)));
        assert_eq!(m.get(&staged).unwrap().value(Field::Group).display(), UNSET_MARKER);

        assert_eq!(ed.begin_edit(&s, &m, key.clone()), BeginEdit::Opened);
        assert_eq!(ed.get(&key).unwrap().pending, "");
        ed.commit(&mut m, &key);

        let req = CreateRoleRequest::from_row(m.get(&staged).unwrap());
        assert_eq!(req.group, None);

        // A full name of "-" would read as unset, so it is refused.
        let original = CellValue::from_input("Ops Lead 2");
        let res = commit_edit(&mut m, &staged, Field::FullName, UNSET_MARKER, &original);
        assert_eq!(res, Err(ValidationError::EmptyFullName));
        assert_eq!(m.get(&staged).unwrap().value(Field::FullName), &original);
    }

    #[test]
    fn second_begin_on_open_cell_is_noop() {
        let mut m = model();
        let mut s = EditSession::default();
        let mut ed = CellEditor::default();
        let key = CellKey::new(r1(), Field::FullName);
        assert_eq!(ed.begin_edit(&s, &m, key.clone()), BeginEdit::EditModeOff);
        session::toggle(&mut s, &mut ed, &mut m);
        assert_eq!(ed.begin_edit(&s, &m, key.clone()), BeginEdit::Opened);
        ed.pending_mut(&key).unwrap().push_str(" Lead");
        assert_eq!(ed.begin_edit(&s, &m, key.clone()), BeginEdit::AlreadyOpen);
        assert_eq!(ed.get(&key).unwrap().pending, "Ops Lead");
        assert_eq!(ed.open_count(), 1);
    }

    #[test]
    fn mode_off_flushes_every_open_editor() {
        let mut m = model();
        let mut s = EditSession::default();
        let mut ed = CellEditor::default();
        session::toggle(&mut s, &mut ed, &mut m);

        let r2 = RowId::Persisted("R2".into());
        let cells = [
            (CellKey::new(r1(), Field::FullName), "Ops Lead"),
            (CellKey::new(r1(), Field::Subgroup), "north"),
            (CellKey::new(r2.clone(), Field::Identifier), "bad id!"),
            (CellKey::new(r2.clone(), Field::PassPhrase), ""),
        ];
        for (key, text) in &cells {
            assert_eq!(ed.begin_edit(&s, &m, key.clone()), BeginEdit::Opened);
            let p = ed.pending_mut(key).unwrap();
            p.clear();
            p.push_str(text);
        }

        let out = session::toggle(&mut s, &mut ed, &mut m);
        assert!(!out.now_on);
        assert!(!s.controls_visible());
        assert_eq!(out.flushed, 4);
        assert_eq!(ed.open_count(), 0);
        assert_eq!(out.rejected.len(), 1);
        assert_eq!(out.rejected[0].1, ValidationError::InvalidIdentifier);

        let row1 = m.get(&r1()).unwrap();
        assert_eq!(row1.value(Field::FullName).as_deref(), Some("Ops Lead"));
        assert_eq!(row1.value(Field::Subgroup).as_deref(), Some("north"));
        let row2 = m.get(&r2).unwrap();
        assert_eq!(row2.value(Field::Identifier).as_deref(), Some("R2"));
        assert!(row2.value(Field::PassPhrase).is_unset());
    }
}

#[cfg(test)]
mod row_model_tests {
    use std::collections::HashSet;

    use roles_manager::model::{Removal, RowId, RowModel, STAGED_PREFIX, StagedIdGen};

    #[test]
    fn staged_ids_unique_within_one_millisecond() {
        let mut g = StagedIdGen::default();
        let ids: HashSet<String> = (0..500).map(|_| g.next_at(1_700_000_000_000).to_string()).collect();
        assert_eq!(ids.len(), 500);
        assert!(ids.iter().all(|id| id.starts_with(STAGED_PREFIX)));
    }

    #[test]
    fn rapid_add_staged_rows_never_collide() {
        let mut m = RowModel::default();
        let ids: HashSet<RowId> = (0..200).map(|_| m.add_staged_row().id.clone()).collect();
        assert_eq!(ids.len(), 200);
        assert_eq!(m.staged_count(), 200);
        // Append order is visual order.
        let first = m.rows()[0].id.clone();
        assert!(matches!(m.remove_row(&first), Removal::Removed(_)));
        assert_eq!(m.len(), 199);
    }
}

#[cfg(test)]
mod keymap_tests {
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use roles_manager::app::keymap::{KeyAction, Keymap};

    #[test]
    fn defaults_resolve_core_actions() {
        let km = Keymap::default();
        let k = |c: KeyCode| KeyEvent::new(c, KeyModifiers::NONE);
        assert_eq!(km.resolve(&k(KeyCode::Char('e'))), Some(KeyAction::ToggleEditMode));
        assert_eq!(km.resolve(&k(KeyCode::Char('s'))), Some(KeyAction::Save));
        assert_eq!(km.resolve(&k(KeyCode::Delete)), Some(KeyAction::DeleteRow));
        assert_eq!(km.resolve(&k(KeyCode::Enter)), Some(KeyAction::EditCell));
        // Uppercase arrives with SHIFT on most terminals.
        let shifted = KeyEvent::new(KeyCode::Char('R'), KeyModifiers::SHIFT);
        assert_eq!(km.resolve(&shifted), Some(KeyAction::RegeneratePassPhrase));
        assert_eq!(km.resolve(&k(KeyCode::F(5))), None);
    }

    #[test]
    fn file_overrides_and_round_trip() {
        use std::time::{SystemTime, UNIX_EPOCH};
        let nonce = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        let path = std::env::temp_dir().join(format!("rm_keys_{}_{}.conf", std::process::id(), nonce));
        let path_str = path.to_string_lossy().to_string();

        std::fs::write(&path, "# custom\nSave = Ctrl+w\nx = Quit\nNonsense = q\n").unwrap();
        let km = Keymap::from_file(&path_str).expect("readable");
        let ctrl_w = KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CONTROL);
        assert_eq!(km.resolve(&ctrl_w), Some(KeyAction::Save));
        let x = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE);
        assert_eq!(km.resolve(&x), Some(KeyAction::Quit));

        km.write_file(&path_str).unwrap();
        let again = Keymap::from_file(&path_str).unwrap();
        let mut a = km.all_bindings();
        let mut b = again.all_bindings();
        a.sort_by_key(|((m, c), _)| Keymap::format_key(*m, *c));
        b.sort_by_key(|((m, c), _)| Keymap::format_key(*m, *c));
        assert_eq!(a, b);
        let _ = std::fs::remove_file(&path);
    }
}

#[cfg(test)]
mod config_tests {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use roles_manager::app::{ClientConfig, ReloadPolicy};

    fn temp_path(tag: &str) -> std::path::PathBuf {
        let nonce = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        std::env::temp_dir().join(format!("rm_{tag}_{}_{}.conf", std::process::id(), nonce))
    }

    #[test]
    fn write_then_read_round_trip() {
        let path = temp_path("cfg");
        let p = path.to_string_lossy().to_string();
        let cfg = ClientConfig {
            base_url: "https://roles.example.org/admin".into(),
            reload_policy: ReloadPolicy::Preserve,
            success_flash: Duration::from_millis(1500),
        };
        cfg.write_file(&p).unwrap();
        assert_eq!(ClientConfig::from_file(&p), Some(cfg));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn load_or_init_reads_existing_file() {
        let path = temp_path("cfg_existing");
        let p = path.to_string_lossy().to_string();
        std::fs::write(&path, "reload_policy = preserve\n").unwrap();
        let cfg = ClientConfig::load_or_init(&p);
        assert_eq!(cfg.reload_policy, ReloadPolicy::Preserve);
        assert_eq!(cfg.base_url, ClientConfig::default().base_url);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_none() {
        assert_eq!(ClientConfig::from_file("/nonexistent/roles-manager.conf"), None);
    }
}
