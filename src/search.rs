//! Client-side view filter over the loaded role rows.
//!
//! Filtering only changes which rows are shown; saves always walk the full
//! model. Staged rows stay visible so unsent work cannot be hidden.

use crate::app::{AppState, ViewFilter};
use crate::model::{Field, Row};

/// Case-insensitive match of a row against the filter.
pub fn row_matches(row: &Row, view: &ViewFilter) -> bool {
    if row.id.is_staged() {
        return true;
    }
    if view.only_with_users && row.members.is_empty() {
        return false;
    }
    if let Some(group) = &view.group
        && row.value(Field::Group).as_deref() != Some(group.as_str())
    {
        return false;
    }
    let q = view.query.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }
    row.fields()
        .filter(|(f, _)| *f != Field::PassPhrase)
        .any(|(_, v)| v.as_deref().is_some_and(|s| s.to_lowercase().contains(&q)))
        || row.members.iter().any(|m| {
            m.user_id.contains(&q)
                || m.user_name
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase().contains(&q))
        })
}

/// Recompute `app.visible` and keep the selection on the same row when it
/// is still shown, clamped otherwise.
pub fn apply_filters_and_search(app: &mut AppState) {
    let previous = app.selected_row_id().cloned();
    app.visible = app
        .model
        .rows()
        .iter()
        .filter(|r| row_matches(r, &app.view))
        .map(|r| r.id.clone())
        .collect();
    if let Some(idx) = previous.and_then(|id| app.visible.iter().position(|v| *v == id)) {
        app.selected_row = idx;
    } else {
        app.selected_row = app.selected_row.min(app.visible.len().saturating_sub(1));
        app.selected_member = 0;
    }
}

/// None -> first group -> ... -> last group -> None.
pub fn cycle_group_filter(app: &mut AppState) {
    let groups = app.model.groups();
    app.view.group = match &app.view.group {
        None => groups.first().cloned(),
        Some(cur) => groups
            .iter()
            .position(|g| g == cur)
            .and_then(|i| groups.get(i + 1).cloned()),
    };
    apply_filters_and_search(app);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Member, RoleRecord};
    use crate::app::ClientConfig;
    use crate::app::keymap::Keymap;
    use crate::model::RowModel;

    fn rec(id: &str, name: &str, group: Option<&str>, members: &[&str]) -> RoleRecord {
        RoleRecord {
            identifier: id.into(),
            full_name: Some(name.into()),
            group: group.map(Into::into),
            subgroup: None,
            pass_phrase: Some("secret".into()),
            members: members
                .iter()
                .map(|m| Member {
                    user_id: (*m).into(),
                    user_name: Some(format!("user {m}")),
                })
                .collect(),
        }
    }

    fn mk_app() -> AppState {
        let mut app = AppState::new(ClientConfig::default(), Keymap::default());
        app.model = RowModel::from_records(vec![
            rec("ops1", "Operations", Some("IT"), &["101"]),
            rec("fin1", "Finance Lead", Some("FIN"), &[]),
            rec("ops2", "Ops Backup", Some("IT"), &[]),
        ]);
        apply_filters_and_search(&mut app);
        app
    }

    #[test]
    fn query_matches_fields_and_members_but_not_pass_phrase() {
        let mut app = mk_app();
        app.view.query = "FINANCE".into();
        apply_filters_and_search(&mut app);
        assert_eq!(app.visible.len(), 1);

        app.view.query = "user 101".into();
        apply_filters_and_search(&mut app);
        assert_eq!(app.visible.len(), 1);

        app.view.query = "secret".into();
        apply_filters_and_search(&mut app);
        assert!(app.visible.is_empty());
    }

    #[test]
    fn staged_rows_survive_any_filter() {
        let mut app = mk_app();
        app.model.add_staged_row();
        app.view.only_with_users = true;
        app.view.query = "zzz".into();
        apply_filters_and_search(&mut app);
        assert_eq!(app.visible.len(), 1);
        assert!(app.visible[0].is_staged());
    }

    #[test]
    fn group_cycle_wraps_to_none() {
        let mut app = mk_app();
        cycle_group_filter(&mut app);
        assert_eq!(app.view.group.as_deref(), Some("FIN"));
        cycle_group_filter(&mut app);
        assert_eq!(app.view.group.as_deref(), Some("IT"));
        assert_eq!(app.visible.len(), 2);
        cycle_group_filter(&mut app);
        assert_eq!(app.view.group, None);
        assert_eq!(app.visible.len(), 3);
    }

    #[test]
    fn selection_follows_row_when_filter_changes() {
        let mut app = mk_app();
        app.selected_row = 2; // ops2
        app.view.group = Some("IT".into());
        apply_filters_and_search(&mut app);
        assert_eq!(app.selected_row, 1);
        assert_eq!(app.selected_row_id().map(|r| r.to_string()), Some("ops2".into()));
    }
}
