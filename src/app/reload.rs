//! Model refresh: re-fetch the authoritative role list and replace the
//! [`RowModel`](crate::model::RowModel) according to the configured
//! [`ReloadPolicy`].

use crate::api::{RoleBackend, RoleRecord};
use crate::app::{AppState, InputMode, Pane, ReloadPolicy, ViewFilter};
use crate::error::ApiError;
use crate::model::Field;
use crate::search::apply_filters_and_search;

impl AppState {
    /// Replace the model with `records`. Open editors are dropped without
    /// committing since the rows they belong to are gone. Modals are left
    /// alone so a message queued before the reload is still shown.
    pub fn apply_reload(&mut self, records: Vec<RoleRecord>) {
        self.model.replace_with(records);
        self.editor.clear();
        self.editing = None;
        self.saving = false;
        self.pending_reload = None;
        self.loaded = true;
        if self.input_mode == InputMode::Editing {
            self.input_mode = InputMode::Normal;
        }

        match self.config.reload_policy {
            ReloadPolicy::Reset => {
                self.session.set_on(false);
                self.view = ViewFilter::default();
                self.visible.clear();
                self.selected_row = 0;
                self.selected_field = Field::Identifier;
                self.selected_member = 0;
                self.focus = Pane::Roles;
                self.flash = None;
                if self.input_mode == InputMode::Search {
                    self.input_mode = InputMode::Normal;
                }
                apply_filters_and_search(self);
            }
            ReloadPolicy::Preserve => {
                apply_filters_and_search(self);
                let members = self.selected_row().map_or(0, |r| r.members.len());
                self.selected_member = self.selected_member.min(members.saturating_sub(1));
            }
        }
        tracing::debug!(rows = self.model.len(), policy = ?self.config.reload_policy, "model reloaded");
    }
}

/// Fetch and apply. On failure the current model is kept.
pub async fn reload(app: &mut AppState, backend: &dyn RoleBackend) -> Result<(), ApiError> {
    match backend.list_roles().await {
        Ok(records) => {
            app.apply_reload(records);
            Ok(())
        }
        Err(err) => {
            tracing::warn!(%err, "role list fetch failed");
            app.saving = false;
            app.pending_reload = None;
            Err(err)
        }
    }
}
