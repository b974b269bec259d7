//! Row deletion flow.
//!
//! Deletion is two-step: [`request_deletion`] builds the confirmation and
//! never touches the network; [`confirm_deletion`] runs after the operator
//! agreed.
//!
use crate::api::RoleBackend;
use crate::error::ApiError;
use crate::model::cell::CellEditor;
use crate::model::{Field, Removal, RowId, RowModel};

/// A deletion waiting for confirmation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingDeletion {
    pub row: RowId,
    pub label: String,
}

impl PendingDeletion {
    pub fn prompt(&self) -> String {
        if self.row.is_staged() {
            format!("Discard new row {}?", self.label)
        } else {
            format!("Delete role {}? This cannot be undone.", self.label)
        }
    }
}

#[derive(Debug)]
pub enum DeletionOutcome {
    /// Staged row dropped from the model; nothing was sent.
    RemovedLocally,
    /// The server deleted the role; the caller reloads.
    DeletedOnServer,
    /// The server call failed; model untouched.
    Failed(ApiError),
    /// The row vanished between request and confirmation.
    NotFound,
}

/// Prepare the confirmation for `row`. `None` if it is not in the model.
pub fn request_deletion(model: &RowModel, row: &RowId) -> Option<PendingDeletion> {
    let r = model.get(row)?;
    let label = match (r.value(Field::Identifier).as_deref(), r.value(Field::FullName).as_deref()) {
        (Some(id), Some(name)) => format!("{id} ({name})"),
        (Some(id), None) => id.to_string(),
        (None, Some(name)) => format!("\"{name}\""),
        (None, None) if row.is_staged() => "(empty)".to_string(),
        (None, None) => row.to_string(),
    };
    Some(PendingDeletion {
        row: row.clone(),
        label,
    })
}

/// Carry out a confirmed deletion.
pub async fn confirm_deletion(
    backend: &dyn RoleBackend,
    model: &mut RowModel,
    editor: &mut CellEditor,
    pending: &PendingDeletion,
) -> DeletionOutcome {
    match model.remove_row(&pending.row) {
        Removal::NotFound => DeletionOutcome::NotFound,
        Removal::Removed(_) => {
            editor.discard_row(&pending.row);
            tracing::info!(row = %pending.row, "staged row discarded");
            DeletionOutcome::RemovedLocally
        }
        Removal::RequiresServer(role_id) => match backend.delete_role(&role_id).await {
            Ok(()) => {
                tracing::info!(%role_id, "role deleted");
                DeletionOutcome::DeletedOnServer
            }
            Err(err) => {
                tracing::warn!(%role_id, %err, "role deletion failed");
                DeletionOutcome::Failed(err)
            }
        },
    }
}
