//! Diff & batch synchronizer.
//!
//! A save walks the whole [`RowModel`], sends every persisted row as a
//! whole-row update and every staged row as a create, and reports the two
//! phases separately. Updates and creates are strictly sequential: no
//! create future is even built until every update has resolved.
//!
use std::future::Future;

use futures::future::join_all;

use crate::api::{CreateRoleRequest, RoleBackend, UpdateRoleRequest};
use crate::error::ApiError;
use crate::model::{RowId, RowModel};

/// Requests derived from the model at the start of a save.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SavePlan {
    pub updates: Vec<(RowId, UpdateRoleRequest)>,
    pub creates: Vec<(RowId, CreateRoleRequest)>,
}

impl SavePlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.creates.is_empty()
    }
}

/// Partition rows into updates and creates, in model order.
///
/// Updates carry the full current field map, not a diff. Staged rows are
/// always submitted, however incomplete.
pub fn plan_save(model: &RowModel) -> SavePlan {
    let mut plan = SavePlan::default();
    for row in model.rows() {
        match &row.id {
            RowId::Staged(_) => plan
                .creates
                .push((row.id.clone(), CreateRoleRequest::from_row(row))),
            RowId::Persisted(role_id) if row.has_fields() => plan
                .updates
                .push((row.id.clone(), UpdateRoleRequest::from_row(role_id, row))),
            RowId::Persisted(_) => {}
        }
    }
    plan
}

/// Shown when every create went through.
pub const SAVED_MESSAGE: &str = "Saved!";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Updates,
    Creates,
}

impl Phase {
    fn failure_message(self) -> &'static str {
        match self {
            Phase::Updates => "Failed to save changes to existing roles",
            Phase::Creates => "Failed to add new roles",
        }
    }
}

/// Outcome of one batch phase. `failed` keeps the row identities for the
/// log; the operator only sees the aggregate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: Phase,
    pub attempted: usize,
    pub failed: Vec<RowId>,
}

impl PhaseReport {
    pub fn succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// One message for the whole phase, `None` if nothing failed.
    pub fn failure_message(&self) -> Option<String> {
        if self.succeeded() {
            return None;
        }
        Some(format!(
            "{} ({} of {} failed)",
            self.phase.failure_message(),
            self.failed.len(),
            self.attempted
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveReport {
    pub updates: PhaseReport,
    pub creates: PhaseReport,
}

impl SaveReport {
    /// Reload iff every create went through. Update failures do not block
    /// it; a failed create must not be discarded by a reload.
    pub fn should_reload(&self) -> bool {
        self.creates.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.updates.succeeded() && self.creates.succeeded()
    }

    /// Operator-facing messages in the order they are shown.
    pub fn messages(&self) -> Vec<String> {
        let mut out: Vec<String> = [&self.updates, &self.creates]
            .into_iter()
            .filter_map(PhaseReport::failure_message)
            .collect();
        if self.should_reload() {
            out.push(SAVED_MESSAGE.to_string());
        }
        out
    }
}

async fn run_phase<Fut>(phase: Phase, calls: Vec<(RowId, Fut)>) -> PhaseReport
where
    Fut: Future<Output = Result<(), ApiError>>,
{
    let attempted = calls.len();
    let (ids, pending): (Vec<RowId>, Vec<Fut>) = calls.into_iter().unzip();
    let results = join_all(pending).await;
    let failed: Vec<RowId> = ids
        .into_iter()
        .zip(results)
        .filter_map(|(id, res)| match res {
            Ok(()) => None,
            Err(err) => {
                tracing::warn!(?phase, row = %id, %err, "row failed to sync");
                Some(id)
            }
        })
        .collect();
    tracing::info!(?phase, attempted, failed = failed.len(), "phase finished");
    PhaseReport {
        phase,
        attempted,
        failed,
    }
}

/// Run both phases of `plan` against `backend`.
pub async fn execute(backend: &dyn RoleBackend, plan: &SavePlan) -> SaveReport {
    let updates = run_phase(
        Phase::Updates,
        plan.updates
            .iter()
            .map(|(id, req)| (id.clone(), backend.update_role(req)))
            .collect(),
    )
    .await;
    let creates = run_phase(
        Phase::Creates,
        plan.creates
            .iter()
            .map(|(id, req)| (id.clone(), backend.create_role(req)))
            .collect(),
    )
    .await;
    SaveReport { updates, creates }
}

/// Plan from the current model and execute. The model is only read.
pub async fn save(backend: &dyn RoleBackend, model: &RowModel) -> SaveReport {
    let plan = plan_save(model);
    tracing::info!(
        updates = plan.updates.len(),
        creates = plan.creates.len(),
        "saving"
    );
    execute(backend, &plan).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RoleRecord;
    use crate::model::{CellValue, Field};

    fn record(id: &str) -> RoleRecord {
        RoleRecord {
            identifier: id.into(),
            full_name: Some(format!("{id} name")),
            group: None,
            subgroup: None,
            pass_phrase: None,
            members: Vec::new(),
        }
    }

    #[test]
    fn plan_partitions_in_model_order() {
        let mut model = RowModel::from_records(vec![record("R1"), record("R2")]);
        let staged = model.add_staged_row().id.clone();
        model.set_value(&staged, Field::Identifier, CellValue::from_input("ops2"));
        let plan = plan_save(&model);
        let update_ids: Vec<&str> = plan.updates.iter().map(|(_, r)| r.role_id.as_str()).collect();
        assert_eq!(update_ids, vec!["R1", "R2"]);
        assert_eq!(plan.creates.len(), 1);
        assert_eq!(plan.creates[0].0, staged);
        assert_eq!(plan.creates[0].1.identifier.as_deref(), Some("ops2"));
        assert_eq!(plan.creates[0].1.full_name, None);
    }

    #[test]
    fn edited_identifier_does_not_change_update_key() {
        let mut model = RowModel::from_records(vec![record("R1")]);
        let id = RowId::Persisted("R1".into());
        model.set_value(&id, Field::Identifier, CellValue::from_input("R9"));
        let plan = plan_save(&model);
        assert_eq!(plan.updates[0].1.role_id, "R1");
        assert_eq!(plan.updates[0].1.identifier.as_deref(), Some("R9"));
    }

    #[test]
    fn empty_model_plans_nothing() {
        assert!(plan_save(&RowModel::default()).is_empty());
    }

    fn report(phase: Phase, attempted: usize, failed: &[&str]) -> PhaseReport {
        PhaseReport {
            phase,
            attempted,
            failed: failed.iter().map(|s| RowId::Persisted((*s).into())).collect(),
        }
    }

    #[test]
    fn update_failure_still_reloads_when_creates_pass() {
        let r = SaveReport {
            updates: report(Phase::Updates, 3, &["R2"]),
            creates: report(Phase::Creates, 1, &[]),
        };
        assert!(r.should_reload());
        assert!(!r.all_succeeded());
        assert_eq!(
            r.messages(),
            vec![
                "Failed to save changes to existing roles (1 of 3 failed)".to_string(),
                "Saved!".to_string()
            ]
        );
    }

    #[test]
    fn create_failure_blocks_reload() {
        let r = SaveReport {
            updates: report(Phase::Updates, 0, &[]),
            creates: report(Phase::Creates, 2, &["x"]),
        };
        assert!(!r.should_reload());
        assert_eq!(r.messages(), vec!["Failed to add new roles (1 of 2 failed)".to_string()]);
    }
}
