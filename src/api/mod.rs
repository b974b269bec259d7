//! Backend interface consumed by the reconciliation core.
//!
//! [`RoleBackend`] is the only seam to the server. The terminal client uses
//! [`http::HttpBackend`]; tests plug in an in-memory implementation.
//!
pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::model::{Field, Row};

/// A user bound to a role.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
}

/// A persisted role as returned by the list endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub identifier: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub subgroup: Option<String>,
    #[serde(default)]
    pub pass_phrase: Option<String>,
    #[serde(default)]
    pub members: Vec<Member>,
}

#[derive(Debug, Deserialize)]
pub struct RoleList {
    pub roles: Vec<RoleRecord>,
}

/// Whole-row update of a persisted role. Unset fields go out as `null`.
///
/// `role_id` locates the row and `identifier` is its (possibly edited) new
/// value, so the two never share a key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpdateRoleRequest {
    pub role_id: String,
    pub identifier: Option<String>,
    pub full_name: Option<String>,
    pub group: Option<String>,
    pub subgroup: Option<String>,
    pub pass_phrase: Option<String>,
}

impl UpdateRoleRequest {
    pub fn from_row(role_id: &str, row: &Row) -> Self {
        Self {
            role_id: role_id.to_string(),
            identifier: row.value(Field::Identifier).to_wire(),
            full_name: row.value(Field::FullName).to_wire(),
            group: row.value(Field::Group).to_wire(),
            subgroup: row.value(Field::Subgroup).to_wire(),
            pass_phrase: row.value(Field::PassPhrase).to_wire(),
        }
    }
}

/// Creation of a staged row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CreateRoleRequest {
    pub identifier: Option<String>,
    pub full_name: Option<String>,
    pub group: Option<String>,
    pub subgroup: Option<String>,
    pub pass_phrase: Option<String>,
}

impl CreateRoleRequest {
    pub fn from_row(row: &Row) -> Self {
        Self {
            identifier: row.value(Field::Identifier).to_wire(),
            full_name: row.value(Field::FullName).to_wire(),
            group: row.value(Field::Group).to_wire(),
            subgroup: row.value(Field::Subgroup).to_wire(),
            pass_phrase: row.value(Field::PassPhrase).to_wire(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AddMemberRequest {
    pub role_id: String,
    pub user_id: String,
    pub user_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RemoveMemberRequest {
    pub role_id: String,
    pub user_id: String,
}

/// `{success, error?, warning?}` body shared by the JSON endpoints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct OperationResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub warning: Option<String>,
}

impl OperationResponse {
    /// Map `success: false` to [`ApiError::Rejected`]; a warning on success
    /// is only logged.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.success {
            if let Some(warning) = self.warning {
                tracing::warn!(%warning, "server reported a warning");
            }
            Ok(())
        } else {
            Err(ApiError::Rejected { message: self.error })
        }
    }
}

/// Role and membership operations offered by the backend.
///
/// Any non-success outcome (transport error, HTTP status, `success: false`,
/// undecodable body) is an [`ApiError`].
#[async_trait]
pub trait RoleBackend: Send + Sync {
    async fn list_roles(&self) -> Result<Vec<RoleRecord>, ApiError>;

    async fn update_role(&self, req: &UpdateRoleRequest) -> Result<(), ApiError>;

    async fn create_role(&self, req: &CreateRoleRequest) -> Result<(), ApiError>;

    async fn delete_role(&self, role_id: &str) -> Result<(), ApiError>;

    async fn add_member(&self, req: &AddMemberRequest) -> Result<(), ApiError>;

    async fn remove_member(&self, req: &RemoveMemberRequest) -> Result<(), ApiError>;

    /// Issue a new pass phrase; the server unbinds every member.
    async fn regenerate_pass_phrase(&self, role_id: &str) -> Result<(), ApiError>;

    /// Ask the server to deliver the current pass phrase to every member.
    async fn send_pass_phrase(&self, role_id: &str) -> Result<(), ApiError>;
}
