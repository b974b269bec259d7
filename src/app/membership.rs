//! Membership editor and per-role pass phrase actions.
//!
//! These are direct single-call operations; they never go through the
//! batch synchronizer.
//!
use crate::api::{AddMemberRequest, RemoveMemberRequest, RoleBackend};
use crate::error::{ApiError, ValidationError};

/// `true` for a non-empty string of ASCII digits.
pub fn is_valid_user_id(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("{0}")]
    Failed(#[from] ApiError),
}

impl MembershipError {
    /// Server-provided text when there is one, `fallback` otherwise.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            MembershipError::Invalid(v) => v.to_string(),
            MembershipError::Failed(api) => api
                .server_message()
                .map(str::to_string)
                .unwrap_or_else(|| fallback.to_string()),
        }
    }
}

pub const ADD_FAILED: &str = "Failed to add user";
pub const REMOVE_FAILED: &str = "Failed to remove user from role";

/// Bind `user_id` to `role_id`. The id is checked before anything is sent.
pub async fn add_membership(
    backend: &dyn RoleBackend,
    role_id: &str,
    user_id: &str,
    display_name: Option<&str>,
) -> Result<(), MembershipError> {
    let user_id = user_id.trim();
    if !is_valid_user_id(user_id) {
        return Err(ValidationError::InvalidUserId.into());
    }
    let req = AddMemberRequest {
        role_id: role_id.to_string(),
        user_id: user_id.to_string(),
        user_name: display_name
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    };
    backend.add_member(&req).await.inspect_err(|err| {
        tracing::warn!(role_id, user_id, %err, "add member failed");
    })?;
    tracing::info!(role_id, user_id, "member added");
    Ok(())
}

pub async fn remove_membership(
    backend: &dyn RoleBackend,
    role_id: &str,
    user_id: &str,
) -> Result<(), MembershipError> {
    let req = RemoveMemberRequest {
        role_id: role_id.to_string(),
        user_id: user_id.to_string(),
    };
    backend.remove_member(&req).await.inspect_err(|err| {
        tracing::warn!(role_id, user_id, %err, "remove member failed");
    })?;
    tracing::info!(role_id, user_id, "member removed");
    Ok(())
}

pub async fn regenerate_pass_phrase(backend: &dyn RoleBackend, role_id: &str) -> Result<(), ApiError> {
    backend
        .regenerate_pass_phrase(role_id)
        .await
        .inspect_err(|err| tracing::warn!(role_id, %err, "pass phrase regeneration failed"))?;
    tracing::info!(role_id, "pass phrase regenerated");
    Ok(())
}

pub async fn send_pass_phrase(backend: &dyn RoleBackend, role_id: &str) -> Result<(), ApiError> {
    backend
        .send_pass_phrase(role_id)
        .await
        .inspect_err(|err| tracing::warn!(role_id, %err, "sending pass phrase failed"))?;
    tracing::info!(role_id, "pass phrase sent");
    Ok(())
}
