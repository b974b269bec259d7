//! HTTP transport for [`RoleBackend`] on `reqwest`.
//!
//! No client-side timeout or retry is configured: a request that never
//! completes blocks its caller until the transport gives up.
//!
use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;

use super::{
    AddMemberRequest, CreateRoleRequest, OperationResponse, RemoveMemberRequest, RoleBackend,
    RoleList, RoleRecord, UpdateRoleRequest,
};
use crate::error::ApiError;

/// JSON-over-HTTP backend rooted at `base_url`.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url).with_context(|| format!("invalid base URL {base_url:?}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("base URL {base_url} cannot carry a path");
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("roles-manager/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build HTTP client")?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL extended by percent-encoded path segments.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn post_json<T: Serialize + ?Sized>(&self, segments: &[&str], body: &T) -> Result<(), ApiError> {
        let url = self.endpoint(segments);
        tracing::debug!(%url, "POST");
        let resp = self.client.post(url).json(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        let bytes = resp.bytes().await?;
        serde_json::from_slice::<OperationResponse>(&bytes)?.into_result()
    }

    /// POST without a body; only the HTTP status matters.
    async fn post_empty(&self, segments: &[&str]) -> Result<(), ApiError> {
        let url = self.endpoint(segments);
        tracing::debug!(%url, "POST");
        let resp = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ApiError::Status(status.as_u16()))
        }
    }
}

#[async_trait]
impl RoleBackend for HttpBackend {
    async fn list_roles(&self) -> Result<Vec<RoleRecord>, ApiError> {
        let url = self.endpoint(&["roles", "api", "roles"]);
        tracing::debug!(%url, "GET");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice::<RoleList>(&bytes)?.roles)
    }

    async fn update_role(&self, req: &UpdateRoleRequest) -> Result<(), ApiError> {
        self.post_json(&["roles", "update"], req).await
    }

    async fn create_role(&self, req: &CreateRoleRequest) -> Result<(), ApiError> {
        self.post_json(&["roles", "add_from_table"], req).await
    }

    async fn delete_role(&self, role_id: &str) -> Result<(), ApiError> {
        self.post_empty(&["roles", "delete", role_id]).await
    }

    async fn add_member(&self, req: &AddMemberRequest) -> Result<(), ApiError> {
        self.post_json(&["roles", "add_user"], req).await
    }

    async fn remove_member(&self, req: &RemoveMemberRequest) -> Result<(), ApiError> {
        self.post_json(&["roles", "delete_user"], req).await
    }

    async fn regenerate_pass_phrase(&self, role_id: &str) -> Result<(), ApiError> {
        self.post_empty(&["roles", "regenerate_password", role_id]).await
    }

    async fn send_pass_phrase(&self, role_id: &str) -> Result<(), ApiError> {
        self.post_empty(&["roles", "send_password", role_id]).await
    }
}
