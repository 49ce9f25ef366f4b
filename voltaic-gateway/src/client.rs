//! REST client for the remote entity gateway.
//!
//! The gateway owns all entity storage and business logic; this client is
//! the full extent of the contract the rest of the workspace sees: per-entity
//! CRUD, named function invocation, the core integrations (file upload,
//! structured extraction, LLM), and `auth.me()`.

use crate::config::GatewayConfig;
use crate::types::{
    ApiErrorBody, CurrentUser, ExtractionResult, InvokeResponse, LlmRequest, UploadedFile,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use voltaic_core::{
    ContentHash, EntityKind, FilterSet, GatewayError, Record, RecordId, SortSpec, TenantId,
    VoltaicResult,
};

#[derive(Clone)]
pub struct Gateway {
    client: reqwest::Client,
    base_url: String,
    auth_header: HeaderMap,
    tenant_id: TenantId,
    default_list_limit: usize,
}

impl Gateway {
    pub fn new(config: &GatewayConfig) -> VoltaicResult<Self> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport)?;

        let auth_header = build_auth_headers(config)?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_header,
            tenant_id: TenantId::new(config.tenant_id),
            default_list_limit: config.default_list_limit,
        })
    }

    /// The tenant every request from this client is scoped to.
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Handle for one entity collection.
    pub fn entity(&self, kind: EntityKind) -> EntityHandle<'_> {
        EntityHandle {
            gateway: self,
            kind,
        }
    }

    /// Named remote function invocation.
    pub fn functions(&self) -> Functions<'_> {
        Functions { gateway: self }
    }

    /// Core integrations: file upload, extraction, LLM.
    pub fn integrations(&self) -> Integrations<'_> {
        Integrations { gateway: self }
    }

    /// Authentication surface.
    pub fn auth(&self) -> Auth<'_> {
        Auth { gateway: self }
    }

    // ------------------------------------------------------------------------
    // Request plumbing
    // ------------------------------------------------------------------------

    async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> VoltaicResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .client
            .get(url)
            .headers(self.auth_header.clone())
            .header("x-tenant-id", self.tenant_id.to_string());
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request.send().await.map_err(transport)?;
        parse_response(response).await
    }

    async fn post_json<T, B>(&self, path: &str, body: &B) -> VoltaicResult<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(url)
            .headers(self.auth_header.clone())
            .header("x-tenant-id", self.tenant_id.to_string())
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        parse_response(response).await
    }

    async fn patch_json<T, B>(&self, path: &str, body: &B) -> VoltaicResult<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .patch(url)
            .headers(self.auth_header.clone())
            .header("x-tenant-id", self.tenant_id.to_string())
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        parse_response(response).await
    }

    async fn delete_path(&self, path: &str) -> VoltaicResult<()> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .delete(url)
            .headers(self.auth_header.clone())
            .header("x-tenant-id", self.tenant_id.to_string())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(error_from_response(status, response).await.into())
        }
    }
}

/// Operations on one entity collection.
#[derive(Clone)]
pub struct EntityHandle<'a> {
    gateway: &'a Gateway,
    kind: EntityKind,
}

impl EntityHandle<'_> {
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// List records, newest-first by default on the server side.
    pub async fn list(
        &self,
        sort: Option<&SortSpec>,
        limit: Option<usize>,
    ) -> VoltaicResult<Vec<Record>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(sort) = sort {
            query.push(("sort", sort.to_wire()));
        }
        let limit = limit.unwrap_or(self.gateway.default_list_limit);
        query.push(("limit", limit.to_string()));
        self.gateway
            .get_json(&format!("/api/v1/entities/{}", self.kind), &query)
            .await
    }

    /// Server-side filtered list. The filter set is the same expression
    /// type the views layer evaluates client-side.
    pub async fn filter(
        &self,
        filters: &FilterSet,
        sort: Option<&SortSpec>,
        limit: Option<usize>,
    ) -> VoltaicResult<Vec<Record>> {
        let body = serde_json::json!({
            "filters": filters,
            "sort": sort.map(SortSpec::to_wire),
            "limit": limit.unwrap_or(self.gateway.default_list_limit),
        });
        self.gateway
            .post_json(&format!("/api/v1/entities/{}/filter", self.kind), &body)
            .await
    }

    pub async fn get(&self, id: RecordId) -> VoltaicResult<Record> {
        self.gateway
            .get_json(
                &format!("/api/v1/entities/{}/{}", self.kind, id.as_uuid()),
                &[],
            )
            .await
    }

    pub async fn create(&self, payload: &Value) -> VoltaicResult<Record> {
        self.gateway
            .post_json(&format!("/api/v1/entities/{}", self.kind), payload)
            .await
    }

    pub async fn update(&self, id: RecordId, patch: &Value) -> VoltaicResult<Record> {
        self.gateway
            .patch_json(
                &format!("/api/v1/entities/{}/{}", self.kind, id.as_uuid()),
                patch,
            )
            .await
    }

    pub async fn delete(&self, id: RecordId) -> VoltaicResult<()> {
        self.gateway
            .delete_path(&format!("/api/v1/entities/{}/{}", self.kind, id.as_uuid()))
            .await
    }

    pub async fn bulk_create(&self, payloads: &[Value]) -> VoltaicResult<Vec<Record>> {
        self.gateway
            .post_json(&format!("/api/v1/entities/{}/bulk", self.kind), payloads)
            .await
    }
}

/// Named remote function invocation surface.
#[derive(Clone)]
pub struct Functions<'a> {
    gateway: &'a Gateway,
}

impl Functions<'_> {
    pub async fn invoke(&self, name: &str, payload: &Value) -> VoltaicResult<InvokeResponse> {
        tracing::debug!(function = name, "invoking remote function");
        self.gateway
            .post_json(&format!("/api/v1/functions/{}", name), payload)
            .await
    }
}

/// Core integration endpoints.
#[derive(Clone)]
pub struct Integrations<'a> {
    gateway: &'a Gateway,
}

impl Integrations<'_> {
    /// Upload a file using multipart/form-data. The request carries the
    /// SHA-256 digest of the bytes so the gateway can deduplicate repeated
    /// uploads of the same document.
    pub async fn upload_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> VoltaicResult<UploadedFile> {
        let url = format!("{}/api/v1/integrations/upload", self.gateway.base_url);
        let (form, digest) = upload_form(file_name, bytes);
        tracing::debug!(file_name, content_hash = %digest, "uploading file");

        let response = self
            .gateway
            .client
            .post(url)
            .headers(self.gateway.auth_header.clone())
            .header("x-tenant-id", self.gateway.tenant_id.to_string())
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;

        parse_response(response).await
    }

    /// Extract structured data from a previously uploaded file.
    pub async fn extract_data(
        &self,
        file_url: &str,
        json_schema: &Value,
    ) -> VoltaicResult<ExtractionResult> {
        let body = serde_json::json!({
            "file_url": file_url,
            "json_schema": json_schema,
        });
        self.gateway
            .post_json("/api/v1/integrations/extract", &body)
            .await
    }

    /// Ad-hoc LLM invocation. Returns the raw completion text.
    pub async fn invoke_llm(&self, request: &LlmRequest) -> VoltaicResult<String> {
        self.gateway
            .post_json("/api/v1/integrations/llm", request)
            .await
    }
}

/// Authentication surface.
#[derive(Clone)]
pub struct Auth<'a> {
    gateway: &'a Gateway,
}

impl Auth<'_> {
    /// The current user, or None when the session is unauthenticated.
    pub async fn me(&self) -> VoltaicResult<Option<CurrentUser>> {
        let url = format!("{}/api/v1/auth/me", self.gateway.base_url);
        let response = self
            .gateway
            .client
            .get(url)
            .headers(self.gateway.auth_header.clone())
            .header("x-tenant-id", self.gateway.tenant_id.to_string())
            .send()
            .await
            .map_err(transport)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        let user: CurrentUser = parse_response(response).await?;
        Ok(Some(user))
    }
}

/// Build the upload form: the digest field goes first so the server can
/// short-circuit a duplicate before reading the file part.
fn upload_form(file_name: &str, bytes: Vec<u8>) -> (Form, ContentHash) {
    let digest = ContentHash::compute(&bytes);
    let part = Part::bytes(bytes).file_name(file_name.to_string());
    let form = Form::new()
        .text("content_hash", digest.to_hex())
        .part("file", part);
    (form, digest)
}

// ----------------------------------------------------------------------------
// Error mapping
// ----------------------------------------------------------------------------

fn transport(err: reqwest::Error) -> GatewayError {
    GatewayError::Transport {
        message: err.to_string(),
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> VoltaicResult<T> {
    let status = response.status();
    if status.is_success() {
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode {
                message: e.to_string(),
            })
            .map_err(Into::into)
    } else {
        Err(error_from_response(status, response).await.into())
    }
}

async fn error_from_response(status: StatusCode, response: reqwest::Response) -> GatewayError {
    let text = response.text().await.unwrap_or_default();
    if let Ok(body) = serde_json::from_str::<ApiErrorBody>(&text) {
        return GatewayError::Rejected {
            code: body.code,
            message: body.message,
        };
    }
    GatewayError::RequestFailed {
        status: status.as_u16(),
        message: text,
    }
}

fn build_auth_headers(config: &GatewayConfig) -> Result<HeaderMap, GatewayError> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = &config.auth.api_key {
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(api_key).map_err(|e| GatewayError::Transport {
                message: format!("invalid api key header: {}", e),
            })?,
        );
    }
    if let Some(token) = &config.auth.bearer_token {
        let value = format!("Bearer {}", token);
        headers.insert(
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&value).map_err(|e| GatewayError::Transport {
                message: format!("invalid bearer token header: {}", e),
            })?,
        );
    }
    Ok(headers)
}
