//! Request and response types for the gateway wire contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error body the gateway returns on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

/// Envelope returned by named remote function invocations.
///
/// All business computation (OCR extraction, pricing, automation rules,
/// messaging orchestration) happens behind this envelope; the client only
/// forwards payloads and unwraps `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeResponse {
    pub data: Value,
}

/// Result of a file upload.
///
/// `content_hash` echoes the digest the client stamped on the request;
/// older gateway versions omit it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_url: String,
    #[serde(default)]
    pub content_hash: Option<String>,
}

/// Status of a structured-data extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    Success,
    Error,
}

/// Result of extracting structured data from an uploaded file.
///
/// `output` follows the caller-supplied JSON schema on success; `details`
/// carries the business-rule rejection (for example "not an energy
/// invoice") on error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub status: ExtractionStatus,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub details: Option<String>,
}

/// Request body for ad-hoc LLM invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_json_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_urls: Option<Vec<String>>,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response_json_schema: None,
            file_urls: None,
        }
    }
}

/// The authenticated user, as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extraction_result_error_decodes_without_output() {
        let body = json!({ "status": "error", "details": "not an energy invoice" });
        let result: ExtractionResult = serde_json::from_value(body).unwrap();
        assert_eq!(result.status, ExtractionStatus::Error);
        assert!(result.output.is_none());
        assert_eq!(result.details.as_deref(), Some("not an energy invoice"));
    }

    #[test]
    fn test_llm_request_omits_empty_options() {
        let request = LlmRequest::new("summarize this contract");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({ "prompt": "summarize this contract" }));
    }

    #[test]
    fn test_uploaded_file_hash_is_optional() {
        let bare: UploadedFile =
            serde_json::from_value(json!({ "file_url": "https://cdn.test/a.pdf" })).unwrap();
        assert!(bare.content_hash.is_none());

        let hashed: UploadedFile = serde_json::from_value(json!({
            "file_url": "https://cdn.test/a.pdf",
            "content_hash": "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        }))
        .unwrap();
        assert!(hashed.content_hash.is_some());
    }

    #[test]
    fn test_current_user_role_is_optional() {
        let user: CurrentUser =
            serde_json::from_value(json!({ "email": "ana@sol.test", "full_name": "Ana" })).unwrap();
        assert_eq!(user.role, None);
    }
}
