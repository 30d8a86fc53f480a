//! Zoho-flavored CRM REST client.
//!
//! The orchestrator talks to the CRM through the [`CrmApi`] trait so it
//! can be exercised against an in-memory double in tests. [`ZohoClient`]
//! is the production implementation: constructed explicitly per sync
//! invocation with a freshly refreshed token, owned by the caller.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};

use crate::config::ZohoConfig;
use crate::error::CrmError;

use super::token::refresh_access_token;

/// A record payload: CRM field API names to values.
pub type FieldMap = Map<String, Value>;

/// Exact-match, single-field search key.
#[derive(Debug, Clone)]
pub struct SearchKey {
    pub field: &'static str,
    pub value: String,
}

impl SearchKey {
    pub fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }

    /// Vendor criteria syntax: `(Field:equals:value)`.
    pub fn criteria(&self) -> String {
        format!("({}:equals:{})", self.field, self.value)
    }
}

/// Outcome of a single create/update attempt.
#[derive(Debug, Clone)]
pub enum WriteOutcome {
    /// The record was written; `id` is the CRM's opaque identifier.
    Written { id: String },
    /// The CRM rejected exactly one field as unknown/invalid.
    /// Recoverable: drop the field and rerun the upsert.
    UnknownField { api_name: String },
    /// Any other rejection; `message` is the vendor's raw complaint.
    Rejected { message: String },
}

/// Minimal CRM surface the sync logic needs.
#[async_trait]
pub trait CrmApi: Send + Sync {
    /// Exact-match search; first hit or none. Ties are broken by the
    /// CRM's own result ordering.
    async fn search_record(
        &self,
        module: &str,
        key: &SearchKey,
    ) -> Result<Option<String>, CrmError>;

    async fn create_record(
        &self,
        module: &str,
        fields: &FieldMap,
    ) -> Result<WriteOutcome, CrmError>;

    async fn update_record(
        &self,
        module: &str,
        id: &str,
        fields: &FieldMap,
    ) -> Result<WriteOutcome, CrmError>;
}

/// Production CRM client over the vendor REST API.
pub struct ZohoClient {
    api_domain: String,
    access_token: SecretString,
    http: reqwest::Client,
}

impl ZohoClient {
    /// Refresh the access token and build a request-scoped client.
    pub async fn connect(config: &ZohoConfig, http: reqwest::Client) -> Result<Self, CrmError> {
        let access_token = refresh_access_token(&http, config).await?;
        Ok(Self {
            api_domain: config.api_domain(),
            access_token,
            http,
        })
    }

    fn auth_header(&self) -> String {
        format!("Zoho-oauthtoken {}", self.access_token.expose_secret())
    }

    async fn write(
        &self,
        method: reqwest::Method,
        url: String,
        fields: &FieldMap,
    ) -> Result<WriteOutcome, CrmError> {
        let payload = serde_json::json!({ "data": [fields] });
        let response = self
            .http
            .request(method, url)
            .header("Authorization", self.auth_header())
            .json(&payload)
            .send()
            .await?;
        let body: Value = response.json().await?;
        Ok(parse_write_response(&body))
    }
}

#[async_trait]
impl CrmApi for ZohoClient {
    async fn search_record(
        &self,
        module: &str,
        key: &SearchKey,
    ) -> Result<Option<String>, CrmError> {
        let url = format!("{}/{}/search", self.api_domain, module);
        let response = self
            .http
            .get(url)
            .query(&[("criteria", key.criteria())])
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        // Only a 200 carries matches; 204 means no content and anything
        // else is treated as "not found" so the write path decides.
        if response.status() != reqwest::StatusCode::OK {
            return Ok(None);
        }
        let body: Value = response.json().await?;
        Ok(body
            .pointer("/data/0/id")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    async fn create_record(
        &self,
        module: &str,
        fields: &FieldMap,
    ) -> Result<WriteOutcome, CrmError> {
        let url = format!("{}/{}", self.api_domain, module);
        self.write(reqwest::Method::POST, url, fields).await
    }

    async fn update_record(
        &self,
        module: &str,
        id: &str,
        fields: &FieldMap,
    ) -> Result<WriteOutcome, CrmError> {
        let url = format!("{}/{}/{}", self.api_domain, module, id);
        self.write(reqwest::Method::PUT, url, fields).await
    }
}

/// Classify a vendor write response.
///
/// `INVALID_DATA` naming a field api_name is the one recoverable case;
/// everything else that isn't a success surfaces the vendor's message
/// (or the whole body when there is none).
fn parse_write_response(body: &Value) -> WriteOutcome {
    let first = body.pointer("/data/0");

    if let Some(entry) = first {
        if entry.get("status").and_then(Value::as_str) == Some("success") {
            if let Some(id) = entry.pointer("/details/id").and_then(Value::as_str) {
                return WriteOutcome::Written { id: id.to_string() };
            }
        }
        if entry.get("code").and_then(Value::as_str) == Some("INVALID_DATA") {
            if let Some(api_name) = entry.pointer("/details/api_name").and_then(Value::as_str) {
                return WriteOutcome::UnknownField {
                    api_name: api_name.to_string(),
                };
            }
        }
        if let Some(message) = entry.get("message").and_then(Value::as_str) {
            return WriteOutcome::Rejected {
                message: message.to_string(),
            };
        }
    }

    WriteOutcome::Rejected {
        message: body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_response_yields_id() {
        let body = serde_json::json!({
            "data": [{"status": "success", "details": {"id": "123456"}}]
        });
        match parse_write_response(&body) {
            WriteOutcome::Written { id } => assert_eq!(id, "123456"),
            other => panic!("expected Written, got {other:?}"),
        }
    }

    #[test]
    fn invalid_data_with_api_name_is_recoverable() {
        let body = serde_json::json!({
            "data": [{
                "status": "error",
                "code": "INVALID_DATA",
                "message": "the given data is invalid",
                "details": {"api_name": "NPI"}
            }]
        });
        match parse_write_response(&body) {
            WriteOutcome::UnknownField { api_name } => assert_eq!(api_name, "NPI"),
            other => panic!("expected UnknownField, got {other:?}"),
        }
    }

    #[test]
    fn other_errors_carry_the_vendor_message() {
        let body = serde_json::json!({
            "data": [{
                "status": "error",
                "code": "MANDATORY_NOT_FOUND",
                "message": "required field not found"
            }]
        });
        match parse_write_response(&body) {
            WriteOutcome::Rejected { message } => assert_eq!(message, "required field not found"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn unrecognized_body_is_rejected_with_full_body() {
        let body = serde_json::json!({"code": "INVALID_TOKEN"});
        match parse_write_response(&body) {
            WriteOutcome::Rejected { message } => assert!(message.contains("INVALID_TOKEN")),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn search_key_criteria_syntax() {
        let key = SearchKey::new("Account_Name", "Sunrise Family Care");
        assert_eq!(key.criteria(), "(Account_Name:equals:Sunrise Family Care)");
    }
}
