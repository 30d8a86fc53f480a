//! PandaDoc-flavored e-signature client.
//!
//! Document creation is a three-step vendor protocol: create from a
//! template, send it, then open a short-lived embedded signing session.
//! Each step fails independently with the vendor's response attached.

use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::PandaDocConfig;
use crate::error::EsignError;
use crate::practice::split_display_name;

const PANDADOC_API_URL: &str = "https://api.pandadoc.com/public/v1";

/// Embedded signing sessions expire after 15 minutes.
const SESSION_LIFETIME_SECS: u32 = 900;

/// Which agreement to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    #[serde(rename = "BAA")]
    Baa,
    Contract,
}

impl DocumentType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Baa => "BAA",
            Self::Contract => "Contract",
        }
    }
}

/// Internal signature tri-state, matching the practice contract domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Sent,
    Signed,
}

impl DocumentStatus {
    /// Collapse the vendor's status vocabulary onto the tri-state.
    pub fn from_vendor(vendor_status: &str) -> Self {
        match vendor_status {
            "document.completed" => Self::Signed,
            "document.sent" | "document.viewed" => Self::Sent,
            _ => Self::Pending,
        }
    }
}

/// Result of creating and sending a document.
#[derive(Debug, Clone, Serialize)]
pub struct SigningSession {
    pub document_id: String,
    /// Session identifier used to build the embedded signing URL.
    pub session_id: String,
}

/// Status snapshot for a previously created document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentStatusReport {
    pub document_id: String,
    pub status: DocumentStatus,
    /// The vendor's raw status string, for diagnostics.
    pub vendor_status: String,
}

/// Inbound webhook event from the e-signature vendor.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentWebhookEvent {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

pub struct PandaDocClient {
    config: PandaDocConfig,
    http: reqwest::Client,
    base_url: String,
}

impl PandaDocClient {
    pub fn new(config: PandaDocConfig, http: reqwest::Client) -> Self {
        Self {
            config,
            http,
            base_url: PANDADOC_API_URL.to_string(),
        }
    }

    fn auth_header(&self) -> String {
        format!("API-Key {}", self.config.api_key.expose_secret())
    }

    /// Create a document from the matching template, send it to the
    /// recipient, and open an embedded signing session.
    pub async fn create_and_send(
        &self,
        document_type: DocumentType,
        recipient_email: &str,
        recipient_name: &str,
        practice_name: &str,
    ) -> Result<SigningSession, EsignError> {
        let template_id = match document_type {
            DocumentType::Baa => &self.config.baa_template_id,
            DocumentType::Contract => &self.config.contract_template_id,
        };
        let (first_name, last_name) = split_display_name(recipient_name);

        // Step 1: create from template.
        let create_body = serde_json::json!({
            "name": format!("{} - {practice_name}", document_type.label()),
            "template_uuid": template_id,
            "recipients": [{
                "email": recipient_email,
                "first_name": first_name,
                "last_name": last_name,
                "role": "Signer",
            }],
            "tokens": [
                {"name": "Practice.Name", "value": practice_name},
                {"name": "Signer.Name", "value": recipient_name},
                {"name": "Signer.Email", "value": recipient_email},
            ],
        });
        let created = self
            .post_json("documents".to_string(), "create", &create_body)
            .await?;
        let document_id = created
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| EsignError::InvalidResponse("create response missing id".into()))?
            .to_string();

        // Step 2: send it.
        let send_body = serde_json::json!({
            "message": format!(
                "Please sign the {} to complete your onboarding.",
                document_type.label()
            ),
            "silent": false,
        });
        self.post_json(format!("documents/{document_id}/send"), "send", &send_body)
            .await?;

        // Step 3: embedded signing session.
        let session_body = serde_json::json!({
            "recipient": recipient_email,
            "lifetime": SESSION_LIFETIME_SECS,
        });
        let session = self
            .post_json(
                format!("documents/{document_id}/session"),
                "session",
                &session_body,
            )
            .await?;
        let session_id = session
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| EsignError::InvalidResponse("session response missing id".into()))?
            .to_string();

        tracing::info!(%document_id, document_type = document_type.label(), "document sent for signature");

        Ok(SigningSession {
            document_id,
            session_id,
        })
    }

    /// Fetch the vendor status for a document and map it onto the
    /// internal tri-state.
    pub async fn document_status(
        &self,
        document_id: &str,
    ) -> Result<DocumentStatusReport, EsignError> {
        let response = self
            .http
            .get(format!("{}/documents/{document_id}", self.base_url))
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(EsignError::Vendor {
                step: "status",
                status: status.as_u16(),
                details,
            });
        }
        let body: Value = response.json().await?;
        let vendor_status = body
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(DocumentStatusReport {
            document_id: document_id.to_string(),
            status: DocumentStatus::from_vendor(&vendor_status),
            vendor_status,
        })
    }

    async fn post_json(
        &self,
        path: String,
        step: &'static str,
        body: &Value,
    ) -> Result<Value, EsignError> {
        let response = self
            .http
            .post(format!("{}/{path}", self.base_url))
            .header("Authorization", self.auth_header())
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(EsignError::Vendor {
                step,
                status: status.as_u16(),
                details,
            });
        }
        Ok(response.json().await?)
    }
}
