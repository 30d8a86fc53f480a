//! Twilio-flavored REST client for SMS and voice.
//!
//! Bulk sends fan out sequentially with a short gap between calls; a
//! vendor rejection for one recipient is captured in that recipient's
//! receipt instead of aborting the batch.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;

use crate::config::TwilioConfig;
use crate::error::TelephonyError;

const TWILIO_API_URL: &str = "https://api.twilio.com/2010-04-01";

/// Pause between dispatches in a multi-recipient batch.
const BATCH_DISPATCH_GAP: Duration = Duration::from_millis(500);

/// Per-recipient outcome of a batch send or call.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReceipt {
    /// Vendor identifier; absent when the dispatch failed.
    pub sid: Option<String>,
    pub to: String,
    pub status: String,
}

/// Options for outbound voice calls.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// URL serving TwiML instructions for the call.
    pub twiml_url: String,
    pub record: bool,
    /// Vendor answering-machine detection mode, e.g. `Enable` or
    /// `DetectMessageEnd`.
    pub machine_detection: Option<String>,
    /// Where the vendor posts call lifecycle updates.
    pub status_callback: Option<String>,
}

pub struct TwilioClient {
    account_sid: String,
    auth_token: SecretString,
    from_number: String,
    http: reqwest::Client,
    base_url: String,
}

impl TwilioClient {
    pub fn new(config: TwilioConfig, http: reqwest::Client) -> Self {
        Self {
            account_sid: config.account_sid,
            auth_token: config.auth_token,
            from_number: config.from_number,
            http,
            base_url: TWILIO_API_URL.to_string(),
        }
    }

    /// Send an SMS to each recipient, returning one receipt per number.
    pub async fn send_sms(
        &self,
        recipients: &[String],
        body: &str,
        status_callback: Option<&str>,
    ) -> Vec<DispatchReceipt> {
        let mut receipts = Vec::with_capacity(recipients.len());
        for (i, to) in recipients.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(BATCH_DISPATCH_GAP).await;
            }
            let mut form = vec![
                ("To", to.as_str()),
                ("From", self.from_number.as_str()),
                ("Body", body),
            ];
            if let Some(callback) = status_callback {
                form.push(("StatusCallback", callback));
            }
            receipts.push(self.dispatch("Messages.json", to, &form).await);
        }
        receipts
    }

    /// Place a call to each recipient, returning one receipt per number.
    pub async fn make_call(
        &self,
        recipients: &[String],
        options: &CallOptions,
    ) -> Vec<DispatchReceipt> {
        let mut receipts = Vec::with_capacity(recipients.len());
        for (i, to) in recipients.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(BATCH_DISPATCH_GAP).await;
            }
            let mut form = vec![
                ("To", to.as_str()),
                ("From", self.from_number.as_str()),
                ("Url", options.twiml_url.as_str()),
            ];
            if options.record {
                form.push(("Record", "true"));
            }
            if let Some(mode) = options.machine_detection.as_deref() {
                form.push(("MachineDetection", mode));
            }
            if let Some(callback) = options.status_callback.as_deref() {
                form.push(("StatusCallback", callback));
                form.push(("StatusCallbackMethod", "POST"));
            }
            receipts.push(self.dispatch("Calls.json", to, &form).await);
        }
        receipts
    }

    /// One vendor round-trip; failures become a `failed` receipt.
    async fn dispatch(
        &self,
        resource: &str,
        to: &str,
        form: &[(&str, &str)],
    ) -> DispatchReceipt {
        match self.post_form(resource, form).await {
            Ok(body) => DispatchReceipt {
                sid: body
                    .get("sid")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                to: to.to_string(),
                status: body
                    .get("status")
                    .and_then(Value::as_str)
                    .unwrap_or("queued")
                    .to_string(),
            },
            Err(e) => {
                tracing::warn!(%to, error = %e, "telephony dispatch failed");
                DispatchReceipt {
                    sid: None,
                    to: to.to_string(),
                    status: "failed".to_string(),
                }
            }
        }
    }

    async fn post_form(
        &self,
        resource: &str,
        form: &[(&str, &str)],
    ) -> Result<Value, TelephonyError> {
        let url = format!(
            "{}/Accounts/{}/{resource}",
            self.base_url, self.account_sid
        );
        let response = self
            .http
            .post(url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(TelephonyError::Vendor {
                status: status.as_u16(),
                details,
            });
        }
        Ok(response.json().await?)
    }
}
