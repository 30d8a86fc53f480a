//! CRM hierarchy synchronization.
//!
//! `upsert_hierarchy` guarantees one Account, one Contact, and one Deal
//! per practice, strictly in that order — each write links to the IDs
//! resolved by the previous one. No IDs are cached between invocations;
//! every sync re-runs the search step against the natural keys.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CrmError;
use crate::practice::{Practice, split_display_name};

use super::client::{CrmApi, FieldMap, SearchKey, WriteOutcome};
use super::stage::stage_for;

/// The durable result of one sync: opaque CRM identifiers, owned by the
/// external CRM and never deleted by this service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmRecordTriple {
    pub account_id: String,
    pub contact_id: String,
    pub deal_id: String,
}

/// Input for the single-record provider lead upsert.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadRecord {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub practice_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub npi: Option<String>,
    pub status: Option<String>,
    pub contract_status: Option<String>,
}

/// Orchestrates upserts against an injected CRM client.
pub struct CrmSync {
    api: Arc<dyn CrmApi>,
}

impl CrmSync {
    pub fn new(api: Arc<dyn CrmApi>) -> Self {
        Self { api }
    }

    /// Ensure Account, Contact, and Deal records exist for the practice,
    /// linked together, returning their IDs.
    ///
    /// Idempotent on the natural keys (practice name, provider email,
    /// deal name) — repeated calls update the same records in place. The
    /// Deal's closing date is the exception: recomputed relative to call
    /// time on every sync, so it drifts forward across resyncs.
    pub async fn upsert_hierarchy(&self, practice: &Practice) -> Result<CrmRecordTriple, CrmError> {
        let account_id = self
            .upsert_record(
                "Accounts",
                SearchKey::new("Account_Name", practice.practice_name.clone()),
                account_fields(practice),
            )
            .await?;

        let contact_id = self
            .upsert_record(
                "Contacts",
                SearchKey::new("Email", practice.provider_email.clone()),
                contact_fields(practice, &account_id),
            )
            .await?;

        let deal_name = deal_name(practice);
        let deal_id = self
            .upsert_record(
                "Deals",
                SearchKey::new("Deal_Name", deal_name.clone()),
                deal_fields(practice, &account_id, &contact_id, &deal_name),
            )
            .await?;

        tracing::info!(
            practice = %practice.practice_name,
            %account_id,
            %contact_id,
            %deal_id,
            "CRM hierarchy sync complete"
        );

        Ok(CrmRecordTriple {
            account_id,
            contact_id,
            deal_id,
        })
    }

    /// Single-record lead upsert keyed on email, for the flat provider
    /// sync endpoint. Same sub-protocol as the hierarchy steps.
    pub async fn upsert_lead(&self, module: &str, lead: &LeadRecord) -> Result<String, CrmError> {
        self.upsert_record(
            module,
            SearchKey::new("Email", lead.email.clone()),
            lead_fields(lead),
        )
        .await
    }

    /// Shared single-record upsert sub-protocol.
    ///
    /// Search → update-or-create → classify. When the CRM rejects one
    /// field as unknown, that field joins the excluded set and the whole
    /// sub-protocol reruns, search included — dropping a field never
    /// changes the key. The loop is bounded by the field count, so it
    /// terminates even if the CRM keeps naming fields; an empty remaining
    /// payload is a terminal failure rather than an empty-body write.
    async fn upsert_record(
        &self,
        module: &str,
        key: SearchKey,
        fields: FieldMap,
    ) -> Result<String, CrmError> {
        let mut excluded: HashSet<String> = HashSet::new();
        let max_attempts = fields.len();

        for _ in 0..=max_attempts {
            let payload: FieldMap = fields
                .iter()
                .filter(|(name, _)| !excluded.contains(name.as_str()))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            if payload.is_empty() {
                return Err(CrmError::PayloadExhausted {
                    module: module.to_string(),
                });
            }

            let existing = self.api.search_record(module, &key).await?;
            let outcome = match &existing {
                Some(id) => self.api.update_record(module, id, &payload).await?,
                None => self.api.create_record(module, &payload).await?,
            };

            match outcome {
                WriteOutcome::Written { id } => return Ok(id),
                WriteOutcome::UnknownField { api_name } => {
                    tracing::warn!(
                        module,
                        field = %api_name,
                        "CRM rejected field as unknown; retrying without it"
                    );
                    excluded.insert(api_name);
                }
                WriteOutcome::Rejected { message } => {
                    tracing::error!(module, %message, "CRM write rejected");
                    return Err(CrmError::WriteRejected {
                        module: module.to_string(),
                        message,
                        payload: Value::Object(payload),
                    });
                }
            }
        }

        Err(CrmError::PayloadExhausted {
            module: module.to_string(),
        })
    }
}

/// Deal names are deterministic so resyncs find the same record.
fn deal_name(practice: &Practice) -> String {
    let subject = if practice.practice_name.is_empty() {
        &practice.provider_name
    } else {
        &practice.practice_name
    };
    format!("Onboarding - {subject}")
}

/// Closing-date estimate: one calendar month out, clamped to month end.
/// Recomputed fresh on every sync by design (documented drift).
pub(crate) fn closing_date_estimate(today: NaiveDate) -> NaiveDate {
    today.checked_add_months(Months::new(1)).unwrap_or(today)
}

fn account_fields(practice: &Practice) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert(
        "Account_Name".into(),
        Value::from(practice.practice_name.clone()),
    );
    // Custom field; dropped on retry when the CRM admin hasn't created it.
    fields.insert(
        "External_ID".into(),
        Value::from(practice.internal_practice_id.clone()),
    );
    insert_opt(&mut fields, "Phone", practice.provider_phone.as_deref());
    insert_opt(
        &mut fields,
        "Billing_Street",
        practice.provider_address.as_deref(),
    );
    insert_opt(&mut fields, "Website", practice.provider_url.as_deref());
    fields
}

fn contact_fields(practice: &Practice, account_id: &str) -> FieldMap {
    let (first_name, last_name) = split_display_name(&practice.provider_name);
    let mut fields = FieldMap::new();
    fields.insert("First_Name".into(), Value::from(first_name));
    fields.insert("Last_Name".into(), Value::from(last_name));
    fields.insert("Email".into(), Value::from(practice.provider_email.clone()));
    // Link to the resolved Account.
    fields.insert("Account_Name".into(), Value::from(account_id));
    insert_opt(&mut fields, "Phone", practice.provider_phone.as_deref());
    insert_opt(
        &mut fields,
        "Mailing_Street",
        practice.provider_address.as_deref(),
    );
    insert_opt(&mut fields, "NPI", practice.provider_npi.as_deref());
    fields
}

fn deal_fields(
    practice: &Practice,
    account_id: &str,
    contact_id: &str,
    deal_name: &str,
) -> FieldMap {
    let stage = stage_for(practice.onboarding_step(), practice.contract_status);
    let closing = closing_date_estimate(Utc::now().date_naive());

    let mut fields = FieldMap::new();
    fields.insert("Deal_Name".into(), Value::from(deal_name));
    fields.insert("Account_Name".into(), Value::from(account_id));
    fields.insert("Contact_Name".into(), Value::from(contact_id));
    fields.insert("Stage".into(), Value::from(stage.label()));
    fields.insert("Amount".into(), Value::from(0));
    fields.insert(
        "Closing_Date".into(),
        Value::from(closing.format("%Y-%m-%d").to_string()),
    );
    fields.insert(
        "Onboarding_Status".into(),
        Value::from(practice.onboarding_status.clone()),
    );
    fields.insert(
        "Contract_Status".into(),
        Value::from(practice.contract_status.to_string()),
    );
    fields.insert(
        "Internal_ID".into(),
        Value::from(practice.internal_practice_id.clone()),
    );
    insert_opt(
        &mut fields,
        "Medicare_Potential",
        practice.medicare_potential.as_deref(),
    );
    insert_opt(
        &mut fields,
        "Other_Potential",
        practice.other_potential.as_deref(),
    );
    fields
}

fn lead_fields(lead: &LeadRecord) -> FieldMap {
    let practice = lead.practice_name.as_deref().unwrap_or("");
    let mut fields = FieldMap::new();
    fields.insert("Email".into(), Value::from(lead.email.clone()));
    fields.insert(
        "Company".into(),
        Value::from(if practice.is_empty() {
            "Independent Provider"
        } else {
            practice
        }),
    );
    fields.insert(
        "Last_Name".into(),
        Value::from(
            lead.last_name
                .clone()
                .or_else(|| lead.practice_name.clone())
                .unwrap_or_else(|| "Provider".to_string()),
        ),
    );
    fields.insert(
        "First_Name".into(),
        Value::from(lead.first_name.clone().unwrap_or_default()),
    );
    fields.insert(
        "Phone".into(),
        Value::from(lead.phone.clone().unwrap_or_default()),
    );
    fields.insert(
        "Street".into(),
        Value::from(lead.address.clone().unwrap_or_default()),
    );
    fields.insert(
        "NPI_Number".into(),
        Value::from(lead.npi.clone().unwrap_or_default()),
    );
    fields.insert(
        "Onboarding_Status".into(),
        Value::from(lead.status.clone().unwrap_or_else(|| "Initiated".to_string())),
    );
    fields.insert(
        "Contract_Status".into(),
        Value::from(
            lead.contract_status
                .clone()
                .unwrap_or_else(|| "Pending".to_string()),
        ),
    );
    fields
}

fn insert_opt(fields: &mut FieldMap, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        fields.insert(name.to_string(), Value::from(value));
    }
}
