//! Integration tests for the CRM upsert orchestrator.
//!
//! Each test drives `CrmSync` against an in-memory CRM double that
//! implements the `CrmApi` trait, records every attempted write, and can
//! be told to reject fields as unknown or reject whole writes outright.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use practice_sync::crm::{CrmApi, CrmSync, FieldMap, LeadRecord, SearchKey, WriteOutcome};
use practice_sync::error::CrmError;
use practice_sync::practice::{ContractStatus, Practice};

/// One logged write attempt: operation, module, payload.
type Attempt = (&'static str, String, FieldMap);

/// In-memory CRM double. Records are indexed by every (module, field,
/// value) pair they were written with, so the exact-match search works
/// the same way regardless of which field is the key.
#[derive(Default)]
struct MockCrm {
    records: Mutex<HashMap<(String, String, String), String>>,
    unknown_fields: Mutex<HashSet<(String, String)>>,
    hard_reject: Mutex<HashMap<String, String>>,
    attempts: Mutex<Vec<Attempt>>,
    next_id: AtomicU64,
}

impl MockCrm {
    fn reject_field(&self, module: &str, field: &str) {
        self.unknown_fields
            .lock()
            .unwrap()
            .insert((module.to_string(), field.to_string()));
    }

    fn reject_module(&self, module: &str, message: &str) {
        self.hard_reject
            .lock()
            .unwrap()
            .insert(module.to_string(), message.to_string());
    }

    fn attempts_for(&self, module: &str) -> Vec<Attempt> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, m, _)| m == module)
            .cloned()
            .collect()
    }

    fn module_order(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for (_, module, _) in self.attempts.lock().unwrap().iter() {
            if !seen.contains(module) {
                seen.push(module.clone());
            }
        }
        seen
    }

    fn classify(&self, module: &str, fields: &FieldMap) -> Option<WriteOutcome> {
        if let Some(message) = self.hard_reject.lock().unwrap().get(module) {
            return Some(WriteOutcome::Rejected {
                message: message.clone(),
            });
        }
        let unknown = self.unknown_fields.lock().unwrap();
        for name in fields.keys() {
            if unknown.contains(&(module.to_string(), name.clone())) {
                return Some(WriteOutcome::UnknownField {
                    api_name: name.clone(),
                });
            }
        }
        None
    }

    fn index(&self, module: &str, fields: &FieldMap, id: &str) {
        let mut records = self.records.lock().unwrap();
        for (name, value) in fields {
            if let Some(value) = value.as_str() {
                records.insert(
                    (module.to_string(), name.clone(), value.to_string()),
                    id.to_string(),
                );
            }
        }
    }
}

#[async_trait]
impl CrmApi for MockCrm {
    async fn search_record(
        &self,
        module: &str,
        key: &SearchKey,
    ) -> Result<Option<String>, CrmError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(module.to_string(), key.field.to_string(), key.value.clone()))
            .cloned())
    }

    async fn create_record(
        &self,
        module: &str,
        fields: &FieldMap,
    ) -> Result<WriteOutcome, CrmError> {
        self.attempts
            .lock()
            .unwrap()
            .push(("create", module.to_string(), fields.clone()));
        if let Some(outcome) = self.classify(module, fields) {
            return Ok(outcome);
        }
        let id = format!("{module}-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.index(module, fields, &id);
        Ok(WriteOutcome::Written { id })
    }

    async fn update_record(
        &self,
        module: &str,
        id: &str,
        fields: &FieldMap,
    ) -> Result<WriteOutcome, CrmError> {
        self.attempts
            .lock()
            .unwrap()
            .push(("update", module.to_string(), fields.clone()));
        if let Some(outcome) = self.classify(module, fields) {
            return Ok(outcome);
        }
        self.index(module, fields, id);
        Ok(WriteOutcome::Written { id: id.to_string() })
    }
}

fn practice() -> Practice {
    Practice {
        practice_name: "Sunrise Family Care".into(),
        internal_practice_id: "prac_001".into(),
        provider_name: "Jane Doe".into(),
        provider_email: "jane@sunrise.example".into(),
        provider_phone: Some("+15550100".into()),
        provider_address: Some("1 Main St".into()),
        provider_npi: Some("1234567890".into()),
        provider_url: None,
        medicare_potential: None,
        other_potential: None,
        onboarding_status: "Step 2 enrollment".into(),
        contract_status: ContractStatus::Pending,
    }
}

fn sync_over(crm: std::sync::Arc<MockCrm>) -> CrmSync {
    CrmSync::new(crm)
}

#[tokio::test]
async fn creates_hierarchy_in_order_and_links_records() {
    let crm = std::sync::Arc::new(MockCrm::default());
    let sync = sync_over(crm.clone());

    let triple = sync.upsert_hierarchy(&practice()).await.unwrap();

    assert_eq!(
        crm.module_order(),
        vec!["Accounts".to_string(), "Contacts".to_string(), "Deals".to_string()]
    );

    let contact = crm.attempts_for("Contacts").pop().unwrap().2;
    assert_eq!(contact["Account_Name"], triple.account_id.as_str());

    let deal = crm.attempts_for("Deals").pop().unwrap().2;
    assert_eq!(deal["Account_Name"], triple.account_id.as_str());
    assert_eq!(deal["Contact_Name"], triple.contact_id.as_str());
    assert_eq!(deal["Deal_Name"], "Onboarding - Sunrise Family Care");
    assert_eq!(deal["Stage"], "Ready for contract");
}

#[tokio::test]
async fn resync_updates_the_same_records() {
    let crm = std::sync::Arc::new(MockCrm::default());
    let sync = sync_over(crm.clone());

    let first = sync.upsert_hierarchy(&practice()).await.unwrap();
    let second = sync.upsert_hierarchy(&practice()).await.unwrap();

    assert_eq!(first.account_id, second.account_id);
    assert_eq!(first.contact_id, second.contact_id);
    assert_eq!(first.deal_id, second.deal_id);

    // First round creates, second round updates in place.
    let account_ops: Vec<&'static str> = crm
        .attempts_for("Accounts")
        .iter()
        .map(|(op, _, _)| *op)
        .collect();
    assert_eq!(account_ops, vec!["create", "update"]);
}

#[tokio::test]
async fn unknown_field_is_dropped_and_other_fields_survive() {
    let crm = std::sync::Arc::new(MockCrm::default());
    crm.reject_field("Accounts", "External_ID");
    let sync = sync_over(crm.clone());

    sync.upsert_hierarchy(&practice()).await.unwrap();

    let attempts = crm.attempts_for("Accounts");
    assert_eq!(attempts.len(), 2, "one rejection, one successful retry");

    let (_, _, first) = &attempts[0];
    let (_, _, retry) = &attempts[1];
    assert!(first.contains_key("External_ID"));
    assert!(!retry.contains_key("External_ID"));
    for name in first.keys().filter(|n| n.as_str() != "External_ID") {
        assert_eq!(first[name], retry[name], "field {name} changed on retry");
    }
}

#[tokio::test]
async fn exhausting_every_field_fails_without_an_empty_write() {
    let crm = std::sync::Arc::new(MockCrm::default());
    for field in ["Account_Name", "External_ID", "Phone", "Billing_Street"] {
        crm.reject_field("Accounts", field);
    }
    let sync = sync_over(crm.clone());

    let mut p = practice();
    p.provider_npi = None;
    p.provider_url = None;
    let err = sync.upsert_hierarchy(&p).await.unwrap_err();

    match err {
        CrmError::PayloadExhausted { module } => assert_eq!(module, "Accounts"),
        other => panic!("expected PayloadExhausted, got {other:?}"),
    }
    for (_, _, payload) in crm.attempts_for("Accounts") {
        assert!(!payload.is_empty(), "an empty payload was sent to the CRM");
    }
}

#[tokio::test]
async fn other_rejections_surface_the_vendor_message() {
    let crm = std::sync::Arc::new(MockCrm::default());
    crm.reject_module("Deals", "required field not found");
    let sync = sync_over(crm.clone());

    let err = sync.upsert_hierarchy(&practice()).await.unwrap_err();
    match err {
        CrmError::WriteRejected {
            module,
            message,
            payload,
        } => {
            assert_eq!(module, "Deals");
            assert_eq!(message, "required field not found");
            assert!(payload.get("Deal_Name").is_some());
        }
        other => panic!("expected WriteRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn single_token_provider_name_fills_both_contact_names() {
    let crm = std::sync::Arc::new(MockCrm::default());
    let sync = sync_over(crm.clone());

    let mut p = practice();
    p.provider_name = "Solo".into();
    sync.upsert_hierarchy(&p).await.unwrap();

    let contact = crm.attempts_for("Contacts").pop().unwrap().2;
    assert_eq!(contact["First_Name"], "Solo");
    assert_eq!(contact["Last_Name"], "Solo");
}

#[tokio::test]
async fn signed_step_five_deal_is_closed_won() {
    let crm = std::sync::Arc::new(MockCrm::default());
    let sync = sync_over(crm.clone());

    let mut p = practice();
    p.onboarding_status = "Step 5 complete".into();
    p.contract_status = ContractStatus::Signed;
    sync.upsert_hierarchy(&p).await.unwrap();

    let deal = crm.attempts_for("Deals").pop().unwrap().2;
    assert_eq!(deal["Stage"], "Closed Won / Live");
    assert_eq!(deal["Contract_Status"], "Signed");
    assert_eq!(deal["Onboarding_Status"], "Step 5 complete");
}

#[tokio::test]
async fn lead_upsert_is_idempotent_on_email() {
    let crm = std::sync::Arc::new(MockCrm::default());
    let sync = sync_over(crm.clone());

    let lead = LeadRecord {
        email: "solo@example.org".into(),
        first_name: Some("Sam".into()),
        last_name: Some("Solo".into()),
        ..Default::default()
    };
    let first = sync.upsert_lead("Leads", &lead).await.unwrap();
    let second = sync.upsert_lead("Leads", &lead).await.unwrap();
    assert_eq!(first, second);

    let ops: Vec<&'static str> = crm
        .attempts_for("Leads")
        .iter()
        .map(|(op, _, _)| *op)
        .collect();
    assert_eq!(ops, vec!["create", "update"]);
}
