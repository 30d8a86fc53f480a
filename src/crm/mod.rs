//! CRM integration — pipeline-stage mapping and hierarchy synchronization.
//!
//! The sync path guarantees that one Account, one Contact, and one Deal
//! exist in the external CRM for each practice, linked together, with a
//! field-drop retry that keeps writes flowing when the CRM schema is
//! missing an expected custom field.

pub mod client;
pub mod stage;
pub mod sync;
pub mod token;

pub use client::{CrmApi, FieldMap, SearchKey, WriteOutcome, ZohoClient};
pub use stage::{PipelineStage, map_status_to_stage, stage_for};
pub use sync::{CrmRecordTriple, CrmSync, LeadRecord};
