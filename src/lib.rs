//! practice-sync — backend integrations for practice activation.

pub mod config;
pub mod crm;
pub mod eligibility;
pub mod error;
pub mod esign;
pub mod practice;
pub mod server;
pub mod telephony;
