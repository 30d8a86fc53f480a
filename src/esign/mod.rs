//! E-signature integration — document creation, sending, and status.

pub mod client;

pub use client::{
    DocumentStatus, DocumentStatusReport, DocumentType, DocumentWebhookEvent, PandaDocClient,
    SigningSession,
};
