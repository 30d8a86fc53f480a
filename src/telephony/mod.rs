//! Telephony integration — outbound SMS/voice and inbound webhooks.

pub mod client;
pub mod webhook;

pub use client::{CallOptions, DispatchReceipt, TwilioClient};
pub use webhook::{SmsReplyAction, TwilioWebhookPayload, twiml_message};
