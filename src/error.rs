//! Error types for practice-sync.

use serde_json::Value;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("CRM error: {0}")]
    Crm(#[from] CrmError),

    #[error("E-signature error: {0}")]
    Esign(#[from] EsignError),

    #[error("Telephony error: {0}")]
    Telephony(#[from] TelephonyError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("{subsystem} is not configured. {hint}")]
    SubsystemDisabled { subsystem: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// CRM integration errors.
///
/// Unknown-field rejections are handled inside the upsert loop and never
/// reach callers as errors; everything here is terminal for the current
/// sync attempt.
#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    #[error("Access token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("CRM request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The CRM rejected a write for a reason other than an unknown field.
    /// Carries the vendor's raw message and the exact payload that was
    /// attempted, for operator diagnosis.
    #[error("CRM [{module}]: {message} (payload: {payload})")]
    WriteRejected {
        module: String,
        message: String,
        payload: Value,
    },

    /// Every field in the payload was rejected as unknown; there is
    /// nothing left worth sending.
    #[error("CRM [{module}]: all fields rejected, refusing to send an empty payload")]
    PayloadExhausted { module: String },

    #[error("Unexpected response from CRM: {0}")]
    InvalidResponse(String),
}

/// E-signature vendor errors.
#[derive(Debug, thiserror::Error)]
pub enum EsignError {
    #[error("E-signature request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("PandaDoc {step} failed with status {status}: {details}")]
    Vendor {
        step: &'static str,
        status: u16,
        details: String,
    },

    #[error("Unexpected response from PandaDoc: {0}")]
    InvalidResponse(String),
}

/// Telephony vendor errors.
#[derive(Debug, thiserror::Error)]
pub enum TelephonyError {
    #[error("Telephony request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Twilio rejected the request with status {status}: {details}")]
    Vendor { status: u16, details: String },
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
