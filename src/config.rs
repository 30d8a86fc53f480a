//! Environment-driven configuration.
//!
//! Each vendor integration reads its own set of environment variables.
//! A subsystem whose variables are entirely absent is disabled rather
//! than fatal — requests that need it fail with a configuration error,
//! mirroring the per-handler credential checks of a serverless deploy.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default port for the HTTP API.
const DEFAULT_PORT: u16 = 8080;

/// CRM (Zoho-flavored) OAuth and API configuration.
#[derive(Debug, Clone)]
pub struct ZohoConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub refresh_token: SecretString,
    /// Data-center suffix for the accounts and API hosts: `com`, `eu`, `in`.
    pub dc: String,
    /// Module used for single-record provider lead upserts.
    pub lead_module: String,
    /// Redirect URI registered for the one-time authorization-code exchange.
    pub redirect_uri: String,
}

impl ZohoConfig {
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Ok(client_id) = std::env::var("ZOHO_CLIENT_ID") else {
            return Ok(None);
        };
        Ok(Some(Self {
            client_id,
            client_secret: SecretString::from(require_env("ZOHO_CLIENT_SECRET")?),
            refresh_token: SecretString::from(require_env("ZOHO_REFRESH_TOKEN")?),
            dc: std::env::var("ZOHO_DC").unwrap_or_else(|_| "com".to_string()),
            lead_module: std::env::var("ZOHO_MODULE").unwrap_or_else(|_| "Leads".to_string()),
            redirect_uri: std::env::var("ZOHO_REDIRECT_URI").unwrap_or_default(),
        }))
    }

    /// OAuth token endpoint on the accounts host.
    pub fn accounts_url(&self) -> String {
        format!("https://accounts.zoho.{}/oauth/v2/token", self.dc)
    }

    /// Base URL for the CRM REST API.
    pub fn api_domain(&self) -> String {
        format!("https://www.zohoapis.{}/crm/v3", self.dc)
    }
}

/// E-signature (PandaDoc-flavored) configuration.
#[derive(Debug, Clone)]
pub struct PandaDocConfig {
    pub api_key: SecretString,
    pub baa_template_id: String,
    pub contract_template_id: String,
}

impl PandaDocConfig {
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Ok(api_key) = std::env::var("PANDADOC_API_KEY") else {
            return Ok(None);
        };
        Ok(Some(Self {
            api_key: SecretString::from(api_key),
            baa_template_id: require_env("PANDADOC_BAA_TEMPLATE_ID")?,
            contract_template_id: require_env("PANDADOC_CONTRACT_TEMPLATE_ID")?,
        }))
    }
}

/// Telephony (Twilio-flavored) configuration.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: SecretString,
    /// E.164 number calls and texts originate from.
    pub from_number: String,
}

impl TwilioConfig {
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Ok(account_sid) = std::env::var("TWILIO_ACCOUNT_SID") else {
            return Ok(None);
        };
        Ok(Some(Self {
            account_sid,
            auth_token: SecretString::from(require_env("TWILIO_AUTH_TOKEN")?),
            from_number: require_env("TWILIO_PHONE_NUMBER")?,
        }))
    }
}

/// Full service configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub zoho: Option<ZohoConfig>,
    pub pandadoc: Option<PandaDocConfig>,
    pub twilio: Option<TwilioConfig>,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("PRACTICE_SYNC_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PRACTICE_SYNC_PORT".to_string(),
                message: format!("not a valid port number: {raw}"),
            })?,
            Err(_) => DEFAULT_PORT,
        };
        Ok(Self {
            zoho: ZohoConfig::from_env()?,
            pandadoc: PandaDocConfig::from_env()?,
            twilio: TwilioConfig::from_env()?,
            port,
        })
    }
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}
