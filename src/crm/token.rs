//! OAuth token exchange against the CRM accounts host.
//!
//! The refresh-token grant runs once per sync invocation; no token is
//! cached across requests. The authorization-code grant is a one-time
//! operator flow used to obtain the refresh token in the first place.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::config::ZohoConfig;
use crate::error::CrmError;

/// Exchange the configured refresh token for a short-lived access token.
///
/// Fails hard when credentials are rejected; there is nothing useful to
/// do against the CRM without a token.
pub async fn refresh_access_token(
    http: &reqwest::Client,
    config: &ZohoConfig,
) -> Result<SecretString, CrmError> {
    let params = [
        ("refresh_token", config.refresh_token.expose_secret()),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.expose_secret()),
        ("grant_type", "refresh_token"),
    ];

    let response = http.post(config.accounts_url()).form(&params).send().await?;
    let status = response.status();
    let body: Value = response.json().await?;

    if !status.is_success() || body.get("error").is_some() {
        let reason = body
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| status.to_string());
        tracing::error!(%reason, "CRM token refresh failed");
        return Err(CrmError::TokenRefresh(reason));
    }

    body.get("access_token")
        .and_then(Value::as_str)
        .map(|token| SecretString::from(token.to_string()))
        .ok_or_else(|| CrmError::InvalidResponse("token response missing access_token".into()))
}

/// One-time authorization-code exchange for operator setup.
///
/// Returns the vendor's raw token payload (access token, refresh token,
/// expiry) so the operator can copy the refresh token into the
/// environment. Never stored server-side.
pub async fn exchange_authorization_code(
    http: &reqwest::Client,
    config: &ZohoConfig,
    code: &str,
) -> Result<Value, CrmError> {
    let params = [
        ("code", code),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.expose_secret()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("grant_type", "authorization_code"),
    ];

    let response = http.post(config.accounts_url()).form(&params).send().await?;
    let status = response.status();
    let body: Value = response.json().await?;

    if !status.is_success() || body.get("error").is_some() {
        let reason = body
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| status.to_string());
        return Err(CrmError::TokenRefresh(reason));
    }

    Ok(body)
}
