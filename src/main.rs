use std::sync::Arc;

use tower_http::cors::CorsLayer;

use practice_sync::config::AppConfig;
use practice_sync::esign::PandaDocClient;
use practice_sync::server::{AppState, api_routes};
use practice_sync::telephony::TwilioClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    let http = reqwest::Client::new();

    eprintln!("practice-sync v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/api", config.port);
    eprintln!(
        "   CRM sync: {}",
        if config.zoho.is_some() { "enabled" } else { "disabled (ZOHO_* unset)" }
    );
    eprintln!(
        "   E-signature: {}",
        if config.pandadoc.is_some() { "enabled" } else { "disabled (PANDADOC_* unset)" }
    );
    eprintln!(
        "   Telephony: {}",
        if config.twilio.is_some() { "enabled" } else { "disabled (TWILIO_* unset)" }
    );

    let state = AppState {
        zoho: config.zoho,
        esign: config
            .pandadoc
            .map(|c| Arc::new(PandaDocClient::new(c, http.clone()))),
        telephony: config
            .twilio
            .map(|c| Arc::new(TwilioClient::new(c, http.clone()))),
        http,
    };

    // The browser frontend is served from a different origin in dev.
    let app = api_routes(state).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
