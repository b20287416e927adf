//! Leadline server binary

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use leadline_config::{load_settings, Settings};
use leadline_server::{create_router, AppState};
use leadline_telephony::{TelephonyProvider, TelnyxConfig, TelnyxProvider, TwilioConfig, TwilioProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,leadline=debug")),
        )
        .init();

    let settings = load_settings().context("failed to load settings")?;
    let provider = build_provider(&settings).context("failed to construct telephony provider")?;

    let state = AppState::new(settings.clone(), provider, None)
        .map_err(|e| anyhow::anyhow!("failed to build application state: {}", e))?;

    // safety net for sessions stranded by dropped webhooks
    let _reconciler = state.tracker.start_reconciler();

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(%addr, provider = %settings.telephony.provider, "leadline listening");

    axum::serve(listener, create_router(state))
        .await
        .context("server error")?;

    Ok(())
}

fn build_provider(settings: &Settings) -> anyhow::Result<Arc<dyn TelephonyProvider>> {
    let telephony = &settings.telephony;
    let timeout = Duration::from_secs(telephony.request_timeout_seconds);

    match telephony.provider.as_str() {
        "twilio" => Ok(Arc::new(TwilioProvider::new(TwilioConfig {
            account_sid: telephony.account_sid.clone(),
            auth_token: telephony.auth_token.clone(),
            from_number: telephony.from_number.clone(),
            timeout,
        })?)),
        "telnyx" => Ok(Arc::new(TelnyxProvider::new(TelnyxConfig {
            api_key: telephony.api_key.clone(),
            connection_id: telephony.connection_id.clone(),
            from_number: telephony.from_number.clone(),
            timeout,
        })?)),
        other => anyhow::bail!("unknown telephony provider: {}", other),
    }
}
