//! Telephony provider interface

use async_trait::async_trait;

use leadline_core::ContactAddress;

use crate::events::ProviderKind;
use crate::CallError;

/// Callback URLs handed to the provider when placing a call
#[derive(Debug, Clone)]
pub struct CallbackUrls {
    /// Answer URL (instructions for the connected call)
    pub voice_url: String,
    /// Status callback URL for lifecycle events
    pub status_callback: String,
}

impl CallbackUrls {
    /// Build the standard callback set for a session id against the public
    /// base URL
    pub fn for_session(base_url: &str, session_id: uuid::Uuid) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            voice_url: format!("{}/api/calls/answer?session_id={}", base, session_id),
            status_callback: format!("{}/api/calls/status?session_id={}", base, session_id),
        }
    }
}

/// Telephony provider REST surface
///
/// Implementations:
/// - `TwilioProvider`
/// - `TelnyxProvider`
///
/// All operations are bounded by the client timeout; a timeout is a
/// terminal failure for the operation and is not retried here.
#[async_trait]
pub trait TelephonyProvider: Send + Sync {
    /// Provider tag
    fn kind(&self) -> ProviderKind;

    /// Place an outbound call. Returns the provider-native call identifier.
    async fn create_call(&self, to: &ContactAddress, callbacks: &CallbackUrls) -> Result<String, CallError>;

    /// Attach a media stream to a live call
    async fn start_media_stream(&self, provider_call_id: &str, stream_url: &str) -> Result<(), CallError>;

    /// Terminate an in-progress call
    async fn hangup(&self, provider_call_id: &str) -> Result<(), CallError>;

    /// Send an SMS/WhatsApp message
    async fn send_message(&self, to: &ContactAddress, body: &str) -> Result<(), CallError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_urls() {
        let id = uuid::Uuid::new_v4();
        let urls = CallbackUrls::for_session("https://api.example.com/", id);

        assert!(urls.voice_url.starts_with("https://api.example.com/api/calls/answer"));
        assert!(urls.status_callback.contains(&id.to_string()));
        assert!(!urls.voice_url.contains("//api/"));
    }
}
