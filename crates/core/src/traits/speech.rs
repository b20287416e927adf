//! Speech pipeline interface
//!
//! The audio side of a call (capture, VAD, STT, TTS, reply generation) is
//! an external collaborator. The tracker hands it a connected media stream
//! and consumes one bounded asynchronous result when the stream ends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lead::{BookingStatus, CallOutcome};
use crate::Result;

/// Handle to a live media stream, produced by the transport handshake
#[derive(Debug, Clone)]
pub struct MediaStreamHandle {
    /// Call session id
    pub call_id: Uuid,
    /// Provider stream identifier from the "start" signal
    pub stream_id: String,
}

/// Final product of a finished pipeline run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualification_score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<BookingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_time: Option<String>,
}

impl From<PipelineOutcome> for CallOutcome {
    fn from(outcome: PipelineOutcome) -> Self {
        Self {
            score: outcome.qualification_score,
            summary: outcome.summary,
            transcript: outcome.transcript,
            booking: outcome.booking,
            callback_time: outcome.callback_time,
        }
    }
}

/// Speech/LLM pipeline over a connected media stream
///
/// `run` covers the whole lifetime of the stream and resolves when the
/// remote side disconnects or the pipeline errors out. Callers bound it
/// with a timeout; both completion and error feed the same terminal
/// transition on the call session.
#[async_trait]
pub trait SpeechPipeline: Send + Sync {
    async fn run(&self, stream: MediaStreamHandle) -> Result<PipelineOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoPipeline;

    #[async_trait]
    impl SpeechPipeline for EchoPipeline {
        async fn run(&self, stream: MediaStreamHandle) -> Result<PipelineOutcome> {
            Ok(PipelineOutcome {
                summary: Some(format!("stream {}", stream.stream_id)),
                ..PipelineOutcome::default()
            })
        }
    }

    #[tokio::test]
    async fn test_pipeline_outcome_into_call_outcome() {
        let pipeline = EchoPipeline;
        let outcome = pipeline
            .run(MediaStreamHandle {
                call_id: Uuid::new_v4(),
                stream_id: "MZ123".to_string(),
            })
            .await
            .unwrap();

        let call_outcome: CallOutcome = outcome.into();
        assert_eq!(call_outcome.summary.as_deref(), Some("stream MZ123"));
        assert!(call_outcome.score.is_none());
    }
}
