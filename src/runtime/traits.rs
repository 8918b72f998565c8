//! Trait abstractions for the engine's external collaborators
//!
//! These traits enable testing playback with mock implementations.

use crate::flow::StateNode;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Playable audio returned by a speech provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub language: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Speech provider failure
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpeechError {
    #[error("speech synthesis timed out after {0:?}")]
    Timeout(Duration),
    #[error("speech provider error: {0}")]
    Provider(String),
}

/// Text-to-speech provider
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, language: &str) -> Result<SynthesizedAudio, SpeechError>;
}

/// Telephony / call-control transport. Renders audio and connects transfers;
/// keypresses flow the other way through a `CallHandle`.
#[async_trait]
pub trait CallTransport: Send + Sync {
    /// Play synthesized audio to the caller
    async fn play(&self, audio: SynthesizedAudio);

    /// Fallback when synthesis failed: let the transport render the text itself
    async fn play_text(&self, text: &str, language: &str);

    /// Connect the caller to the destination described by `node`
    async fn transfer(&self, node: &StateNode);

    /// Disconnect the call
    async fn hangup(&self, reason: &str);
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: SpeechSynthesizer + ?Sized> SpeechSynthesizer for Arc<T> {
    async fn synthesize(&self, text: &str, language: &str) -> Result<SynthesizedAudio, SpeechError> {
        (**self).synthesize(text, language).await
    }
}

#[async_trait]
impl<T: CallTransport + ?Sized> CallTransport for Arc<T> {
    async fn play(&self, audio: SynthesizedAudio) {
        (**self).play(audio).await;
    }

    async fn play_text(&self, text: &str, language: &str) {
        (**self).play_text(text, language).await;
    }

    async fn transfer(&self, node: &StateNode) {
        (**self).transfer(node).await;
    }

    async fn hangup(&self, reason: &str) {
        (**self).hangup(reason).await;
    }
}
