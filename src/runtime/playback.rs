//! Bridge from session notifications to speech synthesis and the transport

use super::sink::NotificationSink;
use super::traits::{CallTransport, SpeechError, SpeechSynthesizer, SynthesizedAudio};
use crate::flow::{NodeAction, StateNode};
use crate::state_machine::Notification;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug)]
enum PlaybackJob {
    Speak { text: String, language: String },
    Transfer { node: Arc<StateNode> },
    Hangup { reason: String },
}

/// Sink that renders prompts through a `SpeechSynthesizer` and drives the
/// `CallTransport`.
///
/// Jobs run one at a time on a background worker so prompts reach the
/// caller in the order the session emitted them. The worker exits once the
/// player is dropped and its queue is drained.
pub struct PromptPlayer {
    jobs: mpsc::UnboundedSender<PlaybackJob>,
}

impl PromptPlayer {
    /// Start the playback worker. Must be called within a tokio runtime.
    pub fn spawn<S, T>(synthesizer: S, transport: T, speech_timeout: Duration) -> Self
    where
        S: SpeechSynthesizer + 'static,
        T: CallTransport + 'static,
    {
        let (jobs, mut rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match job {
                    PlaybackJob::Speak { text, language } => {
                        match synthesize(&synthesizer, &text, &language, speech_timeout).await {
                            Ok(audio) => transport.play(audio).await,
                            Err(e) => {
                                tracing::warn!(error = %e, language = %language, "Speech synthesis failed, falling back to text");
                                transport.play_text(&text, &language).await;
                            }
                        }
                    }
                    PlaybackJob::Transfer { node } => transport.transfer(&node).await,
                    PlaybackJob::Hangup { reason } => transport.hangup(&reason).await,
                }
            }
            tracing::debug!("Playback worker stopped");
        });

        Self { jobs }
    }

    fn enqueue(&self, job: PlaybackJob) {
        if self.jobs.send(job).is_err() {
            tracing::debug!("Playback worker gone, dropping job");
        }
    }
}

async fn synthesize<S: SpeechSynthesizer>(
    synthesizer: &S,
    text: &str,
    language: &str,
    limit: Duration,
) -> Result<SynthesizedAudio, SpeechError> {
    tokio::time::timeout(limit, synthesizer.synthesize(text, language))
        .await
        .map_err(|_| SpeechError::Timeout(limit))?
}

impl NotificationSink for PromptPlayer {
    fn notify(&self, notification: &Notification) {
        match notification {
            Notification::MessageReady {
                text,
                language,
                node,
            } => {
                self.enqueue(PlaybackJob::Speak {
                    text: text.clone(),
                    language: language.clone(),
                });
                // Hang up only after the closing prompt has played
                if node.is_terminal() && node.action == Some(NodeAction::Hangup) {
                    self.enqueue(PlaybackJob::Hangup {
                        reason: format!("reached {}", node.id),
                    });
                }
            }
            Notification::TransferRequested { node } => self.enqueue(PlaybackJob::Transfer {
                node: Arc::clone(node),
            }),
            Notification::FatalError { description } => self.enqueue(PlaybackJob::Hangup {
                reason: description.clone(),
            }),
            _ => {}
        }
    }
}
