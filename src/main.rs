//! IVR console - walk a call flow from the terminal
//!
//! Keys 0-9, * and # are sent as keypad presses. `b` goes back, `t` toggles
//! training mode and `q` hangs up.

use async_trait::async_trait;
use ivr_navigator::runtime::{CallTransport, SpeechError, SpeechSynthesizer, SynthesizedAudio};
use ivr_navigator::{
    CallManager, EngineConfig, FlowGraph, Key, Notification, Notifier, PromptPlayer, StateNode,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const BUNDLED_FLOW: &str = include_str!("../flows/support_line.json");

/// "Synthesizes" prompts as plain text
struct ConsoleSpeech;

#[async_trait]
impl SpeechSynthesizer for ConsoleSpeech {
    async fn synthesize(&self, text: &str, language: &str) -> Result<SynthesizedAudio, SpeechError> {
        Ok(SynthesizedAudio {
            language: language.to_string(),
            mime_type: "text/plain".to_string(),
            data: text.as_bytes().to_vec(),
        })
    }
}

/// Prints prompts and reports when the call leaves the system
struct ConsoleTransport {
    finished: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl CallTransport for ConsoleTransport {
    async fn play(&self, audio: SynthesizedAudio) {
        println!("[{}] {}", audio.language, String::from_utf8_lossy(&audio.data));
    }

    async fn play_text(&self, text: &str, language: &str) {
        println!("[{language}] {text}");
    }

    async fn transfer(&self, node: &StateNode) {
        let _ = self.finished.send(format!("transferred ({})", node.id));
    }

    async fn hangup(&self, reason: &str) {
        let _ = self.finished.send(format!("hung up: {reason}"));
    }
}

fn load_flow() -> Result<FlowGraph, Box<dyn std::error::Error>> {
    match std::env::var("IVR_FLOW_PATH") {
        Ok(path) => {
            tracing::info!(path = %path, "Loading flow");
            Ok(FlowGraph::load(&path)?)
        }
        Err(_) => Ok(FlowGraph::from_json(BUNDLED_FLOW)?),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so prompts stay readable on stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ivr_navigator=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = EngineConfig::from_env()?;
    let graph = Arc::new(load_flow()?);
    tracing::info!(
        entry = %graph.entry(),
        states = graph.len(),
        timeout_ms = u64::try_from(config.input_timeout.as_millis()).unwrap_or(u64::MAX),
        max_retries = config.max_retries,
        "Flow loaded"
    );

    let (finished_tx, mut finished_rx) = mpsc::unbounded_channel();
    let player = PromptPlayer::spawn(
        ConsoleSpeech,
        ConsoleTransport {
            finished: finished_tx,
        },
        config.speech_timeout,
    );

    let mut training = config.training_mode;
    let manager = CallManager::new(graph, config);
    let notifier = Notifier::new()
        .with(Arc::new(player))
        .with_fn(|notification| {
            if let Notification::InputCollected { node, value } = notification {
                println!("({} = {value})", node.id);
            }
        });
    let call = manager.start_call(notifier).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(outcome) = finished_rx.recv() => {
                println!("Call {outcome}");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                for c in line.chars().filter(|c| !c.is_whitespace()) {
                    let sent = match c {
                        'q' => break,
                        'b' => call.go_back().await,
                        't' => {
                            training = !training;
                            println!("Training mode {}", if training { "on" } else { "off" });
                            call.set_training_mode(training).await
                        }
                        other => match Key::try_from(other) {
                            Ok(key) => call.press(key).await,
                            Err(e) => {
                                eprintln!("{e}");
                                continue;
                            }
                        },
                    };
                    // The outcome arrives on `finished_rx` once playback drains
                    if let Err(e) = sent {
                        tracing::debug!(error = %e, "Key not delivered");
                    }
                }
                if line.contains('q') {
                    break;
                }
            }
        }
    }

    // A transferred or hung-up call has already left the manager
    if let Err(e) = manager.end_call(&call.call_id).await {
        tracing::debug!(error = %e, "Call already finished");
    }
    Ok(())
}
