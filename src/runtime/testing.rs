//! Fixtures and mock implementations for testing
//!
//! These mocks enable testing sessions without real timers or telephony.

use super::sink::NotificationSink;
use super::timer::TimerScheduler;
use super::traits::{CallTransport, SpeechError, SpeechSynthesizer, SynthesizedAudio};
use crate::config::EngineConfig;
use crate::flow::{FlowDefinition, FlowGraph, Key, NodeAction, StateNode, TRANSFER_AGENT};
use crate::state_machine::{Notification, SessionContext, TimerId};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Fixtures
// ============================================================================

/// Small flow covering menus, input collection and both terminal actions
pub fn support_flow() -> Arc<FlowGraph> {
    let states = vec![
        StateNode::menu("GREETING", "Press 1 for sales or 2 for support")
            .on(Key::Digit(1), "SALES")
            .on(Key::Digit(2), "ACCOUNT"),
        StateNode::terminal("SALES", "Connecting you to sales").with_action(NodeAction::Transfer),
        StateNode::input("ACCOUNT", "Enter your account number then pound")
            .on(Key::Pound, "CONFIRM"),
        StateNode::menu("CONFIRM", "Press 1 to confirm or 9 to start over")
            .on(Key::Digit(1), "DONE")
            .on(Key::Digit(9), "GREETING"),
        StateNode::terminal("DONE", "Thank you, goodbye").with_action(NodeAction::Hangup),
        StateNode::terminal(TRANSFER_AGENT, "Please hold for an agent")
            .with_action(NodeAction::Transfer),
    ];
    let graph = FlowGraph::new(FlowDefinition {
        entry: "GREETING".to_string(),
        states,
    })
    .expect("support flow is valid");
    Arc::new(graph)
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        input_timeout: Duration::from_secs(5),
        max_retries: 3,
        training_mode: false,
        training_delay: Duration::from_secs(2),
        speech_timeout: Duration::from_secs(1),
    }
}

pub fn test_context() -> SessionContext {
    SessionContext::new("test-call", support_flow(), test_config())
}

// ============================================================================
// Recording Sink
// ============================================================================

/// Sink that keeps every notification it receives
#[derive(Default)]
pub struct RecordingSink {
    received: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.received.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .map(Notification::kind)
            .collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }

    /// Text of every `MessageReady`
    pub fn messages(&self) -> Vec<String> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .filter_map(|n| match n {
                Notification::MessageReady { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.received.lock().unwrap().clear();
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: &Notification) {
        self.received.lock().unwrap().push(notification.clone());
    }
}

// ============================================================================
// Manual Timer
// ============================================================================

#[derive(Default)]
struct TimerLog {
    armed: Vec<(TimerId, Duration)>,
    pending: Option<TimerId>,
    cancels: usize,
}

/// Timer the test fires by hand. Clones share state so the test keeps a
/// handle after moving one into the engine.
#[derive(Clone, Default)]
pub struct ManualTimer {
    log: Arc<Mutex<TimerLog>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every arm request, in order
    pub fn armed(&self) -> Vec<(TimerId, Duration)> {
        self.log.lock().unwrap().armed.clone()
    }

    pub fn pending(&self) -> Option<TimerId> {
        self.log.lock().unwrap().pending
    }

    /// Number of timers that could still fire (0 or 1)
    pub fn live_count(&self) -> usize {
        usize::from(self.pending().is_some())
    }

    pub fn cancel_count(&self) -> usize {
        self.log.lock().unwrap().cancels
    }

    /// Expire the pending timer, returning the id to feed back to the engine
    pub fn fire(&self) -> Option<TimerId> {
        self.log.lock().unwrap().pending.take()
    }
}

impl TimerScheduler for ManualTimer {
    fn arm(&mut self, timer: TimerId, delay: Duration) {
        let mut log = self.log.lock().unwrap();
        log.armed.push((timer, delay));
        log.pending = Some(timer);
    }

    fn cancel(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.pending = None;
        log.cancels += 1;
    }
}

// ============================================================================
// Mock Speech Synthesizer
// ============================================================================

/// Synthesizer whose "audio" is the UTF-8 prompt text
#[derive(Default)]
pub struct MockSpeech {
    fail: bool,
    delay: Option<Duration>,
    languages: Mutex<Vec<String>>,
}

impl MockSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Languages requested so far
    pub fn languages(&self) -> Vec<String> {
        self.languages.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSpeech {
    async fn synthesize(&self, text: &str, language: &str) -> Result<SynthesizedAudio, SpeechError> {
        self.languages.lock().unwrap().push(language.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(SpeechError::Provider("mock failure".to_string()));
        }
        Ok(SynthesizedAudio {
            language: language.to_string(),
            mime_type: "text/plain".to_string(),
            data: text.as_bytes().to_vec(),
        })
    }
}

// ============================================================================
// Mock Transport
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Play(String),
    PlayText(String),
    Transfer(String),
    Hangup(String),
}

/// Transport that records what it was asked to do
#[derive(Default)]
pub struct MockTransport {
    calls: Mutex<Vec<TransportCall>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Wait until at least `n` calls were recorded. Works under paused time.
    pub async fn wait_for_calls(&self, n: usize) {
        for _ in 0..1000 {
            if self.calls.lock().unwrap().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {n} transport calls, got {:?}", self.calls());
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CallTransport for MockTransport {
    async fn play(&self, audio: SynthesizedAudio) {
        self.record(TransportCall::Play(
            String::from_utf8_lossy(&audio.data).into_owned(),
        ));
    }

    async fn play_text(&self, text: &str, _language: &str) {
        self.record(TransportCall::PlayText(text.to_string()));
    }

    async fn transfer(&self, node: &StateNode) {
        self.record(TransportCall::Transfer(node.id.clone()));
    }

    async fn hangup(&self, reason: &str) {
        self.record(TransportCall::Hangup(reason.to_string()));
    }
}
