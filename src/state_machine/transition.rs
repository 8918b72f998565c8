//! Pure state transition function
//!
//! Every state change funnels through `Step::enter`; keypresses, timeouts,
//! back navigation and escalation all call it rather than duplicating its
//! effects.

use super::effect::INVALID_OPTION_NOTICE;
use super::{Effect, Event, Notification, Session, SessionContext, SessionPhase};
use crate::flow::{Key, NodeKind, StateNode, Trigger, TRANSFER_AGENT};
use std::sync::Arc;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub session: Session,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.effects.iter().filter_map(Effect::notification)
    }
}

/// Operations rejected without touching the session
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Session already started")]
    AlreadyStarted,
    #[error("Session has ended and cannot be restarted")]
    SessionEnded,
}

/// Pure transition function
///
/// Given the same session, context and event this always produces the same
/// result. Events that do not apply to the session's phase (keys before
/// start, stale timers, back navigation after stop) yield no effects.
pub fn transition(
    session: &Session,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    let mut step = Step {
        session: session.clone(),
        context,
        effects: Vec::new(),
    };

    match event {
        Event::Start => match session.phase {
            SessionPhase::Idle => step.enter(context.graph.entry(), History::Record),
            SessionPhase::AwaitingInput => return Err(TransitionError::AlreadyStarted),
            SessionPhase::Terminal | SessionPhase::Stopped => {
                return Err(TransitionError::SessionEnded)
            }
        },

        Event::KeyPress { key } if session.is_active() => step.key_press(key),

        Event::TimeoutFired { timer }
            if session.is_active() && session.pending_timeout == Some(timer) =>
        {
            step.timeout();
        }

        Event::Jump { state_id } if session.is_active() => {
            step.enter(&state_id, History::Record);
        }

        Event::GoBack if session.is_active() => step.go_back(),

        Event::SetTrainingMode { enabled } => step.session.training_mode = enabled,

        Event::Stop => step.stop(),

        Event::KeyPress { .. } | Event::TimeoutFired { .. } | Event::Jump { .. } | Event::GoBack => {}
    }

    Ok(TransitionResult {
        session: step.session,
        effects: step.effects,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum History {
    /// Push the state being left
    Record,
    /// Leave history untouched (back navigation)
    Discard,
}

struct Step<'a> {
    session: Session,
    context: &'a SessionContext,
    effects: Vec<Effect>,
}

impl Step<'_> {
    fn enter(&mut self, target: &str, history: History) {
        let Some(node) = self.context.node(target) else {
            self.fatal(format!("transition to unknown state '{target}'"));
            return;
        };

        self.cancel_timeout();
        let previous = self.session.current_state.replace(node.id.clone());
        if let (History::Record, Some(previous)) = (history, previous) {
            self.session.history.push(previous);
        }
        self.session.retry_count = 0;
        self.session.input_buffer.clear();

        self.effects.push(Effect::state_changed(
            Arc::clone(&node),
            self.session.history.clone(),
        ));
        self.effects
            .push(Effect::message(node.message.clone(), Arc::clone(&node)));

        if node.is_terminal() {
            self.session.phase = SessionPhase::Terminal;
            if node.requests_transfer() {
                self.effects
                    .push(Effect::Notify(Notification::TransferRequested { node }));
            }
        } else {
            self.session.phase = SessionPhase::AwaitingInput;
            self.arm_timeout();
        }
    }

    fn key_press(&mut self, key: Key) {
        let Some(node) = self.current_node() else {
            return;
        };

        self.cancel_timeout();
        self.effects
            .push(Effect::Notify(Notification::KeyPressed { key }));

        match node.kind {
            NodeKind::Input => self.input_key(&node, key),
            NodeKind::Menu | NodeKind::Terminal => match node.resolve_key(key) {
                Some(target) => self.enter(target, History::Record),
                None => self.invalid_input(&node),
            },
        }
    }

    fn input_key(&mut self, node: &Arc<StateNode>, key: Key) {
        match key {
            Key::Pound => {
                let value = std::mem::take(&mut self.session.input_buffer);
                self.process_input(node, value);
            }
            Key::Star => {
                self.session.input_buffer.clear();
                match node.target(Trigger::Key(Key::Star)) {
                    Some(target) => self.enter(target, History::Record),
                    None => self.arm_timeout(),
                }
            }
            Key::Digit(_) => {
                self.session.input_buffer.push(key.as_char());
                self.arm_timeout();
            }
        }
    }

    fn process_input(&mut self, node: &Arc<StateNode>, value: String) {
        match node.submit_target() {
            Some(target) => {
                self.session.collected.insert(node.id.clone(), value.clone());
                self.effects.push(Effect::Notify(Notification::InputCollected {
                    node: Arc::clone(node),
                    value,
                }));
                self.enter(target, History::Record);
            }
            // Discarded without a retry; the timer keeps a silent caller moving
            None => self.arm_timeout(),
        }
    }

    fn invalid_input(&mut self, node: &Arc<StateNode>) {
        if self.record_failure() {
            return;
        }
        self.effects.push(Effect::message(
            format!("{INVALID_OPTION_NOTICE} {}", node.message),
            Arc::clone(node),
        ));
        self.arm_timeout();
    }

    fn timeout(&mut self) {
        self.session.pending_timeout = None;
        let Some(node) = self.current_node() else {
            return;
        };

        self.effects.push(Effect::Notify(Notification::InputTimeout));

        if let Some(target) = node.target(Trigger::Timeout) {
            self.enter(target, History::Record);
            return;
        }
        if self.record_failure() {
            return;
        }
        self.effects
            .push(Effect::message(node.message.clone(), Arc::clone(&node)));
        self.arm_timeout();
    }

    /// Invalid keys and silence share one counter. Returns true if escalated.
    /// Partially typed input survives a re-prompt.
    fn record_failure(&mut self) -> bool {
        self.session.retry_count += 1;
        if self.session.retry_count >= self.context.config.max_retries {
            self.enter(TRANSFER_AGENT, History::Record);
            true
        } else {
            false
        }
    }

    fn go_back(&mut self) {
        if let Some(previous) = self.session.history.pop() {
            self.enter(&previous, History::Discard);
        }
    }

    fn stop(&mut self) {
        if self.session.phase == SessionPhase::Stopped {
            return;
        }
        self.cancel_timeout();
        self.session.reset();
        self.session.phase = SessionPhase::Stopped;
    }

    fn fatal(&mut self, description: String) {
        self.cancel_timeout();
        self.effects.push(Effect::fatal(description));
        self.session.reset();
        self.session.phase = SessionPhase::Stopped;
    }

    fn current_node(&mut self) -> Option<Arc<StateNode>> {
        let id = self.session.current_state.clone()?;
        let node = self.context.node(&id);
        if node.is_none() {
            self.fatal(format!("current state '{id}' is not in the flow graph"));
        }
        node
    }

    fn arm_timeout(&mut self) {
        self.cancel_timeout();
        let timer = self.session.allocate_timer();
        self.session.pending_timeout = Some(timer);
        self.effects.push(Effect::ArmTimeout {
            timer,
            delay: self.context.timeout_for(&self.session),
        });
    }

    fn cancel_timeout(&mut self) {
        if self.session.pending_timeout.take().is_some() {
            self.effects.push(Effect::CancelTimeout);
        }
    }
}
