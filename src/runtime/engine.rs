//! Session engine: owns one call's session and executes transition effects

use super::sink::Notifier;
use super::timer::TimerScheduler;
use crate::flow::{Key, StateNode};
use crate::state_machine::{
    transition, Effect, Event, Session, SessionContext, SessionPhase, TimerId, TransitionError,
};
use std::sync::Arc;

/// Drives a single session.
///
/// Not shared: each call owns its engine, and every operation runs to
/// completion (including notification delivery) before the next begins.
pub struct SessionEngine<T: TimerScheduler> {
    context: SessionContext,
    session: Session,
    notifier: Notifier,
    timer: T,
}

impl<T: TimerScheduler> SessionEngine<T> {
    pub fn new(context: SessionContext, notifier: Notifier, timer: T) -> Self {
        let session = Session::new(context.config.training_mode);
        Self {
            context,
            session,
            notifier,
            timer,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn current_node(&self) -> Option<&Arc<StateNode>> {
        self.session
            .current_state
            .as_deref()
            .and_then(|id| self.context.graph.get(id))
    }

    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.dispatch(Event::Start)
    }

    /// Host-requested jump; unknown ids surface as a fatal-error notification
    pub fn transition_to(&mut self, state_id: impl Into<String>) {
        self.apply(Event::Jump {
            state_id: state_id.into(),
        });
    }

    pub fn handle_key_press(&mut self, key: Key) {
        self.apply(Event::KeyPress { key });
    }

    pub fn handle_timeout(&mut self, timer: TimerId) {
        self.apply(Event::TimeoutFired { timer });
    }

    pub fn go_back(&mut self) {
        self.apply(Event::GoBack);
    }

    pub fn set_training_mode(&mut self, enabled: bool) {
        self.apply(Event::SetTrainingMode { enabled });
    }

    /// Idempotent; safe before `start`
    pub fn stop(&mut self) {
        self.apply(Event::Stop);
    }

    /// Run one event through the state machine and execute its effects
    pub fn dispatch(&mut self, event: Event) -> Result<(), TransitionError> {
        let previous = self.session.phase;
        let result = transition(&self.session, &self.context, event)?;
        self.session = result.session;

        for effect in result.effects {
            self.execute_effect(effect);
        }

        if self.session.phase != previous {
            tracing::info!(
                call_id = %self.context.call_id,
                from = ?previous,
                to = ?self.session.phase,
                state = ?self.session.current_state,
                "Session phase changed"
            );
        }
        Ok(())
    }

    /// For events the state machine never rejects
    fn apply(&mut self, event: Event) {
        if let Err(e) = self.dispatch(event) {
            tracing::warn!(call_id = %self.context.call_id, error = %e, "Event rejected");
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Notify(notification) => self.notifier.dispatch(&notification),
            Effect::ArmTimeout { timer, delay } => {
                tracing::debug!(
                    call_id = %self.context.call_id,
                    %timer,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Arming input timer"
                );
                self.timer.arm(timer, delay);
            }
            Effect::CancelTimeout => self.timer.cancel(),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.session.phase == SessionPhase::Stopped
    }
}
