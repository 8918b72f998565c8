//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across arbitrary caller behaviour.

use super::*;
use crate::flow::Key;
use crate::runtime::testing::test_context;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

/// Caller or host action, resolved against the live session
#[derive(Debug, Clone)]
enum Action {
    Start,
    Press(Key),
    /// Fire whatever timer is pending
    Expire,
    /// Fire an arbitrary (usually stale) timer id
    StaleTimer(u64),
    Back,
    Jump(&'static str),
    Training(bool),
    Stop,
}

fn arb_key() -> impl Strategy<Value = Key> {
    prop_oneof![
        8 => (0u8..=9).prop_map(Key::Digit),
        1 => Just(Key::Star),
        1 => Just(Key::Pound),
    ]
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        1 => Just(Action::Start),
        10 => arb_key().prop_map(Action::Press),
        4 => Just(Action::Expire),
        1 => (0u64..50).prop_map(Action::StaleTimer),
        2 => Just(Action::Back),
        1 => prop::sample::select(vec!["GREETING", "ACCOUNT", "CONFIRM"]).prop_map(Action::Jump),
        1 => any::<bool>().prop_map(Action::Training),
        1 => Just(Action::Stop),
    ]
}

fn to_event(action: &Action, session: &Session) -> Event {
    match action {
        Action::Start => Event::Start,
        Action::Press(key) => Event::KeyPress { key: *key },
        Action::Expire => Event::TimeoutFired {
            timer: session.pending_timeout.unwrap_or(TimerId(u64::MAX)),
        },
        Action::StaleTimer(id) => Event::TimeoutFired { timer: TimerId(*id) },
        Action::Back => Event::GoBack,
        Action::Jump(id) => Event::Jump {
            state_id: (*id).to_string(),
        },
        Action::Training(enabled) => Event::SetTrainingMode { enabled: *enabled },
        Action::Stop => Event::Stop,
    }
}

/// Drive the session, handing each step to `check`. Rejected events leave
/// the session untouched.
fn drive(
    actions: &[Action],
    mut check: impl FnMut(&Session, &Event, &TransitionResult) -> Result<(), TestCaseError>,
) -> Result<(), TestCaseError> {
    let context = test_context();
    let mut session = transition(&Session::default(), &context, Event::Start)
        .map_err(|e| TestCaseError::fail(e.to_string()))?
        .session;

    for action in actions {
        let event = to_event(action, &session);
        let Ok(result) = transition(&session, &context, event.clone()) else {
            prop_assert!(matches!(event, Event::Start));
            continue;
        };
        check(&session, &event, &result)?;
        session = result.session;
    }
    Ok(())
}

fn notifications(result: &TransitionResult) -> Vec<&Notification> {
    result.notifications().collect()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Entering a state always starts it with a clean slate
    #[test]
    fn prop_state_change_resets_retries(actions in proptest::collection::vec(arb_action(), 0..40)) {
        drive(&actions, |_, _, result| {
            let entered = notifications(result)
                .iter()
                .any(|n| matches!(n, Notification::StateChanged { .. }));
            if entered && result.session.phase != SessionPhase::Stopped {
                prop_assert_eq!(result.session.retry_count, 0);
                prop_assert!(result.session.input_buffer.is_empty());
            }
            Ok(())
        })?;
    }

    /// A step arms at most one timer, and it is the one the session expects
    #[test]
    fn prop_single_live_timer(actions in proptest::collection::vec(arb_action(), 0..40)) {
        drive(&actions, |_, _, result| {
            let armed: Vec<TimerId> = result
                .effects
                .iter()
                .filter_map(|e| match e {
                    Effect::ArmTimeout { timer, .. } => Some(*timer),
                    _ => None,
                })
                .collect();
            prop_assert!(armed.len() <= 1, "armed twice: {:?}", armed);
            if let Some(timer) = armed.first() {
                prop_assert_eq!(result.session.pending_timeout, Some(*timer));
            }
            prop_assert_eq!(
                result.session.pending_timeout.is_some(),
                result.session.phase == SessionPhase::AwaitingInput
            );
            Ok(())
        })?;
    }

    /// A prompt is spoken at most `max_retries` times before escalation
    #[test]
    fn prop_bounded_prompt_repeats(actions in proptest::collection::vec(arb_action(), 0..60)) {
        let max_retries = test_context().config.max_retries;
        let mut spoken = 0;
        drive(&actions, |_, _, result| {
            for notification in notifications(result) {
                match notification {
                    Notification::StateChanged { .. } => spoken = 0,
                    Notification::MessageReady { .. } => {
                        spoken += 1;
                        prop_assert!(spoken <= max_retries, "prompt spoken {} times", spoken);
                    }
                    _ => {}
                }
            }
            if result.session.is_active() {
                prop_assert!(result.session.retry_count < max_retries);
            }
            Ok(())
        })?;
    }

    /// Back navigation pops exactly one entry and never records the state it left
    #[test]
    fn prop_go_back_pops_history(actions in proptest::collection::vec(arb_action(), 0..40)) {
        drive(&actions, |before, event, result| {
            if !matches!(event, Event::GoBack) || !before.is_active() {
                return Ok(());
            }
            let mut expected = before.history.clone();
            match expected.pop() {
                Some(previous) => {
                    prop_assert_eq!(&result.session.history, &expected);
                    prop_assert_eq!(result.session.current_state.as_deref(), Some(previous.as_str()));
                }
                None => prop_assert!(result.effects.is_empty()),
            }
            Ok(())
        })?;
    }

    /// Nothing is emitted once a session has stopped
    #[test]
    fn prop_silent_after_stop(
        before in proptest::collection::vec(arb_action(), 0..20),
        after in proptest::collection::vec(arb_action(), 0..20),
    ) {
        let mut actions = before;
        actions.push(Action::Stop);
        actions.extend(after);

        let mut stopped = false;
        drive(&actions, |_, event, result| {
            if stopped {
                prop_assert!(notifications(result).is_empty(), "emitted after stop: {:?}", event);
                prop_assert_eq!(result.session.phase, SessionPhase::Stopped);
            }
            if matches!(event, Event::Stop) {
                stopped = true;
                prop_assert!(result.session.pending_timeout.is_none());
            }
            Ok(())
        })?;
    }

    /// History only ever holds real states
    #[test]
    fn prop_history_references_flow_states(actions in proptest::collection::vec(arb_action(), 0..40)) {
        let context = test_context();
        drive(&actions, |_, _, result| {
            for id in &result.session.history {
                prop_assert!(context.graph.contains(id), "unknown id in history: {}", id);
            }
            Ok(())
        })?;
    }
}
