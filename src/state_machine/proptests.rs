//! Property-based tests for the turn state machine
//!
//! These tests verify key invariants hold across arbitrary event sequences.

use super::*;
use crate::error::{ErrorKind, StoreError};
use crate::llm::{AiError, AiReply};
use crate::models::{BehavioralState, Emotion, Message, MessageRole};
use chrono::Utc;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn message(role: MessageRole) -> Message {
    Message {
        id: "m".to_string(),
        session_id: "s".to_string(),
        role,
        content: "text".to_string(),
        timestamp: Utc::now(),
        user_id: None,
        mood: None,
    }
}

fn phase_rank(phase: TurnPhase) -> u8 {
    match phase {
        TurnPhase::Idle => 0,
        TurnPhase::UserPersisting => 1,
        TurnPhase::AwaitingAiResponse => 2,
        TurnPhase::AiPersisting => 3,
        TurnPhase::Completed | TurnPhase::Failed => 4,
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_event() -> impl Strategy<Value = TurnEvent> {
    prop_oneof![
        "[a-z ]{1,20}".prop_map(|content| TurnEvent::Begin { content }),
        Just(TurnEvent::UserPersisted {
            message: message(MessageRole::User)
        }),
        Just(TurnEvent::UserPersistFailed {
            error: StoreError::new("store down")
        }),
        Just(TurnEvent::AiReplied {
            reply: AiReply::new("ok", Emotion::Calm, BehavioralState::Speaking)
        }),
        Just(TurnEvent::AiFailed {
            error: AiError::network("unreachable")
        }),
        Just(TurnEvent::AiPersisted {
            message: message(MessageRole::Ai)
        }),
        Just(TurnEvent::AiPersistFailed {
            error: StoreError::new("write failed")
        }),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Accepted events always move the turn strictly forward
    #[test]
    fn prop_phase_only_advances(events in proptest::collection::vec(arb_event(), 0..20)) {
        let mut state = TurnState::Idle;
        for event in events {
            let before = state.phase();
            if let Ok(result) = transition(&state, event) {
                prop_assert!(phase_rank(result.new_state.phase()) > phase_rank(before));
                state = result.new_state;
            }
        }
    }

    /// Terminal states never accept another event
    #[test]
    fn prop_terminal_states_are_final(events in proptest::collection::vec(arb_event(), 0..20)) {
        let mut state = TurnState::Idle;
        for event in events {
            let was_terminal = state.is_terminal();
            match transition(&state, event) {
                Ok(result) => {
                    prop_assert!(!was_terminal);
                    state = result.new_state;
                }
                Err(TransitionError::TurnFinished(_)) => prop_assert!(was_terminal),
                Err(TransitionError::InvalidTransition(_)) => prop_assert!(!was_terminal),
            }
        }
    }

    /// Every transition emits at most one effect, and only non-terminal states emit one
    #[test]
    fn prop_effects_match_target_state(events in proptest::collection::vec(arb_event(), 0..20)) {
        let mut state = TurnState::Idle;
        for event in events {
            if let Ok(result) = transition(&state, event) {
                prop_assert!(result.effects.len() <= 1);
                prop_assert_eq!(result.effects.is_empty(), result.new_state.is_terminal());
                state = result.new_state;
            }
        }
    }

    /// A failure records a committed user message exactly when step 1 succeeded
    #[test]
    fn prop_failed_user_message_matches_error_kind(
        events in proptest::collection::vec(arb_event(), 0..20)
    ) {
        let mut state = TurnState::Idle;
        for event in events {
            if let Ok(result) = transition(&state, event) {
                state = result.new_state;
            }
        }
        if let TurnState::Failed { error, user_message } = &state {
            let step_one_failed = error.kind() == ErrorKind::UserMessageSend;
            prop_assert_eq!(user_message.is_none(), step_one_failed);
        }
    }
}
