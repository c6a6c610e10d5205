//! Turn state machine
//!
//! One conversational turn as pure state transitions; the turn executor
//! performs the effects and feeds the results back in as events.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::TurnEffect;
pub use event::TurnEvent;
pub use state::{TurnPhase, TurnState};
pub use transition::{transition, TransitionError, TransitionResult};
