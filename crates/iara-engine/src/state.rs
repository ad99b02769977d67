//! Engine state composition.
//!
//! `EngineState` combines the four owned sub-states (transcript, question
//! batch, hint state, session) with the orchestration flags. No component
//! mutates another's state directly; every cross-component effect goes
//! through the reducer in `update`.

use iara_core::config::Config;
use iara_core::session::Session;

use crate::hints::HintState;
use crate::sequencer::QuestionBatch;
use crate::transcript::TranscriptState;

#[derive(Debug)]
pub struct EngineState {
    pub config: Config,
    pub session: Session,
    /// The ordered conversation log.
    pub transcript: TranscriptState,
    /// Quiz questions for the active subject.
    pub batch: QuestionBatch,
    /// Hint levels and the offer state machine.
    pub hints: HintState,
    /// Subject the conversation is currently focused on.
    pub active_subject: Option<String>,
    /// Single-in-flight-operation lock. True while a user-triggered
    /// network round-trip is outstanding; all affordances render disabled.
    pub busy: bool,
    /// Bumped on every applied subject switch. A completion whose busy
    /// window opened under an older epoch was superseded and must not
    /// touch the transcript.
    pub switch_epoch: u64,
    /// `switch_epoch` captured when the current busy window opened.
    pub busy_epoch: u64,
    /// Subject switch parked while the hint offer plays its fade-out.
    pub pending_switch: Option<String>,
    /// Compact/mobile entry: subjects are offered as a pseudo-question
    /// instead of defaulting to the first one.
    pub compact: bool,
}

impl EngineState {
    pub fn new(config: Config, session: Session, compact: bool) -> Self {
        Self {
            config,
            session,
            transcript: TranscriptState::new(),
            batch: QuestionBatch::new(),
            hints: HintState::new(),
            active_subject: None,
            busy: false,
            switch_epoch: 0,
            busy_epoch: 0,
            pending_switch: None,
            compact,
        }
    }
}
