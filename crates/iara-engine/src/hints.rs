//! Hint state: per-question progressive help levels and the unsolicited
//! offer state machine.
//!
//! Levels are keyed by question identity so re-visiting a question resumes
//! its progression. They only increase and cap at 3.

use std::collections::HashMap;

pub const MAX_HINT_LEVEL: u8 = 3;

/// The help-offer affordance lifecycle for the active question.
///
/// Idle -> (30s of no answer, not busy) -> Offering -> (answer, subject
/// switch, dismissal) -> Dismissing (fade transition) -> Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HintOffer {
    #[default]
    Idle,
    Offering,
    Dismissing,
}

#[derive(Debug, Default)]
pub struct HintState {
    levels: HashMap<String, u8>,
    pub offer: HintOffer,
}

impl HintState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current level for a question (0 = no hint requested yet).
    pub fn level(&self, question_id: &str) -> u8 {
        self.levels.get(question_id).copied().unwrap_or(0)
    }

    /// The level the next hint request should use: `min(previous + 1, 3)`.
    /// Records the bump immediately so a repeated request progresses.
    pub fn bump(&mut self, question_id: &str) -> u8 {
        let next = (self.level(question_id) + 1).min(MAX_HINT_LEVEL);
        self.levels.insert(question_id.to_string(), next);
        next
    }

    pub fn is_offering(&self) -> bool {
        self.offer == HintOffer::Offering
    }
}
