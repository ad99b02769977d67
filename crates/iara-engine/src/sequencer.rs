//! The question sequencer: an ordered batch of quiz questions for one
//! subject, plus a cursor. Populated atomically by one fetch, advanced by
//! exactly one per answered question, discarded on subject change or
//! exhaustion.

use iara_core::types::Question;

/// Result of advancing the batch cursor.
#[derive(Debug, PartialEq, Eq)]
pub enum Advance<'a> {
    Next(&'a Question),
    Exhausted,
}

#[derive(Debug, Default)]
pub struct QuestionBatch {
    questions: Vec<Question>,
    cursor: usize,
}

impl QuestionBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the batch contents and rewinds the cursor.
    pub fn load(&mut self, questions: Vec<Question>) {
        self.questions = questions;
        self.cursor = 0;
    }

    /// Discards the batch (subject change or exhaustion).
    pub fn reset(&mut self) {
        self.questions.clear();
        self.cursor = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&Question> {
        self.questions.get(self.cursor)
    }

    /// Moves the cursor past the answered question. Only valid after the
    /// current question's transcript item has been disabled.
    pub fn advance(&mut self) -> Advance<'_> {
        self.cursor += 1;
        match self.questions.get(self.cursor) {
            Some(question) => Advance::Next(question),
            None => Advance::Exhausted,
        }
    }
}
