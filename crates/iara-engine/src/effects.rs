//! Engine effect types.
//!
//! Effects are commands returned by the reducer that the runtime executes.
//! They represent I/O and timer scheduling only; the reducer never touches
//! the network or spawns tasks itself.

use std::time::Duration;

/// A gateway call to spawn. Its result comes back as a `ChatEvent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    ListSubjects,
    FetchQuestions { subject: String, count: u32 },
    VerifyAnswer { question_id: String, user_answer: String },
    FetchSchedule,
    AddSubject { nome: String },
    AddTopic { subject_id: u64, nome: String },
    DeleteSubject { subject_id: u64 },
    DeleteTopic { topic_id: u64 },
    FetchWeeklyPlan,
    FetchAnalysis,
    FetchHint { question_id: String, level: u8 },
}

/// Which event a `Delay` effect delivers when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelayedEvent {
    /// Free-text acknowledgement for the given subject.
    Echo { subject: String },
    /// Advance the sequencer after a verdict message.
    Advance,
    /// Hint-offer fade transition finished.
    HintFade,
}

/// Effects returned by the reducer for the runtime to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEffect {
    /// Spawn a gateway call.
    Api(ApiCall),

    /// Deliver an event after a fixed delay.
    Delay { delay: Duration, then: DelayedEvent },

    /// (Re)start the idle countdown for the current question.
    /// Any previous countdown is cancelled first.
    StartHintCountdown,

    /// Cancel the idle countdown. Cancellation, not a cooperative check:
    /// a stale offer must never surface after the question moved on.
    CancelHintCountdown,

    /// Session is gone; navigate to re-authentication with a reason.
    Redirect { reason: String },
}
