//! Reducer input vocabulary.
//!
//! Everything that can happen to the engine arrives as a `ChatEvent`:
//! user intents from the front-end, timer expirations, and the results of
//! gateway calls spawned by the runtime.

use iara_core::gateway::ApiError;
use iara_core::types::{ErrorAnalysis, Question, Schedule, VerifyOutcome, WeeklyPlan};

/// The fixed menu of follow-up actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    GetQuestions,
    EditSchedule,
    GetWeeklySchedule,
    AnalyzePerformance,
}

#[derive(Debug)]
pub enum ChatEvent {
    /// Engine entry: runs the session guard and loads the subject list.
    Started,

    // ========================================================================
    // User intents
    // ========================================================================
    /// Free-text chat message.
    SubmitMessage { text: String },
    /// Subject picked from the sidebar (or programmatically).
    SelectSubject { subject: String },
    /// Answer for the live question (`a`..`d`, or a subject name for the
    /// compact-entry subject menu).
    AnswerQuestion { key: String },
    /// Action picked from the live action menu.
    Menu { action: MenuAction },
    /// Schedule edits.
    AddSubject { nome: String },
    AddTopic { subject_id: u64, nome: String },
    DeleteSubject { subject_id: u64 },
    DeleteTopic { topic_id: u64 },
    /// Click on the visible hint offer.
    RequestHint,
    /// Click outside / mascot toggle while the offer is visible.
    DismissHint,

    // ========================================================================
    // Timers
    // ========================================================================
    /// Simulated free-text acknowledgement is due.
    EchoDue { subject: String },
    /// Post-verdict delay elapsed; advance the sequencer.
    AdvanceDue,
    /// Idle countdown elapsed; surface the hint offer.
    HintOfferDue,
    /// The offer's fade transition finished.
    HintFadeDone,

    // ========================================================================
    // Gateway completions
    // ========================================================================
    SubjectsLoaded {
        result: Result<Vec<String>, ApiError>,
    },
    QuestionsLoaded {
        subject: String,
        result: Result<Vec<Question>, ApiError>,
    },
    AnswerVerified {
        result: Result<VerifyOutcome, ApiError>,
    },
    ScheduleLoaded {
        result: Result<Schedule, ApiError>,
    },
    /// An add/delete finished; the schedule is refreshed regardless.
    ScheduleMutated {
        result: Result<(), ApiError>,
    },
    WeeklyPlanLoaded {
        result: Result<WeeklyPlan, ApiError>,
    },
    AnalysisLoaded {
        result: Result<ErrorAnalysis, ApiError>,
    },
    HintLoaded {
        result: Result<String, ApiError>,
    },
}
