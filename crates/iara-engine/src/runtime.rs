//! Engine runtime: executes effects and routes completion events.
//!
//! This is the "Elm runtime" boundary: all side effects happen here. The
//! reducer stays pure and produces effects; this module spawns the gateway
//! calls and timers those effects describe, and feeds their results back
//! into the reducer as events over a single inbox channel.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use iara_core::gateway::ApiClient;

use crate::effects::{ApiCall, ChatEffect, DelayedEvent};
use crate::events::ChatEvent;
use crate::state::EngineState;
use crate::update::update;

pub struct EngineRuntime {
    pub state: EngineState,
    api: ApiClient,
    events_tx: mpsc::UnboundedSender<ChatEvent>,
    events_rx: mpsc::UnboundedReceiver<ChatEvent>,
    /// Live idle-countdown token, if one is armed. Re-arming cancels the
    /// previous countdown so a stale offer can never surface.
    hint_countdown: Option<CancellationToken>,
    /// Outstanding one-shot tasks (gateway calls and fixed delays). The
    /// countdown is deliberately not counted: it is long-lived and
    /// cancellable, not an operation anyone waits on.
    pending: usize,
    redirect: Option<String>,
}

impl EngineRuntime {
    pub fn new(state: EngineState, api: ApiClient) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            state,
            api,
            events_tx,
            events_rx,
            hint_countdown: None,
            pending: 0,
            redirect: None,
        }
    }

    /// True while at least one gateway call or delay is outstanding.
    pub fn has_pending(&self) -> bool {
        self.pending > 0
    }

    /// The pending re-authentication reason, once raised.
    pub fn take_redirect(&mut self) -> Option<String> {
        self.redirect.take()
    }

    /// Feeds one event through the reducer and executes its effects.
    pub fn handle(&mut self, event: ChatEvent) {
        if completes_pending(&event) {
            self.pending = self.pending.saturating_sub(1);
        }
        let effects = update(&mut self.state, event);
        for effect in effects {
            self.execute(effect);
        }
    }

    /// Waits for the next completion or timer event from the inbox.
    pub async fn next_event(&mut self) -> Option<ChatEvent> {
        self.events_rx.recv().await
    }

    /// Non-blocking inbox poll, for front-ends that block on input and
    /// drain stragglers (e.g. an elapsed hint countdown) between reads.
    pub fn try_event(&mut self) -> Option<ChatEvent> {
        self.events_rx.try_recv().ok()
    }

    /// Drives the inbox until every outstanding task has reported back
    /// (or a redirect was raised, which abandons whatever is in flight).
    pub async fn settle(&mut self) {
        while self.pending > 0 && self.redirect.is_none() {
            let Some(event) = self.events_rx.recv().await else {
                break;
            };
            self.handle(event);
        }
    }

    fn execute(&mut self, effect: ChatEffect) {
        match effect {
            ChatEffect::Api(call) => self.spawn_api(call),
            ChatEffect::Delay { delay, then } => self.spawn_delay(delay, then),
            ChatEffect::StartHintCountdown => self.arm_hint_countdown(),
            ChatEffect::CancelHintCountdown => self.cancel_hint_countdown(),
            ChatEffect::Redirect { reason } => {
                self.cancel_hint_countdown();
                self.redirect = Some(reason);
            }
        }
    }

    /// Spawns a gateway call; its result comes back as a `ChatEvent`.
    fn spawn_api(&mut self, call: ApiCall) {
        let api = self.api.clone();
        let tx = self.events_tx.clone();
        self.pending += 1;
        tokio::spawn(async move {
            let event = match call {
                ApiCall::ListSubjects => ChatEvent::SubjectsLoaded {
                    result: api.list_subjects().await,
                },
                ApiCall::FetchQuestions { subject, count } => {
                    let result = api.fetch_questions(&subject, count).await;
                    ChatEvent::QuestionsLoaded { subject, result }
                }
                ApiCall::VerifyAnswer {
                    question_id,
                    user_answer,
                } => ChatEvent::AnswerVerified {
                    result: api.verify_answer(&question_id, &user_answer).await,
                },
                ApiCall::FetchSchedule => ChatEvent::ScheduleLoaded {
                    result: api.get_schedule().await,
                },
                ApiCall::AddSubject { nome } => ChatEvent::ScheduleMutated {
                    result: api.add_subject(&nome).await,
                },
                ApiCall::AddTopic { subject_id, nome } => ChatEvent::ScheduleMutated {
                    result: api.add_topic(subject_id, &nome).await,
                },
                ApiCall::DeleteSubject { subject_id } => ChatEvent::ScheduleMutated {
                    result: api.delete_subject(subject_id).await,
                },
                ApiCall::DeleteTopic { topic_id } => ChatEvent::ScheduleMutated {
                    result: api.delete_topic(topic_id).await,
                },
                ApiCall::FetchWeeklyPlan => ChatEvent::WeeklyPlanLoaded {
                    result: api.weekly_plan().await,
                },
                ApiCall::FetchAnalysis => ChatEvent::AnalysisLoaded {
                    result: api.error_analysis().await,
                },
                ApiCall::FetchHint { question_id, level } => ChatEvent::HintLoaded {
                    result: api.hint(&question_id, level).await,
                },
            };
            let _ = tx.send(event);
        });
    }

    fn spawn_delay(&mut self, delay: std::time::Duration, then: DelayedEvent) {
        let tx = self.events_tx.clone();
        self.pending += 1;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let event = match then {
                DelayedEvent::Echo { subject } => ChatEvent::EchoDue { subject },
                DelayedEvent::Advance => ChatEvent::AdvanceDue,
                DelayedEvent::HintFade => ChatEvent::HintFadeDone,
            };
            let _ = tx.send(event);
        });
    }

    fn arm_hint_countdown(&mut self) {
        self.cancel_hint_countdown();
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let tx = self.events_tx.clone();
        let wait = self.state.config.hint_offer_delay();
        tokio::spawn(async move {
            tokio::select! {
                () = cancelled.cancelled() => {}
                () = tokio::time::sleep(wait) => {
                    let _ = tx.send(ChatEvent::HintOfferDue);
                }
            }
        });
        self.hint_countdown = Some(token);
    }

    fn cancel_hint_countdown(&mut self) {
        if let Some(token) = self.hint_countdown.take() {
            token.cancel();
        }
    }
}

/// Whether an event is the completion of a counted one-shot task.
/// `HintOfferDue` is the uncounted countdown firing.
fn completes_pending(event: &ChatEvent) -> bool {
    matches!(
        event,
        ChatEvent::EchoDue { .. }
            | ChatEvent::AdvanceDue
            | ChatEvent::HintFadeDone
            | ChatEvent::SubjectsLoaded { .. }
            | ChatEvent::QuestionsLoaded { .. }
            | ChatEvent::AnswerVerified { .. }
            | ChatEvent::ScheduleLoaded { .. }
            | ChatEvent::ScheduleMutated { .. }
            | ChatEvent::WeeklyPlanLoaded { .. }
            | ChatEvent::AnalysisLoaded { .. }
            | ChatEvent::HintLoaded { .. }
    )
}
