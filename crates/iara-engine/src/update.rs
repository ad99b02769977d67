//! The engine reducer (interaction controller).
//!
//! All state mutations happen here. The runtime calls
//! `update(state, event)` and executes the returned effects. This is the
//! single source of truth for how events modify the transcript, and it
//! enforces the orchestration protocol: one outstanding network-bound
//! operation at a time, live-item discipline, and the error taxonomy.

use iara_core::gateway::ApiError;
use iara_core::types::{Question, VerifyOutcome};

use crate::effects::{ApiCall, ChatEffect, DelayedEvent};
use crate::events::{ChatEvent, MenuAction};
use crate::hints::HintOffer;
use crate::sequencer::Advance;
use crate::state::EngineState;
use crate::transcript::{QuestionKind, Sender};

/// Redirect reason when entering without a session.
pub const LOGIN_REQUIRED: &str = "Você precisa entrar na sua conta para acessar o chat.";
/// Redirect reason raised on any 401.
pub const SESSION_EXPIRED: &str = "Sua sessão expirou. Entre novamente para continuar.";

const GUEST_BLOCKED: &str = "Você precisa entrar na sua conta para usar este recurso.";
const NO_SUBJECT: &str = "Escolha uma matéria primeiro.";
const GENERIC_FAILURE: &str = "Não consegui falar com o servidor. Tente novamente.";

/// The main reducer function.
///
/// Takes the current state and an event, mutates state, and returns
/// effects for the runtime to execute.
pub fn update(state: &mut EngineState, event: ChatEvent) -> Vec<ChatEffect> {
    match event {
        ChatEvent::Started => handle_started(state),
        ChatEvent::SubmitMessage { text } => handle_submit_message(state, &text),
        ChatEvent::SelectSubject { subject } => handle_select_subject(state, subject),
        ChatEvent::AnswerQuestion { key } => handle_answer(state, &key),
        ChatEvent::Menu { action } => handle_menu(state, action),
        ChatEvent::AddSubject { nome } => {
            handle_schedule_edit(state, ApiCall::AddSubject { nome })
        }
        ChatEvent::AddTopic { subject_id, nome } => {
            handle_schedule_edit(state, ApiCall::AddTopic { subject_id, nome })
        }
        ChatEvent::DeleteSubject { subject_id } => {
            handle_schedule_edit(state, ApiCall::DeleteSubject { subject_id })
        }
        ChatEvent::DeleteTopic { topic_id } => {
            handle_schedule_edit(state, ApiCall::DeleteTopic { topic_id })
        }
        ChatEvent::RequestHint => handle_request_hint(state),
        ChatEvent::DismissHint => handle_dismiss_hint(state),
        ChatEvent::EchoDue { subject } => {
            state.transcript.push_message(
                Sender::Assistant,
                format!("Analisando sua pergunta sobre {subject}..."),
            );
            vec![]
        }
        ChatEvent::AdvanceDue => handle_advance_due(state),
        ChatEvent::HintOfferDue => handle_hint_offer_due(state),
        ChatEvent::HintFadeDone => handle_hint_fade_done(state),
        ChatEvent::SubjectsLoaded { result } => handle_subjects_loaded(state, result),
        ChatEvent::QuestionsLoaded { subject, result } => {
            handle_questions_loaded(state, &subject, result)
        }
        ChatEvent::AnswerVerified { result } => handle_answer_verified(state, result),
        ChatEvent::ScheduleLoaded { result } => handle_schedule_loaded(state, result),
        ChatEvent::ScheduleMutated { result } => handle_schedule_mutated(state, result),
        ChatEvent::WeeklyPlanLoaded { result } => handle_weekly_plan_loaded(state, result),
        ChatEvent::AnalysisLoaded { result } => handle_analysis_loaded(state, result),
        ChatEvent::HintLoaded { result } => handle_hint_loaded(state, result),
    }
}

// ============================================================================
// Entry
// ============================================================================

fn handle_started(state: &mut EngineState) -> Vec<ChatEffect> {
    // Session guard: a token or explicit guest mode is required on entry.
    if !state.session.is_authenticated() && !state.session.guest {
        return vec![ChatEffect::Redirect {
            reason: LOGIN_REQUIRED.to_string(),
        }];
    }
    vec![ChatEffect::Api(ApiCall::ListSubjects)]
}

fn handle_subjects_loaded(
    state: &mut EngineState,
    result: Result<Vec<String>, ApiError>,
) -> Vec<ChatEffect> {
    let subjects = match result {
        Ok(subjects) if !subjects.is_empty() => subjects,
        Ok(_) => state.config.fallback_subjects.clone(),
        Err(err) => {
            // Startup stays usable even when /materias is down.
            tracing::warn!("subject list unavailable, using fallback: {err}");
            state.config.fallback_subjects.clone()
        }
    };

    if subjects.is_empty() {
        // Reachable with `fallback_subjects = []` in config; the chat
        // still has to come up with a working menu.
        state.transcript.push_message(
            Sender::Assistant,
            "Olá! Eu sou a IAra. Não encontrei matérias disponíveis agora, \
             mas seu cronograma continua acessível.",
        );
        state.transcript.push_menu();
        return vec![];
    }

    if state.compact {
        state.transcript.push_message(
            Sender::Assistant,
            "Olá! Eu sou a IAra, sua tutora de estudos. Qual matéria vamos estudar hoje?",
        );
        state
            .transcript
            .push_question(QuestionKind::SubjectMenu { subjects });
    } else {
        let first = subjects[0].clone();
        state.transcript.push_message(
            Sender::Assistant,
            format!("Olá! Eu sou a IAra. Vamos começar com {first}. O que você quer fazer?"),
        );
        state.transcript.push_menu();
        state.active_subject = Some(first);
    }
    vec![]
}

// ============================================================================
// Free-text chat (placeholder echo, no busy lock)
// ============================================================================

fn handle_submit_message(state: &mut EngineState, text: &str) -> Vec<ChatEffect> {
    let text = text.trim();
    if text.is_empty() {
        return vec![];
    }
    state.transcript.push_message(Sender::User, text);
    let subject = state
        .active_subject
        .clone()
        .unwrap_or_else(|| "seus estudos".to_string());
    vec![ChatEffect::Delay {
        delay: state.config.echo_delay(),
        then: DelayedEvent::Echo { subject },
    }]
}

// ============================================================================
// Subject switch
// ============================================================================

fn handle_select_subject(state: &mut EngineState, subject: String) -> Vec<ChatEffect> {
    match state.hints.offer {
        // Switching is deferred until the fade-out completes, not dropped.
        HintOffer::Offering => {
            state.pending_switch = Some(subject);
            state.hints.offer = HintOffer::Dismissing;
            vec![ChatEffect::Delay {
                delay: state.config.hint_fade_delay(),
                then: DelayedEvent::HintFade,
            }]
        }
        HintOffer::Dismissing => {
            state.pending_switch = Some(subject);
            vec![]
        }
        HintOffer::Idle => apply_subject_switch(state, subject),
    }
}

fn apply_subject_switch(state: &mut EngineState, subject: String) -> Vec<ChatEffect> {
    // Disable the most recent live item first so that a superseded
    // operation can never append against it afterwards.
    state.switch_epoch += 1;
    state.transcript.disable_latest_live();
    state.transcript.drop_stale_for_subject_change();
    state.batch.reset();
    state.hints.offer = HintOffer::Idle;
    state.transcript.push_message(
        Sender::Assistant,
        format!("Certo! Vamos focar em {subject}. O que você quer fazer agora?"),
    );
    state.transcript.push_menu();
    state.active_subject = Some(subject);
    vec![ChatEffect::CancelHintCountdown]
}

// ============================================================================
// Answering
// ============================================================================

fn handle_answer(state: &mut EngineState, key: &str) -> Vec<ChatEffect> {
    if state.busy {
        return vec![];
    }
    let Some((item_id, kind)) = state.transcript.live_question() else {
        // Already answered (or no question on screen): reject silently.
        return vec![];
    };
    let kind = kind.clone();

    // Dismiss a visible offer without blocking the answer itself.
    let mut effects = Vec::new();
    if state.hints.is_offering() {
        state.hints.offer = HintOffer::Dismissing;
        effects.push(ChatEffect::Delay {
            delay: state.config.hint_fade_delay(),
            then: DelayedEvent::HintFade,
        });
    }

    match kind {
        QuestionKind::SubjectMenu { subjects } => {
            let Some(subject) = subjects.iter().find(|s| s.as_str() == key).cloned() else {
                return effects;
            };
            // No network call: disable, echo the literal choice, switch.
            state.transcript.disable(item_id);
            state.transcript.push_message(Sender::User, subject.clone());
            effects.extend(apply_subject_switch(state, subject));
            effects
        }
        QuestionKind::Exam(question) => {
            if state.session.blocks_identity_actions() {
                state
                    .transcript
                    .push_message(Sender::Assistant, GUEST_BLOCKED);
                return effects;
            }
            let Some(option_text) = question.alternativas.get(key) else {
                return effects;
            };
            state.transcript.disable(item_id);
            state.transcript.push_message(
                Sender::User,
                format!("Minha resposta: {key}) {option_text}"),
            );
            state.transcript.push_status("Verificando sua resposta...");
            lock_busy(state);
            effects.push(ChatEffect::CancelHintCountdown);
            effects.push(ChatEffect::Api(ApiCall::VerifyAnswer {
                question_id: question.question_id,
                user_answer: key.to_string(),
            }));
            effects
        }
    }
}

fn handle_answer_verified(
    state: &mut EngineState,
    result: Result<VerifyOutcome, ApiError>,
) -> Vec<ChatEffect> {
    if superseded(state) {
        // The question this verdict belongs to is gone from the screen.
        return drop_superseded(state, &result);
    }
    match result {
        Ok(outcome) => {
            state.transcript.drop_ephemeral();
            let verdict = if outcome.is_correct {
                "Parabéns, você acertou! 🎉".to_string()
            } else {
                format!(
                    "Não foi dessa vez. A resposta correta era: {}.",
                    outcome.correct_answer
                )
            };
            state.transcript.push_message(Sender::Assistant, verdict);
            // Busy stays held until the delayed advance lands; the verdict
            // and the next question belong to the same protocol.
            vec![ChatEffect::Delay {
                delay: state.config.advance_delay(),
                then: DelayedEvent::Advance,
            }]
        }
        Err(err) => {
            state.busy = false;
            state.transcript.drop_ephemeral();
            // The answered question is already disabled; a fresh menu is
            // the only way forward after a failed verification.
            let effects = gateway_failure(state, &err);
            if effects.is_empty() {
                state.transcript.push_menu();
            }
            effects
        }
    }
}

fn handle_advance_due(state: &mut EngineState) -> Vec<ChatEffect> {
    state.busy = false;
    if state.batch.is_empty() {
        // Superseded by a subject switch mid-delay; nothing to advance.
        return vec![];
    }
    match state.batch.advance() {
        Advance::Next(question) => {
            let question = question.clone();
            push_live_question(state, question)
        }
        Advance::Exhausted => {
            let subject = state
                .active_subject
                .clone()
                .unwrap_or_else(|| "essa matéria".to_string());
            state.transcript.push_message(
                Sender::Assistant,
                format!("Você concluiu todas as questões de {subject}! O que deseja fazer agora?"),
            );
            state.transcript.push_menu();
            state.batch.reset();
            vec![]
        }
    }
}

fn push_live_question(state: &mut EngineState, question: Question) -> Vec<ChatEffect> {
    state
        .transcript
        .push_question(QuestionKind::Exam(question));
    state.hints.offer = HintOffer::Idle;
    vec![ChatEffect::StartHintCountdown]
}

// ============================================================================
// Action menu
// ============================================================================

fn handle_menu(state: &mut EngineState, action: MenuAction) -> Vec<ChatEffect> {
    if state.busy {
        return vec![];
    }
    let Some(menu_id) = state.transcript.live_menu() else {
        return vec![];
    };

    let requires_identity = !matches!(action, MenuAction::GetQuestions);
    if requires_identity && state.session.blocks_identity_actions() {
        state
            .transcript
            .push_message(Sender::Assistant, GUEST_BLOCKED);
        return vec![];
    }

    match action {
        MenuAction::GetQuestions => {
            let Some(subject) = state.active_subject.clone() else {
                state.transcript.push_message(Sender::Assistant, NO_SUBJECT);
                return vec![];
            };
            state.transcript.disable(menu_id);
            state
                .transcript
                .push_status(format!("Buscando questões de {subject}..."));
            lock_busy(state);
            vec![ChatEffect::Api(ApiCall::FetchQuestions {
                subject,
                count: state.config.question_count,
            })]
        }
        MenuAction::EditSchedule => {
            state.transcript.disable(menu_id);
            state.transcript.push_status("Buscando seu cronograma...");
            lock_busy(state);
            vec![ChatEffect::Api(ApiCall::FetchSchedule)]
        }
        MenuAction::GetWeeklySchedule => {
            state.transcript.disable(menu_id);
            state
                .transcript
                .push_status("Montando seu plano semanal...");
            lock_busy(state);
            vec![ChatEffect::Api(ApiCall::FetchWeeklyPlan)]
        }
        MenuAction::AnalyzePerformance => {
            state.transcript.disable(menu_id);
            state
                .transcript
                .push_status("Analisando seu desempenho...");
            lock_busy(state);
            vec![ChatEffect::Api(ApiCall::FetchAnalysis)]
        }
    }
}

fn handle_questions_loaded(
    state: &mut EngineState,
    subject: &str,
    result: Result<Vec<Question>, ApiError>,
) -> Vec<ChatEffect> {
    if superseded(state) {
        // A subject switch landed mid-fetch; the batch is stale.
        return drop_superseded(state, &result);
    }
    state.busy = false;
    match result {
        Ok(questions) if questions.is_empty() => {
            state.transcript.drop_ephemeral();
            state.transcript.push_message(
                Sender::Assistant,
                format!("Não encontrei questões de {subject} no momento. Tente outra matéria."),
            );
            state.transcript.push_menu();
            vec![]
        }
        Ok(questions) => {
            state.transcript.drop_ephemeral();
            state.transcript.push_message(
                Sender::Assistant,
                format!(
                    "Encontrei {} questões de {subject}. Vamos lá!",
                    questions.len()
                ),
            );
            let first = questions[0].clone();
            state.batch.load(questions);
            push_live_question(state, first)
        }
        Err(err) => {
            state.transcript.drop_ephemeral();
            let effects = gateway_failure(state, &err);
            if effects.is_empty() {
                state.transcript.push_menu();
            }
            effects
        }
    }
}

// ============================================================================
// Schedule
// ============================================================================

fn handle_schedule_edit(state: &mut EngineState, call: ApiCall) -> Vec<ChatEffect> {
    if state.busy {
        return vec![];
    }
    if state.session.blocks_identity_actions() {
        state
            .transcript
            .push_message(Sender::Assistant, GUEST_BLOCKED);
        return vec![];
    }
    state.transcript.drop_schedule();
    state.transcript.push_status("Atualizando seu cronograma...");
    lock_busy(state);
    vec![ChatEffect::Api(call)]
}

fn handle_schedule_mutated(
    state: &mut EngineState,
    result: Result<(), ApiError>,
) -> Vec<ChatEffect> {
    if superseded(state) {
        return drop_superseded(state, &result);
    }
    match result {
        // Refresh regardless: the visible schedule always reflects server
        // truth, even after a failed mutation (e.g. a 3-item cap).
        Ok(()) => vec![ChatEffect::Api(ApiCall::FetchSchedule)],
        Err(ApiError::Unauthorized) => {
            state.busy = false;
            state.transcript.drop_ephemeral();
            unauthorized_redirect(state)
        }
        Err(err) => {
            state
                .transcript
                .push_message(Sender::Assistant, failure_message(&err));
            vec![ChatEffect::Api(ApiCall::FetchSchedule)]
        }
    }
}

fn handle_schedule_loaded(
    state: &mut EngineState,
    result: Result<iara_core::types::Schedule, ApiError>,
) -> Vec<ChatEffect> {
    if superseded(state) {
        return drop_superseded(state, &result);
    }
    state.busy = false;
    match result {
        Ok(schedule) => {
            state.transcript.drop_ephemeral();
            state.transcript.push_schedule(schedule);
            state.transcript.push_menu();
            vec![]
        }
        Err(err) => {
            state.transcript.drop_ephemeral();
            let effects = gateway_failure(state, &err);
            if effects.is_empty() {
                state.transcript.push_menu();
            }
            effects
        }
    }
}

fn handle_weekly_plan_loaded(
    state: &mut EngineState,
    result: Result<iara_core::types::WeeklyPlan, ApiError>,
) -> Vec<ChatEffect> {
    if superseded(state) {
        return drop_superseded(state, &result);
    }
    state.busy = false;
    match result {
        Ok(plan) => {
            state.transcript.drop_ephemeral();
            // The plan item carries its own "could not generate" sentinel;
            // rendering decides the message, not the engine.
            state.transcript.push_weekly_plan(plan);
            state.transcript.push_menu();
            vec![]
        }
        Err(err) => {
            state.transcript.drop_ephemeral();
            let effects = gateway_failure(state, &err);
            if effects.is_empty() {
                state.transcript.push_menu();
            }
            effects
        }
    }
}

fn handle_analysis_loaded(
    state: &mut EngineState,
    result: Result<iara_core::types::ErrorAnalysis, ApiError>,
) -> Vec<ChatEffect> {
    if superseded(state) {
        return drop_superseded(state, &result);
    }
    state.busy = false;
    match result {
        Ok(analysis) => {
            state.transcript.drop_ephemeral();
            state.transcript.push_analysis(analysis);
            state.transcript.push_menu();
            vec![]
        }
        Err(err) => {
            state.transcript.drop_ephemeral();
            let effects = gateway_failure(state, &err);
            if effects.is_empty() {
                state.transcript.push_menu();
            }
            effects
        }
    }
}

// ============================================================================
// Hints
// ============================================================================

fn handle_hint_offer_due(state: &mut EngineState) -> Vec<ChatEffect> {
    if state.busy || state.hints.offer != HintOffer::Idle {
        return vec![];
    }
    // Only a live exam question can be helped.
    let is_exam = matches!(
        state.transcript.live_question(),
        Some((_, QuestionKind::Exam(_)))
    );
    if is_exam {
        state.hints.offer = HintOffer::Offering;
    }
    vec![]
}

fn handle_request_hint(state: &mut EngineState) -> Vec<ChatEffect> {
    if !state.hints.is_offering() {
        return vec![];
    }
    let Some((_, QuestionKind::Exam(question))) = state.transcript.live_question() else {
        return vec![];
    };
    let question_id = question.question_id.clone();
    let level = state.hints.bump(&question_id);
    state.transcript.push_status("Pensando em uma dica...");
    vec![ChatEffect::Api(ApiCall::FetchHint { question_id, level })]
}

fn handle_hint_loaded(
    state: &mut EngineState,
    result: Result<String, ApiError>,
) -> Vec<ChatEffect> {
    state.transcript.drop_ephemeral();
    match result {
        Ok(dica) => {
            state
                .transcript
                .push_message(Sender::Assistant, format!("Dica: {dica}"));
            vec![]
        }
        Err(err) => gateway_failure(state, &err),
    }
}

fn handle_dismiss_hint(state: &mut EngineState) -> Vec<ChatEffect> {
    if !state.hints.is_offering() {
        return vec![];
    }
    state.hints.offer = HintOffer::Dismissing;
    vec![ChatEffect::Delay {
        delay: state.config.hint_fade_delay(),
        then: DelayedEvent::HintFade,
    }]
}

fn handle_hint_fade_done(state: &mut EngineState) -> Vec<ChatEffect> {
    state.hints.offer = HintOffer::Idle;
    match state.pending_switch.take() {
        Some(subject) => apply_subject_switch(state, subject),
        None => vec![],
    }
}

// ============================================================================
// Busy window
// ============================================================================

/// Opens a busy window stamped with the current switch epoch.
fn lock_busy(state: &mut EngineState) {
    state.busy = true;
    state.busy_epoch = state.switch_epoch;
}

/// True when a subject switch landed after this busy window opened.
fn superseded(state: &EngineState) -> bool {
    state.busy_epoch != state.switch_epoch
}

/// Discards a completion that arrived after its busy window was
/// superseded. The status line goes, nothing else joins the transcript;
/// a 401 still redirects (the gateway already cleared the token).
fn drop_superseded<T>(
    state: &mut EngineState,
    result: &Result<T, ApiError>,
) -> Vec<ChatEffect> {
    state.busy = false;
    state.transcript.drop_ephemeral();
    if matches!(result, Err(ApiError::Unauthorized)) {
        return unauthorized_redirect(state);
    }
    vec![]
}

// ============================================================================
// Failure taxonomy
// ============================================================================

/// Shared completion-failure path. `Unauthorized` becomes a redirect (and
/// is never shown inline); everything else becomes a diagnostic message.
fn gateway_failure(state: &mut EngineState, err: &ApiError) -> Vec<ChatEffect> {
    if matches!(err, ApiError::Unauthorized) {
        return unauthorized_redirect(state);
    }
    state
        .transcript
        .push_message(Sender::Assistant, failure_message(err));
    vec![]
}

fn unauthorized_redirect(state: &mut EngineState) -> Vec<ChatEffect> {
    // The gateway already cleared the durable token; mirror it in state.
    state.session.token = None;
    vec![ChatEffect::Redirect {
        reason: SESSION_EXPIRED.to_string(),
    }]
}

fn failure_message(err: &ApiError) -> String {
    match err {
        ApiError::Status {
            detail: Some(detail),
            ..
        } => format!("Erro: {detail}"),
        ApiError::Status {
            status,
            detail: None,
        } => format!("Erro: o servidor respondeu com HTTP {status}."),
        ApiError::Network(_) | ApiError::Parse(_) | ApiError::Unauthorized => {
            GENERIC_FAILURE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use iara_core::config::Config;
    use iara_core::session::Session;
    use iara_core::types::Schedule;

    use super::*;
    use crate::transcript::TranscriptItem;

    fn authed_state() -> EngineState {
        let session = Session {
            token: Some("tok".to_string()),
            guest: false,
        };
        EngineState::new(Config::default(), session, false)
    }

    fn guest_state() -> EngineState {
        let session = Session {
            token: None,
            guest: true,
        };
        EngineState::new(Config::default(), session, false)
    }

    fn question(id: &str) -> Question {
        Question {
            question_id: id.to_string(),
            materia: "Matemática".to_string(),
            enunciado: "2 + 2?".to_string(),
            alternativas: BTreeMap::from([
                ("a".to_string(), "4".to_string()),
                ("b".to_string(), "5".to_string()),
            ]),
            fonte: None,
            ano: None,
        }
    }

    /// Boots a state to the point where a batch of questions is live.
    fn state_with_questions(questions: Vec<Question>) -> EngineState {
        let mut state = authed_state();
        update(&mut state, ChatEvent::Started);
        update(
            &mut state,
            ChatEvent::SubjectsLoaded {
                result: Ok(vec!["Matemática".to_string()]),
            },
        );
        update(
            &mut state,
            ChatEvent::Menu {
                action: MenuAction::GetQuestions,
            },
        );
        update(
            &mut state,
            ChatEvent::QuestionsLoaded {
                subject: "Matemática".to_string(),
                result: Ok(questions),
            },
        );
        state
    }

    fn messages(state: &EngineState) -> Vec<&str> {
        state
            .transcript
            .items()
            .iter()
            .filter_map(|item| match item {
                TranscriptItem::Message { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn last_message(state: &EngineState) -> &str {
        messages(state).last().copied().unwrap_or("")
    }

    #[test]
    fn entry_without_session_redirects() {
        let mut state = EngineState::new(
            Config::default(),
            Session {
                token: None,
                guest: false,
            },
            false,
        );
        let effects = update(&mut state, ChatEvent::Started);
        assert!(matches!(
            effects.as_slice(),
            [ChatEffect::Redirect { reason }] if reason == LOGIN_REQUIRED
        ));
    }

    #[test]
    fn entry_with_token_loads_subjects() {
        let mut state = authed_state();
        let effects = update(&mut state, ChatEvent::Started);
        assert_eq!(effects, vec![ChatEffect::Api(ApiCall::ListSubjects)]);
    }

    #[test]
    fn subject_fetch_failure_falls_back() {
        let mut state = authed_state();
        update(
            &mut state,
            ChatEvent::SubjectsLoaded {
                result: Err(ApiError::Network("refused".to_string())),
            },
        );
        assert_eq!(
            state.active_subject.as_deref(),
            Some(state.config.fallback_subjects[0].as_str())
        );
        assert!(state.transcript.live_menu().is_some());
    }

    #[test]
    fn compact_entry_offers_subject_menu() {
        let session = Session {
            token: Some("tok".to_string()),
            guest: false,
        };
        let mut state = EngineState::new(Config::default(), session, true);
        update(
            &mut state,
            ChatEvent::SubjectsLoaded {
                result: Ok(vec!["Física".to_string(), "História".to_string()]),
            },
        );
        assert_eq!(state.active_subject, None);
        let (_, kind) = state.transcript.live_question().unwrap();
        assert!(matches!(kind, QuestionKind::SubjectMenu { subjects } if subjects.len() == 2));
    }

    #[test]
    fn answering_the_subject_menu_switches_without_network() {
        let session = Session {
            token: None,
            guest: true,
        };
        let mut state = EngineState::new(Config::default(), session, true);
        update(
            &mut state,
            ChatEvent::SubjectsLoaded {
                result: Ok(vec!["Física".to_string()]),
            },
        );
        let effects = update(
            &mut state,
            ChatEvent::AnswerQuestion {
                key: "Física".to_string(),
            },
        );
        assert!(!effects.iter().any(|e| matches!(e, ChatEffect::Api(_))));
        assert_eq!(state.active_subject.as_deref(), Some("Física"));
        assert_eq!(state.transcript.live_question(), None);
        assert!(state.transcript.live_menu().is_some());
    }

    #[test]
    fn menu_fetch_sets_busy_and_rejects_reentry() {
        let mut state = authed_state();
        update(
            &mut state,
            ChatEvent::SubjectsLoaded {
                result: Ok(vec!["Matemática".to_string()]),
            },
        );
        let effects = update(
            &mut state,
            ChatEvent::Menu {
                action: MenuAction::GetQuestions,
            },
        );
        assert!(state.busy);
        assert!(matches!(
            effects.as_slice(),
            [ChatEffect::Api(ApiCall::FetchQuestions { subject, .. })] if subject == "Matemática"
        ));
        // Double submit while busy is dropped outright.
        let effects = update(
            &mut state,
            ChatEvent::Menu {
                action: MenuAction::EditSchedule,
            },
        );
        assert!(effects.is_empty());
    }

    #[test]
    fn loaded_questions_go_live_with_a_countdown() {
        let state = state_with_questions(vec![question("q1"), question("q2")]);
        assert!(!state.busy);
        assert!(messages(&state)
            .iter()
            .any(|m| m.contains("Encontrei 2 questões de Matemática")));
        let (_, kind) = state.transcript.live_question().unwrap();
        assert!(matches!(kind, QuestionKind::Exam(q) if q.question_id == "q1"));
    }

    #[test]
    fn correct_answer_advances_after_delay() {
        let mut state = state_with_questions(vec![question("q1"), question("q2")]);
        let effects = update(
            &mut state,
            ChatEvent::AnswerQuestion {
                key: "a".to_string(),
            },
        );
        assert!(state.busy);
        assert!(effects
            .iter()
            .any(|e| matches!(e, ChatEffect::Api(ApiCall::VerifyAnswer { question_id, user_answer })
                if question_id == "q1" && user_answer == "a")));
        assert_eq!(state.transcript.live_question(), None);
        assert!(messages(&state).iter().any(|m| m.contains("Minha resposta: a) 4")));

        // Answers while the verification is outstanding are dropped.
        let effects = update(
            &mut state,
            ChatEvent::AnswerQuestion {
                key: "b".to_string(),
            },
        );
        assert!(effects.is_empty());

        let effects = update(
            &mut state,
            ChatEvent::AnswerVerified {
                result: Ok(VerifyOutcome {
                    is_correct: true,
                    correct_answer: "a".to_string(),
                    question_id: "q1".to_string(),
                }),
            },
        );
        assert!(state.busy, "busy is held until the advance lands");
        assert!(last_message(&state).contains("Parabéns"));
        assert!(matches!(
            effects.as_slice(),
            [ChatEffect::Delay { then: DelayedEvent::Advance, .. }]
        ));

        update(&mut state, ChatEvent::AdvanceDue);
        assert!(!state.busy);
        assert_eq!(state.batch.cursor(), 1);
        let (_, kind) = state.transcript.live_question().unwrap();
        assert!(matches!(kind, QuestionKind::Exam(q) if q.question_id == "q2"));
    }

    #[test]
    fn wrong_answer_names_the_correct_one() {
        let mut state = state_with_questions(vec![question("q1")]);
        update(
            &mut state,
            ChatEvent::AnswerQuestion {
                key: "b".to_string(),
            },
        );
        update(
            &mut state,
            ChatEvent::AnswerVerified {
                result: Ok(VerifyOutcome {
                    is_correct: false,
                    correct_answer: "a".to_string(),
                    question_id: "q1".to_string(),
                }),
            },
        );
        assert!(last_message(&state).contains("Não foi dessa vez"));
        assert!(last_message(&state).contains('a'));
    }

    #[test]
    fn exhaustion_wraps_up_and_reoffers_the_menu() {
        let mut state = state_with_questions(vec![question("q1")]);
        update(
            &mut state,
            ChatEvent::AnswerQuestion {
                key: "a".to_string(),
            },
        );
        update(
            &mut state,
            ChatEvent::AnswerVerified {
                result: Ok(VerifyOutcome {
                    is_correct: true,
                    correct_answer: "a".to_string(),
                    question_id: "q1".to_string(),
                }),
            },
        );
        update(&mut state, ChatEvent::AdvanceDue);
        assert!(!state.busy);
        assert!(last_message(&state).contains("concluiu todas as questões de Matemática"));
        assert!(state.transcript.live_menu().is_some());
        assert!(state.batch.is_empty());
    }

    #[test]
    fn unauthorized_verification_redirects_silently() {
        let mut state = state_with_questions(vec![question("q1")]);
        update(
            &mut state,
            ChatEvent::AnswerQuestion {
                key: "a".to_string(),
            },
        );
        let before = messages(&state).len();
        let effects = update(
            &mut state,
            ChatEvent::AnswerVerified {
                result: Err(ApiError::Unauthorized),
            },
        );
        assert!(matches!(
            effects.as_slice(),
            [ChatEffect::Redirect { reason }] if reason == SESSION_EXPIRED
        ));
        assert_eq!(state.session.token, None);
        // No diagnostic message joins the transcript on 401.
        assert_eq!(messages(&state).len(), before - 1); // only the status dropped
        assert!(!state.busy);
    }

    #[test]
    fn failed_mutation_still_refreshes_the_schedule() {
        let mut state = authed_state();
        update(
            &mut state,
            ChatEvent::AddTopic {
                subject_id: 7,
                nome: "Funções".to_string(),
            },
        );
        assert!(state.busy);
        let effects = update(
            &mut state,
            ChatEvent::ScheduleMutated {
                result: Err(ApiError::Status {
                    status: 400,
                    detail: Some("limite atingido".to_string()),
                }),
            },
        );
        assert_eq!(effects, vec![ChatEffect::Api(ApiCall::FetchSchedule)]);
        assert!(messages(&state).iter().any(|m| *m == "Erro: limite atingido"));
        assert!(state.busy, "busy is held through the refresh round-trip");

        update(
            &mut state,
            ChatEvent::ScheduleLoaded {
                result: Ok(Schedule {
                    id: 1,
                    nome: "Cronograma".to_string(),
                    materias: vec![],
                }),
            },
        );
        assert!(!state.busy);
        assert!(state
            .transcript
            .items()
            .iter()
            .any(|i| matches!(i, TranscriptItem::Schedule { .. })));
    }

    #[test]
    fn guest_can_fetch_questions_but_not_edit_schedule() {
        let mut state = guest_state();
        update(
            &mut state,
            ChatEvent::SubjectsLoaded {
                result: Ok(vec!["Matemática".to_string()]),
            },
        );
        let effects = update(
            &mut state,
            ChatEvent::Menu {
                action: MenuAction::EditSchedule,
            },
        );
        assert!(effects.is_empty());
        assert!(last_message(&state).contains("entrar na sua conta"));
        assert!(state.transcript.live_menu().is_some(), "menu stays live");

        let effects = update(
            &mut state,
            ChatEvent::Menu {
                action: MenuAction::GetQuestions,
            },
        );
        assert!(matches!(
            effects.as_slice(),
            [ChatEffect::Api(ApiCall::FetchQuestions { .. })]
        ));
    }

    #[test]
    fn hint_levels_climb_per_question() {
        let mut state = state_with_questions(vec![question("q1")]);
        update(&mut state, ChatEvent::HintOfferDue);
        assert!(state.hints.is_offering());

        let effects = update(&mut state, ChatEvent::RequestHint);
        assert!(matches!(
            effects.as_slice(),
            [ChatEffect::Api(ApiCall::FetchHint { question_id, level: 1 })]
                if question_id == "q1"
        ));
        update(
            &mut state,
            ChatEvent::HintLoaded {
                result: Ok("Pense em somas.".to_string()),
            },
        );
        assert!(last_message(&state).contains("Dica: Pense em somas."));

        // A second request for the same question escalates the level.
        let effects = update(&mut state, ChatEvent::RequestHint);
        assert!(matches!(
            effects.as_slice(),
            [ChatEffect::Api(ApiCall::FetchHint { level: 2, .. })]
        ));
    }

    #[test]
    fn hint_offer_ignored_while_busy() {
        let mut state = authed_state();
        update(
            &mut state,
            ChatEvent::SubjectsLoaded {
                result: Ok(vec!["Matemática".to_string()]),
            },
        );
        update(
            &mut state,
            ChatEvent::Menu {
                action: MenuAction::GetQuestions,
            },
        );
        update(&mut state, ChatEvent::HintOfferDue);
        assert!(!state.hints.is_offering());
    }

    #[test]
    fn subject_switch_during_offer_is_deferred_until_fade() {
        let mut state = state_with_questions(vec![question("q1")]);
        update(&mut state, ChatEvent::HintOfferDue);

        let effects = update(
            &mut state,
            ChatEvent::SelectSubject {
                subject: "História".to_string(),
            },
        );
        assert!(matches!(
            effects.as_slice(),
            [ChatEffect::Delay { then: DelayedEvent::HintFade, .. }]
        ));
        // Nothing switches yet.
        assert_eq!(state.active_subject.as_deref(), Some("Matemática"));
        assert_eq!(state.pending_switch.as_deref(), Some("História"));

        let effects = update(&mut state, ChatEvent::HintFadeDone);
        assert_eq!(state.active_subject.as_deref(), Some("História"));
        assert_eq!(state.pending_switch, None);
        assert!(state.batch.is_empty());
        assert!(state.transcript.live_question().is_none());
        assert!(effects.contains(&ChatEffect::CancelHintCountdown));
        assert!(last_message(&state).contains("Vamos focar em História"));
    }

    #[test]
    fn dismissing_the_offer_fades_without_switching() {
        let mut state = state_with_questions(vec![question("q1")]);
        update(&mut state, ChatEvent::HintOfferDue);
        let effects = update(&mut state, ChatEvent::DismissHint);
        assert!(matches!(
            effects.as_slice(),
            [ChatEffect::Delay { then: DelayedEvent::HintFade, .. }]
        ));
        update(&mut state, ChatEvent::HintFadeDone);
        assert_eq!(state.hints.offer, HintOffer::Idle);
        assert_eq!(state.active_subject.as_deref(), Some("Matemática"));
        assert!(state.transcript.live_question().is_some());
    }

    #[test]
    fn stale_question_batch_is_dropped_after_switch() {
        let mut state = authed_state();
        update(
            &mut state,
            ChatEvent::SubjectsLoaded {
                result: Ok(vec!["Matemática".to_string()]),
            },
        );
        update(
            &mut state,
            ChatEvent::Menu {
                action: MenuAction::GetQuestions,
            },
        );
        update(
            &mut state,
            ChatEvent::SelectSubject {
                subject: "História".to_string(),
            },
        );
        // The old subject's fetch lands late; it must not surface.
        let effects = update(
            &mut state,
            ChatEvent::QuestionsLoaded {
                subject: "Matemática".to_string(),
                result: Ok(vec![question("q1")]),
            },
        );
        assert!(effects.is_empty());
        assert!(state.transcript.live_question().is_none());
        assert!(state.batch.is_empty());
        assert!(!state.busy);
    }

    #[test]
    fn stale_schedule_fetch_is_dropped_after_switch() {
        let mut state = authed_state();
        update(
            &mut state,
            ChatEvent::SubjectsLoaded {
                result: Ok(vec!["Matemática".to_string()]),
            },
        );
        update(
            &mut state,
            ChatEvent::Menu {
                action: MenuAction::EditSchedule,
            },
        );
        assert!(state.busy);
        update(
            &mut state,
            ChatEvent::SelectSubject {
                subject: "História".to_string(),
            },
        );
        // The fetch from before the switch lands late; no panel, no extra
        // menu, just the one the switch itself appended.
        let effects = update(
            &mut state,
            ChatEvent::ScheduleLoaded {
                result: Ok(Schedule {
                    id: 1,
                    nome: "Cronograma".to_string(),
                    materias: vec![],
                }),
            },
        );
        assert!(effects.is_empty());
        assert!(!state.busy);
        assert!(!state
            .transcript
            .items()
            .iter()
            .any(|i| matches!(i, TranscriptItem::Schedule { .. })));
        assert!(last_message(&state).contains("Vamos focar em História"));
    }

    #[test]
    fn stale_verdict_is_dropped_after_switch() {
        let mut state = state_with_questions(vec![question("q1"), question("q2")]);
        update(
            &mut state,
            ChatEvent::AnswerQuestion {
                key: "a".to_string(),
            },
        );
        update(
            &mut state,
            ChatEvent::SelectSubject {
                subject: "História".to_string(),
            },
        );
        let effects = update(
            &mut state,
            ChatEvent::AnswerVerified {
                result: Ok(VerifyOutcome {
                    is_correct: true,
                    correct_answer: "a".to_string(),
                    question_id: "q1".to_string(),
                }),
            },
        );
        assert!(effects.is_empty(), "no delayed advance either");
        assert!(!state.busy);
        assert!(!messages(&state).iter().any(|m| m.contains("Parabéns")));
    }

    #[test]
    fn empty_subject_universe_still_boots() {
        let mut state = authed_state();
        state.config.fallback_subjects.clear();
        update(
            &mut state,
            ChatEvent::SubjectsLoaded {
                result: Err(ApiError::Network("refused".to_string())),
            },
        );
        assert_eq!(state.active_subject, None);
        assert!(state.transcript.live_menu().is_some());
        assert!(last_message(&state).contains("cronograma continua acessível"));
    }

    #[test]
    fn free_text_echoes_after_a_delay() {
        let mut state = authed_state();
        state.active_subject = Some("Física".to_string());
        let effects = update(
            &mut state,
            ChatEvent::SubmitMessage {
                text: "  como funciona empuxo?  ".to_string(),
            },
        );
        assert!(matches!(
            effects.as_slice(),
            [ChatEffect::Delay { then: DelayedEvent::Echo { subject }, .. }]
                if subject == "Física"
        ));
        assert_eq!(last_message(&state), "como funciona empuxo?");

        update(
            &mut state,
            ChatEvent::EchoDue {
                subject: "Física".to_string(),
            },
        );
        assert!(last_message(&state).contains("Física"));
    }

    #[test]
    fn blank_messages_are_ignored() {
        let mut state = authed_state();
        let effects = update(
            &mut state,
            ChatEvent::SubmitMessage {
                text: "   ".to_string(),
            },
        );
        assert!(effects.is_empty());
        assert!(messages(&state).is_empty());
    }
}
