//! Wire types for the SeShat tutoring API.
//!
//! Field names follow the server contract (Portuguese), which is fixed:
//! renaming them here would break deserialization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A quiz question as returned by `GET /perguntas/{materia}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Remote identity, used for answer verification and hint requests.
    #[serde(alias = "id")]
    pub question_id: String,
    /// Subject this question belongs to.
    pub materia: String,
    /// The prompt text shown to the student.
    pub enunciado: String,
    /// Option key (`a`..`d`) to option text. Ordered by key.
    pub alternativas: BTreeMap<String, String>,
    /// Exam board or source label, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fonte: Option<String>,
    /// Exam year, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ano: Option<u32>,
}

/// Response of `POST /perguntas/verificar`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOutcome {
    pub is_correct: bool,
    pub correct_answer: String,
    pub question_id: String,
}

/// The student's study schedule (`GET /cronograma/me`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: u64,
    pub nome: String,
    #[serde(default)]
    pub materias: Vec<ScheduleSubject>,
}

/// One subject inside a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSubject {
    pub id: u64,
    pub nome: String,
    #[serde(default)]
    pub topicos: Vec<ScheduleTopic>,
}

/// One topic inside a schedule subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTopic {
    pub id: u64,
    pub nome: String,
    #[serde(default)]
    pub concluido: bool,
}

/// Weekly plan (`GET /cronograma/me/semanal`).
///
/// The server either returns a day→topic mapping or a `{detalhe}` body
/// explaining why a plan could not be generated. The engine does not
/// interpret the sentinel further; rendering decides the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeeklyPlan {
    Unavailable { detalhe: String },
    Plan(BTreeMap<String, String>),
}

/// Performance analysis (`GET /ia/analise-erros`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorAnalysis {
    pub feedback_text: String,
    #[serde(default)]
    pub suggested_topics: Vec<String>,
}

/// Response of `GET /materias`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectList {
    #[serde(default)]
    pub materias_disponiveis: Vec<String>,
}

/// Response of `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

/// Response of `POST /ia/dica`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HintResponse {
    pub dica: String,
}
