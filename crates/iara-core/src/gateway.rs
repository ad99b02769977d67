//! Remote API Gateway for the SeShat tutoring service.
//!
//! A thin wrapper over HTTP: JSON bodies, bearer-auth headers, and uniform
//! error translation. The gateway knows nothing about the transcript; its
//! only side effects are network I/O and clearing the stored token on 401.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::session::TokenStore;
use crate::types::{
    ErrorAnalysis, HintResponse, LoginResponse, Question, Schedule, SubjectList, VerifyOutcome,
    WeeklyPlan,
};

/// Standard User-Agent header for IARA API requests.
pub const USER_AGENT: &str = concat!("iara/", env!("CARGO_PKG_VERSION"));

/// Categories of gateway failures surfaced to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Token invalid or expired. The stored token has already been cleared.
    Unauthorized,
    /// Non-2xx response with the server-supplied `detail`, when present.
    Status { status: u16, detail: Option<String> },
    /// Connection-level failure (DNS, refused, timeout).
    Network(String),
    /// The response body could not be decoded.
    Parse(String),
}

impl ApiError {
    /// One-line summary suitable for an inline transcript diagnostic.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized => write!(f, "unauthorized"),
            ApiError::Status { status, detail } => match detail {
                Some(detail) => write!(f, "HTTP {status}: {detail}"),
                None => write!(f, "HTTP {status}"),
            },
            ApiError::Network(msg) => write!(f, "network error: {msg}"),
            ApiError::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Result type for gateway operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// HTTP client for the SeShat API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, tokens: TokenStore) -> Self {
        let http = match reqwest::Client::builder().user_agent(USER_AGENT).build() {
            Ok(http) => http,
            Err(err) => {
                // Requests still go out, only without the custom User-Agent.
                tracing::warn!("http client options rejected, using defaults: {err}");
                reqwest::Client::new()
            }
        };
        Self {
            http,
            base_url: base_url.into(),
            tokens,
        }
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.tokens
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Attaches the bearer header when a token is stored.
    fn with_bearer(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.tokens.load() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends a request and decodes a JSON response.
    ///
    /// Uniform translation: connection failures become `Network`, 401
    /// clears the stored token and becomes `Unauthorized`, any other
    /// non-2xx becomes `Status` carrying the body's `detail` field,
    /// undecodable 2xx bodies become `Parse`.
    async fn send_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> ApiResult<T> {
        let body = self.send_raw(request).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Sends a request where the caller only cares about success.
    /// HTTP 204 (or any empty 2xx body) resolves to `()`.
    async fn send_empty(&self, request: reqwest::RequestBuilder) -> ApiResult<()> {
        self.send_raw(request).await.map(|_| ())
    }

    async fn send_raw(&self, request: reqwest::RequestBuilder) -> ApiResult<String> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            tracing::debug!("401 from server, clearing stored token");
            self.tokens.clear();
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail: extract_detail(&body),
            });
        }
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(String::new());
        }
        response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))
    }

    // ========================================================================
    // Endpoints
    // ========================================================================

    /// `GET /materias`
    pub async fn list_subjects(&self) -> ApiResult<Vec<String>> {
        let list: SubjectList = self.send_json(self.http.get(self.url("/materias"))).await?;
        Ok(list.materias_disponiveis)
    }

    /// `POST /login` (form-encoded, per `OAuth2PasswordRequestForm`).
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<String> {
        let form = [("username", username), ("password", password)];
        let response: LoginResponse = self
            .send_json(self.http.post(self.url("/login")).form(&form))
            .await?;
        Ok(response.access_token)
    }

    /// `POST /register`
    pub async fn register(&self, email: &str, password: &str) -> ApiResult<()> {
        let body = serde_json::json!({ "email": email, "password": password });
        self.send_empty(self.http.post(self.url("/register")).json(&body))
            .await
    }

    /// `GET /perguntas/{materia}?count=N`
    pub async fn fetch_questions(&self, subject: &str, count: u32) -> ApiResult<Vec<Question>> {
        // Subject names carry accents; let the URL type do the escaping.
        let url = url::Url::parse(&format!("{}/perguntas/{subject}", self.base_url))
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        self.send_json(self.http.get(url).query(&[("count", count.to_string())]))
            .await
    }

    /// `POST /perguntas/verificar`
    pub async fn verify_answer(
        &self,
        question_id: &str,
        user_answer: &str,
    ) -> ApiResult<VerifyOutcome> {
        let body = serde_json::json!({
            "question_id": question_id,
            "user_answer": user_answer,
        });
        self.send_json(self.with_bearer(self.http.post(self.url("/perguntas/verificar"))).json(&body))
            .await
    }

    /// `GET /cronograma/me`
    pub async fn get_schedule(&self) -> ApiResult<Schedule> {
        self.send_json(self.with_bearer(self.http.get(self.url("/cronograma/me"))))
            .await
    }

    /// `POST /cronograma/materias`
    pub async fn add_subject(&self, nome: &str) -> ApiResult<()> {
        let body = serde_json::json!({ "nome": nome });
        self.send_empty(
            self.with_bearer(self.http.post(self.url("/cronograma/materias")))
                .json(&body),
        )
        .await
    }

    /// `POST /cronograma/materias/{id}/topicos`
    pub async fn add_topic(&self, subject_id: u64, nome: &str) -> ApiResult<()> {
        let body = serde_json::json!({ "nome": nome });
        let path = format!("/cronograma/materias/{subject_id}/topicos");
        self.send_empty(self.with_bearer(self.http.post(self.url(&path))).json(&body))
            .await
    }

    /// `DELETE /cronograma/materias/{id}`
    pub async fn delete_subject(&self, subject_id: u64) -> ApiResult<()> {
        let path = format!("/cronograma/materias/{subject_id}");
        self.send_empty(self.with_bearer(self.http.delete(self.url(&path))))
            .await
    }

    /// `DELETE /cronograma/topicos/{id}`
    pub async fn delete_topic(&self, topic_id: u64) -> ApiResult<()> {
        let path = format!("/cronograma/topicos/{topic_id}");
        self.send_empty(self.with_bearer(self.http.delete(self.url(&path))))
            .await
    }

    /// `GET /cronograma/me/semanal`
    pub async fn weekly_plan(&self) -> ApiResult<WeeklyPlan> {
        self.send_json(self.with_bearer(self.http.get(self.url("/cronograma/me/semanal"))))
            .await
    }

    /// `GET /ia/analise-erros`
    pub async fn error_analysis(&self) -> ApiResult<ErrorAnalysis> {
        self.send_json(self.with_bearer(self.http.get(self.url("/ia/analise-erros"))))
            .await
    }

    /// `POST /ia/dica`
    pub async fn hint(&self, question_id: &str, level: u8) -> ApiResult<String> {
        let body = serde_json::json!({
            "question_id": question_id,
            "level": level,
        });
        let response: HintResponse = self
            .send_json(self.with_bearer(self.http.post(self.url("/ia/dica"))).json(&body))
            .await?;
        Ok(response.dica)
    }
}

/// Pulls the `detail` field out of an error body, when it is JSON.
fn extract_detail(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    json.get("detail")
        .and_then(Value::as_str)
        .map(str::to_string)
}
