use axum::{
    Router,
    extract::{Path, State},
    response::Json,
    routing::{get, post, put},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    errors::{ApiError, ErrorContext, ErrorResponse, SessionError},
    gamification::{ACHIEVEMENTS, Achievement, LevelInfo, SessionProgress},
    llm_service::LLMService,
    models::{Answer, StudySetRequest},
    session::{QuizResult, SessionSettings, SessionStore, StudySession, TimerStatus},
};

// Import logging macros
use crate::{log_api_error, log_api_start, log_api_success, log_api_warn};

const MAX_TIME_LIMIT_MINUTES: u32 = 180;

#[derive(Clone)]
pub struct AppState {
    pub llm_service: LLMService,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(llm_service: LLMService, sessions: SessionStore) -> Self {
        Self { llm_service, sessions }
    }
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

type HandlerResult<T> = Result<Json<ApiResponse<T>>, ErrorResponse>;

/// Session snapshot with its derived level
#[derive(Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: StudySession,
    pub level: LevelInfo,
}

impl From<StudySession> for SessionView {
    fn from(session: StudySession) -> Self {
        let level = session.level();
        Self { session, level }
    }
}

#[derive(Serialize)]
pub struct ProgressView {
    pub progress: SessionProgress,
    pub level: LevelInfo,
}

impl From<&StudySession> for ProgressView {
    fn from(session: &StudySession) -> Self {
        Self {
            progress: session.progress.clone(),
            level: session.level(),
        }
    }
}

#[derive(Deserialize)]
pub struct FlipRequest {
    pub flipped: bool,
}

#[derive(Serialize)]
pub struct FlipView {
    pub index: usize,
    pub flipped: bool,
    pub flashcards_reviewed: u32,
}

fn session_not_found(operation: &str, id: Uuid) -> ErrorResponse {
    ApiError::NotFound(format!("Session {} not found", id))
        .to_response_with_context(ErrorContext::new(operation, "session").with_id(&id.to_string()))
}

fn session_error(operation: &str, id: Uuid, error: SessionError) -> ErrorResponse {
    ApiError::from(error).to_response_with_context(ErrorContext::new(operation, "session").with_id(&id.to_string()))
}

/// Runs a fallible session mutation and maps both failure layers to responses
async fn mutate_session<T>(
    state: &AppState,
    operation: &str,
    id: Uuid,
    f: impl FnOnce(&mut StudySession) -> Result<T, SessionError>,
) -> Result<T, ErrorResponse> {
    match state.sessions.with_session_mut(id, f).await {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => Err(session_error(operation, id, e)),
        None => Err(session_not_found(operation, id)),
    }
}

// Session endpoints
pub async fn create_session(State(state): State<AppState>) -> HandlerResult<SessionView> {
    log_api_start!("create_session");
    let session = state.sessions.create().await;
    log_api_success!("create_session", session_id = session.id, "Session created");
    Ok(Json(ApiResponse::success(session.into())))
}

pub async fn get_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> HandlerResult<SessionView> {
    log_api_start!("get_session", session_id = id);
    match state.sessions.get(id).await {
        Some(session) => Ok(Json(ApiResponse::success(session.into()))),
        None => Err(session_not_found("get_session", id)),
    }
}

pub async fn delete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> HandlerResult<Value> {
    log_api_start!("delete_session", session_id = id);
    if state.sessions.remove(id).await {
        log_api_success!("delete_session", session_id = id, "Session ended");
        Ok(Json(ApiResponse::success(json!({ "deleted": true }))))
    } else {
        Err(session_not_found("delete_session", id))
    }
}

pub async fn update_settings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(settings): Json<SessionSettings>,
) -> HandlerResult<SessionSettings> {
    log_api_start!("update_settings", session_id = id);

    if settings.timed_mode {
        match settings.time_limit_minutes {
            Some(minutes) if (1..=MAX_TIME_LIMIT_MINUTES).contains(&minutes) => {}
            _ => {
                let context = ErrorContext::new("update_settings", "session").with_id(&id.to_string());
                return Err(ApiError::ValidationError(format!(
                    "Timed mode needs a time limit between 1 and {} minutes",
                    MAX_TIME_LIMIT_MINUTES
                ))
                .to_response_with_context(context));
            }
        }
    }

    let updated = mutate_session(&state, "update_settings", id, |session| {
        session.settings = settings;
        Ok(session.settings.clone())
    })
    .await?;

    debug!(session_id = %id, theme = ?updated.theme, timed = updated.timed_mode, "Settings updated");
    Ok(Json(ApiResponse::success(updated)))
}

/// The Generate action: clears old artifacts, runs the pipeline, stores what succeeded.
pub async fn generate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<StudySetRequest>,
) -> HandlerResult<SessionView> {
    log_api_start!("generate", session_id = id);

    let limits = state.llm_service.limits();
    let validation = request.request.validate(limits.min, limits.max).and_then(|_| {
        match request.flashcard_count {
            Some(count) => request.request.with_count(count).validate(limits.min, limits.max),
            None => Ok(()),
        }
    });
    if let Err(msg) = validation {
        let context = ErrorContext::new("generate", "session").with_id(&id.to_string());
        return Err(ApiError::ValidationError(msg).to_response_with_context(context));
    }

    // Clear first; the lock is released before any model call
    mutate_session(&state, "generate", id, |session| {
        session.begin_generation(&request.request.topic);
        Ok(())
    })
    .await?;

    let set = state.llm_service.generate_study_set(&request).await;

    let view = mutate_session(&state, "generate", id, move |session| {
        let now = Utc::now();
        match set.quiz {
            Ok(questions) => session.set_quiz(questions, now),
            Err(e) => {
                log_api_error!("generate", session_id = session.id, error = e, "Quiz generation failed");
                session.record_generation_error("quiz", e.user_message());
            }
        }
        match set.flashcards {
            Some(Ok(cards)) => session.set_flashcards(cards),
            Some(Err(e)) => {
                log_api_error!("generate", session_id = session.id, error = e, "Flashcard generation failed");
                session.record_generation_error("flashcards", e.user_message());
            }
            None => {}
        }
        match set.study_guide {
            Some(Ok(guide)) => session.set_study_guide(guide),
            Some(Err(e)) => {
                log_api_error!("generate", session_id = session.id, error = e, "Study guide generation failed");
                session.record_generation_error("study_guide", e.user_message());
            }
            None => {}
        }
        Ok(SessionView::from(session.clone()))
    })
    .await?;

    if view.session.generation_errors.is_empty() {
        log_api_success!("generate", session_id = id, "All requested artifacts generated");
    } else {
        log_api_warn!(
            "generate",
            session_id = id,
            format!("{} artifact(s) failed", view.session.generation_errors.len())
        );
    }
    Ok(Json(ApiResponse::success(view)))
}

// Quiz endpoints
pub async fn select_answer(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
    Json(answer): Json<Answer>,
) -> HandlerResult<BTreeMap<usize, Answer>> {
    log_api_start!("select_answer", session_id = id);
    let answers = mutate_session(&state, "select_answer", id, |session| {
        session.select_answer(index, answer)?;
        Ok(session.quiz.as_ref().map(|q| q.answers.clone()).unwrap_or_default())
    })
    .await?;
    Ok(Json(ApiResponse::success(answers)))
}

pub async fn submit_quiz(State(state): State<AppState>, Path(id): Path<Uuid>) -> HandlerResult<QuizResult> {
    log_api_start!("submit_quiz", session_id = id);
    let result = mutate_session(&state, "submit_quiz", id, |session| session.submit_quiz(Utc::now())).await?;

    info!(
        session_id = %id,
        correct = result.correct,
        total = result.total,
        score_percent = result.score_percent,
        xp_gained = result.outcome.xp_gained,
        "Quiz graded"
    );
    Ok(Json(ApiResponse::success(result)))
}

pub async fn quiz_timer(State(state): State<AppState>, Path(id): Path<Uuid>) -> HandlerResult<TimerStatus> {
    let status = mutate_session(&state, "quiz_timer", id, |session| session.tick(Utc::now())).await?;
    Ok(Json(ApiResponse::success(status)))
}

// Flashcard endpoints
pub async fn flip_card(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
    Json(request): Json<FlipRequest>,
) -> HandlerResult<FlipView> {
    log_api_start!("flip_card", session_id = id);
    let view = mutate_session(&state, "flip_card", id, |session| {
        let flipped = session.set_flipped(index, request.flipped, Utc::now().date_naive())?;
        Ok(FlipView {
            index,
            flipped,
            flashcards_reviewed: session.progress.flashcards_reviewed,
        })
    })
    .await?;
    Ok(Json(ApiResponse::success(view)))
}

// Progress endpoints
pub async fn get_progress(State(state): State<AppState>, Path(id): Path<Uuid>) -> HandlerResult<ProgressView> {
    let view = mutate_session(&state, "get_progress", id, |session| Ok(ProgressView::from(&*session))).await?;
    Ok(Json(ApiResponse::success(view)))
}

pub async fn reset_progress(State(state): State<AppState>, Path(id): Path<Uuid>) -> HandlerResult<ProgressView> {
    log_api_start!("reset_progress", session_id = id);
    let view = mutate_session(&state, "reset_progress", id, |session| {
        session.reset_progress();
        Ok(ProgressView::from(&*session))
    })
    .await?;
    log_api_success!("reset_progress", session_id = id, "Progress reset");
    Ok(Json(ApiResponse::success(view)))
}

pub async fn list_achievements() -> Json<ApiResponse<&'static [Achievement]>> {
    Json(ApiResponse::success(ACHIEVEMENTS))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Session routes
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/sessions/:id/settings", put(update_settings))
        .route("/api/sessions/:id/generate", post(generate))

        // Quiz routes
        .route("/api/sessions/:id/quiz/answers/:index", put(select_answer))
        .route("/api/sessions/:id/quiz/submit", post(submit_quiz))
        .route("/api/sessions/:id/quiz/timer", get(quiz_timer))

        // Flashcard routes
        .route("/api/sessions/:id/flashcards/:index", put(flip_card))

        // Progress routes
        .route("/api/sessions/:id/progress", get(get_progress))
        .route("/api/sessions/:id/progress/reset", post(reset_progress))
        .route("/api/achievements", get(list_achievements))

        .with_state(state)
}
