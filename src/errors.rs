use crate::api::ApiResponse;
use crate::models::ArtifactKind;
use axum::{http::StatusCode, response::Json};
use tracing::{error, info, warn};

/// Failure of one generation sub-task. Never fatal; surfaced per artifact.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("Invalid generation request: {0}")]
    InvalidRequest(String),

    #[error("No model produced a usable {kind} response after {attempted} attempts")]
    ModelsExhausted { kind: ArtifactKind, attempted: usize },

    #[error("The model returned malformed {kind} JSON {attempts} times")]
    MalformedResponse { kind: ArtifactKind, attempts: usize },

    #[error("The model response contained no valid {kind} records")]
    NoValidRecords { kind: ArtifactKind },
}

impl GenerationError {
    /// Message suitable for showing next to the artifact that failed
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::InvalidRequest(msg) => msg.clone(),
            GenerationError::ModelsExhausted { .. } | GenerationError::NoValidRecords { .. } => {
                "The AI service could not generate this content right now. Please try again.".to_string()
            }
            GenerationError::MalformedResponse { .. } => {
                "The AI service returned content in an unexpected format. Please try again.".to_string()
            }
        }
    }
}

/// Rejected interaction with session state
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("No quiz has been generated in this session")]
    NoQuiz,

    #[error("Question index {index} is out of range (quiz has {len} questions)")]
    QuestionOutOfRange { index: usize, len: usize },

    #[error("The quiz has already been submitted")]
    AlreadySubmitted,

    #[error("Answer does not match the question type at index {0}")]
    AnswerKindMismatch(usize),

    #[error("No flashcards have been generated in this session")]
    NoFlashcards,

    #[error("Card index {index} is out of range (deck has {len} cards)")]
    CardOutOfRange { index: usize, len: usize },
}

/// Centralized error types for consistent API error handling
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("LLM service error: {0}")]
    LLMError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NoQuiz | SessionError::NoFlashcards => ApiError::NotFound(err.to_string()),
            SessionError::AlreadySubmitted => ApiError::Conflict(err.to_string()),
            SessionError::QuestionOutOfRange { .. }
            | SessionError::CardOutOfRange { .. }
            | SessionError::AnswerKindMismatch(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::InvalidRequest(msg) => ApiError::ValidationError(msg),
            other => ApiError::LLMError(other.to_string()),
        }
    }
}

/// Error context for structured logging
#[derive(Debug)]
pub struct ErrorContext {
    pub operation: String,
    pub resource_id: Option<String>,
    pub resource_type: String,
    pub user_friendly_message: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: &str, resource_type: &str) -> Self {
        Self {
            operation: operation.to_string(),
            resource_id: None,
            resource_type: resource_type.to_string(),
            user_friendly_message: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn with_user_message(mut self, message: &str) -> Self {
        self.user_friendly_message = Some(message.to_string());
        self
    }
}

pub type ErrorResponse = (StatusCode, Json<ApiResponse<()>>);

impl ApiError {
    /// Convert API error to HTTP response with consistent structure and logging
    pub fn to_response_with_context(self, context: ErrorContext) -> ErrorResponse {
        match &self {
            ApiError::NotFound(_) => {
                info!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Resource not found"
                );
                (
                    StatusCode::NOT_FOUND,
                    Json(ApiResponse::error(
                        context
                            .user_friendly_message
                            .unwrap_or_else(|| format!("{} not found", context.resource_type)),
                    )),
                )
            }
            ApiError::ValidationError(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Validation error"
                );
                (StatusCode::BAD_REQUEST, Json(ApiResponse::error(self.to_string())))
            }
            ApiError::BadRequest(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Bad request"
                );
                (StatusCode::BAD_REQUEST, Json(ApiResponse::error(self.to_string())))
            }
            ApiError::Conflict(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Conflicting request"
                );
                (StatusCode::CONFLICT, Json(ApiResponse::error(self.to_string())))
            }
            ApiError::LLMError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "LLM service error"
                );
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(ApiResponse::error(
                        context
                            .user_friendly_message
                            .unwrap_or_else(|| "AI service temporarily unavailable. Please try again.".to_string()),
                    )),
                )
            }
            ApiError::InternalError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Internal server error"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::error("An internal error occurred. Please try again.".to_string())),
                )
            }
        }
    }

    /// Simple conversion without context
    pub fn to_response(self) -> ErrorResponse {
        let context = ErrorContext::new("unknown", "resource");
        self.to_response_with_context(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_creation() {
        let context = ErrorContext::new("submit_quiz", "session")
            .with_id("123")
            .with_user_message("Custom message");

        assert_eq!(context.operation, "submit_quiz");
        assert_eq!(context.resource_type, "session");
        assert_eq!(context.resource_id, Some("123".to_string()));
        assert_eq!(context.user_friendly_message, Some("Custom message".to_string()));
    }

    #[test]
    fn test_session_error_classification() {
        assert!(matches!(ApiError::from(SessionError::NoQuiz), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from(SessionError::AlreadySubmitted), ApiError::Conflict(_)));
        assert!(matches!(
            ApiError::from(SessionError::QuestionOutOfRange { index: 9, len: 3 }),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(GenerationError::InvalidRequest("empty".to_string())),
            ApiError::ValidationError(_)
        ));
        assert!(matches!(
            ApiError::from(GenerationError::NoValidRecords { kind: ArtifactKind::Flashcard }),
            ApiError::LLMError(_)
        ));
    }

    #[test]
    fn test_api_error_responses() {
        let error = ApiError::NotFound("Session not found".to_string());
        let context = ErrorContext::new("get_session", "session").with_id("123");
        let (status, _response) = error.to_response_with_context(context);
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = ApiError::ValidationError("Invalid data".to_string()).to_response();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = ApiError::Conflict("Already submitted".to_string()).to_response();
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = ApiError::LLMError("down".to_string()).to_response();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_generation_error_user_message() {
        let error = GenerationError::ModelsExhausted {
            kind: ArtifactKind::MultipleChoice,
            attempted: 3,
        };
        assert!(error.to_string().contains("multiple_choice"));
        assert!(error.user_message().contains("try again"));
    }
}
