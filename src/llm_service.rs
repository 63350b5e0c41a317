use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::errors::GenerationError;
use crate::llm_providers::ChatTransport;
use crate::model_client::{FallbackPolicy, ModelClient};
use crate::models::{
    ArtifactKind, Flashcard, GenerationRequest, QuizQuestion, QuizType, StudyGuide, StudySetRequest,
};
use crate::prompt_builder::{ResponseMode, build_prompt, system_instruction};
use crate::response_parser::{self, ParseError};
use crate::{log_llm_operation, log_parse_result, log_validation};

/// Count bounds applied to every generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountLimits {
    pub min: usize,
    pub max: usize,
}

impl Default for CountLimits {
    fn default() -> Self {
        Self { min: 3, max: 20 }
    }
}

/// Result of one Generate action. Each slot fails independently.
#[derive(Debug)]
pub struct StudySet {
    pub quiz: Result<Vec<QuizQuestion>, GenerationError>,
    pub flashcards: Option<Result<Vec<Flashcard>, GenerationError>>,
    pub study_guide: Option<Result<StudyGuide, GenerationError>>,
}

#[derive(Clone)]
pub struct LLMService {
    client: ModelClient,
    response_mode: ResponseMode,
    json_retries: usize,
    limits: CountLimits,
}

impl LLMService {
    pub fn new(client: ModelClient, response_mode: ResponseMode, json_retries: usize, limits: CountLimits) -> Self {
        Self {
            client,
            response_mode,
            json_retries,
            limits,
        }
    }

    /// Convenience constructor for an arbitrary transport with default timing
    pub fn with_transport(transport: Arc<dyn ChatTransport>, models: Vec<String>) -> Self {
        Self::new(
            ModelClient::new(transport, models, FallbackPolicy::default()),
            ResponseMode::Text,
            2,
            CountLimits::default(),
        )
    }

    /// Get the provider name for logging and testing
    pub fn provider_name(&self) -> &'static str {
        self.client.provider_name()
    }

    pub fn response_mode(&self) -> ResponseMode {
        self.response_mode
    }

    pub fn limits(&self) -> CountLimits {
        self.limits
    }

    fn validate(&self, request: &GenerationRequest) -> Result<(), GenerationError> {
        match request.validate(self.limits.min, self.limits.max) {
            Ok(()) => {
                log_validation!(success, "generation_request", request.topic.as_str());
                Ok(())
            }
            Err(msg) => {
                log_validation!(failure, "generation_request", error = msg);
                Err(GenerationError::InvalidRequest(msg))
            }
        }
    }

    /// One pass of the fallback chain for the given artifact kind
    async fn fetch(&self, request: &GenerationRequest, kind: ArtifactKind, mode: ResponseMode) -> Result<String, GenerationError> {
        let prompt = build_prompt(request, kind, mode);
        debug!(artifact_kind = %kind, prompt_len = prompt.len(), "Built generation prompt");

        match self.client.complete(system_instruction(mode), &prompt).await {
            Some(reply) => {
                debug!(artifact_kind = %kind, model = %reply.model, attempts = reply.attempts, "Model reply accepted");
                Ok(reply.content)
            }
            None => Err(GenerationError::ModelsExhausted {
                kind,
                attempted: self.client.models().len(),
            }),
        }
    }

    /// Runs the chain up to `1 + json_retries` times until the reply decodes.
    async fn fetch_json<T>(
        &self,
        request: &GenerationRequest,
        kind: ArtifactKind,
        decode: impl Fn(&str) -> Result<Vec<T>, ParseError>,
    ) -> Result<Vec<T>, GenerationError> {
        let attempts = self.json_retries + 1;
        for attempt in 1..=attempts {
            let raw = self.fetch(request, kind, ResponseMode::Json).await?;
            match decode(&raw) {
                Ok(records) => return Ok(records),
                Err(e) => {
                    log_llm_operation!(
                        warn,
                        "fetch_json",
                        format!("attempt {}/{} for {} failed to decode: {}", attempt, attempts, kind, e)
                    );
                }
            }
        }
        Err(GenerationError::MalformedResponse { kind, attempts })
    }

    fn finish<T>(&self, kind: ArtifactKind, mut records: Vec<T>, requested: usize) -> Result<Vec<T>, GenerationError> {
        log_parse_result!(kind = kind, parsed = records.len(), requested = requested);
        if records.is_empty() {
            return Err(GenerationError::NoValidRecords { kind });
        }
        records.truncate(requested);
        Ok(records)
    }

    pub async fn generate_quiz(&self, request: &GenerationRequest, quiz_type: QuizType) -> Result<Vec<QuizQuestion>, GenerationError> {
        self.validate(request)?;
        let kind = quiz_type.artifact_kind();
        log_llm_operation!(
            start,
            "generate_quiz",
            kind = kind,
            provider = self.provider_name(),
            requested = request.count
        );

        let records = match self.response_mode {
            ResponseMode::Text => {
                let raw = self.fetch(request, kind, ResponseMode::Text).await?;
                response_parser::parse_quiz_text(quiz_type, &raw)
            }
            ResponseMode::Json => {
                self.fetch_json(request, kind, |raw| response_parser::parse_quiz_json(quiz_type, raw))
                    .await?
            }
        };

        self.finish(kind, records, request.count)
    }

    pub async fn generate_flashcards(&self, request: &GenerationRequest) -> Result<Vec<Flashcard>, GenerationError> {
        self.validate(request)?;
        let kind = ArtifactKind::Flashcard;
        log_llm_operation!(
            start,
            "generate_flashcards",
            kind = kind,
            provider = self.provider_name(),
            requested = request.count
        );

        let records = match self.response_mode {
            ResponseMode::Text => {
                let raw = self.fetch(request, kind, ResponseMode::Text).await?;
                response_parser::parse_flashcards(&raw)
            }
            ResponseMode::Json => {
                self.fetch_json(request, kind, response_parser::parse_flashcards_json)
                    .await?
            }
        };

        self.finish(kind, records, request.count)
    }

    /// Guides are always requested as markdown, whatever the response mode.
    pub async fn generate_study_guide(&self, request: &GenerationRequest) -> Result<StudyGuide, GenerationError> {
        self.validate(request)?;
        let kind = ArtifactKind::StudyGuide;
        log_llm_operation!(
            start,
            "generate_study_guide",
            kind = kind,
            provider = self.provider_name(),
            requested = 1usize
        );

        let raw = self.fetch(request, kind, ResponseMode::Text).await?;
        response_parser::parse_study_guide(&request.topic, &raw, self.client.policy().min_response_chars)
            .ok_or(GenerationError::NoValidRecords { kind })
    }

    /// Runs quiz, flashcards and guide sequentially. A failed slot never aborts the others.
    pub async fn generate_study_set(&self, set: &StudySetRequest) -> StudySet {
        let quiz = self.generate_quiz(&set.request, set.quiz_type).await;

        let flashcards = match set.flashcard_count {
            Some(count) => Some(self.generate_flashcards(&set.request.with_count(count)).await),
            None => None,
        };

        let study_guide = if set.include_study_guide {
            Some(self.generate_study_guide(&set.request).await)
        } else {
            None
        };

        info!(
            topic = %set.request.topic,
            quiz_ok = quiz.is_ok(),
            flashcards_ok = flashcards.as_ref().map(|r| r.is_ok()),
            guide_ok = study_guide.as_ref().map(|r| r.is_ok()),
            "Study set generation finished"
        );

        StudySet {
            quiz,
            flashcards,
            study_guide,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_providers::{AttemptError, LLMMessage};
    use crate::models::Difficulty;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Hands out queued replies in order, regardless of model
    struct QueueTransport {
        replies: Mutex<Vec<Result<String, AttemptError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl QueueTransport {
        fn new(replies: Vec<Result<String, AttemptError>>) -> Arc<Self> {
            let mut replies = replies;
            replies.reverse();
            Arc::new(Self {
                replies: Mutex::new(replies),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatTransport for QueueTransport {
        async fn send_chat(&self, _model: &str, messages: &[LLMMessage]) -> Result<String, AttemptError> {
            self.prompts.lock().unwrap().push(messages[1].content.clone());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(AttemptError::Timeout))
        }

        fn provider_name(&self) -> &'static str {
            "Queue"
        }
    }

    fn service(transport: Arc<QueueTransport>, mode: ResponseMode) -> LLMService {
        let policy = FallbackPolicy {
            inter_attempt_delay: Duration::ZERO,
            rate_limit_backoff: Duration::ZERO,
            min_response_chars: 50,
        };
        LLMService::new(
            ModelClient::new(transport, vec!["only".to_string()], policy),
            mode,
            2,
            CountLimits::default(),
        )
    }

    const FOUR_CARDS: &str = "CARD 1\nFront: Chlorophyll\nBack: Green pigment that absorbs light\n\n\
        CARD 2\nFront: Stomata\nBack: Leaf pores for gas exchange\n\n\
        CARD 3\nFront: Glucose\nBack: Sugar produced by photosynthesis\n\n\
        CARD 4\nFront: Chloroplast\nBack: Organelle where photosynthesis happens";

    #[tokio::test]
    async fn test_invalid_request_makes_no_call() {
        let transport = QueueTransport::new(vec![]);
        let svc = service(transport.clone(), ResponseMode::Text);
        let request = GenerationRequest::new("   ", Difficulty::Easy, 5);

        let result = svc.generate_quiz(&request, QuizType::MultipleChoice).await;
        assert!(matches!(result, Err(GenerationError::InvalidRequest(_))));
        assert!(transport.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shortfall_is_not_an_error() {
        let transport = QueueTransport::new(vec![Ok(FOUR_CARDS.to_string())]);
        let svc = service(transport, ResponseMode::Text);
        let request = GenerationRequest::new("Photosynthesis", Difficulty::Medium, 5);

        let cards = svc.generate_flashcards(&request).await.unwrap();
        assert_eq!(cards.len(), 4);
    }

    #[tokio::test]
    async fn test_surplus_records_are_truncated() {
        let transport = QueueTransport::new(vec![Ok(FOUR_CARDS.to_string())]);
        let svc = service(transport, ResponseMode::Text);
        let request = GenerationRequest::new("Photosynthesis", Difficulty::Medium, 3);

        let cards = svc.generate_flashcards(&request).await.unwrap();
        assert_eq!(cards.len(), 3);
        assert_eq!(cards[2].front, "Glucose");
    }

    #[tokio::test]
    async fn test_zero_survivors_is_reported() {
        let garbage = "I am sorry, but I cannot produce flashcards on that topic right now, please retry.";
        let transport = QueueTransport::new(vec![Ok(garbage.to_string())]);
        let svc = service(transport, ResponseMode::Text);
        let request = GenerationRequest::new("Photosynthesis", Difficulty::Medium, 5);

        let result = svc.generate_flashcards(&request).await;
        assert_eq!(
            result.unwrap_err(),
            GenerationError::NoValidRecords {
                kind: ArtifactKind::Flashcard
            }
        );
    }

    #[tokio::test]
    async fn test_exhaustion_is_reported() {
        let transport = QueueTransport::new(vec![Err(AttemptError::RateLimited)]);
        let svc = service(transport, ResponseMode::Text);
        let request = GenerationRequest::new("Photosynthesis", Difficulty::Medium, 5);

        let result = svc.generate_quiz(&request, QuizType::TrueFalse).await;
        assert_eq!(
            result.unwrap_err(),
            GenerationError::ModelsExhausted {
                kind: ArtifactKind::TrueFalse,
                attempted: 1
            }
        );
    }

    #[tokio::test]
    async fn test_json_mode_retries_until_decodable() {
        let not_json = "Here are your flashcards, formatted nicely for you to study with today!";
        let json = r#"{"flashcards": [{"front": "Stomata", "back": "Leaf pores for gas exchange"}]}"#;
        let padded = format!("```json\n{}\n```", json);
        let transport = QueueTransport::new(vec![Ok(not_json.to_string()), Ok(padded)]);
        let svc = service(transport.clone(), ResponseMode::Json);
        let request = GenerationRequest::new("Photosynthesis", Difficulty::Medium, 3);

        let cards = svc.generate_flashcards(&request).await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(transport.prompts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_json_mode_gives_up_after_retries() {
        let not_json = "Here are your flashcards, formatted nicely for you to study with today!";
        let transport = QueueTransport::new(vec![
            Ok(not_json.to_string()),
            Ok(not_json.to_string()),
            Ok(not_json.to_string()),
        ]);
        let svc = service(transport.clone(), ResponseMode::Json);
        let request = GenerationRequest::new("Photosynthesis", Difficulty::Medium, 3);

        let result = svc.generate_flashcards(&request).await;
        assert_eq!(
            result.unwrap_err(),
            GenerationError::MalformedResponse {
                kind: ArtifactKind::Flashcard,
                attempts: 3
            }
        );
        assert_eq!(transport.prompts.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_study_set_slots_fail_independently() {
        let guide = "## Overview\nPlants turn light into chemical energy.\n\n## Key Concepts\n- Chlorophyll absorbs light";
        let transport = QueueTransport::new(vec![
            Err(AttemptError::Timeout),
            Ok(FOUR_CARDS.to_string()),
            Ok(guide.to_string()),
        ]);
        let svc = service(transport.clone(), ResponseMode::Text);
        let set = StudySetRequest {
            request: GenerationRequest::new("Photosynthesis", Difficulty::Medium, 3),
            quiz_type: QuizType::MultipleChoice,
            flashcard_count: Some(4),
            include_study_guide: true,
        };

        let result = svc.generate_study_set(&set).await;
        assert!(result.quiz.is_err());
        assert_eq!(result.flashcards.unwrap().unwrap().len(), 4);
        let guide = result.study_guide.unwrap().unwrap();
        assert_eq!(guide.sections.len(), 2);

        let prompts = transport.prompts.lock().unwrap();
        assert!(prompts[1].contains("4"));
    }
}
