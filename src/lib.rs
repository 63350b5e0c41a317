pub mod api;
pub mod config;
pub mod errors;
pub mod gamification;
pub mod llm_providers;
pub mod llm_service;
pub mod logging;
pub mod model_client;
pub mod models;
pub mod prompt_builder;
pub mod response_parser;
pub mod session;

pub use errors::*;
pub use llm_providers::{AttemptError, ChatTransport, JsonResponseParser, LLMProvider, LLMProviderFactory, LLMProviderType};
pub use llm_service::{CountLimits, LLMService, StudySet};
pub use model_client::{FallbackPolicy, ModelClient, ModelReply};
pub use models::*;
pub use session::{SessionStore, StudySession};
