use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::llm_providers::{AttemptError, ChatTransport, LLMMessage};
use crate::log_llm_operation;

/// Timing and acceptance rules for one pass over the fallback chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPolicy {
    /// Pause before every attempt except the first
    pub inter_attempt_delay: Duration,
    /// Extra pause after a 429 before moving to the next model
    pub rate_limit_backoff: Duration,
    /// A reply must be strictly longer than this (trimmed, in chars)
    pub min_response_chars: usize,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            inter_attempt_delay: Duration::from_secs(2),
            rate_limit_backoff: Duration::from_secs(5),
            min_response_chars: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReply {
    pub model: String,
    pub content: String,
    pub attempts: usize,
}

/// Walks an ordered list of model names, one call each, and returns the first usable reply.
#[derive(Clone)]
pub struct ModelClient {
    transport: Arc<dyn ChatTransport>,
    models: Vec<String>,
    policy: FallbackPolicy,
}

impl ModelClient {
    pub fn new(transport: Arc<dyn ChatTransport>, models: Vec<String>, policy: FallbackPolicy) -> Self {
        Self {
            transport,
            models,
            policy,
        }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn provider_name(&self) -> &'static str {
        self.transport.provider_name()
    }

    pub fn policy(&self) -> &FallbackPolicy {
        &self.policy
    }

    /// Returns `None` once every candidate has been tried without a qualifying reply.
    pub async fn complete(&self, system_instruction: &str, prompt: &str) -> Option<ModelReply> {
        let messages = [LLMMessage::system(system_instruction), LLMMessage::user(prompt)];
        let provider = self.transport.provider_name();

        for (index, model) in self.models.iter().enumerate() {
            if index > 0 && !self.policy.inter_attempt_delay.is_zero() {
                tokio::time::sleep(self.policy.inter_attempt_delay).await;
            }

            let attempt = index + 1;
            let started = Instant::now();
            match self.transport.send_chat(model, &messages).await {
                Ok(content) if content.trim().chars().count() > self.policy.min_response_chars => {
                    log_llm_operation!(
                        success,
                        model = model,
                        provider = provider,
                        attempt = attempt,
                        duration_ms = started.elapsed().as_millis() as u64
                    );
                    return Some(ModelReply {
                        model: model.clone(),
                        content,
                        attempts: attempt,
                    });
                }
                Ok(content) => {
                    log_llm_operation!(
                        rejected,
                        model = model,
                        provider = provider,
                        attempt = attempt,
                        reason = format!("response too short ({} chars)", content.trim().chars().count())
                    );
                }
                Err(AttemptError::RateLimited) => {
                    log_llm_operation!(
                        rejected,
                        model = model,
                        provider = provider,
                        attempt = attempt,
                        reason = "rate limited"
                    );
                    if !self.policy.rate_limit_backoff.is_zero() {
                        tokio::time::sleep(self.policy.rate_limit_backoff).await;
                    }
                }
                Err(e) => {
                    log_llm_operation!(
                        rejected,
                        model = model,
                        provider = provider,
                        attempt = attempt,
                        reason = e
                    );
                }
            }
        }

        log_llm_operation!(exhausted, provider = provider, attempts = self.models.len());
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const LONG_REPLY: &str = "Q1: What is the powerhouse of the cell?\nA) Nucleus\nB) Mitochondria\nCorrect Answer: B";

    struct ScriptedTransport {
        replies: HashMap<String, Result<String, AttemptError>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<(&str, Result<String, AttemptError>)>) -> Self {
            Self {
                replies: replies.into_iter().map(|(m, r)| (m.to_string(), r)).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn send_chat(&self, model: &str, messages: &[LLMMessage]) -> Result<String, AttemptError> {
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[0].role, "system");
            assert_eq!(messages[1].role, "user");
            self.calls.lock().unwrap().push(model.to_string());
            self.replies
                .get(model)
                .cloned()
                .unwrap_or(Err(AttemptError::Network("unknown model".to_string())))
        }

        fn provider_name(&self) -> &'static str {
            "Scripted"
        }
    }

    fn instant_policy() -> FallbackPolicy {
        FallbackPolicy {
            inter_attempt_delay: Duration::ZERO,
            rate_limit_backoff: Duration::ZERO,
            min_response_chars: 50,
        }
    }

    fn client(transport: Arc<ScriptedTransport>, models: &[&str], policy: FallbackPolicy) -> ModelClient {
        ModelClient::new(transport, models.iter().map(|m| m.to_string()).collect(), policy)
    }

    #[tokio::test]
    async fn test_first_qualifying_reply_wins() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ("m1", Ok(LONG_REPLY.to_string())),
            ("m2", Ok(LONG_REPLY.to_string())),
        ]));
        let reply = client(transport.clone(), &["m1", "m2"], instant_policy())
            .complete("sys", "prompt")
            .await
            .unwrap();

        assert_eq!(reply.model, "m1");
        assert_eq!(reply.attempts, 1);
        assert_eq!(transport.calls(), vec!["m1"]);
    }

    #[tokio::test]
    async fn test_falls_through_every_failure_kind_in_order() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ("timeout", Err(AttemptError::Timeout)),
            ("limited", Err(AttemptError::RateLimited)),
            ("broken", Err(AttemptError::Status { status: 500, body: "oops".to_string() })),
            ("short", Ok("too short".to_string())),
            ("good", Ok(LONG_REPLY.to_string())),
        ]));
        let models = ["timeout", "limited", "broken", "short", "good"];
        let reply = client(transport.clone(), &models, instant_policy())
            .complete("sys", "prompt")
            .await
            .unwrap();

        assert_eq!(reply.model, "good");
        assert_eq!(reply.content, LONG_REPLY);
        assert_eq!(reply.attempts, 5);
        assert_eq!(transport.calls(), models.to_vec());
    }

    #[tokio::test]
    async fn test_exhaustion_returns_none_after_single_pass() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ("a", Err(AttemptError::Timeout)),
            ("b", Ok("   ".to_string())),
        ]));
        let result = client(transport.clone(), &["a", "b"], instant_policy())
            .complete("sys", "prompt")
            .await;

        assert!(result.is_none());
        assert_eq!(transport.calls(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_reply_length_threshold_is_strict() {
        let exactly_fifty = "x".repeat(50);
        let transport = Arc::new(ScriptedTransport::new(vec![("m", Ok(exactly_fifty))]));
        let result = client(transport, &["m"], instant_policy()).complete("sys", "prompt").await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delays_are_applied() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ("limited", Err(AttemptError::RateLimited)),
            ("good", Ok(LONG_REPLY.to_string())),
        ]));
        let policy = FallbackPolicy {
            inter_attempt_delay: Duration::from_millis(30),
            rate_limit_backoff: Duration::from_millis(40),
            min_response_chars: 50,
        };

        let started = Instant::now();
        let reply = client(transport, &["limited", "good"], policy).complete("sys", "prompt").await;
        assert!(reply.is_some());
        assert!(started.elapsed() >= Duration::from_millis(70));
    }

    #[tokio::test]
    async fn test_first_attempt_has_no_delay() {
        let transport = Arc::new(ScriptedTransport::new(vec![("good", Ok(LONG_REPLY.to_string()))]));
        let policy = FallbackPolicy {
            inter_attempt_delay: Duration::from_secs(30),
            rate_limit_backoff: Duration::from_secs(30),
            min_response_chars: 50,
        };

        let started = Instant::now();
        let reply = client(transport, &["good"], policy).complete("sys", "prompt").await;
        assert!(reply.is_some());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
