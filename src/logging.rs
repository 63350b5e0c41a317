// Macros file - tracing macros are imported within the macro definitions

/// Standardized logging macros for consistent field names and message patterns across the application
///
/// These macros ensure:
/// - Consistent field naming conventions
/// - Appropriate logging levels for different scenarios
/// - Structured logging with context

// ============================================================================
// API Operation Logging Macros
// ============================================================================

/// Log the start of an API operation with consistent fields
#[macro_export]
macro_rules! log_api_start {
    ($operation:expr, session_id = $session_id:expr) => {
        tracing::debug!(
            operation = $operation,
            session_id = %$session_id,
            "API operation started"
        );
    };
    ($operation:expr) => {
        tracing::debug!(
            operation = $operation,
            "API operation started"
        );
    };
}

/// Log successful completion of an API operation
#[macro_export]
macro_rules! log_api_success {
    ($operation:expr, session_id = $session_id:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            session_id = %$session_id,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, count = $count:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            count = $count,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            "API operation completed: {}", $msg
        );
    };
}

/// Log API operation errors with consistent structure
#[macro_export]
macro_rules! log_api_error {
    ($operation:expr, session_id = $session_id:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            session_id = %$session_id,
            error = %$error,
            "API operation failed: {}", $msg
        );
    };
    ($operation:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            error = %$error,
            "API operation failed: {}", $msg
        );
    };
}

/// Log API warnings with context
#[macro_export]
macro_rules! log_api_warn {
    ($operation:expr, session_id = $session_id:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            session_id = %$session_id,
            "API operation warning: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            "API operation warning: {}", $msg
        );
    };
}

// ============================================================================
// LLM Logging Macros
// ============================================================================

/// Log model calls and generation steps with provider context
#[macro_export]
macro_rules! log_llm_operation {
    (start, $operation:expr, kind = $kind:expr, provider = $provider:expr, requested = $count:expr) => {
        tracing::info!(
            component = "llm_service",
            operation = $operation,
            artifact_kind = %$kind,
            provider = %$provider,
            requested = $count,
            "LLM operation started"
        );
    };
    (success, model = $model:expr, provider = $provider:expr, attempt = $attempt:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = "model_client",
            model = %$model,
            provider = %$provider,
            attempt = $attempt,
            duration_ms = $duration,
            "Model returned a usable response"
        );
    };
    (rejected, model = $model:expr, provider = $provider:expr, attempt = $attempt:expr, reason = $reason:expr) => {
        tracing::warn!(
            component = "model_client",
            model = %$model,
            provider = %$provider,
            attempt = $attempt,
            reason = %$reason,
            "Model attempt failed, trying next candidate"
        );
    };
    (exhausted, provider = $provider:expr, attempts = $attempts:expr) => {
        tracing::error!(
            component = "model_client",
            provider = %$provider,
            attempts = $attempts,
            "All candidate models failed"
        );
    };
    (warn, $operation:expr, $msg:expr) => {
        tracing::warn!(
            component = "llm_service",
            operation = $operation,
            "LLM operation warning: {}", $msg
        );
    };
}

/// Log how many records survived parsing
#[macro_export]
macro_rules! log_parse_result {
    (kind = $kind:expr, parsed = $parsed:expr, requested = $requested:expr) => {
        if $parsed < $requested {
            tracing::warn!(
                component = "response_parser",
                artifact_kind = %$kind,
                parsed = $parsed,
                requested = $requested,
                "Parsed fewer records than requested"
            );
        } else {
            tracing::debug!(
                component = "response_parser",
                artifact_kind = %$kind,
                parsed = $parsed,
                requested = $requested,
                "Parsed records"
            );
        }
    };
    (dropped, kind = $kind:expr, error = $error:expr) => {
        tracing::debug!(
            component = "response_parser",
            artifact_kind = %$kind,
            error = %$error,
            "Dropped malformed record"
        );
    };
}

// ============================================================================
// System Event Logging Macros
// ============================================================================

/// Log system startup and shutdown events
#[macro_export]
macro_rules! log_system_event {
    (startup, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "startup",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (shutdown, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "shutdown",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (config, $msg:expr) => {
        tracing::info!(event_type = "configuration", "System event: {}", $msg);
    };
}

// ============================================================================
// Validation Logging Macros
// ============================================================================

/// Log validation results consistently
#[macro_export]
macro_rules! log_validation {
    (success, $component:expr, $msg:expr) => {
        tracing::debug!(
            event_type = "validation",
            component = $component,
            result = "success",
            "Validation completed: {}", $msg
        );
    };
    (failure, $component:expr, error = $error:expr) => {
        tracing::warn!(
            event_type = "validation",
            component = $component,
            result = "failure",
            error = %$error,
            "Validation failed"
        );
    };
}

#[cfg(test)]
mod tests {
    use crate::models::ArtifactKind;
    use uuid::Uuid;

    #[test]
    fn test_logging_macros_compile() {
        let session_id = Uuid::new_v4();
        let error = anyhow::anyhow!("test error");

        log_api_start!("test_operation", session_id = session_id);
        log_api_start!("test_operation");

        log_api_success!("test_operation", session_id = session_id, "operation completed");
        log_api_success!("test_operation", count = 5, "sessions purged");
        log_api_success!("test_operation", "done");

        log_api_error!("test_operation", session_id = session_id, error = error, "failed");
        log_api_warn!("test_operation", session_id = session_id, "operation warning");

        log_llm_operation!(
            start,
            "generate_quiz",
            kind = ArtifactKind::MultipleChoice,
            provider = "OpenAI",
            requested = 5
        );
        log_llm_operation!(
            success,
            model = "openai-fast",
            provider = "OpenAI",
            attempt = 1,
            duration_ms = 1500u64
        );
        log_llm_operation!(
            rejected,
            model = "openai",
            provider = "OpenAI",
            attempt = 2,
            reason = "rate limited"
        );
        log_llm_operation!(exhausted, provider = "OpenAI", attempts = 3);
        log_llm_operation!(warn, "generate_quiz", "retrying");

        log_parse_result!(kind = ArtifactKind::Flashcard, parsed = 4usize, requested = 5usize);
        log_parse_result!(dropped, kind = ArtifactKind::Flashcard, error = "missing back");

        log_system_event!(startup, component = "server", "server starting");
        log_system_event!(config, "configuration loaded successfully");

        log_validation!(success, "generation_request", "request validated");
        log_validation!(failure, "generation_request", error = "empty topic");
    }
}
