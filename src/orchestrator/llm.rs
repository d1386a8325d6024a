// src/orchestrator/llm.rs
// The external collaborator interface the orchestrator's intent stages
// call through once a prompt has been assembled (§4.10 step 3).

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub intent: &'static str,
    pub system_context: String,
    pub user_context: String,
    pub instruction: String,
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
}

/// One call per orchestrator turn; implementations own their own
/// timeout (30s default, §5) and retry policy. A `BackendUnavailable`
/// or timeout error is caught by the orchestrator and turned into a
/// canned apologetic response rather than failing the request.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> crate::error::Result<LlmResponse>;
}

/// Deterministic stand-in used in tests and as a safe default when no
/// external provider is configured: echoes back the instruction inside a
/// short canned acknowledgement rather than calling out to a network
/// service.
pub struct EchoLlmProvider;

#[async_trait]
impl LlmProvider for EchoLlmProvider {
    async fn complete(&self, request: &LlmRequest) -> crate::error::Result<LlmResponse> {
        Ok(LlmResponse { text: format!("({}) {}", request.intent, request.instruction) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_provider_reflects_intent_and_instruction() {
        let provider = EchoLlmProvider;
        let request = LlmRequest {
            intent: "chat",
            system_context: String::new(),
            user_context: String::new(),
            instruction: "hello there".to_string(),
        };
        let response = provider.complete(&request).await.unwrap();
        assert_eq!(response.text, "(chat) hello there");
    }
}
