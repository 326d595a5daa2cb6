//! 텍스트 생성 모듈 - OpenAI 호환 Chat Completions API
//!
//! SQL 생성과 답변 요약에 쓰이는 텍스트 생성 기능입니다.
//! ref: https://platform.openai.com/docs/api-reference/chat

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::embedding::ApiError;

// ============================================================================
// TextGenerator Trait
// ============================================================================

/// 텍스트 생성 요청
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// 시스템 지시문
    pub system: String,
    /// 사용자 지시문
    pub user: String,
    /// 최대 출력 토큰 수
    pub max_tokens: u32,
    /// 무작위성 (0.0 = 결정적)
    pub temperature: f32,
}

/// 텍스트 생성 트레이트
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// 시스템/사용자 지시문으로 텍스트 생성
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

// ============================================================================
// OpenAI Chat
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI Chat Completions 클라이언트
#[derive(Debug)]
pub struct OpenAiChat {
    api_key: String,
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiChat {
    pub fn new(api_key: String, api_base: &str, model: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            model,
            client,
        })
    }

    /// 설정에서 생성 (API 키 필수)
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        Self::new(
            api_key,
            &config.llm.api_base,
            config.llm.chat_model.clone(),
            Duration::from_secs(config.llm.request_timeout_secs),
        )
    }

    fn build_request<'a>(&'a self, request: &'a GenerationRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiChat {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = self.build_request(request);

        tracing::debug!(
            "Requesting completion (model: {}, max_tokens: {}, temperature: {})",
            self.model,
            request.max_tokens,
            request.temperature
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to send completion request")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ApiError>(&text) {
                anyhow::bail!("Chat API error ({}): {}", status, error.error.message);
            }
            anyhow::bail!("Chat API error ({}): {}", status, text);
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).context("Failed to parse completion response")?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(content.trim().to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
