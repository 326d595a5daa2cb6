//! 임베딩 모듈 - OpenAI 호환 API를 통한 텍스트 벡터화
//!
//! 질문과 CSV 행 텍스트를 고정 차원 벡터로 변환합니다.
//! 재시도는 하지 않습니다. 실패는 호출자에게 그대로 반환됩니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = OpenAiEmbedding::from_config(&config)?;
//! let embedding = embedder.embed("name: Alice, age: 35").await?;
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 텍스트를 벡터로 변환하는 인터페이스입니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// OpenAI Embedding
// ============================================================================

/// OpenAI 임베딩 구현체
///
/// ref: https://platform.openai.com/docs/api-reference/embeddings
#[derive(Debug)]
pub struct OpenAiEmbedding {
    api_key: String,
    endpoint: String,
    model: String,
    client: reqwest::Client,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// OpenAI API 에러 응답
#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    pub(crate) error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    pub(crate) message: String,
}

impl OpenAiEmbedding {
    /// 새 임베딩 인스턴스 생성
    ///
    /// # Arguments
    /// * `api_key` - API 키
    /// * `api_base` - API 베이스 URL (예: `https://api.openai.com/v1`)
    /// * `model` - 임베딩 모델 이름
    /// * `dimension` - 기대하는 임베딩 차원
    pub fn new(
        api_key: String,
        api_base: &str,
        model: String,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            endpoint: format!("{}/embeddings", api_base.trim_end_matches('/')),
            model,
            client,
            dimension,
        })
    }

    /// 설정에서 생성 (API 키 필수)
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        Self::new(
            api_key,
            &config.llm.api_base,
            config.llm.embedding_model_name.clone(),
            config.vector.dimension,
            Duration::from_secs(config.llm.request_timeout_secs),
        )
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: &self.model,
            input: vec![text],
        };

        tracing::debug!("Requesting embedding ({} chars)", text.len());

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send embedding request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ApiError>(&body) {
                anyhow::bail!("Embedding API error ({}): {}", status, error.error.message);
            }
            anyhow::bail!("Embedding API error ({}): {}", status, body);
        }

        let parsed: EmbedResponse =
            serde_json::from_str(&body).context("Failed to parse embedding response")?;
        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| anyhow::anyhow!("Embedding response contained no data"))?;

        if embedding.len() != self.dimension {
            anyhow::bail!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dimension,
                embedding.len()
            );
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_without_key_returns_error() {
        let config = AppConfig::default();
        let result = OpenAiEmbedding::from_config(&config);
        assert!(result.is_err());
        assert!(result
            .err()
            .map(|e| e.to_string().contains("OPENAI_API_KEY"))
            .unwrap_or(false));
    }

    #[test]
    fn test_endpoint_joins_base() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-test".to_string());
        config.llm.api_base = "http://localhost:8080/v1/".to_string();

        let embedder = OpenAiEmbedding::from_config(&config).unwrap();
        assert_eq!(embedder.endpoint, "http://localhost:8080/v1/embeddings");
        assert_eq!(embedder.dimension(), 1536);
        assert_eq!(embedder.name(), "text-embedding-ada-002");
    }

    #[test]
    fn test_request_shape() {
        let request = EmbedRequest {
            model: "text-embedding-ada-002",
            input: vec!["hello"],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "text-embedding-ada-002");
        assert_eq!(json["input"][0], "hello");
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{"data":[{"embedding":[0.1,0.2],"index":0}],"model":"m"}"#;
        let parsed: EmbedResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data[0].embedding, vec![0.1, 0.2]);
    }
}
