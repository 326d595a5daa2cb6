//! Answer Composer - 백엔드 결과를 자연어 답변으로 변환
//!
//! 모드마다 시스템 지시문, 출력 길이, 무작위성이 고정되어 있습니다.
//! 텍스트 생성이 실패하거나 빈 응답이면 모드별 고정 사과 문구를 반환합니다.

use std::sync::Arc;

use crate::llm::{GenerationRequest, TextGenerator};

/// Concise 모드 실패 문구
pub const CONCISE_FALLBACK: &str = "Sorry, I couldn't generate a meaningful response.";

/// Conversational 모드 실패 문구 (시맨틱 검색 경로의 실패로 표시)
pub const CONVERSATIONAL_FALLBACK: &str = "Error performing semantic search. Please try again.";

/// 답변 작성 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeMode {
    /// SQL 결과용: 짧고 사실만
    Concise,
    /// 시맨틱 검색 결과용: 자연스러운 설명
    Conversational,
}

impl ComposeMode {
    pub fn system_instruction(self) -> &'static str {
        match self {
            ComposeMode::Concise => "You are an expert summarizer.",
            ComposeMode::Conversational => {
                "You are an AI assistant summarizing extracted data into a natural response."
            }
        }
    }

    pub fn user_instruction(self, context: &str, question: &str) -> String {
        match self {
            ComposeMode::Concise => format!(
                "Question: {}\n\
                 The database query returned the following result: {}\n\
                 Generate a short, precise answer based only on this result. \
                 Avoid unnecessary words.",
                question, context
            ),
            ComposeMode::Conversational => format!(
                "I asked: '{}'\n\
                 Here is the extracted data:\n{}\n\
                 Rephrase this into a natural answer.",
                question, context
            ),
        }
    }

    pub fn max_tokens(self) -> u32 {
        match self {
            ComposeMode::Concise => 50,
            ComposeMode::Conversational => 100,
        }
    }

    pub fn temperature(self) -> f32 {
        match self {
            ComposeMode::Concise => 0.5,
            ComposeMode::Conversational => 0.7,
        }
    }

    pub fn fallback(self) -> &'static str {
        match self {
            ComposeMode::Concise => CONCISE_FALLBACK,
            ComposeMode::Conversational => CONVERSATIONAL_FALLBACK,
        }
    }

    /// 모드에 맞는 생성 요청 구성
    pub fn request(self, context: &str, question: &str) -> GenerationRequest {
        GenerationRequest {
            system: self.system_instruction().to_string(),
            user: self.user_instruction(context, question),
            max_tokens: self.max_tokens(),
            temperature: self.temperature(),
        }
    }
}

/// 답변 작성기
#[derive(Clone)]
pub struct AnswerComposer {
    generator: Arc<dyn TextGenerator>,
}

impl AnswerComposer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// 컨텍스트와 질문으로 답변 생성 (실패하지 않음)
    pub async fn compose(&self, context: &str, question: &str, mode: ComposeMode) -> String {
        let request = mode.request(context, question);

        match self.generator.generate(&request).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                tracing::warn!("Text generation returned nothing ({:?})", mode);
                mode.fallback().to_string()
            }
            Err(e) => {
                tracing::warn!("Text generation failed ({:?}): {:#}", mode, e);
                mode.fallback().to_string()
            }
        }
    }
}
