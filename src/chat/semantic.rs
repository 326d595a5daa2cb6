//! Semantic-Search Backend - 질문 임베딩 후 공유 벡터 인덱스 검색
//!
//! 기본 동작은 데이터셋 구분 없이 전체 인덱스를 검색합니다.
//! 그래서 데이터셋 A에 대한 질문이 데이터셋 B의 행을 가져올 수 있습니다.
//! `scope_to_dataset`을 켜면 활성 데이터셋 태그로 제한하며,
//! 이때 식별자가 유효하지 않으면 검색하지 않고 결과 없음으로 처리합니다.

use std::sync::Arc;

use thiserror::Error;

use crate::dataset::DatasetId;
use crate::embedding::EmbeddingProvider;
use crate::knowledge::{flatten_metadata, VectorStore};

/// 시맨틱 검색 실패 유형
#[derive(Debug, Error)]
pub enum SemanticSearchError {
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("vector search failed: {0}")]
    Search(String),
    #[error("no matches with metadata")]
    NoMatches,
}

/// 시맨틱 검색 백엔드
#[derive(Clone)]
pub struct SemanticSearchBackend {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorStore>,
    top_k: usize,
    scope_to_dataset: bool,
}

impl SemanticSearchBackend {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorStore>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            top_k,
            scope_to_dataset: false,
        }
    }

    /// 검색 범위를 활성 데이터셋으로 제한
    pub fn scoped_to_dataset(mut self, scoped: bool) -> Self {
        self.scope_to_dataset = scoped;
        self
    }

    /// 질문과 가까운 행들을 `Record: key: value, ...` 줄로 모아 반환
    pub async fn search(
        &self,
        question: &str,
        dataset: &str,
    ) -> Result<String, SemanticSearchError> {
        let scope = if self.scope_to_dataset {
            match DatasetId::new(dataset) {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::debug!("Scoped search on invalid dataset {:?}: {}", dataset, e);
                    return Err(SemanticSearchError::NoMatches);
                }
            }
        } else {
            None
        };

        let embedding = self
            .embedder
            .embed(question)
            .await
            .map_err(|e| SemanticSearchError::Embedding(format!("{:#}", e)))?;

        let matches = self
            .index
            .search(&embedding, self.top_k, scope.as_ref())
            .await
            .map_err(|e| SemanticSearchError::Search(format!("{:#}", e)))?;

        for m in &matches {
            tracing::debug!("Match {} ({}) score {:.4}", m.id, m.dataset, m.score);
        }

        let records: Vec<String> = matches
            .iter()
            .filter(|m| !m.metadata.is_empty())
            .map(|m| format!("Record: {}", flatten_metadata(&m.metadata)))
            .collect();

        if records.is_empty() {
            return Err(SemanticSearchError::NoMatches);
        }

        Ok(records.join("\n"))
    }
}
