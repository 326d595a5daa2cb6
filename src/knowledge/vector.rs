//! Vector Store - 벡터 인덱스 트레이트 및 유틸리티
//!
//! 모든 데이터셋이 하나의 인덱스를 공유합니다.
//! 레코드는 추가만 되며 이 시스템에서는 삭제하지 않습니다.

use anyhow::Result;
use async_trait::async_trait;

use crate::dataset::DatasetId;

/// 벡터 레코드 메타데이터 (원본 행의 컬럼 이름 → 값)
pub type Metadata = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// Types
// ============================================================================

/// 벡터 레코드 (저장용)
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// 인덱스 안에서 유일한 ID
    pub id: String,
    /// 데이터셋 태그
    pub dataset: DatasetId,
    /// 임베딩 벡터
    pub embedding: Vec<f32>,
    /// 원본 행 값
    pub metadata: Metadata,
}

/// 검색 결과
#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub id: String,
    pub dataset: String,
    pub metadata: Metadata,
    /// 유사도 스코어 (높을수록 가까움)
    pub score: f32,
}

// ============================================================================
// VectorStore Trait
// ============================================================================

/// VectorStore 트레이트 (async)
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// 레코드 배치 추가 (기존 레코드는 유지)
    async fn insert_batch(&self, records: &[VectorRecord]) -> Result<usize>;

    /// 최근접 이웃 검색
    ///
    /// `dataset`이 Some이면 해당 태그의 레코드만 검색합니다.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        dataset: Option<&DatasetId>,
    ) -> Result<Vec<VectorMatch>>;

    /// 전체 레코드 개수
    async fn count(&self) -> Result<usize>;

    /// 특정 데이터셋 태그의 레코드 개수
    async fn count_dataset(&self, dataset: &DatasetId) -> Result<usize>;
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 코사인 유사도 계산
///
/// 결과는 -1.0 ~ 1.0 범위입니다. 길이가 다르거나 영벡터면 0.0입니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// 메타데이터를 `key: value, key: value` 형태로 평탄화
///
/// 문자열 값은 따옴표 없이 그대로 씁니다.
pub fn flatten_metadata(metadata: &Metadata) -> String {
    metadata
        .iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(s) => format!("{}: {}", key, s),
            other => format!("{}: {}", key, other),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Tests
// ============================================================================
