//! In-memory Vector Store
//!
//! 브루트포스 코사인 유사도로 검색하는 프로세스 내 인덱스입니다.
//! 테스트와 `--memory-index` 실행에서 LanceDB 대신 사용합니다.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::dataset::DatasetId;

use super::vector::{cosine_similarity, VectorMatch, VectorRecord, VectorStore};

/// 메모리 벡터 저장소
#[derive(Debug, Clone, Default)]
pub struct MemoryVectorStore {
    records: Arc<RwLock<Vec<VectorRecord>>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn insert_batch(&self, records: &[VectorRecord]) -> Result<usize> {
        let mut store = self.records.write().await;
        store.extend_from_slice(records);
        tracing::debug!("Appended {} vectors (total {})", records.len(), store.len());
        Ok(records.len())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        dataset: Option<&DatasetId>,
    ) -> Result<Vec<VectorMatch>> {
        let store = self.records.read().await;

        let mut scored: Vec<(f32, &VectorRecord)> = store
            .iter()
            .filter(|r| dataset.map_or(true, |d| &r.dataset == d))
            .map(|r| (cosine_similarity(query_embedding, &r.embedding), r))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(score, r)| VectorMatch {
                id: r.id.clone(),
                dataset: r.dataset.to_string(),
                metadata: r.metadata.clone(),
                score,
            })
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }

    async fn count_dataset(&self, dataset: &DatasetId) -> Result<usize> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| &r.dataset == dataset)
            .count())
    }
}
