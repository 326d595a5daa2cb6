//! 적재 모듈 - CSV 파일을 행 저장소와 벡터 인덱스에 넣기
//!
//! 1. 파일 이름에서 데이터셋 식별자 파생
//! 2. CSV 파싱 후 행 저장소 테이블 교체
//! 3. 행마다 `col: value, ...` 텍스트를 임베딩하여 벡터 인덱스에 추가
//!
//! 같은 파일 이름으로 다시 적재하면 테이블은 교체되지만
//! 벡터 레코드는 계속 누적됩니다.

mod parser;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::dataset::DatasetId;
use crate::embedding::EmbeddingProvider;
use crate::knowledge::{RowStore, TableData, VectorRecord, VectorStore};

pub use parser::{parse_csv, read_csv, row_text};

/// 벡터 인덱스 추가 단위
const INSERT_BATCH_SIZE: usize = 100;

// ============================================================================
// Types
// ============================================================================

/// 적재 결과
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub dataset: DatasetId,
    /// 업로드된 파일 이름 (예: `customers.csv`)
    pub file_name: String,
    pub rows_stored: usize,
    pub vectors_added: usize,
    pub ingested_at: DateTime<Utc>,
}

impl IngestReport {
    /// UI에 표시할 상태 메시지
    pub fn status_message(&self) -> String {
        format!("File {} processed successfully.", self.file_name)
    }
}

// ============================================================================
// Ingestor
// ============================================================================

/// CSV 적재기
pub struct Ingestor {
    rows: Arc<dyn RowStore>,
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Ingestor {
    pub fn new(
        rows: Arc<dyn RowStore>,
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            rows,
            vectors,
            embedder,
        }
    }

    /// CSV 파일 적재
    ///
    /// # Returns
    /// 성공하면 행 저장소 테이블과 데이터셋 태그가 붙은 벡터 레코드 모두 질의 가능합니다.
    pub async fn ingest(&self, path: &Path) -> Result<IngestReport> {
        let dataset = DatasetId::from_path(path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(dataset.as_str())
            .to_string();

        // 1. 파싱 + 행 저장소 교체 (블로킹 I/O이므로 spawn_blocking)
        let rows = self.rows.clone();
        let csv_path = path.to_path_buf();
        let store_dataset = dataset.clone();
        let (table, rows_stored) =
            tokio::task::spawn_blocking(move || -> Result<(TableData, usize)> {
                let table = read_csv(&csv_path)?;
                tracing::info!(
                    "Parsed {} ({} columns, {} rows)",
                    csv_path.display(),
                    table.columns.len(),
                    table.rows.len()
                );
                let stored = rows
                    .replace_table(&store_dataset, &table)
                    .with_context(|| format!("Failed to store {} in row store", store_dataset))?;
                Ok((table, stored))
            })
            .await
            .context("Row store task failed")??;

        // 2. 벡터 인덱스 (추가)
        // 재적재 시에도 ID가 겹치지 않도록 배치 태그를 붙임
        let batch_tag = uuid::Uuid::new_v4().simple().to_string();
        let batch_tag = &batch_tag[..8];

        let mut pending = Vec::with_capacity(INSERT_BATCH_SIZE.min(table.rows.len()));
        let mut vectors_added = 0;

        for index in 0..table.rows.len() {
            let (Some(text), Some(metadata)) = (row_text(&table, index), table.record(index))
            else {
                continue;
            };

            tracing::debug!("Embedding row {}/{}", index + 1, table.rows.len());
            let embedding = self
                .embedder
                .embed(&text)
                .await
                .with_context(|| format!("Failed to embed row {} of {}", index, dataset))?;

            if embedding.len() != self.embedder.dimension() {
                anyhow::bail!(
                    "{} returned {} dimensions for row {} of {}, expected {}",
                    self.embedder.name(),
                    embedding.len(),
                    index,
                    dataset,
                    self.embedder.dimension()
                );
            }

            pending.push(VectorRecord {
                id: format!("{}-{}-{}", dataset, index, batch_tag),
                dataset: dataset.clone(),
                embedding,
                metadata,
            });

            if pending.len() >= INSERT_BATCH_SIZE {
                vectors_added += self.flush(&mut pending).await?;
            }
        }
        vectors_added += self.flush(&mut pending).await?;

        tracing::info!(
            "Ingested {}: {} rows stored, {} vectors added",
            dataset,
            rows_stored,
            vectors_added
        );

        Ok(IngestReport {
            dataset,
            file_name,
            rows_stored,
            vectors_added,
            ingested_at: Utc::now(),
        })
    }

    async fn flush(&self, pending: &mut Vec<VectorRecord>) -> Result<usize> {
        if pending.is_empty() {
            return Ok(0);
        }
        let added = self
            .vectors
            .insert_batch(pending)
            .await
            .context("Failed to add vectors to index")?;
        pending.clear();
        Ok(added)
    }
}

// ============================================================================
// Tests
// ============================================================================
