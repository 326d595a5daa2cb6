//! LanceDB Vector Store - 공유 벡터 인덱스
//!
//! 모든 데이터셋의 행 임베딩을 하나의 테이블에 추가합니다.
//! 메타데이터는 JSON 문자열 컬럼으로 저장합니다.
//! ref: https://lancedb.github.io/lancedb/

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};

use crate::dataset::DatasetId;

use super::vector::{Metadata, VectorMatch, VectorRecord, VectorStore};

/// 벡터 테이블 이름
const TABLE_NAME: &str = "rows";

// ============================================================================
// LanceVectorStore
// ============================================================================

/// LanceDB 벡터 저장소 구현
pub struct LanceVectorStore {
    db: Connection,
    dimension: i32,
}

impl LanceVectorStore {
    /// LanceDB 저장소 열기
    ///
    /// # Arguments
    /// * `path` - .lance 디렉토리 경로
    /// * `dimension` - 임베딩 차원
    pub async fn open(path: &Path, dimension: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .context("Failed to create LanceDB directory")?;
            }
        }

        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid path encoding"))?;

        let db = lancedb::connect(path_str)
            .execute()
            .await
            .context("Failed to connect to LanceDB")?;

        let dimension = i32::try_from(dimension).context("Vector dimension too large")?;

        Ok(Self { db, dimension })
    }

    fn create_schema(&self) -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("dataset", DataType::Utf8, false),
            Field::new("metadata", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    self.dimension,
                ),
                false,
            ),
        ])
    }

    /// 레코드들을 Arrow RecordBatch로 변환
    fn records_to_batch(&self, records: &[VectorRecord]) -> Result<RecordBatch> {
        if records.is_empty() {
            anyhow::bail!("Cannot create batch from empty records");
        }

        if let Some(bad) = records
            .iter()
            .find(|r| r.embedding.len() != self.dimension as usize)
        {
            anyhow::bail!(
                "Vector {} has dimension {}, index expects {}",
                bad.id,
                bad.embedding.len(),
                self.dimension
            );
        }

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        let datasets: Vec<&str> = records.iter().map(|r| r.dataset.as_str()).collect();
        let metadata: Vec<String> = records
            .iter()
            .map(|r| serde_json::to_string(&r.metadata))
            .collect::<Result<_, _>>()
            .context("Failed to serialize metadata")?;

        let embeddings_flat: Vec<f32> = records
            .iter()
            .flat_map(|r| r.embedding.iter().copied())
            .collect();

        let values = Float32Array::from(embeddings_flat);
        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let embeddings_list = FixedSizeListArray::try_new(
            field,
            self.dimension,
            Arc::new(values) as Arc<dyn Array>,
            None,
        )
        .context("Failed to create embedding array")?;

        RecordBatch::try_new(
            Arc::new(self.create_schema()),
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(datasets)),
                Arc::new(StringArray::from(metadata)),
                Arc::new(embeddings_list),
            ],
        )
        .context("Failed to create RecordBatch")
    }

    async fn table_exists(&self) -> Result<bool> {
        let names = self
            .db
            .table_names()
            .execute()
            .await
            .context("Failed to list LanceDB tables")?;
        Ok(names.iter().any(|n| n == TABLE_NAME))
    }

    async fn open_table(&self) -> Result<lancedb::table::Table> {
        self.db
            .open_table(TABLE_NAME)
            .execute()
            .await
            .context("Failed to open vector table")
    }
}

/// LanceDB 필터용 데이터셋 조건식
fn dataset_filter(dataset: &DatasetId) -> String {
    format!("dataset = '{}'", dataset.as_str().replace('\'', "''"))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow::anyhow!("Missing {} column", name))
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    async fn insert_batch(&self, records: &[VectorRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let batch = self.records_to_batch(records)?;
        let schema = batch.schema();
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

        if self.table_exists().await? {
            self.open_table()
                .await?
                .add(batches)
                .execute()
                .await
                .context("Failed to add vectors to table")?;
        } else {
            self.db
                .create_table(TABLE_NAME, batches)
                .execute()
                .await
                .context("Failed to create table")?;
        }

        Ok(records.len())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        dataset: Option<&DatasetId>,
    ) -> Result<Vec<VectorMatch>> {
        if !self.table_exists().await? {
            return Ok(vec![]);
        }

        let table = self.open_table().await?;

        let mut query = table
            .vector_search(query_embedding.to_vec())
            .context("Failed to create vector search")?
            .limit(limit);

        if let Some(dataset) = dataset {
            query = query.only_if(dataset_filter(dataset));
        }

        let batches: Vec<RecordBatch> = query
            .execute()
            .await
            .context("Failed to execute vector search")?
            .try_collect()
            .await?;

        let mut matches = Vec::new();

        for batch in batches {
            let ids = string_column(&batch, "id")?;
            let datasets = string_column(&batch, "dataset")?;
            let metadata = string_column(&batch, "metadata")?;

            // _distance 컬럼 (LanceDB가 자동 추가)
            let distances = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| anyhow::anyhow!("Missing _distance column"))?;

            for i in 0..batch.num_rows() {
                let parsed: Metadata = match serde_json::from_str(metadata.value(i)) {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::warn!("Unreadable metadata for {}: {}", ids.value(i), e);
                        Metadata::new()
                    }
                };

                matches.push(VectorMatch {
                    id: ids.value(i).to_string(),
                    dataset: datasets.value(i).to_string(),
                    metadata: parsed,
                    // L2 거리 -> 유사도 근사
                    score: 1.0 / (1.0 + distances.value(i)),
                });
            }
        }

        Ok(matches)
    }

    async fn count(&self) -> Result<usize> {
        if !self.table_exists().await? {
            return Ok(0);
        }

        self.open_table()
            .await?
            .count_rows(None)
            .await
            .context("Failed to count rows")
    }

    async fn count_dataset(&self, dataset: &DatasetId) -> Result<usize> {
        if !self.table_exists().await? {
            return Ok(0);
        }

        self.open_table()
            .await?
            .count_rows(Some(dataset_filter(dataset)))
            .await
            .context("Failed to count rows for dataset")
    }
}

// ============================================================================
// Tests
// ============================================================================
