//! 테스트 더블 (임베딩 / 텍스트 생성 / 행 저장소)

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::dataset::DatasetId;
use crate::embedding::EmbeddingProvider;
use crate::knowledge::{Row, RowStore, TableData, VectorMatch, VectorRecord, VectorStore};
use crate::llm::{GenerationRequest, TextGenerator};

pub const TEST_DIMENSION: usize = 16;

/// 단어 해시 기반 결정적 임베딩 (같은 단어가 많을수록 가까움)
#[derive(Debug, Default)]
pub struct StubEmbedder {
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl StubEmbedder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("embedding service unavailable");
        }

        let mut vector = vec![0.0; TEST_DIMENSION];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = word
                .bytes()
                .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
            vector[bucket % TEST_DIMENSION] += 1.0;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        TEST_DIMENSION
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// 스크립트된 응답을 순서대로 돌려주는 텍스트 생성기
///
/// 응답이 소진되면 `"stub answer"`를 반환합니다.
#[derive(Debug, Default)]
pub struct StubGenerator {
    responses: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl StubGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.push(Ok(text.to_string()))
    }

    pub fn fail(self, message: &str) -> Self {
        self.push(Err(message.to_string()))
    }

    fn push(self, response: Result<String, String>) -> Self {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(response);
        }
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.requests().len()
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let next = self.responses.lock().ok().and_then(|mut q| q.pop_front());
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok("stub answer".to_string()),
        }
    }
}

/// 실행 호출을 기록하는 행 저장소
#[derive(Debug, Default)]
pub struct SpyRowStore {
    rows: Vec<Row>,
    fail: bool,
    executed: Mutex<Vec<(String, String)>>,
}

impl SpyRowStore {
    pub fn returning(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// (dataset, sql) 실행 기록
    pub fn executed(&self) -> Vec<(String, String)> {
        self.executed.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl RowStore for SpyRowStore {
    fn replace_table(&self, _dataset: &DatasetId, table: &TableData) -> Result<usize> {
        Ok(table.rows.len())
    }

    fn execute(&self, dataset: &DatasetId, sql: &str) -> Result<Vec<Row>> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push((dataset.to_string(), sql.to_string()));
        }
        if self.fail {
            anyhow::bail!("no such table: {}", dataset);
        }
        Ok(self.rows.clone())
    }

    fn row_count(&self, _dataset: &DatasetId) -> Result<usize> {
        Ok(self.rows.len())
    }
}

/// 모든 호출이 실패하는 벡터 인덱스
#[derive(Debug, Default)]
pub struct FailingIndex;

#[async_trait]
impl VectorStore for FailingIndex {
    async fn insert_batch(&self, _records: &[VectorRecord]) -> Result<usize> {
        anyhow::bail!("vector index unavailable")
    }

    async fn search(
        &self,
        _query_embedding: &[f32],
        _limit: usize,
        _dataset: Option<&DatasetId>,
    ) -> Result<Vec<VectorMatch>> {
        anyhow::bail!("vector index unavailable")
    }

    async fn count(&self) -> Result<usize> {
        anyhow::bail!("vector index unavailable")
    }

    async fn count_dataset(&self, _dataset: &DatasetId) -> Result<usize> {
        anyhow::bail!("vector index unavailable")
    }
}

/// JSON 객체 리터럴을 Row로 변환
pub fn row(value: serde_json::Value) -> Row {
    value.as_object().cloned().unwrap_or_default()
}
