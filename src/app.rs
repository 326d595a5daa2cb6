//! 애플리케이션 조립 - 설정으로 저장소, 인덱스, 외부 API 클라이언트를 한 번에 구성
//!
//! 구성된 값은 프로세스 수명 동안 유지되며 설정을 다시 읽지 않습니다.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::chat::{AnswerComposer, QueryRouter, RowQueryBackend, SemanticSearchBackend};
use crate::config::AppConfig;
use crate::embedding::{EmbeddingProvider, OpenAiEmbedding};
use crate::ingest::{IngestReport, Ingestor};
use crate::knowledge::{
    DatasetSummary, LanceVectorStore, MemoryVectorStore, SqliteRowStore, VectorStore,
};
use crate::llm::{OpenAiChat, TextGenerator};

/// CSV 질의 응답 애플리케이션
pub struct CsvChat {
    rows: Arc<SqliteRowStore>,
    index: Arc<dyn VectorStore>,
    ingestor: Ingestor,
    router: QueryRouter,
}

impl CsvChat {
    /// 설정으로 생성
    ///
    /// # Arguments
    /// * `config` - 검증된 설정 (API 키 필요)
    /// * `memory_index` - true면 LanceDB 대신 프로세스 내 인덱스 사용
    pub async fn from_config(config: &AppConfig, memory_index: bool) -> Result<Self> {
        let data_dir = &config.directories.data_dir;
        if !data_dir.exists() {
            std::fs::create_dir_all(data_dir).context("Failed to create data directory")?;
        }

        let rows = Arc::new(
            SqliteRowStore::open(&config.directories.uploaded_files_directory)
                .context("Failed to open row store")?,
        );

        let embedder = Arc::new(
            OpenAiEmbedding::from_config(config).context("Failed to create embedder")?,
        );
        tracing::info!(
            "Embedding with {} ({} dimensions)",
            embedder.name(),
            embedder.dimension()
        );

        let index: Arc<dyn VectorStore> = if memory_index {
            tracing::info!("Using in-memory vector index");
            Arc::new(MemoryVectorStore::new())
        } else {
            Arc::new(
                LanceVectorStore::open(&config.vector_index_path(), embedder.dimension())
                    .await
                    .context("Failed to open vector index")?,
            )
        };

        let generator = Arc::new(
            OpenAiChat::from_config(config).context("Failed to create text generator")?,
        );

        Ok(Self::with_components(config, rows, index, embedder, generator))
    }

    /// 구성 요소를 직접 지정하여 생성
    pub fn with_components(
        config: &AppConfig,
        rows: Arc<SqliteRowStore>,
        index: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let ingestor = Ingestor::new(rows.clone(), index.clone(), embedder.clone());

        let semantic = SemanticSearchBackend::new(embedder, index.clone(), config.vector.top_k)
            .scoped_to_dataset(config.vector.scope_to_dataset);
        let router = QueryRouter::new(AnswerComposer::new(generator.clone()))
            .with_row_query(RowQueryBackend::new(generator, rows.clone()))
            .with_semantic_search(semantic);

        Self {
            rows,
            index,
            ingestor,
            router,
        }
    }

    /// CSV 파일 적재
    pub async fn ingest(&self, path: &Path) -> Result<IngestReport> {
        self.ingestor.ingest(path).await
    }

    /// 질문에 답변 (항상 문자열)
    pub async fn answer(&self, question: &str, dataset: &str) -> String {
        self.router.answer(question, dataset).await
    }

    /// 적재된 데이터셋 목록
    pub fn list_datasets(&self) -> Result<Vec<DatasetSummary>> {
        self.rows.list_datasets()
    }

    /// 벡터 인덱스의 전체 레코드 수
    pub async fn vector_count(&self) -> Result<usize> {
        self.index.count().await
    }
}
