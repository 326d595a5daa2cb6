//! csv-chat - CSV 파일에 자연어로 질문하기
//!
//! 업로드한 CSV를 데이터셋별 SQLite 테이블과 행 단위 임베딩(LanceDB)으로 적재하고,
//! 질문을 키워드로 분류하여 SQL 질의 또는 시맨틱 검색으로 답변합니다.

pub mod app;
pub mod chat;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod embedding;
pub mod ingest;
pub mod knowledge;
pub mod llm;

#[cfg(test)]
mod testing;

// Re-exports
pub use app::CsvChat;
pub use chat::{classify, AnswerComposer, ComposeMode, QueryKind, QueryRouter};
pub use config::{get_data_dir, AppConfig, ConfigError};
pub use dataset::DatasetId;
pub use embedding::{EmbeddingProvider, OpenAiEmbedding};
pub use ingest::{IngestReport, Ingestor};
pub use knowledge::{
    LanceVectorStore, MemoryVectorStore, Row, RowStore, SqliteRowStore, VectorMatch,
    VectorRecord, VectorStore,
};
pub use llm::{GenerationRequest, OpenAiChat, TextGenerator};
