//! Knowledge 모듈 - 업로드된 CSV 데이터의 두 저장소
//!
//! - Table: 데이터셋별 SQLite 테이블 (SQL 질의 경로)
//! - Vector: 모든 데이터셋이 공유하는 임베딩 인덱스 (시맨틱 검색 경로)
//! - Lance / Memory: 벡터 인덱스 구현체

mod lance;
mod memory;
mod table;
mod vector;

// Re-exports
pub use lance::LanceVectorStore;
pub use memory::MemoryVectorStore;
pub use table::{
    value_to_json, Column, ColumnType, DatasetSummary, Row, RowStore, SqliteRowStore, TableData,
};
pub use vector::{
    cosine_similarity, flatten_metadata, Metadata, VectorMatch, VectorRecord, VectorStore,
};
