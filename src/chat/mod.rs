//! 질의 응답 모듈
//!
//! - `router`: 키워드 분류 후 경로 선택, 실패를 고정 문구로 변환
//! - `sql`: 질문 → SQL → 행 저장소 실행
//! - `semantic`: 질문 임베딩 → 벡터 인덱스 검색
//! - `composer`: 결과를 자연어 답변으로 정리

mod composer;
mod router;
mod semantic;
mod sql;

pub use composer::{AnswerComposer, ComposeMode, CONCISE_FALLBACK, CONVERSATIONAL_FALLBACK};
pub use router::{
    classify, QueryKind, QueryRouter, NO_RELEVANT_DATA, NO_RELEVANT_RESULTS,
    SEMANTIC_SEARCH_FAILED, SQL_GENERATION_FAILED, STRUCTURED_KEYWORDS, UNABLE_TO_PROCESS,
};
pub use semantic::{SemanticSearchBackend, SemanticSearchError};
pub use sql::{extract_sql, render_rows, RowQueryBackend, RowQueryError};
