//! Query Router - 질문을 SQL 경로 또는 시맨틱 경로로 보내고 항상 문자열을 반환
//!
//! 분류는 고정 키워드 목록에 대한 대소문자 무시 부분 문자열 검사입니다.
//! 키워드가 하나라도 포함되면 Structured, 아니면 Semantic.
//! ("Showcase", "reorder" 같은 단어도 Structured로 분류됩니다.)
//!
//! 백엔드의 모든 실패는 아래 고정 문구 중 하나로 변환되며
//! `answer()`는 어떤 입력에도 에러를 반환하지 않습니다.

use super::composer::{AnswerComposer, ComposeMode};
use super::semantic::{SemanticSearchBackend, SemanticSearchError};
use super::sql::{render_rows, RowQueryBackend, RowQueryError};

/// Structured 경로 키워드
pub const STRUCTURED_KEYWORDS: [&str; 6] = ["list", "count", "show", "select", "retrieve", "order"];

pub const SQL_GENERATION_FAILED: &str =
    "Sorry, I couldn't generate a valid SQL query. Please try again.";
pub const NO_RELEVANT_DATA: &str = "No relevant data found in the database.";
pub const NO_RELEVANT_RESULTS: &str = "No relevant results found in the database.";
pub const SEMANTIC_SEARCH_FAILED: &str = "Error performing semantic search. Please try again.";
pub const UNABLE_TO_PROCESS: &str = "Unable to process the question.";

// ============================================================================
// Classification
// ============================================================================

/// 질문 분류 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Structured,
    Semantic,
}

impl QueryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryKind::Structured => "structured",
            QueryKind::Semantic => "semantic",
        }
    }
}

/// 질문 분류
pub fn classify(question: &str) -> QueryKind {
    let lowered = question.to_lowercase();
    if STRUCTURED_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        QueryKind::Structured
    } else {
        QueryKind::Semantic
    }
}

// ============================================================================
// Router
// ============================================================================

/// 질문 라우터
///
/// 분류된 경로의 백엔드가 연결되어 있지 않으면 `UNABLE_TO_PROCESS`를 반환합니다.
#[derive(Clone)]
pub struct QueryRouter {
    row_query: Option<RowQueryBackend>,
    semantic: Option<SemanticSearchBackend>,
    composer: AnswerComposer,
}

impl QueryRouter {
    pub fn new(composer: AnswerComposer) -> Self {
        Self {
            row_query: None,
            semantic: None,
            composer,
        }
    }

    pub fn with_row_query(mut self, backend: RowQueryBackend) -> Self {
        self.row_query = Some(backend);
        self
    }

    pub fn with_semantic_search(mut self, backend: SemanticSearchBackend) -> Self {
        self.semantic = Some(backend);
        self
    }

    /// 질문에 대한 답변 (실패 시 고정 문구)
    pub async fn answer(&self, question: &str, dataset: &str) -> String {
        let kind = classify(question);
        tracing::info!("Routing question on {} via {} path", dataset, kind.as_str());

        match (kind, &self.row_query, &self.semantic) {
            (QueryKind::Structured, Some(backend), _) => {
                self.answer_structured(backend, question, dataset).await
            }
            (QueryKind::Semantic, _, Some(backend)) => {
                self.answer_semantic(backend, question, dataset).await
            }
            _ => {
                tracing::warn!("No backend for {} question", kind.as_str());
                UNABLE_TO_PROCESS.to_string()
            }
        }
    }

    async fn answer_structured(
        &self,
        backend: &RowQueryBackend,
        question: &str,
        dataset: &str,
    ) -> String {
        match backend.query(question, dataset).await {
            Ok(rows) => {
                self.composer
                    .compose(&render_rows(&rows), question, ComposeMode::Concise)
                    .await
            }
            Err(e @ (RowQueryError::Generation(_) | RowQueryError::EmptyQuery)) => {
                tracing::warn!("{}", e);
                SQL_GENERATION_FAILED.to_string()
            }
            Err(e @ RowQueryError::Execution(_)) => {
                tracing::warn!("{}", e);
                NO_RELEVANT_DATA.to_string()
            }
            Err(RowQueryError::NoRows) => NO_RELEVANT_DATA.to_string(),
        }
    }

    async fn answer_semantic(
        &self,
        backend: &SemanticSearchBackend,
        question: &str,
        dataset: &str,
    ) -> String {
        match backend.search(question, dataset).await {
            Ok(context) => {
                self.composer
                    .compose(&context, question, ComposeMode::Conversational)
                    .await
            }
            Err(SemanticSearchError::NoMatches) => NO_RELEVANT_RESULTS.to_string(),
            Err(e) => {
                tracing::warn!("{}", e);
                SEMANTIC_SEARCH_FAILED.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::knowledge::MemoryVectorStore;
    use crate::testing::{row, FailingIndex, SpyRowStore, StubEmbedder, StubGenerator};
    use serde_json::json;

    struct Harness {
        router: QueryRouter,
        generator: Arc<StubGenerator>,
        store: Arc<SpyRowStore>,
        embedder: Arc<StubEmbedder>,
    }

    fn harness(generator: StubGenerator, store: SpyRowStore, embedder: StubEmbedder) -> Harness {
        let generator = Arc::new(generator);
        let store = Arc::new(store);
        let embedder = Arc::new(embedder);
        let router = QueryRouter::new(AnswerComposer::new(generator.clone()))
            .with_row_query(RowQueryBackend::new(generator.clone(), store.clone()))
            .with_semantic_search(SemanticSearchBackend::new(
                embedder.clone(),
                Arc::new(MemoryVectorStore::new()),
                5,
            ));
        Harness {
            router,
            generator,
            store,
            embedder,
        }
    }

    #[test]
    fn test_classify_keywords() {
        for q in [
            "list all customers",
            "COUNT the rows",
            "Show me everything",
            "select name",
            "please retrieve totals",
            "order by age",
        ] {
            assert_eq!(classify(q), QueryKind::Structured, "{}", q);
        }
        assert_eq!(classify("what do customers think about pricing?"), QueryKind::Semantic);
    }

    #[test]
    fn test_classify_substring_boundaries() {
        assert_eq!(classify("Showcase the best reviews"), QueryKind::Structured);
        assert_eq!(classify("anything worth ordering?"), QueryKind::Structured);
        assert_eq!(classify("should we reorder stock"), QueryKind::Structured);
        assert_eq!(classify("how many are there"), QueryKind::Semantic);
        assert_eq!(classify(""), QueryKind::Semantic);
        assert_eq!(classify("고객 의견은?"), QueryKind::Semantic);
    }

    #[tokio::test]
    async fn test_structured_scenario_composes_concise() {
        let h = harness(
            StubGenerator::new()
                .reply("SELECT * FROM customers WHERE age > 30")
                .reply("Alice is 35."),
            SpyRowStore::returning(vec![row(json!({"name": "Alice", "age": 35}))]),
            StubEmbedder::default(),
        );

        let answer = h.router.answer("show me all rows where age > 30", "customers").await;
        assert_eq!(answer, "Alice is 35.");

        let requests = h.generator.requests();
        assert_eq!(requests.len(), 2);
        let compose = &requests[1];
        assert_eq!(compose.system, ComposeMode::Concise.system_instruction());
        assert_eq!(compose.max_tokens, ComposeMode::Concise.max_tokens());
        assert!(compose.user.contains(r#"[{"name":"Alice","age":35}]"#));
        assert_eq!(h.embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_sql_means_no_execution() {
        let h = harness(
            StubGenerator::new().reply("  "),
            SpyRowStore::default(),
            StubEmbedder::default(),
        );

        let answer = h.router.answer("list customers", "customers").await;
        assert_eq!(answer, SQL_GENERATION_FAILED);
        assert!(h.store.executed().is_empty());
    }

    #[tokio::test]
    async fn test_sql_generation_error() {
        let h = harness(
            StubGenerator::new().fail("timeout"),
            SpyRowStore::default(),
            StubEmbedder::default(),
        );
        assert_eq!(h.router.answer("count rows", "customers").await, SQL_GENERATION_FAILED);
        assert!(h.store.executed().is_empty());
    }

    #[tokio::test]
    async fn test_zero_rows_and_execution_failure() {
        let h = harness(
            StubGenerator::new().reply("SELECT 1"),
            SpyRowStore::default(),
            StubEmbedder::default(),
        );
        assert_eq!(h.router.answer("count rows", "customers").await, NO_RELEVANT_DATA);
        // 컴포저는 호출되지 않음
        assert_eq!(h.generator.calls(), 1);

        let h = harness(
            StubGenerator::new().reply("SELECT 1"),
            SpyRowStore::failing(),
            StubEmbedder::default(),
        );
        assert_eq!(h.router.answer("count rows", "ghost").await, NO_RELEVANT_DATA);
    }

    #[tokio::test]
    async fn test_semantic_embedding_failure_skips_generation() {
        let h = harness(StubGenerator::new(), SpyRowStore::default(), StubEmbedder::failing());

        let answer = h.router.answer("what do people like?", "customers").await;
        assert_eq!(answer, SEMANTIC_SEARCH_FAILED);
        assert_eq!(h.generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_semantic_index_failure_skips_generation() {
        let generator = Arc::new(StubGenerator::new());
        let embedder = Arc::new(StubEmbedder::default());
        let router = QueryRouter::new(AnswerComposer::new(generator.clone()))
            .with_semantic_search(SemanticSearchBackend::new(
                embedder.clone(),
                Arc::new(FailingIndex),
                5,
            ));

        let answer = router.answer("what do people like?", "customers").await;
        assert_eq!(answer, SEMANTIC_SEARCH_FAILED);
        assert_eq!(embedder.calls(), 1);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_semantic_scenario_no_matches() {
        let h = harness(StubGenerator::new(), SpyRowStore::default(), StubEmbedder::default());

        let answer = h
            .router
            .answer("what do customers think about pricing?", "customers")
            .await;
        assert_eq!(answer, NO_RELEVANT_RESULTS);
        assert_eq!(h.embedder.calls(), 1);
        assert_eq!(h.generator.calls(), 0);
        assert!(h.store.executed().is_empty());
    }

    #[tokio::test]
    async fn test_never_fails_on_odd_input() {
        let h = harness(StubGenerator::new(), SpyRowStore::failing(), StubEmbedder::default());

        assert_eq!(h.router.answer("", "").await, NO_RELEVANT_RESULTS);
        assert_eq!(h.router.answer("데이터 요약해줘", "고객").await, NO_RELEVANT_RESULTS);
        // "stub answer"는 SQL로 실행되지만 알 수 없는 데이터셋이므로 실패
        assert_eq!(h.router.answer("list everything", "unknown/../x").await, NO_RELEVANT_DATA);
    }

    #[tokio::test]
    async fn test_missing_backend_is_unable_to_process() {
        let generator = Arc::new(StubGenerator::new());
        let router = QueryRouter::new(AnswerComposer::new(generator.clone()));

        assert_eq!(router.answer("list rows", "customers").await, UNABLE_TO_PROCESS);
        assert_eq!(router.answer("why?", "customers").await, UNABLE_TO_PROCESS);
        assert_eq!(generator.calls(), 0);
    }
}
