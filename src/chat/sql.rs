//! Row-Query Backend - 자연어 질문을 SQL로 바꿔 데이터셋 테이블에 실행
//!
//! SQL 생성기에는 질문과 테이블 이름만 전달합니다 (스키마 없음).
//! 스키마와 맞지 않는 SQL은 실행 단계에서 실패하고 "데이터 없음"과 같게 처리됩니다.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use thiserror::Error;

use crate::dataset::DatasetId;
use crate::knowledge::{Row, RowStore};
use crate::llm::{GenerationRequest, TextGenerator};

const SQL_SYSTEM_INSTRUCTION: &str = "You are an expert SQL generator.";
const SQL_MAX_TOKENS: u32 = 100;
const SQL_TEMPERATURE: f32 = 0.0;

/// Row-Query 실패 유형
#[derive(Debug, Error)]
pub enum RowQueryError {
    #[error("SQL generation failed: {0}")]
    Generation(String),
    #[error("SQL generation returned no query")]
    EmptyQuery,
    #[error("SQL execution failed: {0}")]
    Execution(String),
    #[error("query returned no rows")]
    NoRows,
}

/// SQL 질의 백엔드
#[derive(Clone)]
pub struct RowQueryBackend {
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn RowStore>,
}

impl RowQueryBackend {
    pub fn new(generator: Arc<dyn TextGenerator>, store: Arc<dyn RowStore>) -> Self {
        Self { generator, store }
    }

    /// 질문 → SQL → 실행
    ///
    /// SQL이 만들어지지 않으면 실행을 시도하지 않습니다.
    pub async fn query(&self, question: &str, dataset: &str) -> Result<Vec<Row>, RowQueryError> {
        let sql = self.generate_sql(question, dataset).await?;
        tracing::info!("Generated SQL for {}: {}", dataset, sql);

        let dataset =
            DatasetId::new(dataset).map_err(|e| RowQueryError::Execution(e.to_string()))?;
        self.execute(dataset, sql).await
    }

    /// SQL 생성
    pub async fn generate_sql(&self, question: &str, table: &str) -> Result<String, RowQueryError> {
        let request = GenerationRequest {
            system: SQL_SYSTEM_INSTRUCTION.to_string(),
            user: sql_prompt(question, table),
            max_tokens: SQL_MAX_TOKENS,
            temperature: SQL_TEMPERATURE,
        };

        let text = self
            .generator
            .generate(&request)
            .await
            .map_err(|e| RowQueryError::Generation(format!("{:#}", e)))?;

        extract_sql(&text).ok_or(RowQueryError::EmptyQuery)
    }

    /// SQL 실행 (결과가 없으면 NoRows)
    ///
    /// SQLite 호출은 블로킹이므로 spawn_blocking에서 실행합니다.
    pub async fn execute(
        &self,
        dataset: DatasetId,
        sql: String,
    ) -> Result<Vec<Row>, RowQueryError> {
        let store = self.store.clone();
        let rows = tokio::task::spawn_blocking(move || store.execute(&dataset, &sql))
            .await
            .map_err(|e| RowQueryError::Execution(format!("query task failed: {}", e)))?
            .map_err(|e| RowQueryError::Execution(format!("{:#}", e)))?;

        if rows.is_empty() {
            return Err(RowQueryError::NoRows);
        }
        Ok(rows)
    }
}

fn sql_prompt(question: &str, table: &str) -> String {
    format!(
        "Convert the following question into an SQL query:\n\
         Question: {}\n\
         Table: {}\n\
         SQL Query:",
        question, table
    )
}

/// 생성된 텍스트에서 SQL 추출
///
/// Markdown 코드 펜스가 있으면 그 안쪽만 사용합니다. 비어있으면 None.
/// 언어 태그는 바로 뒤에 줄바꿈이 있을 때만 인정합니다 (펜스 안 첫 SQL 키워드 보존).
pub fn extract_sql(text: &str) -> Option<String> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:[A-Za-z]+[ \t]*\r?\n|\s*)(.*?)```").ok()
    });

    let sql = fence
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map_or(text, |m| m.as_str())
        .trim();

    if sql.is_empty() {
        None
    } else {
        Some(sql.to_string())
    }
}

/// 행 시퀀스를 컴포저 컨텍스트로 직렬화 (JSON 배열, 컬럼 순서 유지)
pub fn render_rows(rows: &[Row]) -> String {
    serde_json::to_string(rows).unwrap_or_else(|_| format!("{:?}", rows))
}
