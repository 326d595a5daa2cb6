//! 적재 → 질문 전체 흐름 통합 테스트 (외부 API 대신 로컬 스텁 사용)

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use csv_chat::chat::{NO_RELEVANT_DATA, NO_RELEVANT_RESULTS};
use csv_chat::{
    AppConfig, CsvChat, DatasetId, EmbeddingProvider, GenerationRequest, MemoryVectorStore,
    RowStore, SqliteRowStore, TextGenerator, VectorStore,
};

const DIMENSION: usize = 8;

/// 글자 빈도 기반 임베딩
struct LetterEmbedder;

#[async_trait]
impl EmbeddingProvider for LetterEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; DIMENSION];
        for c in text.to_lowercase().chars().filter(|c| c.is_ascii_alphabetic()) {
            vector[(c as usize) % DIMENSION] += 1.0;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn name(&self) -> &str {
        "letters"
    }
}

/// SQL 요청에는 고정 SQL, 요약 요청에는 컨텍스트를 그대로 돌려주는 생성기
struct EchoGenerator {
    sql: String,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl EchoGenerator {
    fn new(sql: &str) -> Self {
        Self {
            sql: sql.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for EchoGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        if request.system.contains("SQL") {
            Ok(format!("```sql\n{}\n```", self.sql))
        } else {
            Ok(format!("ANSWER: {}", request.user))
        }
    }
}

struct Setup {
    dir: TempDir,
    rows: Arc<SqliteRowStore>,
    index: Arc<MemoryVectorStore>,
    generator: Arc<EchoGenerator>,
    app: CsvChat,
}

fn setup(sql: &str) -> Setup {
    let dir = TempDir::new().unwrap();
    let config = AppConfig::default().with_data_dir(dir.path());
    let rows =
        Arc::new(SqliteRowStore::open(&config.directories.uploaded_files_directory).unwrap());
    let index = Arc::new(MemoryVectorStore::new());
    let generator = Arc::new(EchoGenerator::new(sql));

    let app = CsvChat::with_components(
        &config,
        rows.clone(),
        index.clone(),
        Arc::new(LetterEmbedder),
        generator.clone(),
    );

    Setup {
        dir,
        rows,
        index,
        generator,
        app,
    }
}

fn write_customers(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("customers.csv");
    std::fs::write(
        &path,
        "name,age,comment\nAlice,35,pricing is too high\nBob,28,love the support\n",
    )
    .unwrap();
    path
}

#[tokio::test]
async fn structured_question_runs_generated_sql() {
    let s = setup("SELECT name, age FROM customers WHERE age > 30");
    let path = write_customers(&s.dir);
    s.app.ingest(&path).await.unwrap();

    let answer = s.app.answer("show me all rows where age > 30", "customers").await;
    assert!(answer.contains(r#"[{"name":"Alice","age":35}]"#), "{}", answer);

    let requests = s.generator.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].max_tokens, 50);
}

#[tokio::test]
async fn structured_question_with_no_rows() {
    let s = setup("SELECT * FROM customers WHERE age > 99");
    let path = write_customers(&s.dir);
    s.app.ingest(&path).await.unwrap();

    assert_eq!(s.app.answer("list old customers", "customers").await, NO_RELEVANT_DATA);
}

#[tokio::test]
async fn structured_question_cannot_write() {
    let s = setup("DELETE FROM customers");
    let path = write_customers(&s.dir);
    s.app.ingest(&path).await.unwrap();

    assert_eq!(s.app.answer("list and remove", "customers").await, NO_RELEVANT_DATA);
    let dataset = DatasetId::new("customers").unwrap();
    assert_eq!(s.rows.row_count(&dataset).unwrap(), 2);
}

#[tokio::test]
async fn semantic_question_uses_row_records() {
    let s = setup("SELECT 1");
    let path = write_customers(&s.dir);
    s.app.ingest(&path).await.unwrap();

    let answer = s.app.answer("what do people think about pricing?", "customers").await;
    assert!(answer.starts_with("ANSWER: I asked:"), "{}", answer);
    assert!(answer.contains("Record: name: Alice, age: 35, comment: pricing is too high"));

    let requests = s.generator.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].max_tokens, 100);
}

#[tokio::test]
async fn semantic_question_on_empty_index() {
    let s = setup("SELECT 1");
    assert_eq!(s.app.answer("why is that?", "customers").await, NO_RELEVANT_RESULTS);
    assert!(s.generator.requests().is_empty());
}

#[tokio::test]
async fn reingest_replaces_table_and_appends_vectors() {
    let s = setup("SELECT 1");
    let path = write_customers(&s.dir);
    let dataset = DatasetId::new("customers").unwrap();

    s.app.ingest(&path).await.unwrap();
    assert_eq!(s.rows.row_count(&dataset).unwrap(), 2);
    assert_eq!(s.index.count_dataset(&dataset).await.unwrap(), 2);

    s.app.ingest(&path).await.unwrap();
    assert_eq!(s.rows.row_count(&dataset).unwrap(), 2);
    assert_eq!(s.index.count_dataset(&dataset).await.unwrap(), 4);
    assert_eq!(s.app.list_datasets().unwrap().len(), 1);
}
