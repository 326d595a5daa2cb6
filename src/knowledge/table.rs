//! Row Store - rusqlite 기반 데이터셋별 테이블 저장소
//!
//! 데이터셋마다 `<uploads>/<dataset>.db` 파일 하나에 `"<dataset>"` 테이블 하나를 둡니다.
//! 같은 이름으로 다시 적재하면 테이블이 교체됩니다.
//! 질의 실행은 읽기 전용 연결에서 이루어집니다.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::Engine;
use chrono::{DateTime, Utc};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, OpenFlags};

use crate::dataset::{quote_identifier, DatasetId};

/// 행 레코드 (컬럼 이름 → 스칼라 값, 컬럼 순서 유지)
pub type Row = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// Types
// ============================================================================

/// 컬럼 타입 (CSV 값에서 추론)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    /// SQLite 타입 이름
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }
}

/// 컬럼 정의
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
}

/// 적재할 테이블 데이터 (하나의 스키마를 공유하는 행 시퀀스)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableData {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl TableData {
    /// i번째 행을 Row 레코드로 변환
    pub fn record(&self, index: usize) -> Option<Row> {
        let values = self.rows.get(index)?;
        Some(
            self.columns
                .iter()
                .zip(values)
                .map(|(col, value)| (col.name.clone(), value_to_json(value.into())))
                .collect(),
        )
    }
}

/// 데이터셋 요약 (list 명령어용)
#[derive(Debug, Clone)]
pub struct DatasetSummary {
    pub dataset: DatasetId,
    pub row_count: usize,
    pub modified_at: Option<DateTime<Utc>>,
}

// ============================================================================
// RowStore Trait
// ============================================================================

/// 행 저장소 트레이트
pub trait RowStore: Send + Sync {
    /// 데이터셋 테이블 교체 (없으면 생성), 저장된 행 수 반환
    fn replace_table(&self, dataset: &DatasetId, table: &TableData) -> Result<usize>;

    /// 데이터셋에 SQL 실행
    fn execute(&self, dataset: &DatasetId, sql: &str) -> Result<Vec<Row>>;

    /// 데이터셋 행 개수
    fn row_count(&self, dataset: &DatasetId) -> Result<usize>;
}

// ============================================================================
// SqliteRowStore
// ============================================================================

/// SQLite 파일 기반 행 저장소
#[derive(Debug, Clone)]
pub struct SqliteRowStore {
    uploads_dir: PathBuf,
}

impl SqliteRowStore {
    /// 저장소 열기 (디렉토리가 없으면 생성)
    pub fn open(uploads_dir: &Path) -> Result<Self> {
        if !uploads_dir.exists() {
            std::fs::create_dir_all(uploads_dir)
                .context("Failed to create uploads directory")?;
        }

        Ok(Self {
            uploads_dir: uploads_dir.to_path_buf(),
        })
    }

    /// 기존 데이터셋 파일을 읽기 전용으로 열기
    fn open_read_only(&self, dataset: &DatasetId) -> Result<Connection> {
        let path = dataset.db_path(&self.uploads_dir);
        if !path.exists() {
            anyhow::bail!("Unknown dataset: {}", dataset);
        }

        Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open dataset database: {}", path.display()))
    }

    /// 업로드 디렉토리의 데이터셋 목록
    pub fn list_datasets(&self) -> Result<Vec<DatasetSummary>> {
        let mut summaries = Vec::new();

        let entries = std::fs::read_dir(&self.uploads_dir)
            .context("Failed to read uploads directory")?;

        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("db") {
                continue;
            }

            let dataset = match DatasetId::from_path(&path) {
                Ok(id) => id,
                Err(e) => {
                    tracing::debug!("Skipping {:?}: {}", path, e);
                    continue;
                }
            };

            let row_count = match self.row_count(&dataset) {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!("Failed to count rows for {}: {}", dataset, e);
                    continue;
                }
            };

            let modified_at = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .map(DateTime::<Utc>::from);

            summaries.push(DatasetSummary {
                dataset,
                row_count,
                modified_at,
            });
        }

        summaries.sort_by(|a, b| a.dataset.cmp(&b.dataset));
        Ok(summaries)
    }
}

impl RowStore for SqliteRowStore {
    fn replace_table(&self, dataset: &DatasetId, table: &TableData) -> Result<usize> {
        if table.columns.is_empty() {
            anyhow::bail!("Cannot store a table without columns");
        }

        let path = dataset.db_path(&self.uploads_dir);
        let mut conn = Connection::open(&path)
            .with_context(|| format!("Failed to open dataset database: {}", path.display()))?;

        let table_name = dataset.quoted();
        let column_defs = table
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_identifier(&c.name), c.kind.sql_type()))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=table.columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");

        let tx = conn.transaction().context("Failed to begin transaction")?;

        tx.execute(&format!("DROP TABLE IF EXISTS {}", table_name), [])
            .context("Failed to drop existing table")?;
        tx.execute(&format!("CREATE TABLE {} ({})", table_name, column_defs), [])
            .context("Failed to create table")?;

        {
            let mut stmt = tx
                .prepare(&format!("INSERT INTO {} VALUES ({})", table_name, placeholders))
                .context("Failed to prepare insert")?;

            for row in &table.rows {
                stmt.execute(rusqlite::params_from_iter(row.iter()))
                    .context("Failed to insert row")?;
            }
        }

        tx.commit().context("Failed to commit table")?;

        tracing::info!(
            "Stored {} rows in {} ({})",
            table.rows.len(),
            dataset,
            path.display()
        );
        Ok(table.rows.len())
    }

    fn execute(&self, dataset: &DatasetId, sql: &str) -> Result<Vec<Row>> {
        let conn = self.open_read_only(dataset)?;

        let mut stmt = conn
            .prepare(sql)
            .with_context(|| format!("Failed to prepare query: {}", sql))?;

        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query([]).context("Failed to execute query")?;
        let mut records = Vec::new();

        while let Some(row) = rows.next().context("Failed to read result row")? {
            let mut record = Row::new();
            for (i, name) in names.iter().enumerate() {
                record.insert(name.clone(), value_to_json(row.get_ref(i)?));
            }
            records.push(record);
        }

        tracing::debug!("Query on {} returned {} rows", dataset, records.len());
        Ok(records)
    }

    fn row_count(&self, dataset: &DatasetId) -> Result<usize> {
        let conn = self.open_read_only(dataset)?;

        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {}", dataset.quoted()),
                [],
                |row| row.get(0),
            )
            .context("Failed to count rows")?;

        Ok(count as usize)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// SQLite 값을 JSON 스칼라로 변환 (BLOB은 base64 문자열)
pub fn value_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => i.into(),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned().into(),
        ValueRef::Blob(bytes) => base64::engine::general_purpose::STANDARD
            .encode(bytes)
            .into(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, SqliteRowStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteRowStore::open(&dir.path().join("uploads")).unwrap();
        (dir, store)
    }

    fn customers() -> TableData {
        TableData {
            columns: vec![
                Column {
                    name: "name".to_string(),
                    kind: ColumnType::Text,
                },
                Column {
                    name: "age".to_string(),
                    kind: ColumnType::Integer,
                },
            ],
            rows: vec![
                vec![Value::Text("Alice".to_string()), Value::Integer(35)],
                vec![Value::Text("Bob".to_string()), Value::Integer(28)],
                vec![Value::Text("Carol".to_string()), Value::Null],
            ],
        }
    }

    #[test]
    fn test_replace_and_query() {
        let (_dir, store) = create_test_store();
        let id = DatasetId::new("customers").unwrap();

        let stored = store.replace_table(&id, &customers()).unwrap();
        assert_eq!(stored, 3);

        let rows = store
            .execute(&id, "SELECT name, age FROM customers WHERE age > 30")
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            serde_json::to_string(&rows[0]).unwrap(),
            r#"{"name":"Alice","age":35}"#
        );
    }

    #[test]
    fn test_replace_does_not_grow() {
        let (_dir, store) = create_test_store();
        let id = DatasetId::new("customers").unwrap();

        store.replace_table(&id, &customers()).unwrap();
        store.replace_table(&id, &customers()).unwrap();

        assert_eq!(store.row_count(&id).unwrap(), 3);
    }

    #[test]
    fn test_execute_unknown_dataset_fails() {
        let (dir, store) = create_test_store();
        let id = DatasetId::new("missing").unwrap();

        assert!(store.execute(&id, "SELECT 1").is_err());
        // 읽기 전용이므로 파일이 생기지 않음
        assert!(!dir.path().join("uploads/missing.db").exists());
    }

    #[test]
    fn test_execute_is_read_only() {
        let (_dir, store) = create_test_store();
        let id = DatasetId::new("customers").unwrap();
        store.replace_table(&id, &customers()).unwrap();

        assert!(store.execute(&id, "DELETE FROM customers").is_err());
        assert_eq!(store.row_count(&id).unwrap(), 3);
    }

    #[test]
    fn test_execute_invalid_sql_fails() {
        let (_dir, store) = create_test_store();
        let id = DatasetId::new("customers").unwrap();
        store.replace_table(&id, &customers()).unwrap();

        assert!(store.execute(&id, "SELECT * FROM nope").is_err());
        assert!(store.execute(&id, "this is not sql").is_err());
    }

    #[test]
    fn test_table_name_with_spaces() {
        let (_dir, store) = create_test_store();
        let id = DatasetId::new("sales 2024").unwrap();
        store.replace_table(&id, &customers()).unwrap();

        let rows = store
            .execute(&id, "SELECT COUNT(*) AS n FROM \"sales 2024\"")
            .unwrap();
        assert_eq!(rows[0]["n"], 3);
    }

    #[test]
    fn test_list_datasets() {
        let (_dir, store) = create_test_store();
        store
            .replace_table(&DatasetId::new("b").unwrap(), &customers())
            .unwrap();
        store
            .replace_table(&DatasetId::new("a").unwrap(), &customers())
            .unwrap();

        let list = store.list_datasets().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].dataset.as_str(), "a");
        assert_eq!(list[0].row_count, 3);
    }

    #[test]
    fn test_record() {
        let table = customers();
        let record = table.record(2).unwrap();
        assert_eq!(record["name"], "Carol");
        assert!(record["age"].is_null());
        assert!(table.record(3).is_none());
    }

    #[test]
    fn test_value_to_json() {
        assert_eq!(value_to_json(ValueRef::Real(1.5)), serde_json::json!(1.5));
        assert_eq!(value_to_json(ValueRef::Blob(b"hi")), serde_json::json!("aGk="));
        assert!(value_to_json(ValueRef::Real(f64::NAN)).is_null());
    }
}
