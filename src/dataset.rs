//! 데이터셋 식별자
//!
//! 업로드된 파일의 base name(확장자 제외)에서 파생되며,
//! 행 저장소의 테이블 이름과 벡터 레코드 태그로 함께 사용됩니다.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// 데이터셋 식별자 생성 에러
#[derive(Debug, Error, PartialEq)]
pub enum DatasetIdError {
    #[error("Cannot derive a dataset id from path: {0}")]
    NoFileStem(PathBuf),
    #[error("Dataset id cannot be empty")]
    Empty,
    #[error("Dataset id contains a path separator: {0}")]
    PathSeparator(String),
}

/// 데이터셋 식별자 (예: `customers.csv` → `customers`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatasetId(String);

impl DatasetId {
    /// 문자열에서 생성
    pub fn new(id: impl Into<String>) -> Result<Self, DatasetIdError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DatasetIdError::Empty);
        }
        if id.contains('/') || id.contains('\\') {
            return Err(DatasetIdError::PathSeparator(id));
        }
        Ok(Self(id))
    }

    /// 파일 경로에서 파생 (디렉토리와 확장자 제거)
    pub fn from_path(path: &Path) -> Result<Self, DatasetIdError> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| DatasetIdError::NoFileStem(path.to_path_buf()))?;
        Self::new(stem)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// SQL 식별자로 인용 (`"name"`, 내부 따옴표는 이중화)
    pub fn quoted(&self) -> String {
        quote_identifier(&self.0)
    }

    /// 업로드 디렉토리 안의 SQLite 파일 경로
    pub fn db_path(&self, uploads_dir: &Path) -> PathBuf {
        uploads_dir.join(format!("{}.db", self.0))
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// SQL 식별자 인용
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
