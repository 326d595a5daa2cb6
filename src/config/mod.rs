//! 설정 모듈
//!
//! 프로세스 시작 시 한 번 구성되어 각 컴포넌트 생성자에 전달되는
//! 애플리케이션 설정입니다. 실행 중에는 다시 읽지 않습니다.
//!
//! 로드 순서: 기본값 → `config.toml` (선택) → 환경변수
//!
//! ```toml
//! [directories]
//! uploaded_files_directory = "/data/uploads"
//!
//! [llm]
//! chat_model = "gpt-4"
//! embedding_model_name = "text-embedding-ada-002"
//!
//! [vector]
//! top_k = 5
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// OpenAI API 키 환경변수
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// 기본 OpenAI 호환 API 엔드포인트
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

// ============================================================================
// Data Directory
// ============================================================================

/// 데이터 디렉토리 경로 (~/.csv-chat/)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".csv-chat")
}

// ============================================================================
// Types
// ============================================================================

/// 애플리케이션 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub directories: DirectoryConfig,
    pub llm: LlmConfig,
    pub vector: VectorConfig,
    /// API 키 (환경변수에서만 읽음)
    #[serde(skip)]
    pub api_key: Option<String>,
}

/// 디렉토리 설정
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DirectoryConfig {
    /// 데이터 루트 (벡터 인덱스 위치)
    pub data_dir: PathBuf,
    /// 데이터셋별 SQLite 파일 위치
    pub uploaded_files_directory: PathBuf,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        let data_dir = get_data_dir();
        Self {
            uploaded_files_directory: data_dir.join("uploads"),
            data_dir,
        }
    }
}

/// 텍스트 생성 / 임베딩 API 설정
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub api_base: String,
    pub chat_model: String,
    pub embedding_model_name: String,
    /// HTTP 전송 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            chat_model: "gpt-4".to_string(),
            embedding_model_name: "text-embedding-ada-002".to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// 벡터 인덱스 설정
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VectorConfig {
    /// 임베딩 차원 (text-embedding-ada-002 = 1536)
    pub dimension: usize,
    /// 시맨틱 검색 결과 개수
    pub top_k: usize,
    /// 활성 데이터셋으로 검색 범위 제한 (기본: 전체 인덱스)
    pub scope_to_dataset: bool,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            dimension: 1536,
            top_k: 5,
            scope_to_dataset: false,
        }
    }
}

/// 설정 검증 에러
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid top_k: {0} (must be between 1 and 100)")]
    InvalidTopK(usize),
    #[error("Invalid vector dimension: {0}")]
    InvalidDimension(usize),
    #[error("Invalid model name for {0} (cannot be empty)")]
    EmptyModel(&'static str),
    #[error("Invalid API base URL: {0}")]
    InvalidApiBase(String),
    #[error("API key not found. Set OPENAI_API_KEY environment variable")]
    MissingApiKey,
}

// ============================================================================
// Loading
// ============================================================================

impl AppConfig {
    /// 기본 설정 파일 경로 (~/.csv-chat/config.toml)
    pub fn default_path() -> PathBuf {
        get_data_dir().join("config.toml")
    }

    /// 설정 로드
    ///
    /// `path`가 None이면 기본 위치를 사용하며, 파일이 없으면 기본값으로 시작합니다.
    /// 명시적으로 지정한 파일이 없으면 에러입니다.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = Self::default_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env();
        config.validate().context("Configuration validation failed")?;

        tracing::debug!(
            "Loaded config (uploads: {:?}, top_k: {})",
            config.directories.uploaded_files_directory,
            config.vector.top_k
        );
        Ok(config)
    }

    /// TOML 파일에서 읽기
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// TOML 문자열 파싱
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// 환경변수 오버라이드 적용
    fn apply_env(&mut self) {
        self.api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());

        if let Ok(base) = std::env::var("OPENAI_API_BASE") {
            if !base.is_empty() {
                self.llm.api_base = base;
            }
        }
        if let Ok(model) = std::env::var("CSV_CHAT_CHAT_MODEL") {
            if !model.is_empty() {
                self.llm.chat_model = model;
            }
        }
        if let Ok(model) = std::env::var("CSV_CHAT_EMBEDDING_MODEL") {
            if !model.is_empty() {
                self.llm.embedding_model_name = model;
            }
        }
        if let Ok(top_k) = std::env::var("CSV_CHAT_TOP_K") {
            match top_k.parse() {
                Ok(k) => self.vector.top_k = k,
                Err(_) => tracing::warn!("Ignoring invalid CSV_CHAT_TOP_K: {}", top_k),
            }
        }
    }

    /// 설정값 검증
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.vector.top_k) {
            return Err(ConfigError::InvalidTopK(self.vector.top_k));
        }
        if self.vector.dimension == 0 {
            return Err(ConfigError::InvalidDimension(self.vector.dimension));
        }
        if self.llm.chat_model.trim().is_empty() {
            return Err(ConfigError::EmptyModel("chat_model"));
        }
        if self.llm.embedding_model_name.trim().is_empty() {
            return Err(ConfigError::EmptyModel("embedding_model_name"));
        }
        Url::parse(&self.llm.api_base)
            .map_err(|_| ConfigError::InvalidApiBase(self.llm.api_base.clone()))?;
        Ok(())
    }

    /// API 키 반환 (없으면 에러)
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }

    /// API 키 존재 여부
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// LanceDB 벡터 인덱스 경로
    pub fn vector_index_path(&self) -> PathBuf {
        self.directories.data_dir.join("vectors.lance")
    }

    /// 같은 설정을 데이터 디렉토리만 바꿔서 생성 (테스트/임시 실행용)
    pub fn with_data_dir(mut self, data_dir: &Path) -> Self {
        self.directories.data_dir = data_dir.to_path_buf();
        self.directories.uploaded_files_directory = data_dir.join("uploads");
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
