//! CLI 모듈
//!
//! csv-chat CLI 명령어 정의 및 구현
//!
//! 업로드(ingest)와 질문(ask / chat)은 파일 이름에서 파생된 데이터셋 식별자로 연결됩니다.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::app::CsvChat;
use crate::config::{AppConfig, API_KEY_ENV};
use crate::dataset::DatasetId;
use crate::knowledge::{LanceVectorStore, SqliteRowStore, VectorStore};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "csv-chat")]
#[command(version, about = "CSV 파일에 자연어로 질문하기", long_about = None)]
pub struct Cli {
    /// 설정 파일 경로 (기본: ~/.csv-chat/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// LanceDB 대신 프로세스 내 벡터 인덱스 사용
    #[arg(long, global = true)]
    pub memory_index: bool,

    /// 로그 상세도 (-v: info, -vv: debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// CSV 파일을 행 저장소와 벡터 인덱스에 적재
    Ingest {
        /// CSV 파일 경로
        file: PathBuf,
    },

    /// 데이터셋에 한 번 질문
    Ask {
        /// 질문
        question: String,

        /// 데이터셋 식별자
        #[arg(short, long, conflicts_with = "file")]
        dataset: Option<String>,

        /// 업로드한 CSV 파일 (파일 이름으로 데이터셋 결정)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// 대화형 질의 (빈 줄 또는 exit로 종료)
    Chat {
        /// 먼저 적재할 CSV 파일
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// 이미 적재된 데이터셋 식별자
        #[arg(short, long, conflicts_with = "file")]
        dataset: Option<String>,
    },

    /// 적재된 데이터셋 목록
    List,

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest { file } => cmd_ingest(&config, cli.memory_index, &file).await,
        Commands::Ask {
            question,
            dataset,
            file,
        } => {
            let dataset = resolve_dataset(dataset, file.as_deref())?;
            cmd_ask(&config, cli.memory_index, &question, &dataset).await
        }
        Commands::Chat { file, dataset } => {
            cmd_chat(&config, cli.memory_index, file.as_deref(), dataset).await
        }
        Commands::List => cmd_list(&config),
        Commands::Status => cmd_status(&config).await,
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 적재 명령어 (ingest)
async fn cmd_ingest(config: &AppConfig, memory_index: bool, file: &Path) -> Result<()> {
    let app = open_app(config, memory_index).await?;

    println!("[*] 적재 중: {}", file.display());
    let report = app.ingest(file).await.context("CSV 적재 실패")?;

    println!("[OK] {}", report.status_message());
    println!(
        "     데이터셋: {} | 행: {} | 벡터: {}",
        report.dataset, report.rows_stored, report.vectors_added
    );
    println!(
        "     적재 시각: {}",
        report.ingested_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if memory_index {
        println!("[!] --memory-index: 벡터는 이 프로세스가 끝나면 사라집니다.");
    }

    Ok(())
}

/// 질문 명령어 (ask)
async fn cmd_ask(
    config: &AppConfig,
    memory_index: bool,
    question: &str,
    dataset: &str,
) -> Result<()> {
    let app = open_app(config, memory_index).await?;

    println!("[*] 질문 ({}): {}", dataset, truncate_text(question, 80));
    println!();
    println!("{}", app.answer(question, dataset).await);

    Ok(())
}

/// 대화형 명령어 (chat)
async fn cmd_chat(
    config: &AppConfig,
    memory_index: bool,
    file: Option<&Path>,
    dataset: Option<String>,
) -> Result<()> {
    let app = open_app(config, memory_index).await?;

    let dataset = match (file, dataset) {
        (Some(file), _) => {
            println!("[*] 적재 중: {}", file.display());
            let report = app.ingest(file).await.context("CSV 적재 실패")?;
            println!("[OK] {}", report.status_message());
            report.dataset.to_string()
        }
        (None, Some(dataset)) => dataset,
        (None, None) => bail!("--file 또는 --dataset 중 하나를 지정해야 합니다"),
    };

    println!("[*] 데이터셋 '{}'에 질문하세요. (exit 또는 빈 줄로 종료)", dataset);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = lines.next_line().await.context("입력 읽기 실패")? else {
            break;
        };
        let question = line.trim();
        if question.is_empty()
            || question.eq_ignore_ascii_case("exit")
            || question.eq_ignore_ascii_case("quit")
        {
            break;
        }

        println!("{}", app.answer(question, &dataset).await);
        println!();
    }

    Ok(())
}

/// 목록 명령어 (list)
fn cmd_list(config: &AppConfig) -> Result<()> {
    let store = SqliteRowStore::open(&config.directories.uploaded_files_directory)
        .context("행 저장소 열기 실패")?;
    let datasets = store.list_datasets().context("데이터셋 목록 조회 실패")?;

    if datasets.is_empty() {
        println!("[!] 적재된 데이터셋이 없습니다.");
        return Ok(());
    }

    println!("[OK] 적재된 데이터셋 ({} 개):\n", datasets.len());

    for summary in datasets {
        let modified = summary
            .modified_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<24} {:>8} rows   {}",
            truncate_text(summary.dataset.as_str(), 24),
            summary.row_count,
            modified
        );
    }

    Ok(())
}

/// 상태 명령어 (status)
async fn cmd_status(config: &AppConfig) -> Result<()> {
    println!("csv-chat v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("[*] 데이터 디렉토리: {}", config.directories.data_dir.display());
    println!(
        "[*] 업로드 디렉토리: {}",
        config.directories.uploaded_files_directory.display()
    );
    println!(
        "[*] 모델: {} / {}",
        config.llm.chat_model, config.llm.embedding_model_name
    );
    println!(
        "[*] 검색: top_k {}, 데이터셋 범위 제한 {}",
        config.vector.top_k,
        if config.vector.scope_to_dataset { "on" } else { "off" }
    );

    if config.has_api_key() {
        println!("[OK] API 키: 설정됨");
    } else {
        println!("[!] API 키: 미설정");
        println!("    설정: export {}=your-key", API_KEY_ENV);
    }

    match SqliteRowStore::open(&config.directories.uploaded_files_directory)
        .and_then(|store| store.list_datasets())
    {
        Ok(datasets) => {
            let rows: usize = datasets.iter().map(|d| d.row_count).sum();
            println!("[OK] 데이터셋: {} 개 ({} 행)", datasets.len(), rows);
        }
        Err(e) => println!("[!] 행 저장소 조회 실패: {}", e),
    }

    match LanceVectorStore::open(&config.vector_index_path(), config.vector.dimension).await {
        Ok(index) => match index.count().await {
            Ok(count) => println!("[OK] 벡터 인덱스: {} 레코드", count),
            Err(e) => tracing::debug!("벡터 수 조회 실패: {}", e),
        },
        Err(e) => println!("[!] 벡터 인덱스 열기 실패: {}", e),
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// API 키 확인 후 애플리케이션 구성
async fn open_app(config: &AppConfig, memory_index: bool) -> Result<CsvChat> {
    if !config.has_api_key() {
        bail!(
            "API 키가 설정되지 않았습니다.\n\n\
             설정 방법:\n  \
             export {}=your-api-key",
            API_KEY_ENV
        );
    }

    CsvChat::from_config(config, memory_index)
        .await
        .context("애플리케이션 초기화 실패")
}

/// `--dataset` 또는 `--file`로 데이터셋 식별자 결정
fn resolve_dataset(dataset: Option<String>, file: Option<&Path>) -> Result<String> {
    match (dataset, file) {
        (Some(dataset), _) => Ok(dataset),
        (None, Some(file)) => Ok(DatasetId::from_path(file)?.to_string()),
        (None, None) => bail!("--dataset 또는 --file 중 하나를 지정해야 합니다"),
    }
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

// ============================================================================
// Tests
// ============================================================================
