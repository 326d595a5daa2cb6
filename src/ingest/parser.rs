//! CSV 파싱 및 컬럼 타입 추론
//!
//! 헤더 행이 필수입니다. 컬럼별로 비어있지 않은 값이 모두 정수면 INTEGER,
//! 모두 숫자면 REAL, 그 외에는 TEXT로 추론합니다. 빈 셀은 NULL입니다.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::types::Value;

use crate::knowledge::{flatten_metadata, Column, ColumnType, TableData};

/// CSV 파일 읽기
pub fn read_csv(path: &Path) -> Result<TableData> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
    parse_csv(file).with_context(|| format!("Failed to parse CSV file: {}", path.display()))
}

/// CSV 파싱 (헤더 필수)
pub fn parse_csv<R: Read>(reader: R) -> Result<TableData> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        anyhow::bail!("CSV file has no header row");
    }
    let names = unique_column_names(headers.iter());

    let mut raw: Vec<Vec<String>> = Vec::new();
    for (i, record) in reader.records().enumerate() {
        // 헤더가 1행이므로 데이터는 2행부터
        let record = record.with_context(|| format!("Invalid CSV record at line {}", i + 2))?;
        raw.push(record.iter().map(str::to_string).collect());
    }

    let columns: Vec<Column> = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| Column {
            name,
            kind: infer_column_type(raw.iter().filter_map(|row| row.get(i).map(String::as_str))),
        })
        .collect();

    let rows = raw
        .iter()
        .map(|row| {
            columns
                .iter()
                .enumerate()
                .map(|(i, col)| {
                    convert_cell(row.get(i).map(String::as_str).unwrap_or(""), col.kind)
                })
                .collect()
        })
        .collect();

    Ok(TableData { columns, rows })
}

/// 행을 임베딩용 텍스트로 변환 (`col: value, col: value`)
pub fn row_text(table: &TableData, index: usize) -> Option<String> {
    table.record(index).map(|record| flatten_metadata(&record))
}

/// 컬럼 이름 정리: 빈 이름은 `Unnamed: i`, 중복은 `.1`, `.2` 접미사
fn unique_column_names<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for (i, header) in headers.enumerate() {
        let base = match header.trim() {
            "" => format!("Unnamed: {}", i),
            h => h.to_string(),
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while !seen.insert(name.to_lowercase()) {
            name = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        names.push(name);
    }

    names
}

/// 컬럼 값들로 타입 추론
fn infer_column_type<'a>(values: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut kind = None;

    for value in values.map(str::trim).filter(|v| !v.is_empty()) {
        let cell = if value.parse::<i64>().is_ok() {
            ColumnType::Integer
        } else if value.bytes().any(|b| b.is_ascii_digit()) && value.parse::<f64>().is_ok() {
            ColumnType::Real
        } else {
            return ColumnType::Text;
        };

        kind = match (kind, cell) {
            (Some(ColumnType::Real), _) | (_, ColumnType::Real) => Some(ColumnType::Real),
            _ => Some(ColumnType::Integer),
        };
    }

    kind.unwrap_or(ColumnType::Text)
}

fn convert_cell(raw: &str, kind: ColumnType) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }

    match kind {
        ColumnType::Integer => trimmed
            .parse()
            .map(Value::Integer)
            .unwrap_or_else(|_| Value::Text(raw.to_string())),
        ColumnType::Real => trimmed
            .parse()
            .map(Value::Real)
            .unwrap_or_else(|_| Value::Text(raw.to_string())),
        ColumnType::Text => Value::Text(raw.to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================
