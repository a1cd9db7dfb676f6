//! 学習用テーブルの読み書きと、生記事レコードからのデータセット組み立て。
use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::classification::{Label, feature_text};

pub const DEFAULT_SOURCE: &str = "politifact";
pub const DEFAULT_MIN_WORDS: usize = 50;

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("compile whitespace pattern"));

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset not found at {}", path.display())]
    Missing { path: PathBuf },
    #[error("failed to access dataset at {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed record in {} at line {line}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// テーブルの1行。`news_id, label, title, text, source`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsRecord {
    pub news_id: String,
    pub label: Label,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub source: String,
}

impl NewsRecord {
    /// 分類器に渡す `title [SEP] text`。
    #[must_use]
    pub fn feature_text(&self) -> String {
        feature_text(self.title.as_deref(), self.text.as_deref())
    }
}

/// JSON Lines もしくは JSON 配列形式のテーブルを読み込む。
///
/// # Errors
/// ファイルが存在しない場合は [`DatasetError::Missing`]、解析に失敗した場合は
/// 該当行を含む [`DatasetError::Parse`] を返す。
pub fn load_table(path: &Path) -> Result<Vec<NewsRecord>, DatasetError> {
    if !path.exists() {
        return Err(DatasetError::Missing {
            path: path.to_path_buf(),
        });
    }
    let raw = fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let records: Vec<NewsRecord> = if raw.trim_start().starts_with('[') {
        serde_json::from_str(&raw).map_err(|source| DatasetError::Parse {
            path: path.to_path_buf(),
            line: source.line(),
            source,
        })?
    } else {
        let mut records = Vec::new();
        for (idx, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(line).map_err(|source| DatasetError::Parse {
                path: path.to_path_buf(),
                line: idx + 1,
                source,
            })?;
            records.push(record);
        }
        records
    };

    info!(path = %path.display(), rows = records.len(), "dataset loaded");
    Ok(records)
}

/// テーブルを JSON Lines として書き出す。
///
/// # Errors
/// 書き込みに失敗した場合は [`DatasetError::Io`] を返す。
pub fn write_table(path: &Path, records: &[NewsRecord]) -> Result<(), DatasetError> {
    let io_error = |source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let file = fs::File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    for record in records {
        let line = serde_json::to_string(record).map_err(|source| DatasetError::Parse {
            path: path.to_path_buf(),
            line: 0,
            source,
        })?;
        writeln!(writer, "{line}").map_err(io_error)?;
    }
    writer.flush().map_err(io_error)?;
    Ok(())
}

/// NBSP を空白に置き換え、連続空白を1つにまとめて前後を削る。
#[must_use]
pub fn basic_clean(text: &str) -> String {
    let replaced = text.replace('\u{a0}', " ");
    WHITESPACE_RE.replace_all(&replaced, " ").trim().to_string()
}

/// 収集済みの生記事レコード `{id, label, url, title, text}`。
#[derive(Debug, Deserialize)]
struct RawArticle {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    label: Option<serde_json::Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

fn raw_id(value: Option<serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(id)) => id,
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// ラベル欄を解釈する。欠損は 0、数字だけの文字列は整数として扱う。
fn raw_label(value: Option<&serde_json::Value>) -> Option<Label> {
    let code = match value {
        Some(serde_json::Value::Null) | None => 0,
        Some(serde_json::Value::Number(number)) => number.as_i64()?,
        Some(serde_json::Value::String(raw)) => raw.trim().parse::<i64>().ok()?,
        Some(_) => return None,
    };
    u8::try_from(code).ok().and_then(|code| Label::try_from(code).ok())
}

/// 組み立て結果の内訳。
#[derive(Debug, Default)]
pub struct AssemblyReport {
    pub records: Vec<NewsRecord>,
    pub unreadable: usize,
    pub too_short: usize,
    pub invalid_label: usize,
    pub duplicates: usize,
}

/// ディレクトリ内の `*.json` をファイル名順に読み、テーブルを組み立てる。
///
/// 読めないファイル・本文が `min_words` 語未満の記事・不正なラベルは読み飛ばし、
/// 本文が重複する記事は最初の1件のみ残す。
///
/// # Errors
/// ディレクトリ自体が読めない場合は [`DatasetError`] を返す。
pub fn assemble(raw_dir: &Path, min_words: usize) -> Result<AssemblyReport, DatasetError> {
    if !raw_dir.exists() {
        return Err(DatasetError::Missing {
            path: raw_dir.to_path_buf(),
        });
    }
    let entries = fs::read_dir(raw_dir).map_err(|source| DatasetError::Io {
        path: raw_dir.to_path_buf(),
        source,
    })?;
    let mut files = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect::<Vec<_>>();
    files.sort();

    let mut report = AssemblyReport::default();
    let mut seen_texts: HashSet<String> = HashSet::new();

    for file in files {
        let parsed = fs::read_to_string(&file)
            .ok()
            .and_then(|raw| serde_json::from_str::<RawArticle>(&raw).ok());
        let Some(article) = parsed else {
            debug!(path = %file.display(), "skipping unreadable article record");
            report.unreadable += 1;
            continue;
        };

        let text = basic_clean(article.text.as_deref().unwrap_or_default());
        let title = basic_clean(article.title.as_deref().unwrap_or_default());
        if text.split_whitespace().count() < min_words {
            report.too_short += 1;
            continue;
        }
        let Some(label) = raw_label(article.label.as_ref()) else {
            warn!(path = %file.display(), "skipping article with invalid label");
            report.invalid_label += 1;
            continue;
        };
        if !seen_texts.insert(text.clone()) {
            report.duplicates += 1;
            continue;
        }

        report.records.push(NewsRecord {
            news_id: raw_id(article.id),
            label,
            title: Some(title),
            text: Some(text),
            source: DEFAULT_SOURCE.to_string(),
        });
    }

    info!(
        rows = report.records.len(),
        unreadable = report.unreadable,
        too_short = report.too_short,
        invalid_label = report.invalid_label,
        duplicates = report.duplicates,
        "dataset assembled"
    );
    Ok(report)
}
