//! Parsers for the tab-separated corpus files.
//!
//! Blank lines are ignored. Malformed lines are skipped with a warning that
//! names the file and line number; they never fail the parse.

use std::path::Path;

use tokio::fs;
use tracing::warn;

use crate::error::{CorpusError, Result};
use crate::records::{Query, RelevanceJudgment};

/// Records parsed from one file, plus how many lines were skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLines<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

impl<T> Default for ParsedLines<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
        }
    }
}

/// A document line before embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    pub doc_id: String,
    pub text: String,
}

/// Read a corpus file, failing with [`CorpusError::MissingFile`] if absent.
pub async fn read_corpus_file(path: &Path) -> Result<String> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Err(CorpusError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    Ok(fs::read_to_string(path).await?)
}

/// Parse `doc_id<TAB>text` lines.
///
/// The line is split on its first tab before either field is trimmed, so a
/// line whose text is only whitespace is an empty document rather than a
/// missing tab. Lines without a tab, or whose text is blank, are skipped.
pub fn parse_documents(content: &str, source: &str) -> ParsedLines<RawDocument> {
    let mut parsed = ParsedLines::default();

    for (line_num, line) in non_blank_lines(content) {
        let Some((doc_id, text)) = split_tab(line) else {
            warn!("Skipping malformed line {line_num} in {source}");
            parsed.skipped += 1;
            continue;
        };

        if text.is_empty() {
            warn!("Skipping empty document {doc_id} on line {line_num} in {source}");
            parsed.skipped += 1;
            continue;
        }

        parsed.records.push(RawDocument {
            doc_id: doc_id.to_string(),
            text: text.to_string(),
        });
    }

    parsed
}

/// Parse `query_id<TAB>query_text` lines.
pub fn parse_queries(content: &str, source: &str) -> ParsedLines<Query> {
    let mut parsed = ParsedLines::default();

    for (line_num, line) in non_blank_lines(content) {
        match split_tab(line) {
            Some((query_id, query_text)) => parsed.records.push(Query {
                query_id: query_id.to_string(),
                query_text: query_text.to_string(),
            }),
            None => {
                warn!("Skipping malformed line {line_num} in {source}");
                parsed.skipped += 1;
            }
        }
    }

    parsed
}

/// Parse TREC-style qrel lines: `query_id _ doc_id relevance_score`.
///
/// Fields are whitespace-delimited; the second one is a placeholder and is
/// ignored. Lines with fewer than four fields or a non-integer score are
/// skipped.
pub fn parse_judgments(content: &str, source: &str) -> ParsedLines<RelevanceJudgment> {
    let mut parsed = ParsedLines::default();

    for (line_num, line) in non_blank_lines(content) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [query_id, _, doc_id, score, ..] = fields.as_slice() else {
            warn!("Skipping malformed line {line_num} in {source}");
            parsed.skipped += 1;
            continue;
        };

        let Ok(relevance_score) = score.parse::<i32>() else {
            warn!("Skipping line {line_num} in {source}: invalid relevance score {score:?}");
            parsed.skipped += 1;
            continue;
        };

        parsed.records.push(RelevanceJudgment {
            query_id: (*query_id).to_string(),
            doc_id: (*doc_id).to_string(),
            relevance_score,
        });
    }

    parsed
}

/// Non-blank lines with 1-based line numbers, untrimmed.
fn non_blank_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| !line.trim().is_empty())
}

/// Split on the first tab, then trim both fields.
fn split_tab(line: &str) -> Option<(&str, &str)> {
    line.split_once('\t')
        .map(|(id, text)| (id.trim(), text.trim()))
}
