//! Article source tables.
//!
//! Datasets are CSV exports with one article per row. Only `translated_text`
//! is needed for highlighting; every other column is optional and reads as
//! empty when absent. Dataframe `nan` placeholders are cleaned to empty.

use std::path::Path;

use framemark_core::{
    defaults, is_missing_cell, Article, ArticleSource, Error, FrameSuggestion, Result, TaskConfig,
};
use tracing::info;

/// Per-user CSV datasets resolved through [`TaskConfig::dataset_for`].
#[derive(Debug, Clone, Default)]
pub struct CsvDatasets {
    config: TaskConfig,
}

impl CsvDatasets {
    pub fn from_config(config: &TaskConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn path_for(&self, user_id: &str) -> Option<&Path> {
        self.config.dataset_for(user_id)
    }
}

impl ArticleSource for CsvDatasets {
    fn articles(&self, user_id: &str) -> Result<Vec<Article>> {
        let path = self
            .path_for(user_id)
            .ok_or_else(|| Error::NotFound(format!("no dataset assigned to user {}", user_id)))?;
        load_articles(path)
    }
}

fn clean(value: Option<&str>) -> String {
    match value {
        Some(v) if !is_missing_cell(v) => v.trim().to_string(),
        _ => String::new(),
    }
}

/// Load every article of a dataset, indexed by row position.
pub fn load_articles(path: &Path) -> Result<Vec<Article>> {
    if !path.exists() {
        return Err(Error::NotFound(format!("dataset {}", path.display())));
    }
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| Error::Csv(e.to_string()))?;
    let headers = reader
        .headers()
        .map_err(|e| Error::Csv(e.to_string()))?
        .clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);

    let uri = position("uri");
    let original = position("original_text");
    let translated = position("translated_text");
    let combined = position("combined_text");
    let rationale = position("llm_rationale");
    let evidence = position("llm_evidence");
    let frame_columns: Vec<(usize, [Option<usize>; 4])> = (1..=defaults::MAX_FRAMES)
        .map(|i| {
            (
                i,
                [
                    position(&format!("frame_{}_name", i)),
                    position(&format!("frame_{}_evidence", i)),
                    position(&format!("frame_{}_rationale", i)),
                    position(&format!("frame_{}_confidence", i)),
                ],
            )
        })
        .filter(|(_, cols)| cols.iter().any(Option::is_some))
        .collect();

    let mut articles = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let row = result.map_err(|e| Error::Csv(format!("row {}: {}", index + 1, e)))?;
        let cell = |col: Option<usize>| clean(col.and_then(|c| row.get(c)));

        let frames = frame_columns
            .iter()
            .map(|(number, [name_col, evidence_col, rationale_col, confidence_col])| {
                FrameSuggestion {
                    number: *number,
                    name: cell(*name_col),
                    evidence: cell(*evidence_col),
                    rationale: cell(*rationale_col),
                    confidence: cell(*confidence_col),
                }
            })
            .collect();

        articles.push(Article {
            index,
            uri: cell(uri),
            original_text: cell(original),
            translated_text: cell(translated),
            combined_text: cell(combined),
            llm_rationale: cell(rationale),
            llm_evidence: cell(evidence),
            frames,
        });
    }

    info!(path = %path.display(), article_count = articles.len(), "Dataset loaded");
    Ok(articles)
}
