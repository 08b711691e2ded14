use crate::core::issue::row_message;
use crate::core::row::RowNormalizer;
use crate::domain::model::{
    AllowedSets, CommitOutcome, CommitReport, ImportSummary, Record, RowFailure, ValidationOutcome,
};
use crate::domain::ports::PersistSink;
use crate::domain::schema::EntityKind;

pub const DEFAULT_PREVIEW_LIMIT: usize = 10;
pub const DEFAULT_HEADER_ROWS: usize = 1;

/// 批次匯入驗證：預覽 (不寫入) 與提交 (零錯誤才寫入)
#[derive(Debug, Clone)]
pub struct BulkImportValidator {
    normalizer: RowNormalizer,
    preview_limit: usize,
    header_rows: usize,
}

impl BulkImportValidator {
    pub fn new(entity: EntityKind) -> Self {
        Self {
            normalizer: RowNormalizer::new(entity),
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            header_rows: DEFAULT_HEADER_ROWS,
        }
    }

    pub fn with_preview_limit(mut self, preview_limit: usize) -> Self {
        self.preview_limit = preview_limit;
        self
    }

    pub fn with_header_rows(mut self, header_rows: usize) -> Self {
        self.header_rows = header_rows;
        self
    }

    pub fn entity(&self) -> EntityKind {
        self.normalizer.entity()
    }

    /// 試算表列號：資料從 1 開始，再加上標題列數
    fn row_number(&self, index: usize) -> usize {
        index + 1 + self.header_rows
    }

    fn validate_rows(&self, rows: &[Record], allowed: &AllowedSets) -> Vec<ValidationOutcome> {
        rows.iter()
            .enumerate()
            .filter_map(|(index, raw)| self.normalizer.normalize(self.row_number(index), raw, allowed))
            .collect()
    }

    pub fn preview(&self, rows: &[Record], allowed: &AllowedSets) -> ImportSummary {
        let outcomes = self.validate_rows(rows, allowed);
        summarize(outcomes, self.preview_limit)
    }

    /// 驗證通過後逐列寫入。
    ///
    /// 只要有任何一列驗證失敗就不寫入任何資料，回傳完整錯誤清單；
    /// 通過驗證後每列獨立寫入，單列失敗只記錄並計數，不中斷、不重試。
    pub async fn commit<S>(&self, rows: &[Record], allowed: &AllowedSets, sink: &S) -> CommitOutcome
    where
        S: PersistSink + ?Sized,
    {
        let outcomes = self.validate_rows(rows, allowed);
        if outcomes.iter().any(|o| !o.is_valid()) {
            let summary = summarize(outcomes, self.preview_limit);
            tracing::warn!(
                "❌ Import of {} rejected: {} of {} rows have errors",
                self.entity(),
                summary.error_rows,
                summary.total_rows
            );
            return CommitOutcome::Rejected(summary);
        }

        let entity = self.entity();
        let mut report = CommitReport::default();
        tracing::info!("💾 Persisting {} {} rows", outcomes.len(), entity);

        for outcome in &outcomes {
            match sink.persist_record(entity, &outcome.normalized_fields).await {
                Ok(()) => report.success_count += 1,
                Err(e) => {
                    tracing::warn!("⚠️ Row {} of {} import failed to persist: {}", outcome.row_number, entity, e);
                    report.fail_count += 1;
                    report.failures.push(RowFailure {
                        row_number: outcome.row_number,
                        message: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "✅ {} import finished: {} succeeded, {} failed",
            entity,
            report.success_count,
            report.fail_count
        );
        CommitOutcome::Committed(report)
    }
}

fn summarize(outcomes: Vec<ValidationOutcome>, preview_limit: usize) -> ImportSummary {
    let total_rows = outcomes.len();
    let valid_rows = outcomes.iter().filter(|o| o.is_valid()).count();
    let error_rows = total_rows - valid_rows;

    let errors = outcomes
        .iter()
        .flat_map(|o| o.errors.iter().map(move |e| row_message(o.row_number, e)))
        .collect();
    let warnings = outcomes
        .iter()
        .flat_map(|o| o.warnings.iter().map(move |w| row_message(o.row_number, w)))
        .collect();

    ImportSummary {
        total_rows,
        valid_rows,
        error_rows,
        errors,
        warnings,
        preview_rows: outcomes.into_iter().take(preview_limit).collect(),
        has_errors: error_rows > 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::{OpsError, Result};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockSink {
        persisted: Arc<Mutex<Vec<Record>>>,
        fail_on_sku: Option<String>,
    }

    #[async_trait]
    impl PersistSink for MockSink {
        async fn persist_record(&self, _entity: EntityKind, record: &Record) -> Result<()> {
            if self.fail_on_sku.is_some() && record.text("sku") == self.fail_on_sku {
                return Err(OpsError::persistence("sheet quota exceeded"));
            }
            self.persisted.lock().await.push(record.clone());
            Ok(())
        }
    }

    fn stock_row(sku: &str, name: &str) -> Record {
        Record::from_pairs([("sku", json!(sku)), ("product_name", json!(name))])
    }

    fn empty_row() -> Record {
        Record::from_pairs([("sku", json!("")), ("product_name", json!(""))])
    }

    #[test]
    fn test_preview_counts_and_row_numbers() {
        let rows = vec![
            stock_row("A-1", "Kabel"),
            empty_row(),
            stock_row("", "Charger"),
            stock_row("A-3", "Adaptor"),
        ];
        let summary = BulkImportValidator::new(EntityKind::Stock).preview(&rows, &AllowedSets::new());

        assert_eq!(summary.total_rows, 3);
        assert_eq!(summary.valid_rows, 2);
        assert_eq!(summary.error_rows, 1);
        assert!(summary.has_errors);
        assert_eq!(summary.errors, vec!["Row 4: SKU is required"]);
        let numbers: Vec<usize> = summary.preview_rows.iter().map(|o| o.row_number).collect();
        assert_eq!(numbers, vec![2, 4, 5]);
    }

    #[test]
    fn test_preview_limits_rows_but_counts_all() {
        let rows: Vec<Record> = (0..25).map(|i| stock_row(&format!("S-{i}"), "Item")).collect();
        let summary = BulkImportValidator::new(EntityKind::Stock)
            .with_preview_limit(10)
            .preview(&rows, &AllowedSets::new());

        assert_eq!(summary.total_rows, 25);
        assert_eq!(summary.valid_rows, 25);
        assert_eq!(summary.preview_rows.len(), 10);
        assert!(!summary.has_errors);
    }

    #[test]
    fn test_all_empty_upload() {
        let summary = BulkImportValidator::new(EntityKind::Stock)
            .preview(&[empty_row(), empty_row()], &AllowedSets::new());
        assert_eq!(summary.total_rows, 0);
        assert!(summary.preview_rows.is_empty());
        assert!(!summary.has_errors);
    }

    #[tokio::test]
    async fn test_commit_is_gated_on_zero_errors() {
        let rows = vec![stock_row("A-1", "Kabel"), stock_row("A-2", "")];
        let validator = BulkImportValidator::new(EntityKind::Stock);
        let sink = MockSink::default();

        let preview = validator.preview(&rows, &AllowedSets::new());
        let outcome = validator.commit(&rows, &AllowedSets::new(), &sink).await;

        assert!(matches!(outcome, CommitOutcome::Rejected(_)));
        assert_eq!(outcome.errors(), preview.errors.as_slice());
        assert!(sink.persisted.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_commit_continues_after_persist_failure() {
        let rows = vec![
            stock_row("A-1", "Kabel"),
            empty_row(),
            stock_row("A-2", "Charger"),
            stock_row("A-3", "Adaptor"),
        ];
        let sink = MockSink {
            fail_on_sku: Some("A-2".to_string()),
            ..Default::default()
        };

        let outcome = BulkImportValidator::new(EntityKind::Stock)
            .commit(&rows, &AllowedSets::new(), &sink)
            .await;

        let CommitOutcome::Committed(report) = outcome else {
            panic!("expected committed outcome");
        };
        assert_eq!(report.success_count, 2);
        assert_eq!(report.fail_count, 1);
        assert_eq!(report.failures[0].row_number, 4);
        assert!(report.failures[0].message.contains("quota"));

        let persisted = sink.persisted.lock().await;
        let skus: Vec<String> = persisted.iter().filter_map(|r| r.text("sku")).collect();
        assert_eq!(skus, vec!["A-1", "A-3"]);
    }
}
