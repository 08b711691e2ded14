use crate::core::filter::{FilterEngine, FilterSpec};
use crate::core::import::{BulkImportValidator, DEFAULT_HEADER_ROWS, DEFAULT_PREVIEW_LIMIT};
use crate::core::pivot::{AxisOrder, PivotAggregator};
use crate::core::report::PivotReport;
use crate::domain::model::{AllowedSets, CommitOutcome, ImportSummary, Record};
use crate::domain::ports::{MasterDataSource, PersistSink, RecordSource};
use crate::domain::schema::EntityKind;
use crate::utils::error::{OpsError, Result};
use crate::utils::monitor::SystemMonitor;

/// 上游讀取失敗一律轉成 UpstreamFetchError，已是該類別者原樣傳遞
fn as_upstream(source_name: &str, error: OpsError) -> OpsError {
    match error {
        OpsError::UpstreamFetchError { .. } => error,
        other => OpsError::upstream(source_name, other.to_string()),
    }
}

/// 儀表板服務：組合資料來源、主資料與匯入驗證
pub struct DashboardService<Src: RecordSource, M: MasterDataSource> {
    source: Src,
    master_data: M,
    preview_limit: usize,
    header_rows: usize,
    monitor: SystemMonitor,
}

impl<Src: RecordSource, M: MasterDataSource> DashboardService<Src, M> {
    pub fn new(source: Src, master_data: M) -> Self {
        Self {
            source,
            master_data,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            header_rows: DEFAULT_HEADER_ROWS,
            monitor: SystemMonitor::new(false),
        }
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = SystemMonitor::new(enabled);
        if enabled {
            tracing::info!("🔍 System monitoring enabled");
        }
        self
    }

    pub fn with_import_settings(mut self, preview_limit: usize, header_rows: usize) -> Self {
        self.preview_limit = preview_limit;
        self.header_rows = header_rows;
        self
    }

    fn validator(&self, entity: EntityKind) -> BulkImportValidator {
        BulkImportValidator::new(entity)
            .with_preview_limit(self.preview_limit)
            .with_header_rows(self.header_rows)
    }

    async fn fetch_records(&self, entity: EntityKind) -> Result<Vec<Record>> {
        tracing::debug!("Fetching {} records", entity);
        let records = self
            .source
            .fetch_records(entity)
            .await
            .map_err(|e| as_upstream(entity.as_str(), e))?;
        self.monitor.log_phase("Fetch", records.len());
        Ok(records)
    }

    async fn fetch_allowed_sets(&self) -> Result<AllowedSets> {
        let allowed = self
            .master_data
            .fetch_allowed_sets()
            .await
            .map_err(|e| as_upstream("master-data", e))?;
        tracing::debug!("Loaded {} allowed sets", allowed.len());
        Ok(allowed)
    }

    /// 讀取 → 篩選 → 樞紐計數
    pub async fn pivot_report(
        &self,
        entity: EntityKind,
        filter: &FilterSpec,
        row_field: &str,
        column_field: &str,
        order: AxisOrder,
    ) -> Result<PivotReport> {
        tracing::info!(
            "📈 Building {} pivot: {} by {}",
            entity,
            row_field,
            column_field
        );

        let records = self.fetch_records(entity).await?;
        let filtered = FilterEngine::apply(records, filter);
        self.monitor.log_phase("Filter", filtered.len());

        let pivot = PivotAggregator::new()
            .with_row_order(order)
            .with_column_order(order)
            .build_by_fields_with_date(
                &filtered,
                row_field,
                column_field,
                entity.date_field().map(|f| f.key),
            );
        self.monitor.log_phase("Pivot", pivot.grand_total as usize);
        self.monitor.log_final_stats();

        let row_label = entity.label_for(row_field);
        let column_label = entity.label_for(column_field);
        Ok(PivotReport {
            title: format!("{} by {}", row_label, column_label),
            row_label,
            column_label,
            pivot,
        })
    }

    pub async fn preview_import(&self, entity: EntityKind, rows: &[Record]) -> Result<ImportSummary> {
        let allowed = self.fetch_allowed_sets().await?;
        let summary = self.validator(entity).preview(rows, &allowed);
        tracing::info!(
            "🔎 {} preview: {} rows, {} valid, {} with errors",
            entity,
            summary.total_rows,
            summary.valid_rows,
            summary.error_rows
        );
        self.monitor.log_phase("Preview", summary.total_rows);
        Ok(summary)
    }

    /// 主資料在提交時重新讀取一次，不沿用預覽時的結果
    pub async fn commit_import<S>(&self, entity: EntityKind, rows: &[Record], sink: &S) -> Result<CommitOutcome>
    where
        S: PersistSink + ?Sized,
    {
        let allowed = self.fetch_allowed_sets().await?;
        let outcome = self.validator(entity).commit(rows, &allowed, sink).await;
        self.monitor.log_phase("Commit", rows.len());
        self.monitor.log_final_stats();
        Ok(outcome)
    }
}
