use crate::domain::model::{AllowedSets, Record};
use crate::domain::schema::EntityKind;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 讀取實體資料列 (試算表、HTTP 後端或本機檔案)
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_records(&self, entity: EntityKind) -> Result<Vec<Record>>;
}

/// 主資料允許集合來源，每個請求讀取一次
#[async_trait]
pub trait MasterDataSource: Send + Sync {
    async fn fetch_allowed_sets(&self) -> Result<AllowedSets>;
}

/// 匯入提交時逐列寫入；單列失敗不影響其他列
#[async_trait]
pub trait PersistSink: Send + Sync {
    async fn persist_record(&self, entity: EntityKind, record: &Record) -> Result<()>;
}
