use crate::domain::model::{AllowedSets, Record};
use crate::domain::ports::{MasterDataSource, PersistSink, RecordSource};
use crate::domain::schema::EntityKind;
use crate::utils::error::{OpsError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// JSON over HTTP 後端：
/// `GET {endpoint}/records/{entity}`、`GET {endpoint}/master-data`、`POST {endpoint}/records/{entity}`
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    endpoint: String,
}

impl HttpBackend {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    fn records_url(&self, entity: EntityKind) -> String {
        format!("{}/records/{}", self.endpoint, entity)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, source_name: &str, url: &str) -> Result<T> {
        tracing::debug!("Making API request to: {}", url);
        let response = self.client.get(url).send().await?;
        tracing::debug!("API response status: {}", response.status());

        if !response.status().is_success() {
            return Err(OpsError::upstream(
                source_name,
                format!("HTTP {} from {}", response.status(), url),
            ));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl RecordSource for HttpBackend {
    async fn fetch_records(&self, entity: EntityKind) -> Result<Vec<Record>> {
        let records: Vec<Record> = self.get_json(entity.as_str(), &self.records_url(entity)).await?;
        tracing::info!("📥 Fetched {} {} records", records.len(), entity);
        Ok(records)
    }
}

#[async_trait]
impl MasterDataSource for HttpBackend {
    async fn fetch_allowed_sets(&self) -> Result<AllowedSets> {
        let url = format!("{}/master-data", self.endpoint);
        let sets: HashMap<String, Vec<String>> = self.get_json("master-data", &url).await?;
        Ok(AllowedSets::from(sets))
    }
}

#[async_trait]
impl PersistSink for HttpBackend {
    async fn persist_record(&self, entity: EntityKind, record: &Record) -> Result<()> {
        let url = self.records_url(entity);
        let response = self
            .client
            .post(&url)
            .json(record)
            .send()
            .await
            .map_err(|e| OpsError::persistence(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(OpsError::persistence(format!("HTTP {} from {}", response.status(), url)))
        }
    }
}
