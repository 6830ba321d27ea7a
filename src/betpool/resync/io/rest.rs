use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::{Client, Response};
use tracing::{debug, instrument};

use crate::betpool::resync::config::BackendSettings;
use crate::betpool::resync::error::{Result, ResyncError};
use crate::betpool::resync::io::backend::{DeleteFilter, TableBackend};
use crate::betpool::resync::model::Row;

/// Backend speaking the PostgREST dialect over HTTP.
#[derive(Debug, Clone)]
pub struct RestBackend {
    base_url: Url,
    api_key: String,
    http: Client,
}

impl RestBackend {
    /// Validates the settings and builds the HTTP client. No request is sent.
    pub fn connect(settings: &BackendSettings) -> Result<Self> {
        let api_key = settings.api_key.trim();
        if api_key.is_empty() {
            return Err(ResyncError::Connection("backend API key is empty".to_string()));
        }

        let raw = settings.base_url.trim();
        let mut base_url = Url::parse(raw)
            .map_err(|err| ResyncError::Connection(format!("invalid backend URL '{raw}': {err}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ResyncError::Connection(format!(
                "unsupported backend URL scheme '{}'",
                base_url.scheme()
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| ResyncError::Connection(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            base_url,
            api_key: api_key.to_string(),
            http,
        })
    }

    /// URL of a table endpoint.
    pub fn table_url(&self, table: &str) -> Result<Url> {
        self.base_url
            .join(table)
            .map_err(|err| ResyncError::InvalidConfig(format!("invalid table name '{table}': {err}")))
    }

    /// URL of a filtered delete on a table endpoint.
    pub fn delete_url(&self, table: &str, filter: &DeleteFilter) -> Result<Url> {
        let mut url = self.table_url(table)?;
        let (column, predicate) = filter.query_pair();
        url.query_pairs_mut().append_pair(column, predicate);
        Ok(url)
    }

    fn check(table: &str, response: Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().unwrap_or_default();
        Err(ResyncError::Backend {
            table: table.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

impl TableBackend for RestBackend {
    #[instrument(level = "debug", skip(self, filter), fields(column = %filter.column))]
    fn delete_where(&mut self, table: &str, filter: &DeleteFilter) -> Result<()> {
        let url = self.delete_url(table, filter)?;
        let response = self
            .http
            .delete(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=minimal")
            .send()?;
        Self::check(table, response)
    }

    #[instrument(level = "debug", skip(self, rows), fields(row_count = rows.len()))]
    fn upsert(&mut self, table: &str, rows: &[Row], conflict_key: &str) -> Result<()> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("on_conflict", conflict_key);

        let response = self
            .http
            .post(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows)
            .send()?;
        debug!(status = response.status().as_u16(), "upsert answered");
        Self::check(table, response)
    }
}
