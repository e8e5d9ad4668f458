use anyhow::{anyhow, bail, Context, Result};
use reqwest::{Client, Url};
use serde_json::Value;

use crate::{config::Config, error::ConfigError};

/// Read-only client for the project's Postgres REST endpoint.
pub struct DbClient {
    client: Client,
    base: String,
    key: String,
}

impl DbClient {
    /// Fails on the first missing variable, before any request is made.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let base = cfg.require("SUPABASE_URL")?;
        let key = cfg.require("SUPABASE_SERVICE_ROLE_KEY")?;

        let timeout_secs = cfg.get_u64("REQUEST_TIMEOUT")?.unwrap_or(60);
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self { client, base, key })
    }

    /// Every row of `table`, as the JSON array the endpoint returns.
    pub async fn select_all(&self, table: &str) -> Result<Value> {
        let url = self.table_url(table)?;
        tracing::debug!(%url, "selecting rows");
        let resp = self
            .client
            .get(url)
            .query(&[("select", "*")])
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            Ok(resp.json::<Value>().await?)
        } else {
            let text = resp.text().await.unwrap_or_default();
            bail!("query on {} failed: {} - {}", table, status, text)
        }
    }

    /// `{base}/rest/v1/{table}`, with the table name escaped as one path segment.
    fn table_url(&self, table: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base).context("SUPABASE_URL is not a valid URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("SUPABASE_URL cannot carry a path: {}", self.base))?
            .pop_if_empty()
            .extend(["rest", "v1", table]);
        Ok(url)
    }
}

/// The configuration error behind a failed [`DbClient::from_config`], if any.
pub fn config_error(err: &anyhow::Error) -> Option<&ConfigError> {
    err.downcast_ref::<ConfigError>()
}
