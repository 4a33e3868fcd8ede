//! PostgREST (Supabase) record store.
//!
//! Rows live in Postgres tables exposed at `{url}/rest/v1/{table}`. The table's
//! primary key on `id` provides the uniqueness guarantee; a violation comes
//! back as Postgres error `23505`.

use crate::error::mentions_unique_violation;
use crate::{Record, RecordStore, Result, StoreError};
use async_trait::async_trait;
use langchat_core::config::StoreConfig;
use langchat_core::types::{validate_field_name, validate_table_name};
use langchat_core::SecretString;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Postgres SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Postgres SQLSTATE for undefined_table.
const UNDEFINED_TABLE: &str = "42P01";

/// PostgREST code for a table missing from the schema cache.
const TABLE_NOT_IN_SCHEMA_CACHE: &str = "PGRST205";

/// Record store backed by a PostgREST endpoint.
pub struct PostgrestStore {
    /// HTTP client.
    client: Client,

    /// Project base URL, without trailing slash.
    base_url: String,

    /// API key, sent as both `apikey` and bearer token.
    api_key: SecretString,
}

/// Error body returned by PostgREST.
#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: Option<i64>,
}

impl PostgrestStore {
    /// Create a store for the project at `url`.
    pub fn new(url: impl Into<String>, api_key: SecretString, timeout: Duration) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(StoreError::config("PostgREST URL is required"));
        }
        if api_key.is_empty() {
            return Err(StoreError::config("PostgREST API key is required"));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Create a store from the `store` config section.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| StoreError::config("store.url is not set"))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| StoreError::config("store.api_key is not set"))?;
        Self::new(url, api_key, Duration::from_secs(config.timeout_secs))
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> Result<RequestBuilder> {
        validate_table_name(table)?;
        let key = self.api_key.expose_secret();
        Ok(self
            .client
            .request(method, self.table_url(table))
            .header("apikey", key)
            .bearer_auth(key))
    }

    /// Turn a non-success response into a store error.
    async fn error_from(&self, table: &str, response: Response) -> StoreError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let body: Option<PostgrestErrorBody> = serde_json::from_str(&text).ok();

        let code = body.as_ref().and_then(|b| b.code.clone());
        let message = match &body {
            Some(PostgrestErrorBody {
                message: Some(message),
                details,
                ..
            }) => match details {
                Some(details) => format!("{} ({})", message, details),
                None => message.clone(),
            },
            _ if text.is_empty() => status.to_string(),
            _ => text,
        };

        if is_unique_violation(status, code.as_deref(), &message) {
            return StoreError::conflict(table, message);
        }
        if matches!(
            code.as_deref(),
            Some(UNDEFINED_TABLE) | Some(TABLE_NOT_IN_SCHEMA_CACHE)
        ) {
            return StoreError::UnknownTable(table.to_string());
        }

        StoreError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

/// Whether a PostgREST error denotes a uniqueness violation.
///
/// 409 is also used for foreign key violations, so the status alone only
/// counts when no SQLSTATE was returned.
fn is_unique_violation(status: StatusCode, code: Option<&str>, message: &str) -> bool {
    let by_code = match code {
        Some(code) => code == UNIQUE_VIOLATION,
        None => status == StatusCode::CONFLICT,
    };
    by_code || mentions_unique_violation(message)
}

/// Total from a `Content-Range` header such as `0-0/42` or `*/0`.
fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

#[async_trait]
impl RecordStore for PostgrestStore {
    fn name(&self) -> &str {
        "postgrest"
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        let response = self
            .request(Method::GET, table)?
            .query(&[("select", "id"), ("limit", "1")])
            .header("Prefer", "count=exact")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_from(table, response).await);
        }

        let header = response
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| StoreError::InvalidResponse("missing Content-Range header".into()))?;
        let total = parse_content_range_total(header).ok_or_else(|| {
            StoreError::InvalidResponse(format!("Content-Range without a total: {}", header))
        })?;

        debug!(table, total, "counted rows");
        Ok(total)
    }

    async fn max_id(&self, table: &str) -> Result<Option<i64>> {
        let response = self
            .request(Method::GET, table)?
            .query(&[("select", "id"), ("order", "id.desc.nullslast"), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_from(table, response).await);
        }

        let rows: Vec<IdRow> = response.json().await?;
        Ok(rows.into_iter().next().and_then(|row| row.id))
    }

    async fn insert(&self, table: &str, record: Record) -> Result<Record> {
        let response = self
            .request(Method::POST, table)?
            .header("Prefer", "return=representation")
            .json(&record)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_from(table, response).await);
        }

        let mut rows: Vec<Record> = response.json().await?;
        if rows.is_empty() {
            return Err(StoreError::InvalidResponse(format!(
                "insert into {} returned no rows",
                table
            )));
        }
        Ok(rows.swap_remove(0))
    }

    async fn latest_rows(
        &self,
        table: &str,
        filters: &[(&str, &str)],
        time_field: &str,
        limit: usize,
    ) -> Result<Vec<Record>> {
        validate_field_name(time_field)?;
        let mut query = vec![("select".to_string(), "*".to_string())];
        for (field, value) in filters {
            validate_field_name(field)?;
            query.push((field.to_string(), format!("eq.{}", value)));
        }
        query.push((
            "order".to_string(),
            format!("{}.desc.nullslast,id.desc", time_field),
        ));
        query.push(("limit".to_string(), limit.to_string()));

        let response = self.request(Method::GET, table)?.query(&query).send().await?;
        if !response.status().is_success() {
            return Err(self.error_from(table, response).await);
        }

        let rows: Vec<Record> = response.json().await?;
        debug!(table, rows = rows.len(), "fetched latest rows");
        Ok(rows)
    }
}
