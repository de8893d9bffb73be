use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::debug;

use super::SieApi;
use super::error::ApiError;
use super::types::{AffectedEnvelope, GetEnvelope, PostEnvelope, Query, Row, row_to_pairs};

const API_URL: &str = "https://sistemas.unirio.br/api";

pub struct HttpSieApi {
    api_key: String,
    client: Client,
    base_url: String,
}

impl HttpSieApi {
    pub fn new(api_key: String) -> Result<Self, ApiError> {
        Self::with_base_url(api_key, API_URL.to_string())
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, ApiError> {
        Self::with_timeouts(api_key, base_url, Duration::from_secs(10), Duration::from_secs(60))
    }

    pub fn with_timeouts(
        api_key: String,
        base_url: String,
        connect_timeout: Duration,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            api_key,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authenticated(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.query(&[("API_KEY", self.api_key.as_str()), ("FORMAT", "JSON")])
    }

    async fn checked(path: &str, response: Response) -> Result<Response, ApiError> {
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Err(ApiError::no_content(path));
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ApiError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

impl SieApi for HttpSieApi {
    async fn get(&self, path: &str, query: &Query) -> Result<Vec<Row>, ApiError> {
        debug!(path, params = ?query.params(), "GET");
        let response = self
            .authenticated(self.client.get(self.url(path)))
            .query(&query.to_pairs())
            .send()
            .await?;
        let response = Self::checked(path, response).await?;

        let body = response
            .json::<GetEnvelope>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        if body.content.is_empty() {
            return Err(ApiError::no_content(path));
        }
        Ok(body.content)
    }

    async fn post(&self, path: &str, row: &Row) -> Result<i64, ApiError> {
        debug!(path, "POST");
        let response = self
            .authenticated(self.client.post(self.url(path)))
            .form(&row_to_pairs(row))
            .send()
            .await?;
        let response = Self::checked(path, response).await?;

        let body = response
            .json::<PostEnvelope>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(body.insert_id)
    }

    async fn put(&self, path: &str, row: &Row) -> Result<u64, ApiError> {
        debug!(path, "PUT");
        let response = self
            .authenticated(self.client.put(self.url(path)))
            .form(&row_to_pairs(row))
            .send()
            .await?;
        let response = Self::checked(path, response).await?;

        let body = response
            .json::<AffectedEnvelope>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(body.affected_rows)
    }

    async fn delete(&self, path: &str, query: &Query) -> Result<u64, ApiError> {
        debug!(path, params = ?query.params(), "DELETE");
        let response = self
            .authenticated(self.client.delete(self.url(path)))
            .query(&query.to_pairs())
            .send()
            .await?;
        let response = Self::checked(path, response).await?;

        let body = response
            .json::<AffectedEnvelope>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(body.affected_rows)
    }
}
