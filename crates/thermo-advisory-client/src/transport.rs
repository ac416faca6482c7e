use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thermo_advisory_core::{AdvisoryConfig, AdvisoryRequest, HistoryResponse};

use crate::error::TransportError;
use crate::snapshot::SensorReport;

/// Request/response surface of the advisory service.
#[async_trait]
pub trait AdvisoryTransport: Send + Sync {
    /// `POST /api/advice`. The body is returned undecoded for the normalizer.
    async fn post_advice(&self, request: &AdvisoryRequest) -> Result<Value, TransportError>;

    /// `GET /api/advice/history?limit=N`.
    async fn fetch_history(&self, limit: usize) -> Result<HistoryResponse, TransportError>;

    /// `GET /api/sensors`.
    async fn fetch_sensors(&self) -> Result<SensorReport, TransportError>;

    /// `GET /api/advice/statistics`.
    async fn fetch_statistics(&self) -> Result<Value, TransportError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    base_url: String,
    http: Client,
}

impl HttpTransport {
    pub fn new(config: &AdvisoryConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            base_url: trim_trailing_slash(config.base_url.clone()),
            http: builder.build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn read_json<R: DeserializeOwned>(
        url: String,
        response: reqwest::Response,
    ) -> Result<R, TransportError> {
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url,
            });
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_json<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<R, TransportError> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let response = self.http.get(&url).query(query).send().await?;
        Self::read_json(url, response).await
    }
}

#[async_trait]
impl AdvisoryTransport for HttpTransport {
    async fn post_advice(&self, request: &AdvisoryRequest) -> Result<Value, TransportError> {
        let url = self.url("/api/advice");
        tracing::debug!(%url, "POST");
        let response = self.http.post(&url).json(request).send().await?;
        Self::read_json(url, response).await
    }

    async fn fetch_history(&self, limit: usize) -> Result<HistoryResponse, TransportError> {
        self.get_json("/api/advice/history", &[("limit", limit.to_string())])
            .await
    }

    async fn fetch_sensors(&self) -> Result<SensorReport, TransportError> {
        self.get_json("/api/sensors", &[]).await
    }

    async fn fetch_statistics(&self) -> Result<Value, TransportError> {
        self.get_json("/api/advice/statistics", &[]).await
    }
}

fn trim_trailing_slash(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}
