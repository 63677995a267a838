use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::model::ReportQuery;
use crate::wb::model::{products_from_response, SearchReportRequest};

pub mod model;

pub const SEARCH_REPORT_URL: &str =
    "https://seller-analytics-api.wildberries.ru/api/v2/search-report/table/details";

/// One attempt at one page of the search report. Retrying is the caller's job.
#[async_trait]
pub trait SearchReportApi: Send + Sync {
    async fn fetch_page(
        &self,
        query: &ReportQuery,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Value>, FetchError>;
}

#[derive(Clone)]
pub struct WbClient {
    http: Client,
    endpoint: Url,
    token: String,
}

impl fmt::Debug for WbClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WbClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl WbClient {
    pub fn new(token: String, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(SEARCH_REPORT_URL).context("invalid search report URL")?;
        Self::with_endpoint(token, endpoint, timeout)
    }

    pub fn with_endpoint(token: String, endpoint: Url, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("wb-search-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .no_proxy()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            endpoint,
            token,
        })
    }

    pub fn build_request(
        &self,
        query: &ReportQuery,
        offset: u32,
        limit: u32,
    ) -> Result<reqwest::Request, FetchError> {
        let body = SearchReportRequest::new(query, offset, limit);
        self.http
            .post(self.endpoint.clone())
            .header("Authorization", &self.token)
            .header("Content-Type", "application/json")
            .json(&body)
            .build()
            .map_err(FetchError::from)
    }
}

#[async_trait]
impl SearchReportApi for WbClient {
    async fn fetch_page(
        &self,
        query: &ReportQuery,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Value>, FetchError> {
        let request = self.build_request(query, offset, limit)?;
        debug!(url = %request.url(), report_date = %query.report_date, offset, limit, "search report request");

        let res = self.http.execute(request).await?;
        let status = res.status();
        if status.is_client_error() || status.is_server_error() {
            let body = res.text().await.unwrap_or_default();
            warn!(%status, body = %body, "search report API error");
            return Err(FetchError::status(status, body));
        }

        let text = res.text().await?;
        let payload: Value =
            serde_json::from_str(&text).map_err(|e| FetchError::Decode(e.to_string()))?;
        Ok(products_from_response(&payload))
    }
}
