//! HTTP client for the seller statistics API.

mod fetch_period;

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use wbreport_core::{AppConfig, MetricRecord};

use crate::endpoint::Endpoint;
use crate::error::StatsError;
use crate::rate_limit::{retry_with_backoff, RetryPolicy, Sleeper, TokioSleeper};

const USER_AGENT: &str = "wbreport/0.1 (seller-analytics)";

/// Longest slice of a 400 body kept in [`StatsError::BadRequest`].
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Client for the statistics endpoints.
///
/// Every request carries the raw API key in `Authorization`. Rate-limit and
/// transient failures are retried according to the [`RetryPolicy`]; waits go
/// through the injected [`Sleeper`] (real `tokio` sleeps by default).
pub struct StatsClient<S = TokioSleeper> {
    client: Client,
    api_key: String,
    base_url: Url,
    policy: RetryPolicy,
    sleeper: S,
}

impl StatsClient<TokioSleeper> {
    /// Creates a client from the loaded application config.
    ///
    /// # Errors
    ///
    /// Same as [`StatsClient::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Self, StatsError> {
        Self::with_base_url(
            &config.api_key,
            config.request_timeout_secs,
            &config.api_base_url,
            RetryPolicy::from_config(config),
        )
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`StatsError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
        policy: RetryPolicy,
    ) -> Result<Self, StatsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;

        // A trailing slash makes `Url::join` append the endpoint suffix
        // instead of replacing the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| StatsError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            policy,
            sleeper: TokioSleeper,
        })
    }
}

impl<S: Sleeper> StatsClient<S> {
    /// Swaps the sleeper used between retries.
    #[must_use]
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> StatsClient<T> {
        StatsClient {
            client: self.client,
            api_key: self.api_key,
            base_url: self.base_url,
            policy: self.policy,
            sleeper,
        }
    }

    /// Fetches all records from `endpoint`, retrying per the policy.
    ///
    /// A single JSON object is wrapped into a one-element vector; `null`
    /// yields an empty vector. Non-object array elements are skipped.
    ///
    /// # Errors
    ///
    /// - [`StatsError::RateLimitExceeded`] after the attempt budget is spent on 429s.
    /// - [`StatsError::BadRequest`] on HTTP 400 (not retried).
    /// - [`StatsError::Unauthorized`] on HTTP 401/403 (not retried).
    /// - [`StatsError::Http`] / [`StatsError::ServerError`] when transient
    ///   failures outlast the retries.
    /// - [`StatsError::Deserialize`] / [`StatsError::UnexpectedShape`] on a
    ///   malformed body (not retried).
    pub async fn fetch(
        &self,
        endpoint: Endpoint,
        params: &[(&str, &str)],
    ) -> Result<Vec<MetricRecord>, StatsError> {
        let url = self.endpoint_url(endpoint, params)?;
        let url = &url;
        let body = retry_with_backoff(&self.policy, &self.sleeper, endpoint, move || {
            self.request_once(endpoint, url)
        })
        .await?;
        let records = normalize_records(endpoint, body)?;
        tracing::debug!(%endpoint, records = records.len(), "statistics fetched");
        Ok(records)
    }

    /// Like [`StatsClient::fetch`], but any failure degrades to an empty
    /// vector with a warning. Meant for [`Endpoint::is_optional`] endpoints.
    pub async fn fetch_optional(
        &self,
        endpoint: Endpoint,
        params: &[(&str, &str)],
    ) -> Vec<MetricRecord> {
        match self.fetch(endpoint, params).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(%endpoint, error = %e, "optional statistics unavailable, using empty data");
                Vec::new()
            }
        }
    }

    /// Checks that the API is reachable and accepts the credential.
    ///
    /// # Errors
    ///
    /// Same as [`StatsClient::fetch`].
    pub async fn ping(&self) -> Result<(), StatsError> {
        self.fetch(Endpoint::Ping, &[]).await.map(|_| ())
    }

    fn endpoint_url(&self, endpoint: Endpoint, params: &[(&str, &str)]) -> Result<Url, StatsError> {
        let mut url = self
            .base_url
            .join(endpoint.path())
            .map_err(|e| StatsError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// One GET attempt: maps the status to a typed error and parses the body.
    async fn request_once(&self, endpoint: Endpoint, url: &Url) -> Result<Value, StatsError> {
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            return Err(StatsError::RateLimited {
                endpoint,
                retry_after_secs,
            });
        }

        if status == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            return Err(StatsError::BadRequest {
                endpoint,
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StatsError::Unauthorized {
                endpoint,
                status: status.as_u16(),
            });
        }

        if status.is_server_error() {
            return Err(StatsError::ServerError {
                endpoint,
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            return Err(StatsError::UnexpectedStatus {
                endpoint,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| StatsError::Deserialize {
            context: format!("{endpoint} response"),
            source: e,
        })
    }
}

/// Normalises an endpoint payload into a list of records.
fn normalize_records(endpoint: Endpoint, body: Value) -> Result<Vec<MetricRecord>, StatsError> {
    match body {
        Value::Null => Ok(Vec::new()),
        Value::Object(fields) => Ok(vec![MetricRecord::new(fields)]),
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| {
                let record = MetricRecord::from_value(item);
                if record.is_none() {
                    tracing::debug!(%endpoint, "skipping non-object array element");
                }
                record
            })
            .collect()),
        Value::Bool(_) => Err(StatsError::UnexpectedShape {
            endpoint,
            found: "boolean",
        }),
        Value::Number(_) => Err(StatsError::UnexpectedShape {
            endpoint,
            found: "number",
        }),
        Value::String(_) => Err(StatsError::UnexpectedShape {
            endpoint,
            found: "string",
        }),
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
