use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use tokio::time::Instant;
use url::Url;

use crate::args::{DEFAULT_USER_AGENT, StatusRange};
use crate::error::{AppError, AppResult, HttpError};
use crate::metrics::{MetricsSink, RequestSample};

use super::result::RequestResult;

/// Connection settings shared by every VU.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub timeout: Duration,
    /// Statuses counted as success for `http_req_failed`. Empty means 200-399.
    pub expected_statuses: Vec<StatusRange>,
}

/// Thin wrapper over one shared `reqwest::Client`. Every call produces a
/// [`RequestResult`] and one request sample; errors never escape as `Err`.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
    expected: Arc<[StatusRange]>,
    metrics: MetricsSink,
}

impl HttpClient {
    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns an error when the base URL is invalid or the client cannot be built.
    pub fn new(settings: &ClientSettings, metrics: MetricsSink) -> AppResult<Self> {
        let base_url = parse_base_url(&settings.base_url)?;
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|err| AppError::http(HttpError::BuildClientFailed { source: err }))?;
        let expected: Arc<[StatusRange]> = if settings.expected_statuses.is_empty() {
            Arc::from(vec![StatusRange::DEFAULT])
        } else {
            Arc::from(settings.expected_statuses.clone())
        };
        Ok(Self {
            client,
            base_url,
            expected,
            metrics,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `POST` a JSON body, optionally with a bearer token.
    pub async fn post_json<B>(
        &self,
        name: &'static str,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> RequestResult
    where
        B: Serialize + ?Sized,
    {
        match self.url(path) {
            Ok(url) => {
                let builder = self.client.post(url).json(body);
                self.execute(name, with_token(builder, token)).await
            }
            Err(err) => self.failed_before_send(name, &err),
        }
    }

    /// `POST` without a body, optionally with a bearer token.
    pub async fn post_empty(
        &self,
        name: &'static str,
        path: &str,
        token: Option<&str>,
    ) -> RequestResult {
        match self.url(path) {
            Ok(url) => {
                let builder = self.client.post(url);
                self.execute(name, with_token(builder, token)).await
            }
            Err(err) => self.failed_before_send(name, &err),
        }
    }

    fn url(&self, path: &str) -> Result<Url, HttpError> {
        let relative = path.trim_start_matches('/');
        self.base_url
            .join(relative)
            .map_err(|err| HttpError::JoinUrlFailed {
                path: path.to_owned(),
                source: err,
            })
    }

    fn is_expected(&self, status: u16) -> bool {
        self.expected.iter().any(|range| range.contains(status))
    }

    async fn execute(&self, name: &'static str, builder: RequestBuilder) -> RequestResult {
        let start = Instant::now();
        let outcome = match builder.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                read_body(response)
                    .await
                    .map(|body| (status, body))
            }
            Err(err) => Err(err),
        };
        let duration = start.elapsed();

        let result = match outcome {
            Ok((status, body)) => RequestResult {
                name,
                status: Some(status),
                duration,
                body,
                error: None,
                failed: !self.is_expected(status),
            },
            Err(err) => {
                tracing::debug!("Request {} failed after {:?}: {}", name, duration, err);
                RequestResult {
                    name,
                    status: None,
                    duration,
                    body: Vec::new(),
                    error: Some(err.to_string()),
                    failed: true,
                }
            }
        };
        self.record(&result);
        result
    }

    fn failed_before_send(&self, name: &'static str, err: &HttpError) -> RequestResult {
        tracing::debug!("Request {} not sent: {}", name, err);
        let result = RequestResult {
            name,
            status: None,
            duration: Duration::ZERO,
            body: Vec::new(),
            error: Some(err.to_string()),
            failed: true,
        };
        self.record(&result);
        result
    }

    fn record(&self, result: &RequestResult) {
        self.metrics.request(RequestSample {
            name: result.name,
            duration: result.duration,
            status: result.status,
            failed: result.failed,
        });
    }
}

fn with_token(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

async fn read_body(response: reqwest::Response) -> Result<Vec<u8>, reqwest::Error> {
    let mut stream = response.bytes_stream();
    let mut body = Vec::new();
    while let Some(chunk) = stream.next().await {
        body.extend_from_slice(&chunk?);
    }
    Ok(body)
}

/// Parses the base URL and makes sure it ends with `/` so joined paths keep
/// any prefix such as `/api`.
pub(crate) fn parse_base_url(raw: &str) -> AppResult<Url> {
    let mut url = Url::parse(raw.trim()).map_err(|err| {
        AppError::http(HttpError::InvalidBaseUrl {
            url: raw.to_owned(),
            source: err,
        })
    })?;
    if url.host_str().is_none() {
        return Err(AppError::http(HttpError::BaseUrlMissingHost {
            url: raw.to_owned(),
        }));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
