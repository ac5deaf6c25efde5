use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;

use super::*;
use crate::args::StatusRange;
use crate::error::{AppError, AppResult, HttpError};
use crate::metrics::{MetricEvent, RequestSample, metrics_channel};
use crate::scenario::test_support::{MockConfig, MockPvzService, unused_base_url};
use crate::test_support::run_async_test;

fn settings(base_url: String) -> ClientSettings {
    ClientSettings {
        base_url,
        timeout: Duration::from_secs(5),
        expected_statuses: Vec::new(),
    }
}

fn request_samples(rx: &mut UnboundedReceiver<MetricEvent>) -> Vec<RequestSample> {
    let mut samples = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let MetricEvent::Request(sample) = event {
            samples.push(sample);
        }
    }
    samples
}

#[test]
fn base_url_keeps_path_prefix() -> AppResult<()> {
    let url = parse_base_url("http://localhost:8080/api")?;
    if url.as_str() != "http://localhost:8080/api/" {
        return Err(AppError::validation(format!("Unexpected base URL: {}", url)));
    }
    let joined = url
        .join("products")
        .map_err(|err| AppError::validation(format!("Join failed: {}", err)))?;
    if joined.as_str() != "http://localhost:8080/api/products" {
        return Err(AppError::validation(format!("Unexpected join: {}", joined)));
    }
    Ok(())
}

#[test]
fn base_url_without_host_is_rejected() -> AppResult<()> {
    match parse_base_url("file:///tmp/pvz") {
        Err(AppError::Http(HttpError::BaseUrlMissingHost { .. })) => {}
        Err(err) => return Err(AppError::validation(format!("Unexpected error: {}", err))),
        Ok(_) => return Err(AppError::validation("Expected missing host error")),
    }
    match parse_base_url("not a url") {
        Err(AppError::Http(HttpError::InvalidBaseUrl { .. })) => Ok(()),
        Err(err) => Err(AppError::validation(format!("Unexpected error: {}", err))),
        Ok(_) => Err(AppError::validation("Expected invalid URL error")),
    }
}

#[test]
fn success_response_is_timed_and_recorded() -> AppResult<()> {
    run_async_test(async {
        let mock = MockPvzService::start(MockConfig {
            delay: Duration::from_millis(20),
            ..MockConfig::default()
        })
        .await?;
        let (metrics, mut rx) = metrics_channel();
        let client = HttpClient::new(&settings(mock.base_url()), metrics)?;

        let result = client
            .post_json("dummy_login", "/dummyLogin", &json!({ "role": "moderator" }), None)
            .await;
        if !result.is_status(200) || result.failed {
            return Err(AppError::validation(format!(
                "Unexpected result: {}",
                result.describe()
            )));
        }
        if result.json::<String>().as_deref() != Some("token-moderator") {
            return Err(AppError::validation(format!(
                "Unexpected body: {}",
                result.body_text()
            )));
        }
        if result.duration < Duration::from_millis(20) {
            return Err(AppError::validation("Duration must include the server delay"));
        }

        let samples = request_samples(&mut rx);
        let expected = RequestSample {
            name: "dummy_login",
            duration: result.duration,
            status: Some(200),
            failed: false,
        };
        if samples != [expected] {
            return Err(AppError::validation(format!("Unexpected samples: {:?}", samples)));
        }
        Ok(())
    })
}

#[test]
fn unexpected_status_counts_as_failed() -> AppResult<()> {
    run_async_test(async {
        let mock = MockPvzService::start(MockConfig::default()).await?;
        let (metrics, mut rx) = metrics_channel();
        let client = HttpClient::new(&settings(mock.base_url()), metrics)?;

        let result = client
            .post_json("create_pvz", "/pvz", &json!({}), Some("wrong"))
            .await;
        if !result.is_status(403) || !result.failed || result.is_transport_error() {
            return Err(AppError::validation(format!(
                "Unexpected result: {}",
                result.describe()
            )));
        }
        let samples = request_samples(&mut rx);
        if samples.len() != 1 || samples.iter().any(|sample| !sample.failed) {
            return Err(AppError::validation(format!("Unexpected samples: {:?}", samples)));
        }
        Ok(())
    })
}

#[test]
fn expected_statuses_are_configurable() -> AppResult<()> {
    run_async_test(async {
        let mock = MockPvzService::start(MockConfig::default()).await?;
        let (metrics, _rx) = metrics_channel();
        let mut settings = settings(mock.base_url());
        settings.expected_statuses = vec![StatusRange { start: 200, end: 299 }, StatusRange {
            start: 400,
            end: 400,
        }];
        let client = HttpClient::new(&settings, metrics)?;

        let token = Some("token-employee");
        let rejected = client
            .post_json("add_product", "/products", &json!({ "type": "обувь", "pvzId": "x" }), token)
            .await;
        if !rejected.is_status(400) || rejected.failed {
            return Err(AppError::validation("400 should be expected here"));
        }
        let forbidden = client.post_empty("close_reception", "/pvz/x/close_last_reception", None).await;
        if !forbidden.is_status(403) || !forbidden.failed {
            return Err(AppError::validation("403 should still fail"));
        }
        Ok(())
    })
}

#[test]
fn connection_refused_is_transport_error() -> AppResult<()> {
    run_async_test(async {
        let (metrics, mut rx) = metrics_channel();
        let client = HttpClient::new(&settings(unused_base_url().await?), metrics)?;

        let result = client.post_empty("close_reception", "/pvz/x/close_last_reception", None).await;
        if !result.is_transport_error() || !result.failed || result.error.is_none() {
            return Err(AppError::validation(format!(
                "Expected transport error, got {}",
                result.describe()
            )));
        }
        let samples = request_samples(&mut rx);
        if samples.len() != 1 || samples.iter().any(|sample| sample.status.is_some()) {
            return Err(AppError::validation(format!("Unexpected samples: {:?}", samples)));
        }
        Ok(())
    })
}

#[test]
fn timeout_is_transport_error() -> AppResult<()> {
    run_async_test(async {
        let mock = MockPvzService::start(MockConfig {
            delay: Duration::from_millis(500),
            ..MockConfig::default()
        })
        .await?;
        let (metrics, _rx) = metrics_channel();
        let mut settings = settings(mock.base_url());
        settings.timeout = Duration::from_millis(50);
        let client = HttpClient::new(&settings, metrics)?;

        let result = client
            .post_json("dummy_login", "/dummyLogin", &json!({ "role": "employee" }), None)
            .await;
        if !result.is_transport_error() {
            return Err(AppError::validation(format!(
                "Expected timeout, got {}",
                result.describe()
            )));
        }
        Ok(())
    })
}
