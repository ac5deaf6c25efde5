use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;

use super::test_support::{MockConfig, MockPvzService, unused_base_url};
use super::*;
use crate::args::{City, Probability};
use crate::error::{AppError, AppResult, ScenarioError};
use crate::http::{ClientSettings, HttpClient};
use crate::metrics::{MetricEvent, MetricsSink, metrics_channel};
use crate::test_support::run_async_test;
use crate::vu::{ScriptedRandom, VirtualUser};

type PvzUser = VirtualUser<PvzFixture, ReceptionState>;

fn scenario() -> PvzScenario {
    PvzScenario::new(PvzSettings {
        open_probability: Probability::NEVER,
        close_probability: Probability::NEVER,
        latency_budget: Duration::from_secs(5),
        city: City::Moscow,
    })
}

fn client(base_url: String, metrics: &MetricsSink) -> AppResult<HttpClient> {
    let settings = ClientSettings {
        base_url,
        timeout: Duration::from_secs(5),
        expected_statuses: Vec::new(),
    };
    HttpClient::new(&settings, metrics.clone())
}

fn user(
    fixture: &PvzFixture,
    client: &HttpClient,
    metrics: &MetricsSink,
    chances: &[bool],
    indexes: &[usize],
) -> PvzUser {
    VirtualUser::new(
        1,
        fixture.clone(),
        ReceptionState::default(),
        Box::new(ScriptedRandom::new(chances, indexes)),
        client.clone(),
        metrics.clone(),
    )
}

fn drain_checks(rx: &mut UnboundedReceiver<MetricEvent>) -> Vec<(&'static str, bool)> {
    let mut checks = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let MetricEvent::Check(sample) = event {
            checks.push((sample.name, sample.passed));
        }
    }
    checks
}

fn expect_all_passed(checks: &[(&'static str, bool)], expected: usize) -> AppResult<()> {
    if checks.len() != expected {
        return Err(AppError::validation(format!(
            "Expected {} checks, got {:?}",
            expected, checks
        )));
    }
    if let Some((name, _)) = checks.iter().find(|(_, passed)| !passed) {
        return Err(AppError::validation(format!("Check failed: {}", name)));
    }
    Ok(())
}

#[test]
fn setup_creates_pickup_point_and_employee_token() -> AppResult<()> {
    run_async_test(async {
        let mock = MockPvzService::start(MockConfig::default()).await?;
        let (metrics, _rx) = metrics_channel();
        let client = client(mock.base_url(), &metrics)?;

        let fixture = scenario().setup(&client).await?;
        if fixture.auth_token != "token-employee" {
            return Err(AppError::validation(format!(
                "Unexpected token: {}",
                fixture.auth_token
            )));
        }
        if mock.hits("dummyLogin") != 2 || mock.hits("pvz") != 1 {
            return Err(AppError::validation("Expected two logins and one pvz"));
        }
        let bodies = mock.pvz_bodies();
        let Some(body) = bodies.first() else {
            return Err(AppError::validation("Missing pvz body"));
        };
        if body.get("id").and_then(|id| id.as_str()) != Some(fixture.pvz_id.to_string().as_str())
        {
            return Err(AppError::validation("Pvz id does not match the fixture"));
        }
        if body.get("city").and_then(|city| city.as_str()) != Some("Москва") {
            return Err(AppError::validation("Expected Москва as city"));
        }
        Ok(())
    })
}

#[test]
fn setup_accepts_token_object() -> AppResult<()> {
    run_async_test(async {
        let mock = MockPvzService::start(MockConfig {
            token_as_object: true,
            ..MockConfig::default()
        })
        .await?;
        let (metrics, _rx) = metrics_channel();
        let client = client(mock.base_url(), &metrics)?;
        let fixture = scenario().setup(&client).await?;
        if fixture.auth_token != "token-employee" {
            return Err(AppError::validation("Expected token from object body"));
        }
        Ok(())
    })
}

#[test]
fn setup_stops_at_rejected_pickup_point() -> AppResult<()> {
    run_async_test(async {
        let mock = MockPvzService::start(MockConfig {
            reject_pvz_creation: true,
            ..MockConfig::default()
        })
        .await?;
        let (metrics, _rx) = metrics_channel();
        let client = client(mock.base_url(), &metrics)?;

        match scenario().setup(&client).await {
            Err(AppError::Scenario(ScenarioError::SetupUnexpectedStatus {
                step,
                status: 403,
                expected: 201,
            })) if step == CREATE_PVZ => {}
            Err(err) => return Err(AppError::validation(format!("Unexpected error: {}", err))),
            Ok(_) => return Err(AppError::validation("Expected setup to fail")),
        }
        if mock.hits("dummyLogin") != 1 {
            return Err(AppError::validation("Employee login should not run"));
        }
        Ok(())
    })
}

#[test]
fn setup_fails_when_service_is_down() -> AppResult<()> {
    run_async_test(async {
        let (metrics, _rx) = metrics_channel();
        let client = client(unused_base_url().await?, &metrics)?;
        match scenario().setup(&client).await {
            Err(AppError::Scenario(ScenarioError::SetupTransport { step, .. }))
                if step == DUMMY_LOGIN =>
            {
                Ok(())
            }
            Err(err) => Err(AppError::validation(format!("Unexpected error: {}", err))),
            Ok(_) => Err(AppError::validation("Expected setup to fail")),
        }
    })
}

#[test]
fn vu_without_reception_is_always_rejected() -> AppResult<()> {
    run_async_test(async {
        let mock = MockPvzService::start(MockConfig::default()).await?;
        let (metrics, mut rx) = metrics_channel();
        let client = client(mock.base_url(), &metrics)?;
        let scenario = scenario();
        let fixture = scenario.setup(&client).await?;
        drop(drain_checks(&mut rx));

        let mut vu = user(&fixture, &client, &metrics, &[false; 5], &[]);
        for _ in 0..5 {
            scenario.iteration(&mut vu).await;
        }

        if vu.state().has_active_reception {
            return Err(AppError::validation("Flag must stay false"));
        }
        expect_all_passed(&drain_checks(&mut rx), 10)?;
        if mock.hits("products") != 5 || mock.hits("receptions") != 0 || mock.hits("close") != 0 {
            return Err(AppError::validation("Unexpected request mix"));
        }
        Ok(())
    })
}

#[test]
fn forced_open_iteration_adds_product() -> AppResult<()> {
    run_async_test(async {
        let mock = MockPvzService::start(MockConfig::default()).await?;
        let (metrics, mut rx) = metrics_channel();
        let client = client(mock.base_url(), &metrics)?;
        let scenario = scenario();
        let fixture = scenario.setup(&client).await?;
        drop(drain_checks(&mut rx));

        let mut vu = user(&fixture, &client, &metrics, &[true, false, false], &[]);
        scenario.iteration(&mut vu).await;
        scenario.iteration(&mut vu).await;

        if !vu.state().has_active_reception {
            return Err(AppError::validation("Flag must be set after a 201 open"));
        }
        if !mock.reception_open(&fixture.pvz_id.to_string()) {
            return Err(AppError::validation("Service should hold an open reception"));
        }
        let checks = drain_checks(&mut rx);
        expect_all_passed(&checks, 4)?;
        if checks.first().map(|(name, _)| *name) != Some("product added to open reception") {
            return Err(AppError::validation(format!("Unexpected checks: {:?}", checks)));
        }
        if mock.hits("receptions") != 1 || mock.hits("close") != 0 {
            return Err(AppError::validation("Expected one open and no close"));
        }
        Ok(())
    })
}

#[test]
fn close_clears_flag_and_rejections_resume() -> AppResult<()> {
    run_async_test(async {
        let mock = MockPvzService::start(MockConfig::default()).await?;
        let (metrics, mut rx) = metrics_channel();
        let client = client(mock.base_url(), &metrics)?;
        let scenario = scenario();
        let fixture = scenario.setup(&client).await?;
        drop(drain_checks(&mut rx));

        let mut vu = user(&fixture, &client, &metrics, &[true, true, false], &[]);
        scenario.iteration(&mut vu).await;
        if vu.state().has_active_reception {
            return Err(AppError::validation("Flag must clear after a 200 close"));
        }
        scenario.iteration(&mut vu).await;

        let checks = drain_checks(&mut rx);
        expect_all_passed(&checks, 4)?;
        if checks.get(2).map(|(name, _)| *name) != Some("add to closed reception rejected") {
            return Err(AppError::validation(format!("Unexpected checks: {:?}", checks)));
        }
        if mock.hits("close") != 1 {
            return Err(AppError::validation("Expected exactly one close"));
        }
        Ok(())
    })
}

#[test]
fn failed_open_leaves_flag_unset() -> AppResult<()> {
    run_async_test(async {
        let mock = MockPvzService::start(MockConfig::default()).await?;
        let (metrics, mut rx) = metrics_channel();
        let client = client(mock.base_url(), &metrics)?;
        let scenario = scenario();
        let fixture = scenario.setup(&client).await?;

        let mut first = user(&fixture, &client, &metrics, &[true, false], &[]);
        scenario.iteration(&mut first).await;
        drop(drain_checks(&mut rx));

        // The shared pickup point already has an open reception, so this open gets 400.
        let mut second = user(&fixture, &client, &metrics, &[true], &[]);
        scenario.iteration(&mut second).await;

        if second.state().has_active_reception {
            return Err(AppError::validation("A 400 open must not set the flag"));
        }
        if !first.state().has_active_reception {
            return Err(AppError::validation("Flags are per VU"));
        }
        let checks = drain_checks(&mut rx);
        if checks.first() != Some(&("add to closed reception rejected", false)) {
            return Err(AppError::validation(format!("Unexpected checks: {:?}", checks)));
        }
        Ok(())
    })
}

#[test]
fn product_type_follows_random_index() -> AppResult<()> {
    run_async_test(async {
        let mock = MockPvzService::start(MockConfig::default()).await?;
        let (metrics, _rx) = metrics_channel();
        let client = client(mock.base_url(), &metrics)?;
        let scenario = scenario();
        let fixture = scenario.setup(&client).await?;

        let mut vu = user(&fixture, &client, &metrics, &[], &[1, 2, 0]);
        for _ in 0..3 {
            scenario.iteration(&mut vu).await;
        }
        let types = mock.product_types();
        if types != ["одежда", "обувь", "электроника"] {
            return Err(AppError::validation(format!("Unexpected types: {:?}", types)));
        }
        Ok(())
    })
}

#[test]
fn product_type_wire_names() -> AppResult<()> {
    let names: Vec<&str> = ProductType::ALL.iter().map(|kind| kind.as_str()).collect();
    if names != ["электроника", "одежда", "обувь"] {
        return Err(AppError::validation(format!("Unexpected names: {:?}", names)));
    }
    let encoded = serde_json::to_string(&Role::Employee)?;
    if encoded != "\"employee\"" {
        return Err(AppError::validation(format!("Unexpected role: {}", encoded)));
    }
    Ok(())
}
