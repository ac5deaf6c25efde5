use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

use crate::args::{City, Probability};
use crate::error::{AppResult, ScenarioError};
use crate::http::{HttpClient, RequestResult};
use crate::vu::VirtualUser;

use super::Scenario;
use super::api::{
    AddProductRequest, CreatePvzRequest, CreateReceptionRequest, DummyLoginRequest,
    NO_ACTIVE_RECEPTION, ProductType, Role, error_message, parse_token,
};

pub const DUMMY_LOGIN: &str = "dummy_login";
pub const CREATE_PVZ: &str = "create_pvz";
pub const OPEN_RECEPTION: &str = "open_reception";
pub const ADD_PRODUCT: &str = "add_product";
pub const CLOSE_RECEPTION: &str = "close_reception";

const CHECK_PRODUCT_ADDED: &str = "product added to open reception";
const CHECK_WITHIN_BUDGET: &str = "response time within latency budget";
const CHECK_REJECTED: &str = "add to closed reception rejected";
const CHECK_REJECT_MESSAGE: &str = "error message mentions no active reception";

#[derive(Debug, Clone, Copy)]
pub struct PvzSettings {
    pub open_probability: Probability,
    pub close_probability: Probability,
    pub latency_budget: Duration,
    pub city: City,
}

/// Immutable setup output shared by value with every VU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvzFixture {
    /// Employee token used by every iteration request.
    pub auth_token: String,
    pub pvz_id: Uuid,
}

/// Per-VU reception flag. Only this VU's own open/close calls move it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceptionState {
    pub has_active_reception: bool,
}

/// Product intake on one pickup point: open receptions, add products, close.
#[derive(Debug, Clone)]
pub struct PvzScenario {
    settings: PvzSettings,
}

impl PvzScenario {
    #[must_use]
    pub const fn new(settings: PvzSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub const fn settings(&self) -> &PvzSettings {
        &self.settings
    }

    async fn login(&self, client: &HttpClient, role: Role) -> Result<String, ScenarioError> {
        let result = client
            .post_json(DUMMY_LOGIN, "/dummyLogin", &DummyLoginRequest { role }, None)
            .await;
        expect_status(DUMMY_LOGIN, &result, 200)?;
        parse_token(&result).ok_or(ScenarioError::SetupMissingToken { step: DUMMY_LOGIN })
    }

    async fn create_pvz(
        &self,
        client: &HttpClient,
        moderator_token: &str,
    ) -> Result<Uuid, ScenarioError> {
        let request = CreatePvzRequest {
            id: Uuid::new_v4(),
            city: self.settings.city,
            registration_date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let result = client
            .post_json(CREATE_PVZ, "/pvz", &request, Some(moderator_token))
            .await;
        expect_status(CREATE_PVZ, &result, 201)?;
        Ok(request.id)
    }

    async fn open_reception(&self, vu: &mut VirtualUser<PvzFixture, ReceptionState>) {
        let fixture = vu.fixture();
        let request = CreateReceptionRequest {
            pvz_id: fixture.pvz_id,
        };
        let result = vu
            .client()
            .post_json(
                OPEN_RECEPTION,
                "/receptions",
                &request,
                Some(&fixture.auth_token),
            )
            .await;
        if result.is_status(201) {
            vu.state_mut().has_active_reception = true;
        }
    }

    async fn close_reception(&self, vu: &mut VirtualUser<PvzFixture, ReceptionState>) {
        let fixture = vu.fixture();
        let path = format!("/pvz/{}/close_last_reception", fixture.pvz_id);
        let result = vu
            .client()
            .post_empty(CLOSE_RECEPTION, &path, Some(&fixture.auth_token))
            .await;
        if result.is_status(200) {
            vu.state_mut().has_active_reception = false;
        }
    }

    fn check_product_add(
        &self,
        vu: &VirtualUser<PvzFixture, ReceptionState>,
        result: &RequestResult,
    ) {
        if vu.state().has_active_reception {
            vu.check(CHECK_PRODUCT_ADDED, result.is_status(201));
            vu.check(
                CHECK_WITHIN_BUDGET,
                !result.is_transport_error() && result.duration < self.settings.latency_budget,
            );
        } else {
            vu.check(CHECK_REJECTED, result.is_status(400));
            let mentions = error_message(result)
                .is_some_and(|message| message.contains(NO_ACTIVE_RECEPTION));
            vu.check(CHECK_REJECT_MESSAGE, mentions);
        }
    }
}

#[async_trait]
impl Scenario for PvzScenario {
    type Fixture = PvzFixture;
    type State = ReceptionState;

    fn name(&self) -> &'static str {
        "pvz"
    }

    async fn setup(&self, client: &HttpClient) -> AppResult<PvzFixture> {
        let moderator_token = self.login(client, Role::Moderator).await?;
        tracing::info!("Logged in as moderator");

        let pvz_id = self.create_pvz(client, &moderator_token).await?;
        tracing::info!("Created pickup point {} in {}", pvz_id, self.settings.city);

        let auth_token = self.login(client, Role::Employee).await?;
        tracing::info!("Logged in as employee");

        Ok(PvzFixture { auth_token, pvz_id })
    }

    async fn iteration(&self, vu: &mut VirtualUser<PvzFixture, ReceptionState>) {
        if !vu.state().has_active_reception
            && vu.random().chance(self.settings.open_probability)
        {
            self.open_reception(vu).await;
        }

        let index = vu.random().index(ProductType::ALL.len());
        let product_type = ProductType::ALL
            .get(index)
            .copied()
            .unwrap_or(ProductType::Electronics);
        let fixture = vu.fixture();
        let request = AddProductRequest {
            product_type,
            pvz_id: fixture.pvz_id,
        };
        let result = vu
            .client()
            .post_json(ADD_PRODUCT, "/products", &request, Some(&fixture.auth_token))
            .await;
        self.check_product_add(vu, &result);

        if vu.state().has_active_reception
            && vu.random().chance(self.settings.close_probability)
        {
            self.close_reception(vu).await;
        }
    }
}

fn expect_status(
    step: &'static str,
    result: &RequestResult,
    expected: u16,
) -> Result<(), ScenarioError> {
    match result.status {
        Some(status) if status == expected => Ok(()),
        Some(status) => {
            tracing::error!(
                "Setup step {} returned {}: {}",
                step,
                status,
                result.body_text()
            );
            Err(ScenarioError::SetupUnexpectedStatus {
                step,
                status,
                expected,
            })
        }
        None => Err(ScenarioError::SetupTransport {
            step,
            message: result.describe(),
        }),
    }
}
