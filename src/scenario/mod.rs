//! Scenario scripts run by the virtual users.
mod api;
mod pvz;

#[cfg(test)]
pub(crate) mod test_support;
#[cfg(test)]
mod tests;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::http::HttpClient;
use crate::vu::VirtualUser;

pub use api::{ProductType, Role};
pub use pvz::{
    ADD_PRODUCT, CLOSE_RECEPTION, CREATE_PVZ, DUMMY_LOGIN, OPEN_RECEPTION, PvzFixture,
    PvzScenario, PvzSettings, ReceptionState,
};

/// A load-test script: one-time `setup` producing a fixture, then an
/// iteration body looped by every active VU.
#[async_trait]
pub trait Scenario: Send + Sync + 'static {
    /// Setup output. Every VU activation receives its own clone.
    type Fixture: Clone + Send + Sync + 'static;
    /// Per-VU state, reset on every activation.
    type State: Default + Send + 'static;

    fn name(&self) -> &'static str;

    /// Runs once before any VU starts. An error aborts the run.
    async fn setup(&self, client: &HttpClient) -> AppResult<Self::Fixture>;

    /// One iteration. Failures are recorded as checks and failed requests,
    /// never returned.
    async fn iteration(&self, vu: &mut VirtualUser<Self::Fixture, Self::State>);
}
