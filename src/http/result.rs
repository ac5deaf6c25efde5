use std::borrow::Cow;
use std::time::Duration;

use serde::de::DeserializeOwned;

/// Outcome of one HTTP call, consumed by inline checks right away.
#[derive(Debug, Clone)]
pub struct RequestResult {
    pub name: &'static str,
    /// `None` when no response arrived (connect, timeout, or body read failure).
    pub status: Option<u16>,
    /// Wall-clock time from send until the body was fully read.
    pub duration: Duration,
    pub body: Vec<u8>,
    pub error: Option<String>,
    /// Transport failure or a status outside the expected ranges.
    pub failed: bool,
}

impl RequestResult {
    #[must_use]
    pub fn is_status(&self, code: u16) -> bool {
        self.status == Some(code)
    }

    #[must_use]
    pub const fn is_transport_error(&self) -> bool {
        self.status.is_none()
    }

    /// Decodes the body as JSON, or `None` if it is not valid for `T`.
    #[must_use]
    pub fn json<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_slice(&self.body).ok()
    }

    #[must_use]
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Short description for logs and setup errors.
    #[must_use]
    pub fn describe(&self) -> String {
        match (self.status, self.error.as_deref()) {
            (Some(status), _) => format!("status {}", status),
            (None, Some(error)) => error.to_owned(),
            (None, None) => "no response".to_owned(),
        }
    }
}
