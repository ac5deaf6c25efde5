use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::args::City;
use crate::http::RequestResult;

/// Substring the service puts in the error when no reception is open.
pub(crate) const NO_ACTIVE_RECEPTION: &str = "no active reception";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Moderator,
    Employee,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProductType {
    #[serde(rename = "электроника")]
    Electronics,
    #[serde(rename = "одежда")]
    Clothing,
    #[serde(rename = "обувь")]
    Shoes,
}

impl ProductType {
    pub const ALL: [ProductType; 3] = [
        ProductType::Electronics,
        ProductType::Clothing,
        ProductType::Shoes,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ProductType::Electronics => "электроника",
            ProductType::Clothing => "одежда",
            ProductType::Shoes => "обувь",
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct DummyLoginRequest {
    pub role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatePvzRequest {
    pub id: Uuid,
    pub city: City,
    pub registration_date: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateReceptionRequest {
    pub pvz_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddProductRequest {
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub pvz_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// `/dummyLogin` answers either `{"token": "..."}` or a bare JSON string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenResponse {
    Object { token: String },
    Bare(String),
}

pub(crate) fn parse_token(result: &RequestResult) -> Option<String> {
    let token = match result.json::<TokenResponse>()? {
        TokenResponse::Object { token } | TokenResponse::Bare(token) => token,
    };
    let trimmed = token.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

pub(crate) fn error_message(result: &RequestResult) -> Option<String> {
    result
        .json::<ErrorResponse>()
        .map(|response| response.message)
}
