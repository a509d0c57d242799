//! Wire types for the detection API

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Account type. Determines the document kind and the request quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserType {
    Student,
    Company,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "STUDENT",
            Self::Company => "COMPANY",
        }
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STUDENT" => Ok(Self::Student),
            "COMPANY" => Ok(Self::Company),
            other => Err(format!("unknown user type: {}", other)),
        }
    }
}

/// Login request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub user_type: UserType,
}

/// Registration request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub document_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub user_type: UserType,
}

/// Issued by both login and registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    #[serde(rename = "type", default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub user_type: UserType,
    #[serde(default)]
    pub user_id: Option<i64>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Request quota as reported by the profile endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaInfo {
    pub remaining_requests: i32,
    pub total_quota: i32,
    pub last_reset_time: NaiveDateTime,
    pub minutes_until_reset: i64,
}

/// Authenticated user's profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub user_type: UserType,
    pub document_number: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub quota: QuotaInfo,
}

/// Profile update body. Absent fields are not sent.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Account deletion requires the current password
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountRequest {
    pub current_password: String,
}

/// Prediction POST body
#[derive(Debug, Clone, Serialize)]
pub struct DetectRequest {
    pub lat: f64,
    pub lon: f64,
}

/// Error body returned by the API on non-success statuses
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
    /// Runtime failures, quota rejections included, arrive under this key
    pub erro: Option<String>,
}

impl ApiErrorBody {
    /// First non-empty of `message`, `error`, `erro`.
    pub fn into_message(self) -> Option<String> {
        [self.message, self.error, self.erro]
            .into_iter()
            .flatten()
            .find(|m| !m.trim().is_empty())
    }
}

/// Pull the image URL out of a JSON prediction body.
///
/// The first non-empty string among `image_url`, `url` and `result` wins.
pub(crate) fn image_url_from_json(body: &serde_json::Value) -> Option<String> {
    ["image_url", "url", "result"]
        .iter()
        .filter_map(|key| body.get(key).and_then(|v| v.as_str()))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
