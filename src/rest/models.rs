use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{Quote, QuoteFilter};

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Serialize, Deserialize)]
pub struct CreateQuoteRequest {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub rating: Option<serde_json::Value>,
}

/// Outer `None` means the key was absent; an explicit `null` arrives as
/// `Some(None)` (or `Some(Value::Null)` for the rating).
#[derive(Deserialize)]
pub struct UpdateQuoteRequest {
    #[serde(default, deserialize_with = "present")]
    pub author: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub text: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub rating: Option<serde_json::Value>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Serialize, Deserialize)]
pub struct NoMatchesResponse {
    pub message: String,
    pub filters_applied: QuoteFilter,
    pub quotes: Vec<Quote>,
}
