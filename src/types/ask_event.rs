use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Page of `GET /events/asks/v3`.
#[derive(Debug, Deserialize)]
pub struct AskEventsResponse {
    pub events: Vec<AskEvent>,
    pub continuation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AskEvent {
    pub order: AskOrder,
    pub event: AskEventInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskOrder {
    pub id: Option<String>,
    pub contract: Option<String>,
    pub maker: Option<String>,
    pub price: Option<AskPrice>,
    pub valid_from: Option<i64>,
    pub valid_to: Option<i64>,
    pub valid_until: Option<i64>,
    pub criteria: Option<AskCriteria>,
}

#[derive(Debug, Deserialize)]
pub struct AskPrice {
    pub amount: Option<AskAmount>,
}

#[derive(Debug, Deserialize)]
pub struct AskAmount {
    pub native: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct AskCriteria {
    pub kind: Option<String>,
    pub data: Option<AskCriteriaData>,
}

#[derive(Debug, Deserialize)]
pub struct AskCriteriaData {
    pub token: Option<AskCriteriaToken>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskCriteriaToken {
    pub token_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskEventInfo {
    pub kind: String,
    pub created_at: Option<DateTime<Utc>>,
}
