use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::TokenKey;

/// A `new-order` listing event as normalized from the marketplace feed.
///
/// `contract_address` and `token_index` are nullable in storage: collection
/// wide orders carry no token id. Such rows are kept for history but never
/// resolve to a [`TokenKey`].
#[derive(Debug, Clone, PartialEq, FromRow, Deserialize, Serialize)]
pub struct Activity {
    pub id: Option<i64>,
    pub order_id: Option<String>,
    pub contract_address: Option<String>,
    pub token_index: Option<BigDecimal>,
    pub listing_price: Option<BigDecimal>,
    pub maker: String,
    pub listing_from: i64,
    pub listing_to: Option<i64>,
    pub event_timestamp: DateTime<Utc>,
    pub reconciled_at: Option<DateTime<Utc>>,
}

impl Activity {
    pub fn key(&self) -> Option<TokenKey> {
        let contract_address = self.contract_address.as_deref()?.trim();

        if contract_address.is_empty() {
            return None;
        }

        let token_index = self.token_index.as_ref()?;

        Some(TokenKey::new(contract_address, token_index.to_owned()))
    }

    pub fn is_active(&self, now: i64) -> bool {
        is_listing_active(self.listing_to, now)
    }
}

/// A listing without expiry is always active; otherwise it is active while
/// its expiry lies strictly in the future.
pub fn is_listing_active(listing_to: Option<i64>, now: i64) -> bool {
    listing_to.map_or(true, |to| to > now)
}
