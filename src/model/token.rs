use std::fmt;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Compound identity of an NFT. Token indexes repeat across collections, so
/// the contract address is always part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct TokenKey {
    pub contract_address: String,
    pub token_index: BigDecimal,
}

impl TokenKey {
    pub fn new(contract_address: &str, token_index: BigDecimal) -> Self {
        TokenKey {
            contract_address: contract_address.to_owned(),
            token_index: token_index.with_scale(0),
        }
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.contract_address, self.token_index)
    }
}

/// Current listing market of one NFT.
#[derive(Debug, Clone, PartialEq, FromRow, Deserialize, Serialize)]
pub struct Token {
    pub id: Option<i64>,
    pub contract_address: String,
    pub token_index: BigDecimal,
    pub current_price: Option<BigDecimal>,
    pub listing_to: Option<i64>,
}

impl Token {
    pub fn new(
        key: TokenKey,
        current_price: Option<BigDecimal>,
        listing_to: Option<i64>,
    ) -> Self {
        Token {
            id: None,
            contract_address: key.contract_address,
            token_index: key.token_index,
            current_price,
            listing_to,
        }
    }

    pub fn key(&self) -> TokenKey {
        TokenKey::new(&self.contract_address, self.token_index.to_owned())
    }

    /// Whether the listing that set `current_price` is past its expiry.
    pub fn is_expired(&self, now: i64) -> bool {
        self.listing_to.is_some_and(|to| to <= now)
    }
}
