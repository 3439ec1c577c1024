use std::str::FromStr;

use bigdecimal::BigDecimal;

use crate::{error::Error, model::TokenKey};

/// Normalizes a contract address the way ingestion stores it.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Builds a [`TokenKey`] from request parameters. The token index must be a
/// non-negative integer.
pub fn parse_token_key(
    contract_address: &str,
    token_index: &str,
) -> Result<TokenKey, Error> {
    let contract_address = normalize_address(contract_address);
    if contract_address.is_empty() {
        return Err(Error::InvalidOption {
            option: String::from("contract_address"),
        });
    }

    let token_index = BigDecimal::from_str(token_index.trim())?;
    if !token_index.is_integer() || token_index < BigDecimal::from(0) {
        return Err(Error::InvalidOption {
            option: format!("token_index {}", token_index),
        });
    }

    Ok(TokenKey::new(&contract_address, token_index))
}

/// Clamps paging parameters to `0..` and `1..=max_limit`.
pub fn page(skip: Option<i64>, limit: Option<i64>, max_limit: i64) -> (i64, i64) {
    let skip = skip.unwrap_or(0).max(0);
    let limit = limit.unwrap_or(max_limit).clamp(1, max_limit);

    (skip, limit)
}
