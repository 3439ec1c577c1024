//! Token endpoints

use actix_web::{get, web, Responder};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    configuration::{AppState, State},
    error::Error,
    helpers::{normalize_address, page, parse_token_key},
    model::{Activity, Token},
};

const MAX_LIMIT: i64 = 100;

// =============================================================================
// Tokens
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct TokensQuery {
    contract_address: Option<String>,
    skip: Option<i64>,
    limit: Option<i64>,
}

#[get("/tokens")]
pub async fn tokens(
    state: web::Data<AppState<State>>,
    query: web::Query<TokensQuery>,
) -> Result<impl Responder, Error> {
    let (skip, limit) = page(query.skip, query.limit, MAX_LIMIT);
    let contract_address = query
        .contract_address
        .as_deref()
        .map(normalize_address)
        .filter(|address| !address.is_empty());

    let data = state
        .database
        .token
        .get_all(contract_address, skip, limit)
        .await?;

    Ok(web::Json(data))
}

// =============================================================================
// Token
// =============================================================================

#[get("/tokens/{contract_address}/{token_index}")]
pub async fn token(
    state: web::Data<AppState<State>>,
    path: web::Path<(String, String)>,
) -> Result<impl Responder, Error> {
    let (contract_address, token_index) = path.into_inner();
    let key = parse_token_key(&contract_address, &token_index)?;

    let token = state
        .database
        .token
        .get_one(&key)
        .await?
        .ok_or_else(|| Error::NotFound(format!("token {}", key)))?;

    let active_listings = state
        .database
        .activity
        .get_active(&key, Utc::now().timestamp())
        .await?;

    Ok(web::Json(TokenResponse {
        token,
        active_listings,
    }))
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: Token,
    pub active_listings: Vec<Activity>,
}
