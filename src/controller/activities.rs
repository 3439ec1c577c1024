use actix_web::{get, web, Responder};
use serde::Deserialize;

use crate::{
    configuration::{AppState, State},
    error::Error,
    helpers::{page, parse_token_key},
};

const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ActivitiesQuery {
    contract_address: String,
    token_index: String,
    skip: Option<i64>,
    limit: Option<i64>,
}

#[get("/activities")]
pub async fn index(
    state: web::Data<AppState<State>>,
    query: web::Query<ActivitiesQuery>,
) -> Result<impl Responder, Error> {
    let (skip, limit) = page(query.skip, query.limit, MAX_LIMIT);
    let key = parse_token_key(&query.contract_address, &query.token_index)?;

    let data = state
        .database
        .activity
        .get_by_token(&key, skip, limit)
        .await?;

    Ok(web::Json(data))
}
