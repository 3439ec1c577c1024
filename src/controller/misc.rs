//! Service metadata endpoints

use actix_web::{get, web, Responder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    configuration::{AppState, State},
    error::Error,
    model::Actions,
};

// =============================================================================
// Version
// =============================================================================

#[get("/version")]
pub async fn version() -> Result<impl Responder, Error> {
    const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

    Ok(web::Json(VersionResponse { version: VERSION }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse<'a> {
    pub version: Option<&'a str>,
}

// =============================================================================
// Status
// =============================================================================

#[get("/status")]
pub async fn status(
    state: web::Data<AppState<State>>,
) -> Result<impl Responder, Error> {
    let database = &state.database;

    let (last_ingest, last_reconcile, unreconciled) = tokio::try_join!(
        database.action_history.get_last_by_type(Actions::IngestAction),
        database
            .action_history
            .get_last_by_type(Actions::ReconcileAction),
        database.activity.count_unreconciled(),
    )?;

    Ok(web::Json(StatusResponse {
        last_ingest: last_ingest.map(|item| item.created_at),
        last_reconcile: last_reconcile.map(|item| item.created_at),
        unreconciled,
        sync_enabled: state.config.enable_sync,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub last_ingest: Option<DateTime<Utc>>,
    pub last_reconcile: Option<DateTime<Utc>>,
    pub unreconciled: i64,
    pub sync_enabled: bool,
}
