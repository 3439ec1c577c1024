use std::{collections::HashSet, str::FromStr};

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use tokio::{time, time::Duration};
use tracing::{error, info, warn};

use crate::{
    configuration::{AppState, State},
    error::Error,
    model::{Action_History, Actions, Activity},
    types::{AskEvent, AskOrder},
};

const NEW_ORDER: &str = "new-order";

/// Fetches up to `events_max_pages` pages of ask events and stores the
/// `new-order` ones. Returns how many activities were new to the store.
pub async fn fetch_insert(app_state: AppState<State>) -> Result<usize, Error> {
    let max_pages = app_state.config.events_max_pages.max(1);
    let mut continuation: Option<String> = None;
    let mut inserted = 0;

    for _ in 0..max_pages {
        let response = app_state
            .http
            .get_ask_events(continuation.as_deref())
            .await?;

        let activities = parse_events(response.events, Utc::now());
        let saved = app_state
            .database
            .activity
            .insert_many(&activities)
            .await?;
        inserted += saved.len();

        match response.continuation {
            Some(next) if !next.is_empty() => continuation = Some(next),
            _ => break,
        }
    }

    if inserted > 0 {
        info!("Ingested {} new activities", inserted);

        app_state
            .database
            .action_history
            .insert(Action_History {
                action_type: Actions::IngestAction.to_string(),
                created_at: Utc::now(),
            })
            .await?;
    }

    Ok(inserted)
}

pub async fn ingest_task(app_state: AppState<State>) -> Result<(), Error> {
    let mut interval =
        time::interval(Duration::from_secs(app_state.config.ingest_interval));
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    tokio::spawn(async move {
        loop {
            interval.tick().await;
            let app = app_state.clone();
            if let Err(error) = fetch_insert(app).await {
                error!("Task error {}", error);
            };
        }
    })
    .await?
}

/// Keeps `new-order` events only, one activity per order id.
pub fn parse_events(
    events: Vec<AskEvent>,
    fetched_at: DateTime<Utc>,
) -> Vec<Activity> {
    let mut seen = HashSet::new();

    events
        .into_iter()
        .filter(|item| item.event.kind == NEW_ORDER)
        .filter(|item| match &item.order.id {
            Some(id) => seen.insert(id.to_owned()),
            None => true,
        })
        .map(|item| {
            let event_timestamp = item.event.created_at.unwrap_or(fetched_at);
            parse_order(item.order, event_timestamp)
        })
        .collect()
}

fn parse_order(order: AskOrder, event_timestamp: DateTime<Utc>) -> Activity {
    let token_id = order
        .criteria
        .and_then(|criteria| criteria.data)
        .and_then(|data| data.token)
        .and_then(|token| token.token_id);

    let token_index = token_id.and_then(|value| {
        match BigDecimal::from_str(&value) {
            Ok(index) if index.is_integer() => Some(index.with_scale(0)),
            _ => {
                warn!("Order {:?} has invalid token id {}", order.id, value);
                None
            },
        }
    });

    let listing_price = order
        .price
        .and_then(|price| price.amount)
        .and_then(|amount| amount.native)
        .and_then(|native| BigDecimal::from_str(&native.to_string()).ok());

    Activity {
        id: None,
        order_id: order.id,
        contract_address: order
            .contract
            .map(|contract| contract.trim().to_lowercase())
            .filter(|contract| !contract.is_empty()),
        token_index,
        listing_price,
        maker: order.maker.unwrap_or_default().to_lowercase(),
        listing_from: order
            .valid_from
            .unwrap_or_else(|| event_timestamp.timestamp()),
        listing_to: order.valid_to.or(order.valid_until),
        event_timestamp,
        reconciled_at: None,
    }
}
