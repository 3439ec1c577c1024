use chrono::Utc;
use tokio::{time, time::Duration};
use tracing::{error, info};

use crate::{
    configuration::{AppState, State},
    error::Error,
    model::{Action_History, Actions},
    reconciliation::Reconciliation,
};

/// Reconciles the oldest `batch_size` activities that were not reconciled
/// yet. Returns the number of activities taken from the queue.
pub async fn reconcile_batch(
    app_state: &AppState<State>,
    batch_size: i64,
) -> Result<usize, Error> {
    let database = &app_state.database;
    let activities = database
        .activity
        .get_unreconciled(batch_size)
        .await
        .map_err(|e| Error::LookupFailure(e.to_string()))?;

    if activities.is_empty() {
        return Ok(0);
    }

    let engine = Reconciliation::new(
        &database.token,
        &database.activity,
        app_state.config.missing_price_policy,
    );
    let applied = engine.apply(&activities).await?;

    let ids: Vec<i64> = activities.iter().filter_map(|item| item.id).collect();
    let timestamp = Utc::now();

    database
        .activity
        .mark_reconciled(&ids, timestamp)
        .await
        .map_err(|e| Error::PersistenceFailure(e.to_string()))?;

    database
        .action_history
        .insert(Action_History {
            action_type: Actions::ReconcileAction.to_string(),
            created_at: timestamp,
        })
        .await?;

    info!(
        "Reconciled {} activities: {} tokens created, {} updated, {} skipped",
        activities.len(),
        applied.created.len(),
        applied.updated,
        applied.skipped
    );

    Ok(activities.len())
}

/// Runs batches until the queue is empty.
pub async fn drain(
    app_state: &AppState<State>,
    batch_size: i64,
) -> Result<usize, Error> {
    let mut total = 0;

    loop {
        let processed = reconcile_batch(app_state, batch_size).await?;
        if processed == 0 {
            break;
        }
        total += processed;
    }

    Ok(total)
}

pub async fn reconcile_task(app_state: AppState<State>) -> Result<(), Error> {
    let mut interval = time::interval(Duration::from_secs(
        app_state.config.reconcile_interval,
    ));
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    tokio::spawn(async move {
        loop {
            interval.tick().await;
            let batch_size = app_state.config.reconcile_batch_size;
            if let Err(error) = reconcile_batch(&app_state, batch_size).await {
                error!("Task error {}", error);
            };
        }
    })
    .await?
}
