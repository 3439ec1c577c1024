//! Schema setup
//!
//! Every script is idempotent (`IF NOT EXISTS`) and runs in order on start.

use tracing::info;

use crate::{dao::PoolType, error::Error};

const MIGRATIONS: [(&str, &str); 3] = [
    (
        "activity",
        include_str!("../migration/postgresql/activity.sql"),
    ),
    ("token", include_str!("../migration/postgresql/token.sql")),
    (
        "action_history",
        include_str!("../migration/postgresql/action_history.sql"),
    ),
];

pub async fn run_migrations(pool: &PoolType) -> Result<(), Error> {
    for (name, sql) in MIGRATIONS {
        sqlx::raw_sql(sql).execute(pool).await?;
        info!("Applied migration {}", name);
    }

    Ok(())
}
