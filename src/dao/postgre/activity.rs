use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Error, QueryBuilder};

use crate::{
    model::{Activity, Table, TokenKey},
    reconciliation::ActivityQuery,
};

use super::DataBase;

impl Table<Activity> {
    /// Inserts the batch and returns only the rows that were new. Orders
    /// already stored under the same `order_id` are left untouched.
    pub async fn insert_many(
        &self,
        data: &[Activity],
    ) -> Result<Vec<Activity>, Error> {
        const SQL: &str = r#"
        INSERT INTO "activity" (
            "order_id",
            "contract_address",
            "token_index",
            "listing_price",
            "maker",
            "listing_from",
            "listing_to",
            "event_timestamp"
        )
        "#;

        if data.is_empty() {
            return Ok(vec![]);
        }

        let mut query_builder: QueryBuilder<DataBase> = QueryBuilder::new(SQL);

        query_builder
            .push_values(data, |mut b, activity| {
                b.push_bind(&activity.order_id)
                    .push_bind(&activity.contract_address)
                    .push_bind(&activity.token_index)
                    .push_bind(&activity.listing_price)
                    .push_bind(&activity.maker)
                    .push_bind(activity.listing_from)
                    .push_bind(activity.listing_to)
                    .push_bind(activity.event_timestamp);
            })
            .push(r#" ON CONFLICT ("order_id") DO NOTHING RETURNING *"#);

        query_builder
            .build_query_as::<Activity>()
            .persistent(false)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn get_unreconciled(
        &self,
        limit: i64,
    ) -> Result<Vec<Activity>, Error> {
        const SQL: &str = r#"
        SELECT *
        FROM "activity"
        WHERE "reconciled_at" IS NULL
        ORDER BY "id" ASC
        LIMIT $1
        "#;

        sqlx::query_as(SQL)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn count_unreconciled(&self) -> Result<i64, Error> {
        const SQL: &str = r#"
        SELECT
            COUNT(*)
        FROM "activity"
        WHERE "reconciled_at" IS NULL
        "#;

        sqlx::query_as(SQL)
            .fetch_one(&self.pool)
            .await
            .map(|(result,)| result)
    }

    pub async fn mark_reconciled(
        &self,
        ids: &[i64],
        at: DateTime<Utc>,
    ) -> Result<u64, Error> {
        const SQL: &str = r#"
        UPDATE "activity"
        SET "reconciled_at" = $1
        WHERE "id" = ANY($2)
        "#;

        if ids.is_empty() {
            return Ok(0);
        }

        sqlx::query(SQL)
            .bind(at)
            .bind(ids)
            .execute(&self.pool)
            .await
            .map(|result| result.rows_affected())
    }

    pub async fn get_active(
        &self,
        key: &TokenKey,
        as_of: i64,
    ) -> Result<Vec<Activity>, Error> {
        const SQL: &str = r#"
        SELECT *
        FROM "activity"
        WHERE
            "contract_address" = $1 AND
            "token_index" = $2 AND
            ("listing_to" IS NULL OR "listing_to" > $3)
        ORDER BY "id" ASC
        "#;

        sqlx::query_as(SQL)
            .bind(&key.contract_address)
            .bind(&key.token_index)
            .bind(as_of)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn get_by_token(
        &self,
        key: &TokenKey,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Activity>, Error> {
        const SQL: &str = r#"
        SELECT *
        FROM "activity"
        WHERE
            "contract_address" = $1 AND
            "token_index" = $2
        ORDER BY "event_timestamp" DESC
        OFFSET $3
        LIMIT $4
        "#;

        sqlx::query_as(SQL)
            .bind(&key.contract_address)
            .bind(&key.token_index)
            .bind(skip)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }
}

#[async_trait]
impl ActivityQuery for Table<Activity> {
    async fn find_active(
        &self,
        key: &TokenKey,
        as_of: i64,
    ) -> Result<Vec<Activity>, crate::error::Error> {
        Ok(self.get_active(key, as_of).await?)
    }
}
