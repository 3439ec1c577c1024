use async_trait::async_trait;
use sqlx::{Error, QueryBuilder};

use crate::{
    model::{Table, Token, TokenKey},
    reconciliation::TokenStore,
};

use super::DataBase;

impl Table<Token> {
    /// Loads every stored token matching one of `keys` with a single query.
    pub async fn get_by_keys(
        &self,
        keys: &[TokenKey],
    ) -> Result<Vec<Token>, Error> {
        const SQL: &str = r#"
        SELECT *
        FROM "token"
        WHERE ("contract_address", "token_index") IN
        "#;

        if keys.is_empty() {
            return Ok(vec![]);
        }

        let mut query_builder: QueryBuilder<DataBase> = QueryBuilder::new(SQL);

        query_builder.push_tuples(keys, |mut b, key| {
            b.push_bind(&key.contract_address)
                .push_bind(&key.token_index);
        });

        query_builder
            .build_query_as::<Token>()
            .persistent(false)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn insert_many(
        &self,
        data: &[Token],
    ) -> Result<Vec<Token>, Error> {
        const SQL: &str = r#"
        INSERT INTO "token" (
            "contract_address",
            "token_index",
            "current_price",
            "listing_to"
        )
        "#;

        if data.is_empty() {
            return Ok(vec![]);
        }

        let mut query_builder: QueryBuilder<DataBase> = QueryBuilder::new(SQL);

        query_builder
            .push_values(data, |mut b, token| {
                b.push_bind(&token.contract_address)
                    .push_bind(&token.token_index)
                    .push_bind(&token.current_price)
                    .push_bind(token.listing_to);
            })
            .push(" RETURNING *");

        query_builder
            .build_query_as::<Token>()
            .persistent(false)
            .fetch_all(&self.pool)
            .await
    }

    /// Writes price state keyed by (contract_address, token_index), inserting
    /// rows that do not exist yet.
    pub async fn upsert_many(&self, data: &[Token]) -> Result<u64, Error> {
        const SQL: &str = r#"
        INSERT INTO "token" (
            "contract_address",
            "token_index",
            "current_price",
            "listing_to"
        )
        "#;

        if data.is_empty() {
            return Ok(0);
        }

        let mut query_builder: QueryBuilder<DataBase> = QueryBuilder::new(SQL);

        query_builder
            .push_values(data, |mut b, token| {
                b.push_bind(&token.contract_address)
                    .push_bind(&token.token_index)
                    .push_bind(&token.current_price)
                    .push_bind(token.listing_to);
            })
            .push(
                r#"
                ON CONFLICT ("contract_address", "token_index") DO UPDATE SET
                    "current_price" = EXCLUDED."current_price",
                    "listing_to" = EXCLUDED."listing_to"
                "#,
            );

        query_builder
            .build()
            .persistent(false)
            .execute(&self.pool)
            .await
            .map(|result| result.rows_affected())
    }

    pub async fn get_one(&self, key: &TokenKey) -> Result<Option<Token>, Error> {
        const SQL: &str = r#"
        SELECT *
        FROM "token"
        WHERE
            "contract_address" = $1 AND
            "token_index" = $2
        "#;

        sqlx::query_as(SQL)
            .bind(&key.contract_address)
            .bind(&key.token_index)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_all(
        &self,
        contract_address: Option<String>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Token>, Error> {
        match contract_address {
            Some(contract_address) => {
                sqlx::query_as(
                    r#"
                    SELECT *
                    FROM "token"
                    WHERE "contract_address" = $1
                    ORDER BY "token_index" ASC
                    OFFSET $2
                    LIMIT $3
                    "#,
                )
                .bind(contract_address)
                .bind(skip)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            },
            None => {
                sqlx::query_as(
                    r#"
                    SELECT *
                    FROM "token"
                    ORDER BY "id" ASC
                    OFFSET $1
                    LIMIT $2
                    "#,
                )
                .bind(skip)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            },
        }
    }
}

#[async_trait]
impl TokenStore for Table<Token> {
    async fn find_by_keys(
        &self,
        keys: &[TokenKey],
    ) -> Result<Vec<Token>, crate::error::Error> {
        Ok(self.get_by_keys(keys).await?)
    }

    async fn create_many(
        &self,
        tokens: &[Token],
    ) -> Result<Vec<Token>, crate::error::Error> {
        Ok(self.insert_many(tokens).await?)
    }

    async fn update_many(
        &self,
        tokens: &[Token],
    ) -> Result<u64, crate::error::Error> {
        Ok(self.upsert_many(tokens).await?)
    }
}
