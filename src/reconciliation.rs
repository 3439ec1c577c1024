//! Token price reconciliation
//!
//! Turns a batch of listing activities into the token rows that have to be
//! created or updated so that every tracked NFT carries the lowest price among
//! its currently active listings. The engine only reads through
//! [`TokenStore`] and [`ActivityQuery`]; nothing is written until
//! [`Reconciliation::persist`] is called with the computed [`TokenChanges`].

use std::{
    collections::{HashMap, HashSet},
    str::FromStr,
};

use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero as _};
use chrono::Utc;
use tracing::{debug, warn};

use crate::{
    error::Error,
    model::{Activity, Token, TokenKey},
};

/// Storage of the derived token table.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Every stored token whose key is in `keys`, fetched with one query.
    async fn find_by_keys(&self, keys: &[TokenKey])
        -> Result<Vec<Token>, Error>;

    async fn create_many(&self, tokens: &[Token]) -> Result<Vec<Token>, Error>;

    /// Upsert keyed by (contract_address, token_index).
    async fn update_many(&self, tokens: &[Token]) -> Result<u64, Error>;
}

/// Read access to every ingested activity, not only the current batch.
#[async_trait]
pub trait ActivityQuery: Send + Sync {
    /// Activities of `key` whose listing has no expiry or expires after `as_of`.
    async fn find_active(
        &self,
        key: &TokenKey,
        as_of: i64,
    ) -> Result<Vec<Activity>, Error>;
}

/// How a listing without a price takes part in the lowest-price search over
/// the remaining active listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingPricePolicy {
    /// Counts as a listing at price `0`.
    #[default]
    Zero,
    /// Is left out of the search.
    Exclude,
}

impl MissingPricePolicy {
    fn listing_price(&self, activity: &Activity) -> Option<BigDecimal> {
        match (&activity.listing_price, self) {
            (Some(price), _) => Some(price.to_owned()),
            (None, MissingPricePolicy::Zero) => Some(BigDecimal::zero()),
            (None, MissingPricePolicy::Exclude) => None,
        }
    }
}

impl FromStr for MissingPricePolicy {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "zero" => Ok(MissingPricePolicy::Zero),
            "exclude" => Ok(MissingPricePolicy::Exclude),
            other => Err(Error::InvalidOption {
                option: format!(
                    "missing price policy '{}'. Valid options: zero, exclude",
                    other
                ),
            }),
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct TokenChanges {
    /// Tokens seen for the first time, in first-seen order, carrying the
    /// state left by the last activity of the batch that touched them.
    pub tokens_to_create: Vec<Token>,
    /// Stored tokens whose price or governing expiry changed.
    pub tokens_to_update: Vec<Token>,
    /// Activities ignored for lacking a contract address or token index.
    pub skipped: usize,
}

impl TokenChanges {
    pub fn is_empty(&self) -> bool {
        self.tokens_to_create.is_empty() && self.tokens_to_update.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct AppliedChanges {
    pub created: Vec<Token>,
    pub updated: u64,
    pub skipped: usize,
}

type PriceState = (Option<BigDecimal>, Option<i64>);

pub struct Reconciliation<'a, T, A> {
    tokens: &'a T,
    activities: &'a A,
    policy: MissingPricePolicy,
}

impl<'a, T, A> Reconciliation<'a, T, A>
where
    T: TokenStore,
    A: ActivityQuery,
{
    pub fn new(
        tokens: &'a T,
        activities: &'a A,
        policy: MissingPricePolicy,
    ) -> Self {
        Reconciliation {
            tokens,
            activities,
            policy,
        }
    }

    pub async fn reconcile(
        &self,
        activities: &[Activity],
    ) -> Result<TokenChanges, Error> {
        self.reconcile_at(activities, Utc::now().timestamp()).await
    }

    /// Same as [`Self::reconcile`] with an explicit evaluation time in unix
    /// seconds. Every expiry comparison of the batch uses this one instant.
    pub async fn reconcile_at(
        &self,
        activities: &[Activity],
        now: i64,
    ) -> Result<TokenChanges, Error> {
        let mut changes = TokenChanges::default();
        let mut batch = Vec::with_capacity(activities.len());
        let mut keys = Vec::new();
        let mut distinct = HashSet::new();

        for activity in activities {
            match activity.key() {
                Some(key) => {
                    if distinct.insert(key.clone()) {
                        keys.push(key.clone());
                    }
                    batch.push((key, activity));
                },
                None => {
                    warn!(
                        "Skipping activity {:?} (order {:?}): missing contract address or token index",
                        activity.id, activity.order_id
                    );
                    changes.skipped += 1;
                },
            }
        }

        if keys.is_empty() {
            return Ok(changes);
        }

        let stored = self
            .tokens
            .find_by_keys(&keys)
            .await
            .map_err(|e| Error::LookupFailure(e.to_string()))?;

        let mut index: HashMap<TokenKey, Token> = stored
            .into_iter()
            .map(|token| (token.key(), token))
            .collect();
        let mut created: Vec<TokenKey> = Vec::new();
        let mut updated: Vec<TokenKey> = Vec::new();
        let mut touched: HashSet<TokenKey> = HashSet::new();

        for (key, activity) in batch {
            let Some(token) = index.get_mut(&key) else {
                let current_price = if activity.is_active(now) {
                    activity.listing_price.to_owned()
                } else {
                    None
                };

                debug!("New token {} at {:?}", key, current_price);
                index.insert(
                    key.clone(),
                    Token::new(key.clone(), current_price, activity.listing_to),
                );
                touched.insert(key.clone());
                created.push(key);
                continue;
            };

            let (current_price, listing_to) =
                if activity.is_active(now) && !token.is_expired(now) {
                    lower_price(token, activity)
                } else {
                    self.lowest_active(&key, activity, now).await?
                };

            if token.current_price == current_price
                && token.listing_to == listing_to
            {
                continue;
            }

            debug!(
                "Token {} price {:?} -> {:?}",
                key, token.current_price, current_price
            );
            token.current_price = current_price;
            token.listing_to = listing_to;

            if touched.insert(key.clone()) {
                updated.push(key);
            }
        }

        changes.tokens_to_create = created
            .iter()
            .filter_map(|key| index.remove(key))
            .collect();
        changes.tokens_to_update = updated
            .iter()
            .filter_map(|key| index.remove(key))
            .collect();

        Ok(changes)
    }

    /// Recomputes the price from every listing of `key` still active at `now`.
    /// The incoming activity competes as well when it is active itself, so a
    /// listing that is not stored yet is never lost.
    async fn lowest_active(
        &self,
        key: &TokenKey,
        activity: &Activity,
        now: i64,
    ) -> Result<PriceState, Error> {
        let mut candidates = self
            .activities
            .find_active(key, now)
            .await
            .map_err(|e| Error::LookupFailure(e.to_string()))?;

        if activity.is_active(now) {
            candidates.push(activity.to_owned());
        }

        let mut lowest: Option<(BigDecimal, Option<i64>)> = None;

        for candidate in &candidates {
            let Some(price) = self.policy.listing_price(candidate) else {
                continue;
            };

            if lowest.as_ref().map_or(true, |(low, _)| price < *low) {
                lowest = Some((price, candidate.listing_to));
            }
        }

        Ok(match lowest {
            Some((price, listing_to)) => (Some(price), listing_to),
            None => (None, None),
        })
    }

    pub async fn persist(
        &self,
        changes: TokenChanges,
    ) -> Result<AppliedChanges, Error> {
        let mut applied = AppliedChanges {
            skipped: changes.skipped,
            ..AppliedChanges::default()
        };

        if !changes.tokens_to_create.is_empty() {
            applied.created = self
                .tokens
                .create_many(&changes.tokens_to_create)
                .await
                .map_err(|e| Error::PersistenceFailure(e.to_string()))?;
        }

        if !changes.tokens_to_update.is_empty() {
            applied.updated = self
                .tokens
                .update_many(&changes.tokens_to_update)
                .await
                .map_err(|e| Error::PersistenceFailure(e.to_string()))?;
        }

        Ok(applied)
    }

    pub async fn apply(
        &self,
        activities: &[Activity],
    ) -> Result<AppliedChanges, Error> {
        let changes = self.reconcile(activities).await?;
        self.persist(changes).await
    }
}

/// An active listing only ever pulls the price down; equal prices keep the
/// current state.
fn lower_price(token: &Token, activity: &Activity) -> PriceState {
    match (&activity.listing_price, &token.current_price) {
        (Some(price), Some(current)) if price < current => {
            (Some(price.to_owned()), activity.listing_to)
        },
        (Some(price), None) => (Some(price.to_owned()), activity.listing_to),
        _ => (token.current_price.to_owned(), token.listing_to),
    }
}
