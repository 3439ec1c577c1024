use crate::{
    configuration::Config,
    dao::{PoolOption, PoolType},
    error::Error,
    model::{Action_History, Activity, Table, Token},
};

#[derive(Debug)]
pub struct DatabasePool {
    pub activity: Table<Activity>,
    pub token: Table<Token>,
    pub action_history: Table<Action_History>,
    pub pool: PoolType,
}

impl DatabasePool {
    pub async fn new(config: &Config) -> Result<DatabasePool, Error> {
        let pool = PoolOption::new()
            .max_connections(config.database_max_connections)
            .connect(config.database_url.as_str())
            .await?;

        Ok(DatabasePool {
            activity: Table::new(pool.clone()),
            token: Table::new(pool.clone()),
            action_history: Table::new(pool.clone()),
            pool,
        })
    }

    pub fn get_pool(&self) -> &PoolType {
        &self.pool
    }
}
