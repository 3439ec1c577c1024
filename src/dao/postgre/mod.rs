pub use self::types::{DataBase, PoolOption, PoolType};

mod action_history;
mod activity;
mod token;
mod types;
