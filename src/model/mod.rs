//! Database models module
//!
//! Entity structs for the listing tables plus the generic `Table` handle
//! that the dao layer implements queries on.

mod action_history;
mod activity;
mod table;
mod token;

pub use action_history::{Action_History, Actions};
pub use activity::{is_listing_active, Activity};
pub use table::Table;
pub use token::{Token, TokenKey};
