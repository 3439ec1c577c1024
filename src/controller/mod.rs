//! API controller modules

pub mod activities;
pub mod misc;
pub mod tokens;
