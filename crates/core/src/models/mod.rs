//! Data models for Muster

mod lobby;
mod user;

pub use lobby::*;
pub use user::*;
