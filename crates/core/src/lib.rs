//! Muster Core Library
//!
//! Lobby membership state machine, data models, change notification
//! capability, and storage for the Muster platform.

pub mod engine;
pub mod error;
pub mod invariants;
pub mod models;
pub mod notify;
pub mod storage;

pub use engine::MembershipEngine;
pub use error::{Error, Result};
pub use models::*;
pub use notify::{CountingNotifier, Notifier, NullNotifier};
pub use storage::{Database, Disposition, LobbyRepository, Storage, UserRepository};
