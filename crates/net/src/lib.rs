//! Muster Network Library
//!
//! TCP transport for the lobby change feed.
//!
//! # Architecture
//!
//! - **FeedServer**: accepts subscribers and fans out the payload-free
//!   "lobbies changed" signal
//! - **ChangeFeed**: sync [`muster_core::Notifier`] handle that feeds
//!   the server, injected into the membership engine
//! - **FeedClient**: subscribes and surfaces signals as events
//! - **Protocol**: length-prefixed JSON messages
//!
//! # Usage
//!
//! ```ignore
//! // Serve the feed and wire it into the engine
//! let server = FeedServer::start(7332).await?;
//! let engine = MembershipEngine::new(db, server.feed());
//!
//! // Clients subscribe and re-fetch on every signal
//! let mut client = FeedClient::connect(addr, client_id, "alice".into()).await?;
//! while let Some(event) = client.next_event().await {
//!     match event {
//!         FeedEvent::Changed => { /* re-fetch lobby list */ }
//!         _ => {}
//!     }
//! }
//! ```

pub mod client;
pub mod error;
mod frame;
pub mod protocol;
pub mod server;

pub use client::{FeedClient, FeedEvent};
pub use error::{Error, Result};
pub use protocol::Message;
pub use server::{ChangeFeed, FeedServer};

/// Default port for the Muster change feed
pub const DEFAULT_PORT: u16 = 7332;
