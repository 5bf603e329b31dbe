//! SQLite storage layer for Muster

mod lobbies;
mod migrations;
mod parse;
mod traits;
mod users;

use std::path::Path;

use rusqlite::Connection;
use tracing::instrument;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Lobby, UserProfile};

pub use lobbies::LobbyStore;
pub use traits::{Disposition, LobbyRepository, Storage, UserRepository};
pub use users::UserStore;

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    /// Get lobby store
    pub fn lobbies(&self) -> LobbyStore<'_> {
        LobbyStore::new(&self.conn)
    }

    /// Get user store
    pub fn users(&self) -> UserStore<'_> {
        UserStore::new(&self.conn)
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl LobbyRepository for Database {
    fn insert_lobby(&self, lobby: &Lobby) -> Result<()> {
        self.lobbies().create(lobby)
    }

    fn find_lobby_by_id(&self, id: Uuid) -> Result<Option<Lobby>> {
        self.lobbies().find_by_id(id)
    }

    fn list_lobbies(&self) -> Result<Vec<Lobby>> {
        self.lobbies().list()
    }

    fn list_lobbies_for_uid(&self, uid: Uuid) -> Result<Vec<Lobby>> {
        self.lobbies().list_for_uid(uid)
    }

    fn delete_lobby(&self, id: Uuid) -> Result<()> {
        self.lobbies().delete(id)
    }

    fn update_lobby_with(
        &self,
        id: Uuid,
        apply: &mut dyn FnMut(&mut Lobby) -> Result<Disposition>,
    ) -> Result<Option<Lobby>> {
        self.lobbies().update_with(id, apply)
    }
}

impl UserRepository for Database {
    fn upsert_profile(&self, profile: &UserProfile) -> Result<()> {
        self.users().upsert(profile)
    }

    fn find_profile(&self, uid: Uuid) -> Result<Option<UserProfile>> {
        self.users().find_by_uid(uid)
    }

    fn delete_profile(&self, uid: Uuid) -> Result<()> {
        self.users().delete(uid)
    }
}
