//! Database migration system
//!
//! Tracks schema versions and applies migrations in order.

use rusqlite::Connection;
use tracing::{info, instrument};

use crate::error::Result;

/// A database migration
pub struct Migration {
    /// Version number (must be sequential starting from 1)
    pub version: u32,
    /// Description of what this migration does
    pub description: &'static str,
    /// SQL to run for this migration
    pub sql: &'static str,
}

/// All migrations in order
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema",
        sql: r#"
            -- User profiles (identity/credentials live in the auth service)
            CREATE TABLE IF NOT EXISTS users (
                uid TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                bio TEXT NOT NULL DEFAULT '',
                phone TEXT NOT NULL DEFAULT '',
                avatar_id INTEGER NOT NULL DEFAULT 0,
                show_contact INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            -- Lobby aggregate roots
            CREATE TABLE IF NOT EXISTS lobbies (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                location TEXT NOT NULL,
                category TEXT NOT NULL,
                event_date TEXT NOT NULL,
                skill TEXT,
                max_players INTEGER NOT NULL,
                host_id TEXT NOT NULL,
                host_name TEXT NOT NULL,
                host_phone TEXT,
                host_email TEXT,
                created_at TEXT NOT NULL
            );

            -- Player rosters; position preserves roster order
            CREATE TABLE IF NOT EXISTS lobby_players (
                lobby_id TEXT NOT NULL,
                uid TEXT NOT NULL,
                display_name TEXT NOT NULL,
                joined_at TEXT NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (lobby_id, uid),
                FOREIGN KEY (lobby_id) REFERENCES lobbies(id) ON DELETE CASCADE
            );

            -- Pending join requests; position preserves queue order
            CREATE TABLE IF NOT EXISTS lobby_requests (
                lobby_id TEXT NOT NULL,
                uid TEXT NOT NULL,
                display_name TEXT NOT NULL,
                phone TEXT,
                email TEXT,
                message TEXT,
                requested_at TEXT NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (lobby_id, uid),
                FOREIGN KEY (lobby_id) REFERENCES lobbies(id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 2,
        description: "Add indexes for query performance",
        sql: r#"
            CREATE INDEX IF NOT EXISTS idx_lobbies_host ON lobbies(host_id);
            CREATE INDEX IF NOT EXISTS idx_lobbies_created ON lobbies(created_at);

            CREATE INDEX IF NOT EXISTS idx_lobby_players_uid ON lobby_players(uid);
            CREATE INDEX IF NOT EXISTS idx_lobby_requests_uid ON lobby_requests(uid);
        "#,
    },
];

/// Initialize the migrations table
fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version
fn get_current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .unwrap_or(None);
    Ok(version.unwrap_or(0))
}

/// Record that a migration was applied
fn record_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            migration.version,
            migration.description,
            chrono::Utc::now().to_rfc3339()
        ],
    )?;
    Ok(())
}

/// Run all pending migrations
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> Result<()> {
    init_migrations_table(conn)?;

    let current_version = get_current_version(conn)?;
    info!(current_version, "Checking for pending migrations");

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                description = migration.description,
                "Applying migration"
            );

            conn.execute_batch(migration.sql)?;
            record_migration(conn, migration)?;

            info!(version = migration.version, "Migration complete");
        }
    }

    let new_version = get_current_version(conn)?;
    if new_version > current_version {
        info!(
            from = current_version,
            to = new_version,
            "Database schema updated"
        );
    }

    Ok(())
}
