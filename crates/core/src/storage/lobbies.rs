//! Lobby storage operations
//!
//! The lobby aggregate (row plus roster and request queue) is always
//! read and written as a unit inside one transaction.

use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_category, parse_datetime, parse_uuid, OptionalExt};
use super::traits::Disposition;
use crate::error::{Error, Result};
use crate::invariants::assert_lobby_invariants;
use crate::models::{HostContact, JoinRequest, Lobby, Member};

pub struct LobbyStore<'a> {
    conn: &'a Connection,
}

impl<'a> LobbyStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a freshly created lobby with its roster
    #[instrument(skip(self, lobby), fields(lobby_id = %lobby.id, title = %lobby.title))]
    pub fn create(&self, lobby: &Lobby) -> Result<()> {
        assert_lobby_invariants(lobby);

        let tx = begin_immediate(self.conn)?;
        tx.execute(
            "INSERT INTO lobbies (id, title, description, location, category, event_date, skill,
                                  max_players, host_id, host_name, host_phone, host_email, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                lobby.id.to_string(),
                lobby.title,
                lobby.description,
                lobby.location,
                lobby.category.as_str(),
                lobby.event_date.to_rfc3339(),
                lobby.skill,
                lobby.max_players,
                lobby.host_id.to_string(),
                lobby.host_name,
                lobby.host_contact.phone,
                lobby.host_contact.email,
                lobby.created_at.to_rfc3339(),
            ],
        )?;
        insert_children(&tx, lobby)?;
        commit(tx)
    }

    /// Find a lobby by id
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Lobby>> {
        load_lobby(self.conn, id)
    }

    /// All lobbies, newest first
    pub fn list(&self) -> Result<Vec<Lobby>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM lobbies ORDER BY created_at DESC")?;
        let ids = stmt
            .query_map([], |row| parse_uuid(&row.get::<_, String>(0)?))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        self.load_all(ids)
    }

    /// Lobbies where the uid is host, player, or requester, newest first
    pub fn list_for_uid(&self, uid: Uuid) -> Result<Vec<Lobby>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM lobbies
             WHERE host_id = ?1
                OR id IN (SELECT lobby_id FROM lobby_players WHERE uid = ?1)
                OR id IN (SELECT lobby_id FROM lobby_requests WHERE uid = ?1)
             ORDER BY created_at DESC",
        )?;
        let ids = stmt
            .query_map(params![uid.to_string()], |row| {
                parse_uuid(&row.get::<_, String>(0)?)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        self.load_all(ids)
    }

    /// Delete a lobby; roster and requests go with it via FK cascade
    #[instrument(skip(self))]
    pub fn delete(&self, id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM lobbies WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(())
    }

    /// Apply a compound mutation inside one IMMEDIATE transaction.
    ///
    /// See `LobbyRepository::update_lobby_with` for the contract.
    pub fn update_with(
        &self,
        id: Uuid,
        apply: &mut dyn FnMut(&mut Lobby) -> Result<Disposition>,
    ) -> Result<Option<Lobby>> {
        let tx = begin_immediate(self.conn)?;

        let Some(mut lobby) = load_lobby(&tx, id)? else {
            return Err(Error::NotFound(format!("lobby {id}")));
        };

        // An error here drops the transaction, rolling everything back
        match apply(&mut lobby)? {
            Disposition::Persist => {
                save_lobby(&tx, &lobby)?;
                commit(tx)?;
                Ok(Some(lobby))
            }
            Disposition::Delete => {
                tx.execute(
                    "DELETE FROM lobbies WHERE id = ?1",
                    params![id.to_string()],
                )?;
                commit(tx)?;
                Ok(None)
            }
        }
    }

    fn load_all(&self, ids: Vec<Uuid>) -> Result<Vec<Lobby>> {
        let mut lobbies = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(lobby) = load_lobby(self.conn, id)? {
                lobbies.push(lobby);
            }
        }
        Ok(lobbies)
    }
}

/// Start an IMMEDIATE transaction, surfacing contention as `Conflict`
fn begin_immediate(conn: &Connection) -> Result<Transaction<'_>> {
    Transaction::new_unchecked(conn, TransactionBehavior::Immediate).map_err(map_contention)
}

fn commit(tx: Transaction<'_>) -> Result<()> {
    tx.commit().map_err(map_contention)
}

/// Translate SQLite write contention into the retryable `Conflict` kind
fn map_contention(e: rusqlite::Error) -> Error {
    match &e {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::DatabaseBusy
                || failure.code == rusqlite::ErrorCode::DatabaseLocked =>
        {
            Error::Conflict
        }
        _ => Error::Database(e),
    }
}

/// Load the full aggregate: lobby row, roster, request queue
fn load_lobby(conn: &Connection, id: Uuid) -> Result<Option<Lobby>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, description, location, category, event_date, skill, max_players,
                host_id, host_name, host_phone, host_email, created_at
         FROM lobbies WHERE id = ?1",
    )?;

    let shell = stmt
        .query_row(params![id.to_string()], |row| {
            Ok(Lobby {
                id: parse_uuid(&row.get::<_, String>(0)?)?,
                title: row.get(1)?,
                description: row.get(2)?,
                location: row.get(3)?,
                category: parse_category(&row.get::<_, String>(4)?)?,
                event_date: parse_datetime(&row.get::<_, String>(5)?)?,
                skill: row.get(6)?,
                max_players: row.get(7)?,
                host_id: parse_uuid(&row.get::<_, String>(8)?)?,
                host_name: row.get(9)?,
                host_contact: HostContact::new(row.get(10)?, row.get(11)?),
                players: Vec::new(),
                requests: Vec::new(),
                created_at: parse_datetime(&row.get::<_, String>(12)?)?,
            })
        })
        .optional()?;

    let Some(mut lobby) = shell else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT uid, display_name, joined_at FROM lobby_players
         WHERE lobby_id = ?1 ORDER BY position",
    )?;
    lobby.players = stmt
        .query_map(params![id.to_string()], |row| {
            Ok(Member {
                uid: parse_uuid(&row.get::<_, String>(0)?)?,
                display_name: row.get(1)?,
                joined_at: parse_datetime(&row.get::<_, String>(2)?)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT uid, display_name, phone, email, message, requested_at FROM lobby_requests
         WHERE lobby_id = ?1 ORDER BY position",
    )?;
    lobby.requests = stmt
        .query_map(params![id.to_string()], |row| {
            Ok(JoinRequest {
                uid: parse_uuid(&row.get::<_, String>(0)?)?,
                display_name: row.get(1)?,
                phone: row.get(2)?,
                email: row.get(3)?,
                message: row.get(4)?,
                requested_at: parse_datetime(&row.get::<_, String>(5)?)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Some(lobby))
}

/// Write the mutated aggregate back: update the row, rewrite the lists
fn save_lobby(conn: &Connection, lobby: &Lobby) -> Result<()> {
    assert_lobby_invariants(lobby);

    conn.execute(
        "UPDATE lobbies SET title = ?1, description = ?2, location = ?3, category = ?4,
                            event_date = ?5, skill = ?6, max_players = ?7, host_id = ?8,
                            host_name = ?9, host_phone = ?10, host_email = ?11
         WHERE id = ?12",
        params![
            lobby.title,
            lobby.description,
            lobby.location,
            lobby.category.as_str(),
            lobby.event_date.to_rfc3339(),
            lobby.skill,
            lobby.max_players,
            lobby.host_id.to_string(),
            lobby.host_name,
            lobby.host_contact.phone,
            lobby.host_contact.email,
            lobby.id.to_string(),
        ],
    )?;

    conn.execute(
        "DELETE FROM lobby_players WHERE lobby_id = ?1",
        params![lobby.id.to_string()],
    )?;
    conn.execute(
        "DELETE FROM lobby_requests WHERE lobby_id = ?1",
        params![lobby.id.to_string()],
    )?;
    insert_children(conn, lobby)
}

fn insert_children(conn: &Connection, lobby: &Lobby) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO lobby_players (lobby_id, uid, display_name, joined_at, position)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (position, player) in lobby.players.iter().enumerate() {
        stmt.execute(params![
            lobby.id.to_string(),
            player.uid.to_string(),
            player.display_name,
            player.joined_at.to_rfc3339(),
            position as i64,
        ])?;
    }

    let mut stmt = conn.prepare(
        "INSERT INTO lobby_requests (lobby_id, uid, display_name, phone, email, message, requested_at, position)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    for (position, request) in lobby.requests.iter().enumerate() {
        stmt.execute(params![
            lobby.id.to_string(),
            request.uid.to_string(),
            request.display_name,
            request.phone,
            request.email,
            request.message,
            request.requested_at.to_rfc3339(),
            position as i64,
        ])?;
    }

    Ok(())
}
