//! Storage repository traits
//!
//! These traits define the storage interface, allowing for different
//! implementations (SQLite, mock, future network backend).

use uuid::Uuid;

use crate::error::Result;
use crate::models::{Lobby, UserProfile};

/// What the store should do with a lobby once a compound mutation has run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Write the mutated aggregate back
    Persist,
    /// Remove the lobby entirely (disband, or leave-to-empty cascade)
    Delete,
}

/// Lobby repository operations
pub trait LobbyRepository {
    /// Insert a freshly created lobby
    fn insert_lobby(&self, lobby: &Lobby) -> Result<()>;

    /// Find a lobby by id
    fn find_lobby_by_id(&self, id: Uuid) -> Result<Option<Lobby>>;

    /// All lobbies, newest first
    fn list_lobbies(&self) -> Result<Vec<Lobby>>;

    /// Lobbies where the uid is host, player, or requester
    fn list_lobbies_for_uid(&self, uid: Uuid) -> Result<Vec<Lobby>>;

    /// Delete a lobby
    fn delete_lobby(&self, id: Uuid) -> Result<()>;

    /// Apply a compound mutation to one lobby as a single atomic unit.
    ///
    /// The aggregate is loaded, `apply` mutates it, and the result is
    /// written back (or the lobby deleted) inside one transaction; no
    /// other mutation of the same lobby may interleave. An error from
    /// `apply` rolls the transaction back and is returned unchanged.
    ///
    /// Errors with `NotFound` if the lobby is absent. Returns the
    /// persisted snapshot, or `None` when `apply` chose `Delete`.
    /// Write contention surfaces as `Conflict`, safe for the caller to
    /// retry since `apply` re-runs against fresh state.
    fn update_lobby_with(
        &self,
        id: Uuid,
        apply: &mut dyn FnMut(&mut Lobby) -> Result<Disposition>,
    ) -> Result<Option<Lobby>>;
}

/// User profile repository operations
pub trait UserRepository {
    /// Create or replace a profile
    fn upsert_profile(&self, profile: &UserProfile) -> Result<()>;

    /// Find a profile by uid
    fn find_profile(&self, uid: Uuid) -> Result<Option<UserProfile>>;

    /// Delete a profile
    fn delete_profile(&self, uid: Uuid) -> Result<()>;
}

/// Combined storage interface
///
/// Provides access to all repository operations.
/// Implementations may be backed by SQLite, mocks, or network.
pub trait Storage: LobbyRepository + UserRepository {}

// Blanket implementation: any type implementing all traits implements Storage
impl<T> Storage for T where T: LobbyRepository + UserRepository {}
