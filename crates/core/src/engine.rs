//! Membership engine - the lobby request-lifecycle state machine
//!
//! Every operation takes the acting uid alongside the lobby id, applies
//! its guards and mutation inside the store's atomic compound update,
//! and broadcasts one change signal after a successful commit. The
//! engine holds no locks of its own; the store serializes writers per
//! lobby and its `Conflict` errors are the only thing retried here.

use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::invariants::assert_lobby_invariants;
use crate::models::{
    HostContact, JoinApplication, Lobby, LobbyDraft, Member, MIN_MAX_PLAYERS,
};
use crate::notify::Notifier;
use crate::storage::{Disposition, LobbyRepository};

/// Bounded optimistic-concurrency retries before `Conflict` surfaces
const MAX_CONFLICT_RETRIES: u32 = 3;

pub struct MembershipEngine<S, N> {
    store: S,
    notifier: N,
}

impl<S: LobbyRepository, N: Notifier> MembershipEngine<S, N> {
    pub fn new(store: S, notifier: N) -> Self {
        Self { store, notifier }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Snapshot of one lobby
    pub fn lobby(&self, lobby_id: Uuid) -> Result<Lobby> {
        self.store
            .find_lobby_by_id(lobby_id)?
            .ok_or_else(|| Error::NotFound(format!("lobby {lobby_id}")))
    }

    /// Snapshot of all lobbies, newest first
    pub fn lobbies(&self) -> Result<Vec<Lobby>> {
        self.store.list_lobbies()
    }

    /// Create a lobby with the creator seated as host and sole player
    #[instrument(skip(self, draft, contact), fields(host_uid = %host_uid, title = %draft.title))]
    pub fn create_lobby(
        &self,
        draft: LobbyDraft,
        host_uid: Uuid,
        host_name: String,
        contact: HostContact,
    ) -> Result<Lobby> {
        if draft.max_players < MIN_MAX_PLAYERS {
            return Err(Error::InvalidCapacity(draft.max_players));
        }

        let lobby = Lobby::new(draft, host_uid, host_name, contact);
        assert_lobby_invariants(&lobby);
        self.store.insert_lobby(&lobby)?;
        self.broadcast();
        Ok(lobby)
    }

    /// File a join request. Capacity is deliberately not checked here:
    /// a full lobby may still queue requests for the host to work
    /// through as seats free up.
    #[instrument(skip(self, application), fields(uid = %application.uid))]
    pub fn request_join(&self, lobby_id: Uuid, application: JoinApplication) -> Result<Lobby> {
        self.mutate_persisting(lobby_id, |lobby| {
            if lobby.is_member(application.uid) {
                return Err(Error::AlreadyMember);
            }
            if lobby.has_request(application.uid) {
                return Err(Error::DuplicateRequest);
            }
            lobby.push_request(application.clone());
            Ok(Disposition::Persist)
        })
    }

    /// Seat a requester. The roster append and the queue removal are one
    /// atomic unit: a request is never consumed without producing a
    /// member, and capacity is re-checked at commit time.
    #[instrument(skip(self))]
    pub fn accept_request(&self, lobby_id: Uuid, host_uid: Uuid, target_uid: Uuid) -> Result<Lobby> {
        self.mutate_persisting(lobby_id, |lobby| {
            let Some(idx) = lobby.requests.iter().position(|r| r.uid == target_uid) else {
                return Err(Error::NotFound(format!("join request from {target_uid}")));
            };
            if !lobby.is_host(host_uid) {
                return Err(Error::Unauthorized(
                    "only the host may accept join requests".to_string(),
                ));
            }
            if lobby.is_full() {
                return Err(Error::LobbyFull);
            }

            let request = lobby.requests.remove(idx);
            lobby
                .players
                .push(Member::new(request.uid, request.display_name));
            Ok(Disposition::Persist)
        })
    }

    /// Drop a pending request. Rejecting a request that is no longer
    /// queued is a no-op, not an error.
    #[instrument(skip(self))]
    pub fn reject_request(&self, lobby_id: Uuid, host_uid: Uuid, target_uid: Uuid) -> Result<Lobby> {
        self.mutate_persisting(lobby_id, |lobby| {
            if !lobby.is_host(host_uid) {
                return Err(Error::Unauthorized(
                    "only the host may reject join requests".to_string(),
                ));
            }
            lobby.remove_request(target_uid);
            Ok(Disposition::Persist)
        })
    }

    /// Join without the request queue, used for open lobbies. Same
    /// capacity and uniqueness guards as accept; any pending request
    /// from the same uid is consumed in the same unit.
    #[instrument(skip(self, display_name))]
    pub fn join_directly(&self, lobby_id: Uuid, uid: Uuid, display_name: &str) -> Result<Lobby> {
        self.mutate_persisting(lobby_id, |lobby| {
            if lobby.is_member(uid) {
                return Err(Error::AlreadyMember);
            }
            if lobby.is_full() {
                return Err(Error::LobbyFull);
            }
            lobby.remove_request(uid);
            lobby.players.push(Member::new(uid, display_name.to_string()));
            Ok(Disposition::Persist)
        })
    }

    /// Leave the roster. Removing an absent uid is a no-op. The host
    /// must transfer ownership first while other members remain; a sole
    /// remaining player leaving deletes the lobby.
    ///
    /// Returns the surviving lobby, or `None` when the leave emptied it.
    #[instrument(skip(self))]
    pub fn leave(&self, lobby_id: Uuid, uid: Uuid) -> Result<Option<Lobby>> {
        self.mutate(lobby_id, |lobby| {
            if lobby.is_host(uid) && lobby.players.len() > 1 {
                return Err(Error::HostCannotLeave);
            }
            lobby.remove_player(uid);
            if lobby.players.is_empty() {
                Ok(Disposition::Delete)
            } else {
                Ok(Disposition::Persist)
            }
        })
    }

    /// Remove a member from the roster, and any stale request of theirs
    #[instrument(skip(self))]
    pub fn kick(&self, lobby_id: Uuid, host_uid: Uuid, target_uid: Uuid) -> Result<Lobby> {
        self.mutate_persisting(lobby_id, |lobby| {
            if !lobby.is_host(host_uid) {
                return Err(Error::Unauthorized(
                    "only the host may kick members".to_string(),
                ));
            }
            if target_uid == host_uid {
                return Err(Error::SelfKick);
            }
            lobby.remove_player(target_uid);
            lobby.remove_request(target_uid);
            Ok(Disposition::Persist)
        })
    }

    /// Hand the lobby to another player. The new host's name comes from
    /// their roster entry; the contact snapshot is cleared and stays
    /// empty until the new host's own profile-save flow refreshes it.
    /// The old host remains a player - transfer and leave are separate
    /// steps.
    #[instrument(skip(self))]
    pub fn transfer_host(
        &self,
        lobby_id: Uuid,
        current_host_uid: Uuid,
        new_host_uid: Uuid,
    ) -> Result<Lobby> {
        self.mutate_persisting(lobby_id, |lobby| {
            if !lobby.is_host(current_host_uid) {
                return Err(Error::Unauthorized(
                    "only the host may transfer ownership".to_string(),
                ));
            }
            let Some(new_host) = lobby.players.iter().find(|p| p.uid == new_host_uid) else {
                return Err(Error::NotFound(format!(
                    "new host {new_host_uid} is not on the roster"
                )));
            };

            lobby.host_id = new_host.uid;
            lobby.host_name = new_host.display_name.clone();
            lobby.host_contact = HostContact::cleared();
            Ok(Disposition::Persist)
        })
    }

    /// Delete the lobby outright
    #[instrument(skip(self))]
    pub fn disband(&self, lobby_id: Uuid, host_uid: Uuid) -> Result<()> {
        self.mutate(lobby_id, |lobby| {
            if !lobby.is_host(host_uid) {
                return Err(Error::Unauthorized(
                    "only the host may disband the lobby".to_string(),
                ));
            }
            Ok(Disposition::Delete)
        })?;
        Ok(())
    }

    /// Host-only edit of the lobby's descriptive fields and capacity.
    /// Shrinking capacity below the current roster is rejected rather
    /// than truncating membership.
    #[instrument(skip(self, draft))]
    pub fn update_details(&self, lobby_id: Uuid, host_uid: Uuid, draft: LobbyDraft) -> Result<Lobby> {
        if draft.max_players < MIN_MAX_PLAYERS {
            return Err(Error::InvalidCapacity(draft.max_players));
        }

        self.mutate_persisting(lobby_id, |lobby| {
            if !lobby.is_host(host_uid) {
                return Err(Error::Unauthorized(
                    "only the host may edit lobby details".to_string(),
                ));
            }
            let current = lobby.players.len() as u32;
            if draft.max_players < current {
                return Err(Error::CapacityBelowCurrent {
                    requested: draft.max_players,
                    current,
                });
            }

            lobby.title = draft.title.clone();
            lobby.description = draft.description.clone();
            lobby.location = draft.location.clone();
            lobby.category = draft.category;
            lobby.event_date = draft.event_date;
            lobby.skill = draft.skill.clone();
            lobby.max_players = draft.max_players;
            Ok(Disposition::Persist)
        })
    }

    /// Lobby-side cascade of an account deletion: disband everything the
    /// uid hosts, withdraw them everywhere else, and drop lobbies their
    /// departure emptied. One broadcast covers the whole sweep.
    #[instrument(skip(self))]
    pub fn purge_member(&self, uid: Uuid) -> Result<()> {
        let touched = self.store.list_lobbies_for_uid(uid)?;
        if touched.is_empty() {
            return Ok(());
        }

        for lobby in &touched {
            if lobby.host_id == uid {
                self.store.delete_lobby(lobby.id)?;
                continue;
            }

            let outcome = self.mutate_quiet(lobby.id, |l| {
                l.remove_player(uid);
                l.remove_request(uid);
                if l.players.is_empty() {
                    Ok(Disposition::Delete)
                } else {
                    Ok(Disposition::Persist)
                }
            });
            match outcome {
                Ok(_) => {}
                // Raced with a disband or leave-to-empty; nothing to withdraw
                Err(Error::NotFound(_)) => {
                    debug!(lobby_id = %lobby.id, "Lobby vanished during purge");
                }
                Err(e) => return Err(e),
            }
        }

        self.broadcast();
        Ok(())
    }

    /// Run a compound mutation with bounded conflict retries, then
    /// broadcast. The closure re-runs against fresh state on retry, so
    /// every guard re-validates.
    fn mutate(
        &self,
        lobby_id: Uuid,
        apply: impl FnMut(&mut Lobby) -> Result<Disposition>,
    ) -> Result<Option<Lobby>> {
        let outcome = self.mutate_quiet(lobby_id, apply)?;
        self.broadcast();
        Ok(outcome)
    }

    fn mutate_persisting(
        &self,
        lobby_id: Uuid,
        apply: impl FnMut(&mut Lobby) -> Result<Disposition>,
    ) -> Result<Lobby> {
        self.mutate(lobby_id, apply)?
            .ok_or_else(|| Error::NotFound(format!("lobby {lobby_id}")))
    }

    fn mutate_quiet(
        &self,
        lobby_id: Uuid,
        mut apply: impl FnMut(&mut Lobby) -> Result<Disposition>,
    ) -> Result<Option<Lobby>> {
        let mut attempts = 0;
        loop {
            match self.store.update_lobby_with(lobby_id, &mut apply) {
                Err(Error::Conflict) if attempts < MAX_CONFLICT_RETRIES => {
                    attempts += 1;
                    warn!(%lobby_id, attempts, "Write conflict, retrying");
                }
                other => return other,
            }
        }
    }

    /// Fire-and-forget; the notifier swallows its own failures and a
    /// committed mutation never fails on notification.
    fn broadcast(&self) {
        self.notifier.lobbies_changed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, DEFAULT_MAX_PLAYERS};
    use crate::notify::CountingNotifier;
    use crate::storage::Database;
    use chrono::Utc;

    type TestEngine = MembershipEngine<Database, CountingNotifier>;

    fn engine() -> TestEngine {
        MembershipEngine::new(Database::open_in_memory().unwrap(), CountingNotifier::new())
    }

    fn draft() -> LobbyDraft {
        LobbyDraft::new(
            "Jam session".to_string(),
            Category::Music,
            "Garage".to_string(),
            Utc::now(),
        )
    }

    fn hosted_lobby(engine: &TestEngine) -> (Lobby, Uuid) {
        let host = Uuid::new_v4();
        let lobby = engine
            .create_lobby(draft(), host, "Host".to_string(), HostContact::default())
            .unwrap();
        (lobby, host)
    }

    fn request_from(engine: &TestEngine, lobby_id: Uuid, name: &str) -> Uuid {
        let uid = Uuid::new_v4();
        engine
            .request_join(lobby_id, JoinApplication::new(uid, name.to_string()))
            .unwrap();
        uid
    }

    #[test]
    fn test_create_defaults_and_validation() {
        let engine = engine();
        let (lobby, host) = hosted_lobby(&engine);

        assert_eq!(lobby.max_players, DEFAULT_MAX_PLAYERS);
        assert_eq!(lobby.players.len(), 1);
        assert_eq!(lobby.host_id, host);

        let result = engine.create_lobby(
            draft().with_max_players(1),
            Uuid::new_v4(),
            "Solo".to_string(),
            HostContact::default(),
        );
        assert!(matches!(result, Err(Error::InvalidCapacity(1))));
    }

    #[test]
    fn test_request_join_guards() {
        let engine = engine();
        let (lobby, host) = hosted_lobby(&engine);

        let uid = request_from(&engine, lobby.id, "Sam");

        // Duplicate request
        let result = engine.request_join(lobby.id, JoinApplication::new(uid, "Sam".to_string()));
        assert!(matches!(result, Err(Error::DuplicateRequest)));

        // Members cannot request
        let result = engine.request_join(lobby.id, JoinApplication::new(host, "Host".to_string()));
        assert!(matches!(result, Err(Error::AlreadyMember)));

        // Unknown lobby
        let result = engine.request_join(
            Uuid::new_v4(),
            JoinApplication::new(Uuid::new_v4(), "Sam".to_string()),
        );
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_full_lobby_still_queues_requests() {
        let engine = engine();
        let host = Uuid::new_v4();
        let lobby = engine
            .create_lobby(
                draft().with_max_players(2),
                host,
                "Host".to_string(),
                HostContact::default(),
            )
            .unwrap();

        let first = request_from(&engine, lobby.id, "A");
        engine.accept_request(lobby.id, host, first).unwrap();

        // Roster is full; the queue keeps accepting applications
        request_from(&engine, lobby.id, "B");
        let snapshot = engine.lobby(lobby.id).unwrap();
        assert!(snapshot.is_full());
        assert_eq!(snapshot.requests.len(), 1);
    }

    #[test]
    fn test_accept_moves_request_to_roster() {
        let engine = engine();
        let (lobby, host) = hosted_lobby(&engine);
        let uid = request_from(&engine, lobby.id, "Sam");

        let updated = engine.accept_request(lobby.id, host, uid).unwrap();
        assert!(updated.is_member(uid));
        assert!(!updated.has_request(uid));
        assert_eq!(updated.players.len(), 2);
    }

    #[test]
    fn test_accept_requires_host() {
        let engine = engine();
        let (lobby, _host) = hosted_lobby(&engine);
        let uid = request_from(&engine, lobby.id, "Sam");

        let result = engine.accept_request(lobby.id, Uuid::new_v4(), uid);
        assert!(matches!(result, Err(Error::Unauthorized(_))));

        // Provably unchanged
        let snapshot = engine.lobby(lobby.id).unwrap();
        assert_eq!(snapshot.players.len(), 1);
        assert!(snapshot.has_request(uid));
    }

    #[test]
    fn test_accept_missing_request() {
        let engine = engine();
        let (lobby, host) = hosted_lobby(&engine);

        let result = engine.accept_request(lobby.id, host, Uuid::new_v4());
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_capacity_two_scenario() {
        // Lobby with maxPlayers=2: accept A fills it, accepting B fails
        // with the queue intact.
        let engine = engine();
        let host = Uuid::new_v4();
        let lobby = engine
            .create_lobby(
                draft().with_max_players(2),
                host,
                "H".to_string(),
                HostContact::default(),
            )
            .unwrap();

        let a = request_from(&engine, lobby.id, "A");
        let updated = engine.accept_request(lobby.id, host, a).unwrap();
        assert_eq!(updated.players.len(), 2);
        assert!(updated.requests.is_empty());

        let b = request_from(&engine, lobby.id, "B");
        let result = engine.accept_request(lobby.id, host, b);
        assert!(matches!(result, Err(Error::LobbyFull)));

        // LobbyFull left the queue untouched
        let snapshot = engine.lobby(lobby.id).unwrap();
        assert_eq!(snapshot.requests.len(), 1);
        assert!(snapshot.has_request(b));
        assert!(!snapshot.is_member(b));
    }

    #[test]
    fn test_reject_is_idempotent_and_host_only() {
        let engine = engine();
        let (lobby, host) = hosted_lobby(&engine);
        let uid = request_from(&engine, lobby.id, "Sam");

        let result = engine.reject_request(lobby.id, Uuid::new_v4(), uid);
        assert!(matches!(result, Err(Error::Unauthorized(_))));
        assert!(engine.lobby(lobby.id).unwrap().has_request(uid));

        let updated = engine.reject_request(lobby.id, host, uid).unwrap();
        assert!(!updated.has_request(uid));

        // Second rejection is a no-op, not an error
        let updated = engine.reject_request(lobby.id, host, uid).unwrap();
        assert!(updated.requests.is_empty());
    }

    #[test]
    fn test_leave_is_idempotent() {
        let engine = engine();
        let (lobby, host) = hosted_lobby(&engine);
        let uid = request_from(&engine, lobby.id, "Sam");
        engine.accept_request(lobby.id, host, uid).unwrap();

        let after = engine.leave(lobby.id, uid).unwrap().unwrap();
        assert!(!after.is_member(uid));

        // Leaving again changes nothing
        let after = engine.leave(lobby.id, uid).unwrap().unwrap();
        assert_eq!(after.players.len(), 1);
    }

    #[test]
    fn test_leave_to_empty_deletes_lobby() {
        let engine = engine();
        let (lobby, host) = hosted_lobby(&engine);

        let outcome = engine.leave(lobby.id, host).unwrap();
        assert!(outcome.is_none());
        assert!(matches!(engine.lobby(lobby.id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_host_cannot_leave_with_members_present() {
        let engine = engine();
        let (lobby, host) = hosted_lobby(&engine);
        let uid = request_from(&engine, lobby.id, "Sam");
        engine.accept_request(lobby.id, host, uid).unwrap();

        let result = engine.leave(lobby.id, host);
        assert!(matches!(result, Err(Error::HostCannotLeave)));
        assert!(engine.lobby(lobby.id).unwrap().is_member(host));
    }

    #[test]
    fn test_transfer_then_leave_scenario() {
        // H transfers to A; A is now bound by the same host rule until
        // they transfer onward, while H may leave freely.
        let engine = engine();
        let (lobby, host) = hosted_lobby(&engine);
        let a = request_from(&engine, lobby.id, "A");
        engine.accept_request(lobby.id, host, a).unwrap();

        let updated = engine.transfer_host(lobby.id, host, a).unwrap();
        assert_eq!(updated.host_id, a);

        let result = engine.leave(lobby.id, a);
        assert!(matches!(result, Err(Error::HostCannotLeave)));

        let after = engine.leave(lobby.id, host).unwrap().unwrap();
        assert_eq!(after.players.len(), 1);
        assert_eq!(after.host_id, a);
    }

    #[test]
    fn test_kick_guards_and_effect() {
        let engine = engine();
        let (lobby, host) = hosted_lobby(&engine);
        let uid = request_from(&engine, lobby.id, "Sam");
        engine.accept_request(lobby.id, host, uid).unwrap();

        let result = engine.kick(lobby.id, uid, host);
        assert!(matches!(result, Err(Error::Unauthorized(_))));
        assert_eq!(engine.lobby(lobby.id).unwrap().players.len(), 2);

        let result = engine.kick(lobby.id, host, host);
        assert!(matches!(result, Err(Error::SelfKick)));

        let updated = engine.kick(lobby.id, host, uid).unwrap();
        assert!(!updated.is_member(uid));
    }

    #[test]
    fn test_kick_sweeps_stale_request() {
        let engine = engine();
        let (lobby, host) = hosted_lobby(&engine);
        let uid = request_from(&engine, lobby.id, "Sam");

        // Not a member, but the pending request is swept anyway
        let updated = engine.kick(lobby.id, host, uid).unwrap();
        assert!(!updated.has_request(uid));
    }

    #[test]
    fn test_transfer_host_clears_contact() {
        let engine = engine();
        let host = Uuid::new_v4();
        let lobby = engine
            .create_lobby(
                draft(),
                host,
                "Host".to_string(),
                HostContact::new(Some("555-0100".to_string()), Some("h@example.com".to_string())),
            )
            .unwrap();
        let a = request_from(&engine, lobby.id, "A");
        engine.accept_request(lobby.id, host, a).unwrap();

        let updated = engine.transfer_host(lobby.id, host, a).unwrap();
        assert_eq!(updated.host_id, a);
        assert_eq!(updated.host_name, "A");
        assert!(updated.host_contact.phone.is_none());
        assert!(updated.host_contact.email.is_none());

        // The old host stays on the roster - transfer does not leave
        assert!(updated.is_member(host));
    }

    #[test]
    fn test_transfer_host_guards() {
        let engine = engine();
        let (lobby, host) = hosted_lobby(&engine);
        let outsider = Uuid::new_v4();

        let result = engine.transfer_host(lobby.id, outsider, host);
        assert!(matches!(result, Err(Error::Unauthorized(_))));

        let result = engine.transfer_host(lobby.id, host, outsider);
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(engine.lobby(lobby.id).unwrap().host_id, host);
    }

    #[test]
    fn test_disband() {
        let engine = engine();
        let (lobby, host) = hosted_lobby(&engine);
        let uid = request_from(&engine, lobby.id, "Sam");

        let result = engine.disband(lobby.id, uid);
        assert!(matches!(result, Err(Error::Unauthorized(_))));

        engine.disband(lobby.id, host).unwrap();
        assert!(matches!(engine.lobby(lobby.id), Err(Error::NotFound(_))));

        // Operations against the disbanded lobby are NotFound
        let result = engine.accept_request(lobby.id, host, uid);
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_update_details() {
        let engine = engine();
        let (lobby, host) = hosted_lobby(&engine);

        let result = engine.update_details(lobby.id, Uuid::new_v4(), draft());
        assert!(matches!(result, Err(Error::Unauthorized(_))));

        let new_draft = LobbyDraft::new(
            "Acoustic night".to_string(),
            Category::Creative,
            "Rooftop".to_string(),
            Utc::now(),
        )
        .with_skill("Intermediate".to_string())
        .with_max_players(6);

        let updated = engine.update_details(lobby.id, host, new_draft).unwrap();
        assert_eq!(updated.title, "Acoustic night");
        assert_eq!(updated.category, Category::Creative);
        assert_eq!(updated.skill.as_deref(), Some("Intermediate"));
        assert_eq!(updated.max_players, 6);
    }

    #[test]
    fn test_update_details_rejects_capacity_below_roster() {
        let engine = engine();
        let (lobby, host) = hosted_lobby(&engine);
        for name in ["A", "B"] {
            let uid = request_from(&engine, lobby.id, name);
            engine.accept_request(lobby.id, host, uid).unwrap();
        }

        let result = engine.update_details(lobby.id, host, draft().with_max_players(2));
        assert!(matches!(
            result,
            Err(Error::CapacityBelowCurrent {
                requested: 2,
                current: 3
            })
        ));
        assert_eq!(engine.lobby(lobby.id).unwrap().players.len(), 3);
    }

    #[test]
    fn test_join_directly_guards() {
        let engine = engine();
        let host = Uuid::new_v4();
        let lobby = engine
            .create_lobby(
                draft().with_max_players(2),
                host,
                "Host".to_string(),
                HostContact::default(),
            )
            .unwrap();

        let uid = Uuid::new_v4();
        let updated = engine.join_directly(lobby.id, uid, "Walk-in").unwrap();
        assert!(updated.is_member(uid));

        let result = engine.join_directly(lobby.id, uid, "Walk-in");
        assert!(matches!(result, Err(Error::AlreadyMember)));

        let result = engine.join_directly(lobby.id, Uuid::new_v4(), "Late");
        assert!(matches!(result, Err(Error::LobbyFull)));
    }

    #[test]
    fn test_join_directly_consumes_pending_request() {
        let engine = engine();
        let (lobby, _host) = hosted_lobby(&engine);
        let uid = request_from(&engine, lobby.id, "Sam");

        let updated = engine.join_directly(lobby.id, uid, "Sam").unwrap();
        assert!(updated.is_member(uid));
        assert!(!updated.has_request(uid));
    }

    #[test]
    fn test_purge_member_cascade() {
        let engine = engine();

        // uid hosts one lobby, plays in another, requests a third
        let uid = Uuid::new_v4();
        let hosted = engine
            .create_lobby(draft(), uid, "Uid".to_string(), HostContact::default())
            .unwrap();

        let (playing, other_host) = hosted_lobby(&engine);
        engine.join_directly(playing.id, uid, "Uid").unwrap();

        let (requested, _) = hosted_lobby(&engine);
        engine
            .request_join(requested.id, JoinApplication::new(uid, "Uid".to_string()))
            .unwrap();

        engine.purge_member(uid).unwrap();

        assert!(matches!(engine.lobby(hosted.id), Err(Error::NotFound(_))));
        let playing_after = engine.lobby(playing.id).unwrap();
        assert!(!playing_after.is_member(uid));
        assert!(playing_after.is_member(other_host));
        assert!(!engine.lobby(requested.id).unwrap().has_request(uid));
    }

    #[test]
    fn test_one_broadcast_per_mutation_none_on_failure() {
        let engine = engine();
        let (lobby, host) = hosted_lobby(&engine);
        assert_eq!(engine.notifier().count(), 1);

        let uid = request_from(&engine, lobby.id, "Sam");
        assert_eq!(engine.notifier().count(), 2);

        // Failed operations must not signal
        let _ = engine.accept_request(lobby.id, Uuid::new_v4(), uid);
        assert_eq!(engine.notifier().count(), 2);

        engine.accept_request(lobby.id, host, uid).unwrap();
        assert_eq!(engine.notifier().count(), 3);

        engine.disband(lobby.id, host).unwrap();
        assert_eq!(engine.notifier().count(), 4);
    }
}
