//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible lobby states during
//! development. These checks are compiled out in release builds.

use std::collections::HashSet;

use crate::models::Lobby;

/// Validate that a Lobby's state is internally consistent
pub fn assert_lobby_invariants(lobby: &Lobby) {
    // Title must not be empty
    debug_assert!(
        !lobby.title.trim().is_empty(),
        "Lobby {} has empty title",
        lobby.id
    );

    // The host is always also a player
    debug_assert!(
        lobby.players.is_empty() || lobby.is_member(lobby.host_id),
        "Lobby {} host {} is not on the player roster",
        lobby.id,
        lobby.host_id
    );

    // Roster never exceeds capacity
    debug_assert!(
        lobby.players.len() as u32 <= lobby.max_players,
        "Lobby {} has {} players but capacity {}",
        lobby.id,
        lobby.players.len(),
        lobby.max_players
    );

    // No duplicate uids within players
    let player_uids: HashSet<_> = lobby.players.iter().map(|p| p.uid).collect();
    debug_assert!(
        player_uids.len() == lobby.players.len(),
        "Lobby {} has duplicate player uids",
        lobby.id
    );

    // No duplicate uids within requests
    let request_uids: HashSet<_> = lobby.requests.iter().map(|r| r.uid).collect();
    debug_assert!(
        request_uids.len() == lobby.requests.len(),
        "Lobby {} has duplicate request uids",
        lobby.id
    );

    // A uid never sits in players and requests at once
    debug_assert!(
        player_uids.is_disjoint(&request_uids),
        "Lobby {} has a uid in both players and requests",
        lobby.id
    );
}
