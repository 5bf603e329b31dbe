//! Lobby model - a hosted event with a bounded member roster

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Default roster capacity for a new lobby
pub const DEFAULT_MAX_PLAYERS: u32 = 4;

/// Smallest capacity a lobby may be created with
pub const MIN_MAX_PLAYERS: u32 = 2;

/// Fixed set of lobby categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Sports,
    Hackathon,
    Gaming,
    Study,
    Music,
    Project,
    Creative,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Sports => "sports",
            Category::Hackathon => "hackathon",
            Category::Gaming => "gaming",
            Category::Study => "study",
            Category::Music => "music",
            Category::Project => "project",
            Category::Creative => "creative",
        }
    }

    /// All categories, in display order
    pub fn all() -> &'static [Category] {
        &[
            Category::Sports,
            Category::Hackathon,
            Category::Gaming,
            Category::Study,
            Category::Music,
            Category::Project,
            Category::Creative,
        ]
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sports" => Ok(Category::Sports),
            "hackathon" => Ok(Category::Hackathon),
            "gaming" => Ok(Category::Gaming),
            "study" => Ok(Category::Study),
            "music" => Ok(Category::Music),
            "project" => Ok(Category::Project),
            "creative" => Ok(Category::Creative),
            other => Err(Error::UnknownCategory(other.to_string())),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user on a lobby's player roster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub uid: Uuid,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
}

impl Member {
    pub fn new(uid: Uuid, display_name: String) -> Self {
        Self {
            uid,
            display_name,
            joined_at: Utc::now(),
        }
    }
}

/// A pending application to join a lobby, awaiting host decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub uid: Uuid,
    pub display_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
    pub requested_at: DateTime<Utc>,
}

/// Caller-supplied fields of a join request
#[derive(Debug, Clone)]
pub struct JoinApplication {
    pub uid: Uuid,
    pub display_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

impl JoinApplication {
    pub fn new(uid: Uuid, display_name: String) -> Self {
        Self {
            uid,
            display_name,
            phone: None,
            email: None,
            message: None,
        }
    }

    pub fn with_contact(mut self, phone: Option<String>, email: Option<String>) -> Self {
        self.phone = phone;
        self.email = email;
        self
    }

    pub fn with_message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }

    fn into_request(self) -> JoinRequest {
        JoinRequest {
            uid: self.uid,
            display_name: self.display_name,
            phone: self.phone,
            email: self.email,
            message: self.message,
            requested_at: Utc::now(),
        }
    }
}

/// Denormalized snapshot of the host's contact details.
///
/// Refreshed only by the host's own profile-save flow; a host transfer
/// clears it rather than re-fetching the new host's preferences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostContact {
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl HostContact {
    pub fn new(phone: Option<String>, email: Option<String>) -> Self {
        Self { phone, email }
    }

    /// The post-transfer state: no contact info until the new host saves
    pub fn cleared() -> Self {
        Self::default()
    }
}

/// Host-editable lobby fields, used at creation and for detail updates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyDraft {
    pub title: String,
    pub description: String,
    pub location: String,
    pub category: Category,
    pub event_date: DateTime<Utc>,
    pub skill: Option<String>,
    pub max_players: u32,
}

impl LobbyDraft {
    pub fn new(
        title: String,
        category: Category,
        location: String,
        event_date: DateTime<Utc>,
    ) -> Self {
        Self {
            title,
            description: String::new(),
            location,
            category,
            event_date,
            skill: None,
            max_players: DEFAULT_MAX_PLAYERS,
        }
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = description;
        self
    }

    pub fn with_skill(mut self, skill: String) -> Self {
        self.skill = Some(skill);
        self
    }

    pub fn with_max_players(mut self, max_players: u32) -> Self {
        self.max_players = max_players;
        self
    }
}

/// A Lobby is a hosted event with a player roster and a request queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lobby {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub category: Category,
    /// Informational only - never checked against the current time
    pub event_date: DateTime<Utc>,
    pub skill: Option<String>,
    pub max_players: u32,
    /// Exactly one host at all times; the host is always also a player
    pub host_id: Uuid,
    pub host_name: String,
    pub host_contact: HostContact,
    pub players: Vec<Member>,
    pub requests: Vec<JoinRequest>,
    pub created_at: DateTime<Utc>,
}

impl Lobby {
    /// Create a lobby with the creator already seated as host and sole player
    pub fn new(draft: LobbyDraft, host_uid: Uuid, host_name: String, contact: HostContact) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: draft.title,
            description: draft.description,
            location: draft.location,
            category: draft.category,
            event_date: draft.event_date,
            skill: draft.skill,
            max_players: draft.max_players,
            host_id: host_uid,
            host_name: host_name.clone(),
            host_contact: contact,
            players: vec![Member::new(host_uid, host_name)],
            requests: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_member(&self, uid: Uuid) -> bool {
        self.players.iter().any(|p| p.uid == uid)
    }

    pub fn has_request(&self, uid: Uuid) -> bool {
        self.requests.iter().any(|r| r.uid == uid)
    }

    pub fn is_full(&self) -> bool {
        self.players.len() as u32 >= self.max_players
    }

    pub fn is_host(&self, uid: Uuid) -> bool {
        self.host_id == uid
    }

    /// Append a join request built from the application
    pub(crate) fn push_request(&mut self, application: JoinApplication) {
        self.requests.push(application.into_request());
    }

    /// Remove a pending request; true if one was removed
    pub(crate) fn remove_request(&mut self, uid: Uuid) -> bool {
        let before = self.requests.len();
        self.requests.retain(|r| r.uid != uid);
        self.requests.len() != before
    }

    /// Remove a player; true if one was removed
    pub(crate) fn remove_player(&mut self, uid: Uuid) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p.uid != uid);
        self.players.len() != before
    }
}
