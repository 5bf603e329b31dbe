//! User profile model

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of stock avatars to pick from
pub const AVATAR_COUNT: u8 = 8;

/// A user's profile.
///
/// Identity and credential checks live in the authentication service;
/// this is display and contact data only. The membership engine never
/// reads this store - callers pass name/contact values into operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: Uuid,
    pub name: String,
    pub email: String,
    pub bio: String,
    pub phone: String,
    pub avatar_id: u8,
    /// Whether phone/email appear in the public projection
    pub show_contact: bool,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(uid: Uuid, name: String, email: String) -> Self {
        Self {
            uid,
            name,
            email,
            bio: String::new(),
            phone: String::new(),
            avatar_id: rand::thread_rng().gen_range(0..AVATAR_COUNT),
            show_contact: false,
            created_at: Utc::now(),
        }
    }

    /// Projection safe to hand to other users
    pub fn public_view(&self) -> PublicProfile {
        PublicProfile {
            uid: self.uid,
            name: self.name.clone(),
            avatar_id: self.avatar_id,
            bio: self.bio.clone(),
            show_contact: self.show_contact,
            phone: self.show_contact.then(|| self.phone.clone()),
            email: self.show_contact.then(|| self.email.clone()),
        }
    }
}

/// What other users see of a profile; contact fields gated by `show_contact`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProfile {
    pub uid: Uuid,
    pub name: String,
    pub avatar_id: u8,
    pub bio: String,
    pub show_contact: bool,
    pub phone: Option<String>,
    pub email: Option<String>,
}
