//! User profile storage operations

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::parse::{parse_datetime, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::UserProfile;

pub struct UserStore<'a> {
    conn: &'a Connection,
}

impl<'a> UserStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create or replace a profile
    pub fn upsert(&self, profile: &UserProfile) -> Result<()> {
        self.conn.execute(
            "INSERT INTO users (uid, name, email, bio, phone, avatar_id, show_contact, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(uid) DO UPDATE SET
                 name = excluded.name,
                 email = excluded.email,
                 bio = excluded.bio,
                 phone = excluded.phone,
                 avatar_id = excluded.avatar_id,
                 show_contact = excluded.show_contact",
            params![
                profile.uid.to_string(),
                profile.name,
                profile.email,
                profile.bio,
                profile.phone,
                profile.avatar_id,
                profile.show_contact as i32,
                profile.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find a profile by uid
    pub fn find_by_uid(&self, uid: Uuid) -> Result<Option<UserProfile>> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, name, email, bio, phone, avatar_id, show_contact, created_at
             FROM users WHERE uid = ?1",
        )?;

        let profile = stmt
            .query_row(params![uid.to_string()], |row| {
                Ok(UserProfile {
                    uid: parse_uuid(&row.get::<_, String>(0)?)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    bio: row.get(3)?,
                    phone: row.get(4)?,
                    avatar_id: row.get(5)?,
                    show_contact: row.get::<_, i32>(6)? != 0,
                    created_at: parse_datetime(&row.get::<_, String>(7)?)?,
                })
            })
            .optional()?;

        Ok(profile)
    }

    /// Delete a profile
    pub fn delete(&self, uid: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM users WHERE uid = ?1",
            params![uid.to_string()],
        )?;
        Ok(())
    }
}
