use crate::models::{MessageRow, ProfileRow, RoomRow};
use crate::{Database, sql_datetime};
use anyhow::{Result, anyhow};
use chrono::{Duration, Utc};
use rusqlite::Connection;

/// Rooms live exactly this long from creation; activity never extends them.
pub const ROOM_TTL_HOURS: i64 = 12;

/// A published status stays live (and chat-eligible) for this long.
pub const STATUS_TTL_HOURS: i64 = 24;

/// Outcome of a find-or-create on the canonical room pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomLookup {
    Created(i64),
    Found(i64),
}

impl RoomLookup {
    pub fn id(self) -> i64 {
        match self {
            RoomLookup::Created(id) | RoomLookup::Found(id) => id,
        }
    }
}

impl Database {
    // -- Profiles --

    pub fn upsert_profile(&self, profile: &ProfileRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO profiles (user_key, telegram_id, name, username, avatar_url, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
                 ON CONFLICT(user_key) DO UPDATE SET
                    name       = excluded.name,
                    username   = excluded.username,
                    avatar_url = excluded.avatar_url,
                    updated_at = excluded.updated_at",
                rusqlite::params![
                    profile.user_key,
                    profile.telegram_id,
                    profile.name,
                    profile.username,
                    profile.avatar_url,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_profile(&self, user_key: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_key, telegram_id, name, username, avatar_url
                 FROM profiles WHERE user_key = ?1",
            )?;
            let row = stmt
                .query_row([user_key], |row| {
                    Ok(ProfileRow {
                        user_key: row.get(0)?,
                        telegram_id: row.get(1)?,
                        name: row.get(2)?,
                        username: row.get(3)?,
                        avatar_url: row.get(4)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    // -- Statuses --

    /// Publish a status for the user: prior active statuses are deactivated
    /// (one active status per user), the new one expires in 24h.
    /// Returns (status id, expires_at).
    pub fn publish_status(
        &self,
        user_key: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
        message: Option<&str>,
        icon: Option<&str>,
        location: Option<&str>,
    ) -> Result<(i64, String)> {
        let expires_at = sql_datetime(Utc::now() + Duration::hours(STATUS_TTL_HOURS));
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE statuses SET is_active = 0 WHERE user_key = ?1 AND is_active = 1",
                [user_key],
            )?;
            conn.execute(
                "INSERT INTO statuses (user_key, latitude, longitude, message, icon, location, is_active, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)",
                rusqlite::params![user_key, latitude, longitude, message, icon, location, expires_at],
            )?;
            Ok((conn.last_insert_rowid(), expires_at.clone()))
        })
    }

    /// Eligibility gate: does the user hold a status that has not expired?
    pub fn has_active_status(&self, user_key: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM statuses
                    WHERE user_key = ?1 AND expires_at > datetime('now'))",
                [user_key],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    // -- Rooms --

    /// Find or create the room for a pair of user keys. The pair is sorted
    /// into canonical order first, so (A,B) and (B,A) address the same room.
    ///
    /// The select-then-insert is not atomic; when the insert loses a race the
    /// UNIQUE(user1_key, user2_key) constraint fires and we recover by
    /// re-fetching the winner's row.
    pub fn find_or_create_room(&self, caller_key: &str, target_key: &str) -> Result<RoomLookup> {
        let (user1, user2) = if caller_key <= target_key {
            (caller_key, target_key)
        } else {
            (target_key, caller_key)
        };

        self.with_conn(|conn| {
            if let Some(id) = query_room_id(conn, user1, user2)? {
                return Ok(RoomLookup::Found(id));
            }

            let now = Utc::now();
            let result = conn.execute(
                "INSERT INTO chat_rooms (user1_key, user2_key, created_at, last_message_at, expires_at)
                 VALUES (?1, ?2, ?3, ?3, ?4)",
                rusqlite::params![
                    user1,
                    user2,
                    sql_datetime(now),
                    sql_datetime(now + Duration::hours(ROOM_TTL_HOURS)),
                ],
            );

            match result {
                Ok(_) => Ok(RoomLookup::Created(conn.last_insert_rowid())),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    // Lost the race to a concurrent chat-start.
                    let id = query_room_id(conn, user1, user2)?
                        .ok_or_else(|| anyhow!("room missing after unique-pair conflict"))?;
                    Ok(RoomLookup::Found(id))
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_room(&self, room_id: i64) -> Result<Option<RoomRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user1_key, user2_key, created_at, last_message_at, expires_at
                 FROM chat_rooms WHERE id = ?1",
            )?;
            let row = stmt
                .query_row([room_id], |row| {
                    Ok(RoomRow {
                        id: row.get(0)?,
                        user1_key: row.get(1)?,
                        user2_key: row.get(2)?,
                        created_at: row.get(3)?,
                        last_message_at: row.get(4)?,
                        expires_at: row.get(5)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    /// Bump last_message_at. Deliberately leaves expires_at alone: rooms live
    /// 12h from creation no matter how busy they are.
    pub fn touch_room(&self, room_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE chat_rooms SET last_message_at = datetime('now') WHERE id = ?1",
                [room_id],
            )?;
            Ok(())
        })
    }

    // -- Messages --

    pub fn insert_message(&self, room_id: i64, sender_user_key: &str, text: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_messages (room_id, sender_user_key, text) VALUES (?1, ?2, ?3)",
                rusqlite::params![room_id, sender_user_key, text],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Latest `limit` messages of a room, newest first (callers reverse for
    /// display order). Sender names resolve through profiles in one JOIN.
    pub fn room_messages(&self, room_id: i64, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.room_id, m.sender_user_key, p.name, p.username, m.text, m.created_at
                 FROM chat_messages m
                 LEFT JOIN profiles p ON p.user_key = m.sender_user_key
                 WHERE m.room_id = ?1
                 ORDER BY m.created_at DESC, m.id DESC
                 LIMIT ?2",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![room_id, limit], |row| {
                    let name: Option<String> = row.get(3)?;
                    let username: Option<String> = row.get(4)?;
                    Ok(MessageRow {
                        id: row.get(0)?,
                        room_id: row.get(1)?,
                        sender_user_key: row.get(2)?,
                        sender_name: name.filter(|n| !n.is_empty()).or(username),
                        text: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Expiration sweep --

    /// Delete every room whose expiry has passed, messages first. Idempotent:
    /// a sweep over zero expired rooms deletes nothing and returns zeros.
    /// Returns (rooms removed, messages removed).
    pub fn sweep_expired(&self) -> Result<(usize, usize)> {
        self.with_conn(|conn| {
            let messages = conn.execute(
                "DELETE FROM chat_messages WHERE room_id IN
                    (SELECT id FROM chat_rooms WHERE expires_at <= datetime('now'))",
                [],
            )?;
            let rooms = conn.execute(
                "DELETE FROM chat_rooms WHERE expires_at <= datetime('now')",
                [],
            )?;
            Ok((rooms, messages))
        })
    }
}

fn query_room_id(conn: &Connection, user1: &str, user2: &str) -> Result<Option<i64>> {
    let mut stmt =
        conn.prepare("SELECT id FROM chat_rooms WHERE user1_key = ?1 AND user2_key = ?2")?;
    let id = stmt.query_row([user1, user2], |row| row.get(0)).optional()?;
    Ok(id)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
