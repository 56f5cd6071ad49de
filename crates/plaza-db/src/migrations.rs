use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("DB: running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE profiles (
                user_key    TEXT PRIMARY KEY,
                telegram_id TEXT NOT NULL,
                name        TEXT,
                username    TEXT,
                avatar_url  TEXT,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE statuses (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_key    TEXT NOT NULL,
                latitude    REAL,
                longitude   REAL,
                message     TEXT,
                icon        TEXT,
                location    TEXT,
                is_active   INTEGER NOT NULL DEFAULT 1,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                expires_at  TEXT NOT NULL
            );

            CREATE INDEX idx_statuses_user
                ON statuses(user_key, expires_at);

            -- One room per unordered pair: user1_key < user2_key always,
            -- and the UNIQUE constraint is the backstop against two
            -- concurrent chat-starts creating the pair twice.
            CREATE TABLE chat_rooms (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                user1_key       TEXT NOT NULL,
                user2_key       TEXT NOT NULL,
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                last_message_at TEXT NOT NULL,
                expires_at      TEXT NOT NULL,
                UNIQUE(user1_key, user2_key)
            );

            CREATE TABLE chat_messages (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                room_id         INTEGER NOT NULL REFERENCES chat_rooms(id) ON DELETE CASCADE,
                sender_user_key TEXT NOT NULL,
                text            TEXT NOT NULL,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_messages_room
                ON chat_messages(room_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    Ok(())
}
