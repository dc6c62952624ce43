use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id            TEXT PRIMARY KEY,
            email         TEXT NOT NULL UNIQUE,
            display_name  TEXT NOT NULL,
            password      TEXT NOT NULL,
            created_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS daily_reminders (
            id           TEXT PRIMARY KEY,
            author_id    TEXT NOT NULL,
            author_name  TEXT NOT NULL,
            created_at   TEXT NOT NULL,
            text         TEXT NOT NULL,
            date         TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_daily_reminders_created
            ON daily_reminders(created_at);

        CREATE TABLE IF NOT EXISTS letters (
            id           TEXT PRIMARY KEY,
            author_id    TEXT NOT NULL,
            author_name  TEXT NOT NULL,
            created_at   TEXT NOT NULL,
            title        TEXT NOT NULL,
            body         TEXT NOT NULL,
            pinned       INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_letters_pinned_created
            ON letters(pinned, created_at);

        CREATE TABLE IF NOT EXISTS hidden_messages (
            id           TEXT PRIMARY KEY,
            author_id    TEXT NOT NULL,
            author_name  TEXT NOT NULL,
            created_at   TEXT NOT NULL,
            kind         TEXT NOT NULL CHECK (kind IN ('hard', 'soft')),
            text         TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_hidden_messages_created
            ON hidden_messages(created_at);

        CREATE TABLE IF NOT EXISTS memories (
            id           TEXT PRIMARY KEY,
            author_id    TEXT NOT NULL,
            author_name  TEXT NOT NULL,
            created_at   TEXT NOT NULL,
            title        TEXT NOT NULL,
            description  TEXT NOT NULL,
            image_url    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_memories_created
            ON memories(created_at);

        CREATE TABLE IF NOT EXISTS songs (
            id           TEXT PRIMARY KEY,
            author_id    TEXT NOT NULL,
            author_name  TEXT NOT NULL,
            created_at   TEXT NOT NULL,
            title        TEXT NOT NULL,
            link         TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_songs_created
            ON songs(created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
