// Journal schema
// Created idempotently on every open; there is no versioned migration path

use super::Result;
use rusqlite::Connection;

pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS journal_entries (
            id TEXT PRIMARY KEY NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            audio_file_path TEXT NOT NULL,
            duration_seconds INTEGER NOT NULL,
            transcription TEXT,
            mood TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_journal_entries_created_at
            ON journal_entries(created_at);

        CREATE TABLE IF NOT EXISTS topics (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            auto_apply INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS entry_topics (
            entry_id TEXT NOT NULL REFERENCES journal_entries(id) ON DELETE CASCADE,
            topic_id TEXT NOT NULL REFERENCES topics(id) ON DELETE CASCADE,
            PRIMARY KEY (entry_id, topic_id)
        );

        CREATE INDEX IF NOT EXISTS idx_entry_topics_topic_id
            ON entry_topics(topic_id);

        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL
        );
        "#,
    )?;

    Ok(())
}
