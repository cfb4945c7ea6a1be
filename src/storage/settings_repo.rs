// Preference repository
// Key/value settings; the journal only stores the default mood

use super::{JournalDb, Result};
use crate::journal::Mood;
use rusqlite::{OptionalExtension, params};

const DEFAULT_MOOD_KEY: &str = "default_mood";

impl JournalDb {
    pub fn default_mood(&self) -> Result<Option<Mood>> {
        self.with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT value FROM settings WHERE key = ?1",
                    params![DEFAULT_MOOD_KEY],
                    |row| row.get::<_, Mood>(0),
                )
                .optional()?)
        })
    }

    pub fn set_default_mood(&self, mood: Mood) -> Result<()> {
        self.write(|conn| {
            conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![DEFAULT_MOOD_KEY, mood],
            )?;
            Ok(())
        })
    }
}
