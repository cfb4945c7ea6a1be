// Journal entry repository
// CRUD for entries and their topic links

use super::{JournalDb, Result};
use crate::error::StoreError;
use crate::journal::{JournalEntry, Mood, Topic};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const ENTRY_COLUMNS: &str = "id, title, description, created_at, audio_file_path, \
                             duration_seconds, transcription, mood";

impl JournalDb {
    /// Insert a new untitled entry and link every auto-applied topic to it
    pub fn create_entry(
        &self,
        audio_file_path: &Path,
        duration_seconds: u32,
        mood: Mood,
        created_at: DateTime<Utc>,
    ) -> Result<JournalEntry> {
        let entry = JournalEntry::new(
            audio_file_path.to_path_buf(),
            duration_seconds,
            mood,
            created_at,
        );
        self.write(|conn| create_entry_impl(conn, &entry))?;
        tracing::info!("Created journal entry {}", entry.id);
        Ok(entry)
    }

    pub fn get_entry(&self, id: &str) -> Result<Option<JournalEntry>> {
        self.with_connection(|conn| get_entry_impl(conn, id))
    }

    /// All entries, newest first
    pub fn get_all_entries(&self) -> Result<Vec<JournalEntry>> {
        self.with_connection(get_all_entries_impl)
    }

    pub fn update_entry(&self, entry: &JournalEntry) -> Result<()> {
        self.write(|conn| update_entry_impl(conn, entry))
    }

    /// Delete an entry; its topic links go with it
    pub fn delete_entry(&self, id: &str) -> Result<()> {
        self.write(|conn| {
            let deleted = conn.execute("DELETE FROM journal_entries WHERE id = ?1", params![id])?;
            if deleted == 0 {
                return Err(StoreError::EntryNotFound(id.to_string()));
            }
            Ok(())
        })
    }

    /// Topics linked to one entry, by name
    pub fn topics_for_entry(&self, entry_id: &str) -> Result<Vec<Topic>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.id, t.name, t.auto_apply FROM topics t
                 INNER JOIN entry_topics et ON t.id = et.topic_id
                 WHERE et.entry_id = ?1
                 ORDER BY t.name ASC",
            )?;
            let topics = stmt.query_map(params![entry_id], super::topics_repo::topic_from_row)?;
            Ok(topics.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// Topic links for every entry in one query
    pub fn topics_by_entry(&self) -> Result<HashMap<String, Vec<Topic>>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT et.entry_id, t.id, t.name, t.auto_apply FROM entry_topics et
                 INNER JOIN topics t ON t.id = et.topic_id
                 ORDER BY t.name ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                let entry_id: String = row.get(0)?;
                let topic = Topic {
                    id: row.get(1)?,
                    name: row.get(2)?,
                    auto_apply: row.get(3)?,
                };
                Ok((entry_id, topic))
            })?;

            let mut by_entry: HashMap<String, Vec<Topic>> = HashMap::new();
            for row in rows {
                let (entry_id, topic) = row?;
                by_entry.entry(entry_id).or_default().push(topic);
            }
            Ok(by_entry)
        })
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<JournalEntry> {
    let created_ms: i64 = row.get(3)?;
    let created_at = DateTime::from_timestamp_millis(created_ms)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(3, created_ms))?;
    let audio_file_path: String = row.get(4)?;

    Ok(JournalEntry {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        created_at,
        audio_file_path: PathBuf::from(audio_file_path),
        duration_seconds: row.get(5)?,
        transcription: row.get(6)?,
        mood: row.get(7)?,
    })
}

fn create_entry_impl(conn: &mut Connection, entry: &JournalEntry) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute(
        &format!("INSERT INTO journal_entries ({ENTRY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
        params![
            entry.id,
            entry.title,
            entry.description,
            entry.created_at.timestamp_millis(),
            entry.audio_file_path.to_string_lossy().into_owned(),
            entry.duration_seconds,
            entry.transcription,
            entry.mood,
        ],
    )?;

    tx.execute(
        "INSERT INTO entry_topics (entry_id, topic_id)
         SELECT ?1, id FROM topics WHERE auto_apply = 1",
        params![entry.id],
    )?;

    tx.commit()?;
    Ok(())
}

fn get_entry_impl(conn: &Connection, id: &str) -> Result<Option<JournalEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM journal_entries WHERE id = ?1"
    ))?;

    match stmt.query_row(params![id], entry_from_row) {
        Ok(entry) => Ok(Some(entry)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn get_all_entries_impl(conn: &Connection) -> Result<Vec<JournalEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM journal_entries ORDER BY created_at DESC"
    ))?;

    let entries = stmt.query_map([], entry_from_row)?;
    Ok(entries.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn update_entry_impl(conn: &mut Connection, entry: &JournalEntry) -> Result<()> {
    let updated = conn.execute(
        "UPDATE journal_entries
         SET title = ?2, description = ?3, transcription = ?4, mood = ?5
         WHERE id = ?1",
        params![
            entry.id,
            entry.title,
            entry.description,
            entry.transcription,
            entry.mood,
        ],
    )?;

    if updated == 0 {
        return Err(StoreError::EntryNotFound(entry.id.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn db() -> JournalDb {
        JournalDb::open_in_memory().unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_create_and_get_entry() {
        let db = db();
        let created = db
            .create_entry(Path::new("/audio/a.wav"), 42, Mood::Peaceful, at(9))
            .unwrap();

        let loaded = db.get_entry(&created.id).unwrap().unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.audio_file_path, PathBuf::from("/audio/a.wav"));
        assert_eq!(loaded.duration_seconds, 42);
        assert_eq!(loaded.mood, Mood::Peaceful);

        assert!(db.get_entry("missing").unwrap().is_none());
    }

    #[test]
    fn test_entries_are_newest_first() {
        let db = db();
        let early = db.create_entry(Path::new("e.wav"), 1, Mood::Sad, at(7)).unwrap();
        let late = db.create_entry(Path::new("l.wav"), 1, Mood::Sad, at(20)).unwrap();
        let mid = db.create_entry(Path::new("m.wav"), 1, Mood::Sad, at(12)).unwrap();

        let ids: Vec<String> = db.get_all_entries().unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![late.id, mid.id, early.id]);
    }

    #[test]
    fn test_new_entries_get_auto_applied_topics() {
        let db = db();
        let gratitude = db.create_topic("Gratitude", true).unwrap();
        db.create_topic("Work", false).unwrap();

        let entry = db.create_entry(Path::new("a.wav"), 5, Mood::Neutral, at(9)).unwrap();
        assert_eq!(db.topics_for_entry(&entry.id).unwrap(), vec![gratitude.clone()]);

        // Turning auto-apply off later does not unlink existing entries
        db.toggle_auto_apply(&gratitude.id).unwrap();
        assert_eq!(db.topics_for_entry(&entry.id).unwrap().len(), 1);

        let next = db.create_entry(Path::new("b.wav"), 5, Mood::Neutral, at(10)).unwrap();
        assert!(db.topics_for_entry(&next.id).unwrap().is_empty());
    }

    #[test]
    fn test_update_entry() {
        let db = db();
        let mut entry = db.create_entry(Path::new("a.wav"), 5, Mood::Neutral, at(9)).unwrap();
        entry.title = "Evening".into();
        entry.description = "Long day".into();
        entry.mood = Mood::Stressed;
        entry.transcription = Some("hello".into());
        db.update_entry(&entry).unwrap();

        assert_eq!(db.get_entry(&entry.id).unwrap().unwrap(), entry);

        entry.id = "ghost".into();
        assert!(matches!(db.update_entry(&entry), Err(StoreError::EntryNotFound(_))));
    }

    #[test]
    fn test_delete_cascades_topic_links() {
        let db = db();
        let work = db.create_topic("Work", false).unwrap();
        let entry = db.create_entry(Path::new("a.wav"), 5, Mood::Neutral, at(9)).unwrap();
        db.set_entry_topics(&entry.id, &[work.id.clone()]).unwrap();

        db.delete_entry(&entry.id).unwrap();

        assert!(db.get_entry(&entry.id).unwrap().is_none());
        assert!(db.topics_by_entry().unwrap().is_empty());
        assert_eq!(db.get_all_topics().unwrap(), vec![work]);
        assert!(matches!(db.delete_entry(&entry.id), Err(StoreError::EntryNotFound(_))));
    }

    #[test]
    fn test_topics_by_entry_groups_links() {
        let db = db();
        let work = db.create_topic("Work", false).unwrap();
        let family = db.create_topic("Family", false).unwrap();
        let a = db.create_entry(Path::new("a.wav"), 5, Mood::Neutral, at(9)).unwrap();
        let b = db.create_entry(Path::new("b.wav"), 5, Mood::Neutral, at(10)).unwrap();
        db.set_entry_topics(&a.id, &[work.id.clone(), family.id.clone()]).unwrap();
        db.set_entry_topics(&b.id, &[work.id.clone()]).unwrap();

        let by_entry = db.topics_by_entry().unwrap();
        assert_eq!(by_entry[&a.id], vec![family, work.clone()]);
        assert_eq!(by_entry[&b.id], vec![work]);
    }
}
