// Topic repository
// Topics, the auto-apply flag, and replacing an entry's topic set

use super::{JournalDb, Result};
use crate::error::StoreError;
use crate::journal::Topic;
use rusqlite::{Connection, OptionalExtension, Row, params};

impl JournalDb {
    /// Create a topic; names must be non-blank and unique ignoring case
    pub fn create_topic(&self, name: &str, auto_apply: bool) -> Result<Topic> {
        let name = name.trim();
        self.write(|conn| {
            if name.is_empty() {
                return Err(StoreError::BlankTopicName);
            }
            if topic_name_exists_impl(conn, name)? {
                return Err(StoreError::TopicNameTaken(name.to_string()));
            }

            let topic = Topic::new(name, auto_apply);
            conn.execute(
                "INSERT INTO topics (id, name, auto_apply) VALUES (?1, ?2, ?3)",
                params![topic.id, topic.name, topic.auto_apply],
            )?;
            Ok(topic)
        })
    }

    /// Case-insensitive lookup
    pub fn find_topic_by_name(&self, name: &str) -> Result<Option<Topic>> {
        self.with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, name, auto_apply FROM topics WHERE name = ?1 COLLATE NOCASE",
                    params![name.trim()],
                    topic_from_row,
                )
                .optional()?)
        })
    }

    /// All topics, by name
    pub fn get_all_topics(&self) -> Result<Vec<Topic>> {
        self.with_connection(|conn| query_topics(conn, "SELECT id, name, auto_apply FROM topics ORDER BY name ASC"))
    }

    /// Flip the auto-apply flag; existing entry links are untouched
    pub fn toggle_auto_apply(&self, id: &str) -> Result<Topic> {
        self.write(|conn| {
            let updated = conn.execute(
                "UPDATE topics SET auto_apply = NOT auto_apply WHERE id = ?1",
                params![id],
            )?;
            if updated == 0 {
                return Err(StoreError::TopicNotFound(id.to_string()));
            }
            Ok(conn.query_row(
                "SELECT id, name, auto_apply FROM topics WHERE id = ?1",
                params![id],
                topic_from_row,
            )?)
        })
    }

    pub fn delete_topic(&self, id: &str) -> Result<()> {
        self.write(|conn| {
            let deleted = conn.execute("DELETE FROM topics WHERE id = ?1", params![id])?;
            if deleted == 0 {
                return Err(StoreError::TopicNotFound(id.to_string()));
            }
            Ok(())
        })
    }

    /// Replace an entry's topics in one transaction
    pub fn set_entry_topics(&self, entry_id: &str, topic_ids: &[String]) -> Result<()> {
        self.write(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM entry_topics WHERE entry_id = ?1", params![entry_id])?;
            for topic_id in topic_ids {
                tx.execute(
                    "INSERT OR IGNORE INTO entry_topics (entry_id, topic_id) VALUES (?1, ?2)",
                    params![entry_id, topic_id],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }
}

pub(super) fn topic_from_row(row: &Row<'_>) -> rusqlite::Result<Topic> {
    Ok(Topic {
        id: row.get(0)?,
        name: row.get(1)?,
        auto_apply: row.get(2)?,
    })
}

fn topic_name_exists_impl(conn: &Connection, name: &str) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM topics WHERE name = ?1 COLLATE NOCASE)",
        params![name],
        |row| row.get(0),
    )?)
}

fn query_topics(conn: &Connection, sql: &str) -> Result<Vec<Topic>> {
    let mut stmt = conn.prepare(sql)?;
    let topics = stmt.query_map([], topic_from_row)?;
    Ok(topics.collect::<rusqlite::Result<Vec<_>>>()?)
}
