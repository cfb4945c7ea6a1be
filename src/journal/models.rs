use super::mood::Mood;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// A recorded journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub audio_file_path: PathBuf,
    pub duration_seconds: u32,
    pub transcription: Option<String>,
    pub mood: Mood,
}

impl JournalEntry {
    /// A fresh untitled entry for a finished recording
    pub fn new(
        audio_file_path: PathBuf,
        duration_seconds: u32,
        mood: Mood,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: String::new(),
            description: String::new(),
            created_at,
            audio_file_path,
            duration_seconds,
            transcription: None,
            mood,
        }
    }
}

/// A user-defined topic
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub name: String,
    /// Linked to every newly created entry
    pub auto_apply: bool,
}

impl Topic {
    pub fn new(name: impl Into<String>, auto_apply: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            auto_apply,
        }
    }
}

/// Edits applied from the entry screen
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryEdits {
    pub title: Option<String>,
    pub description: Option<String>,
    pub mood: Option<Mood>,
    /// Replaces the entry's topic set when present
    pub topic_ids: Option<Vec<String>>,
}

impl EntryEdits {
    pub fn apply_to(&self, entry: &mut JournalEntry) {
        if let Some(title) = &self.title {
            entry.title = title.clone();
        }
        if let Some(description) = &self.description {
            entry.description = description.clone();
        }
        if let Some(mood) = self.mood {
            entry.mood = mood;
        }
    }
}
