use super::filter::EntryFilter;
use super::models::{JournalEntry, Topic};
use super::view::{self, DaySection, EntryCard};
use crate::messages::PlaybackState;
use chrono::{DateTime, TimeZone};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Recording panel state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingStatus {
    pub has_started: bool,
    pub is_recording: bool,
    pub is_paused: bool,
    pub elapsed_seconds: u64,
    pub current_file: Option<PathBuf>,
}

impl RecordingStatus {
    pub fn elapsed(&self) -> String {
        view::format_elapsed(self.elapsed_seconds)
    }
}

/// Everything the entry list is derived from
#[derive(Debug, Clone, Default)]
pub struct HomeModel {
    pub entries: Vec<JournalEntry>,
    pub topics_by_entry: HashMap<String, Vec<Topic>>,
    pub topics: Vec<Topic>,
    pub filter: EntryFilter,
    pub playback: PlaybackState,
    pub recording: RecordingStatus,
    pub finished_recording_id: Option<String>,
}

impl HomeModel {
    pub fn entries_by_day<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
    ) -> BTreeMap<DaySection, Vec<EntryCard>> {
        view::entries_by_day(
            &self.entries,
            &self.topics_by_entry,
            &self.filter,
            &self.playback,
            now,
        )
    }

    pub fn entry(&self, id: &str) -> Option<&JournalEntry> {
        self.entries.iter().find(|e| e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::Mood;
    use chrono::Utc;

    #[test]
    fn test_recording_clock_format() {
        let status = RecordingStatus {
            elapsed_seconds: 65,
            ..RecordingStatus::default()
        };
        assert_eq!(status.elapsed(), "00:01:05");
    }

    #[test]
    fn test_model_recomputes_from_filter() {
        let now = Utc::now();
        let mut model = HomeModel {
            entries: vec![
                JournalEntry::new("a.wav".into(), 3, Mood::Sad, now),
                JournalEntry::new("b.wav".into(), 4, Mood::Excited, now),
            ],
            ..HomeModel::default()
        };

        let all: usize = model.entries_by_day(&now).values().map(Vec::len).sum();
        assert_eq!(all, 2);

        model.filter.toggle_mood(Mood::Excited);
        let filtered = model.entries_by_day(&now);
        assert_eq!(filtered[&DaySection::Today].len(), 1);
        assert_eq!(filtered[&DaySection::Today][0].mood, Mood::Excited);
    }
}
