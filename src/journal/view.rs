//! Day-grouped entry list.
//!
//! [`entries_by_day`] is a pure function: every input, including the current
//! time, is passed in. Sections are computed against `now`, so an entry
//! created late yesterday moves from Today to Yesterday at midnight without
//! the entry itself changing.

use super::filter::EntryFilter;
use super::models::{JournalEntry, Topic};
use super::mood::Mood;
use crate::messages::PlaybackState;
use chrono::{DateTime, NaiveDate, TimeZone};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DaySection {
    Today,
    Yesterday,
    Date(NaiveDate),
}

impl DaySection {
    pub fn for_date(date: NaiveDate, today: NaiveDate) -> Self {
        if date == today {
            DaySection::Today
        } else if Some(date) == today.pred_opt() {
            DaySection::Yesterday
        } else {
            DaySection::Date(date)
        }
    }

    pub fn label(&self) -> String {
        match self {
            DaySection::Today => "Today".to_string(),
            DaySection::Yesterday => "Yesterday".to_string(),
            DaySection::Date(date) => date.format("%A, %b %-d %Y").to_string(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            DaySection::Today => 0,
            DaySection::Yesterday => 1,
            DaySection::Date(_) => 2,
        }
    }
}

/// Today, Yesterday, then older dates newest first
impl Ord for DaySection {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (DaySection::Date(a), DaySection::Date(b)) => b.cmp(a),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for DaySection {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One rendered row of the entry list
#[derive(Debug, Clone, PartialEq)]
pub struct EntryCard {
    pub id: String,
    pub title: String,
    pub description: String,
    pub topics: Vec<Topic>,
    /// Local time of day, `HH:MM`
    pub time: String,
    /// `m:ss`
    pub duration: String,
    pub mood: Mood,
    pub is_playing: bool,
    pub progress: f32,
}

/// Filter, group and format entries for display.
pub fn entries_by_day<Tz: TimeZone>(
    entries: &[JournalEntry],
    topics_by_entry: &HashMap<String, Vec<Topic>>,
    filter: &EntryFilter,
    playback: &PlaybackState,
    now: &DateTime<Tz>,
) -> BTreeMap<DaySection, Vec<EntryCard>> {
    let zone = now.timezone();
    let today = now.date_naive();

    let mut visible: Vec<&JournalEntry> = entries
        .iter()
        .filter(|entry| filter.matches(entry, topics_for(topics_by_entry, &entry.id)))
        .collect();
    visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut sections: BTreeMap<DaySection, Vec<EntryCard>> = BTreeMap::new();
    for entry in visible {
        let local = entry.created_at.with_timezone(&zone).naive_local();
        let section = DaySection::for_date(local.date(), today);

        let is_playing = playback.is_playing(&entry.id);
        let card = EntryCard {
            id: entry.id.clone(),
            title: entry.title.clone(),
            description: entry.description.clone(),
            topics: topics_for(topics_by_entry, &entry.id).to_vec(),
            time: local.format("%H:%M").to_string(),
            duration: format_duration(entry.duration_seconds),
            mood: entry.mood,
            is_playing,
            progress: if is_playing { playback.progress() } else { 0.0 },
        };

        sections.entry(section).or_default().push(card);
    }

    sections
}

fn topics_for<'a>(topics_by_entry: &'a HashMap<String, Vec<Topic>>, id: &str) -> &'a [Topic] {
    topics_by_entry.get(id).map(Vec::as_slice).unwrap_or(&[])
}

/// `m:ss`
pub fn format_duration(total_seconds: u32) -> String {
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// `HH:MM:SS`, used for the running recording clock
pub fn format_elapsed(total_seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        total_seconds / 3600,
        (total_seconds / 60) % 60,
        total_seconds % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};
    use std::collections::HashSet;
    use std::time::Duration;

    fn zone() -> FixedOffset {
        FixedOffset::east_opt(2 * 3600).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<FixedOffset> {
        zone().with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn entry(id: &str, mood: Mood, created: DateTime<FixedOffset>) -> JournalEntry {
        let mut e = JournalEntry::new(format!("{}.wav", id).into(), 75, mood, created.with_timezone(&Utc));
        e.id = id.to_string();
        e
    }

    fn ids(sections: &BTreeMap<DaySection, Vec<EntryCard>>) -> HashSet<String> {
        sections.values().flatten().map(|c| c.id.clone()).collect()
    }

    fn sample() -> (Vec<JournalEntry>, HashMap<String, Vec<Topic>>, Topic, Topic) {
        let work = Topic::new("Work", false);
        let family = Topic::new("Family", true);
        let entries = vec![
            entry("a", Mood::Stressed, at(2026, 10, 16, 9, 0, 0)),
            entry("b", Mood::Peaceful, at(2026, 10, 16, 18, 30, 0)),
            entry("c", Mood::Sad, at(2026, 10, 15, 21, 5, 0)),
            entry("d", Mood::Excited, at(2026, 10, 12, 7, 45, 0)),
            entry("e", Mood::Neutral, at(2026, 9, 30, 12, 0, 0)),
        ];
        let mut topics = HashMap::new();
        topics.insert("a".to_string(), vec![work.clone()]);
        topics.insert("b".to_string(), vec![family.clone()]);
        topics.insert("c".to_string(), vec![work.clone(), family.clone()]);
        topics.insert("d".to_string(), vec![family.clone()]);
        topics.insert("e".to_string(), vec![work.clone()]);
        (entries, topics, work, family)
    }

    #[test]
    fn test_sections_are_ordered() {
        let (entries, topics, _, _) = sample();
        let now = at(2026, 10, 16, 20, 0, 0);

        let sections = entries_by_day(&entries, &topics, &EntryFilter::default(), &PlaybackState::Idle, &now);
        let keys: Vec<DaySection> = sections.keys().copied().collect();

        assert_eq!(
            keys,
            vec![
                DaySection::Today,
                DaySection::Yesterday,
                DaySection::Date(NaiveDate::from_ymd_opt(2026, 10, 12).unwrap()),
                DaySection::Date(NaiveDate::from_ymd_opt(2026, 9, 30).unwrap()),
            ]
        );

        let today: Vec<&str> = sections[&DaySection::Today].iter().map(|c| c.id.as_str()).collect();
        assert_eq!(today, vec!["b", "a"]);
    }

    #[test]
    fn test_row_formatting() {
        let (entries, topics, _, _) = sample();
        let now = at(2026, 10, 16, 20, 0, 0);

        let sections = entries_by_day(&entries, &topics, &EntryFilter::default(), &PlaybackState::Idle, &now);
        let card = &sections[&DaySection::Yesterday][0];

        assert_eq!(card.time, "21:05");
        assert_eq!(card.duration, "1:15");
        assert_eq!(card.topics.len(), 2);
        assert!(!card.is_playing);
        assert_eq!(card.progress, 0.0);
    }

    #[test]
    fn test_entry_moves_to_yesterday_at_midnight() {
        let late = entry("late", Mood::Neutral, at(2026, 10, 15, 23, 59, 59));
        let before = late.clone();
        let entries = vec![late];
        let topics = HashMap::new();
        let filter = EntryFilter::default();

        let just_before = at(2026, 10, 15, 23, 59, 59) + chrono::Duration::milliseconds(500);
        let sections = entries_by_day(&entries, &topics, &filter, &PlaybackState::Idle, &just_before);
        assert!(sections.contains_key(&DaySection::Today));

        let after_midnight = at(2026, 10, 16, 0, 0, 1);
        let sections = entries_by_day(&entries, &topics, &filter, &PlaybackState::Idle, &after_midnight);
        assert_eq!(sections.keys().copied().collect::<Vec<_>>(), vec![DaySection::Yesterday]);

        assert_eq!(entries[0], before);
    }

    #[test]
    fn test_local_date_uses_the_clock_zone() {
        // 23:30 UTC on the 15th is 01:30 on the 16th at +02:00
        let created = Utc.with_ymd_and_hms(2026, 10, 15, 23, 30, 0).unwrap();
        let mut e = entry("z", Mood::Neutral, at(2026, 1, 1, 0, 0, 0));
        e.created_at = created;

        let sections = entries_by_day(
            &[e],
            &HashMap::new(),
            &EntryFilter::default(),
            &PlaybackState::Idle,
            &at(2026, 10, 16, 12, 0, 0),
        );
        let card = &sections[&DaySection::Today][0];
        assert_eq!(card.time, "01:30");
    }

    #[test]
    fn test_grouping_is_idempotent() {
        let (entries, topics, work, _) = sample();
        let now = at(2026, 10, 16, 20, 0, 0);
        let mut filter = EntryFilter::default();
        filter.toggle_topic(&work.id);
        let playback = PlaybackState::Playing {
            entry_id: "a".into(),
            duration: Duration::from_secs(75),
            progress: 0.4,
        };

        let first = entries_by_day(&entries, &topics, &filter, &playback, &now);
        let second = entries_by_day(&entries, &topics, &filter, &playback, &now);
        assert_eq!(first, second);
        assert_eq!(format!("{:?}", first), format!("{:?}", second));
    }

    #[test]
    fn test_filter_output_is_exact_subset() {
        let (entries, topics, work, family) = sample();
        let now = at(2026, 10, 16, 20, 0, 0);

        let mut filters = vec![EntryFilter::default()];
        for mood in Mood::ALL {
            let mut f = EntryFilter::default();
            f.toggle_mood(mood);
            filters.push(f);
        }
        for topic in [&work, &family] {
            let mut f = EntryFilter::default();
            f.toggle_topic(&topic.id);
            filters.push(f.clone());
            f.toggle_mood(Mood::Sad);
            f.toggle_mood(Mood::Peaceful);
            filters.push(f);
        }

        for filter in filters {
            let got = ids(&entries_by_day(&entries, &topics, &filter, &PlaybackState::Idle, &now));
            let expected: HashSet<String> = entries
                .iter()
                .filter(|e| {
                    let tags = topics.get(&e.id).cloned().unwrap_or_default();
                    (filter.moods.is_empty() || filter.moods.contains(&e.mood))
                        && (filter.topics.is_empty() || tags.iter().any(|t| filter.topics.contains(&t.id)))
                })
                .map(|e| e.id.clone())
                .collect();
            assert_eq!(got, expected, "filter {:?}", filter);
        }
    }

    #[test]
    fn test_full_coverage_filters_match_no_filter() {
        let (entries, topics, work, family) = sample();
        let now = at(2026, 10, 16, 20, 0, 0);
        let unfiltered = entries_by_day(&entries, &topics, &EntryFilter::default(), &PlaybackState::Idle, &now);

        let mut all_moods = EntryFilter::default();
        Mood::ALL.into_iter().for_each(|m| all_moods.toggle_mood(m));
        assert_eq!(entries_by_day(&entries, &topics, &all_moods, &PlaybackState::Idle, &now), unfiltered);

        let mut all_topics = EntryFilter::default();
        all_topics.toggle_topic(&work.id);
        all_topics.toggle_topic(&family.id);
        assert_eq!(entries_by_day(&entries, &topics, &all_topics, &PlaybackState::Idle, &now), unfiltered);
    }

    #[test]
    fn test_work_family_scenario() {
        let work = Topic::new("Work", false);
        let family = Topic::new("Family", false);
        let entries = vec![entry("w", Mood::Neutral, at(2026, 10, 16, 8, 0, 0))];
        let mut topics = HashMap::new();
        topics.insert("w".to_string(), vec![work.clone()]);
        let now = at(2026, 10, 16, 9, 0, 0);

        let mut filter = EntryFilter::default();
        filter.toggle_topic(&work.id);
        assert_eq!(ids(&entries_by_day(&entries, &topics, &filter, &PlaybackState::Idle, &now)).len(), 1);

        let mut filter = EntryFilter::default();
        filter.toggle_topic(&family.id);
        assert!(entries_by_day(&entries, &topics, &filter, &PlaybackState::Idle, &now).is_empty());

        filter.toggle_topic(&work.id);
        assert_eq!(ids(&entries_by_day(&entries, &topics, &filter, &PlaybackState::Idle, &now)).len(), 1);
    }

    #[test]
    fn test_progress_only_for_playing_entry() {
        let (entries, topics, _, _) = sample();
        let now = at(2026, 10, 16, 20, 0, 0);

        let playing = PlaybackState::Playing {
            entry_id: "a".into(),
            duration: Duration::from_secs(75),
            progress: 0.4,
        };
        let sections = entries_by_day(&entries, &topics, &EntryFilter::default(), &playing, &now);
        for card in sections.values().flatten() {
            if card.id == "a" {
                assert!(card.is_playing);
                assert_eq!(card.progress, 0.4);
            } else {
                assert!(!card.is_playing);
                assert_eq!(card.progress, 0.0);
            }
        }

        let paused = PlaybackState::Paused {
            entry_id: "a".into(),
            position: Duration::from_secs(30),
            duration: Duration::from_secs(75),
        };
        let sections = entries_by_day(&entries, &topics, &EntryFilter::default(), &paused, &now);
        let card = &sections[&DaySection::Today][1];
        assert_eq!(card.id, "a");
        assert!(!card.is_playing);
        assert_eq!(card.progress, 0.0);
    }

    #[test]
    fn test_duration_formats() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(59), "0:59");
        assert_eq!(format_duration(605), "10:05");
        assert_eq!(format_elapsed(3_725), "01:02:05");
    }

    #[test]
    fn test_section_labels() {
        assert_eq!(DaySection::Today.label(), "Today");
        let date = DaySection::Date(NaiveDate::from_ymd_opt(2026, 10, 12).unwrap());
        assert_eq!(date.label(), "Monday, Oct 12 2026");
    }
}
