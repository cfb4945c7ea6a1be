use super::models::{JournalEntry, Topic};
use super::mood::Mood;
use std::collections::HashSet;

/// Mood and topic multi-select filters
///
/// Each dimension matches "any of" its selection; an empty selection matches
/// everything. An entry must pass both dimensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub moods: HashSet<Mood>,
    /// Topic ids
    pub topics: HashSet<String>,
}

impl EntryFilter {
    pub fn toggle_mood(&mut self, mood: Mood) {
        if !self.moods.remove(&mood) {
            self.moods.insert(mood);
        }
    }

    pub fn toggle_topic(&mut self, topic_id: &str) {
        if !self.topics.remove(topic_id) {
            self.topics.insert(topic_id.to_string());
        }
    }

    pub fn clear_moods(&mut self) {
        self.moods.clear();
    }

    pub fn clear_topics(&mut self) {
        self.topics.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.moods.is_empty() && self.topics.is_empty()
    }

    pub fn matches(&self, entry: &JournalEntry, entry_topics: &[Topic]) -> bool {
        let mood_matches = self.moods.is_empty() || self.moods.contains(&entry.mood);
        let topic_matches = self.topics.is_empty()
            || entry_topics.iter().any(|t| self.topics.contains(&t.id));
        mood_matches && topic_matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(mood: Mood) -> JournalEntry {
        JournalEntry::new("x.wav".into(), 1, mood, Utc::now())
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = EntryFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches(&entry(Mood::Sad), &[]));
    }

    #[test]
    fn test_toggle_twice_clears() {
        let mut filter = EntryFilter::default();
        filter.toggle_mood(Mood::Sad);
        filter.toggle_topic("t1");
        assert!(!filter.is_empty());

        filter.toggle_mood(Mood::Sad);
        filter.toggle_topic("t1");
        assert!(filter.is_empty());
    }

    #[test]
    fn test_topic_selection_is_any_of() {
        let work = Topic::new("Work", false);
        let family = Topic::new("Family", false);
        let e = entry(Mood::Neutral);
        let tags = vec![work.clone()];

        let mut filter = EntryFilter::default();
        filter.toggle_topic(&work.id);
        assert!(filter.matches(&e, &tags));

        filter.clear_topics();
        filter.toggle_topic(&family.id);
        assert!(!filter.matches(&e, &tags));

        filter.toggle_topic(&work.id);
        assert!(filter.matches(&e, &tags));
    }

    #[test]
    fn test_dimensions_combine_with_and() {
        let work = Topic::new("Work", false);
        let e = entry(Mood::Stressed);
        let tags = vec![work.clone()];

        let mut filter = EntryFilter::default();
        filter.toggle_topic(&work.id);
        filter.toggle_mood(Mood::Peaceful);
        assert!(!filter.matches(&e, &tags));

        filter.toggle_mood(Mood::Stressed);
        assert!(filter.matches(&e, &tags));

        // Untagged entries never pass a topic selection
        assert!(!filter.matches(&e, &[]));
    }
}
