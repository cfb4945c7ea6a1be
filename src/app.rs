use crate::commands::{self, Command};
use crate::config::Config;
use crate::error::{RecorderError, StoreError};
use crate::journal::{DaySection, EntryCard, EntryEdits, HomeModel, Mood, RecordingStatus, Topic};
use crate::messages::{PlaybackState, RecorderState};
use crate::services::{PlayerHandle, RecorderHandle};
use crate::storage::JournalDb;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

/// Glue between the command loop, the audio services and the store
pub struct App {
    config: Config,
    db: JournalDb,
    recorder: RecorderHandle,
    player: PlayerHandle,
    model: HomeModel,
}

impl App {
    pub fn new(
        config: Config,
        db: JournalDb,
        recorder: RecorderHandle,
        player: PlayerHandle,
    ) -> Result<Self> {
        let mut app = Self {
            config,
            db,
            recorder,
            player,
            model: HomeModel::default(),
        };
        app.refresh()?;
        Ok(app)
    }

    pub fn model(&self) -> &HomeModel {
        &self.model
    }

    /// Reload entries and topics from the store
    pub fn refresh(&mut self) -> Result<()> {
        self.model.entries = self.db.get_all_entries()?;
        self.model.topics_by_entry = self.db.topics_by_entry()?;
        self.model.topics = self.db.get_all_topics()?;

        // Drop filter selections for topics that no longer exist
        let topics = &self.model.topics;
        self.model
            .filter
            .topics
            .retain(|id| topics.iter().any(|t| &t.id == id));

        tracing::debug!(
            "Refreshed {} entries, {} topics",
            self.model.entries.len(),
            self.model.topics.len()
        );
        Ok(())
    }

    /// Entry list as rendered sections
    pub fn snapshot<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> BTreeMap<DaySection, Vec<EntryCard>> {
        self.model.entries_by_day(now)
    }

    pub async fn start_recording(&mut self) -> Result<PathBuf> {
        if let Some(path) = &self.model.recording.current_file {
            tracing::warn!("Recording already in progress: {:?}", path);
            return Ok(path.clone());
        }

        let audio_dir = self.config.audio_dir();
        std::fs::create_dir_all(&audio_dir)
            .with_context(|| format!("Failed to create audio directory: {:?}", audio_dir))?;

        let path = audio_dir.join(format!(
            "audio_{}_{}.wav",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        ));
        self.recorder.start(path.clone()).await?;

        self.model.finished_recording_id = None;
        self.model.recording = RecordingStatus {
            has_started: true,
            is_recording: true,
            is_paused: false,
            elapsed_seconds: 0,
            current_file: Some(path.clone()),
        };
        tracing::info!("Started recording to {:?}", path);
        Ok(path)
    }

    pub async fn pause_recording(&mut self) -> Result<()> {
        self.recorder.pause().await?;
        self.sync_recorder_state();
        Ok(())
    }

    pub async fn resume_recording(&mut self) -> Result<()> {
        self.recorder.resume().await?;
        self.sync_recorder_state();
        Ok(())
    }

    /// Discard the active recording and its file
    pub async fn cancel_recording(&mut self) -> Result<()> {
        self.recorder.cancel().await?;
        self.model.recording = RecordingStatus::default();
        tracing::info!("Recording cancelled");
        Ok(())
    }

    /// Stop recording and turn the file into a new entry; returns its id
    pub async fn finish_recording(&mut self) -> Result<String> {
        let finished = match self.recorder.stop().await {
            Ok(finished) => finished,
            Err(err) => {
                if let RecorderError::Io { path, .. } | RecorderError::Finalize { path, .. } = &err {
                    discard_unusable_recording(path);
                }
                self.sync_recorder_state();
                return Err(err.into());
            }
        };
        self.model.recording = RecordingStatus::default();

        let mood = self.db.default_mood()?.unwrap_or(Mood::Neutral);
        let duration_seconds = u32::try_from(finished.elapsed.as_secs()).unwrap_or(u32::MAX);
        let entry = self
            .db
            .create_entry(&finished.path, duration_seconds, mood, Utc::now())?;

        tracing::info!(
            "Recording saved as entry {} ({}s, {} bytes)",
            entry.id,
            duration_seconds,
            finished.data_bytes
        );
        self.model.finished_recording_id = Some(entry.id.clone());
        self.refresh()?;
        Ok(entry.id)
    }

    /// Advance the on-screen clock by one second while audio is captured
    pub fn tick_recording_clock(&mut self) {
        let status = &mut self.model.recording;
        if status.is_recording && !status.is_paused {
            status.elapsed_seconds += 1;
        }
    }

    fn sync_recorder_state(&mut self) {
        let status = &mut self.model.recording;
        match self.recorder.state() {
            RecorderState::Idle => *status = RecordingStatus::default(),
            RecorderState::Recording { path } => {
                status.is_recording = true;
                status.is_paused = false;
                status.current_file = Some(path);
            }
            RecorderState::Paused { path } => {
                status.is_recording = false;
                status.is_paused = true;
                status.current_file = Some(path);
            }
        }
    }

    /// Play, pause or resume the entry's audio
    ///
    /// The same entry toggles between playing and paused; any other entry
    /// replaces the current session. Missing files are ignored.
    pub async fn toggle_playback(&mut self, entry_id: &str) -> Result<()> {
        match self.player.state() {
            PlaybackState::Playing { entry_id: id, .. } if id == entry_id => {
                self.player.pause().await?;
            }
            PlaybackState::Paused { entry_id: id, .. } if id == entry_id => {
                self.player.resume().await?;
            }
            _ => {
                let entry = self
                    .model
                    .entry(entry_id)
                    .ok_or_else(|| StoreError::EntryNotFound(entry_id.to_string()))?;

                if !entry.audio_file_path.exists() {
                    tracing::warn!(
                        "Audio for entry {} is missing: {:?}",
                        entry_id,
                        entry.audio_file_path
                    );
                    return Ok(());
                }
                let (path, id) = (entry.audio_file_path.clone(), entry.id.clone());
                self.player.play(path, id).await?;
            }
        }

        self.model.playback = self.player.state();
        Ok(())
    }

    pub async fn stop_playback(&mut self) -> Result<()> {
        self.player.stop().await?;
        self.model.playback = self.player.state();
        Ok(())
    }

    pub fn toggle_mood_filter(&mut self, mood: Mood) {
        self.model.filter.toggle_mood(mood);
    }

    pub fn toggle_topic_filter(&mut self, topic_id: &str) {
        self.model.filter.toggle_topic(topic_id);
    }

    pub fn clear_mood_filter(&mut self) {
        self.model.filter.clear_moods();
    }

    pub fn clear_topic_filter(&mut self) {
        self.model.filter.clear_topics();
    }

    /// Apply edits from the entry screen
    pub fn save_entry(&mut self, entry_id: &str, edits: &EntryEdits) -> Result<()> {
        let mut entry = self
            .db
            .get_entry(entry_id)?
            .ok_or_else(|| StoreError::EntryNotFound(entry_id.to_string()))?;

        edits.apply_to(&mut entry);
        self.db.update_entry(&entry)?;
        if let Some(topic_ids) = &edits.topic_ids {
            self.db.set_entry_topics(entry_id, topic_ids)?;
        }

        tracing::info!("Saved entry {}", entry_id);
        self.refresh()
    }

    /// Delete an entry and its recording
    pub async fn delete_entry(&mut self, entry_id: &str) -> Result<()> {
        let entry = self
            .db
            .get_entry(entry_id)?
            .ok_or_else(|| StoreError::EntryNotFound(entry_id.to_string()))?;

        if self.player.state().entry_id() == Some(entry_id) {
            self.stop_playback().await?;
        }

        self.db.delete_entry(entry_id)?;
        if let Err(e) = std::fs::remove_file(&entry.audio_file_path) {
            tracing::warn!(
                "Failed to remove recording {:?}: {}",
                entry.audio_file_path,
                e
            );
        }

        self.refresh()
    }

    pub fn create_topic(&mut self, name: &str, auto_apply: bool) -> Result<Topic> {
        let topic = self.db.create_topic(name, auto_apply)?;
        tracing::info!("Created topic {} (auto-apply: {})", topic.name, topic.auto_apply);
        self.refresh()?;
        Ok(topic)
    }

    pub fn toggle_auto_apply(&mut self, topic_name: &str) -> Result<Topic> {
        let id = self.topic_id(topic_name)?;
        let topic = self.db.toggle_auto_apply(&id)?;
        self.refresh()?;
        Ok(topic)
    }

    /// Delete a topic; entries keep everything but the link
    pub fn delete_topic(&mut self, topic_name: &str) -> Result<()> {
        let id = self.topic_id(topic_name)?;
        self.db.delete_topic(&id)?;
        tracing::info!("Deleted topic {}", topic_name);
        self.refresh()
    }

    pub fn set_default_mood(&mut self, mood: Mood) -> Result<()> {
        self.db.set_default_mood(mood)?;
        tracing::info!("Default mood set to {}", mood);
        Ok(())
    }

    fn topic_id(&self, name: &str) -> Result<String> {
        self.db
            .find_topic_by_name(name)?
            .map(|t| t.id)
            .ok_or_else(|| StoreError::TopicNotFound(name.to_string()).into())
    }

    /// Resolve a unique id prefix to a full entry id
    pub fn resolve_entry(&self, prefix: &str) -> Result<String> {
        let mut matches = self.model.entries.iter().filter(|e| e.id.starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(entry), None) => Ok(entry.id.clone()),
            (Some(_), Some(_)) => Err(anyhow::anyhow!("Entry prefix {:?} is ambiguous", prefix)),
            (None, _) => Err(StoreError::EntryNotFound(prefix.to_string()).into()),
        }
    }

    /// Execute one command; returns false when the app should exit
    pub async fn handle(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Record => {
                let path = self.start_recording().await?;
                println!("recording to {}", path.display());
            }
            Command::Pause => self.pause_recording().await?,
            Command::Resume => self.resume_recording().await?,
            Command::Cancel => self.cancel_recording().await?,
            Command::Finish => {
                let id = self.finish_recording().await?;
                println!("saved entry {}", id);
            }
            Command::Play(prefix) => {
                let id = self.resolve_entry(&prefix)?;
                self.toggle_playback(&id).await?;
            }
            Command::Stop => self.stop_playback().await?,
            Command::List => self.print_entries(),
            Command::Topics => self.print_topics(),
            Command::FilterMood(mood) => {
                self.toggle_mood_filter(mood);
                self.print_entries();
            }
            Command::FilterTopic(name) => {
                let id = self.topic_id(&name)?;
                self.toggle_topic_filter(&id);
                self.print_entries();
            }
            Command::ClearMoods => {
                self.clear_mood_filter();
                self.print_entries();
            }
            Command::ClearTopics => {
                self.clear_topic_filter();
                self.print_entries();
            }
            Command::NewTopic { name, auto_apply } => {
                self.create_topic(&name, auto_apply)?;
            }
            Command::AutoApply(name) => {
                let topic = self.toggle_auto_apply(&name)?;
                println!("{} auto-apply: {}", topic.name, topic.auto_apply);
            }
            Command::DeleteTopic(name) => self.delete_topic(&name)?,
            Command::DefaultMood(mood) => self.set_default_mood(mood)?,
            Command::Title { entry, title } => {
                let id = self.resolve_entry(&entry)?;
                let edits = EntryEdits {
                    title: Some(title),
                    ..EntryEdits::default()
                };
                self.save_entry(&id, &edits)?;
            }
            Command::Describe { entry, description } => {
                let id = self.resolve_entry(&entry)?;
                let edits = EntryEdits {
                    description: Some(description),
                    ..EntryEdits::default()
                };
                self.save_entry(&id, &edits)?;
            }
            Command::SetMood { entry, mood } => {
                let id = self.resolve_entry(&entry)?;
                let edits = EntryEdits {
                    mood: Some(mood),
                    ..EntryEdits::default()
                };
                self.save_entry(&id, &edits)?;
            }
            Command::Tag { entry, topics } => {
                let id = self.resolve_entry(&entry)?;
                let topic_ids = topics
                    .iter()
                    .map(|name| self.topic_id(name))
                    .collect::<Result<Vec<_>>>()?;
                let edits = EntryEdits {
                    topic_ids: Some(topic_ids),
                    ..EntryEdits::default()
                };
                self.save_entry(&id, &edits)?;

                let tagged: Vec<String> = self
                    .db
                    .topics_for_entry(&id)?
                    .into_iter()
                    .map(|t| t.name)
                    .collect();
                println!("topics: {}", tagged.join(", "));
            }
            Command::Delete(prefix) => {
                let id = self.resolve_entry(&prefix)?;
                self.delete_entry(&id).await?;
            }
            Command::Help => println!("{}", commands::HELP),
            Command::Quit => return Ok(false),
        }

        Ok(true)
    }

    fn print_entries(&self) {
        let sections = self.snapshot(&Local::now());
        if !self.model.filter.is_empty() {
            println!("(filtered)");
        }
        if sections.is_empty() {
            println!("no entries");
            return;
        }

        for (section, cards) in sections {
            println!("{}", section.label());
            for card in cards {
                let topics: Vec<&str> = card.topics.iter().map(|t| t.name.as_str()).collect();
                let playing = if card.is_playing {
                    format!(" > {:.0}%", card.progress * 100.0)
                } else {
                    String::new()
                };
                println!(
                    "  {} {} {:>5} {:<8} {}{}{}",
                    &card.id[..card.id.len().min(8)],
                    card.time,
                    card.duration,
                    card.mood.as_str(),
                    if card.title.is_empty() { "(untitled)" } else { card.title.as_str() },
                    if topics.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", topics.join(", "))
                    },
                    playing
                );
            }
        }
    }

    fn print_topics(&self) {
        for topic in &self.model.topics {
            let auto = if topic.auto_apply { " (auto)" } else { "" };
            println!("  {}{}", topic.name, auto);
        }
    }

    fn report_failure(&mut self, e: &anyhow::Error) {
        match e.downcast_ref::<RecorderError>() {
            Some(err) if !err.is_recoverable() => {
                tracing::error!("Recording lost: {:#}", e);
                self.sync_recorder_state();
            }
            _ => tracing::error!("Command failed: {:#}", e),
        }
    }

    /// Main loop: stdin commands plus service and store notifications
    pub async fn run(mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut recorder_rx = self.recorder.subscribe();
        let mut playback_rx = self.player.subscribe();
        let mut revision_rx = self.db.subscribe();

        let mut clock = tokio::time::interval(Duration::from_secs(1));
        clock.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!("Ready! Type `help` for commands");

        loop {
            let ticking = self.model.recording.is_recording && !self.model.recording.is_paused;

            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("Failed to read stdin")? else {
                        tracing::debug!("stdin closed");
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }

                    let keep_running = match commands::parse(&line) {
                        Ok(command) => match self.handle(command).await {
                            Ok(keep_running) => keep_running,
                            Err(e) => {
                                self.report_failure(&e);
                                true
                            }
                        },
                        Err(e) => {
                            println!("{}", e);
                            true
                        }
                    };
                    if !keep_running {
                        break;
                    }
                }

                Ok(()) = recorder_rx.changed() => {
                    let state = recorder_rx.borrow_and_update().clone();
                    tracing::debug!("Recorder state: {:?}", state);
                    if state.is_recording() {
                        clock.reset();
                    }
                    if self.model.recording.has_started {
                        self.sync_recorder_state();
                    }
                }

                Ok(()) = playback_rx.changed() => {
                    let state = playback_rx.borrow_and_update().clone();
                    if let PlaybackState::Error { message } = &state {
                        tracing::error!("Playback failed: {}", message);
                    }
                    self.model.playback = state;
                }

                Ok(()) = revision_rx.changed() => {
                    revision_rx.borrow_and_update();
                    if let Err(e) = self.refresh() {
                        tracing::error!("Failed to refresh journal: {:#}", e);
                    }
                }

                _ = clock.tick(), if ticking => {
                    self.tick_recording_clock();
                    tracing::debug!("Recording {}", self.model.recording.elapsed());
                }

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl+C, shutting down");
                    break;
                }
            }
        }

        self.shutdown().await;
        tracing::info!("Echo journal shutdown complete");
        Ok(())
    }

    /// An unfinished recording is discarded, like leaving the screen
    async fn shutdown(&mut self) {
        if self.model.recording.current_file.is_some() {
            if let Err(e) = self.cancel_recording().await {
                tracing::warn!("Failed to discard recording: {}", e);
            }
        }
        if let Err(e) = self.stop_playback().await {
            tracing::warn!("Failed to stop playback: {}", e);
        }
    }
}

/// A recording whose header could not be finalized is not a valid WAV file
fn discard_unusable_recording(path: &std::path::Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::warn!("Removed unfinished recording {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove unfinished recording {:?}: {}", path, e),
    }
}
