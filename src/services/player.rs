use crate::audio::{PlaybackBackend, PlaybackDevice};
use crate::error::PlayerError;
use crate::messages::{PlaybackState, PlayerCommand, fraction};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Interval, MissedTickBehavior};

/// Owns the single playback slot
///
/// Progress is sampled on a fixed interval, but only while the state is
/// `Playing`; the sampler is an arm of the command loop so there is never more
/// than one publisher. When the device reports the source exhausted the player
/// returns to `Idle`.
///
/// Like the recorder, backends may hold !Send output streams; spawn on a
/// LocalSet.
pub struct Player<B: PlaybackBackend> {
    backend: B,
    cmd_rx: mpsc::Receiver<PlayerCommand>,
    state_tx: watch::Sender<PlaybackState>,
    device: Option<Box<dyn PlaybackDevice>>,
    progress_interval: Duration,
}

impl<B: PlaybackBackend> Player<B> {
    pub fn new(
        backend: B,
        cmd_rx: mpsc::Receiver<PlayerCommand>,
        state_tx: watch::Sender<PlaybackState>,
        progress_interval: Duration,
    ) -> Self {
        Self {
            backend,
            cmd_rx,
            state_tx,
            device: None,
            progress_interval,
        }
    }

    pub async fn run(mut self) {
        let mut sampler = tokio::time::interval(self.progress_interval);
        sampler.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let sampling = matches!(*self.state_tx.borrow(), PlaybackState::Playing { .. });

            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd, &mut sampler),
                    None => {
                        tracing::debug!("Player: all handles dropped, shutting down");
                        self.stop();
                        break;
                    }
                },

                _ = sampler.tick(), if sampling => {
                    self.sample_progress();
                }
            }
        }
    }

    fn handle_command(&mut self, cmd: PlayerCommand, sampler: &mut Interval) {
        match cmd {
            PlayerCommand::Play {
                path,
                entry_id,
                reply,
            } => {
                let result = self.play(path, entry_id);
                if result.is_ok() {
                    sampler.reset();
                }
                let _ = reply.send(result);
            }
            PlayerCommand::Pause(reply) => {
                self.pause();
                let _ = reply.send(());
            }
            PlayerCommand::Resume(reply) => {
                if self.resume() {
                    sampler.reset();
                }
                let _ = reply.send(());
            }
            PlayerCommand::Stop(reply) => {
                self.stop();
                let _ = reply.send(());
            }
        }
    }

    fn play(&mut self, path: PathBuf, entry_id: String) -> Result<(), PlayerError> {
        self.release_device();

        match self.backend.open(&path) {
            Ok(device) => {
                let duration = device.duration();
                self.device = Some(device);
                self.state_tx.send_replace(PlaybackState::Playing {
                    entry_id: entry_id.clone(),
                    duration,
                    progress: 0.0,
                });
                tracing::info!("Playing entry {} ({:?})", entry_id, duration);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to play entry {}: {}", entry_id, e);
                self.release_device();
                self.state_tx.send_replace(PlaybackState::Error {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn pause(&mut self) {
        let current = self.state_tx.borrow().clone();
        let PlaybackState::Playing {
            entry_id, duration, ..
        } = current
        else {
            tracing::debug!("Pause ignored, nothing is playing");
            return;
        };
        let Some(device) = self.device.as_mut() else {
            return;
        };

        device.pause();
        let position = device.position();
        self.state_tx.send_replace(PlaybackState::Paused {
            entry_id,
            position,
            duration,
        });
        tracing::debug!("Playback paused at {:?}", position);
    }

    /// Returns true if playback actually resumed
    fn resume(&mut self) -> bool {
        let current = self.state_tx.borrow().clone();
        let PlaybackState::Paused {
            entry_id,
            position,
            duration,
        } = current
        else {
            tracing::debug!("Resume ignored, playback is not paused");
            return false;
        };
        let Some(device) = self.device.as_mut() else {
            return false;
        };

        device.resume();
        self.state_tx.send_replace(PlaybackState::Playing {
            entry_id,
            duration,
            progress: fraction(position, duration),
        });
        tracing::debug!("Playback resumed at {:?}", position);
        true
    }

    fn stop(&mut self) {
        self.release_device();
        self.state_tx.send_replace(PlaybackState::Idle);
    }

    fn release_device(&mut self) {
        if let Some(mut device) = self.device.take() {
            device.stop();
        }
    }

    fn sample_progress(&mut self) {
        let Some(device) = self.device.as_ref() else {
            return;
        };

        if device.is_finished() {
            tracing::info!("Playback complete");
            self.stop();
            return;
        }

        if !device.is_playing() {
            return;
        }

        let sampled = fraction(device.position(), device.duration());
        self.state_tx.send_if_modified(|state| match state {
            PlaybackState::Playing { progress, .. } if *progress != sampled => {
                *progress = sampled;
                true
            }
            _ => false,
        });
    }
}

/// Handle for communicating with the Player
#[derive(Clone)]
pub struct PlayerHandle {
    tx: mpsc::Sender<PlayerCommand>,
    state_rx: watch::Receiver<PlaybackState>,
}

impl PlayerHandle {
    pub fn new(tx: mpsc::Sender<PlayerCommand>, state_rx: watch::Receiver<PlaybackState>) -> Self {
        Self { tx, state_rx }
    }

    pub fn state(&self) -> PlaybackState {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state_rx.clone()
    }

    pub async fn play(&self, path: PathBuf, entry_id: String) -> Result<(), PlayerError> {
        self.request(|reply| PlayerCommand::Play {
            path,
            entry_id,
            reply,
        })
        .await?
    }

    pub async fn pause(&self) -> Result<(), PlayerError> {
        self.request(PlayerCommand::Pause).await
    }

    pub async fn resume(&self) -> Result<(), PlayerError> {
        self.request(PlayerCommand::Resume).await
    }

    pub async fn stop(&self) -> Result<(), PlayerError> {
        self.request(PlayerCommand::Stop).await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> PlayerCommand,
    ) -> Result<T, PlayerError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).await.map_err(|e| {
            PlayerError::ServiceUnavailable(format!("Failed to send command: {}", e))
        })?;

        rx.await.map_err(|e| {
            PlayerError::ServiceUnavailable(format!("Failed to receive response: {}", e))
        })
    }
}

/// Spawn a player on the current LocalSet and return its handle
pub fn spawn<B: PlaybackBackend + 'static>(backend: B, progress_interval: Duration) -> PlayerHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(10);
    let (state_tx, state_rx) = watch::channel(PlaybackState::Idle);

    let player = Player::new(backend, cmd_rx, state_tx, progress_interval);
    tokio::task::spawn_local(player.run());

    PlayerHandle::new(cmd_tx, state_rx)
}
