use crate::audio::{AudioFormat, CaptureBackend, CaptureStream, WavSink};
use crate::error::RecorderError;
use crate::messages::{FinishedRecording, RecorderCommand, RecorderState};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

/// Chunks in flight between the capture bridge and the recorder
const AUDIO_CHANNEL_DEPTH: usize = 100;

struct RecordingSession {
    sink: WavSink,
    stream: Option<CaptureStream>,
    paused: bool,
    /// Unpaused time accumulated before the current run
    elapsed: Duration,
    resumed_at: Option<Instant>,
    dropped_chunks: u64,
}

impl RecordingSession {
    fn new(sink: WavSink, stream: CaptureStream) -> Self {
        Self {
            sink,
            stream: Some(stream),
            paused: false,
            elapsed: Duration::ZERO,
            resumed_at: Some(Instant::now()),
            dropped_chunks: 0,
        }
    }

    fn elapsed(&self) -> Duration {
        self.elapsed + self.resumed_at.map(|t| t.elapsed()).unwrap_or_default()
    }

    fn pause(&mut self) {
        if let Some(started) = self.resumed_at.take() {
            self.elapsed += started.elapsed();
        }
        self.paused = true;
    }

    fn resume(&mut self) {
        if self.resumed_at.is_none() {
            self.resumed_at = Some(Instant::now());
        }
        self.paused = false;
    }
}

/// Coordinates audio capture and WAV encoding
///
/// This service:
/// - Manages the capture device lifecycle through a [`CaptureBackend`]
/// - Receives fixed-size PCM buffers via channel
/// - Appends buffers to the WAV sink unless paused
/// - Patches the WAV header when the recording stops
///
/// Buffers that arrive while paused are discarded, so the file only ever
/// contains audio captured while unpaused.
///
/// Note: backends may hold a cpal::Stream which is !Send, so this service
/// must be spawned on a LocalSet using tokio::task::spawn_local.
pub struct Recorder<B: CaptureBackend> {
    format: AudioFormat,
    backend: B,
    cmd_rx: mpsc::Receiver<RecorderCommand>,
    audio_rx: mpsc::Receiver<Vec<i16>>,
    audio_tx: mpsc::Sender<Vec<i16>>,
    state_tx: watch::Sender<RecorderState>,
    session: Option<RecordingSession>,
}

impl<B: CaptureBackend> Recorder<B> {
    pub fn new(
        format: AudioFormat,
        backend: B,
        cmd_rx: mpsc::Receiver<RecorderCommand>,
        state_tx: watch::Sender<RecorderState>,
    ) -> Self {
        let (audio_tx, audio_rx) = mpsc::channel(AUDIO_CHANNEL_DEPTH);
        Self {
            format,
            backend,
            cmd_rx,
            audio_rx,
            audio_tx,
            state_tx,
            session: None,
        }
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                // Buffers queued before a command are handled before it
                Some(chunk) = self.audio_rx.recv(), if self.session.is_some() => {
                    self.handle_chunk(chunk);
                }

                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => {
                        tracing::debug!("Recorder: all handles dropped, shutting down");
                        if self.session.is_some() {
                            if let Err(e) = self.stop().await {
                                tracing::error!("Failed to finalize recording on shutdown: {}", e);
                            }
                        }
                        break;
                    }
                },
            }
        }
    }

    fn handle_chunk(&mut self, chunk: Vec<i16>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        if session.paused {
            session.dropped_chunks += 1;
            tracing::trace!("Recorder paused, dropping {} samples", chunk.len());
            return;
        }

        if let Err(e) = session.sink.write_chunk(chunk) {
            tracing::error!("Failed to write audio chunk: {}", e);
        }
    }

    async fn handle_command(&mut self, cmd: RecorderCommand) {
        match cmd {
            RecorderCommand::Start { path, reply } => {
                let _ = reply.send(self.start(path));
            }

            RecorderCommand::Pause(reply) => {
                if let Some(session) = self.session.as_mut() {
                    if !session.paused {
                        session.pause();
                        let path = session.sink.path().to_path_buf();
                        self.state_tx.send_replace(RecorderState::Paused { path });
                        tracing::info!("Recording paused");
                    }
                }
                let _ = reply.send(());
            }

            RecorderCommand::Resume(reply) => {
                if let Some(session) = self.session.as_mut() {
                    if session.paused {
                        session.resume();
                        let path = session.sink.path().to_path_buf();
                        self.state_tx.send_replace(RecorderState::Recording { path });
                        tracing::info!("Recording resumed");
                    }
                }
                let _ = reply.send(());
            }

            RecorderCommand::Stop(reply) => {
                let _ = reply.send(self.stop().await);
            }

            RecorderCommand::Cancel(reply) => {
                let _ = reply.send(self.cancel().await);
            }
        }
    }

    fn start(&mut self, path: PathBuf) -> Result<(), RecorderError> {
        if self.session.is_some() {
            tracing::debug!("Already recording, ignoring start for {:?}", path);
            return Ok(());
        }

        let sink = WavSink::create(path.clone(), self.format)?;

        let stream = match self.backend.start(self.format, self.audio_tx.clone()) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!("Failed to start capture: {}", e);
                drop(sink);
                if let Err(remove_err) = std::fs::remove_file(&path) {
                    tracing::warn!("Failed to remove {:?}: {}", path, remove_err);
                }
                return Err(e);
            }
        };

        self.session = Some(RecordingSession::new(sink, stream));
        self.state_tx
            .send_replace(RecorderState::Recording { path: path.clone() });
        tracing::info!("Recording started: {:?}", path);
        Ok(())
    }

    /// Release the device, flush queued audio and close the session
    fn teardown(&mut self) -> Option<RecordingSession> {
        let mut session = self.session.take()?;

        // Drop the stream to stop audio capture
        session.stream = None;

        // Drain buffers that were captured before the stop
        while let Ok(chunk) = self.audio_rx.try_recv() {
            if session.paused {
                session.dropped_chunks += 1;
                continue;
            }
            if let Err(e) = session.sink.write_chunk(chunk) {
                tracing::error!("Failed to write audio chunk during drain: {}", e);
                break;
            }
        }

        // Replace audio channel with a fresh one for next recording.
        // The bridge also exits once the old receiver is gone.
        let (audio_tx, audio_rx) = mpsc::channel(AUDIO_CHANNEL_DEPTH);
        self.audio_tx = audio_tx;
        self.audio_rx = audio_rx;

        self.state_tx.send_replace(RecorderState::Idle);

        if session.dropped_chunks > 0 {
            tracing::debug!(
                "Discarded {} buffers captured while paused",
                session.dropped_chunks
            );
        }
        Some(session)
    }

    async fn stop(&mut self) -> Result<FinishedRecording, RecorderError> {
        let session = self.teardown().ok_or(RecorderError::NotRecording)?;

        let elapsed = session.elapsed();
        let path = session.sink.path().to_path_buf();
        let data_bytes = session.sink.finalize().await?;

        tracing::info!(
            "Recording stopped: {:?} ({} bytes, {:.1}s)",
            path,
            data_bytes,
            elapsed.as_secs_f32()
        );

        Ok(FinishedRecording {
            path,
            data_bytes,
            elapsed,
        })
    }

    async fn cancel(&mut self) -> Result<(), RecorderError> {
        let session = self.teardown().ok_or(RecorderError::NotRecording)?;
        let path = session.sink.path().to_path_buf();

        if let Err(e) = session.sink.finalize().await {
            tracing::warn!("Finalize failed while cancelling {:?}: {}", path, e);
        }

        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(RecorderError::Io { path, source }),
        }

        tracing::info!("Recording cancelled");
        Ok(())
    }
}

/// Handle for communicating with the Recorder
#[derive(Clone)]
pub struct RecorderHandle {
    tx: mpsc::Sender<RecorderCommand>,
    state_rx: watch::Receiver<RecorderState>,
}

impl RecorderHandle {
    pub fn new(tx: mpsc::Sender<RecorderCommand>, state_rx: watch::Receiver<RecorderState>) -> Self {
        Self { tx, state_rx }
    }

    pub fn state(&self) -> RecorderState {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RecorderState> {
        self.state_rx.clone()
    }

    pub async fn start(&self, path: PathBuf) -> Result<(), RecorderError> {
        self.request(|reply| RecorderCommand::Start { path, reply })
            .await?
    }

    pub async fn pause(&self) -> Result<(), RecorderError> {
        self.request(RecorderCommand::Pause).await
    }

    pub async fn resume(&self) -> Result<(), RecorderError> {
        self.request(RecorderCommand::Resume).await
    }

    pub async fn stop(&self) -> Result<FinishedRecording, RecorderError> {
        self.request(RecorderCommand::Stop).await?
    }

    pub async fn cancel(&self) -> Result<(), RecorderError> {
        self.request(RecorderCommand::Cancel).await?
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RecorderCommand,
    ) -> Result<T, RecorderError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).await.map_err(|e| {
            RecorderError::ServiceUnavailable(format!("Failed to send command: {}", e))
        })?;

        rx.await.map_err(|e| {
            RecorderError::ServiceUnavailable(format!("Failed to receive response: {}", e))
        })
    }
}

/// Spawn a recorder on the current LocalSet and return its handle
pub fn spawn<B: CaptureBackend + 'static>(format: AudioFormat, backend: B) -> RecorderHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(10);
    let (state_tx, state_rx) = watch::channel(RecorderState::Idle);

    let recorder = Recorder::new(format, backend, cmd_rx, state_tx);
    tokio::task::spawn_local(recorder.run());

    RecorderHandle::new(cmd_tx, state_rx)
}
