use crate::error::PlayerError;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

/// One opened, already-started audio source
pub trait PlaybackDevice {
    fn duration(&self) -> Duration;
    fn position(&self) -> Duration;
    /// True while audio is actually sounding (not paused, not exhausted)
    fn is_playing(&self) -> bool;
    /// True once the source has played to its end
    fn is_finished(&self) -> bool;
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
}

/// Opens files for playback
pub trait PlaybackBackend {
    fn open(&mut self, path: &Path) -> Result<Box<dyn PlaybackDevice>, PlayerError>;
}

/// Default output device via rodio
///
/// The output stream is opened lazily on first use and kept for the lifetime
/// of the backend; every `open` gets its own sink on the shared mixer.
#[derive(Default)]
pub struct AudioPlayback {
    stream: Option<OutputStream>,
}

impl AudioPlayback {
    pub fn new() -> Self {
        Self::default()
    }

    fn output(&mut self) -> Result<&OutputStream, PlayerError> {
        if self.stream.is_none() {
            let stream = OutputStreamBuilder::open_default_stream()
                .map_err(|e| PlayerError::DeviceUnavailable(e.to_string()))?;
            self.stream = Some(stream);
        }
        self.stream
            .as_ref()
            .ok_or_else(|| PlayerError::DeviceUnavailable("output stream not open".into()))
    }
}

impl PlaybackBackend for AudioPlayback {
    fn open(&mut self, path: &Path) -> Result<Box<dyn PlaybackDevice>, PlayerError> {
        let open_err = |message: String| PlayerError::Open {
            path: path.to_path_buf(),
            message,
        };

        let file = File::open(path).map_err(|e| open_err(e.to_string()))?;
        let source = Decoder::new(BufReader::new(file)).map_err(|e| open_err(e.to_string()))?;

        let duration = wav_duration(path)
            .or_else(|| source.total_duration())
            .unwrap_or_default();

        let sink = Sink::connect_new(self.output()?.mixer());
        sink.append(source);
        sink.play();

        tracing::debug!("Opened {:?} for playback ({:?})", path, duration);
        Ok(Box::new(RodioDevice { sink, duration }))
    }
}

struct RodioDevice {
    sink: Sink,
    duration: Duration,
}

impl PlaybackDevice for RodioDevice {
    fn duration(&self) -> Duration {
        self.duration
    }

    fn position(&self) -> Duration {
        self.sink.get_pos()
    }

    fn is_playing(&self) -> bool {
        !self.sink.is_paused() && !self.sink.empty()
    }

    fn is_finished(&self) -> bool {
        self.sink.empty()
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn resume(&mut self) {
        self.sink.play();
    }

    fn stop(&mut self) {
        self.sink.stop();
    }
}

/// Exact duration of a PCM WAV file from its header, if it is one
pub fn wav_duration(path: &Path) -> Option<Duration> {
    let reader = hound::WavReader::open(path).ok()?;
    let rate = reader.spec().sample_rate;
    if rate == 0 {
        return None;
    }
    let frames = reader.duration() as u64;
    Some(Duration::from_millis(frames * 1000 / rate as u64))
}
