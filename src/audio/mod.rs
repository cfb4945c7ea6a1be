pub mod capture;
pub mod format;
pub mod playback;
pub mod wav;
pub mod wav_sink;

pub use capture::{AudioCapture, CaptureBackend, CaptureStream};
pub use format::AudioFormat;
pub use playback::{AudioPlayback, PlaybackBackend, PlaybackDevice};
pub use wav_sink::WavSink;
