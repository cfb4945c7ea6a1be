use super::format::AudioFormat;
use super::wav;
use crate::error::RecorderError;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};

enum WavCommand {
    WriteChunk(Vec<i16>),
    Finalize {
        reply: oneshot::Sender<Result<u32, RecorderError>>,
    },
}

/// Streaming WAV writer using a dedicated blocking thread for I/O
///
/// The placeholder header is written synchronously by [`WavSink::create`] so
/// the file exists before capture begins. Chunks are appended by the thread in
/// arrival order; [`WavSink::finalize`] closes the file and patches the header
/// sizes from the final file length.
pub struct WavSink {
    tx: mpsc::UnboundedSender<WavCommand>,
    path: PathBuf,
}

impl WavSink {
    pub fn create(path: PathBuf, format: AudioFormat) -> Result<Self, RecorderError> {
        let file = wav::create_with_placeholder(&path, format).map_err(|source| {
            RecorderError::Io {
                path: path.clone(),
                source,
            }
        })?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let thread_path = path.clone();

        std::thread::spawn(move || {
            let mut writer = Some(BufWriter::new(file));
            let mut write_error: Option<io::Error> = None;

            while let Some(cmd) = rx.blocking_recv() {
                match cmd {
                    WavCommand::WriteChunk(samples) => {
                        let Some(out) = writer.as_mut() else { continue };
                        if write_error.is_some() {
                            continue;
                        }
                        if let Err(e) = out.write_all(&pcm_bytes(&samples)) {
                            tracing::error!("Failed to append PCM to {:?}: {}", thread_path, e);
                            write_error = Some(e);
                        }
                    }
                    WavCommand::Finalize { reply } => {
                        let result = match (writer.take(), write_error.take()) {
                            (_, Some(source)) => Err(RecorderError::Io {
                                path: thread_path.clone(),
                                source,
                            }),
                            (Some(out), None) => finish(out, &thread_path),
                            (None, None) => Err(RecorderError::NotRecording),
                        };
                        let _ = reply.send(result);
                        break;
                    }
                }
            }
        });

        Ok(Self { tx, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queue samples for writing (the Vec is moved, no copy)
    pub fn write_chunk(&self, samples: Vec<i16>) -> Result<(), RecorderError> {
        self.tx
            .send(WavCommand::WriteChunk(samples))
            .map_err(|_| RecorderError::Io {
                path: self.path.clone(),
                source: io::Error::new(io::ErrorKind::BrokenPipe, "WAV writer thread exited"),
            })
    }

    /// Flush, close and patch the header. Returns the PCM byte count.
    pub async fn finalize(self) -> Result<u32, RecorderError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WavCommand::Finalize { reply })
            .map_err(|_| RecorderError::ServiceUnavailable("WAV writer thread exited".into()))?;

        rx.await
            .map_err(|e| RecorderError::ServiceUnavailable(format!("WAV writer dropped reply: {}", e)))?
    }
}

fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

fn finish(writer: BufWriter<File>, path: &Path) -> Result<u32, RecorderError> {
    let io_err = |source: io::Error| RecorderError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
    file.sync_all().map_err(io_err)?;
    drop(file);

    wav::patch_header(path).map_err(|source| RecorderError::Finalize {
        path: path.to_path_buf(),
        source,
    })
}
