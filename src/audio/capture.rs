use super::format::AudioFormat;
use crate::error::RecorderError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig};
use ringbuf::{HeapRb, traits::*};
use std::any::Any;
use std::sync::Arc;
use tokio::sync::{Notify, mpsc};
use tokio::task::AbortHandle;

/// Keeps a capture device open. Dropping it releases the device.
pub struct CaptureStream {
    _guard: Box<dyn Any>,
}

impl CaptureStream {
    pub fn new<T: 'static>(guard: T) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }
}

/// Aborts the capture bridge when the stream guard drops
struct BridgeGuard(AbortHandle);

impl Drop for BridgeGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Source of microphone PCM for the recorder
///
/// Implementations deliver fixed-size buffers of 16-bit samples on
/// `chunk_tx` until the returned [`CaptureStream`] is dropped.
pub trait CaptureBackend {
    fn start(
        &mut self,
        format: AudioFormat,
        chunk_tx: mpsc::Sender<Vec<i16>>,
    ) -> Result<CaptureStream, RecorderError>;
}

/// Default input device via cpal
pub struct AudioCapture {
    chunk_secs: f32,
    ring_secs: f32,
}

impl AudioCapture {
    pub fn new(chunk_secs: f32, ring_secs: f32) -> Self {
        Self {
            chunk_secs,
            ring_secs,
        }
    }

    async fn bridge_task(
        mut consumer: impl Consumer<Item = f32>,
        tx: mpsc::Sender<Vec<i16>>,
        chunk_size: usize,
        notify: Arc<Notify>,
    ) {
        loop {
            tokio::select! {
                _ = notify.notified() => {}
                _ = tx.closed() => {
                    tracing::debug!("Capture bridge: recorder dropped the channel, exiting");
                    return;
                }
            }

            while consumer.occupied_len() >= chunk_size {
                let mut chunk = vec![0.0f32; chunk_size];
                let n = consumer.pop_slice(&mut chunk);
                chunk.truncate(n);

                if tx.send(to_pcm16(&chunk)).await.is_err() {
                    tracing::debug!("Capture bridge: recorder dropped the channel, exiting");
                    return;
                }
            }
        }
    }
}

impl CaptureBackend for AudioCapture {
    /// Start audio capture
    ///
    /// Returns the stream which must be kept alive for audio capture to continue.
    fn start(
        &mut self,
        format: AudioFormat,
        chunk_tx: mpsc::Sender<Vec<i16>>,
    ) -> Result<CaptureStream, RecorderError> {
        let ring = HeapRb::<f32>::new(format.samples_for_duration(self.ring_secs));
        let (mut producer, consumer) = ring.split();

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| RecorderError::DeviceUnavailable("No input audio device available".into()))?;

        let config = StreamConfig {
            channels: format.channels,
            sample_rate: SampleRate(format.sample_rate),
            buffer_size: BufferSize::Default,
        };

        let notify = Arc::new(Notify::new());
        let notify_callback = notify.clone();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                    producer.push_slice(data);
                    notify_callback.notify_one();
                },
                move |err| {
                    tracing::error!("Audio input stream error: {}", err);
                },
                None,
            )
            .map_err(|e| {
                RecorderError::DeviceUnavailable(format!("Failed to build input stream: {}", e))
            })?;

        stream.play().map_err(|e| {
            RecorderError::DeviceUnavailable(format!("Failed to start audio stream: {}", e))
        })?;

        let chunk_size = format.samples_for_duration(self.chunk_secs).max(1);
        let bridge = tokio::task::spawn_local(Self::bridge_task(consumer, chunk_tx, chunk_size, notify));

        tracing::info!(
            "Audio capture started: {} Hz, {} channel(s), {} samples per buffer",
            format.sample_rate,
            format.channels,
            chunk_size
        );
        // Device first, then the bridge
        Ok(CaptureStream::new((stream, BridgeGuard(bridge.abort_handle()))))
    }
}

/// Convert f32 (-1.0 to 1.0) samples to signed 16-bit PCM
pub fn to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_pcm16_clamps() {
        assert_eq!(to_pcm16(&[0.0, 1.0, -1.0, 2.0, -3.0]), vec![0, 32767, -32767, 32767, -32767]);
    }

    #[tokio::test]
    async fn test_bridge_emits_fixed_size_chunks() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let (mut producer, consumer) = HeapRb::<f32>::new(64).split();
                let (tx, mut rx) = mpsc::channel(8);
                let notify = Arc::new(Notify::new());

                tokio::task::spawn_local(AudioCapture::bridge_task(consumer, tx, 4, notify.clone()));

                producer.push_slice(&[0.5; 10]);
                notify.notify_one();

                assert_eq!(rx.recv().await.unwrap().len(), 4);
                assert_eq!(rx.recv().await.unwrap().len(), 4);
                // Two samples remain buffered until a full chunk is available.
                assert!(rx.try_recv().is_err());
            })
            .await;
    }

    #[tokio::test]
    async fn test_bridge_exits_when_recorder_drops_channel() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let (mut producer, consumer) = HeapRb::<f32>::new(64).split();
                let (tx, rx) = mpsc::channel(8);
                let notify = Arc::new(Notify::new());

                let bridge =
                    tokio::task::spawn_local(AudioCapture::bridge_task(consumer, tx, 4, notify.clone()));

                // Partial chunk, then the device and the recorder go away
                producer.push_slice(&[0.5; 2]);
                notify.notify_one();
                drop(producer);
                drop(notify);
                drop(rx);

                tokio::time::timeout(std::time::Duration::from_millis(500), bridge)
                    .await
                    .expect("bridge task still parked")
                    .unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn test_dropping_guard_aborts_bridge() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let (_producer, consumer) = HeapRb::<f32>::new(64).split();
                let (tx, _rx) = mpsc::channel(8);
                let notify = Arc::new(Notify::new());

                let bridge = tokio::task::spawn_local(AudioCapture::bridge_task(consumer, tx, 4, notify));
                let stream = CaptureStream::new(BridgeGuard(bridge.abort_handle()));
                drop(stream);

                let result = tokio::time::timeout(std::time::Duration::from_millis(500), bridge)
                    .await
                    .expect("bridge task not aborted");
                assert!(result.unwrap_err().is_cancelled());
            })
            .await;
    }
}
