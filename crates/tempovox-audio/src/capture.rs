//! Microphone capture on a dedicated OS thread.
//!
//! cpal streams are not `Send` on every backend, so the stream lives on its
//! own thread for its whole life. The callback converts whatever sample
//! format the device negotiated to `i16` and pushes into the lock-free ring.
//! Stream errors flag a restart; the owning thread tears the stream down and
//! walks the candidate device list again.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, SizedSample, Stream, StreamConfig};

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::device::DeviceManager;
use super::ring_buffer::SampleProducer;
use tempovox_foundation::AudioError;

/// Rate and channel count the device actually opened with.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Debug, Default)]
pub struct CaptureStats {
    pub batches_captured: AtomicU64,
    pub samples_dropped: AtomicU64,
    pub stream_restarts: AtomicU64,
}

/// Handle to the capture thread.
pub struct CaptureThread {
    pub handle: JoinHandle<()>,
    pub shutdown: Arc<AtomicBool>,
}

impl CaptureThread {
    /// Spawns the capture thread and blocks until a device is producing
    /// audio, or until every candidate has been tried.
    pub fn spawn(
        producer: SampleProducer,
        device_name: Option<String>,
    ) -> Result<
        (
            Self,
            DeviceConfig,
            tokio::sync::broadcast::Receiver<DeviceConfig>,
        ),
        AudioError,
    > {
        let running = Arc::new(AtomicBool::new(false));
        let shutdown = running.clone();
        let requested = device_name.clone();
        let negotiated = Arc::new(RwLock::new(None::<DeviceConfig>));
        let negotiated_writer = negotiated.clone();

        let (config_tx, config_rx) = tokio::sync::broadcast::channel(16);

        let handle = thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || {
                let mut session = match CaptureSession::new(producer, running.clone()) {
                    Ok(s) => s.with_config_channel(config_tx),
                    Err(e) => {
                        tracing::error!("failed to initialise capture session: {}", e);
                        return;
                    }
                };

                let Some(cfg) = session.start_with_fallback(device_name.as_deref()) else {
                    tracing::error!("no input device produced audio; capture not started");
                    return;
                };
                *negotiated_writer.write() = Some(cfg);

                // Restart monitor. Stream errors land here via the flag set
                // by the cpal error callback.
                let mut reported_drops = 0u64;
                while running.load(Ordering::Relaxed) {
                    if session.restart_needed.load(Ordering::SeqCst) {
                        tracing::warn!("stream error reported, restarting capture");
                        session.stop();
                        session.restart_needed.store(false, Ordering::SeqCst);
                        session.stats.stream_restarts.fetch_add(1, Ordering::Relaxed);

                        match session.start_with_fallback(None) {
                            Some(cfg) => *negotiated_writer.write() = Some(cfg),
                            None => {
                                tracing::error!("failed to restart capture on any device");
                            }
                        }
                    }

                    let dropped = session.stats.samples_dropped.load(Ordering::Relaxed);
                    if dropped > reported_drops {
                        tracing::warn!("capture ring full, {} samples dropped so far", dropped);
                        reported_drops = dropped;
                    }

                    thread::sleep(Duration::from_millis(100));
                }

                tracing::info!("capture thread shutting down");
                session.stop();
            })
            .map_err(|e| AudioError::Fatal(format!("failed to spawn capture thread: {}", e)))?;

        // Wait for the thread to report the negotiated device config.
        let start = Instant::now();
        let mut cfg = None;
        while start.elapsed() < Duration::from_secs(10) {
            if let Some(found) = negotiated.read().clone() {
                cfg = Some(found);
                break;
            }
            if handle.is_finished() {
                break;
            }
            thread::sleep(Duration::from_millis(50));
        }

        let cfg = cfg.ok_or_else(|| AudioError::DeviceNotFound { name: requested })?;

        Ok((Self { handle, shutdown }, cfg, config_rx))
    }

    pub fn stop(self) {
        self.shutdown.store(false, Ordering::Relaxed);
        let _ = self.handle.join();
    }
}

struct CaptureSession {
    device_manager: DeviceManager,
    stream: Option<Stream>,
    producer: Arc<Mutex<SampleProducer>>,
    stats: Arc<CaptureStats>,
    running: Arc<AtomicBool>,
    restart_needed: Arc<AtomicBool>,
    config_tx: Option<tokio::sync::broadcast::Sender<DeviceConfig>>,
}

impl CaptureSession {
    fn new(producer: SampleProducer, running: Arc<AtomicBool>) -> Result<Self, AudioError> {
        Ok(Self {
            device_manager: DeviceManager::new()?,
            stream: None,
            producer: Arc::new(Mutex::new(producer)),
            stats: Arc::new(CaptureStats::default()),
            running,
            restart_needed: Arc::new(AtomicBool::new(false)),
            config_tx: None,
        })
    }

    fn with_config_channel(
        mut self,
        config_tx: tokio::sync::broadcast::Sender<DeviceConfig>,
    ) -> Self {
        self.config_tx = Some(config_tx);
        self
    }

    /// Tries the requested device, then the priority candidates, then the
    /// host default. A device only counts once it has delivered a batch.
    fn start_with_fallback(&mut self, requested: Option<&str>) -> Option<DeviceConfig> {
        let mut attempts: Vec<Option<String>> = Vec::new();
        if let Some(name) = requested {
            attempts.push(Some(name.to_string()));
        }
        for name in self.device_manager.candidate_device_names() {
            attempts.push(Some(name));
        }
        attempts.push(None);

        for attempt in attempts {
            match self.start(attempt.as_deref()) {
                Ok(cfg) => {
                    tracing::info!("audio stream started on device: {:?}", attempt);
                    if self.wait_for_first_batch(Duration::from_secs(3)) {
                        return Some(cfg);
                    }
                    tracing::warn!("no audio within preflight window, trying next candidate");
                    self.stop();
                    thread::sleep(Duration::from_millis(200));
                }
                Err(e) => {
                    tracing::warn!("failed to start on {:?}: {}", attempt, e);
                }
            }
        }
        None
    }

    fn wait_for_first_batch(&self, timeout: Duration) -> bool {
        let before = self.stats.batches_captured.load(Ordering::Relaxed);
        let start = Instant::now();
        while start.elapsed() < timeout {
            if self.stats.batches_captured.load(Ordering::Relaxed) > before {
                return true;
            }
            thread::sleep(Duration::from_millis(50));
        }
        false
    }

    fn start(&mut self, device_name: Option<&str>) -> Result<DeviceConfig, AudioError> {
        self.running.store(true, Ordering::SeqCst);

        let device = self.device_manager.open_device(device_name)?;
        if let Ok(name) = device.name() {
            tracing::info!(
                "selected input device: {} (host: {:?})",
                name,
                self.device_manager.host_id()
            );
        }
        let (config, sample_format) = negotiate_config(&device)?;

        let device_config = DeviceConfig {
            sample_rate: config.sample_rate.0,
            channels: config.channels,
        };
        if let Some(tx) = &self.config_tx {
            let _ = tx.send(device_config.clone());
        }

        let stream = self.build_stream(device, config, sample_format)?;
        stream.play()?;
        self.stream = Some(stream);

        Ok(device_config)
    }

    fn build_stream(
        &mut self,
        device: cpal::Device,
        config: StreamConfig,
        sample_format: SampleFormat,
    ) -> Result<Stream, AudioError> {
        let producer = Arc::clone(&self.producer);
        let stats = Arc::clone(&self.stats);
        let running = Arc::clone(&self.running);
        let restart_needed = Arc::clone(&self.restart_needed);

        let err_fn = move |err: cpal::StreamError| {
            tracing::error!("audio stream error: {}", err);
            restart_needed.store(true, Ordering::SeqCst);
        };

        // Runs on the audio callback thread. Atomics and the ring write
        // only; this path must stay allocation and syscall free.
        let handle_batch = move |samples: &[i16]| {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            let written = producer.lock().write(samples);
            stats.batches_captured.fetch_add(1, Ordering::Relaxed);
            if written < samples.len() {
                stats
                    .samples_dropped
                    .fetch_add((samples.len() - written) as u64, Ordering::Relaxed);
            }
        };

        let stream = match sample_format {
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| handle_batch(data),
                err_fn,
                None,
            )?,
            SampleFormat::F32 => {
                converting_stream(&device, &config, sample_from_f32, handle_batch, err_fn)?
            }
            SampleFormat::U16 => {
                converting_stream(&device, &config, sample_from_u16, handle_batch, err_fn)?
            }
            SampleFormat::U32 => {
                converting_stream(&device, &config, sample_from_u32, handle_batch, err_fn)?
            }
            SampleFormat::F64 => {
                converting_stream(&device, &config, sample_from_f64, handle_batch, err_fn)?
            }
            other => {
                return Err(AudioError::FormatNotSupported {
                    format: format!("{:?}", other),
                });
            }
        };

        Ok(stream)
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
    }
}

/// Builds an input stream that converts `T` batches to `i16` through a
/// thread-local scratch buffer before handing them on.
fn converting_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    convert: fn(T) -> i16,
    handle_batch: impl Fn(&[i16]) + Send + 'static,
    err_fn: impl FnMut(cpal::StreamError) + Send + 'static,
) -> Result<Stream, AudioError>
where
    T: SizedSample + Send + 'static,
{
    thread_local! {
        static CONVERT_BUFFER: std::cell::RefCell<Vec<i16>> =
            const { std::cell::RefCell::new(Vec::new()) };
    }

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            CONVERT_BUFFER.with(|buf| {
                let mut scratch = buf.borrow_mut();
                scratch.clear();
                scratch.extend(data.iter().map(|&s| convert(s)));
                handle_batch(&scratch);
            });
        },
        err_fn,
        None,
    )?;
    Ok(stream)
}

fn negotiate_config(device: &cpal::Device) -> Result<(StreamConfig, SampleFormat), AudioError> {
    if let Ok(default_config) = device.default_input_config() {
        return Ok((
            StreamConfig {
                channels: default_config.channels(),
                sample_rate: default_config.sample_rate(),
                buffer_size: cpal::BufferSize::Default,
            },
            default_config.sample_format(),
        ));
    }

    if let Ok(mut configs) = device.supported_input_configs() {
        if let Some(config) = configs.next() {
            return Ok((config.with_max_sample_rate().into(), config.sample_format()));
        }
    }

    Err(AudioError::FormatNotSupported {
        format: "no supported input formats".to_string(),
    })
}

fn sample_from_f32(s: f32) -> i16 {
    (s.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

fn sample_from_u16(s: u16) -> i16 {
    (s as i32 - 32768) as i16
}

fn sample_from_u32(s: u32) -> i16 {
    ((s as i64 - 2_147_483_648) >> 16) as i16
}

fn sample_from_f64(s: f64) -> i16 {
    (s.clamp(-1.0, 1.0) * 32767.0).round() as i16
}
