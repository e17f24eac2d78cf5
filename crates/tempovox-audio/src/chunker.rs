//! Re-frames device audio into fixed 10 ms hops at the analysis rate.
//!
//! The capture side delivers arbitrary-sized batches at whatever rate and
//! channel count the device negotiated. The chunker converts to mono,
//! resamples to 16 kHz when needed, and emits fixed-size hops on a broadcast
//! channel. Every consumer downstream works on the same hop grid.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};

use super::capture::DeviceConfig;
use super::frame_reader::{CapturedFrame, FrameReader};
use super::resampler::StreamResampler;
use tempovox_telemetry::{FpsTracker, PipelineMetrics, PipelineStage};

/// One hop of mono 16 kHz audio on the shared analysis grid.
#[derive(Debug, Clone)]
pub struct HopFrame {
    pub samples: Vec<i16>,
    /// Index of this hop since pipeline start.
    pub frame_index: u64,
    /// Start of this hop on the audio clock.
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Copy)]
pub enum ResamplerQuality {
    Fast,
    Balanced,
    Quality,
}

pub struct ChunkerConfig {
    pub hop_size_samples: usize,
    pub sample_rate_hz: u32,
    pub resampler_quality: ResamplerQuality,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            hop_size_samples: 160,
            sample_rate_hz: 16_000,
            resampler_quality: ResamplerQuality::Balanced,
        }
    }
}

pub struct HopChunker {
    frame_reader: FrameReader,
    output_tx: broadcast::Sender<HopFrame>,
    cfg: ChunkerConfig,
    running: Arc<AtomicBool>,
    metrics: Option<Arc<PipelineMetrics>>,
    device_cfg_rx: Option<broadcast::Receiver<DeviceConfig>>,
}

impl HopChunker {
    pub fn new(
        frame_reader: FrameReader,
        output_tx: broadcast::Sender<HopFrame>,
        cfg: ChunkerConfig,
    ) -> Self {
        Self {
            frame_reader,
            output_tx,
            cfg,
            running: Arc::new(AtomicBool::new(false)),
            metrics: None,
            device_cfg_rx: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_device_config(mut self, rx: broadcast::Receiver<DeviceConfig>) -> Self {
        self.device_cfg_rx = Some(rx);
        self
    }

    pub fn spawn(self) -> JoinHandle<()> {
        let mut worker = ChunkerWorker::new(
            self.frame_reader,
            self.output_tx,
            self.cfg,
            self.metrics,
            self.device_cfg_rx,
        );
        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();

        tokio::spawn(async move {
            worker.run(running).await;
        })
    }
}

struct ChunkerWorker {
    frame_reader: FrameReader,
    output_tx: broadcast::Sender<HopFrame>,
    cfg: ChunkerConfig,
    buffer: VecDeque<i16>,
    hops_emitted: u64,
    metrics: Option<Arc<PipelineMetrics>>,
    capture_fps: FpsTracker,
    chunker_fps: FpsTracker,
    resampler: Option<StreamResampler>,
    current_input_rate: Option<u32>,
    current_input_channels: Option<u16>,
    device_cfg_rx: Option<broadcast::Receiver<DeviceConfig>>,
}

impl ChunkerWorker {
    fn new(
        frame_reader: FrameReader,
        output_tx: broadcast::Sender<HopFrame>,
        cfg: ChunkerConfig,
        metrics: Option<Arc<PipelineMetrics>>,
        device_cfg_rx: Option<broadcast::Receiver<DeviceConfig>>,
    ) -> Self {
        let cap = cfg.hop_size_samples * 8;
        Self {
            frame_reader,
            output_tx,
            cfg,
            buffer: VecDeque::with_capacity(cap),
            hops_emitted: 0,
            metrics,
            capture_fps: FpsTracker::new(),
            chunker_fps: FpsTracker::new(),
            resampler: None,
            current_input_rate: None,
            current_input_channels: None,
            device_cfg_rx,
        }
    }

    async fn run(&mut self, running: Arc<AtomicBool>) {
        tracing::info!("hop chunker started");

        while running.load(Ordering::SeqCst) {
            if let Some(rx) = &mut self.device_cfg_rx {
                while let Ok(cfg) = rx.try_recv() {
                    self.frame_reader
                        .update_device_config(cfg.sample_rate, cfg.channels);
                }
            }

            if let Some(frame) = self.frame_reader.read_frame(4096) {
                if let Some(m) = &self.metrics {
                    m.increment_capture_frames();
                    if let Some(fps) = self.capture_fps.tick() {
                        m.update_capture_fps(fps);
                    }
                    m.update_audio_level(&frame.samples);
                    m.mark_stage_active(PipelineStage::Capture);
                }

                if self.current_input_rate != Some(frame.sample_rate)
                    || self.current_input_channels != Some(frame.channels)
                {
                    self.reconfigure_for_device(&frame);
                }

                let samples = self.convert(&frame);
                self.buffer.extend(samples);
                self.flush_ready_hops();
            } else {
                // Half the hop period; the chunker never falls more than one
                // poll behind the capture side.
                time::sleep(Duration::from_millis(5)).await;
            }
        }

        tracing::info!("hop chunker stopped");
    }

    fn flush_ready_hops(&mut self) {
        let hop = self.cfg.hop_size_samples;
        while self.buffer.len() >= hop {
            let samples: Vec<i16> = self.buffer.drain(..hop).collect();

            let frame_index = self.hops_emitted;
            let timestamp_ms = frame_index * hop as u64 * 1000 / self.cfg.sample_rate_hz as u64;

            match self.output_tx.send(HopFrame {
                samples,
                frame_index,
                timestamp_ms,
            }) {
                Ok(receivers) => {
                    tracing::trace!(frame_index, receivers, "hop sent");
                }
                Err(_) => {
                    tracing::warn!("no listeners for hop frames");
                }
            }

            self.hops_emitted += 1;

            if let Some(m) = &self.metrics {
                m.increment_chunker_frames();
                if let Some(fps) = self.chunker_fps.tick() {
                    m.update_chunker_fps(fps);
                }
                m.mark_stage_active(PipelineStage::Chunker);
            }
        }
    }

    fn reconfigure_for_device(&mut self, frame: &CapturedFrame) {
        if frame.sample_rate != self.cfg.sample_rate_hz {
            tracing::info!(
                "configuring resampler: {} Hz {} ch -> {} Hz mono",
                frame.sample_rate,
                frame.channels,
                self.cfg.sample_rate_hz
            );
            self.resampler = Some(StreamResampler::new_with_quality(
                frame.sample_rate,
                self.cfg.sample_rate_hz,
                self.cfg.resampler_quality,
            ));
        } else {
            tracing::info!(
                "device already at target rate {} Hz, no resampling needed",
                frame.sample_rate
            );
            self.resampler = None;
        }

        self.current_input_rate = Some(frame.sample_rate);
        self.current_input_channels = Some(frame.channels);
    }

    /// Mixdown to mono, then resample if the device rate differs.
    fn convert(&mut self, frame: &CapturedFrame) -> Vec<i16> {
        let mono = if frame.channels <= 1 {
            frame.samples.clone()
        } else {
            let channels = frame.channels as usize;
            frame
                .samples
                .chunks_exact(channels)
                .map(|chunk| {
                    let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
                    (sum / channels as i32) as i16
                })
                .collect()
        };

        match &mut self.resampler {
            Some(resampler) => resampler.process(&mono),
            None => mono,
        }
    }
}
