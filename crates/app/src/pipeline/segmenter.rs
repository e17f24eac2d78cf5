//! Utterance segmentation stage.
//!
//! Consumes hop frames from the chunker, maintains the DC-blocked lookback
//! ring, runs the dual-gate detector over full analysis windows at hop
//! cadence, and on each segment end pulls the utterance samples back out of
//! the ring for the recognizer. The ring has exactly one writer and one
//! reader: this task.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use tempovox_audio::{DcBlocker, HopFrame, LookbackRing, DEFAULT_LOOKBACK_SAMPLES};
use tempovox_telemetry::{PipelineMetrics, PipelineStage};
use tempovox_vad::{DualGateVad, VadConfig, VadEngine, VadEvent};

/// One segmented utterance: DC-filtered mono 16 kHz samples plus the
/// segment end time on the audio clock.
#[derive(Debug, Clone)]
pub struct UtteranceAudio {
    pub samples: Vec<i16>,
    pub end_timestamp_ms: u64,
}

pub struct SpeechSegmenter {
    vad: DualGateVad,
    dc_blocker: DcBlocker,
    lookback: LookbackRing,
    audio_rx: broadcast::Receiver<HopFrame>,
    utterance_tx: broadcast::Sender<UtteranceAudio>,
    metrics: Option<Arc<PipelineMetrics>>,
    frame_size: usize,
    hop_size: usize,
    /// Next analysis window to run, as an index on the hop grid. Stays in
    /// lockstep with the detector's own window count; the frame indices in
    /// its events address the lookback ring through this grid.
    next_window: u64,
    hops_processed: u64,
    utterances_sent: u64,
}

impl SpeechSegmenter {
    pub fn new(
        config: VadConfig,
        audio_rx: broadcast::Receiver<HopFrame>,
        utterance_tx: broadcast::Sender<UtteranceAudio>,
        metrics: Option<Arc<PipelineMetrics>>,
    ) -> Self {
        let frame_size = config.frame_size_samples;
        let hop_size = config.hop_size_samples;
        Self {
            vad: DualGateVad::new(config),
            dc_blocker: DcBlocker::new(),
            lookback: LookbackRing::new(DEFAULT_LOOKBACK_SAMPLES),
            audio_rx,
            utterance_tx,
            metrics,
            frame_size,
            hop_size,
            next_window: 0,
            hops_processed: 0,
            utterances_sent: 0,
        }
    }

    pub fn spawn(
        config: VadConfig,
        audio_rx: broadcast::Receiver<HopFrame>,
        utterance_tx: broadcast::Sender<UtteranceAudio>,
        metrics: Option<Arc<PipelineMetrics>>,
    ) -> JoinHandle<()> {
        let segmenter = Self::new(config, audio_rx, utterance_tx, metrics);
        tokio::spawn(segmenter.run())
    }

    pub async fn run(mut self) {
        info!("segmenter task started");
        loop {
            match self.audio_rx.recv().await {
                Ok(hop) => self.handle_hop(hop),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "segmenter lagging, hop frames dropped");
                    if let Some(metrics) = &self.metrics {
                        metrics.record_queue_drop();
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        info!(
            hops = self.hops_processed,
            utterances = self.utterances_sent,
            "segmenter task shutting down"
        );
    }

    fn handle_hop(&mut self, mut hop: HopFrame) {
        self.dc_blocker.process(&mut hop.samples);
        self.lookback.push(&hop.samples);
        self.hops_processed += 1;

        if let Some(metrics) = &self.metrics {
            metrics.mark_stage_active(PipelineStage::Segmenter);
        }
        if self.hops_processed % 1000 == 0 {
            debug!(
                hops = self.hops_processed,
                state = ?self.vad.current_state(),
                noise_floor = self.vad.noise_floor(),
                "segmenter progress"
            );
        }

        // Run every analysis window the new samples completed.
        loop {
            let start = self.next_window * self.hop_size as u64;
            let end = start + self.frame_size as u64;
            if end > self.lookback.end_index() {
                break;
            }
            let Some(window) = self.lookback.read_range(start, self.frame_size) else {
                warn!(window = self.next_window, "analysis window already evicted");
                break;
            };
            self.next_window += 1;
            match self.vad.process(&window) {
                Ok(Some(event)) => self.handle_event(event),
                Ok(None) => {}
                Err(e) => error!(error = %e, "detector rejected analysis window"),
            }
        }
    }

    fn handle_event(&mut self, event: VadEvent) {
        match event {
            VadEvent::SpeechStart { timestamp_ms, rms } => {
                debug!(timestamp_ms, rms, "speech started");
                if let Some(metrics) = &self.metrics {
                    metrics.set_speaking(true);
                }
            }
            VadEvent::SpeechDiscarded {
                timestamp_ms,
                voiced_frames,
            } => {
                debug!(timestamp_ms, voiced_frames, "segment too short, discarded");
                if let Some(metrics) = &self.metrics {
                    metrics.set_speaking(false);
                    metrics.record_segment_too_short();
                }
            }
            VadEvent::SpeechEnd {
                timestamp_ms,
                start_frame,
                end_frame,
                voiced_frames,
                rms,
            } => {
                if let Some(metrics) = &self.metrics {
                    metrics.set_speaking(false);
                    metrics.record_segment();
                }
                debug!(
                    timestamp_ms,
                    start_frame, end_frame, voiced_frames, rms, "speech ended"
                );
                self.forward_utterance(timestamp_ms, start_frame, end_frame);
            }
        }
    }

    /// Reads `[start_frame, end_frame]` windows back out of the ring and
    /// hands them to the recognizer. A segment longer than the lookback
    /// loses its head, not its tail.
    fn forward_utterance(&mut self, timestamp_ms: u64, start_frame: u64, end_frame: u64) {
        let mut start = start_frame * self.hop_size as u64;
        let end = end_frame * self.hop_size as u64 + self.frame_size as u64;
        let oldest = self.lookback.oldest_available();
        if start < oldest {
            warn!(
                start,
                oldest, "utterance outgrew the lookback ring, head truncated"
            );
            start = oldest;
        }
        let len = (end - start) as usize;
        let Some(samples) = self.lookback.read_range(start, len) else {
            warn!(start, len, "utterance samples no longer available");
            return;
        };
        match self.utterance_tx.send(UtteranceAudio {
            samples,
            end_timestamp_ms: timestamp_ms,
        }) {
            Ok(_) => self.utterances_sent += 1,
            Err(_) => warn!("no recognizer listening, utterance dropped"),
        }
    }
}
