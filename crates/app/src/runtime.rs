//! Pipeline assembly and lifecycle.
//!
//! `start` wires source -> chunker -> segmenter -> recognizer -> parser ->
//! emitter and hands back an [`AppHandle`] that owns every task. Shutdown
//! quiesces the source first so the stages drain in order.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::info;

use tempovox_audio::{
    CaptureThread, ChunkerConfig, FrameReader, HopChunker, HopFrame, PlaybackMode,
    ResamplerQuality, SampleRing, WavReplay,
};
use tempovox_grammar::Intent;
use tempovox_kws::{KwsEngine, Recognition, TemplateBank, HOP_SIZE_SAMPLES, SAMPLE_RATE_HZ};
use tempovox_telemetry::PipelineMetrics;

use crate::config::AppConfig;
use crate::control::ControlRequest;
use crate::pipeline::{CommandEmitter, KwsStage, ParserStage, SpeechSegmenter, UtteranceAudio};

/// Capture ring size in samples, about four seconds at 16 kHz.
const CAPTURE_RING_SAMPLES: usize = 16384 * 4;

/// Where samples come from.
#[derive(Debug, Clone)]
pub enum AudioSourceConfig {
    /// Live capture, optionally pinned to a named input device.
    Microphone { device: Option<String> },
    /// Replay a recording through the same conditioning path.
    WavFile { path: PathBuf, mode: PlaybackMode },
}

#[derive(Debug, Clone)]
pub struct AppRuntimeOptions {
    pub source: AudioSourceConfig,
    pub resampler_quality: ResamplerQuality,
    pub config: AppConfig,
    pub bank: TemplateBank,
}

enum SourceHandle {
    Capture(CaptureThread),
    Replay(JoinHandle<()>),
}

/// Handle to the running pipeline.
pub struct AppHandle {
    pub metrics: Arc<PipelineMetrics>,
    pub control_tx: mpsc::Sender<ControlRequest>,
    source: SourceHandle,
    chunker_handle: JoinHandle<()>,
    segmenter_handle: JoinHandle<()>,
    kws_handle: JoinHandle<()>,
    parser_handle: JoinHandle<()>,
    emitter_handle: JoinHandle<()>,
    replay_done: Option<oneshot::Receiver<()>>,
}

impl AppHandle {
    /// Fires once when a WAV source has streamed its last sample. `None`
    /// for live capture, and on the second call.
    pub fn take_replay_done(&mut self) -> Option<oneshot::Receiver<()>> {
        self.replay_done.take()
    }

    /// Stops the source, then tears the stages down and waits for them.
    pub async fn shutdown(self) {
        info!("shutting down pipeline");

        match self.source {
            SourceHandle::Capture(capture) => capture.stop(),
            SourceHandle::Replay(handle) => handle.abort(),
        }

        self.chunker_handle.abort();
        self.segmenter_handle.abort();
        self.kws_handle.abort();
        self.parser_handle.abort();
        self.emitter_handle.abort();

        let _ = self.chunker_handle.await;
        let _ = self.segmenter_handle.await;
        let _ = self.kws_handle.await;
        let _ = self.parser_handle.await;
        let _ = self.emitter_handle.await;

        info!("pipeline shutdown complete");
    }
}

/// Starts the pipeline with the given options.
pub async fn start(
    opts: AppRuntimeOptions,
) -> Result<AppHandle, Box<dyn std::error::Error + Send + Sync>> {
    let metrics = Arc::new(PipelineMetrics::default());

    let (producer, consumer) = SampleRing::new(CAPTURE_RING_SAMPLES).split();

    // 1) Source. Either way the samples land in the same ring.
    let mut replay_done = None;
    let (source, device_cfg, device_cfg_rx) = match opts.source {
        AudioSourceConfig::Microphone { device } => {
            let (capture, cfg, cfg_rx) = CaptureThread::spawn(producer, device)?;
            (SourceHandle::Capture(capture), cfg, Some(cfg_rx))
        }
        AudioSourceConfig::WavFile { path, mode } => {
            let replay = WavReplay::open(&path, mode)?;
            let cfg = replay.device_config();
            let (done_tx, done_rx) = oneshot::channel();
            replay_done = Some(done_rx);
            let mut producer = producer;
            let handle = tokio::spawn(async move {
                replay.stream_to_ring(&mut producer).await;
                let _ = done_tx.send(());
            });
            (SourceHandle::Replay(handle), cfg, None)
        }
    };
    info!(
        sample_rate = device_cfg.sample_rate,
        channels = device_cfg.channels,
        "audio source started"
    );

    // 2) Chunker re-frames onto the shared 10 ms hop grid.
    let frame_reader = FrameReader::new(consumer, device_cfg.sample_rate, device_cfg.channels);
    let chunker_cfg = ChunkerConfig {
        hop_size_samples: HOP_SIZE_SAMPLES,
        sample_rate_hz: SAMPLE_RATE_HZ,
        resampler_quality: opts.resampler_quality,
    };
    let (hop_tx, _) = broadcast::channel::<HopFrame>(200);
    let mut chunker =
        HopChunker::new(frame_reader, hop_tx.clone(), chunker_cfg).with_metrics(metrics.clone());
    if let Some(cfg_rx) = device_cfg_rx {
        chunker = chunker.with_device_config(cfg_rx);
    }
    let chunker_handle = chunker.spawn();

    // 3) Segmenter turns hops into whole utterances.
    let (utterance_tx, _) = broadcast::channel::<UtteranceAudio>(8);
    let segmenter_handle = SpeechSegmenter::spawn(
        opts.config.vad.clone(),
        hop_tx.subscribe(),
        utterance_tx.clone(),
        Some(metrics.clone()),
    );

    // 4) Recognizer, with the console control channel beside it.
    let (control_tx, control_rx) = mpsc::channel::<ControlRequest>(16);
    let (recognition_tx, recognition_rx) = mpsc::channel::<Recognition>(64);
    let engine = KwsEngine::with_bank(opts.config.kws.clone(), opts.bank);
    let kws_handle = KwsStage::spawn(
        engine,
        utterance_tx.subscribe(),
        control_rx,
        recognition_tx,
        Some(metrics.clone()),
    );

    // 5) Grammar and command output.
    let (intent_tx, intent_rx) = mpsc::channel::<Intent>(64);
    let parser_handle = ParserStage::spawn(opts.config.parser.clone(), recognition_rx, intent_tx);
    let emitter_handle = CommandEmitter::spawn(intent_rx, Some(metrics.clone()));

    info!("pipeline started");

    Ok(AppHandle {
        metrics,
        control_tx,
        source,
        chunker_handle,
        segmenter_handle,
        kws_handle,
        parser_handle,
        emitter_handle,
        replay_done,
    })
}
