use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicI16, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared metrics for cross-thread pipeline monitoring
#[derive(Clone)]
pub struct PipelineMetrics {
    // Audio level monitoring
    pub current_peak: Arc<AtomicI16>, // Peak sample value in current window
    pub current_rms: Arc<AtomicU64>,  // RMS * 1000 for precision
    pub audio_level_db: Arc<AtomicI16>, // Current level in dB * 10

    // Pipeline stage tracking
    pub stage_capture: Arc<AtomicBool>, // Data reached capture stage
    pub stage_chunker: Arc<AtomicBool>, // Data reached chunker stage
    pub stage_segmenter: Arc<AtomicBool>, // Data reached VAD/segmenter stage
    pub stage_matcher: Arc<AtomicBool>, // Data reached keyword matcher stage
    pub stage_output: Arc<AtomicBool>,  // Data reached command output stage

    // Buffer monitoring
    pub capture_buffer_fill: Arc<AtomicUsize>, // Capture ring fill %

    // Frame rate tracking
    pub capture_fps: Arc<AtomicU64>, // Blocks per second * 10
    pub chunker_fps: Arc<AtomicU64>, // Hops per second * 10

    // Event counters
    pub capture_frames: Arc<AtomicU64>,
    pub chunker_frames: Arc<AtomicU64>,

    // Activity indicators
    pub is_speaking: Arc<AtomicBool>, // Currently inside an utterance
    pub last_speech_time: Arc<RwLock<Option<Instant>>>,

    // Segmenter outcomes
    pub segments_detected: Arc<AtomicU64>,
    pub segments_too_short: Arc<AtomicU64>,

    // Matcher outcomes
    pub matches_accepted: Arc<AtomicU64>,
    pub rejects_threshold: Arc<AtomicU64>,
    pub rejects_margin: Arc<AtomicU64>,
    pub enrollments: Arc<AtomicU64>,

    // Grammar / output
    pub commands_emitted: Arc<AtomicU64>,

    // Error tracking
    pub capture_errors: Arc<AtomicU64>,
    pub chunker_errors: Arc<AtomicU64>,
    pub queue_drops: Arc<AtomicU64>,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self {
            current_peak: Arc::new(AtomicI16::new(0)),
            current_rms: Arc::new(AtomicU64::new(0)),
            audio_level_db: Arc::new(AtomicI16::new(-900)),

            stage_capture: Arc::new(AtomicBool::new(false)),
            stage_chunker: Arc::new(AtomicBool::new(false)),
            stage_segmenter: Arc::new(AtomicBool::new(false)),
            stage_matcher: Arc::new(AtomicBool::new(false)),
            stage_output: Arc::new(AtomicBool::new(false)),

            capture_buffer_fill: Arc::new(AtomicUsize::new(0)),

            capture_fps: Arc::new(AtomicU64::new(0)),
            chunker_fps: Arc::new(AtomicU64::new(0)),

            capture_frames: Arc::new(AtomicU64::new(0)),
            chunker_frames: Arc::new(AtomicU64::new(0)),

            is_speaking: Arc::new(AtomicBool::new(false)),
            last_speech_time: Arc::new(RwLock::new(None)),

            segments_detected: Arc::new(AtomicU64::new(0)),
            segments_too_short: Arc::new(AtomicU64::new(0)),

            matches_accepted: Arc::new(AtomicU64::new(0)),
            rejects_threshold: Arc::new(AtomicU64::new(0)),
            rejects_margin: Arc::new(AtomicU64::new(0)),
            enrollments: Arc::new(AtomicU64::new(0)),

            commands_emitted: Arc::new(AtomicU64::new(0)),

            capture_errors: Arc::new(AtomicU64::new(0)),
            chunker_errors: Arc::new(AtomicU64::new(0)),
            queue_drops: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl PipelineMetrics {
    pub fn update_audio_level(&self, samples: &[i16]) {
        if samples.is_empty() {
            return;
        }

        let peak = samples.iter().map(|&s| s.abs()).max().unwrap_or(0);
        self.current_peak.store(peak, Ordering::Relaxed);

        let sum: i64 = samples.iter().map(|&s| s as i64 * s as i64).sum();
        let rms = ((sum as f64 / samples.len() as f64).sqrt() * 1000.0) as u64;
        self.current_rms.store(rms, Ordering::Relaxed);

        let db = if peak > 0 {
            (20.0 * (peak as f64 / 32768.0).log10() * 10.0) as i16
        } else {
            -900
        };
        self.audio_level_db.store(db, Ordering::Relaxed);
    }

    pub fn mark_stage_active(&self, stage: PipelineStage) {
        match stage {
            PipelineStage::Capture => self.stage_capture.store(true, Ordering::Relaxed),
            PipelineStage::Chunker => self.stage_chunker.store(true, Ordering::Relaxed),
            PipelineStage::Segmenter => self.stage_segmenter.store(true, Ordering::Relaxed),
            PipelineStage::Matcher => self.stage_matcher.store(true, Ordering::Relaxed),
            PipelineStage::Output => self.stage_output.store(true, Ordering::Relaxed),
        }
    }

    pub fn decay_stages(&self) {
        self.stage_capture.store(false, Ordering::Relaxed);
        self.stage_chunker.store(false, Ordering::Relaxed);
        self.stage_segmenter.store(false, Ordering::Relaxed);
        self.stage_matcher.store(false, Ordering::Relaxed);
        self.stage_output.store(false, Ordering::Relaxed);
    }

    pub fn update_capture_buffer_fill(&self, fill_percent: usize) {
        self.capture_buffer_fill
            .store(fill_percent.min(100), Ordering::Relaxed);
    }

    pub fn update_capture_fps(&self, fps: f64) {
        self.capture_fps.store((fps * 10.0) as u64, Ordering::Relaxed);
    }

    pub fn update_chunker_fps(&self, fps: f64) {
        self.chunker_fps.store((fps * 10.0) as u64, Ordering::Relaxed);
    }

    pub fn increment_capture_frames(&self) {
        self.capture_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_chunker_frames(&self) {
        self.chunker_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_speaking(&self, speaking: bool) {
        self.is_speaking.store(speaking, Ordering::Relaxed);
        if speaking {
            *self.last_speech_time.write() = Some(Instant::now());
        }
    }

    pub fn record_segment(&self) {
        self.segments_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_segment_too_short(&self) {
        self.segments_too_short.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_match_accepted(&self) {
        self.matches_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reject_threshold(&self) {
        self.rejects_threshold.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reject_margin(&self) {
        self.rejects_margin.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_enrollment(&self) {
        self.enrollments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command_emitted(&self) {
        self.commands_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_queue_drop(&self) {
        self.queue_drops.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy)]
pub enum PipelineStage {
    Capture,
    Chunker,
    Segmenter,
    Matcher,
    Output,
}

#[derive(Debug)]
pub struct FpsTracker {
    last_update: Instant,
    frame_count: u64,
}

impl FpsTracker {
    pub fn new() -> Self {
        Self {
            last_update: Instant::now(),
            frame_count: 0,
        }
    }

    pub fn tick(&mut self) -> Option<f64> {
        self.frame_count += 1;
        let elapsed = self.last_update.elapsed();

        if elapsed >= Duration::from_secs(1) {
            let fps = self.frame_count as f64 / elapsed.as_secs_f64();
            self.last_update = Instant::now();
            self.frame_count = 0;
            Some(fps)
        } else {
            None
        }
    }
}

impl Default for FpsTracker {
    fn default() -> Self {
        Self::new()
    }
}
