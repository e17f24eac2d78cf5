//! Keyword recognition stage.
//!
//! Owns the recognizer engine. Utterances arrive from the segmenter over
//! the lossy utterance channel; console requests arrive over a bounded
//! channel and are answered inline, so an armed enrollment always applies
//! to the next utterance and never races a match in progress.

use std::fmt::Write as _;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use tempovox_kws::{KwsEngine, KwsEvent, MatchOutcome, Recognition, TemplateBank};
use tempovox_telemetry::{PipelineMetrics, PipelineStage};

use super::segmenter::UtteranceAudio;
use crate::control::ControlRequest;

pub struct KwsStage {
    engine: KwsEngine,
    utterance_rx: broadcast::Receiver<UtteranceAudio>,
    control_rx: mpsc::Receiver<ControlRequest>,
    recognition_tx: mpsc::Sender<Recognition>,
    metrics: Option<Arc<PipelineMetrics>>,
    utterances_processed: u64,
}

impl KwsStage {
    pub fn new(
        engine: KwsEngine,
        utterance_rx: broadcast::Receiver<UtteranceAudio>,
        control_rx: mpsc::Receiver<ControlRequest>,
        recognition_tx: mpsc::Sender<Recognition>,
        metrics: Option<Arc<PipelineMetrics>>,
    ) -> Self {
        Self {
            engine,
            utterance_rx,
            control_rx,
            recognition_tx,
            metrics,
            utterances_processed: 0,
        }
    }

    pub fn spawn(
        engine: KwsEngine,
        utterance_rx: broadcast::Receiver<UtteranceAudio>,
        control_rx: mpsc::Receiver<ControlRequest>,
        recognition_tx: mpsc::Sender<Recognition>,
        metrics: Option<Arc<PipelineMetrics>>,
    ) -> JoinHandle<()> {
        let stage = Self::new(engine, utterance_rx, control_rx, recognition_tx, metrics);
        tokio::spawn(stage.run())
    }

    pub async fn run(mut self) {
        info!(
            templates = self.engine.bank().total_templates(),
            "recognizer task started"
        );
        let mut control_open = true;
        loop {
            tokio::select! {
                utterance = self.utterance_rx.recv() => match utterance {
                    Ok(utterance) => self.handle_utterance(utterance).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "utterance queue overflow, oldest dropped");
                        if let Some(metrics) = &self.metrics {
                            metrics.record_queue_drop();
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                request = self.control_rx.recv(), if control_open => match request {
                    Some(request) => self.handle_control(request),
                    None => control_open = false,
                },
            }
        }
        info!(
            utterances = self.utterances_processed,
            "recognizer task shutting down"
        );
    }

    async fn handle_utterance(&mut self, utterance: UtteranceAudio) {
        self.utterances_processed += 1;
        if let Some(metrics) = &self.metrics {
            metrics.mark_stage_active(PipelineStage::Matcher);
        }
        let event = match self
            .engine
            .process_utterance(&utterance.samples, utterance.end_timestamp_ms)
        {
            Ok(event) => event,
            Err(e) => {
                error!(error = %e, "enrollment failed, bank unchanged");
                return;
            }
        };
        match event {
            KwsEvent::Recognized(recognition) => {
                info!(
                    token = recognition.token.name(),
                    index = recognition.token.id(),
                    distance = recognition.distance,
                    second_best = recognition.distance + recognition.margin,
                    "keyword accepted"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_match_accepted();
                }
                if self.recognition_tx.send(recognition).await.is_err() {
                    warn!("parser gone, recognition dropped");
                }
            }
            KwsEvent::Enrolled {
                token,
                slot,
                frames,
            } => {
                info!(token = token.name(), slot, frames, "enrollment captured");
                if let Some(metrics) = &self.metrics {
                    metrics.record_enrollment();
                }
            }
            KwsEvent::Rejected { outcome, .. } => self.note_rejection(outcome),
        }
    }

    fn note_rejection(&self, outcome: MatchOutcome) {
        match outcome {
            MatchOutcome::RejectedThreshold { nearest, distance } => {
                debug!(
                    nearest = nearest.name(),
                    distance, "rejected, nothing close enough"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_reject_threshold();
                }
            }
            MatchOutcome::RejectedMargin {
                nearest,
                distance,
                margin,
            } => {
                debug!(
                    nearest = nearest.name(),
                    distance, margin, "rejected, runner-up too close"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_reject_margin();
                }
            }
            MatchOutcome::TooShort => debug!("rejected, utterance too short to featurize"),
            MatchOutcome::NoTemplates => debug!("rejected, template bank is empty"),
            MatchOutcome::Accepted { .. } => {}
        }
    }

    fn handle_control(&mut self, request: ControlRequest) {
        match request {
            ControlRequest::Enroll { token, reply } => {
                self.engine.arm_enrollment(token);
                let _ = reply.send(format!(
                    "ok: armed enrollment for token \"{}\" ({})",
                    token.name(),
                    token.id()
                ));
            }
            ControlRequest::BankSummary { reply } => {
                let _ = reply.send(bank_summary(self.engine.bank()));
            }
            ControlRequest::SaveBank { path, reply } => {
                let message = match self.engine.save_bank(&path) {
                    Ok(()) => {
                        info!(path = %path.display(), "bank saved");
                        format!("ok: bank saved to {}", path.display())
                    }
                    Err(e) => {
                        warn!(error = %e, "bank save failed");
                        format!("err: {e}")
                    }
                };
                let _ = reply.send(message);
            }
        }
    }
}

/// One line of totals, then a line per enrolled token.
fn bank_summary(bank: &TemplateBank) -> String {
    let mut out = format!(
        "ok: {} tokens enrolled, {} templates",
        bank.enrolled_tokens(),
        bank.total_templates()
    );
    for (token, templates) in bank.iter() {
        if !templates.is_empty() {
            let _ = write!(
                out,
                "\n{:>3}  {}: {}",
                token.id(),
                token.name(),
                templates.len()
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;
    use std::time::Duration;
    use tempovox_grammar::Token;
    use tempovox_kws::KwsConfig;
    use tokio::sync::oneshot;

    fn warble(frames: usize) -> Vec<i16> {
        let samples = (frames - 1) * 160 + 400;
        let mut phase = 0.0f32;
        (0..samples)
            .map(|n| {
                let t = n as f32 / samples as f32;
                let freq = 400.0 + 800.0 * t;
                phase += 2.0 * PI * freq / 16_000.0;
                (phase.sin() * 8000.0) as i16
            })
            .collect()
    }

    #[tokio::test]
    async fn console_arms_enrollment_and_reports_the_bank() {
        let (utterance_tx, utterance_rx) = broadcast::channel(8);
        let (control_tx, control_rx) = mpsc::channel(4);
        let (recognition_tx, mut recognition_rx) = mpsc::channel(4);
        let engine = KwsEngine::new(KwsConfig::default());
        let handle = KwsStage::spawn(engine, utterance_rx, control_rx, recognition_tx, None);

        let (reply_tx, reply_rx) = oneshot::channel();
        control_tx
            .send(ControlRequest::Enroll {
                token: Token::Baking,
                reply: reply_tx,
            })
            .await
            .unwrap();
        assert_eq!(
            reply_rx.await.unwrap(),
            "ok: armed enrollment for token \"baking\" (37)"
        );

        utterance_tx
            .send(UtteranceAudio {
                samples: warble(40),
                end_timestamp_ms: 1_000,
            })
            .unwrap();

        let mut summary = String::new();
        for _ in 0..100 {
            let (reply_tx, reply_rx) = oneshot::channel();
            control_tx
                .send(ControlRequest::BankSummary { reply: reply_tx })
                .await
                .unwrap();
            summary = reply_rx.await.unwrap();
            if summary.contains("1 templates") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(
            summary.starts_with("ok: 1 tokens enrolled, 1 templates"),
            "unexpected summary: {summary}"
        );
        assert!(summary.contains(" 37  baking: 1"));

        drop(control_tx);
        drop(utterance_tx);
        let _ = handle.await;
        assert!(recognition_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn enrolled_word_comes_back_as_a_recognition() {
        let (utterance_tx, utterance_rx) = broadcast::channel(8);
        let (control_tx, control_rx) = mpsc::channel(4);
        let (recognition_tx, mut recognition_rx) = mpsc::channel(4);
        let engine = KwsEngine::new(KwsConfig::default());
        let _handle = KwsStage::spawn(engine, utterance_rx, control_rx, recognition_tx, None);

        let (reply_tx, reply_rx) = oneshot::channel();
        control_tx
            .send(ControlRequest::Enroll {
                token: Token::Stop,
                reply: reply_tx,
            })
            .await
            .unwrap();
        reply_rx.await.unwrap();

        // First utterance enrolls, second matches.
        for timestamp in [1_000, 2_000] {
            utterance_tx
                .send(UtteranceAudio {
                    samples: warble(40),
                    end_timestamp_ms: timestamp,
                })
                .unwrap();
        }

        let recognition = tokio::time::timeout(Duration::from_secs(5), recognition_rx.recv())
            .await
            .expect("recognition before timeout")
            .expect("channel open");
        assert_eq!(recognition.token, Token::Stop);
        assert_eq!(recognition.timestamp_ms, 2_000);
    }
}
