//! Command output stage.
//!
//! Serializes each resolved command onto stdout as a wire line, mirrors it
//! into the log, and drives the local timer actuator including its 1 Hz
//! countdown tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use tempovox_grammar::{format_command, Intent};
use tempovox_telemetry::{PipelineMetrics, PipelineStage};

use crate::timers::TimerBank;

pub struct CommandEmitter {
    intent_rx: mpsc::Receiver<Intent>,
    timers: TimerBank,
    metrics: Option<Arc<PipelineMetrics>>,
    commands_emitted: u64,
}

impl CommandEmitter {
    pub fn new(intent_rx: mpsc::Receiver<Intent>, metrics: Option<Arc<PipelineMetrics>>) -> Self {
        Self {
            intent_rx,
            timers: TimerBank::new(),
            metrics,
            commands_emitted: 0,
        }
    }

    pub fn spawn(
        intent_rx: mpsc::Receiver<Intent>,
        metrics: Option<Arc<PipelineMetrics>>,
    ) -> JoinHandle<()> {
        tokio::spawn(Self::new(intent_rx, metrics).run())
    }

    pub async fn run(mut self) {
        info!("emitter task started");
        let mut tick = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                intent = self.intent_rx.recv() => match intent {
                    Some(intent) => self.emit(intent),
                    None => break,
                },
                _ = tick.tick() => {
                    for line in self.timers.tick() {
                        println!("{line}");
                    }
                }
            }
        }
        info!(
            commands = self.commands_emitted,
            "emitter task shutting down"
        );
    }

    fn emit(&mut self, intent: Intent) {
        let line = format_command(&intent);
        println!("{line}");
        info!(command = %line, "command emitted");
        self.commands_emitted += 1;
        if let Some(metrics) = &self.metrics {
            metrics.record_command_emitted();
            metrics.mark_stage_active(PipelineStage::Output);
        }
        for line in self.timers.apply(&intent) {
            println!("{line}");
        }
    }
}
