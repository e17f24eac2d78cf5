//! Grammar parsing stage: recognized words in, resolved commands out.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use tempovox_grammar::{GrammarParser, Intent, ParserConfig};
use tempovox_kws::Recognition;

pub struct ParserStage {
    parser: GrammarParser,
    recognition_rx: mpsc::Receiver<Recognition>,
    intent_tx: mpsc::Sender<Intent>,
    tokens_seen: u64,
    commands_resolved: u64,
}

impl ParserStage {
    pub fn new(
        config: ParserConfig,
        recognition_rx: mpsc::Receiver<Recognition>,
        intent_tx: mpsc::Sender<Intent>,
    ) -> Self {
        Self {
            parser: GrammarParser::new(config),
            recognition_rx,
            intent_tx,
            tokens_seen: 0,
            commands_resolved: 0,
        }
    }

    pub fn spawn(
        config: ParserConfig,
        recognition_rx: mpsc::Receiver<Recognition>,
        intent_tx: mpsc::Sender<Intent>,
    ) -> JoinHandle<()> {
        let stage = Self::new(config, recognition_rx, intent_tx);
        tokio::spawn(stage.run())
    }

    pub async fn run(mut self) {
        info!("parser task started");
        while let Some(recognition) = self.recognition_rx.recv().await {
            self.tokens_seen += 1;
            debug!(
                token = recognition.token.name(),
                at_ms = recognition.timestamp_ms,
                "word buffered"
            );
            if let Some(intent) = self
                .parser
                .push(recognition.token, recognition.timestamp_ms)
            {
                self.commands_resolved += 1;
                if self.intent_tx.send(intent).await.is_err() {
                    break;
                }
            }
        }
        info!(
            tokens = self.tokens_seen,
            commands = self.commands_resolved,
            "parser task shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempovox_grammar::{TimerTarget, Token};

    #[tokio::test]
    async fn word_sequence_resolves_through_the_stage() {
        let (recognition_tx, recognition_rx) = mpsc::channel(8);
        let (intent_tx, mut intent_rx) = mpsc::channel(8);
        let handle = ParserStage::spawn(ParserConfig::default(), recognition_rx, intent_tx);

        for (token, at) in [
            (Token::Cancel, 1_000),
            (Token::Baking, 1_400),
            (Token::Timer, 1_800),
        ] {
            recognition_tx
                .send(Recognition {
                    token,
                    distance: 5.0,
                    margin: 4.0,
                    timestamp_ms: at,
                })
                .await
                .unwrap();
        }
        drop(recognition_tx);

        let intent = intent_rx.recv().await.expect("one command");
        assert_eq!(
            intent,
            Intent::Cancel {
                target: Some(TimerTarget::Name("Baking".into())),
            }
        );
        assert!(intent_rx.recv().await.is_none());
        handle.await.unwrap();
    }
}
