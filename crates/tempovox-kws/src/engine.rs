//! Utterance-level recognizer: features, enrollment, and matching in one
//! place.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::constants::MAX_TEMPLATES_PER_TOKEN;
use crate::error::KwsError;
use crate::features::FeatureExtractor;
use crate::matcher::{MatchConfig, MatchOutcome, TemplateMatcher};
use crate::template::TemplateBank;
use tempovox_grammar::Token;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KwsConfig {
    pub matcher: MatchConfig,
    /// Template slots per vocabulary word.
    pub max_templates_per_token: usize,
}

impl Default for KwsConfig {
    fn default() -> Self {
        Self {
            matcher: MatchConfig::default(),
            max_templates_per_token: MAX_TEMPLATES_PER_TOKEN,
        }
    }
}

/// An accepted vocabulary word, stamped with the utterance end time.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub token: Token,
    pub distance: f32,
    pub margin: f32,
    pub timestamp_ms: u64,
}

/// What the engine did with one utterance.
#[derive(Debug, Clone, PartialEq)]
pub enum KwsEvent {
    Recognized(Recognition),
    /// The armed enrollment consumed this utterance as a new template.
    Enrolled {
        token: Token,
        slot: usize,
        frames: usize,
    },
    Rejected {
        outcome: MatchOutcome,
        timestamp_ms: u64,
    },
}

/// One recognizer instance: owns the extractor, the bank, and the matcher.
///
/// Not shared across threads; the pipeline runs exactly one engine on the
/// utterance stream.
pub struct KwsEngine {
    extractor: FeatureExtractor,
    bank: TemplateBank,
    matcher: TemplateMatcher,
    pending_enroll: Option<Token>,
}

impl KwsEngine {
    pub fn new(config: KwsConfig) -> Self {
        Self {
            extractor: FeatureExtractor::new(),
            bank: TemplateBank::new(config.max_templates_per_token),
            matcher: TemplateMatcher::new(config.matcher),
            pending_enroll: None,
        }
    }

    pub fn with_bank(config: KwsConfig, bank: TemplateBank) -> Self {
        Self {
            extractor: FeatureExtractor::new(),
            bank,
            matcher: TemplateMatcher::new(config.matcher),
            pending_enroll: None,
        }
    }

    /// The next utterance becomes a template for `token` instead of being
    /// matched. Arming again before that just changes the word.
    pub fn arm_enrollment(&mut self, token: Token) {
        info!(token = token.name(), "enrollment armed");
        self.pending_enroll = Some(token);
    }

    pub fn pending_enrollment(&self) -> Option<Token> {
        self.pending_enroll
    }

    pub fn bank(&self) -> &TemplateBank {
        &self.bank
    }

    pub fn save_bank(&self, path: &Path) -> Result<(), KwsError> {
        self.bank.save(path)
    }

    /// Runs one segmented utterance through enrollment or matching.
    ///
    /// `end_timestamp_ms` is the utterance end on the audio clock and is the
    /// timestamp the grammar sees for an accepted word. The only error is
    /// template allocation failure during enrollment, which leaves the bank
    /// unchanged.
    pub fn process_utterance(
        &mut self,
        samples: &[i16],
        end_timestamp_ms: u64,
    ) -> Result<KwsEvent, KwsError> {
        let features = self.extractor.extract(samples);
        if features.is_empty() {
            warn!(
                samples = samples.len(),
                "utterance shorter than one analysis frame"
            );
            return Ok(KwsEvent::Rejected {
                outcome: MatchOutcome::TooShort,
                timestamp_ms: end_timestamp_ms,
            });
        }

        if let Some(token) = self.pending_enroll.take() {
            let frames = features.len();
            let slot = self.bank.enroll(token, &features)?;
            info!(token = token.name(), slot, frames, "template enrolled");
            return Ok(KwsEvent::Enrolled {
                token,
                slot,
                frames,
            });
        }

        let outcome = self.matcher.classify(&self.bank, &features);
        let event = match outcome {
            MatchOutcome::Accepted {
                token,
                distance,
                margin,
            } => {
                debug!(
                    token = token.name(),
                    distance, margin, "utterance recognized"
                );
                KwsEvent::Recognized(Recognition {
                    token,
                    distance,
                    margin,
                    timestamp_ms: end_timestamp_ms,
                })
            }
            other => {
                debug!(outcome = ?other, "utterance rejected");
                KwsEvent::Rejected {
                    outcome: other,
                    timestamp_ms: end_timestamp_ms,
                }
            }
        };
        Ok(event)
    }
}
