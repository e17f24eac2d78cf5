//! Nearest-template scoring and the acceptance rule.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::constants::DEFAULT_DTW_BAND;
use crate::dtw::Dtw;
use crate::features::FeatureFrame;
use crate::template::TemplateBank;
use tempovox_grammar::Token;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Normalized DTW distance the best match must stay under.
    pub accept_threshold: f32,
    /// How far the runner-up token must trail the winner.
    pub margin_min: f32,
    /// DTW band half-width in frames.
    pub dtw_band: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            accept_threshold: 20.0,
            margin_min: 2.0,
            dtw_band: DEFAULT_DTW_BAND,
        }
    }
}

/// What the matcher decided about one utterance.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Accepted {
        token: Token,
        distance: f32,
        margin: f32,
    },
    /// The nearest token was still too far away.
    RejectedThreshold { nearest: Token, distance: f32 },
    /// Two tokens were too close to call.
    RejectedMargin {
        nearest: Token,
        distance: f32,
        margin: f32,
    },
    /// The utterance produced no usable frames.
    TooShort,
    /// The bank has no templates at all.
    NoTemplates,
}

/// Scores utterances against every enrolled template.
pub struct TemplateMatcher {
    dtw: Dtw,
    config: MatchConfig,
}

impl TemplateMatcher {
    pub fn new(config: MatchConfig) -> Self {
        let dtw = Dtw::new(config.dtw_band);
        Self { dtw, config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Finds the nearest token and applies the acceptance rule.
    ///
    /// A token's distance is the minimum over its templates; the runner-up
    /// is the nearest distance belonging to any other token.
    pub fn classify(&mut self, bank: &TemplateBank, features: &[FeatureFrame]) -> MatchOutcome {
        if features.is_empty() {
            return MatchOutcome::TooShort;
        }

        let mut best: Option<(Token, f32)> = None;
        let mut second_best = f32::INFINITY;

        for (token, templates) in bank.iter() {
            let mut token_distance = f32::INFINITY;
            for template in templates {
                token_distance = token_distance.min(self.dtw.distance(features, &template.frames));
            }
            trace!(token = token.name(), distance = token_distance, "scored");

            match best {
                None => best = Some((token, token_distance)),
                Some((_, best_distance)) if token_distance < best_distance => {
                    second_best = best_distance;
                    best = Some((token, token_distance));
                }
                _ => second_best = second_best.min(token_distance),
            }
        }

        match best {
            None => MatchOutcome::NoTemplates,
            Some((token, distance)) => evaluate(token, distance, second_best, &self.config),
        }
    }
}

/// The acceptance rule: the winner must clear the distance threshold and
/// lead the runner-up by more than the margin.
pub fn evaluate(
    nearest: Token,
    best: f32,
    second_best: f32,
    config: &MatchConfig,
) -> MatchOutcome {
    if !best.is_finite() || best >= config.accept_threshold {
        return MatchOutcome::RejectedThreshold {
            nearest,
            distance: best,
        };
    }
    let margin = second_best - best;
    if margin <= config.margin_min {
        return MatchOutcome::RejectedMargin {
            nearest,
            distance: best,
            margin,
        };
    }
    MatchOutcome::Accepted {
        token: nearest,
        distance: best,
        margin,
    }
}
