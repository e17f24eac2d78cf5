//! Windowed grammar over the token history.
//!
//! Commands are short fixed phrases ("set baking five minute", "add five
//! minute timer one"). Words arrive one at a time from the matcher, so after
//! every push the parser rescans the recent history for a phrase that just
//! became complete. Anchors are tried newest first and the first complete
//! phrase wins; a successful parse drains the history so one utterance never
//! produces two commands.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::history::{HeardToken, TokenHistory, DEFAULT_HISTORY_CAPACITY};
use crate::intent::{Intent, TimerTarget};
use crate::tokens::Token;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Tokens older than this are invisible to the parser.
    pub window_ms: u64,
    /// How many of the newest history entries may anchor a command.
    pub scan_depth: usize,
    /// Slots in the token history ring.
    pub history_capacity: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            window_ms: 2200,
            scan_depth: 6,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

pub struct GrammarParser {
    history: TokenHistory,
    config: ParserConfig,
}

impl GrammarParser {
    pub fn new(config: ParserConfig) -> Self {
        let history = TokenHistory::new(config.history_capacity);
        Self { history, config }
    }

    /// Records a recognition and reports the command it completed, if any.
    ///
    /// Timestamps come from the audio clock, not the wall clock, so replayed
    /// captures parse identically every run.
    pub fn push(&mut self, token: Token, timestamp_ms: u64) -> Option<Intent> {
        trace!(token = token.name(), timestamp_ms, "token heard");
        self.history.push(token, timestamp_ms);

        let intent = self.resolve(token, timestamp_ms);
        if let Some(ref intent) = intent {
            debug!(?intent, "command resolved");
            self.history.clear();
        }
        intent
    }

    pub fn history(&self) -> &TokenHistory {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    fn resolve(&self, just_heard: Token, now_ms: u64) -> Option<Intent> {
        // STOP needs no modifiers and must win even over a half-spoken
        // phrase; only the freshly heard word counts, a stale STOP in the
        // window never re-fires.
        if just_heard == Token::Stop {
            return Some(Intent::Stop);
        }

        let window = self.history.recent_window(now_ms, self.config.window_ms);
        let oldest_anchor = window.len().saturating_sub(self.config.scan_depth);

        for anchor in (oldest_anchor..window.len()).rev() {
            let tail = &window[anchor + 1..];
            let intent = match window[anchor].token {
                Token::Set => parse_set(tail),
                Token::Add => parse_adjust(tail, 1),
                Token::Minus => parse_adjust(tail, -1),
                Token::Cancel => parse_cancel(tail),
                _ => None,
            };
            if intent.is_some() {
                return intent;
            }
        }
        None
    }
}

/// Forward scan of the numeral words in a phrase tail.
///
/// A tens word may compound with an immediately following ones word
/// ("twenty five" is 25); any other numeral stands alone. Once a value is
/// locked in, later numerals are ignored.
#[derive(Default)]
struct QuantityScan {
    value: Option<u32>,
    tens_at: Option<usize>,
}

impl QuantityScan {
    fn offer(&mut self, position: usize, token: Token) {
        if let Some(tens) = token.tens_value() {
            if self.value.is_none() {
                self.value = Some(tens);
                self.tens_at = Some(position);
            }
        } else if let Some(ones) = token.ones_value() {
            if self.tens_at == Some(position.wrapping_sub(1)) {
                self.value = Some(self.value.unwrap_or(0) + ones);
                self.tens_at = None;
            } else if self.value.is_none() {
                self.value = Some(ones);
            }
        } else if let Some(small) = token.small_value() {
            if self.value.is_none() {
                self.value = Some(small);
            }
        }
    }
}

/// SET <name?> <timer?> <quantity> <unit>
fn parse_set(tail: &[HeardToken]) -> Option<Intent> {
    let mut name: Option<&'static str> = None;
    let mut quantity = QuantityScan::default();
    let mut unit: Option<i64> = None;

    for (i, entry) in tail.iter().enumerate() {
        let token = entry.token;
        if token.is_command() {
            break;
        }
        if let Some(display) = token.timer_name() {
            name.get_or_insert(display);
        } else if let Some(seconds) = token.unit_seconds() {
            unit.get_or_insert(seconds);
        } else {
            quantity.offer(i, token);
        }
    }

    let value = quantity.value?;
    let unit = unit?;
    Some(Intent::Set {
        name: name.map(String::from),
        seconds: value * unit as u32,
    })
}

/// ADD/MINUS <quantity> <unit> with a target: a name word, or the TIMER
/// keyword followed by a numeral slot index.
fn parse_adjust(tail: &[HeardToken], sign: i64) -> Option<Intent> {
    let mut quantity = QuantityScan::default();
    let mut unit: Option<i64> = None;
    let mut target: Option<TimerTarget> = None;
    let mut keyword_at: Option<usize> = None;

    for (i, entry) in tail.iter().enumerate() {
        let token = entry.token;
        if token.is_command() {
            break;
        }
        if token == Token::Timer {
            keyword_at = Some(i);
        } else if let Some(display) = token.timer_name() {
            target.get_or_insert(TimerTarget::Name(display.to_string()));
        } else if let Some(seconds) = token.unit_seconds() {
            unit.get_or_insert(seconds);
        } else if target.is_none()
            && keyword_at == Some(i.wrapping_sub(1))
            && token.small_value().is_some()
        {
            target = Some(TimerTarget::Index(token.small_value()? as u8));
        } else {
            quantity.offer(i, token);
        }
    }

    let value = quantity.value?;
    let unit = unit?;
    let target = target?;
    Some(Intent::Adjust {
        target,
        seconds: sign * value as i64 * unit,
    })
}

/// CANCEL <timer> with an optional name word or numeral slot index.
fn parse_cancel(tail: &[HeardToken]) -> Option<Intent> {
    let mut keyword_at: Option<usize> = None;
    let mut name: Option<&'static str> = None;
    let mut index: Option<u8> = None;

    for (i, entry) in tail.iter().enumerate() {
        let token = entry.token;
        if token.is_command() {
            break;
        }
        if token == Token::Timer {
            keyword_at = Some(i);
        } else if let Some(display) = token.timer_name() {
            name.get_or_insert(display);
        } else if index.is_none() && keyword_at == Some(i.wrapping_sub(1)) {
            if let Some(value) = token.small_value() {
                index = Some(value as u8);
            }
        }
    }

    keyword_at?;
    let target = name
        .map(|n| TimerTarget::Name(n.to_string()))
        .or(index.map(TimerTarget::Index));
    Some(Intent::Cancel { target })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(parser: &mut GrammarParser, script: &[(Token, u64)]) -> Vec<Option<Intent>> {
        script
            .iter()
            .map(|&(token, ts)| parser.push(token, ts))
            .collect()
    }

    #[test]
    fn set_named_timer() {
        let mut parser = GrammarParser::new(ParserConfig::default());
        let results = feed(
            &mut parser,
            &[
                (Token::Set, 0),
                (Token::Baking, 400),
                (Token::Five, 800),
                (Token::Minute, 1200),
            ],
        );
        assert_eq!(results[0], None);
        assert_eq!(results[1], None);
        assert_eq!(results[2], None);
        assert_eq!(
            results[3],
            Some(Intent::Set {
                name: Some("Baking".into()),
                seconds: 300
            })
        );
        assert!(parser.history().is_empty(), "success drains the history");
    }

    #[test]
    fn add_to_indexed_timer() {
        let mut parser = GrammarParser::new(ParserConfig::default());
        let results = feed(
            &mut parser,
            &[
                (Token::Add, 0),
                (Token::Five, 400),
                (Token::Minute, 800),
                (Token::Timer, 1200),
                (Token::One, 1600),
            ],
        );
        assert!(results[..4].iter().all(Option::is_none));
        assert_eq!(
            results[4],
            Some(Intent::Adjust {
                target: TimerTarget::Index(1),
                seconds: 300
            })
        );
    }

    #[test]
    fn minus_compound_quantity_named_timer() {
        let mut parser = GrammarParser::new(ParserConfig::default());
        let results = feed(
            &mut parser,
            &[
                (Token::Minus, 0),
                (Token::Twenty, 300),
                (Token::Five, 600),
                (Token::Minute, 900),
                (Token::Baking, 1200),
            ],
        );
        assert_eq!(
            results[4],
            Some(Intent::Adjust {
                target: TimerTarget::Name("Baking".into()),
                seconds: -1500
            })
        );
    }

    #[test]
    fn stop_fires_alone_and_immediately() {
        let mut parser = GrammarParser::new(ParserConfig::default());
        parser.push(Token::Set, 0);
        parser.push(Token::Five, 300);
        assert_eq!(parser.push(Token::Stop, 600), Some(Intent::Stop));
        assert!(parser.history().is_empty());
    }

    #[test]
    fn stale_stop_does_not_refire() {
        let mut parser = GrammarParser::new(ParserConfig::default());
        // STOP resolves and drains; feed one afterwards to make sure a
        // non-command word cannot resurrect it.
        assert_eq!(parser.push(Token::Stop, 0), Some(Intent::Stop));
        assert_eq!(parser.push(Token::Minute, 200), None);
    }

    #[test]
    fn set_without_name_or_keyword() {
        let mut parser = GrammarParser::new(ParserConfig::default());
        parser.push(Token::Set, 0);
        parser.push(Token::One, 300);
        assert_eq!(
            parser.push(Token::Hour, 600),
            Some(Intent::Set {
                name: None,
                seconds: 3600
            })
        );
    }

    #[test]
    fn set_with_timer_keyword() {
        let mut parser = GrammarParser::new(ParserConfig::default());
        parser.push(Token::Set, 0);
        parser.push(Token::Timer, 250);
        parser.push(Token::Two, 500);
        assert_eq!(
            parser.push(Token::Minutes, 750),
            Some(Intent::Set {
                name: None,
                seconds: 120
            })
        );
    }

    #[test]
    fn tens_word_alone_is_a_quantity() {
        let mut parser = GrammarParser::new(ParserConfig::default());
        parser.push(Token::Set, 0);
        parser.push(Token::Thirty, 300);
        assert_eq!(
            parser.push(Token::Minutes, 600),
            Some(Intent::Set {
                name: None,
                seconds: 1800
            })
        );
    }

    #[test]
    fn cancel_indexed_and_named() {
        let mut parser = GrammarParser::new(ParserConfig::default());
        parser.push(Token::Cancel, 0);
        parser.push(Token::Timer, 300);
        assert_eq!(
            parser.push(Token::Two, 600),
            Some(Intent::Cancel {
                target: Some(TimerTarget::Index(2))
            })
        );

        parser.push(Token::Cancel, 2000);
        parser.push(Token::Baking, 2300);
        assert_eq!(
            parser.push(Token::Timer, 2600),
            Some(Intent::Cancel {
                target: Some(TimerTarget::Name("Baking".into()))
            })
        );
    }

    #[test]
    fn cancel_requires_the_timer_keyword() {
        let mut parser = GrammarParser::new(ParserConfig::default());
        parser.push(Token::Cancel, 0);
        assert_eq!(parser.push(Token::Baking, 300), None);
        assert_eq!(
            parser.push(Token::Timer, 600),
            Some(Intent::Cancel {
                target: Some(TimerTarget::Name("Baking".into()))
            })
        );
    }

    #[test]
    fn tokens_expire_outside_the_window() {
        let mut parser = GrammarParser::new(ParserConfig::default());
        parser.push(Token::Set, 0);
        parser.push(Token::Five, 2600);
        // SET is 3000 ms old by now, outside the 2200 ms window.
        assert_eq!(parser.push(Token::Minute, 3000), None);
    }

    #[test]
    fn nearest_anchor_wins() {
        let mut parser = GrammarParser::new(ParserConfig::default());
        parser.push(Token::Add, 0);
        parser.push(Token::Set, 200);
        parser.push(Token::Five, 400);
        // SET is the nearer anchor and completes; the stale ADD (which
        // would still need a target) never gets a chance to misfire.
        assert_eq!(
            parser.push(Token::Minute, 600),
            Some(Intent::Set {
                name: None,
                seconds: 300
            })
        );
    }

    #[test]
    fn command_word_ends_the_phrase() {
        let mut parser = GrammarParser::new(ParserConfig::default());
        parser.push(Token::Set, 0);
        parser.push(Token::Three, 200);
        parser.push(Token::Add, 400);
        // The ADD cuts SET's phrase before any unit word arrives.
        assert_eq!(parser.push(Token::Minute, 600), None);
    }

    #[test]
    fn adjust_index_before_quantity() {
        let mut parser = GrammarParser::new(ParserConfig::default());
        parser.push(Token::Add, 0);
        parser.push(Token::Timer, 300);
        parser.push(Token::Three, 600);
        parser.push(Token::Ten, 900);
        assert_eq!(
            parser.push(Token::Minutes, 1200),
            Some(Intent::Adjust {
                target: TimerTarget::Index(3),
                seconds: 600
            })
        );
    }

    #[test]
    fn adjust_without_target_stays_silent() {
        let mut parser = GrammarParser::new(ParserConfig::default());
        parser.push(Token::Add, 0);
        parser.push(Token::Five, 300);
        assert_eq!(parser.push(Token::Minute, 600), None);
    }

    #[test]
    fn incomplete_phrase_reports_nothing() {
        let mut parser = GrammarParser::new(ParserConfig::default());
        assert_eq!(parser.push(Token::Set, 0), None);
        assert_eq!(parser.push(Token::Baking, 400), None);
        assert_eq!(parser.push(Token::Five, 800), None);
        assert_eq!(parser.history().len(), 3);
    }
}
