//! Enrolled templates and the on-disk bank.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::{MAX_TEMPLATES_PER_TOKEN, NUM_BINS, SAMPLE_RATE_HZ};
use crate::error::KwsError;
use crate::features::FeatureFrame;
use tempovox_grammar::{Token, VOCABULARY_SIZE};

/// One enrolled exemplar: a CMVN-normalized feature sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub frames: Vec<FeatureFrame>,
}

impl Template {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
struct TokenSlots {
    templates: Vec<Template>,
    /// Total insertions ever made for this token; drives the wrap-around
    /// replacement cursor.
    inserted: u64,
}

/// All enrolled templates, indexed by token id.
///
/// Each token holds up to a fixed number of slots. Slots fill in order and
/// then wrap, so the fourth enrollment replaces the oldest exemplar, not the
/// newest.
#[derive(Debug, Clone)]
pub struct TemplateBank {
    slots: Vec<TokenSlots>,
    max_per_token: usize,
}

impl Default for TemplateBank {
    fn default() -> Self {
        Self::new(MAX_TEMPLATES_PER_TOKEN)
    }
}

impl TemplateBank {
    pub fn new(max_per_token: usize) -> Self {
        assert!(max_per_token > 0, "bank needs at least one slot per token");
        Self {
            slots: vec![TokenSlots::default(); VOCABULARY_SIZE],
            max_per_token,
        }
    }

    /// Copies an utterance's features into exactly-sized template storage
    /// and stores it. Allocation failure leaves every slot untouched.
    pub fn enroll(&mut self, token: Token, frames: &[FeatureFrame]) -> Result<usize, KwsError> {
        let mut stored = Vec::new();
        stored
            .try_reserve_exact(frames.len())
            .map_err(|_| KwsError::TemplateAlloc {
                frames: frames.len(),
            })?;
        stored.extend_from_slice(frames);
        Ok(self.insert(token, Template { frames: stored }))
    }

    /// Stores a template and returns the slot index it landed in.
    pub fn insert(&mut self, token: Token, template: Template) -> usize {
        let entry = &mut self.slots[token.id() as usize];
        let slot = (entry.inserted % self.max_per_token as u64) as usize;
        if slot < entry.templates.len() {
            entry.templates[slot] = template;
        } else {
            entry.templates.push(template);
        }
        entry.inserted += 1;
        slot
    }

    pub fn templates(&self, token: Token) -> &[Template] {
        &self.slots[token.id() as usize].templates
    }

    /// Tokens with at least one template, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (Token, &[Template])> + '_ {
        self.slots.iter().enumerate().filter_map(|(id, entry)| {
            if entry.templates.is_empty() {
                None
            } else {
                Token::from_id(id as u16).map(|token| (token, entry.templates.as_slice()))
            }
        })
    }

    pub fn total_templates(&self) -> usize {
        self.slots.iter().map(|e| e.templates.len()).sum()
    }

    pub fn enrolled_tokens(&self) -> usize {
        self.slots.iter().filter(|e| !e.templates.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|e| e.templates.is_empty())
    }

    /// Writes the bank as JSON keyed by spoken word.
    pub fn save(&self, path: &Path) -> Result<(), KwsError> {
        let mut tokens = BTreeMap::new();
        for (token, templates) in self.iter() {
            let frames: Vec<Vec<FeatureFrame>> =
                templates.iter().map(|t| t.frames.clone()).collect();
            tokens.insert(token.name().to_string(), frames);
        }
        let file = BankFile {
            format_version: BANK_FORMAT_VERSION,
            sample_rate: SAMPLE_RATE_HZ,
            nbins: NUM_BINS,
            tokens,
        };
        fs::write(path, serde_json::to_string(&file)?)?;
        info!(
            path = %path.display(),
            tokens = self.enrolled_tokens(),
            templates = self.total_templates(),
            "template bank saved"
        );
        Ok(())
    }

    /// Reads a bank written by [`TemplateBank::save`] or the bank builder.
    pub fn load(path: &Path) -> Result<Self, KwsError> {
        let file: BankFile = serde_json::from_str(&fs::read_to_string(path)?)?;
        if file.format_version != BANK_FORMAT_VERSION {
            return Err(KwsError::UnsupportedVersion(file.format_version));
        }
        if file.nbins != NUM_BINS {
            return Err(KwsError::BinMismatch {
                found: file.nbins,
                expected: NUM_BINS,
            });
        }
        if file.sample_rate != SAMPLE_RATE_HZ {
            return Err(KwsError::SampleRateMismatch {
                found: file.sample_rate,
                expected: SAMPLE_RATE_HZ,
            });
        }

        let mut bank = TemplateBank::default();
        for (name, templates) in file.tokens {
            let token = Token::from_name(&name).ok_or_else(|| KwsError::UnknownWord(name.clone()))?;
            for frames in templates {
                if frames.is_empty() {
                    return Err(KwsError::EmptyTemplate(name.clone()));
                }
                bank.insert(token, Template { frames });
            }
        }
        info!(
            path = %path.display(),
            tokens = bank.enrolled_tokens(),
            templates = bank.total_templates(),
            "template bank loaded"
        );
        Ok(bank)
    }
}

const BANK_FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct BankFile {
    format_version: u32,
    sample_rate: u32,
    nbins: usize,
    tokens: BTreeMap<String, Vec<Vec<FeatureFrame>>>,
}
