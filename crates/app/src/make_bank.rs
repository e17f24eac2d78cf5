//! Offline template bank builder.
//!
//! Scans a recordings directory laid out one subdirectory per vocabulary
//! word (`wavs/five/*.wav`), conditions each clip to the recognizer's input
//! format, trims it to the spoken region, and enrolls the result. The
//! output file is the same JSON bank the live console's save-bank writes.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader};
use tracing::{debug, info, warn};

use tempovox_audio::StreamResampler;
use tempovox_grammar::Token;
use tempovox_kws::{
    FeatureExtractor, TemplateBank, FRAME_SIZE_SAMPLES, HOP_SIZE_SAMPLES,
    MAX_TEMPLATES_PER_TOKEN, SAMPLE_RATE_HZ,
};

/// Energy gate floor for the trim pass, in raw sample units.
const TRIM_RMS_FLOOR: f32 = 200.0;

/// Frames of audio kept after the last voiced frame.
const TRIM_POSTROLL_FRAMES: usize = 8;

/// Clips with fewer voiced frames than this fall back to a center cut.
const TRIM_MIN_VOICED_FRAMES: usize = 6;

pub fn build_bank(wavs_dir: &Path, out_path: &Path) -> Result<()> {
    let mut bank = TemplateBank::new(MAX_TEMPLATES_PER_TOKEN);
    let mut extractor = FeatureExtractor::new();
    let mut unknown_dirs = Vec::new();

    let entries = std::fs::read_dir(wavs_dir)
        .with_context(|| format!("read recordings directory {}", wavs_dir.display()))?;
    let mut token_dirs: Vec<(Token, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let dir_name = entry.file_name().to_string_lossy().to_lowercase();
        match Token::from_name(&dir_name) {
            Some(token) => token_dirs.push((token, entry.path())),
            None => {
                warn!(dir = %entry.path().display(), "not a vocabulary word, skipped");
                unknown_dirs.push(dir_name);
            }
        }
    }
    if token_dirs.is_empty() {
        bail!(
            "no vocabulary subdirectories under {} (expected e.g. {}/five/*.wav)",
            wavs_dir.display(),
            wavs_dir.display()
        );
    }
    token_dirs.sort_by_key(|(token, _)| token.id());

    for (token, dir) in &token_dirs {
        let mut clips: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("read {}", dir.display()))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("wav"))
                    .unwrap_or(false)
            })
            .collect();
        clips.sort();

        if clips.len() > MAX_TEMPLATES_PER_TOKEN {
            warn!(
                token = token.name(),
                clips = clips.len(),
                kept = MAX_TEMPLATES_PER_TOKEN,
                "extra recordings ignored"
            );
            clips.truncate(MAX_TEMPLATES_PER_TOKEN);
        }

        for clip in &clips {
            let samples = load_clip(clip)
                .with_context(|| format!("load {}", clip.display()))?;
            let trimmed = trim_to_speech(&samples);
            let features = extractor.extract(trimmed);
            if features.is_empty() {
                warn!(clip = %clip.display(), "clip too short after trimming, skipped");
                continue;
            }
            let frames = features.len();
            let slot = bank
                .enroll(*token, &features)
                .with_context(|| format!("enroll {}", clip.display()))?;
            info!(token = token.name(), clip = %clip.display(), slot, frames, "template enrolled");
        }
    }

    let covered = bank.enrolled_tokens();
    let missing: Vec<&str> = Token::ALL
        .iter()
        .filter(|t| bank.templates(**t).is_empty())
        .map(|t| t.name())
        .collect();
    if !missing.is_empty() {
        warn!(
            covered,
            missing = missing.len(),
            "vocabulary words without templates: {}",
            missing.join(", ")
        );
    }
    if !unknown_dirs.is_empty() {
        warn!("skipped non-vocabulary directories: {}", unknown_dirs.join(", "));
    }
    if bank.is_empty() {
        bail!("no usable recordings found under {}", wavs_dir.display());
    }

    bank.save(out_path)
        .with_context(|| format!("write bank {}", out_path.display()))?;
    info!(
        tokens = covered,
        templates = bank.total_templates(),
        path = %out_path.display(),
        "template bank written"
    );
    Ok(())
}

/// Reads a WAV clip, mixes it to mono, and resamples it to the analyzer
/// rate. Accepts any rate and channel count but only 16-bit PCM.
fn load_clip(path: &Path) -> Result<Vec<i16>> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        bail!(
            "only 16-bit PCM is supported, got {:?} {} bit",
            spec.sample_format,
            spec.bits_per_sample
        );
    }

    let interleaved: Vec<i16> = reader.samples::<i16>().collect::<Result<Vec<_>, _>>()?;
    let channels = spec.channels.max(1) as usize;
    let mono: Vec<i16> = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect()
    };

    if spec.sample_rate == SAMPLE_RATE_HZ {
        return Ok(mono);
    }
    debug!(
        from = spec.sample_rate,
        to = SAMPLE_RATE_HZ,
        "resampling clip"
    );
    let mut resampler = StreamResampler::new(spec.sample_rate, SAMPLE_RATE_HZ);
    let mut out = resampler.process(&mono);
    // Flush the sinc tail with silence so short clips keep their ending.
    out.extend(resampler.process(&vec![0i16; 4096]));
    Ok(out)
}

/// Cuts a clip down to its spoken region on the analyzer's frame grid.
///
/// A frame is voiced when its RMS clears an adaptive gate and it has some
/// zero-crossing activity. Clips where the gate finds nothing usable get a
/// fixed window around the clip center instead of failing outright.
fn trim_to_speech(samples: &[i16]) -> &[i16] {
    let frame = FRAME_SIZE_SAMPLES;
    let hop = HOP_SIZE_SAMPLES;
    if samples.len() < frame {
        return samples;
    }

    let mut rms = Vec::new();
    let mut crossings = Vec::new();
    let mut start = 0;
    while start + frame <= samples.len() {
        let window = &samples[start..start + frame];
        let energy: f64 = window.iter().map(|&s| s as f64 * s as f64).sum();
        rms.push((energy / frame as f64).sqrt() as f32);
        crossings.push(
            window
                .windows(2)
                .filter(|pair| (pair[0] >= 0) != (pair[1] >= 0))
                .count(),
        );
        start += hop;
    }

    let mut sorted = rms.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let median = sorted[sorted.len() / 2];
    let gate = TRIM_RMS_FLOOR.max(0.6 * median);
    let min_crossings = frame / 250;

    let voiced: Vec<usize> = rms
        .iter()
        .zip(&crossings)
        .enumerate()
        .filter(|(_, (r, c))| **r > gate && **c > min_crossings)
        .map(|(i, _)| i)
        .collect();

    if voiced.len() < TRIM_MIN_VOICED_FRAMES {
        // 0.6 s window centered on the clip.
        let half = (SAMPLE_RATE_HZ as usize) * 3 / 10;
        let mid = samples.len() / 2;
        let lo = mid.saturating_sub(half);
        let hi = (mid + half).min(samples.len());
        return &samples[lo..hi];
    }

    let first = voiced[0];
    let last = voiced[voiced.len() - 1] + TRIM_POSTROLL_FRAMES;
    let lo = first * hop;
    let hi = (last * hop + frame).min(samples.len());
    &samples[lo..hi]
}
