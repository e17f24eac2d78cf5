//! Layered application configuration.
//!
//! Defaults come from each crate's own config struct; a TOML file given
//! with `--config` overrides them. Sections and fields are all optional,
//! so a file can pin a single threshold and leave everything else alone.

use std::path::Path;

use serde::{Deserialize, Serialize};

use tempovox_foundation::AppError;
use tempovox_grammar::ParserConfig;
use tempovox_kws::KwsConfig;
use tempovox_vad::VadConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub vad: VadConfig,
    pub kws: KwsConfig,
    pub parser: ParserConfig,
}

impl AppConfig {
    /// Reads the TOML file when a path is given, pure defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("read {}: {e}", path.display())))?;
        toml::from_str(&text)
            .map_err(|e| AppError::Config(format!("parse {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_path_yields_defaults() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.kws.matcher.accept_threshold, 20.0);
        assert_eq!(config.parser.window_ms, 2200);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let text = r#"
            [vad]
            onset_frames = 3

            [kws.matcher]
            accept_threshold = 15.0

            [parser]
            scan_depth = 4
        "#;
        let config: AppConfig = toml::from_str(text).unwrap();
        assert_eq!(config.vad.onset_frames, 3);
        assert_eq!(config.vad.hangover_frames, 8);
        assert_eq!(config.kws.matcher.accept_threshold, 15.0);
        assert_eq!(config.kws.matcher.margin_min, 2.0);
        assert_eq!(config.parser.scan_depth, 4);
        assert_eq!(config.parser.window_ms, 2200);
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/tempovox.toml"))).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[vad\nonset_frames = 3").unwrap();
        let err = AppConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
