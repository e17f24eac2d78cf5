//! Serial line protocol between the recognizer and the timer controller.
//!
//! One command per line: `CMD:<KIND>[,NAME:<name>][,DURATION:<seconds>]`.
//! The formatter produces the line without a trailing newline; the transport
//! appends it.

use thiserror::Error;

use crate::intent::{Intent, TimerTarget};

/// Longest timer name the controller accepts. Its name field is a
/// 16-byte buffer including the terminator.
pub const MAX_NAME_LEN: usize = 15;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("line does not start with CMD:")]
    MissingPrefix,
    #[error("unknown command kind '{0}'")]
    UnknownKind(String),
    #[error("missing required field {0}")]
    MissingField(&'static str),
    #[error("unrecognized field '{0}'")]
    UnexpectedField(String),
    #[error("invalid duration '{0}'")]
    InvalidDuration(String),
    #[error("timer name '{0}' exceeds {MAX_NAME_LEN} bytes")]
    NameTooLong(String),
}

/// Renders an intent as a protocol line.
pub fn format_command(intent: &Intent) -> String {
    match intent {
        Intent::Stop => "CMD:STOP".to_string(),
        Intent::Cancel { target: None } => "CMD:CANCEL".to_string(),
        Intent::Cancel {
            target: Some(target),
        } => format!("CMD:CANCEL,NAME:{target}"),
        Intent::Set {
            name: None,
            seconds,
        } => format!("CMD:SET,DURATION:{seconds}"),
        Intent::Set {
            name: Some(name),
            seconds,
        } => format!("CMD:SET,NAME:{name},DURATION:{seconds}"),
        Intent::Adjust { target, seconds } => {
            format!(
                "CMD:{},NAME:{target},DURATION:{}",
                if *seconds >= 0 { "ADD" } else { "MINUS" },
                seconds.unsigned_abs()
            )
        }
    }
}

/// Parses a protocol line back into an intent.
///
/// Used by the loopback tests and the diagnostics console; the embedded
/// controller has its own parser for the same grammar.
pub fn parse_command(line: &str) -> Result<Intent, WireError> {
    let body = line
        .trim_end_matches(['\r', '\n'])
        .strip_prefix("CMD:")
        .ok_or(WireError::MissingPrefix)?;

    let mut fields = body.split(',');
    let kind = fields.next().unwrap_or_default();

    let mut name: Option<String> = None;
    let mut duration: Option<u64> = None;
    for field in fields {
        if let Some(value) = field.strip_prefix("NAME:") {
            if value.len() > MAX_NAME_LEN {
                return Err(WireError::NameTooLong(value.to_string()));
            }
            name = Some(value.to_string());
        } else if let Some(value) = field.strip_prefix("DURATION:") {
            let parsed = value
                .parse::<u64>()
                .map_err(|_| WireError::InvalidDuration(value.to_string()))?;
            duration = Some(parsed);
        } else {
            return Err(WireError::UnexpectedField(field.to_string()));
        }
    }

    match kind {
        "STOP" => Ok(Intent::Stop),
        "CANCEL" => Ok(Intent::Cancel {
            target: name.map(parse_target),
        }),
        "SET" => {
            let seconds = duration.ok_or(WireError::MissingField("DURATION"))?;
            let seconds =
                u32::try_from(seconds).map_err(|_| WireError::InvalidDuration(seconds.to_string()))?;
            Ok(Intent::Set { name, seconds })
        }
        "ADD" | "MINUS" => {
            let target = name.map(parse_target).ok_or(WireError::MissingField("NAME"))?;
            let magnitude = duration.ok_or(WireError::MissingField("DURATION"))? as i64;
            let seconds = if kind == "ADD" { magnitude } else { -magnitude };
            Ok(Intent::Adjust { target, seconds })
        }
        other => Err(WireError::UnknownKind(other.to_string())),
    }
}

/// An all-digit name is a positional index, anything else a display name.
fn parse_target(value: String) -> TimerTarget {
    match value.parse::<u8>() {
        Ok(index) => TimerTarget::Index(index),
        Err(_) => TimerTarget::Name(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_are_byte_exact() {
        assert_eq!(format_command(&Intent::Stop), "CMD:STOP");
        assert_eq!(
            format_command(&Intent::Cancel { target: None }),
            "CMD:CANCEL"
        );
        assert_eq!(
            format_command(&Intent::Cancel {
                target: Some(TimerTarget::Name("Baking".into()))
            }),
            "CMD:CANCEL,NAME:Baking"
        );
        assert_eq!(
            format_command(&Intent::Set {
                name: Some("Baking".into()),
                seconds: 300
            }),
            "CMD:SET,NAME:Baking,DURATION:300"
        );
        assert_eq!(
            format_command(&Intent::Set {
                name: None,
                seconds: 45
            }),
            "CMD:SET,DURATION:45"
        );
        assert_eq!(
            format_command(&Intent::Adjust {
                target: TimerTarget::Index(1),
                seconds: 300
            }),
            "CMD:ADD,NAME:1,DURATION:300"
        );
        assert_eq!(
            format_command(&Intent::Adjust {
                target: TimerTarget::Name("Baking".into()),
                seconds: -1500
            }),
            "CMD:MINUS,NAME:Baking,DURATION:1500"
        );
    }

    #[test]
    fn round_trips_preserve_meaning() {
        let intents = [
            Intent::Stop,
            Intent::Cancel { target: None },
            Intent::Cancel {
                target: Some(TimerTarget::Index(2)),
            },
            Intent::Set {
                name: Some("Homework".into()),
                seconds: 1800,
            },
            Intent::Adjust {
                target: TimerTarget::Name("Workout".into()),
                seconds: -60,
            },
        ];
        for intent in intents {
            let line = format_command(&intent);
            assert_eq!(parse_command(&line), Ok(intent), "line {line}");
        }
    }

    #[test]
    fn parse_accepts_trailing_newline() {
        assert_eq!(parse_command("CMD:STOP\n"), Ok(Intent::Stop));
        assert_eq!(parse_command("CMD:STOP\r\n"), Ok(Intent::Stop));
    }

    #[test]
    fn parse_rejects_malformed_lines() {
        assert_eq!(parse_command("STOP"), Err(WireError::MissingPrefix));
        assert_eq!(
            parse_command("CMD:RESTART"),
            Err(WireError::UnknownKind("RESTART".into()))
        );
        assert_eq!(
            parse_command("CMD:SET,NAME:Baking"),
            Err(WireError::MissingField("DURATION"))
        );
        assert_eq!(
            parse_command("CMD:ADD,DURATION:60"),
            Err(WireError::MissingField("NAME"))
        );
        assert_eq!(
            parse_command("CMD:SET,DURATION:abc"),
            Err(WireError::InvalidDuration("abc".into()))
        );
        assert_eq!(
            parse_command("CMD:STOP,VOLUME:11"),
            Err(WireError::UnexpectedField("VOLUME:11".into()))
        );
        assert!(matches!(
            parse_command("CMD:CANCEL,NAME:AbsurdlyLongTimerName"),
            Err(WireError::NameTooLong(_))
        ));
    }

    #[test]
    fn numeric_names_parse_as_indices() {
        assert_eq!(
            parse_command("CMD:CANCEL,NAME:3"),
            Ok(Intent::Cancel {
                target: Some(TimerTarget::Index(3))
            })
        );
        assert_eq!(
            parse_command("CMD:MINUS,NAME:Baking,DURATION:120"),
            Ok(Intent::Adjust {
                target: TimerTarget::Name("Baking".into()),
                seconds: -120
            })
        );
    }
}
