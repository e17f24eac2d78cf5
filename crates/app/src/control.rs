//! Stdin operator console.
//!
//! One command per line: `enroll <token_index>`, `tokens`, `bank`,
//! `save-bank <path>`. Requests that touch recognizer state travel to the
//! matching stage over a bounded channel and block on the acknowledgement;
//! everything else is answered directly. Replies are human-readable lines
//! on stdout, mirrored into the trace log.

use std::fmt::Write as _;
use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tempovox_grammar::{Token, VOCABULARY_SIZE};

/// A validated console command bound for the recognizer stage.
#[derive(Debug)]
pub enum ControlRequest {
    Enroll {
        token: Token,
        reply: oneshot::Sender<String>,
    },
    BankSummary {
        reply: oneshot::Sender<String>,
    },
    SaveBank {
        path: PathBuf,
        reply: oneshot::Sender<String>,
    },
}

/// Parsed form of one console line, before reply channels are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Enroll(Token),
    Tokens,
    Bank,
    SaveBank(PathBuf),
}

/// Parses one trimmed, non-empty console line. `Err` carries the reply
/// text for rejected input; no state changes on that path.
pub fn parse_control_line(line: &str) -> Result<ControlCommand, String> {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    match command {
        "enroll" => {
            let index = parts
                .next()
                .and_then(|arg| arg.parse::<u16>().ok())
                .ok_or_else(|| "err: usage: enroll <token_index>".to_string())?;
            match Token::from_id(index) {
                Some(token) => Ok(ControlCommand::Enroll(token)),
                None => Err(format!(
                    "err: token index {index} out of range (0..{})",
                    VOCABULARY_SIZE - 1
                )),
            }
        }
        "tokens" => Ok(ControlCommand::Tokens),
        "bank" => Ok(ControlCommand::Bank),
        "save-bank" => {
            // Everything after the keyword is the path; paths may hold spaces.
            let path = line["save-bank".len()..].trim();
            if path.is_empty() {
                Err("err: usage: save-bank <path>".to_string())
            } else {
                Ok(ControlCommand::SaveBank(PathBuf::from(path)))
            }
        }
        other => Err(format!(
            "err: unknown command \"{other}\" (try enroll/tokens/bank/save-bank)"
        )),
    }
}

/// The `tokens` reply: the whole vocabulary, one `<id>  <name>` line each.
pub fn vocabulary_listing() -> String {
    let mut out = format!("ok: {VOCABULARY_SIZE} tokens");
    for token in Token::ALL {
        let _ = write!(out, "\n{:>3}  {}", token.id(), token.name());
    }
    out
}

/// Reads console lines from stdin until it closes or the recognizer goes
/// away.
pub fn spawn_stdin_control(control_tx: mpsc::Sender<ControlRequest>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        info!("operator console ready on stdin");
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("stdin closed, operator console stopping");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "stdin read failed, operator console stopping");
                    break;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let keep_going = match parse_control_line(line) {
                Err(reply) => {
                    println!("{reply}");
                    true
                }
                Ok(ControlCommand::Tokens) => {
                    println!("{}", vocabulary_listing());
                    true
                }
                Ok(ControlCommand::Enroll(token)) => {
                    round_trip(&control_tx, |reply| ControlRequest::Enroll { token, reply }).await
                }
                Ok(ControlCommand::Bank) => {
                    round_trip(&control_tx, |reply| ControlRequest::BankSummary { reply }).await
                }
                Ok(ControlCommand::SaveBank(path)) => {
                    round_trip(&control_tx, move |reply| ControlRequest::SaveBank {
                        path,
                        reply,
                    })
                    .await
                }
            };
            if !keep_going {
                break;
            }
        }
    })
}

async fn round_trip(
    control_tx: &mpsc::Sender<ControlRequest>,
    build: impl FnOnce(oneshot::Sender<String>) -> ControlRequest,
) -> bool {
    let (reply_tx, reply_rx) = oneshot::channel();
    if control_tx.send(build(reply_tx)).await.is_err() {
        warn!("recognizer gone, operator console stopping");
        return false;
    }
    match reply_rx.await {
        Ok(reply) => {
            println!("{reply}");
            true
        }
        Err(_) => {
            warn!("control request dropped without a reply");
            true
        }
    }
}
