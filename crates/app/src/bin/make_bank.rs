use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

#[derive(Parser)]
#[command(name = "make-bank")]
#[command(author, version, about = "Build a template bank from recorded WAV clips")]
#[command(
    long_about = "Scans a recordings directory with one subdirectory per vocabulary word \
(wavs/five/*.wav), trims each clip to the spoken region, and writes a template bank \
the pipeline can load with --bank."
)]
struct Cli {
    /// Recordings root, one subdirectory per vocabulary word
    #[arg(long, default_value = "wavs")]
    wavs: PathBuf,

    /// Where to write the bank
    #[arg(long, default_value = "bank.json")]
    out: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    tempovox_app::make_bank::build_bank(&cli.wavs, &cli.out)
}
