//! textcode - write compiled wordcode as a container that is valid UTF-8 text.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use textcode_transcoder::write_container;
use tracing::info;
use tracing_subscriber::filter::EnvFilter;

mod config;
mod frontend;

use frontend::{FrontEnd, JsonFrontEnd, Mode};

#[derive(Parser, Debug)]
#[command(
    name = "textcode",
    version,
    about = "Write compiled code as a container that decodes as UTF-8 text",
    long_about = "Reads a code value produced by a front-end compiler (as JSON), rewrites its \
                  wordcode so every byte is valid UTF-8 and writes a .pyc-style container.\n\n\
                  Example:  textcode module.json module.pyc"
)]
struct Cli {
    /// Source file name recorded in the output (defaults to the input's absolute path)
    #[arg(long)]
    filename: Option<String>,

    /// Compile mode
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Verbose output; repeat for more detail
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Write even if UTF-8 cannot be fully achieved
    #[arg(short, long)]
    force: bool,

    /// Write empty position tables
    #[arg(long)]
    no_lnotab: bool,

    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input file
    infile: PathBuf,

    /// Output container
    outfile: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level(cli.verbose).parse()?))
        .init();

    run(cli)
}

fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = config::load_config(cli.config.as_deref())?;

    let mut options = config.output.options()?.verbosity(cli.verbose);
    if cli.force {
        options = options.force(true);
    }
    if cli.no_lnotab {
        options = options.line_table(false);
    }
    let mode = cli.mode.unwrap_or(config.compile.mode);

    let source = std::fs::read_to_string(&cli.infile)
        .with_context(|| format!("failed to read {}", cli.infile.display()))?;
    let filename = match cli.filename {
        Some(name) => name,
        None => std::path::absolute(&cli.infile)?.display().to_string(),
    };

    let code = JsonFrontEnd.compile(&source, &filename, mode)?;
    write_container(&code, &cli.outfile, &options)
        .with_context(|| format!("failed to write {}", cli.outfile.display()))?;

    info!(outfile = %cli.outfile.display(), "container written");
    Ok(())
}
