//! mt-transcode CLI
//!
//! Convert index traces into Masstree loader input.

use anyhow::{Context, Result};
use clap::Parser;
use mt_transcode::{OutputConfig, Transcoder};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "mt-transcode")]
#[command(version)]
#[command(about = "Convert index operation traces into Masstree benchmark input")]
struct Cli {
    /// Trace files, or directories of trace files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory to write converted traces to
    #[arg(short = 'o', long, default_value = mt_transcode::config::DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Prefix for converted file names
    #[arg(long, default_value = mt_transcode::config::DEFAULT_FILE_PREFIX)]
    prefix: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = OutputConfig::new(cli.output_dir, cli.prefix);

    for input in &cli.inputs {
        if input.is_dir() {
            transcode_directory(&config, input, cli.verbose)?;
        } else {
            let output = config.output_path(input)?;
            transcode_one(input, &output, cli.verbose)?;
        }
    }

    Ok(())
}

fn transcode_one(input: &Path, output: &Path, verbose: bool) -> Result<()> {
    // Counters are per trace file
    let mut transcoder = Transcoder::new();
    let stats = transcoder.transcode_file(input, output)?;

    if verbose {
        println!(
            "Converted: {} -> {} ({} records, {} errors, {} notes)",
            input.display(),
            output.display(),
            stats.records,
            stats.errors,
            stats.notes
        );
    }

    Ok(())
}

fn transcode_directory(config: &OutputConfig, dir: &Path, verbose: bool) -> Result<()> {
    let mut entries = walkdir::WalkDir::new(dir)
        .into_iter()
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;
    entries.retain(|e| e.file_type().is_file());
    entries.sort_by(|a, b| a.path().cmp(b.path()));

    // Same-named traces in different subdirectories keep distinct outputs
    for entry in entries {
        let output = config.output_path_under(dir, entry.path())?;
        transcode_one(entry.path(), &output, verbose)?;
    }

    Ok(())
}
