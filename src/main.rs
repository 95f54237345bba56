use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use starnet_select::export::write_selected_csv;
use starnet_select::{StarSelector, SurveyConfig, loader};

/// Select the stars of a survey file that pass the quality cuts.
#[derive(Parser, Debug)]
#[command(name = "starnet-select", version, about)]
struct Cli {
    /// Survey file (.parquet, .json or .csv); relative paths are read from the data directory
    file: PathBuf,

    /// Keep only stars with a combined S/N at or above the configured minimum
    #[arg(long)]
    high_snr: bool,

    /// JSON config overriding the data directory and cut thresholds
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Write the selected stars to this CSV file
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SurveyConfig::from_json_file(path)?,
        None => SurveyConfig::default(),
    };
    let path = config.resolve(&cli.file);
    log::debug!("data directory {}", config.data_dir().display());

    let source = loader::load_file(&path)?;
    let selector = StarSelector::new(config)?;
    let bundle = selector.get(&source, cli.high_snr)?;

    println!("stars loaded:   {}", bundle.len());
    println!("distinct IDs:   {}", bundle.distinct_ids());
    println!("stars selected: {}", bundle.selected_count());

    if let Some(out) = &cli.output {
        let file = File::create(out).with_context(|| format!("creating {}", out.display()))?;
        write_selected_csv(&bundle, BufWriter::new(file))?;
        log::info!("Wrote {} stars to {}", bundle.selected_count(), out.display());
    }

    Ok(())
}
