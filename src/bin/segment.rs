use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use log::{error, info};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use reward_tiers::{FeatureBuilder, Result, SegmentationConfig, Segmenter, WeeklyRecord};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Segment users into reward tiers from weekly activity"
)]
struct Cli {
    /// JSON array of weekly activity records
    #[arg(long)]
    input: PathBuf,

    /// Where to write the per-user tiers
    #[arg(long)]
    users_out: PathBuf,

    /// Where to write the per-tier summary
    #[arg(long)]
    summary_out: PathBuf,

    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Largest cluster count tried by the elbow search
    #[arg(long)]
    max_k: Option<usize>,

    #[arg(long)]
    max_iterations: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Drop users whose mean weekly theo is below this
    #[arg(long)]
    min_avg_theo: Option<f64>,
}

impl Cli {
    fn segmentation_config(&self) -> Result<SegmentationConfig> {
        let mut config = match &self.config {
            Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
            None => SegmentationConfig::default(),
        };
        if let Some(max_k) = self.max_k {
            config = config.with_max_k(max_k);
        }
        if let Some(max_iterations) = self.max_iterations {
            config = config.with_max_iterations(max_iterations);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(min_avg_theo) = self.min_avg_theo {
            config = config.with_min_avg_theo_win(min_avg_theo);
        }
        config.validate()?;
        Ok(config)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.segmentation_config()?;

    info!("Loading data from {}", cli.input.display());
    let records: Vec<WeeklyRecord> = serde_json::from_str(&fs::read_to_string(&cli.input)?)?;

    let profiles = FeatureBuilder::new(config.min_avg_theo_win).build(&records)?;
    let segmentation = Segmenter::new(config).run(&profiles)?;

    write_json(&cli.users_out, &segmentation.users)?;
    write_json(&cli.summary_out, &segmentation.summaries)?;

    info!(
        "Used {} clusters; wrote {} and {}",
        segmentation.k,
        cli.users_out.display(),
        cli.summary_out.display()
    );
    Ok(())
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        error!("{}", err);
        process::exit(1);
    }
}
