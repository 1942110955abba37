use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueHint};
use tracing::info;
use tracing_subscriber::EnvFilter;

use voxcore::{LabelConfig, PolicyKind};
use voxio::batch::{process_records, BatchSummary};
use voxio::data::handle::{write_label_rows, EventFileHandle};
use voxio::data::record::LabelRow;

type DynError = Box<dyn Error>;

#[derive(Parser)]
#[command(author, version, about = "Voxel labeling of simulated neutrino events")]
struct Cli {
    /// JSON-lines file with one event per line
    #[arg(long, value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// JSON-lines file receiving one label row per labeled event
    #[arg(long, value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// JSON labeling configuration, defaults apply to missing fields
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Group resolution policy (veto_chain, earliest_non_empty, ancestor_fraction)
    #[arg(long)]
    policy: Option<PolicyKind>,

    /// Emit the neutrino column
    #[arg(long, action = ArgAction::SetTrue)]
    nu: bool,

    /// Keep only voxels of the neutrino interaction
    #[arg(long, action = ArgAction::SetTrue)]
    nu_only: bool,

    /// Write the extended feature matrix without the cluster column
    #[arg(long, action = ArgAction::SetTrue)]
    extended: bool,

    /// Worker threads
    #[arg(long, default_value_t = 4)]
    num_threads: usize,
}

impl Cli {
    fn label_config(&self) -> Result<LabelConfig, DynError> {
        let mut config = match &self.config {
            Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
            None => LabelConfig::default(),
        };
        if let Some(policy) = self.policy {
            config.policy = policy;
        }
        config.include_nu |= self.nu || self.nu_only;
        config.nu_only |= self.nu_only;
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<(), DynError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();

    let cli = Cli::parse();
    let config = cli.label_config()?;
    info!(?config, input = %cli.input.display(), "labeling events");

    let records = EventFileHandle::open(&cli.input)?.read_events()?;
    let results = process_records(records, &config, cli.num_threads)?;

    let summary = BatchSummary::new(&results);
    let rows: Vec<LabelRow> = results
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.as_ref().ok().map(|labels| LabelRow::new(i, labels, cli.extended)))
        .collect();
    write_label_rows(&cli.output, &rows)?;

    summary.log();
    Ok(())
}
