mod config;
mod headless;
mod led;
mod logging;
mod ui;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use crate::config::{ChannelId, PanelConfig, load_panel_config};
use crate::led::output::{OutputKind, select_output};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliOutput {
    Auto,
    Simulated,
    Hardware,
}

impl From<CliOutput> for OutputKind {
    fn from(value: CliOutput) -> Self {
        match value {
            CliOutput::Auto => OutputKind::Auto,
            CliOutput::Simulated => OutputKind::Simulated,
            CliOutput::Hardware => OutputKind::Hardware,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "ledpanel",
    version,
    about = "Desktop form for timed LED activations"
)]
struct Cli {
    /// JSON file overriding the built-in form configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = CliOutput::Auto)]
    output: CliOutput,

    /// Activate one channel without opening the window.
    #[arg(long, value_enum)]
    fire: Option<ChannelId>,

    #[arg(long, default_value = "1.0", allow_hyphen_values = true)]
    duration: String,

    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u8).range(0..=100))]
    brightness: u8,

    #[arg(long)]
    verbose: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose)?;

    let config = match &cli.config {
        Some(path) => load_panel_config(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => PanelConfig::default(),
    };
    let selected = select_output(cli.output.into())?;

    match cli.fire {
        Some(channel) => {
            headless::fire_once(&config, selected, channel, &cli.duration, cli.brightness)
        }
        None => ui::app::run_gui(config, selected),
    }
}
