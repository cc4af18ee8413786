//! haprender - render scripted haps to a WAV file.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use haprender_core::{BankTable, RenderConfig, Renderer, ScriptedHaps};

#[derive(Parser)]
#[command(name = "haprender")]
#[command(author, version, about = "Offline hap renderer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render an event list to a 16-bit stereo WAV file
    Render(RenderArgs),

    /// List the sample banks in a directory
    Banks(BanksArgs),
}

#[derive(Args)]
struct RenderArgs {
    /// JSON event list
    events: PathBuf,

    /// Output WAV file
    #[arg(short, long, default_value = "output.wav")]
    output: PathBuf,

    /// Sample directory (one subdirectory per bank)
    #[arg(long)]
    samples: Option<PathBuf>,

    /// Number of cycles to render
    #[arg(long)]
    cycles: Option<f64>,

    /// Tempo in cycles per second
    #[arg(long, conflicts_with = "cpm")]
    cps: Option<f64>,

    /// Tempo in cycles per minute
    #[arg(long)]
    cpm: Option<f64>,

    /// Cycles per render window
    #[arg(long)]
    chunk: Option<f64>,

    /// Output sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// JSON render config; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct BanksArgs {
    /// Sample directory
    dir: PathBuf,

    /// Root-note manifest file name
    #[arg(long, default_value = haprender_core::dsp::bank::DEFAULT_MANIFEST)]
    manifest: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Render(args) => render(args),
        Commands::Banks(args) => banks(args),
    }
}

fn render(args: RenderArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };
    let haps = ScriptedHaps::load(&args.events)?;

    // Event-list tempo and length sit between the config file and the flags.
    if let Some(cps) = haps.cps {
        config.cps = cps;
    }
    if let Some(cycles) = haps.cycles {
        config.total_cycles = cycles;
    }
    if let Some(cps) = args.cps {
        config.cps = cps;
    }
    if let Some(cpm) = args.cpm {
        config = config.with_cpm(cpm);
    }
    if let Some(cycles) = args.cycles {
        config.total_cycles = cycles;
    }
    if let Some(chunk) = args.chunk {
        config.chunk_cycles = chunk;
    }
    if let Some(rate) = args.sample_rate {
        config.sample_rate = rate;
    }

    let banks = match &args.samples {
        Some(dir) => BankTable::load_with_manifest(dir, &config.manifest_name)
            .with_context(|| format!("loading samples from {}", dir.display()))?,
        None => BankTable::new(),
    };

    let mut renderer = Renderer::new(banks, config)?;
    let stats = renderer
        .render_to_file(&haps, &args.output)
        .with_context(|| format!("rendering {}", args.events.display()))?;

    println!(
        "{}: {} haps scheduled, {:.2}s, peak {:.1} dBFS before normalization",
        args.output.display(),
        stats.scheduled,
        stats.frames as f64 / renderer.config().sample_rate as f64,
        stats.raw_peak_db().unwrap_or(f32::NEG_INFINITY)
    );
    Ok(())
}

fn banks(args: BanksArgs) -> anyhow::Result<()> {
    let table = BankTable::load_with_manifest(&args.dir, &args.manifest)?;
    if table.is_empty() {
        println!("No sample banks in {}", args.dir.display());
        return Ok(());
    }

    println!("{:<24} {:>7} {:>6}", "BANK", "SAMPLES", "ROOT");
    for name in table.names() {
        let loaded = table.get(name).map_or(0, |b| b.loaded());
        println!("{:<24} {:>7} {:>6}", name, loaded, table.root_note(name));
    }
    Ok(())
}
