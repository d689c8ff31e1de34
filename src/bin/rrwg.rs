//! `rrwg` command-line entrypoint.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use rrwg::{Config, DataFormat, StepObserver, TraceLog, VisitTable, DEFAULT_CONFIG_FILE, MAX_SEED};

#[derive(Parser, Debug)]
#[command(name = "rrwg")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Repelling vertex-reinforced random walks on graphs")]
#[command(long_about = r#"
Simulates several walkers moving in lock-step over a graph, each one
attracted to the vertices the other walkers have visited less.

The run is described by a TOML configuration file:

  [default]
  type = "complete"        # or "partitions", or "file" with input = "<layout>"
  vertices = 3
  time = 1000              # number of steps
  function = "EXP"         # EXP or POW (partitions always use POW)
  alpha = 1.0
  epsilon = 0.0
  # partition_size = 2     # required for type = "partitions"
  # seed = 42

Writes <output>.dat (one row of visit shares per step) and, unless
disabled, <output>.log (a trace of every decision).
"#)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the random seed
    #[arg(long, value_parser = clap::value_parser!(u64).range(..=MAX_SEED))]
    seed: Option<u64>,

    /// Override the number of steps ("time")
    #[arg(short = 'n', long)]
    steps: Option<usize>,

    /// Override the output file prefix
    #[arg(short, long)]
    output: Option<String>,

    /// Override the table cell format
    #[arg(long, value_enum)]
    data: Option<DataArg>,

    /// Do not write the per-step trace log
    #[arg(long)]
    no_trace: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log level
    #[arg(short, long, env = "RRWG_LOG")]
    #[arg(value_enum, default_value = "warn")]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DataArg {
    Normalized,
    Raw,
    Share,
}

impl From<DataArg> for DataFormat {
    fn from(arg: DataArg) -> Self {
        match arg {
            DataArg::Normalized => DataFormat::Normalized,
            DataArg::Raw => DataFormat::Raw,
            DataArg::Share => DataFormat::Share,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::from(cli.log_level))
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load(&cli.config).with_context(|| {
        format!(
            "failed to load {} (see --help for an example configuration)",
            cli.config.display()
        )
    })?;
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if let Some(steps) = cli.steps {
        config.time = steps;
    }
    if let Some(output) = cli.output {
        config.output = output;
    }
    if let Some(data) = cli.data {
        config.data = data.into();
    }
    if cli.no_trace {
        config.trace = false;
    }

    if cli.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let model = rrwg::build(&config)?;

    let dat_path = format!("{}.dat", config.output);
    let log_path = format!("{}.log", config.output);

    let table = VisitTable::new(
        BufWriter::new(File::create(&dat_path).with_context(|| format!("creating {dat_path}"))?),
        config.data,
    );
    let mut observer: Box<dyn StepObserver> = if config.trace {
        let log = TraceLog::new(BufWriter::new(
            File::create(&log_path).with_context(|| format!("creating {log_path}"))?,
        ));
        Box::new((table, log))
    } else {
        Box::new(table)
    };

    let mut sim = model.simulator();
    let outcome = sim.run(config.time, observer.as_mut());

    eprintln!("* Wrote {dat_path}");
    if config.trace {
        eprintln!("* Wrote {log_path}");
    }
    outcome.with_context(|| format!("simulation aborted at step {}", sim.time() + 1))?;

    eprintln!(
        "RRWG({}): |W|={}, |V|={}, function={}, alpha={}, epsilon={}, seed={}, steps={}",
        env!("CARGO_PKG_VERSION"),
        sim.walks().len(),
        model.graph.order(),
        config.law(),
        config.alpha,
        config.epsilon,
        model.seed,
        sim.time(),
    );
    Ok(())
}
