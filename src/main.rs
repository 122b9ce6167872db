use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use stdprop::config::HarnessConfig;
use stdprop::diagnostics::ConfigError;
use stdprop::generator::{GenConfig, Trace};
use stdprop::oracle::Verdict;
use stdprop::store::FailureStore;
use stdprop::{Harness, Registry};

const LOG_ENV: &str = "STDPROP_LOG";

#[derive(Parser)]
#[command(
    name = "stdprop",
    version,
    about = "Property checks for standard-library behavioral contracts"
)]
struct Cli {
    /// Config file (defaults to ./stdprop.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Check registered properties
    Run {
        /// Only properties whose id contains this string
        #[arg(long)]
        filter: Option<String>,
        /// Run seed (random when omitted; always reported)
        #[arg(long)]
        seed: Option<u64>,
        /// Valid examples per property
        #[arg(long)]
        examples: Option<usize>,
        /// Seconds per property
        #[arg(long)]
        timeout: Option<f64>,
        /// Worker threads per property
        #[arg(long)]
        workers: Option<usize>,
        /// Failure database directory
        #[arg(long, conflicts_with = "no_db")]
        db: Option<PathBuf>,
        /// Keep failures in memory only
        #[arg(long)]
        no_db: bool,
        #[arg(long, value_enum, default_value = "text")]
        format: Format,
    },
    /// List registered properties
    List {
        /// Also list generator tags
        #[arg(long)]
        generators: bool,
    },
    /// Re-run one property on a recorded trace
    Replay {
        /// Property id
        id: String,
        /// Trace as printed in a failure report, e.g. "[1, 2147483648]"
        #[arg(long)]
        trace: String,
    },
    /// Inspect or clear the failure database
    Db {
        /// Failure database directory
        #[arg(long, global = true)]
        db: Option<PathBuf>,
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Subcommand)]
enum DbCommands {
    /// Show stored failures per property
    List,
    /// Delete stored failures for one property, or for all
    Clear {
        /// Property id (all properties when omitted)
        id: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            if err.downcast_ref::<ConfigError>().is_some() {
                eprintln!("config error: {err:#}");
            } else {
                eprintln!("error: {err:#}");
            }
            ExitCode::from(2)
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<HarnessConfig> {
    let mut config = HarnessConfig::load(path.map(PathBuf::as_path))?;
    config.apply_env()?;
    Ok(config)
}

fn open_store(config: &HarnessConfig, db: Option<PathBuf>) -> anyhow::Result<FailureStore> {
    let Some(root) = db.or_else(|| config.database.clone()) else {
        bail!("no failure database configured");
    };
    FailureStore::open(root.clone())
        .with_context(|| format!("cannot open failure database {}", root.display()))
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = load_config(cli.config.as_ref())?;
    let registry = Registry::builtin().context("registering built-in properties")?;

    match cli.command {
        Commands::Run { filter, seed, examples, timeout, workers, db, no_db, format } => {
            config.seed = seed.or(config.seed);
            config.max_examples = examples.unwrap_or(config.max_examples);
            config.timeout_secs = timeout.unwrap_or(config.timeout_secs);
            config.workers = workers.unwrap_or(config.workers);
            if no_db {
                config.database = None;
            } else if db.is_some() {
                config.database = db;
            }
            config.validate()?;

            let selected: Vec<_> = registry.properties.matching(filter.as_deref()).collect();
            if selected.is_empty() {
                bail!("no property matches `{}`", filter.unwrap_or_default());
            }
            let harness = Harness::new(config);
            let report = harness.run(selected);
            match format {
                Format::Text => print!("{}", report.render_text()),
                Format::Json => println!("{}", report.render_json()?),
            }
            Ok(if report.has_failures() { ExitCode::FAILURE } else { ExitCode::SUCCESS })
        }
        Commands::List { generators } => {
            for p in registry.properties.iter() {
                println!("{:<34} {:<13} {}", p.id(), p.shape(), p.description());
            }
            if generators {
                println!();
                for (tag, value_type) in registry.generators.tags() {
                    println!("{tag:<34} {value_type}");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Replay { id, trace } => {
            let Some(property) = registry.properties.get(&id) else {
                bail!("unknown property `{id}`");
            };
            let trace: Trace = trace.parse().with_context(|| format!("invalid trace `{trace}`"))?;
            let outcome = property.check_trace(&trace, &GenConfig::from(&config))?;
            println!("input: {}", outcome.rendered);
            println!("trace: {}", outcome.trace);
            match outcome.verdict {
                Verdict::Hold => {
                    println!("holds");
                    Ok(ExitCode::SUCCESS)
                }
                Verdict::Reject(reason) => {
                    println!("rejected: {reason}");
                    Ok(ExitCode::SUCCESS)
                }
                Verdict::Violate(evidence) => {
                    println!("{}", evidence.kind());
                    println!("{evidence}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Db { db, command } => {
            let store = open_store(&config, db)?;
            match command {
                DbCommands::List => {
                    for entry in store.list()? {
                        println!("{} ({} stored)", entry.property, entry.failures.len());
                        for failure in &entry.failures {
                            let when = failure.recorded_at.format("%Y-%m-%d %H:%M:%S");
                            println!("    {} {} {}", when, failure.kind, failure.trace);
                            println!("        input: {}", failure.input);
                        }
                    }
                }
                DbCommands::Clear { id: Some(id) } => {
                    if store.remove_property(&id)? {
                        println!("cleared {id}");
                    } else {
                        println!("nothing stored for {id}");
                    }
                }
                DbCommands::Clear { id: None } => {
                    println!("cleared {} properties", store.clear()?);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
