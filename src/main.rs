use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use sched_sim::{
    Metrics, Sim, SimConfig, Workload,
    scheduler::{DEFAULT_QUANTUM, Scheduler, standard_policies},
    sim::{GeneratorConfig, generate},
};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Policy {
    Fcfs,
    Sjf,
    Rr,
    Priority,
    All,
}

impl Policy {
    fn name(self) -> Option<&'static str> {
        match self {
            Policy::Fcfs => Some("fcfs"),
            Policy::Sjf => Some("sjf"),
            Policy::Rr => Some("rr"),
            Policy::Priority => Some("priority"),
            Policy::All => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Table,
}

/// Discrete-event CPU scheduling simulator.
#[derive(Debug, Parser)]
struct Opts {
    /// Scheduling policy to run; `all` runs every policy on the same workload.
    #[clap(long, value_enum, default_value = "rr")]
    scheduler: Policy,

    /// Round robin quantum.
    #[clap(long, default_value_t = DEFAULT_QUANTUM)]
    quantum: f64,

    /// Number of cores.
    #[clap(long, default_value = "1")]
    num_cores: usize,

    /// Seed for the random workload.
    #[clap(long, default_value = "42")]
    seed: u64,

    /// Number of processes in the random workload.
    #[clap(short = 'n', long, default_value = "8")]
    n: usize,

    /// Load the workload from a JSON file instead of generating one.
    #[clap(long)]
    from_json: Option<PathBuf>,

    /// Stop before applying any event later than this time.
    #[clap(long)]
    until: Option<f64>,

    /// Print one line per applied event.
    #[clap(long, action = clap::ArgAction::SetTrue)]
    trace: bool,

    /// Output format for the results.
    #[clap(long, value_enum, default_value = "json")]
    format: Format,

    /// Enable verbose output. Specify multiple times to increase verbosity.
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Opts {
    fn schedulers(&self) -> Result<Vec<(&'static str, Box<dyn Scheduler>)>> {
        if !(self.quantum.is_finite() && self.quantum > 0.0) {
            bail!("--quantum must be positive, got {}", self.quantum);
        }
        let wanted = self.scheduler.name();
        Ok(standard_policies(self.quantum)
            .into_iter()
            .filter(|(name, _)| wanted.is_none_or(|w| w == *name))
            .collect())
    }

    fn workload(&self) -> Result<Workload> {
        match &self.from_json {
            Some(path) => Workload::load(path)
                .with_context(|| format!("Failed to load workload from {}", path.display())),
            None => {
                let config = GeneratorConfig {
                    count: self.n,
                    ..GeneratorConfig::default()
                };
                Ok(generate(&config, self.seed))
            }
        }
    }
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    let llv = match opts.verbose {
        0 => simplelog::LevelFilter::Info,
        1 => simplelog::LevelFilter::Debug,
        _ => simplelog::LevelFilter::Trace,
    };
    let mut lcfg = simplelog::ConfigBuilder::new();
    lcfg.set_time_level(simplelog::LevelFilter::Error)
        .set_location_level(simplelog::LevelFilter::Off)
        .set_target_level(simplelog::LevelFilter::Off)
        .set_thread_level(simplelog::LevelFilter::Off);
    simplelog::TermLogger::init(
        llv,
        lcfg.build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let schedulers = opts.schedulers()?;
    let workload = opts.workload()?;
    let config = SimConfig {
        num_cores: opts.num_cores,
        trace: opts.trace,
    };
    let compare = schedulers.len() > 1;

    let mut results = BTreeMap::new();
    for (name, mut scheduler) in schedulers {
        let mut sim = Sim::new(workload.clone(), config).context("Invalid workload")?;
        log::info!("running {name}");
        let metrics = sim.run(&mut scheduler, opts.until);

        if compare && !sim.trace().is_empty() {
            println!("# {name}");
        }
        for record in sim.trace() {
            println!("{record}");
        }
        results.insert(name, metrics);
    }

    match (opts.format, compare) {
        (Format::Json, false) => {
            let metrics = results.values().next();
            let json =
                serde_json::to_string_pretty(&metrics).context("Failed to serialize results")?;
            println!("{json}");
        }
        (Format::Json, true) => {
            let json =
                serde_json::to_string_pretty(&results).context("Failed to serialize results")?;
            println!("{json}");
        }
        (Format::Table, false) => {
            for metrics in results.values() {
                println!("{metrics}");
            }
        }
        (Format::Table, true) => {
            for (name, metrics) in &results {
                println!("== {name} ==\n{metrics}\n");
            }
            print_comparison(&results);
        }
    }

    Ok(())
}

fn print_comparison(results: &BTreeMap<&str, Metrics>) {
    let cell = |v: Option<f64>| v.map_or_else(|| "-".to_owned(), |v| format!("{v:.3}"));
    println!("POLICY\tTAT\tWAIT\tRESP\tTHRU\tDONE");
    for (name, m) in results {
        println!(
            "{name}\t{}\t{}\t{}\t{:.4}\t{}",
            cell(m.avg_turnaround),
            cell(m.avg_waiting),
            cell(m.avg_response),
            m.throughput,
            m.completed
        );
    }
}
