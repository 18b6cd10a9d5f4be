//! dbroute command-line tool.
//!
//! Routes keys and inspects consistent-hash rings without a running
//! service. Useful to check where a key lives before touching data, and to
//! preview how much data a shard removal would move.
//!
//! # Usage
//!
//! ```bash
//! # Where does a key live?
//! dbroute --db-count 2 --tb-count 4 route --key user:1001
//!
//! # Same, with the shard layout from a config file
//! dbroute --config dbroute.toml route --key user:1001
//!
//! # Key distribution across shards
//! dbroute --db-count 4 --tb-count 16 inspect --samples 100000
//!
//! # Preview the keys that move when shard 1_3 is removed
//! dbroute --db-count 2 --tb-count 4 churn --remove 1_3
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::cast_precision_loss)] // f64 precision loss acceptable in report stats

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use dbroute_core::{HashAlgorithm, RouterConfig};
use dbroute_routing::{HashRing, RoutingContext, RoutingStrategy, Shard};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Hash function selectable on the command line.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum HashArg {
    /// Upper 32 bits of xxh3-64.
    #[default]
    Xxh3,
    /// 32-bit FNV-1a with avalanche mix.
    Fnv1,
}

impl From<HashArg> for HashAlgorithm {
    fn from(arg: HashArg) -> Self {
        match arg {
            HashArg::Xxh3 => Self::Xxh3,
            HashArg::Fnv1 => Self::Fnv1,
        }
    }
}

/// dbroute shard routing tool.
#[derive(Parser, Debug)]
#[command(name = "dbroute")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file. Overrides the layout flags below.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of databases.
    #[arg(long, default_value = "1")]
    db_count: u32,

    /// Number of tables per database.
    #[arg(long, default_value = "1")]
    tb_count: u32,

    /// Virtual nodes per shard.
    #[arg(long, default_value = "100")]
    virtual_nodes: u32,

    /// Hash function.
    #[arg(long, value_enum, default_value = "xxh3")]
    hash: HashArg,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

/// Tool command.
#[derive(Subcommand, Debug)]
enum Command {
    /// Print the shard a key routes to.
    Route {
        /// Routing key.
        #[arg(long)]
        key: String,
    },

    /// Print how sample keys spread over the shards.
    Inspect {
        /// Number of sample keys (`key-0`, `key-1`, ...).
        #[arg(long, default_value = "10000")]
        samples: u32,
    },

    /// Remove a shard and report which sample keys move.
    Churn {
        /// Number of sample keys (`key-0`, `key-1`, ...).
        #[arg(long, default_value = "10000")]
        samples: u32,

        /// Shard to remove, as `<db>_<tb>`.
        #[arg(long)]
        remove: Shard,
    },
}

impl Args {
    /// Resolves the router configuration from the file or the flags.
    fn router_config(&self) -> Result<RouterConfig, dbroute_core::ConfigError> {
        if let Some(path) = &self.config {
            return RouterConfig::from_file(path);
        }
        let config = RouterConfig::new(self.db_count, self.tb_count)
            .with_virtual_nodes(self.virtual_nodes)
            .with_hash(self.hash.into());
        config.validate()?;
        Ok(config)
    }
}

/// Churn report for one shard removal.
#[derive(Debug, Default)]
struct ChurnReport {
    /// Keys whose shard changed.
    moved: u32,
    /// Keys that moved although they were not on the removed shard.
    moved_elsewhere: u32,
    /// Moved keys that did not land on their clockwise successor.
    misplaced: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Log to stderr so command output on stdout stays parseable.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = args.router_config()?;
    info!(
        db_count = config.db_count,
        tb_count = config.tb_count,
        virtual_nodes = config.virtual_nodes,
        hash = ?config.hash,
        "loaded router configuration"
    );

    match args.command {
        Command::Route { key } => run_route(config, &key)?,
        Command::Inspect { samples } => run_inspect(&config, samples)?,
        Command::Churn { samples, remove } => run_churn(&config, samples, remove)?,
    }

    Ok(())
}

fn run_route(config: RouterConfig, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let strategy = RoutingStrategy::new(config)?;
    let mut ctx = RoutingContext::new();
    let shard = strategy.route_into(key, &mut ctx)?;

    println!("key:   {key}");
    println!("shard: {shard}");
    println!("db:    {}", ctx.db_key().unwrap_or_default());
    println!("tb:    {}", ctx.tb_key().unwrap_or_default());
    Ok(())
}

fn sample_keys(samples: u32) -> impl Iterator<Item = String> {
    (0..samples).map(|i| format!("key-{i}"))
}

fn run_inspect(config: &RouterConfig, samples: u32) -> Result<(), Box<dyn std::error::Error>> {
    let ring = HashRing::from_config(config)?;
    let counts = ring.distribution(sample_keys(samples));
    let mean = f64::from(samples) / counts.len() as f64;

    println!("shards: {}  entries: {}  samples: {samples}", ring.shard_count(), ring.len());
    println!("{:<8} {:>10} {:>8}", "shard", "keys", "vs mean");
    for (shard, count) in &counts {
        let ratio = if mean > 0.0 { *count as f64 / mean } else { 0.0 };
        println!("{:<8} {count:>10} {ratio:>8.3}", shard.name());
    }

    let min = counts.values().min().copied().unwrap_or_default();
    let max = counts.values().max().copied().unwrap_or_default();
    println!("min: {min}  max: {max}  mean: {mean:.1}");
    Ok(())
}

fn run_churn(
    config: &RouterConfig,
    samples: u32,
    removed: Shard,
) -> Result<(), Box<dyn std::error::Error>> {
    let before = HashRing::from_config(config)?;
    let mut after = before.clone();
    after.remove_shard(removed)?;

    let mut report = ChurnReport::default();
    for key in sample_keys(samples) {
        let hash = before.hash_key(&key);
        let old = before.resolve_hash(hash);
        let new = after.resolve_hash(hash);
        if old == new {
            continue;
        }

        report.moved += 1;
        if old != Some(removed) {
            report.moved_elsewhere += 1;
        } else if new != before.successor_excluding(hash, removed) {
            report.misplaced += 1;
        }
    }

    let moved_pct = if samples > 0 {
        f64::from(report.moved) * 100.0 / f64::from(samples)
    } else {
        0.0
    };
    println!("removed:          {removed}");
    println!("moved:            {} of {samples} ({moved_pct:.2}%)", report.moved);
    println!("moved elsewhere:  {}", report.moved_elsewhere);
    println!("misplaced:        {}", report.misplaced);

    if report.moved_elsewhere > 0 || report.misplaced > 0 {
        return Err(format!("unexpected churn: {report:?}").into());
    }
    Ok(())
}
