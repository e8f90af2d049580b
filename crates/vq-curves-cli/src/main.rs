//! vq-curves CLI - video-quality curve ingestion and publishing

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod net;

/// Build, merge and publish bitrate/quality curve snapshots.
#[derive(Parser)]
#[command(name = "vq-curves")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Retrieval flags shared by the ingestion tools.
#[derive(clap::Args, Debug, Clone)]
pub struct FetchArgs {
    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30, env = "VQ_CURVES_TIMEOUT")]
    timeout: u64,

    /// Concurrent fetches
    #[arg(long, default_value_t = 8, env = "VQ_CURVES_WORKERS")]
    workers: usize,

    /// Attempts per source, including the first
    #[arg(long, default_value_t = 3, env = "VQ_CURVES_RETRIES")]
    retries: u32,
}

/// Curve and snapshot flags shared by the ingestion tools.
#[derive(clap::Args, Debug, Clone)]
pub struct SnapshotArgs {
    /// Homepage of the dataset, recorded as provenance
    #[arg(long)]
    homepage: String,

    /// Dataset title
    #[arg(long)]
    title: Option<String>,

    /// Compatibility set tag to emit (repeatable)
    #[arg(
        long = "set",
        env = "VQ_CURVES_SETS",
        value_delimiter = ',',
        value_parser = clap::value_parser!(u8).range(1..=2)
    )]
    sets: Vec<u8>,

    /// Minimum distinct bitrates for a curve to be kept
    #[arg(long, env = "VQ_CURVES_MIN_POINTS")]
    min_points: Option<usize>,

    /// Center statistic for repeated measurements (median, mean)
    #[arg(long, env = "VQ_CURVES_CENTER")]
    center: Option<String>,

    /// Output snapshot file (must not exist)
    #[arg(short, long)]
    output: PathBuf,

    /// Pretty-print JSON
    #[arg(long)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build population curves from per-test CSV exports
    IngestCsv {
        /// Input CSV files or URLs
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<String>,

        /// Quality metric to read (vmaf, ssim)
        #[arg(long, default_value = "vmaf", env = "VQ_CURVES_METRIC")]
        metric: String,

        /// Codec column name
        #[arg(long)]
        codec_col: Option<String>,

        /// Bitrate column name
        #[arg(long)]
        bitrate_col: Option<String>,

        /// Metric value column name
        #[arg(long)]
        value_col: Option<String>,

        /// Multiplier turning the bitrate column into kbps
        #[arg(long, default_value_t = 1.0)]
        bitrate_scale: f64,

        #[command(flatten)]
        snapshot: SnapshotArgs,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Build per-clip curves from a VMAF report index
    IngestVmaf {
        /// Index CSV file or URL
        #[arg(long)]
        index: String,

        /// Quality metric to read (vmaf, ssim)
        #[arg(long, default_value = "vmaf", env = "VQ_CURVES_METRIC")]
        metric: String,

        #[command(flatten)]
        snapshot: SnapshotArgs,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Merge snapshots into one document
    Merge {
        /// Input snapshot files, in priority order
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Output file (must not exist)
        #[arg(short, long)]
        output: PathBuf,

        /// Pretty-print JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Replace a published artifact, keeping a recovery copy
    Publish {
        /// Newly built snapshot
        #[arg(long)]
        snapshot: PathBuf,

        /// Published artifact to replace
        #[arg(long)]
        target: PathBuf,

        /// Recovery root (default: .recovery next to the target)
        #[arg(long, env = "VQ_CURVES_RECOVERY_DIR")]
        recovery_dir: Option<PathBuf>,

        /// Reason recorded in the manifest
        #[arg(long)]
        reason: Option<String>,

        /// Trigger identity recorded in the manifest
        #[arg(long, env = "VQ_CURVES_TRIGGER")]
        trigger: Option<String>,
    },

    /// Show statistics for a snapshot
    Inspect {
        /// Snapshot file
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "vq_curves=debug,vq_curves_cli=debug"
    } else {
        "vq_curves=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::IngestCsv {
            input,
            metric,
            codec_col,
            bitrate_col,
            value_col,
            bitrate_scale,
            snapshot,
            fetch,
        } => {
            let columns = commands::ingest_csv::Columns {
                codec: codec_col,
                bitrate: bitrate_col,
                value: value_col,
                bitrate_scale,
            };
            commands::ingest_csv::run(&input, &metric, columns, &snapshot, &fetch)
        }
        Commands::IngestVmaf { index, metric, snapshot, fetch } => {
            commands::ingest_vmaf::run(&index, &metric, &snapshot, &fetch)
        }
        Commands::Merge { input, output, pretty } => commands::merge::run(&input, &output, pretty),
        Commands::Publish {
            snapshot,
            target,
            recovery_dir,
            reason,
            trigger,
        } => commands::publish::run(&snapshot, target, recovery_dir, reason, trigger),
        Commands::Inspect { input } => commands::inspect::run(&input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingest_with_set(set: &str) -> Result<Cli, clap::Error> {
        Cli::try_parse_from([
            "vq-curves",
            "ingest-csv",
            "--input",
            "export.csv",
            "--homepage",
            "https://example.org",
            "--output",
            "out.json",
            "--set",
            set,
        ])
    }

    #[test]
    fn test_set_flag_accepts_known_tags() {
        assert!(ingest_with_set("1").is_ok());
        assert!(ingest_with_set("2").is_ok());
        assert!(ingest_with_set("1,2").is_ok());
    }

    #[test]
    fn test_set_flag_rejects_unknown_tags() {
        assert!(ingest_with_set("0").is_err());
        assert!(ingest_with_set("3").is_err());
        assert!(ingest_with_set("7").is_err());
    }
}
