mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mdag_core::{
    Algorithm, AnyHasher, BuildStats, ChunkerConfig, DEFAULT_BLOCK_SIZE, DEFAULT_FANOUT,
    DagBuilder, FsStore, KvStore, MemoryStore, fs_node,
};
use output::{AddOutput, AddedRoot, InitOutput, OutputWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// mdag - Merkle-DAG builder for files and directories
#[derive(Parser)]
#[command(name = "mdag")]
#[command(about = "Build content-addressed Merkle-DAGs from files and directories", long_about = None)]
#[command(version)]
struct Cli {
    /// Store root directory (defaults to MDAG_ROOT env var or ./mdag-store)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new store
    Init {
        /// Hash algorithm to use (blake3 or sha256)
        #[arg(long, default_value = "blake3")]
        algo: String,

        /// Block size in bytes
        #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
        block_size: usize,

        /// Maximum number of links per index or tree object
        #[arg(long, default_value_t = DEFAULT_FANOUT)]
        fanout: usize,
    },

    /// Build files or directories into the store
    Add {
        /// Paths to add
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Build into a throw-away in-memory store instead
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = OutputWriter::new(cli.json);

    // Store root: CLI arg > MDAG_ROOT env var > ./mdag-store default
    let root = cli
        .root
        .clone()
        .or_else(|| std::env::var("MDAG_ROOT").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("./mdag-store"));

    let result = match cli.command {
        Commands::Init {
            algo,
            block_size,
            fanout,
        } => cmd_init(&root, &algo, block_size, fanout, &output),
        Commands::Add { paths, dry_run } => cmd_add(&root, &paths, dry_run, &output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output.write_error(&e, 1);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_algorithm(algo: &str) -> Result<Algorithm> {
    match algo {
        "blake3" => Ok(Algorithm::Blake3),
        "sha256" => Ok(Algorithm::Sha256),
        other => Algorithm::parse(other).with_context(|| format!("Unsupported algorithm: {}", other)),
    }
}

fn cmd_init(
    root: &Path,
    algo: &str,
    block_size: usize,
    fanout: usize,
    output: &OutputWriter,
) -> Result<()> {
    let algorithm = parse_algorithm(algo)?;
    let config = ChunkerConfig::new(block_size, fanout)?;

    FsStore::init(root, algorithm, config)
        .with_context(|| format!("Failed to initialize store at {}", root.display()))?;

    let data = InitOutput {
        success: true,
        result_code: 0,
        root: root.display().to_string(),
        algorithm: algorithm.as_str().to_string(),
        block_size: config.block_size,
        fanout: config.fanout,
    };

    output.write(&data, || {
        format!(
            "Initialized mdag store at {}\nAlgorithm: {}\nBlock size: {}\nFan-out: {}\n",
            data.root, data.algorithm, data.block_size, data.fanout
        )
    })
}

fn cmd_add(root: &Path, paths: &[PathBuf], dry_run: bool, output: &OutputWriter) -> Result<()> {
    let (roots, stats) = if dry_run {
        // Use the store's layout when there is one, so digests match a real add.
        let (hasher, config) = match FsStore::open(root) {
            Ok(store) => (store.hasher(), store.chunker_config()),
            Err(e) => {
                tracing::debug!(error = %e, "no store, dry run uses the default layout");
                (Algorithm::Blake3.hasher(), ChunkerConfig::default())
            }
        };
        add_paths(&MemoryStore::new(), hasher, config, paths)?
    } else {
        let store = FsStore::open(root)
            .with_context(|| format!("Failed to open store at {}", root.display()))?;
        add_paths(&store, store.hasher(), store.chunker_config(), paths)?
    };

    let data = AddOutput {
        success: true,
        result_code: 0,
        dry_run,
        roots,
        stats,
    };

    output.write(&data, || {
        let mut text = String::new();
        for added in &data.roots {
            text.push_str(&format!("{} {}\n", added.hash, added.path));
        }
        text.push_str(&format!(
            "{} objects written, {} already present, {} bytes{}\n",
            data.stats.objects_written,
            data.stats.objects_deduplicated,
            data.stats.bytes_written,
            if data.dry_run { " (dry run)" } else { "" }
        ));
        text
    })
}

fn add_paths<S: KvStore>(
    store: &S,
    hasher: AnyHasher,
    config: ChunkerConfig,
    paths: &[PathBuf],
) -> Result<(Vec<AddedRoot>, BuildStats)> {
    let mut builder = DagBuilder::new(store, hasher).with_config(config)?;
    let mut roots = Vec::with_capacity(paths.len());

    for path in paths {
        let node =
            fs_node(path).with_context(|| format!("Failed to read path: {}", path.display()))?;
        let built = builder
            .build_ref(&node)
            .with_context(|| format!("Failed to add path: {}", path.display()))?;

        roots.push(AddedRoot {
            hash: built.digest,
            path: path.display().to_string(),
            kind: built.kind,
            size: built.size,
        });
    }

    Ok((roots, builder.stats().clone()))
}
