use anyhow::{Context, Result};
use citegraph::batch;
use citegraph::config;
use citegraph::loader::{BulkLoader, LoadOptions};
use citegraph::models::LoadSummary;
use citegraph::pipeline::{self, BoardLoad};
use citegraph::progress::{make_spinner, BarProgress};
use citegraph::queries::{self, UseCase};
use citegraph::schema;
use citegraph::store::{ConnectionConfig, Neo4jStore};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "citegraph")]
#[command(about = "Load DBLP citations and StackExchange boards into Neo4j")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the constraints and indexes the loads rely on
    Schema(SchemaArgs),
    /// Load papers, authors and citations from a DBLP JSON-lines dump
    Papers(PapersArgs),
    /// Load StackExchange boards (posts, comments, post links)
    Boards(BoardsArgs),
    /// Run a read-side use case against the loaded graph
    Query(QueryArgs),
}

#[derive(Args)]
struct ConnectionArgs {
    /// Neo4j Bolt URI
    #[arg(long, default_value = config::DEFAULT_BOLT_URI)]
    bolt_uri: String,

    /// Neo4j user
    #[arg(long, default_value = config::DEFAULT_USER)]
    user: String,

    /// Neo4j password
    #[arg(long, default_value = "")]
    password: String,
}

impl ConnectionArgs {
    fn to_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            bolt_uri: self.bolt_uri.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }
}

#[derive(Args)]
struct SchemaArgs {
    #[command(flatten)]
    conn: ConnectionArgs,
}

#[derive(Args)]
struct PapersArgs {
    #[command(flatten)]
    conn: ConnectionArgs,

    /// Path to the DBLP dump, one JSON record per line (.bz2 accepted)
    #[arg(short, long)]
    input: PathBuf,

    /// Records per bulk mutation
    #[arg(long, default_value_t = config::PAPER_BATCH_SIZE, value_parser = parse_batch_size)]
    batch_size: usize,

    /// Expected record count for the progress bar (0 = unknown)
    #[arg(long, default_value_t = config::EXPECTED_PAPER_COUNT)]
    expected: u64,

    /// Print load summaries as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct BoardsArgs {
    #[command(flatten)]
    conn: ConnectionArgs,

    /// Directory containing <board>/<Table>.xml exports
    #[arg(long, default_value = config::DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Board to load; repeat for several (defaults to the built-in list)
    #[arg(long = "board")]
    boards: Vec<String>,

    /// Read at most this many rows per table (for testing)
    #[arg(long)]
    limit: Option<u64>,

    /// Records per bulk mutation
    #[arg(long, default_value_t = config::DEFAULT_BATCH_SIZE, value_parser = parse_batch_size)]
    batch_size: usize,

    /// Print load summaries as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct QueryArgs {
    #[command(flatten)]
    conn: ConnectionArgs,

    #[arg(value_enum)]
    use_case: UseCase,

    /// Substring to match against post or paper titles
    #[arg(long)]
    title: String,

    /// Maximum rows returned
    #[arg(long, default_value_t = 25)]
    limit: i64,
}

fn parse_batch_size(arg: &str) -> std::result::Result<usize, String> {
    let size: usize = arg.parse().map_err(|e| format!("{e}"))?;
    batch::batch_size(size).map_err(|e| e.to_string())
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()?;
    Ok(rt)
}

/// First Ctrl-C stops at the next batch boundary; a second one exits.
fn cancel_on_interrupt() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current batch");
            eprintln!("Stopping after the current batch (Ctrl-C again to abort)");
            child.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        }
    });
    token
}

fn print_summaries(summaries: &[LoadSummary], json: bool, elapsed: f64) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summaries)?);
        return Ok(());
    }

    println!();
    println!("=== Summary ===");
    for s in summaries {
        let affected = s
            .affected
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<22} {:>10} records {:>7} batches {:>10} affected {:>6} malformed {:>9.2}s{}",
            s.mutation,
            s.records,
            s.batches_done,
            affected,
            s.malformed,
            s.total_time.as_secs_f64(),
            if s.cancelled { "  (cancelled)" } else { "" }
        );
    }
    println!("Total time:            {elapsed:.2}s");
    Ok(())
}

fn run_schema(args: SchemaArgs) -> Result<()> {
    build_runtime()?.block_on(async {
        let store = Neo4jStore::connect(&args.conn.to_config()).await?;
        let pb = make_spinner("Creating constraints and indexes ...");
        schema::ensure_constraints(&store).await?;
        pb.finish_with_message("done.");
        Ok::<(), anyhow::Error>(())
    })
}

fn run_papers(args: PapersArgs) -> Result<()> {
    let options = LoadOptions {
        batch_size: args.batch_size,
        expected_total: (args.expected > 0).then_some(args.expected),
    };
    let start = Instant::now();

    let summaries = build_runtime()?.block_on(async {
        let store = Neo4jStore::connect(&args.conn.to_config()).await?;
        let mut loader = BulkLoader::new(&store)
            .with_cancel(cancel_on_interrupt())
            .with_progress(Box::new(BarProgress::new()));
        pipeline::load_papers(&mut loader, &args.input, &options).await
    })?;

    print_summaries(&summaries, args.json, start.elapsed().as_secs_f64())
}

fn run_boards(args: BoardsArgs) -> Result<()> {
    let boards = if args.boards.is_empty() {
        config::DEFAULT_BOARDS.iter().map(|b| b.to_string()).collect()
    } else {
        args.boards
    };
    let request = BoardLoad {
        data_dir: args.data_dir,
        boards,
        limit: args.limit,
    };
    let options = LoadOptions::with_batch_size(args.batch_size);
    let start = Instant::now();

    let summaries = build_runtime()?.block_on(async {
        let store = Neo4jStore::connect(&args.conn.to_config()).await?;
        let mut loader = BulkLoader::new(&store)
            .with_cancel(cancel_on_interrupt())
            .with_progress(Box::new(BarProgress::new()));
        pipeline::load_boards(&mut loader, &request, &options).await
    })?;

    print_summaries(&summaries, args.json, start.elapsed().as_secs_f64())
}

fn run_query(args: QueryArgs) -> Result<()> {
    let rows = build_runtime()?.block_on(async {
        let store = Neo4jStore::connect(&args.conn.to_config()).await?;
        queries::run_use_case(&store, args.use_case, &args.title, args.limit).await
    })?;

    println!("{}", args.use_case.columns().join("\t"));
    for row in &rows {
        println!("{}", row.join("\t"));
    }
    info!(rows = rows.len(), "Query complete");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let result = match cli.command {
        Commands::Schema(args) => run_schema(args),
        Commands::Papers(args) => run_papers(args),
        Commands::Boards(args) => run_boards(args),
        Commands::Query(args) => run_query(args).context("Query failed"),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
