use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use std::process;
use tracing::{error, info, Level};

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about = "Multi-objective Pareto search over fixed-width design records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Record layout schema (JSON). Defaults to the built-in jacket schema.
    #[arg(global = true, long)]
    schema: Option<String>,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run or resume an optimization
    Search(cmd::search::SearchArgs),
    /// Check the schema and seed library
    Validate(cmd::validate::ValidateArgs),
    /// Summarize a checkpoint
    Inspect(cmd::inspect::InspectArgs),
    /// Write every archived candidate of a checkpoint as CSV
    Export(cmd::export::ExportArgs),
}

fn main() {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    tracing_subscriber::fmt()
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    info!("🚀 Initializing ParetoForge...");

    let sub_matches: ArgMatches = matches
        .subcommand()
        .map(|(_, m)| m.clone())
        .unwrap_or_default();
    let schema = cli.schema.as_deref();

    let result = match &cli.command {
        Commands::Search(args) => cmd::search::run(args, &sub_matches, schema),
        Commands::Validate(args) => cmd::validate::run(args, schema),
        Commands::Inspect(args) => cmd::inspect::run(args),
        Commands::Export(args) => cmd::export::run(args),
    };

    if let Err(e) = result {
        error!("❌ FATAL: {}", e);
        process::exit(1);
    }
}
