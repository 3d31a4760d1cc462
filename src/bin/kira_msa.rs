use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_msa_builder::app::{self, App, RunAction, RunSummary, StatusReport};
use kira_msa_builder::config::{ConfigLoader, RunPaths};
use kira_msa_builder::dataset::DatasetReader;
use kira_msa_builder::error::KiraError;
use kira_msa_builder::output::{BarProgress, JsonOutput, OutputMode};
use kira_msa_builder::resume::OutputState;
use kira_msa_builder::store::OutputStore;
use kira_msa_builder::uniparc::UniparcHttpClient;

#[derive(Parser)]
#[command(name = "kira-msa")]
#[command(about = "Collect UniParc sequences for a gene table into one resumable, gene-annotated FASTA file")]
#[command(version, author)]
struct Cli {
    /// Print a JSON summary instead of a progress bar and coloured text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch missing records, resuming an interrupted run")]
    Fetch(PathArgs),
    #[command(about = "Show how far an output file has got, without fetching")]
    Status(PathArgs),
}

#[derive(Args, Clone)]
struct PathArgs {
    /// Tab-separated table with SYMBOL and UNIPARC columns (.csv or .tsv).
    input: Utf8PathBuf,

    /// FASTA file to create or extend (.fasta).
    output: Utf8PathBuf,

    /// Progress marker location [default: <OUTPUT>.progress]
    #[arg(long)]
    progress: Option<Utf8PathBuf>,

    /// JSON config file [default: ./kira-msa.json when present]
    #[arg(long)]
    config: Option<Utf8PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kira) = report.downcast_ref::<KiraError>() {
            return ExitCode::from(map_exit_code(kira));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KiraError) -> u8 {
    match error {
        KiraError::InputFormat { .. }
        | KiraError::MissingColumn(_)
        | KiraError::TableRead { .. }
        | KiraError::TableRow { .. }
        | KiraError::InvalidIdentifier(_)
        | KiraError::ConfigRead(_)
        | KiraError::ConfigParse(_)
        | KiraError::ConfigValue(_) => 2,
        KiraError::FetchHttp { .. }
        | KiraError::FetchStatus { .. }
        | KiraError::MalformedRecord { .. } => 3,
        KiraError::InconsistentState { .. } | KiraError::OutputLocked(_) => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Interactive
    };

    match cli.command {
        Commands::Fetch(args) => run_fetch(args, output_mode),
        Commands::Status(args) => run_status(args, output_mode),
    }
}

fn run_fetch(args: PathArgs, output_mode: OutputMode) -> miette::Result<()> {
    let paths = RunPaths::new(args.input, args.output, args.progress)?;
    let config = ConfigLoader::resolve(args.config.as_deref())?;
    let plan = DatasetReader::read(&paths.input)?;
    let store = OutputStore::new(&paths);

    let client = UniparcHttpClient::new(&config.service)?;
    let app = App::new(client, config.service.header_splice_offset);

    match output_mode {
        OutputMode::Json => {
            let outcome = app.run(&plan, &store, &JsonOutput)?;
            JsonOutput::print_run(&outcome.summary).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let bar = BarProgress::new();
            let result = app.run(&plan, &store, &bar);
            bar.finish();
            print_run_summary(&result?.summary);
        }
    }
    Ok(())
}

fn run_status(args: PathArgs, output_mode: OutputMode) -> miette::Result<()> {
    let paths = RunPaths::new(args.input, args.output, args.progress)?;
    let config = ConfigLoader::resolve(args.config.as_deref())?;
    let plan = DatasetReader::read(&paths.input)?;
    let store = OutputStore::new(&paths);
    let report = app::status(&plan, &store, config.service.header_splice_offset)?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_status(&report).into_diagnostic()?,
        OutputMode::Interactive => print_status(&report),
    }
    Ok(())
}

fn print_run_summary(summary: &RunSummary) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}KIRA-MSA summary{reset}");
    match summary.action {
        RunAction::AlreadyComplete => {
            println!("{green}Output already complete, nothing fetched{reset}")
        }
        RunAction::Fresh => println!("{green}Fetched {} records{reset}", summary.fetched),
        RunAction::Resumed => {
            if let Some(from) = &summary.resumed_from {
                println!(
                    "{green}Resumed at gene {} ({}), fetched {} records{reset}",
                    from.gene,
                    from.identifier.as_deref().unwrap_or("-"),
                    summary.fetched
                );
            } else {
                println!("{green}Fetched {} records{reset}", summary.fetched);
            }
        }
    }
    println!(
        "{cyan}   records: {} of {} ({} rows without identifier skipped){reset}",
        summary.records, summary.fetchable, summary.skipped
    );
    println!("{yellow}   output: {}{reset}", summary.output);
}

fn print_status(report: &StatusReport) {
    let state = match report.state {
        OutputState::Missing => "not started",
        OutputState::Partial => "partial",
        OutputState::Complete => "complete",
    };
    println!("{}: {state}", report.output);
    println!(
        "  records: {} of {} ({} remaining)",
        report.completed, report.fetchable, report.remaining
    );
    if let Some(next) = &report.next {
        println!("  next: {next}");
    }
    if report.drops_tail {
        println!("  an unconfirmed trailing record will be dropped and refetched");
    }
    if report.marker_rebuilt {
        println!("  the progress marker is missing and will be rebuilt");
    }
}
