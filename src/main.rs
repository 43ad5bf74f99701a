use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use savdiff::config::{ResolvedRun, RunConfig};
use savdiff::state::{AppState, Role};
use savdiff::{DataSubtype, compare, load_dataset};

/// Compare simulation save files against a canonical run
#[derive(Parser, Debug)]
#[command(name = "savdiff")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Flag test values whose relative error against canonical exceeds the tolerance
    Compare(RunArgs),
    /// Write one subtype of a submodel as a table (items x timesteps)
    Export(ExportArgs),
    /// Plot canonical vs test means per subtype
    Plot(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// JSON run configuration; flags override its values
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Canonical save file
    #[arg(long = "canon")]
    canon: Option<PathBuf>,

    /// Test save file
    #[arg(long = "test")]
    test: Option<PathBuf>,

    /// Submodel to compare (thermal or fluid)
    #[arg(short = 's', long = "submodel")]
    submodel: Option<String>,

    /// Data subtypes, comma separated (e.g. TL,PL,XL,AL); default is all
    #[arg(short = 't', long = "subtypes", value_delimiter = ',')]
    subtypes: Vec<String>,

    /// Relative error tolerance
    #[arg(long = "tolerance")]
    tolerance: Option<f64>,

    /// Print the report as JSON instead of a summary
    #[arg(long = "json")]
    json: bool,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Save file to read
    #[arg(short = 'f', long = "file")]
    file: PathBuf,

    /// Submodel to read
    #[arg(short = 's', long = "submodel")]
    submodel: String,

    /// Data subtype to export
    #[arg(short = 't', long = "subtype")]
    subtype: String,

    /// Output CSV path; stdout when omitted
    #[arg(short = 'o', long = "out", conflicts_with = "table")]
    out: Option<PathBuf>,

    /// Print an aligned table to stdout instead of CSV
    #[arg(long = "table")]
    table: bool,
}

impl RunArgs {
    fn resolve(&self) -> Result<ResolvedRun> {
        let from_file = match &self.config {
            Some(path) => RunConfig::from_file(path)?,
            None => RunConfig::default(),
        };
        let from_flags = RunConfig {
            canon: self.canon.clone(),
            test: self.test.clone(),
            submodel: self.submodel.clone(),
            subtypes: self.subtypes.clone(),
            tolerance: self.tolerance,
        };
        from_file.merge(from_flags).resolve()
    }
}

fn run_compare(args: &RunArgs) -> Result<ExitCode> {
    let run = args.resolve()?;
    log::debug!("Resolved run: {run:?}");

    let canon = load_dataset(&run.canon, true, &run.submodel, &run.subtypes)?;
    let test = load_dataset(&run.test, false, &run.submodel, &run.subtypes)?;
    let report = compare(&canon, &test, &run.compare_options())?;

    if args.json {
        println!("{}", report.to_json());
    } else {
        report.print_summary();
    }

    Ok(if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_export(args: &ExportArgs) -> Result<ExitCode> {
    let subtype = DataSubtype::new(&args.subtype);
    let dataset = load_dataset(&args.file, false, &args.submodel, &[subtype.clone()])?;
    let data = dataset
        .get(&subtype)
        .with_context(|| format!("{} has no {subtype} data", args.file.display()))?;

    match &args.out {
        Some(path) => {
            data.write_csv_file(path)?;
            log::info!("Wrote {}.{subtype} to {}", args.submodel, path.display());
        }
        None if args.table => println!("{}", data.pretty_table()?),
        None => data.write_csv(std::io::stdout().lock())?,
    }
    Ok(ExitCode::SUCCESS)
}

fn run_plot(args: &RunArgs) -> Result<ExitCode> {
    let run = args.resolve()?;
    let mut state = AppState::new(run.submodel.clone(), run.subtypes.clone(), run.tolerance);
    state.load(Role::Canonical, &run.canon);
    state.load(Role::Test, &run.test);
    savdiff::app::run(state)?;
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Command::Compare(args) => run_compare(args),
        Command::Export(args) => run_export(args),
        Command::Plot(args) => run_plot(args),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}
