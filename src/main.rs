//! flowcheck - available expressions and loop dependence reports for IR modules
//!
//! # Usage
//!
//! ```bash
//! # Available expressions of every function
//! flowcheck avail module.json
//!
//! # Dependences of the loops in one function, unknown indices left undecided
//! flowcheck deps module.json --function kernel --conservative
//!
//! # Print the module as text IR
//! flowcheck dump module.json
//! ```

use analysis::analysis::report;
use analysis::ir::{dump, loop_analysis, IrFunction, IrModule};
use analysis::{analyze_function, analyze_loops, logging, AnalysisConfig, UnknownIndexPolicy};
use clap::{Args, Parser, Subcommand, ValueEnum};
use diagnostics::{Diagnostics, ErrorFormatter};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "flowcheck")]
#[command(version = "0.1.0")]
#[command(about = "Available expressions and loop dependence analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report IN/OUT/GEN/KILL for every assignment
    Avail {
        /// Path to the IR module (JSON)
        file: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Report flow, anti and output dependences of every loop
    Deps {
        /// Path to the IR module (JSON)
        file: PathBuf,

        /// Leave indices that depend on unknown values undecided instead of
        /// assuming 0
        #[arg(long)]
        conservative: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Print the module as text IR
    Dump {
        /// Path to the IR module (JSON)
        file: PathBuf,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Only analyze the function with this name
    #[arg(long)]
    function: Option<String>,

    /// Analysis configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Commands::Avail { common, .. } | Commands::Deps { common, .. } => common.verbose,
        Commands::Dump { verbose, .. } => *verbose,
    };
    logging::init_cli(verbose);

    let result = match cli.command {
        Commands::Avail { file, common } => avail(&file, &common),
        Commands::Deps {
            file,
            conservative,
            common,
        } => deps(&file, conservative, &common),
        Commands::Dump { file, .. } => dump_file(&file),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_module(file: &Path) -> Result<IrModule, String> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
    IrModule::from_json(&text).map_err(|e| format!("Invalid IR module {}: {}", file.display(), e))
}

fn load_config(common: &CommonArgs) -> Result<AnalysisConfig, String> {
    match &common.config {
        Some(path) => AnalysisConfig::from_file(path).map_err(|e| e.to_string()),
        None => Ok(AnalysisConfig::default()),
    }
}

/// Functions selected by `--function`, or all of them in module order.
fn selected<'m>(module: &'m IrModule, name: Option<&str>) -> Result<Vec<&'m IrFunction>, String> {
    match name {
        Some(name) => module
            .function_by_name(name)
            .map(|f| vec![f])
            .ok_or_else(|| analysis::AnalysisError::FunctionNotFound(name.to_string()).to_string()),
        None => Ok(module.functions.values().collect()),
    }
}

fn print_diagnostics(diagnostics: &Diagnostics) {
    if !diagnostics.is_empty() {
        let formatter = if std::io::stderr().is_terminal() {
            ErrorFormatter::with_colors()
        } else {
            ErrorFormatter::new()
        };
        eprintln!("{}", formatter.format_diagnostics(diagnostics));
    }
}

fn avail(file: &Path, common: &CommonArgs) -> Result<(), String> {
    let module = load_module(file)?;
    let config = load_config(common)?;

    for function in selected(&module, common.function.as_deref())? {
        let report = analyze_function(function, &config).map_err(|e| e.to_string())?;
        print_diagnostics(&report.diagnostics);

        match common.format {
            OutputFormat::Text => {
                println!("Function {}", function.name);
                print!("{}", report::render_available_expressions(function, &report));
            }
            OutputFormat::Json => {
                let json = report::available_expressions_json(function, &report)
                    .map_err(|e| format!("Failed to serialize report: {}", e))?;
                println!("{}", json);
            }
        }
    }
    Ok(())
}

fn deps(file: &Path, conservative: bool, common: &CommonArgs) -> Result<(), String> {
    let module = load_module(file)?;
    let mut config = load_config(common)?;
    if conservative {
        config.unknown_index = UnknownIndexPolicy::Conservative;
    }

    for function in selected(&module, common.function.as_deref())? {
        let reports = analyze_loops(function, &config).map_err(|e| e.to_string())?;
        for report in &reports {
            print_diagnostics(&report.diagnostics);
        }

        match common.format {
            OutputFormat::Text => {
                for report in &reports {
                    println!("Function {} loop {}", report.function, report.header);
                    print!("{}", report::render_dependences(report));
                }
            }
            OutputFormat::Json => {
                let json = report::dependences_json(&reports)
                    .map_err(|e| format!("Failed to serialize report: {}", e))?;
                println!("{}", json);
            }
        }
    }
    Ok(())
}

fn dump_file(file: &Path) -> Result<(), String> {
    let mut module = load_module(file)?;
    for function in module.functions.values_mut() {
        loop_analysis::annotate_loop_headers(function);
    }
    print!("{}", dump::dump_module(&module));
    Ok(())
}
