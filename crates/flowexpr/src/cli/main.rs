//! The `flowexpr` command: drives the compiler pipeline against the demo
//! field registry/port table (`flowexpr::demo`) from the command line, for
//! manual exploration and as an end-to-end smoke test of the whole crate
//! graph. Three subcommands:
//!
//! - `flowexpr compile <expr>` - lex/parse/annotate/simplify/normalize/emit,
//!   printing the resulting match set as text or JSON.
//! - `flowexpr check <expr>` - parse and annotate only, reporting pass/fail
//!   plus any diagnostic.
//! - `flowexpr fmt <expr>` - print the canonical `format()` rendering of
//!   the parsed expression (a round-trip check against `parse`).

use clap::{Parser, Subcommand, ValueEnum};
use flowexpr::demo::{DemoPorts, DemoRegistry};
use flowexpr::{compile, format};
use std::process;

#[derive(Parser)]
#[command(name = "flowexpr", version, about = "Matching-expression compiler for flow-classifier matches")]
struct Cli {
    /// Increase log verbosity (pass multiple times for more detail); also
    /// honors `RUST_LOG` if set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an expression to a set of classifier matches.
    Compile {
        /// The match expression, e.g. `tcp.dst == {80, 443} && ip4`.
        expr: String,

        /// Output format for the emitted match set.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Parse and annotate an expression, reporting success or the first
    /// error encountered.
    Check {
        expr: String,
    },
    /// Print the canonical textual rendering of a parsed expression.
    Fmt {
        expr: String,
    },
}

#[derive(Copy, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Compile { expr, format } => run_compile(&expr, format),
        Commands::Check { expr } => run_check(&expr),
        Commands::Fmt { expr } => run_fmt(&expr),
    };

    if let Err(message) = result {
        eprintln!("error: {message}");
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn run_compile(expr: &str, output: OutputFormat) -> Result<(), String> {
    let registry = DemoRegistry::new();
    let symtab = flowexpr::demo::build_symtab(&registry);
    let ports = DemoPorts::new();
    let compiled = compile(expr, &symtab, &ports).map_err(|e| e.to_string())?;

    match output {
        OutputFormat::Text => {
            for record in compiled.matches.values() {
                println!("{record}");
            }
            eprintln!("{} match(es), {} conjunction group(s)", compiled.matches.len(), compiled.conjunction_count);
        }
        OutputFormat::Json => {
            let matches: Vec<_> = compiled.matches.values().map(|r| r.to_string()).collect();
            let payload = serde_json::json!({
                "matches": matches,
                "conjunction_count": compiled.conjunction_count,
            });
            println!("{}", serde_json::to_string_pretty(&payload).map_err(|e| e.to_string())?);
        }
    }
    Ok(())
}

fn run_check(expr: &str) -> Result<(), String> {
    let registry = DemoRegistry::new();
    let symtab = flowexpr::demo::build_symtab(&registry);
    let parsed = flowexpr_parser::parse_string(expr, &symtab).map_err(|e| e.to_string())?;
    let annotated = flowexpr::annotate(parsed, &symtab).map_err(|e| e.to_string())?;
    println!("ok: {}", format(&annotated));
    Ok(())
}

fn run_fmt(expr: &str) -> Result<(), String> {
    let registry = DemoRegistry::new();
    let symtab = flowexpr::demo::build_symtab(&registry);
    let parsed = flowexpr_parser::parse_string(expr, &symtab).map_err(|e| e.to_string())?;
    println!("{}", format(&parsed));
    Ok(())
}
