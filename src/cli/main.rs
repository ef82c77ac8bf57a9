//! Data model compiler command line interface
//!
//! ```bash
//! # Compile a schema and print the entities in dependency order
//! data-model-compiler compile --schema db.xml
//!
//! # Add a user interface and target Oracle
//! data-model-compiler compile --schema db.xml --ui ui.xml --dialect oracle --format json
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use data_model_compiler::cli::commands::{CompileArgs, handle_compile};
use data_model_compiler::cli::output::OutputFormat;

#[derive(Parser)]
#[command(name = "data-model-compiler")]
#[command(version)]
#[command(about = "Compile XML db-schema and ui-schema declarations into a validated model")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile one or more db-schema files and an optional ui-schema file
    Compile {
        /// db-schema file, repeatable; `-` reads stdin
        #[arg(short, long = "schema", required = true)]
        schemas: Vec<String>,

        /// ui-schema file; includes are resolved relative to its directory
        #[arg(short, long)]
        ui: Option<PathBuf>,

        /// Compiler options file (.toml, .yaml or .yml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Target dialect: generic, oracle, mysql, postgresql, hsqldb
        #[arg(short, long)]
        dialect: Option<String>,

        /// Inheritance mapping: subclass_per_table or class_per_table
        #[arg(short, long)]
        mapping: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },
}

fn init_tracing(verbose: u8) {
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

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Compile {
            schemas,
            ui,
            config,
            dialect,
            mapping,
            format,
        } => handle_compile(&CompileArgs {
            schemas,
            ui,
            config,
            dialect,
            mapping,
            format,
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
