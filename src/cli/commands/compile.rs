//! Compile command implementation

use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cli::error::CliError;
use crate::cli::output::{OutputFormat, format_output};
use crate::compiler::{CompiledModel, ModelCompiler};
use crate::config::{CompilerOptions, Dialect, MappingStrategy};
use crate::import::FileIncludeResolver;

/// Arguments of the compile command
#[derive(Debug, Clone, Default)]
pub struct CompileArgs {
    /// db-schema files; `-` reads stdin
    pub schemas: Vec<String>,
    pub ui: Option<PathBuf>,
    pub config: Option<PathBuf>,
    /// Overrides the dialect of the config file
    pub dialect: Option<String>,
    /// Overrides the mapping strategy of the config file
    pub mapping: Option<String>,
    pub format: OutputFormat,
}

/// Load input content from file or stdin
fn load_input(input: &str) -> Result<String, CliError> {
    if input == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| CliError::InvalidArgument(format!("Failed to read stdin: {}", e)))?;
        Ok(content)
    } else {
        let path = PathBuf::from(input);
        std::fs::read_to_string(&path).map_err(|e| CliError::FileReadError(path, e.to_string()))
    }
}

/// Options from the config file with command line overrides applied
pub fn resolve_options(args: &CompileArgs) -> Result<CompilerOptions, CliError> {
    let mut options = match &args.config {
        Some(path) => CompilerOptions::load(path).map_err(|e| CliError::Config(format!("{:#}", e)))?,
        None => CompilerOptions::default(),
    };
    if let Some(dialect) = &args.dialect {
        options.dialect = dialect
            .parse::<Dialect>()
            .map_err(CliError::InvalidArgument)?;
    }
    if let Some(mapping) = &args.mapping {
        options.mapping = mapping
            .parse::<MappingStrategy>()
            .map_err(CliError::InvalidArgument)?;
    }
    Ok(options)
}

/// Compile the inputs named by `args`
pub fn compile_inputs(args: &CompileArgs) -> Result<CompiledModel, CliError> {
    if args.schemas.is_empty() {
        return Err(CliError::InvalidArgument(
            "at least one --schema file is required".to_string(),
        ));
    }
    let options = resolve_options(args)?;
    let schemas = args
        .schemas
        .iter()
        .map(|s| load_input(s))
        .collect::<Result<Vec<_>, _>>()?;
    let schema_refs: Vec<&str> = schemas.iter().map(String::as_str).collect();

    let mut compiler = ModelCompiler::new(options);
    let ui = match &args.ui {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| CliError::FileReadError(path.clone(), e.to_string()))?;
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            compiler = compiler.with_include_resolver(FileIncludeResolver::new(base));
            Some(content)
        }
        None => None,
    };

    info!(schemas = schema_refs.len(), ui = ui.is_some(), "compiling");
    Ok(compiler.compile(&schema_refs, ui.as_deref())?)
}

/// Handle the compile command
pub fn handle_compile(args: &CompileArgs) -> Result<(), CliError> {
    let compiled = compile_inputs(args)?;
    print!("{}", format_output(&compiled, args.format)?);
    Ok(())
}
