//! docbook2md: CLI tool to convert DocBook-style XML files to Markdown

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing_subscriber::EnvFilter;

use config::{CONFIG_FILE_NAME, Config};
use docbook2md_core::{ConverterOptions, Diagnostics, convert_with_options};

#[derive(Parser, Debug)]
#[command(name = "docbook2md")]
#[command(about = "Convert DocBook-style XML files to Markdown")]
#[command(version)]
#[command(subcommand_negates_reqs = true)]
#[command(after_help = "Examples:
  docbook2md doc.xml                       # Convert single file to doc.md
  docbook2md doc.xml -o out.md             # Convert to specific output file
  docbook2md xml/ -o docs/ -r              # Convert a directory tree
  docbook2md xml/ -o docs/ -j4             # Use 4 parallel jobs
  docbook2md xml/ --report unknown.json    # Write the batch unknown tag report
  docbook2md init                          # Create _docbook2md.toml config file")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input XML file or directory
    #[arg(required = true)]
    input: Option<PathBuf>,

    /// Output file or directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of parallel jobs (defaults to number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Process directories recursively
    #[arg(short, long)]
    recursive: bool,

    /// Configuration file (default: _docbook2md.toml in the input directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the merged unknown tag report (Markdown, or JSON for *.json)
    #[arg(long)]
    report: Option<PathBuf>,

    /// Do not append the unknown tag table to converted documents
    #[arg(long)]
    no_unknown_table: bool,

    /// Output file extension (default: md)
    #[arg(long)]
    extension: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only show errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a configuration file with default settings
    Init {
        /// Output path for the configuration file
        #[arg(short, long, default_value = CONFIG_FILE_NAME)]
        output: PathBuf,

        /// Print the JSON schema of the configuration instead
        #[arg(long)]
        schema: bool,
    },
}

/// Settings resolved from the config file and command line flags
struct Settings {
    options: ConverterOptions,
    extension: String,
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Some(Commands::Init { output, schema }) = &cli.command {
        return run_init(output, *schema);
    }

    let Some(input) = cli.input.as_deref() else {
        anyhow::bail!("Missing input path");
    };

    let settings = resolve_settings(&cli, input)?;

    let (diagnostics, failed) = if input.is_file() {
        (convert_single(input, cli.output.as_deref(), &settings)?, 0)
    } else if input.is_dir() {
        convert_directory(input, cli.output.as_deref(), cli.recursive, cli.jobs, &settings)?
    } else {
        anyhow::bail!("Input path does not exist: {}", input.display());
    };

    // Written even when some files failed: it covers the ones that converted
    if let Some(report) = &cli.report {
        write_report(report, &diagnostics)?;
    }

    if failed > 0 {
        anyhow::bail!("{} files failed to convert", failed);
    }

    Ok(())
}

/// `-v` enables debug events, `-q` keeps errors only; otherwise `RUST_LOG` or warnings
fn init_tracing(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_init(output: &Path, schema: bool) -> Result<()> {
    if schema {
        println!("{}", Config::json_schema_string()?);
        return Ok(());
    }

    if output.exists() {
        anyhow::bail!("Config file already exists: {}", output.display());
    }

    let content = Config::sample().to_toml_with_schema()?;
    fs::write(output, content)
        .with_context(|| format!("Failed to write: {}", output.display()))?;

    println!("{}", output.display());
    Ok(())
}

/// Merge the config file (explicit, or found next to the input) with CLI flags
fn resolve_settings(cli: &Cli, input: &Path) -> Result<Settings> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => {
            let dir = if input.is_dir() {
                input
            } else {
                input.parent().unwrap_or(Path::new("."))
            };
            Config::load_from_dir(dir)?.unwrap_or_default()
        }
    };

    let mut options = config.converter_options();
    if cli.no_unknown_table {
        options.unknown_tag_table = false;
    }

    let extension = match &cli.extension {
        Some(ext) => ext.trim_start_matches('.').to_string(),
        None => config.extension().to_string(),
    };

    Ok(Settings {
        options,
        extension,
        quiet: cli.quiet,
    })
}

/// Convert a single XML file
fn convert_single(
    input: &Path,
    output: Option<&Path>,
    settings: &Settings,
) -> Result<Diagnostics> {
    let output_path = match output {
        Some(p) => p.to_path_buf(),
        None => input.with_extension(&settings.extension),
    };

    let diagnostics = convert_file(input, &output_path, &settings.options)?;

    if !settings.quiet {
        println!("{}", output_path.display());
    }

    Ok(diagnostics)
}

/// Convert a directory of XML files
///
/// Returns the diagnostics merged over the converted files and the number of
/// files that failed.
fn convert_directory(
    input: &Path,
    output: Option<&Path>,
    recursive: bool,
    jobs: Option<usize>,
    settings: &Settings,
) -> Result<(Diagnostics, usize)> {
    let output_dir = output.unwrap_or(input);

    let files = collect_xml_files(input, recursive)?;

    if files.is_empty() {
        if !settings.quiet {
            eprintln!("No .xml files found in {}", input.display());
        }
        return Ok((Diagnostics::new(), 0));
    }

    tracing::info!(count = files.len(), "Found XML files");

    if let Some(n) = jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .ok(); // Ignore error if already initialized
    }

    let success = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    let results: Vec<_> = files
        .par_iter()
        .map(|file| {
            let relative = file.strip_prefix(input).unwrap_or(file);
            let output_file = output_dir.join(relative).with_extension(&settings.extension);

            let result = convert_file(file, &output_file, &settings.options);
            match &result {
                Ok(_) => {
                    success.fetch_add(1, Ordering::Relaxed);
                    if !settings.quiet {
                        println!("{}", output_file.display());
                    }
                }
                Err(_) => {
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            }
            (file, result)
        })
        .collect();

    // Merge sequentially so the report does not depend on scheduling
    let mut diagnostics = Diagnostics::new();
    for (file, result) in results {
        match result {
            Ok(file_diagnostics) => diagnostics.merge(file_diagnostics),
            Err(e) => tracing::error!("Error converting {}: {:#}", file.display(), e),
        }
    }

    let success_count = success.load(Ordering::Relaxed);
    let failed_count = failed.load(Ordering::Relaxed);

    if !settings.quiet {
        eprintln!("Converted {} files, {} failed", success_count, failed_count);
    }

    Ok((diagnostics, failed_count))
}

/// Read, convert and write one file (no console output, for parallel use)
fn convert_file(input: &Path, output: &Path, options: &ConverterOptions) -> Result<Diagnostics> {
    tracing::info!("Converting: {} -> {}", input.display(), output.display());

    let bytes = fs::read(input).with_context(|| format!("Failed to read: {}", input.display()))?;
    let source = String::from_utf8_lossy(&bytes);

    let conversion = convert_with_options(&source, options)
        .with_context(|| format!("Failed to convert: {}", input.display()))?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(output, &conversion.markdown)
        .with_context(|| format!("Failed to write: {}", output.display()))?;

    Ok(conversion.diagnostics)
}

/// Collect all .xml files in a directory
fn collect_xml_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in
        fs::read_dir(dir).with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() {
            if path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
            {
                files.push(path);
            }
        } else if path.is_dir() && recursive {
            files.extend(collect_xml_files(&path, recursive)?);
        }
    }

    files.sort();
    Ok(files)
}

/// Write the batch report: JSON for `*.json` paths, a Markdown table otherwise
fn write_report(path: &Path, diagnostics: &Diagnostics) -> Result<()> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let content = if is_json {
        serde_json::to_string_pretty(diagnostics).context("Failed to serialize report")?
    } else {
        diagnostics
            .to_markdown_table()
            .map(|table| table + "\n")
            .unwrap_or_default()
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write: {}", path.display()))?;

    tracing::info!(tags = diagnostics.len(), "Wrote report to {}", path.display());
    Ok(())
}
