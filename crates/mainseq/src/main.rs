use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use mainseq_core::config::Config;
use mainseq_core::pipeline::AnalysisPipeline;
use mainseq_core::result::MetricsResult;
use mainseq_core::scanner::SourceScanner;
use mainseq_python::PythonScanner;
use mainseq_report::{json, text};

#[derive(Parser)]
#[command(name = "mainseq")]
#[command(about = "Analyze component coupling and abstraction against the main sequence")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a source tree and print the full metrics report
    Analyze {
        /// Path to the project root
        path: PathBuf,
        /// Config file path (defaults to .mainseq.toml in project root)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Analyze and exit with code 0 (pass) or 1 (fail)
    Check {
        /// Path to the project root
        path: PathBuf,
        /// Fail when the average distance exceeds this limit; without it,
        /// any component over the configured threshold fails
        #[arg(long)]
        max_distance: Option<f64>,
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Create a default .mainseq.toml configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            path,
            config,
            format,
        } => cmd_analyze(&path, config.as_deref(), &format),
        Commands::Check {
            path,
            max_distance,
            config,
            format,
        } => cmd_check(&path, max_distance, config.as_deref(), &format),
        Commands::Init { force } => cmd_init(force),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(2);
    }
}

fn cmd_analyze(path: &Path, config_path: Option<&Path>, format: &str) -> Result<()> {
    let config = load_config(path, config_path)?;
    let result = run_analysis(path, &config)?;
    let report = match format {
        "json" => json::format_report(&result, false),
        "text" => text::format_report(&result),
        other => anyhow::bail!("unknown format '{other}' (expected 'text' or 'json')"),
    };
    print!("{report}");
    Ok(())
}

fn cmd_check(
    path: &Path,
    max_distance: Option<f64>,
    config_path: Option<&Path>,
    format: &str,
) -> Result<()> {
    let config = load_config(path, config_path)?;
    let result = run_analysis(path, &config)?;
    let (report, passed) = match format {
        "json" => json::format_check(&result, max_distance, false),
        "text" => text::format_check(&result, max_distance),
        other => anyhow::bail!("unknown format '{other}' (expected 'text' or 'json')"),
    };
    print!("{report}");
    if !passed {
        process::exit(1);
    }
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let target = PathBuf::from(".mainseq.toml");
    if target.exists() && !force {
        anyhow::bail!(".mainseq.toml already exists. Use --force to overwrite.");
    }
    std::fs::write(&target, Config::default_toml())?;
    println!("Created .mainseq.toml with default configuration.");
    Ok(())
}

fn load_config(project_path: &Path, config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(p) => Config::load(p),
        None => Ok(Config::load_or_default(project_path)),
    }
}

fn run_analysis(project_path: &Path, config: &Config) -> Result<MetricsResult> {
    let scanner =
        PythonScanner::new(&config.project).context("failed to initialize Python scanner")?;
    let facts = scanner
        .scan(project_path)
        .with_context(|| format!("failed to scan '{}'", project_path.display()))?;

    let pipeline = AnalysisPipeline::new(config.clone());
    let result = pipeline
        .run(facts)
        .context("analysis aborted on an inconsistent dependency model")?;
    Ok(result)
}
