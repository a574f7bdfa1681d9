use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use colored::Colorize;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use lintscan::report::{ReportOptions, Reporter};
use lintscan::{Config, IssueRegistry, LintDriver, ReportFormat};

/// lintscan - Fast lint checks for Android projects (Java, XML, version catalogs)
#[derive(Parser, Debug)]
#[command(name = "lintscan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the project directory to analyze
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Path to configuration file (TOML or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target directories to analyze (can be specified multiple times)
    #[arg(short, long)]
    target: Vec<PathBuf>,

    /// Patterns to exclude (can be specified multiple times)
    #[arg(short, long)]
    exclude: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "compact")]
    format: OutputFormat,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only report fatal findings
    #[arg(long)]
    fatal_only: bool,

    /// Minimum SDK level, overriding the manifest
    #[arg(long, value_name = "N")]
    min_sdk: Option<u32>,

    /// JSON API version database for the NewApi check
    #[arg(long, value_name = "FILE")]
    api_database: Option<PathBuf>,

    /// Allow network lookups for newer library versions
    #[arg(long)]
    remote: bool,

    /// Ignore `//noinspection` comments
    #[arg(long)]
    no_comment_suppression: bool,

    /// Enable parallel processing for faster analysis (enabled by default)
    #[arg(long, default_value = "true", action = clap::ArgAction::Set)]
    parallel: bool,

    /// List every known issue and exit
    #[arg(long)]
    list_issues: bool,

    /// Number of top issues to show in summary mode
    #[arg(long, default_value = "10")]
    top: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only output results
    #[arg(short, long)]
    quiet: bool,

    /// Generate shell completions
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default)]
enum OutputFormat {
    #[default]
    Compact,
    Json,
    Summary,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Compact => ReportFormat::Compact,
            OutputFormat::Json => ReportFormat::Json,
            OutputFormat::Summary => ReportFormat::Summary,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle shell completions
    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(shell, &mut cmd, name, &mut std::io::stdout());
        return Ok(());
    }

    init_logging(cli.verbose, cli.quiet);

    if cli.list_issues {
        return list_issues();
    }

    info!("lintscan v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;
    let has_errors = run_analysis(config, &cli)?;
    if has_errors {
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Reports go to stdout
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else {
        Config::from_default_locations(&cli.path)?
    };

    // Override with CLI arguments
    if !cli.target.is_empty() {
        config.targets = cli.target.clone();
    }
    if !cli.exclude.is_empty() {
        config.exclude.extend(cli.exclude.clone());
    }
    if cli.fatal_only {
        config.fatal_only = true;
    }
    if cli.min_sdk.is_some() {
        config.min_sdk = cli.min_sdk;
    }
    if cli.api_database.is_some() {
        config.api_database = cli.api_database.clone();
    }
    if cli.remote {
        config.remote.enabled = true;
    }
    if cli.no_comment_suppression {
        config.comment_suppression = false;
    }
    config.parallel = cli.parallel;

    Ok(config)
}

fn list_issues() -> Result<()> {
    let registry = IssueRegistry::builtin()?;
    let mut issues = registry.issues().to_vec();
    issues.sort_by(|a, b| (a.category, a.id).cmp(&(b.category, b.id)));

    for issue in issues {
        let state = if issue.enabled_by_default {
            String::new()
        } else {
            format!(" {}", "(disabled by default)".dimmed())
        };
        println!(
            "{:<24} {:<8} {:<20} {}{}",
            issue.id.magenta(),
            issue.severity.as_str(),
            issue.category.name(),
            issue.brief,
            state
        );
    }
    Ok(())
}

/// Run once and print the report; returns whether an error-level finding survived
fn run_analysis(config: Config, cli: &Cli) -> Result<bool> {
    let start_time = Instant::now();

    if !cli.path.exists() {
        return Err(miette::miette!("Path does not exist: {}", cli.path.display()));
    }
    let root = cli.path.canonicalize().into_diagnostic()?;

    let driver = LintDriver::builtin(config)?.with_progress(!cli.quiet);
    let report = driver.analyze_path(&root)?;

    let options = ReportOptions {
        output_path: cli.output.clone(),
        base_path: Some(root),
        top_n: cli.top,
        ..ReportOptions::new()
    };
    Reporter::with_options(cli.format.into(), options).report(&report)?;

    if !cli.quiet && !matches!(cli.format, OutputFormat::Json) {
        let elapsed = start_time.elapsed();
        eprintln!(
            "{}",
            format!(
                "⏱  Analyzed {} files in {:.2}s",
                report.files,
                elapsed.as_secs_f64()
            )
            .dimmed()
        );
    }

    Ok(report.has_errors())
}
