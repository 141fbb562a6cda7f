use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use feature_analyser::{
    Analyser, AnalyserConfig, AnalysisReport, ArtifactId, FileReportWriter, ReportFormat,
    ReportWriter, RepositoryScanner, TaskRegistry, read_feature,
};

/// Feature Analyser CLI: run analyser tasks against OSGi feature files
#[derive(Parser, Debug)]
#[command(name = "feature-analyser")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse one or more feature files
    #[command(name = "analyse")]
    Analyse {
        #[command(flatten)]
        args: AnalyseArgs,
    },

    /// List the available analyser tasks
    #[command(name = "tasks")]
    Tasks,
}

#[derive(Parser, Debug)]
struct AnalyseArgs {
    /// Feature file or glob pattern (repeatable)
    #[arg(short, long = "feature", required = true)]
    features: Vec<String>,

    /// Framework artifact to analyse against (e.g. "org.apache.felix:org.apache.felix.framework:7.0.5")
    #[arg(long)]
    framework: Option<String>,

    /// Local Maven repository to resolve artifacts from (repeatable)
    #[arg(short, long = "repository")]
    repositories: Vec<PathBuf>,

    /// Task id to run, "*" for all (repeatable)
    #[arg(long = "include")]
    includes: Vec<String>,

    /// Task id to skip (repeatable)
    #[arg(long = "exclude")]
    excludes: Vec<String>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for report files
    #[arg(long)]
    report_dir: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum)]
    format: Option<ReportFormat>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Analyse { args }) => handle_analyse_command(args).await,
        Some(Command::Tasks) => {
            for task in TaskRegistry::default().descriptions() {
                println!("{:<28} {}", task.id, task.name);
            }
            Ok(())
        }
        None => {
            eprintln!("No command specified. Use --help for usage information.");
            eprintln!("Example: feature-analyser analyse --feature my-feature.json");
            std::process::exit(1);
        }
    }
}

/// Expand feature globs into files, keeping the first occurrence of each
fn expand_feature_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let mut matched = false;
        for entry in glob::glob(pattern)
            .with_context(|| format!("Invalid feature pattern '{}'", pattern))?
        {
            let path = entry.context("Failed to read feature path")?;
            matched = true;
            if !files.contains(&path) {
                files.push(path);
            }
        }
        if !matched {
            anyhow::bail!("No feature files match '{}'", pattern);
        }
    }
    Ok(files)
}

/// Analyse one feature file. `Ok(false)` means tasks reported errors.
async fn analyse_file<R>(
    analyser: &Analyser<RepositoryScanner>,
    path: &Path,
    framework: Option<&ArtifactId>,
    writer: Option<&R>,
) -> Result<bool>
where
    R: ReportWriter,
{
    let feature = read_feature(path)
        .await
        .with_context(|| format!("Failed to read feature {:?}", path))?;

    let result = match analyser.analyse(&feature, framework).await {
        Ok(result) => result,
        Err(err) => {
            let Some(result) = err.result().cloned() else {
                return Err(err.into());
            };
            error!("{}", err);
            result
        }
    };

    if let Some(writer) = writer {
        let report = AnalysisReport::new(&feature.id, framework, analyser.tasks(), &result);
        writer.write_report(&report).await?;
    }

    Ok(result.is_success())
}

async fn handle_analyse_command(args: AnalyseArgs) -> Result<()> {
    // Set up logging
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("Feature analyser starting");

    // Load configuration
    let config_path = args.config.clone().or_else(AnalyserConfig::default_path);
    let mut config = AnalyserConfig::load_or_default(config_path.as_deref())?;

    // Apply CLI overrides
    if !args.repositories.is_empty() {
        config.repositories = args.repositories;
    }
    if let Some(framework) = &args.framework {
        config.framework = Some(
            ArtifactId::parse(framework)
                .with_context(|| format!("Invalid framework id '{}'", framework))?,
        );
    }
    if !args.includes.is_empty() {
        config.tasks.includes = args.includes;
    }
    if !args.excludes.is_empty() {
        config.tasks.excludes = args.excludes;
    }
    if let Some(dir) = args.report_dir {
        config.report.dir = Some(dir);
    }
    if let Some(format) = args.format {
        config.report.format = format;
    }

    let files = expand_feature_patterns(&args.features)?;
    info!("Features: {}", files.len());

    // Create components
    let registry = TaskRegistry::default();
    let scanner = RepositoryScanner::new(config.repository_roots());
    let analyser = Analyser::from_filter(
        scanner,
        &registry,
        config.tasks.includes.as_slice(),
        config.tasks.excludes.as_slice(),
    )?
    .with_task_configuration(config.tasks.configuration.clone());
    let writer = config.report.dir.clone().map(|dir| {
        FileReportWriter::new(dir, config.report.format)
            .with_template_dir(config.report.template_dir.clone())
    });

    let mut failed = Vec::new();
    for file in &files {
        match analyse_file(&analyser, file, config.framework.as_ref(), writer.as_ref()).await {
            Ok(true) => {}
            Ok(false) => failed.push(file),
            Err(e) => {
                error!("{:#}", e);
                failed.push(file);
            }
        }
    }

    println!("\n========================================");
    println!("Feature Analysis Complete!");
    println!("========================================");
    println!("Features analysed: {}", files.len());
    println!("Features failed: {}", failed.len());
    for file in &failed {
        println!("  - {}", file.display());
    }

    if !failed.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}
