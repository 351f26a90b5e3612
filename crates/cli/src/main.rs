use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use doc_a11y_core::config::{
    audit_options_from_config, config_path, load_config, remediate_options_from_config, AppConfig,
};
use doc_a11y_core::issue::{IssueType, Severity};
use doc_a11y_core::pipeline;
use doc_a11y_core::report::BatchReport;

#[derive(Parser)]
#[command(name = "doc-a11y")]
#[command(about = "Audit and remediate accessibility issues in converted HTML documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit HTML for WCAG issues without modifying it
    Audit {
        /// Input HTML file or directory of page files
        #[arg(required = true)]
        input: String,

        /// Write the full report to a JSON file
        #[arg(short, long)]
        output: Option<String>,

        /// Include checks that already pass
        #[arg(long)]
        include_compliant: bool,

        /// Minimum severity to report (info, minor, major, critical)
        #[arg(long)]
        severity: Option<String>,

        /// Exit non-zero when issues are found
        #[arg(long)]
        strict: bool,
    },

    /// Audit and fix HTML documents
    Remediate {
        /// Input HTML file(s) or directories
        #[arg(required = true)]
        input: Vec<String>,

        /// Output file (single input) or directory
        #[arg(short, long)]
        output: Option<String>,

        /// Conversion metadata JSON with element geometry
        #[arg(long)]
        metadata: Option<String>,

        /// Directory holding the document's extracted images
        #[arg(long)]
        images: Option<String>,

        /// Stop after this many issues
        #[arg(long)]
        max_issues: Option<usize>,

        /// Only fix these issue types (repeatable)
        #[arg(long = "type")]
        issue_types: Vec<String>,

        /// Minimum severity to fix (info, minor, major, critical)
        #[arg(long)]
        severity: Option<String>,

        /// Report what would change without touching the documents
        #[arg(long)]
        report_only: bool,

        /// Skip fixes that need text generation
        #[arg(long)]
        no_ai: bool,

        /// Text generation endpoint URL
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Initialize default config file
    Init,
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Key (dot-separated path)
        key: String,
        /// Value
        value: String,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let result = match &cli.command {
        Commands::Audit { input, output, include_compliant, severity, strict } => {
            run_audit(input, output.as_deref(), *include_compliant, severity.as_deref(), *strict, cli.json)
        }
        Commands::Remediate { input, output, metadata, images, max_issues, issue_types, severity, report_only, no_ai, endpoint } => run_remediate(
            input,
            output.as_deref(),
            metadata.as_deref(),
            images.as_deref(),
            *max_issues,
            issue_types,
            severity.as_deref(),
            *report_only,
            *no_ai,
            endpoint.as_deref(),
            cli.json,
        ),
        Commands::Config { action } => run_config(action, cli.json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_audit(
    input: &str,
    output: Option<&str>,
    include_compliant: bool,
    severity: Option<&str>,
    strict: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut options = audit_options_from_config(&load_config());
    if include_compliant {
        options.include_compliant = true;
    }
    if let Some(s) = severity {
        options.severity_threshold = Some(Severity::parse(s));
    }

    let report = pipeline::audit_path(Path::new(input), &options)?;

    if let Some(out) = output {
        report.save(Path::new(out))?;
        if !json {
            println!("Wrote report to {}", out);
        }
    }

    if json {
        println!("{}", report.to_json()?);
    } else {
        for issue in &report.issues {
            println!(
                "[{}] page {} {}: {}",
                issue.severity.as_str(),
                issue.page_number(),
                issue.wcag_criterion.as_deref().unwrap_or("-"),
                issue.message.as_deref().unwrap_or("")
            );
        }
        let s = &report.summary;
        println!(
            "{} issue(s): {} need remediation, {} compliant",
            s.total, s.needs_remediation, s.compliant
        );
    }

    if strict && report.summary.needs_remediation > 0 {
        return Err(format!(
            "audit found {} issue(s) needing remediation",
            report.summary.needs_remediation
        )
        .into());
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_remediate(
    inputs: &[String],
    output: Option<&str>,
    metadata: Option<&str>,
    images: Option<&str>,
    max_issues: Option<usize>,
    issue_types: &[String],
    severity: Option<&str>,
    report_only: bool,
    no_ai: bool,
    endpoint: Option<&str>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut options = remediate_options_from_config(&load_config());
    if report_only {
        options.auto_fix = false;
    }
    if let Some(n) = max_issues {
        options.max_issues = Some(n);
    }
    if !issue_types.is_empty() {
        options.issue_types = issue_types.iter().map(|t| IssueType::parse(t)).collect();
    }
    if let Some(s) = severity {
        options.severity_threshold = Some(Severity::parse(s));
    }
    if no_ai {
        options.disable_ai = true;
    }
    if let Some(url) = endpoint {
        options.endpoint = Some(url.to_string());
    }
    options.image_dir = images.map(PathBuf::from);

    let mut batch = BatchReport::default();
    let progress = if !json && inputs.len() > 1 {
        let bar = indicatif::ProgressBar::new(inputs.len() as u64);
        bar.set_style(
            indicatif::ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar()),
        );
        Some(bar)
    } else {
        None
    };

    for input in inputs {
        let path = Path::new(input);
        if let Some(bar) = &progress {
            bar.set_message(input.clone());
        }
        if !path.exists() {
            eprintln!("Input not found: {}", path.display());
            batch.push_failure(input.clone(), "input not found".to_string());
        } else if path.is_dir() {
            let sub = pipeline::remediate_dir(path, output.map(Path::new), &options)?;
            batch.documents.extend(sub.documents);
        } else {
            let out = output_for(path, output, inputs.len());
            match pipeline::remediate_file(path, out.as_deref(), metadata.map(Path::new), &options)
            {
                Ok((summary, written)) => batch.push_success(input.clone(), summary, Some(written)),
                Err(e) => {
                    eprintln!("Failed: {}: {}", input, e);
                    batch.push_failure(input.clone(), e.to_string());
                }
            }
        }
        if let Some(bar) = &progress {
            bar.inc(1);
        }
    }
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    if json {
        println!("{}", batch.to_json()?);
    } else {
        for doc in &batch.documents {
            if let Some(summary) = &doc.summary {
                let c = &summary.counts;
                println!(
                    "{}: {} processed, {} remediated, {} skipped, {} failed",
                    doc.document, c.processed, c.remediated, c.skipped, c.failed
                );
            }
        }
        if batch.failed() > 0 {
            println!("{} document(s) failed", batch.failed());
        }
    }

    if batch.succeeded() == 0 && batch.failed() > 0 {
        return Err("no documents were remediated".into());
    }
    Ok(())
}

/// A file output path only applies when exactly one file input was given;
/// otherwise it names a directory.
fn output_for(input: &Path, output: Option<&str>, input_count: usize) -> Option<PathBuf> {
    let out = Path::new(output?);
    if input_count == 1 && !out.is_dir() {
        Some(out.to_path_buf())
    } else {
        let name = input.file_name()?;
        Some(out.join(name))
    }
}

fn run_config(
    action: &ConfigAction,
    json: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match action {
        ConfigAction::Init => {
            let path = config_path().ok_or("Could not determine config directory")?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let default_cfg = AppConfig::default();
            let toml = toml::to_string_pretty(&default_cfg)?;
            std::fs::write(&path, toml)?;
            println!("Wrote default config to {}", path.display());
        }
        ConfigAction::Show => {
            let cfg = load_config();
            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else {
                println!("{}", toml::to_string_pretty(&cfg)?);
            }
        }
        ConfigAction::Set { key, value } => {
            let path = config_path().ok_or("Could not determine config directory")?;
            let mut cfg: AppConfig = if path.exists() {
                let s = std::fs::read_to_string(&path)?;
                toml::from_str(&s).unwrap_or_default()
            } else {
                AppConfig::default()
            };

            set_config_key(&mut cfg, key, value)?;

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let toml = toml::to_string_pretty(&cfg)?;
            std::fs::write(&path, toml)?;
            if !json {
                println!("Updated {}", key);
            }
        }
    }
    Ok(())
}

fn set_config_key(
    cfg: &mut AppConfig,
    key: &str,
    value: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let parts: Vec<&str> = key.splitn(2, '.').collect();
    match parts.as_slice() {
        ["audit", sub] => match *sub {
            "include_compliant" => cfg.audit.include_compliant = value.parse()?,
            "severity_threshold" => cfg.audit.severity_threshold = Some(value.to_string()),
            _ => return Err(format!("Unknown key: {}", key).into()),
        },
        ["remediate", sub] => match *sub {
            "auto_fix" => cfg.remediate.auto_fix = value.parse()?,
            "max_issues" => cfg.remediate.max_issues = value.parse().ok(),
            "severity_threshold" => cfg.remediate.severity_threshold = Some(value.to_string()),
            "language" => cfg.remediate.language = value.to_string(),
            _ => return Err(format!("Unknown key: {}", key).into()),
        },
        ["generation", sub] => match *sub {
            "endpoint" => cfg.generation.endpoint = Some(value.to_string()),
            "model_id" => cfg.generation.model_id = value.to_string(),
            "disable" => cfg.generation.disable = value.parse()?,
            _ => return Err(format!("Unknown key: {}", key).into()),
        },
        _ => return Err(format!("Unknown key: {}", key).into()),
    }
    Ok(())
}
