//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use llmstxt_artifacts::validate_manifest;
use llmstxt_core::{GenerationOutcome, PatchOutcome, ProgressReporter};
use llmstxt_extract::Strategy;
use llmstxt_shared::{AppConfig, DEFAULT_CONFIG_FILE, GeneratorConfig, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// llmstxt: publish an `llms.txt` manifest for your site.
#[derive(Parser)]
#[command(
    name = "llmstxt",
    version,
    about = "Generate an llms.txt manifest from a CMS API, a content tree, or a sitemap.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file to use.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, env = "LLMSTXT_CONFIG", global = true)]
    pub config: PathBuf,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract content and write the manifest (skipped when nothing changed).
    Generate {
        /// Regenerate even if the content hash matches the cache.
        #[arg(long)]
        force: bool,
    },

    /// Extract and rank content without writing anything.
    Preview,

    /// Check an existing manifest for structural problems.
    Validate {
        /// Manifest file to check.
        file: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a config file with defaults.
    Init,
    /// Show the resolved configuration.
    Show,
    /// Validate the configuration and the selected extractor's settings.
    Check,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "llmstxt=info",
        1 => "llmstxt=debug",
        _ => "llmstxt=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate { force } => cmd_generate(&cli.config, force).await,
        Command::Preview => cmd_preview(&cli.config).await,
        Command::Validate { file } => cmd_validate(&file),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(&cli.config),
            ConfigAction::Show => cmd_config_show(&cli.config),
            ConfigAction::Check => cmd_config_check(&cli.config),
        },
    }
}

fn resolve_config(path: &Path) -> Result<GeneratorConfig> {
    let app = load_config(path)?;
    Ok(GeneratorConfig::try_from(&app)?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_generate(config_path: &Path, force: bool) -> Result<()> {
    let config = resolve_config(config_path)?;
    info!(
        site = %config.site_url,
        extractor = config.extractor.as_str(),
        force,
        "generating manifest"
    );

    let reporter = CliProgress::new();
    let outcome = llmstxt_core::generate(&config, force, &reporter).await;
    reporter.finish();
    let outcome = outcome?;

    println!();
    match outcome {
        GenerationOutcome::Generated {
            path,
            items,
            skipped,
            siblings,
            elapsed,
            ..
        } => {
            println!("  Manifest generated!");
            println!("  Path:    {}", path.display());
            println!("  Items:   {items}");
            println!("  Skipped: {skipped}");
            for outcome in &siblings {
                println!("  {}", describe_patch(outcome));
            }
            println!("  Time:    {:.1}s", elapsed.as_secs_f64());
        }
        GenerationOutcome::Unchanged { items, .. } => {
            println!("  No changes detected ({items} items); manifest left as is.");
            println!("  Use --force to regenerate anyway.");
        }
        GenerationOutcome::NoContent { skipped } => {
            return Err(eyre!(
                "no content found ({skipped} units skipped); manifest not written"
            ));
        }
    }
    println!();

    Ok(())
}

async fn cmd_preview(config_path: &Path) -> Result<()> {
    let config = resolve_config(config_path)?;
    let reporter = CliProgress::new();
    let preview = llmstxt_core::preview(&config, &reporter).await;
    reporter.finish();
    let preview = preview?;

    println!();
    println!(
        "  {} items from {} ({} skipped)",
        preview.records.len(),
        config.extractor.as_str(),
        preview.skipped.len()
    );
    println!();
    for record in &preview.records {
        let words = record
            .word_count()
            .map_or_else(String::new, |n| format!(", {n} words"));
        println!("  - {} [{}{words}]", record.title(), record.content_type());
        println!("    {}", record.url());
    }
    println!();

    Ok(())
}

fn cmd_validate(file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| eyre!("cannot read '{}': {e}", file.display()))?;
    let report = validate_manifest(&content);

    if report.is_valid() {
        println!("{}: valid ({} entries)", file.display(), report.entries);
        return Ok(());
    }

    println!("{}: {} entries", file.display(), report.entries);
    for issue in &report.issues {
        println!("  - {issue}");
    }
    Err(eyre!("manifest has {} issue(s)", report.issues.len()))
}

fn cmd_config_init(path: &Path) -> Result<()> {
    init_config(path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: &Path) -> Result<()> {
    let config: AppConfig = load_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn cmd_config_check(path: &Path) -> Result<()> {
    let config = resolve_config(path)?;
    Strategy::from_config(&config).validate(&config)?;

    println!("Configuration OK");
    println!("  Extractor: {}", config.extractor.as_str());
    println!("  Manifest:  {}", config.output_path.display());
    println!("  URL:       {}", config.manifest_url());
    Ok(())
}

fn describe_patch(outcome: &PatchOutcome) -> String {
    match outcome {
        PatchOutcome::Updated { path, backup } => match backup {
            Some(backup) => format!(
                "Updated: {} (backup {})",
                path.display(),
                backup.display()
            ),
            None => format!("Updated: {}", path.display()),
        },
        PatchOutcome::Created { path } => format!("Created: {}", path.display()),
        PatchOutcome::AlreadyPresent { path } => format!("Up to date: {}", path.display()),
        PatchOutcome::Skipped { path, reason } => {
            format!("Skipped: {} ({reason})", path.display())
        }
        PatchOutcome::NoCandidate => "No sitemap found; skipped".to_string(),
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _outcome: &GenerationOutcome) {
        self.finish();
    }
}
