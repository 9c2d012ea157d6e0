//! Toolbox CLI
//!
//! Runs discovery over module roots from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Discover tools under two roots
//! toolbox discover /opt/acme/modules ./build/modules
//!
//! # Only scan child directories starting with "Acme", JSON output
//! toolbox discover --prefix Acme --json /opt/vendor
//!
//! # Fail the build when any module could not be read or resolved
//! toolbox discover --strict ./build/modules
//!
//! # List module files only
//! toolbox modules /opt/acme/modules
//!
//! # Write a default configuration file
//! toolbox init
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use toolbox_core::config::ConfigLevel;
use toolbox_core::logging::LogLevel;
use toolbox_core::{
    CancellationToken, ConfigProvider, ConsoleLogger, DiscoveryConfig, DiscoveryEngine,
    DiscoveryResult, FileConfigProvider, Logger, MemoryToolRegistry, ModuleRoot,
    TraversalPolicy,
};

/// Discover toolbox items in module trees
#[derive(Parser, Debug)]
#[command(name = "toolbox")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover descriptors under the given roots
    Discover(DiscoverArgs),
    /// List module files under the given roots
    Modules(RootArgs),
    /// Write a configuration file with default settings
    Init {
        /// Target file (default: the user configuration file)
        #[arg(long, value_name = "FILE")]
        path: Option<PathBuf>,

        /// Overwrite an existing file, keeping a backup
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct RootArgs {
    /// Module roots; defaults to the roots in the configuration
    #[arg(value_name = "ROOT")]
    roots: Vec<PathBuf>,

    /// Configuration file (default: .config/toolbox/config.yaml, then the user file)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Scan only child directories of each root whose names start with PREFIX
    #[arg(long)]
    prefix: Option<String>,

    /// Module file extension
    #[arg(long)]
    extension: Option<String>,

    /// Skip unreadable subdirectories instead of failing
    #[arg(long)]
    skip_unreadable: bool,

    /// Show debug output
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Args, Debug)]
struct DiscoverArgs {
    #[command(flatten)]
    roots: RootArgs,

    /// Accept tool types that are not publicly visible
    #[arg(long)]
    allow_non_public: bool,

    /// Load modules in parallel on the blocking pool
    #[arg(long)]
    concurrent: bool,

    /// Install into an in-memory registry and print the report
    #[arg(long)]
    dry_run_install: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Exit with failure when the pass produced diagnostics
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let outcome = match cli.command {
        Command::Discover(args) => discover(args).await,
        Command::Modules(args) => modules(args).await,
        Command::Init { path, force } => init(path, force).await,
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn load_config(args: &RootArgs) -> Result<DiscoveryConfig> {
    let provider = match &args.config {
        Some(path) => FileConfigProvider::new(path, ConfigLevel::User),
        None => {
            let cwd = std::env::current_dir().context("failed to read current directory")?;
            let workspace = FileConfigProvider::workspace(cwd);
            if workspace.exists() {
                workspace
            } else {
                FileConfigProvider::user()
            }
        }
    };

    if args.verbose {
        eprintln!(
            "Using {} configuration {}",
            provider.level().as_str(),
            provider.path().display()
        );
    }

    let mut config = provider
        .load()
        .await
        .with_context(|| format!("failed to load {}", provider.path().display()))?;

    if !args.roots.is_empty() {
        config.roots = args
            .roots
            .iter()
            .map(|path| match &args.prefix {
                Some(prefix) => ModuleRoot::new(path).with_prefix(prefix),
                None => ModuleRoot::new(path),
            })
            .collect();
    } else if let Some(prefix) = &args.prefix {
        for root in &mut config.roots {
            root.name_prefix = Some(prefix.clone());
        }
    }
    if let Some(extension) = &args.extension {
        config.module_extension = extension.clone();
    }
    if args.skip_unreadable {
        config.traversal = TraversalPolicy::Skip;
    }
    Ok(config)
}

fn logger(verbose: bool, quiet: bool) -> Arc<dyn Logger> {
    let level = if verbose {
        LogLevel::Debug
    } else if quiet {
        LogLevel::Warn
    } else {
        LogLevel::Info
    };
    Arc::new(ConsoleLogger::new().with_level(level))
}

async fn discover(args: DiscoverArgs) -> Result<ExitCode> {
    let mut config = load_config(&args.roots).await?;
    if args.allow_non_public {
        config.allow_non_public = true;
    }
    config.validate().context("invalid configuration")?;
    if config.roots.is_empty() {
        eprintln!("No roots to scan. Pass roots or set them in the configuration.");
        return Ok(ExitCode::FAILURE);
    }

    let engine = Arc::new(DiscoveryEngine::new(
        &config,
        logger(args.roots.verbose, args.json),
    ));
    let result = if args.concurrent {
        Arc::clone(&engine)
            .discover_concurrent(config.roots.clone(), CancellationToken::new())
            .await?
    } else {
        engine.discover(&config.roots)?
    };

    let report = if args.dry_run_install {
        let registry = MemoryToolRegistry::new();
        Some(engine.install(&result, &registry).await)
    } else {
        None
    };

    if args.json {
        let output = serde_json::json!({
            "result": &result,
            "install": &report,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_result(&result);
        if let Some(report) = &report {
            println!("\n{}", report);
            for failure in &report.failures {
                println!("  {}: {}", failure.tool_type, failure.error);
            }
        }
    }

    for diagnostic in result.diagnostics() {
        eprintln!("warning: {}", diagnostic);
    }
    if fails_strict(&result, args.strict) {
        eprintln!("{} diagnostics in strict mode", result.diagnostics().len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn fails_strict(result: &DiscoveryResult, strict: bool) -> bool {
    strict && !result.diagnostics().is_empty()
}

fn print_result(result: &DiscoveryResult) {
    if result.is_empty() {
        println!("No toolbox items found.");
        return;
    }
    for module in result.modules() {
        println!("{}", module);
        for descriptor in result.from_module(module) {
            let packaging = if descriptor.packaging_type == descriptor.tool_type {
                String::new()
            } else {
                format!(" via {}", descriptor.packaging_type)
            };
            println!(
                "  [{}] {} ({}){}",
                descriptor.group_label(),
                descriptor.display_name,
                descriptor.tool_type,
                packaging
            );
        }
    }
    println!("\n{} items", result.len());
}

async fn modules(args: RootArgs) -> Result<ExitCode> {
    let config = load_config(&args).await?;
    let engine = DiscoveryEngine::new(&config, logger(args.verbose, false));

    let mut count = 0;
    for dir in engine.expand_roots(&config.roots)? {
        let mut scan = engine.scanner().scan(&dir)?;
        for path in scan.by_ref() {
            println!("{}", path?.display());
            count += 1;
        }
        for skipped in scan.skipped() {
            eprintln!("warning: {}", skipped);
        }
    }

    if args.verbose {
        eprintln!("{} modules", count);
    }
    Ok(ExitCode::SUCCESS)
}

async fn init(path: Option<PathBuf>, force: bool) -> Result<ExitCode> {
    let provider = match path {
        Some(path) => FileConfigProvider::new(path, ConfigLevel::User),
        None => FileConfigProvider::user(),
    };

    if provider.exists() {
        if !force {
            eprintln!(
                "{} already exists; pass --force to overwrite",
                provider.path().display()
            );
            return Ok(ExitCode::FAILURE);
        }
        if let Some(backup) = provider.backup()? {
            println!("Backed up to {}", backup.display());
        }
    }

    provider.save(&DiscoveryConfig::default()).await?;
    println!("Wrote {}", provider.path().display());
    Ok(ExitCode::SUCCESS)
}
