use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use typecleanup::{
    split_path_list, CleanupReport, Config, ContentRepository, Session, TypeCleanupService,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "List and remove content nodes whose resource type no longer exists",
    long_about = None
)]
struct Cli {
    /// JSON content file holding the repository
    #[arg(long, short)]
    content: PathBuf,

    /// TOML configuration with inclusions and exclusions
    #[arg(long)]
    config: Option<PathBuf>,

    /// Resource type prefix to check (repeatable)
    #[arg(long = "include", short = 'i')]
    include: Vec<String>,

    /// Resource type prefix never to check (repeatable)
    #[arg(long = "exclude", short = 'x')]
    exclude: Vec<String>,

    /// Show debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List obsolete nodes
    Report(Target),

    /// List obsolete nodes, then remove them
    Clean {
        #[command(flatten)]
        target: Target,

        /// Only list what would be removed
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(clap::Args, Debug)]
struct Target {
    /// Root of the subtree to check
    #[arg(required_unless_present = "paths", conflicts_with = "paths")]
    root: Option<String>,

    /// Comma-separated paths to check instead of a subtree
    #[arg(long)]
    paths: Option<String>,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "typecleanup=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => Config::default(),
    };
    config.inclusions.extend(cli.include.iter().cloned());
    config.exclusions.extend(cli.exclude.iter().cloned());
    config.validate()?;
    Ok(config)
}

fn build_report(
    service: &TypeCleanupService<ContentRepository>,
    repo: &ContentRepository,
    target: &Target,
) -> Result<CleanupReport> {
    if let Some(list) = &target.paths {
        let paths = split_path_list(list);
        return Ok(service.build_report_from_paths(paths.as_slice())?);
    }

    let Some(root_path) = target.root.as_deref() else {
        bail!("no path provided");
    };
    let Some(root) = repo.session().get_node(root_path)? else {
        bail!("No node at {}", root_path);
    };
    Ok(service.build_report(root)?)
}

fn clean(
    service: &TypeCleanupService<ContentRepository>,
    repo: &ContentRepository,
    report: &CleanupReport,
) -> Result<()> {
    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .context("Invalid progress template")?,
    );
    progress.set_message(format!(
        "Removing {} obsolete nodes...",
        report.obsolete_paths.len()
    ));
    progress.enable_steady_tick(Duration::from_millis(100));

    let mut session = repo.session();
    let result = service.cleanup(&mut session, report);
    progress.finish_and_clear();

    match result {
        Ok(outcome) => {
            println!(
                "{}",
                format!(
                    "removed {} obsolete nodes ({} already gone, {} commits)",
                    outcome.deleted, outcome.skipped, outcome.commits
                )
                .green()
            );
            Ok(())
        }
        Err(err) => {
            let removed = err.removed().unwrap_or(0);
            println!(
                "{}",
                format!("Cleanup stopped after removing {} nodes", removed)
                    .bold()
                    .red()
            );
            Err(anyhow::Error::new(err).context("Cleanup failed, run it again to resume"))
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    let repo = ContentRepository::open(&cli.content)
        .with_context(|| format!("Failed to open content {}", cli.content.display()))?;
    let service = TypeCleanupService::new(repo.clone(), &config);

    if !service.is_configured() {
        println!("not configured.");
        return Ok(());
    }

    match &cli.command {
        Command::Report(target) => {
            let report = build_report(&service, &repo, target)?;
            print!("{}", report);
            println!("done.");
        }
        Command::Clean { target, dry_run } => {
            let report = build_report(&service, &repo, target)?;
            print!("{}", report);
            if *dry_run {
                println!("Dry run mode: no nodes were removed.");
            } else if report.is_empty() {
                println!("Nothing to remove.");
            } else {
                clean(&service, &repo, &report)?;
            }
        }
    }

    Ok(())
}
