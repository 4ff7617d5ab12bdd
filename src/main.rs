mod apply;
mod browser;
mod config;
mod db;
mod detail;
mod extract;
mod gate;
mod loader;
mod logger;
mod models;
mod pipeline;
mod profile;
mod rate;
mod scorer;
#[cfg(test)]
mod testing;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use browser::ListingPage;
use config::Settings;
use db::Database;
use pipeline::Pipeline;
use profile::CandidateProfile;
use rate::RateLimiter;
use scorer::ScorerKind;

#[derive(Parser)]
#[command(name = "jobpilot")]
#[command(about = "Browse job listings and quick-apply to strong matches", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the application history database
    Init,
    /// Browse a listing feed and apply to matching jobs
    Run {
        /// Listing feed URL to browse
        listing_url: String,
        /// Candidate profile JSON file
        #[arg(short, long)]
        profile: PathBuf,
        /// WebDriver endpoint
        #[arg(long, default_value = "http://localhost:9515")]
        webdriver_url: String,
        /// Stop after reviewing this many records
        #[arg(short, long, default_value_t = 25)]
        limit: u32,
        /// Listing pages to traverse at most
        #[arg(long)]
        pages: Option<u32>,
        /// Minimum match score required to apply (0.0-1.0)
        #[arg(long)]
        min_score: Option<f64>,
        /// Require the numeric score; a "yes" recommendation alone is not enough
        #[arg(long)]
        strict_score: bool,
        /// Review and score but never open the application wizard
        #[arg(long)]
        dry_run: bool,
    },
    /// Show application statistics
    Stats,
    /// Show recent application history
    History {
        /// Filter by status: submitted, abandoned, failed, skipped
        #[arg(short, long)]
        status: Option<String>,
        /// Rows to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => cmd_init(),
        Commands::Run {
            listing_url,
            profile,
            webdriver_url,
            limit,
            pages,
            min_score,
            strict_score,
            dry_run,
        } => {
            cmd_run(
                &listing_url,
                &profile,
                &webdriver_url,
                limit,
                pages,
                min_score,
                strict_score,
                dry_run,
            )
            .await
        }
        Commands::Stats => cmd_stats(),
        Commands::History { status, limit } => cmd_history(status.as_deref(), limit),
    }
}

fn cmd_init() -> Result<()> {
    let db = Database::open()?;
    db.init()?;
    println!("Database initialized at {}", db.path().display());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_run(
    listing_url: &str,
    profile_path: &std::path::Path,
    webdriver_url: &str,
    limit: u32,
    pages: Option<u32>,
    min_score: Option<f64>,
    strict_score: bool,
    dry_run: bool,
) -> Result<()> {
    let mut settings = Settings::from_env();
    if let Some(p) = pages {
        settings.max_pages = p;
    }
    if let Some(s) = min_score {
        settings.min_match_score = s.clamp(0.0, 1.0);
    }
    if strict_score {
        settings.recommendation_override = false;
    }
    if dry_run {
        settings.dry_run = true;
    }

    let db = Database::open()?;
    db.ensure_initialized()?;

    let profile = CandidateProfile::load(profile_path)?;
    let scorer = ScorerKind::from_env()?;
    info!("Scoring with the {} scorer", scorer.name());

    let used_today = db.applications_today()?;
    let limiter = RateLimiter::new(
        settings.daily_application_limit,
        used_today,
        settings.search_delay_secs,
        settings.apply_delay_secs,
    );
    if used_today > 0 {
        info!(
            "{used_today}/{} applications already submitted today",
            settings.daily_application_limit
        );
    }

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                println!("\nStopping after the current record...");
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }

    let driver = ListingPage::connect(webdriver_url)
        .await
        .context("failed to connect to the WebDriver endpoint")?;
    driver.goto(listing_url).await?;

    let pipeline = Pipeline::new(
        &driver, &scorer, &db, &profile, &settings, limiter, cancel, limit,
    );
    let result = pipeline.run().await;
    driver.quit().await?;
    let summary = result?;

    println!("\n=== Run Summary ===");
    println!("Pages browsed:  {}", summary.pages);
    println!("Jobs reviewed:  {}", summary.reviewed);
    if settings.dry_run {
        println!("Would apply to: {}", summary.applied);
    } else {
        println!("Applied:        {}", summary.applied);
    }
    println!("Skipped:        {}", summary.skipped);
    println!("Failed:         {}", summary.failed);
    if summary.daily_limit_hit {
        println!("Daily application limit reached.");
    }
    if summary.cancelled {
        println!("Run cancelled by user.");
    }
    Ok(())
}

fn cmd_stats() -> Result<()> {
    let db = Database::open()?;
    db.ensure_initialized()?;
    let stats = db.stats()?;

    println!("=== Application Stats ===");
    println!("Total records: {}", stats.total);
    for (status, count) in &stats.by_status {
        println!("  {status:<10} {count}");
    }
    if let Some(avg) = stats.average_score {
        println!("Average match score (submitted): {avg:.2}");
    }
    if !stats.top_companies.is_empty() {
        println!("Top companies:");
        for (company, count) in &stats.top_companies {
            println!("  {} ({count})", truncate(company, 40));
        }
    }
    Ok(())
}

fn cmd_history(status: Option<&str>, limit: usize) -> Result<()> {
    let db = Database::open()?;
    db.ensure_initialized()?;
    let rows = db.list_outcomes(status, limit)?;

    if rows.is_empty() {
        println!("No application history.");
        return Ok(());
    }

    println!(
        "{:<20} {:<30} {:<25} {:<10} {:>5}",
        "Date", "Title", "Company", "Status", "Score"
    );
    println!("{}", "-".repeat(95));
    for row in rows {
        println!(
            "{:<20} {:<30} {:<25} {:<10} {:>5.2}",
            truncate(&row.applied_at, 19),
            truncate(&row.title, 29),
            truncate(&row.company, 24),
            row.status.as_str(),
            row.score,
        );
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
