use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use startup_trending::config::AppConfig;
use startup_trending::models::{CompanyTrending, SectorTrend};
use startup_trending::pipeline::Pipeline;
use startup_trending::storage::Repository;
use startup_trending::trending::{get_top_trending, get_trending_by_category, get_trending_sectors};
use startup_trending::utils;

#[derive(Parser)]
#[command(name = "startup-trending", about = "Trending scores for security startups", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Bulk-load company and investor CSV files
    LoadCsv {
        /// Directory containing CSV files (default: loader.data_dir)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Score every company and record the run in score history
    Score {
        #[arg(short, long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },

    /// Show the highest-scoring companies (nothing is recorded)
    Top {
        #[arg(short, long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },

    /// Show top companies whose category contains NAME (case-insensitive)
    Category {
        name: String,
        #[arg(short, long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },

    /// Aggregate scores by sector
    Sectors {
        #[arg(long)]
        json: bool,
    },

    /// Show database statistics
    Stats,

    /// Apply schema migrations without loading data
    Migrate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "startup_trending=info,warn",
        1 => "startup_trending=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;
    let default_limit = config.scoring.default_limit;

    match cli.command {
        Command::LoadCsv { dir } => {
            let _t = utils::Timer::start("CSV bulk load");
            let dir = dir.unwrap_or_else(|| config.loader.data_dir.clone());
            let stats = Pipeline::new(config)?.import(&dir)?;
            info!(
                "Done: {} companies, {} investor rows, {} errors",
                stats.companies, stats.investor_rows, stats.errors
            );
        }

        Command::Score { limit, json } => {
            let _t = utils::Timer::start("Scoring run");
            let outcome = Pipeline::new(config)?.run()?;
            let top = get_top_trending(&outcome.ranked, limit.unwrap_or(default_limit));
            print_companies(&top, json)?;
        }

        Command::Top { limit, json } => {
            let ranked = Pipeline::new(config)?.evaluate()?;
            print_companies(&get_top_trending(&ranked, limit.unwrap_or(default_limit)), json)?;
        }

        Command::Category { name, limit, json } => {
            let ranked = Pipeline::new(config)?.evaluate()?;
            let matches = get_trending_by_category(&ranked, &name, limit.unwrap_or(default_limit));
            if matches.is_empty() && !json {
                println!("No companies in a category matching {:?}.", name);
            } else {
                print_companies(&matches, json)?;
            }
        }

        Command::Sectors { json } => {
            let ranked = Pipeline::new(config)?.evaluate()?;
            print_sectors(&get_trending_sectors(&ranked), json)?;
        }

        Command::Stats => {
            let repo = Repository::open(&config.storage.db_path)?;
            repo.run_migrations()?;
            let stats = repo.stats()?;
            println!("─────────────────────────────────");
            println!("  Startup Trending — Database Stats");
            println!("─────────────────────────────────");
            println!("  Companies  : {}", utils::fmt_number(stats.companies));
            println!("  Categories : {}", utils::fmt_number(stats.categories));
            println!("  Funding    : {}", utils::fmt_funding(stats.total_funding));
            println!("  Scores     : {}", utils::fmt_number(stats.scores));
            let last = stats.last_scored_at.map(|d| d.to_string()).unwrap_or("—".into());
            println!("  Last run   : {}", last);
            println!("─────────────────────────────────");
        }

        Command::Migrate => {
            Repository::open(&config.storage.db_path)?.run_migrations()?;
            println!("Migrations applied.");
        }
    }

    Ok(())
}

fn print_companies(companies: &[CompanyTrending], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(companies)?);
        return Ok(());
    }
    if companies.is_empty() {
        println!("No companies — run `startup-trending load-csv` first.");
        return Ok(());
    }

    println!("{:>4}  {:<28} {:<22} {:>5}  {:>8}", "#", "Company", "Category", "Score", "Change");
    for c in companies {
        println!(
            "{:>4}  {:<28} {:<22} {:>5}  {} {:>5.1}%",
            c.rank,
            truncate(&c.name, 28),
            truncate(&c.category, 22),
            c.trending_score,
            c.trend_direction.arrow(),
            c.percentage_change,
        );
    }
    Ok(())
}

fn print_sectors(sectors: &[SectorTrend], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(sectors)?);
        return Ok(());
    }
    println!("{:<24} {:>7} {:>9}  {}", "Sector", "Avg", "Companies", "Leader");
    for s in sectors {
        println!(
            "{:<24} {:>7} {:>9}  {}",
            truncate(&s.sector, 24),
            s.average_trending_score,
            s.company_count,
            s.top_company
        );
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
