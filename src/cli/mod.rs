pub mod output;
pub mod shutdown;
pub mod track;

use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, SeedableRng};
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;

use crate::{
    storage::{
        entities::{Category, SubjectId},
        entry_storage::FileEntryStorage,
    },
    tracker::{
        aggregation::{Period, WindowPolicy},
        ActivityTracker,
    },
    utils::{clock::DefaultClock, dir::resolve_app_dir, logging::enable_logging},
};

#[derive(Parser, Debug)]
#[command(name = "career-tally", version, long_about = None)]
#[command(about = "Tracks time spent on career activities", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        env = "CAREER_TALLY_DIR",
        help = "Application directory. By default $XDG_STATE_HOME/career-tally or $HOME/.local/state/career-tally"
    )]
    dir: Option<PathBuf>,
    #[arg(long, help = "Print logs to the console")]
    log: bool,
    #[arg(long = "log-filter", help = "Log level, RUST_LOG is used when missing")]
    log_filter: Option<LevelFilter>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Track a category until Ctrl-C is pressed")]
    Track {
        subject: SubjectId,
        category: Category,
        #[arg(long, help = "Stop automatically after this many minutes")]
        limit: Option<u64>,
    },
    #[command(about = "Add minutes to today's total of a category")]
    Record {
        subject: SubjectId,
        category: Category,
        minutes: u32,
    },
    #[command(about = "Show day by day minutes")]
    Series {
        subject: SubjectId,
        #[arg(long, default_value_t = WindowPolicy::Trailing7)]
        window: WindowPolicy,
        #[arg(long, help = "Print JSON instead of a table")]
        json: bool,
    },
    #[command(about = "Show minutes spent during a period")]
    Total {
        subject: SubjectId,
        #[arg(long, default_value_t = Period::Today)]
        period: Period,
        #[arg(long = "by-category", help = "Split the total by category")]
        by_category: bool,
    },
    #[command(about = "Create a synthetic week of activity for a subject without history")]
    Seed {
        subject: SubjectId,
        #[arg(long = "rng-seed", help = "Seed for reproducible data")]
        rng_seed: Option<u64>,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = resolve_app_dir(args.dir)?;
    enable_logging(&app_dir, args.log_filter, args.log)?;

    let storage = FileEntryStorage::new(app_dir.join("entries"))?;
    let tracker = ActivityTracker::new(storage, Box::new(DefaultClock));

    match args.commands {
        Commands::Track {
            subject,
            category,
            limit,
        } => {
            let shutdown = CancellationToken::new();
            tokio::spawn(shutdown::detect_shutdown(shutdown.clone()));
            println!("Tracking {category} for {subject}, press Ctrl-C to stop");
            let limit = limit.map(limit_duration);
            let minutes =
                track::track_until_stopped(&tracker, &subject, category, limit, shutdown).await;
            println!("Recorded {}", output::format_minutes(minutes));
            Ok(())
        }
        Commands::Record {
            subject,
            category,
            minutes,
        } => {
            tracker.record_time_spent(&subject, category, minutes).await;
            Ok(())
        }
        Commands::Series {
            subject,
            window,
            json,
        } => {
            let series = tracker.daily_series(&subject, window).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&series)?);
            } else {
                print!("{}", output::series_table(&series));
            }
            Ok(())
        }
        Commands::Total {
            subject,
            period,
            by_category,
        } => {
            let totals = tracker.category_totals(&subject, period).await;
            if by_category {
                print!("{}", output::category_breakdown(&totals));
            } else {
                println!("{}", output::format_minutes(totals.total()));
            }
            Ok(())
        }
        Commands::Seed { subject, rng_seed } => {
            let mut rng = match rng_seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            if tracker.seed_if_empty(&subject, &mut rng).await? {
                println!("Seeded a week of activity for {subject}");
            } else {
                println!("{subject} already has history, nothing to seed");
            }
            Ok(())
        }
    }
}

/// Converts `--limit` minutes. Absurdly large limits saturate instead of wrapping.
fn limit_duration(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}
