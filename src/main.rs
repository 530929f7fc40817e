use anyhow::Context;
use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use recall_scheduler::export::json::{export_json_to_path, import_into, import_json};
use recall_scheduler::models::sm2::format_interval;
use recall_scheduler::{ScheduleRecord, Scheduler, SchedulerConfig, SqliteStore};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "recall", about = "SM-2 review scheduler", version)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database (overrides the config file)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Learner whose schedules are used
    #[arg(long, global = true, default_value = "default")]
    learner: String,

    /// Date to treat as today, YYYY-MM-DD (default: local date)
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Record a review of an item
    Review {
        item: String,
        /// Recall quality, 1 (forgot) to 5 (perfect)
        quality: String,
    },

    /// List due and upcoming items
    Due,

    /// Show schedule statistics
    Stats,

    /// Show the interval each rating would give an item
    Preview { item: String },

    /// Delete an item's schedule
    Remove { item: String },

    /// Export schedules to a JSON file
    Export { path: PathBuf },

    /// Import schedules from a JSON file
    Import { path: PathBuf },
}

fn print_record(record: &ScheduleRecord) {
    println!(
        "{:<24} next {}  interval {:>4}  ease {:.2}  reps {}",
        record.item_id,
        record.next_review_date,
        format_interval(record.interval),
        record.ease_factor,
        record.repetitions
    );
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut config = SchedulerConfig::load_or_default(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database_path = database;
    }
    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
    let json = matches!(cli.format, OutputFormat::Json);

    let store = SqliteStore::open(&config.database_path, config.busy_timeout())
        .with_context(|| format!("opening {}", config.database_path.display()))?;
    let scheduler = Scheduler::with_config(store, &config);
    let learner = cli.learner.as_str();

    match cli.command {
        Command::Review { item, quality } => {
            let record = scheduler
                .record_raw_review(learner, &item, &quality, today)
                .context("review not recorded, please retry")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                print_record(&record);
            }
        }
        Command::Due => {
            let set = scheduler.due_items(learner, today)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&set)?);
            } else {
                println!("Due ({}):", set.due.len());
                set.due.iter().for_each(print_record);
                println!("Upcoming ({}):", set.upcoming.len());
                set.upcoming.iter().for_each(print_record);
            }
        }
        Command::Stats => {
            let summary = scheduler.cached_stats(learner, today, Utc::now())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Scheduled:         {}", summary.total_scheduled);
                println!("Due for review:    {}", summary.due_for_review);
                println!("Upcoming (7 days): {}", summary.upcoming_this_week);
                println!("Average interval:  {} days", summary.average_interval);
                println!("Average ease:      {:.2}", summary.average_ease_factor);
            }
        }
        Command::Preview { item } => {
            let preview = scheduler.preview(learner, &item, today)?;
            if json {
                let rows: Vec<(u8, u32)> = preview.iter().map(|(q, i)| (q.value(), *i)).collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for (quality, interval) in preview {
                    println!("{} -> {}", quality, format_interval(interval));
                }
            }
        }
        Command::Remove { item } => {
            if scheduler.remove_item(learner, &item)? {
                println!("Removed '{}'", item);
            } else {
                println!("No schedule for '{}'", item);
            }
        }
        Command::Export { path } => {
            let count = export_json_to_path(scheduler.store(), learner, &path)?;
            println!("Exported {} schedules to {}", count, path.display());
        }
        Command::Import { path } => {
            let export = import_json(&path)?;
            let count = import_into(scheduler.store(), learner, &export)?;
            println!(
                "Imported {} of {} schedules from {}",
                count,
                export.schedules.len(),
                path.display()
            );
        }
    }

    Ok(())
}
