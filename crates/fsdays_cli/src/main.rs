use std::process;

use clap::Parser;
use fsdays_core::calendar::DayPolicy;
use fsdays_core::core_api::{SaveEditor, resolve_save_dir};
use fsdays_core::store::WriteOptions;
use fsdays_render::{
    JsonStyle, RunSummary, TextRenderOptions, render_json, render_text_with_options,
};
use log::LevelFilter;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Save folder path, or a folder name under the game's save directory.
    #[arg(long, value_name = "SAVE")]
    save: String,
    /// New number of days per period (month).
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    days: Option<i64>,
    /// Day of the current period to land on after the change.
    #[arg(
        long,
        value_name = "D",
        default_value_t = 1,
        allow_hyphen_values = true,
        requires = "days"
    )]
    day: i64,
    /// Keep the current day-of-period (clamped to the new length).
    #[arg(long = "keep-day", conflicts_with = "day", requires = "days")]
    keep_day: bool,
    /// Zero per-farm statistics in farms.xml.
    #[arg(long = "reset-stats")]
    reset_stats: bool,
    /// Zero per-farm finance history in farms.xml.
    #[arg(long = "reset-finances")]
    reset_finances: bool,
    /// Compute and report changes without writing anything.
    #[arg(long = "dry-run")]
    dry_run: bool,
    /// Do not create timestamped backups before writing.
    #[arg(long = "no-backup")]
    no_backup: bool,
    #[arg(short, long)]
    verbose: bool,
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn day_policy(&self) -> DayPolicy {
        if self.keep_day {
            DayPolicy::KeepDay
        } else {
            DayPolicy::Target(self.day)
        }
    }

    fn write_options(&self) -> WriteOptions {
        WriteOptions {
            dry_run: self.dry_run,
            no_backup: self.no_backup,
        }
    }
}

fn init_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let save_dir = resolve_save_dir(&cli.save).unwrap_or_else(|e| {
        eprintln!("Error resolving save folder '{}': {}", cli.save, e.message);
        process::exit(1);
    });
    log::info!("save folder: {}", save_dir.display());

    let options = cli.write_options();
    let editor = SaveEditor::new(&save_dir, options);
    let mut summary = RunSummary::new(&save_dir, options.dry_run);

    // The day change is validated before any farms.xml write.
    if let Some(days) = cli.days {
        editor
            .check_day_change(days, cli.day_policy())
            .unwrap_or_else(|e| {
                eprintln!("Error changing days per period: {e}");
                process::exit(1);
            });
    }

    if cli.reset_stats {
        summary.statistics = Some(editor.reset_statistics().unwrap_or_else(|e| {
            eprintln!("Error resetting statistics: {e}");
            process::exit(1);
        }));
    }
    if cli.reset_finances {
        summary.finances = Some(editor.reset_finances().unwrap_or_else(|e| {
            eprintln!("Error resetting finances: {e}");
            process::exit(1);
        }));
    }
    if let Some(days) = cli.days {
        summary.days = Some(
            editor
                .change_days_per_period(days, cli.day_policy())
                .unwrap_or_else(|e| {
                    eprintln!("Error changing days per period: {e}");
                    process::exit(1);
                }),
        );
    }

    if cli.json {
        let json = render_json(&summary, JsonStyle::CanonicalV1);
        let rendered = serde_json::to_string_pretty(&json).unwrap_or_else(|e| {
            eprintln!("Error rendering JSON output: {e}");
            process::exit(1);
        });
        println!("{rendered}");
        return;
    }

    print!(
        "{}",
        render_text_with_options(
            &summary,
            TextRenderOptions {
                verbose: cli.verbose
            }
        )
    );
}
