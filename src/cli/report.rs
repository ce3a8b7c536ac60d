use anyhow::Result;
use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use clap::Parser;
use now::DateTimeNow;

use crate::{
    report::{
        ReportWindow,
        buckets::{activity_split, daily_work_totals, project_totals},
    },
    store::{snapshot::JsonSnapshotStorage, tracker::TrackerStore},
    utils::{
        percentage::{Percentage, duration_percentage},
        time::{day_start, next_day_start},
    },
};

use super::{DateStyle, load_store, parse_cli_datetime, project_display_name};

#[derive(Debug, Parser)]
pub struct ReportCommand {
    #[arg(
        long = "start",
        short,
        help = "Start of the range. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\", \"12:00 16/03/2025\""
    )]
    start_date: Option<String>,
    #[arg(
        long = "end",
        short,
        help = "End of the range. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\", \"12:00 16/03/2025\""
    )]
    end_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(long = "projects", help = "Group totals by project instead of by day")]
    by_project: bool,
    #[arg(short = 'p', long = "percentage", help = "Filter projects to have at least specified percentage of the window total", default_value_t = Percentage::new_opt(0.).unwrap())]
    min_percentage: Percentage,
}

const DEFAULT_REPORT_DAYS: i64 = 7;

/// Command to process `report`. Buckets are whole local calendar days: inputs
/// widen to the days they fall in, mirroring how the bar chart view framed
/// its ranges.
pub async fn process_report_command(
    storage: &JsonSnapshotStorage,
    ReportCommand {
        start_date,
        end_date,
        date_style,
        by_project,
        min_percentage,
    }: ReportCommand,
) -> Result<()> {
    let store = load_store(storage).await?;
    let now = store.now();

    let start = match start_date {
        Some(v) => parse_cli_datetime(&v, date_style)?.with_timezone(&Local),
        None => Local::now() - Duration::days(DEFAULT_REPORT_DAYS - 1),
    };
    let end = match end_date {
        Some(v) => parse_cli_datetime(&v, date_style)?.with_timezone(&Local),
        None => Local::now(),
    };

    let first = start.beginning_of_day().date_naive();
    let last = end.date_naive();

    if by_project {
        print_project_totals(&store, first, last, min_percentage, now);
    } else {
        let totals = daily_work_totals(store.entries(), first, last, &Local, now);
        for total in totals {
            println!("{}\t{}", total.day.format("%x"), format_duration(total.total));
        }
    }
    Ok(())
}

fn print_project_totals(
    store: &TrackerStore,
    first: NaiveDate,
    last: NaiveDate,
    min_percentage: Percentage,
    now: DateTime<Utc>,
) {
    let window = ReportWindow::new(
        day_start(first, &Local).to_utc(),
        next_day_start(day_start(last, &Local)).to_utc(),
    );
    let buckets = project_totals(store.entries(), window, now);
    let whole = buckets
        .iter()
        .fold(Duration::zero(), |acc, b| acc + b.total);

    for bucket in buckets {
        let share = duration_percentage(bucket.total, whole);
        if share < min_percentage {
            continue;
        }
        println!(
            "{}\t{}%\t{}",
            project_display_name(store, bucket.project_id),
            *share as i32,
            format_duration(bucket.total)
        );
    }
}

/// Live stats for the current local day: the active/rest split plus project
/// totals, with open entries measured up to now.
pub async fn process_today_command(storage: &JsonSnapshotStorage) -> Result<()> {
    let store = load_store(storage).await?;
    let now = store.now();
    let today = Local::now().date_naive();
    let window = ReportWindow::local_day(today, &Local);

    let split = activity_split(store.entries(), window, now);
    println!("active\t{}", format_duration(split.active));
    println!("rest\t{}", format_duration(split.rest));

    let buckets = project_totals(store.entries(), window, now);
    if !buckets.is_empty() {
        println!();
        for bucket in buckets {
            println!(
                "{}\t{}",
                project_display_name(&store, bucket.project_id),
                format_duration(bucket.total)
            );
        }
    }
    Ok(())
}

pub fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::format_duration;

    #[test]
    fn format_duration_picks_the_largest_unit() {
        assert_eq!(format_duration(Duration::seconds(42)), "42s");
        assert_eq!(format_duration(Duration::seconds(90)), "1m30s");
        assert_eq!(format_duration(Duration::seconds(3725)), "1h2m5s");
    }
}
