use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use fsdays_core::calendar::DayPolicy;
use fsdays_core::core_api::{DayChangeReport, ResetReport};
use fsdays_core::fields::FieldUpdate;
use fsdays_core::store::WriteOutcome;
use fsdays_core::sync::SyncOutcome;
use fsdays_core::zero::FieldChange;
use serde_json::{Map as JsonMap, Value as JsonValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonStyle {
    #[default]
    CanonicalV1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextRenderOptions {
    pub verbose: bool,
}

/// Everything one invocation did to a save folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub save_dir: PathBuf,
    pub dry_run: bool,
    pub statistics: Option<ResetReport>,
    pub finances: Option<ResetReport>,
    pub days: Option<DayChangeReport>,
}

impl RunSummary {
    pub fn new(save_dir: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            save_dir: save_dir.into(),
            dry_run,
            statistics: None,
            finances: None,
            days: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.statistics.is_none() && self.finances.is_none() && self.days.is_none()
    }
}

pub fn render_json(summary: &RunSummary, style: JsonStyle) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => JsonValue::Object(summary_json(summary)),
    }
}

pub fn render_text(summary: &RunSummary) -> String {
    render_text_with_options(summary, TextRenderOptions::default())
}

pub fn render_text_with_options(summary: &RunSummary, options: TextRenderOptions) -> String {
    let mut out = String::new();
    writeln!(&mut out, "Save: {}", summary.save_dir.display())
        .expect("writing to String cannot fail");
    if summary.dry_run {
        writeln!(&mut out, "Dry run: no files were modified")
            .expect("writing to String cannot fail");
    }
    if summary.is_empty() {
        writeln!(&mut out, "No changes requested").expect("writing to String cannot fail");
        return out;
    }

    if let Some(report) = &summary.statistics {
        write_reset(&mut out, "Statistics", report, options);
    }
    if let Some(report) = &summary.finances {
        write_reset(&mut out, "Finances", report, options);
    }
    if let Some(report) = &summary.days {
        write_day_change(&mut out, report, options);
    }
    out
}

fn summary_json(summary: &RunSummary) -> JsonMap<String, JsonValue> {
    let mut out = JsonMap::new();
    out.insert(
        "save_dir".to_string(),
        JsonValue::String(summary.save_dir.display().to_string()),
    );
    out.insert("dry_run".to_string(), JsonValue::Bool(summary.dry_run));
    out.insert(
        "statistics".to_string(),
        summary
            .statistics
            .as_ref()
            .map_or(JsonValue::Null, reset_to_json),
    );
    out.insert(
        "finances".to_string(),
        summary
            .finances
            .as_ref()
            .map_or(JsonValue::Null, reset_to_json),
    );
    out.insert(
        "days".to_string(),
        summary
            .days
            .as_ref()
            .map_or(JsonValue::Null, day_change_to_json),
    );
    out
}

fn reset_to_json(report: &ResetReport) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert("path".to_string(), path_to_json(&report.path));
    out.insert("changed".to_string(), JsonValue::from(report.changed()));
    out.insert("write".to_string(), write_to_json(&report.write));
    out.insert(
        "changes".to_string(),
        JsonValue::Array(report.changes.iter().map(field_change_to_json).collect()),
    );
    JsonValue::Object(out)
}

fn field_change_to_json(change: &FieldChange) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert(
        "farm_id".to_string(),
        change
            .farm_id
            .as_ref()
            .map_or(JsonValue::Null, |id| JsonValue::String(id.clone())),
    );
    out.insert("field".to_string(), JsonValue::String(change.field.clone()));
    out.insert("old".to_string(), JsonValue::String(change.old.clone()));
    out.insert("new".to_string(), JsonValue::String(change.new.clone()));
    JsonValue::Object(out)
}

fn day_change_to_json(report: &DayChangeReport) -> JsonValue {
    let shift = &report.shift;
    let mut out = JsonMap::new();
    out.insert("path".to_string(), path_to_json(&report.environment_path));
    out.insert(
        "old_days_per_period".to_string(),
        JsonValue::from(shift.old_days_per_period),
    );
    out.insert(
        "new_days_per_period".to_string(),
        JsonValue::from(shift.new_days_per_period),
    );
    out.insert(
        "old_current_day".to_string(),
        JsonValue::from(shift.old_current_day),
    );
    out.insert(
        "new_current_day".to_string(),
        JsonValue::from(shift.new_current_day),
    );
    out.insert(
        "periods_completed".to_string(),
        JsonValue::from(shift.periods_completed),
    );
    out.insert(
        "day_in_period".to_string(),
        JsonValue::from(shift.day_in_period),
    );
    out.insert(
        "policy".to_string(),
        JsonValue::String(match report.policy {
            DayPolicy::KeepDay => "keep_day".to_string(),
            DayPolicy::Target(_) => "target_day".to_string(),
        }),
    );
    out.insert(
        "period_fields".to_string(),
        JsonValue::Array(report.period_fields.iter().map(field_update_to_json).collect()),
    );
    out.insert(
        "forecast_removed".to_string(),
        JsonValue::from(report.forecast.removed),
    );
    out.insert(
        "forecast_reset".to_string(),
        JsonValue::from(report.forecast.reset),
    );
    out.insert("write".to_string(), write_to_json(&report.write));
    out.insert("career".to_string(), sync_to_json(&report.career));
    JsonValue::Object(out)
}

fn field_update_to_json(update: &FieldUpdate) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert("field".to_string(), JsonValue::String(update.field.clone()));
    out.insert(
        "previous".to_string(),
        update
            .previous
            .as_ref()
            .map_or(JsonValue::Null, |p| JsonValue::String(p.clone())),
    );
    out.insert("value".to_string(), JsonValue::String(update.value.clone()));
    JsonValue::Object(out)
}

fn write_to_json(write: &WriteOutcome) -> JsonValue {
    let mut out = JsonMap::new();
    let (status, backup) = match write {
        WriteOutcome::Unchanged => ("unchanged", None),
        WriteOutcome::DryRun => ("dry_run", None),
        WriteOutcome::Written { backup } => ("written", backup.as_deref()),
    };
    out.insert("status".to_string(), JsonValue::String(status.to_string()));
    out.insert(
        "backup".to_string(),
        backup.map_or(JsonValue::Null, path_to_json),
    );
    JsonValue::Object(out)
}

fn sync_to_json(outcome: &SyncOutcome) -> JsonValue {
    let mut out = JsonMap::new();
    match outcome {
        SyncOutcome::Missing { path } => {
            out.insert("status".to_string(), JsonValue::String("missing".to_string()));
            out.insert("path".to_string(), path_to_json(path));
        }
        SyncOutcome::Unchanged { path } => {
            out.insert(
                "status".to_string(),
                JsonValue::String("unchanged".to_string()),
            );
            out.insert("path".to_string(), path_to_json(path));
        }
        SyncOutcome::Updated {
            path,
            previous,
            write,
        } => {
            out.insert("status".to_string(), JsonValue::String("updated".to_string()));
            out.insert("path".to_string(), path_to_json(path));
            out.insert(
                "previous".to_string(),
                previous
                    .as_ref()
                    .map_or(JsonValue::Null, |p| JsonValue::String(p.clone())),
            );
            out.insert("write".to_string(), write_to_json(write));
        }
    }
    JsonValue::Object(out)
}

fn path_to_json(path: &Path) -> JsonValue {
    JsonValue::String(path.display().to_string())
}

fn write_reset(out: &mut String, label: &str, report: &ResetReport, options: TextRenderOptions) {
    let verb = if matches!(report.write, WriteOutcome::DryRun) {
        "would be zeroed"
    } else {
        "zeroed"
    };
    writeln!(
        out,
        "{label}: {} field(s) {verb} in {} ({})",
        report.changed(),
        file_name(&report.path),
        describe_write(&report.write)
    )
    .expect("writing to String cannot fail");

    if options.verbose {
        for change in &report.changes {
            writeln!(
                out,
                "  farm {} {}: {} -> {}",
                change.farm_id.as_deref().unwrap_or("?"),
                change.field,
                change.old,
                change.new
            )
            .expect("writing to String cannot fail");
        }
    }
}

fn write_day_change(out: &mut String, report: &DayChangeReport, options: TextRenderOptions) {
    let shift = &report.shift;
    writeln!(
        out,
        "Days per period: {} -> {}",
        shift.old_days_per_period, shift.new_days_per_period
    )
    .expect("writing to String cannot fail");
    writeln!(
        out,
        "Current day: {} -> {} (day {} of period {})",
        shift.old_current_day,
        shift.new_current_day,
        shift.day_in_period,
        shift.periods_completed + 1
    )
    .expect("writing to String cannot fail");
    writeln!(
        out,
        "Forecast: {} cache entries removed, {} timestamps reset",
        report.forecast.removed, report.forecast.reset
    )
    .expect("writing to String cannot fail");
    writeln!(
        out,
        "{}: {}",
        file_name(&report.environment_path),
        describe_write(&report.write)
    )
    .expect("writing to String cannot fail");

    if options.verbose {
        for update in &report.period_fields {
            writeln!(
                out,
                "  {}: {} -> {}",
                update.field,
                update.previous.as_deref().unwrap_or("(new)"),
                update.value
            )
            .expect("writing to String cannot fail");
        }
    }

    let career = match &report.career {
        SyncOutcome::Missing { path } => format!("{}: not found, skipped", file_name(path)),
        SyncOutcome::Unchanged { path } => format!("{}: already in sync", file_name(path)),
        SyncOutcome::Updated {
            path,
            previous,
            write,
        } => format!(
            "{}: {} -> {} ({})",
            file_name(path),
            previous.as_deref().unwrap_or("(new)"),
            shift.new_days_per_period,
            describe_write(write)
        ),
    };
    writeln!(out, "{career}").expect("writing to String cannot fail");
}

fn describe_write(write: &WriteOutcome) -> String {
    match write {
        WriteOutcome::Unchanged => "unchanged".to_string(),
        WriteOutcome::DryRun => "not written".to_string(),
        WriteOutcome::Written { backup: Some(backup) } => {
            format!("written, backup {}", file_name(backup))
        }
        WriteOutcome::Written { backup: None } => "written, no backup".to_string(),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use fsdays_core::store::WriteOutcome;

    use super::{describe_write, file_name};

    #[test]
    fn write_outcomes_are_described_by_file_name() {
        let backup = PathBuf::from("/saves/savegame1/farms.xml.20261016_093005.bak");
        assert_eq!(
            describe_write(&WriteOutcome::Written {
                backup: Some(backup)
            }),
            "written, backup farms.xml.20261016_093005.bak"
        );
        assert_eq!(describe_write(&WriteOutcome::DryRun), "not written");
        assert_eq!(file_name(&PathBuf::from("/")), "/");
    }
}
