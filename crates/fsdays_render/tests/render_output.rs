use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use fsdays_core::calendar::DayPolicy;
use fsdays_core::core_api::SaveEditor;
use fsdays_core::store::{FixedClock, WriteOptions};
use fsdays_render::{
    JsonStyle, RunSummary, TextRenderOptions, render_json, render_text, render_text_with_options,
};
use serde_json::Value;
use tempfile::TempDir;

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn copy_fixture_save() -> TempDir {
    let dir = tempfile::tempdir().expect("failed to create temp save dir");
    let fixtures = workspace_root().join("tests/fixtures/savegame1");
    for entry in fs::read_dir(fixtures).expect("fixture dir should be readable") {
        let entry = entry.expect("fixture entry");
        fs::copy(entry.path(), dir.path().join(entry.file_name())).expect("copy fixture");
    }
    dir
}

fn full_run(save: &TempDir, options: WriteOptions) -> RunSummary {
    let clock = FixedClock(
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .and_then(|d| d.and_hms_opt(9, 30, 5))
            .expect("valid timestamp"),
    );
    let editor = SaveEditor::with_clock(save.path(), options, clock);
    let mut summary = RunSummary::new(save.path(), options.dry_run);
    summary.statistics = Some(editor.reset_statistics().expect("statistics reset"));
    summary.finances = Some(editor.reset_finances().expect("finance reset"));
    summary.days = Some(
        editor
            .change_days_per_period(5, DayPolicy::KeepDay)
            .expect("day change"),
    );
    summary
}

fn keys(value: &Value) -> Vec<&str> {
    value
        .as_object()
        .expect("json should be an object")
        .keys()
        .map(String::as_str)
        .collect()
}

#[test]
fn json_uses_canonical_key_order() {
    let save = copy_fixture_save();
    let summary = full_run(&save, WriteOptions::default());
    let value = render_json(&summary, JsonStyle::CanonicalV1);

    assert_eq!(
        keys(&value),
        vec!["save_dir", "dry_run", "statistics", "finances", "days"]
    );
    assert_eq!(
        keys(&value["days"]),
        vec![
            "path",
            "old_days_per_period",
            "new_days_per_period",
            "old_current_day",
            "new_current_day",
            "periods_completed",
            "day_in_period",
            "policy",
            "period_fields",
            "forecast_removed",
            "forecast_reset",
            "write",
            "career",
        ]
    );
    assert_eq!(value["days"]["new_current_day"], 11);
    assert_eq!(value["days"]["policy"], "keep_day");
    assert_eq!(value["days"]["career"]["status"], "updated");
    assert_eq!(value["days"]["career"]["previous"], "3");
    assert_eq!(value["statistics"]["changed"], 8);
    assert_eq!(value["finances"]["changed"], 6);
    assert_eq!(value["statistics"]["write"]["status"], "written");
    assert!(
        value["statistics"]["write"]["backup"]
            .as_str()
            .expect("backup path")
            .ends_with("farms.xml.20261016_093005.bak")
    );
    let first = &value["statistics"]["changes"][0];
    assert_eq!(keys(first), vec!["farm_id", "field", "old", "new"]);
    assert_eq!(first["farm_id"], "3");
}

#[test]
fn empty_summary_renders_nulls_and_notice() {
    let summary = RunSummary::new("/saves/savegame1", false);
    let value = render_json(&summary, JsonStyle::CanonicalV1);
    assert!(value["statistics"].is_null());
    assert!(value["finances"].is_null());
    assert!(value["days"].is_null());
    assert_eq!(value["dry_run"], false);

    let text = render_text(&summary);
    assert_eq!(text, "Save: /saves/savegame1\nNo changes requested\n");
}

#[test]
fn text_summary_lists_each_operation() {
    let save = copy_fixture_save();
    let summary = full_run(&save, WriteOptions::default());
    let text = render_text(&summary);

    assert!(text.contains(
        "Statistics: 8 field(s) zeroed in farms.xml (written, backup farms.xml.20261016_093005.bak)\n"
    ));
    assert!(text.contains("Finances: 6 field(s) zeroed in farms.xml"));
    assert!(text.contains("Days per period: 3 -> 5\n"));
    assert!(text.contains("Current day: 7 -> 11 (day 1 of period 3)\n"));
    assert!(text.contains("Forecast: 6 cache entries removed, 1 timestamps reset\n"));
    assert!(text.contains(
        "careerSavegame.xml: 3 -> 5 (written, backup careerSavegame.xml.20261016_093005.bak)\n"
    ));
    assert!(!text.contains("  farm 3"));
}

#[test]
fn verbose_text_lists_field_changes_and_dry_run() {
    let save = copy_fixture_save();
    let summary = full_run(
        &save,
        WriteOptions {
            dry_run: true,
            no_backup: false,
        },
    );
    let text = render_text_with_options(&summary, TextRenderOptions { verbose: true });

    assert!(text.contains("Dry run: no files were modified\n"));
    assert!(text.contains("Statistics: 8 field(s) would be zeroed in farms.xml (not written)\n"));
    assert!(text.contains("  farm 3 statistics/money: 100.500000 -> 0.000000\n"));
    assert!(text.contains("  farm 3 finances/stats[day=1]/animals/headCount: 12 -> 0\n"));
    assert!(text.contains("  daysPerPeriod: 3 -> 5\n"));
    assert!(text.contains("environment.xml: not written\n"));
}
