use std::path::{Path, PathBuf};

use crate::calendar::{self, DayPolicy, DayShift};
use crate::fields::{self, PERIOD_SYNONYM_TAGS, PRIMARY_PERIOD_TAG};
use crate::forecast;
use crate::store::{Clock, DocumentStore, SystemClock, WriteOptions, WriteOutcome};
use crate::sync::{self, CAREER_PERIOD_TAG, CAREER_SETTINGS_TAG};
use crate::xml::XmlDocument;
use crate::zero;

use super::error::CoreError;
use super::save_dir::{CAREER_FILE, FARMS_FILE, find_environment_xml};
use super::types::{DayChangeReport, ResetKind, ResetReport};

/// Runs edits against one save folder.
#[derive(Debug)]
pub struct SaveEditor<C = SystemClock> {
    save_dir: PathBuf,
    store: DocumentStore<C>,
    options: WriteOptions,
}

impl SaveEditor<SystemClock> {
    pub fn new(save_dir: impl Into<PathBuf>, options: WriteOptions) -> Self {
        Self::with_clock(save_dir, options, SystemClock)
    }
}

impl<C: Clock> SaveEditor<C> {
    pub fn with_clock(save_dir: impl Into<PathBuf>, options: WriteOptions, clock: C) -> Self {
        Self {
            save_dir: save_dir.into(),
            store: DocumentStore::with_clock(clock),
            options,
        }
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    pub fn options(&self) -> WriteOptions {
        self.options
    }

    /// Validates a period-length change against the save and returns the
    /// resulting shift. Nothing is written.
    pub fn check_day_change(
        &self,
        new_days: i64,
        policy: DayPolicy,
    ) -> Result<DayShift, CoreError> {
        self.plan_day_change(new_days, policy)
            .map(|(_, _, shift)| shift)
    }

    /// Changes the period length, rebuilds `currentDay`, clears the forecast
    /// and mirrors the value into the career savegame.
    pub fn change_days_per_period(
        &self,
        new_days: i64,
        policy: DayPolicy,
    ) -> Result<DayChangeReport, CoreError> {
        let (environment_path, mut document, shift) = self.plan_day_change(new_days, policy)?;
        log::info!(
            "daysPerPeriod: old={}, new={new_days}",
            shift.old_days_per_period
        );
        log::info!(
            "currentDay: {} -> {}",
            shift.old_current_day,
            shift.new_current_day
        );

        let period_fields = fields::set_period_length(
            &mut document,
            PRIMARY_PERIOD_TAG,
            &PERIOD_SYNONYM_TAGS,
            new_days,
        );
        let current_day = fields::set_current_day(&mut document, shift.new_current_day);
        let forecast = forecast::clear_forecast(&mut document);

        let write = self
            .store
            .backup_then_write(&document, &environment_path, self.options)?;

        let career = sync::sync_mirrored_field(
            &self.store,
            &self.save_dir.join(CAREER_FILE),
            CAREER_SETTINGS_TAG,
            CAREER_PERIOD_TAG,
            &new_days.to_string(),
            self.options,
        )?;

        Ok(DayChangeReport {
            environment_path,
            policy,
            shift,
            period_fields,
            current_day,
            forecast,
            write,
            career,
        })
    }

    fn plan_day_change(
        &self,
        new_days: i64,
        policy: DayPolicy,
    ) -> Result<(PathBuf, XmlDocument, DayShift), CoreError> {
        calendar::validate_days_per_period(new_days)?;
        calendar::validate_policy(policy, new_days)?;

        let environment_path = find_environment_xml(&self.save_dir)?;
        let document = self.store.load(&environment_path)?;

        let old_days = fields::read_period_length(&document)?;
        let old_current = fields::read_current_day(&document)?;
        let shift = calendar::recompute_current_day(old_current, old_days, new_days, policy)?;
        Ok((environment_path, document, shift))
    }

    /// Zeroes `farm/statistics` counters, keeping each `farmId`.
    pub fn reset_statistics(&self) -> Result<ResetReport, CoreError> {
        self.reset_farms(ResetKind::Statistics)
    }

    /// Zeroes every `farm/finances/stats` block.
    pub fn reset_finances(&self) -> Result<ResetReport, CoreError> {
        self.reset_farms(ResetKind::Finances)
    }

    fn reset_farms(&self, kind: ResetKind) -> Result<ResetReport, CoreError> {
        let path = self.save_dir.join(FARMS_FILE);
        let mut document = self.store.load(&path)?;

        let changes = match kind {
            ResetKind::Statistics => zero::reset_farm_statistics(&mut document),
            ResetKind::Finances => zero::reset_farm_finances(&mut document),
        };

        let write = if changes.is_empty() {
            log::info!("no {} fields required changes", kind.as_str());
            WriteOutcome::Unchanged
        } else {
            self.store.backup_then_write(&document, &path, self.options)?
        };

        Ok(ResetReport {
            kind,
            path,
            changes,
            write,
        })
    }
}
