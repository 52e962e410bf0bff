//! Locating the calendar fields of an environment document.
//!
//! Save files from different game versions put the period length at different
//! depths and under different names, so every lookup here searches the whole
//! tree instead of a fixed path.

use serde::Serialize;

use crate::core_api::{CoreError, CoreErrorCode};
use crate::xml::{Element, XmlDocument};

pub const ENVIRONMENT_TAG: &str = "environment";
pub const PRIMARY_PERIOD_TAG: &str = "daysPerPeriod";
pub const PERIOD_SYNONYM_TAGS: [&str; 3] = ["daysPerMonth", "plannedDaysPerPeriod", "periodLength"];
pub const CURRENT_DAY_TAG: &str = "currentDay";

/// Period length the game assumes when the save does not state one.
pub const DEFAULT_DAYS_PER_PERIOD: i64 = 3;
pub const DEFAULT_CURRENT_DAY: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldUpdate {
    pub field: String,
    pub previous: Option<String>,
    pub value: String,
}

/// Element that newly created calendar fields are attached to.
pub fn environment_container(root: &mut Element) -> &mut Element {
    if root.name() == ENVIRONMENT_TAG || root.find_named(ENVIRONMENT_TAG).is_none() {
        return root;
    }
    match root.find_named_mut(ENVIRONMENT_TAG) {
        Some(env) => env,
        None => unreachable!("environment element disappeared during lookup"),
    }
}

/// Writes `value` into the primary field (creating it if missing) and into
/// every synonym field that already exists. Synonyms are never created.
/// Returns the fields whose text changed.
pub fn set_period_length(
    document: &mut XmlDocument,
    primary_tag: &str,
    synonym_tags: &[&str],
    value: i64,
) -> Vec<FieldUpdate> {
    let text = value.to_string();
    let mut updates = Vec::new();

    let root = document.root_mut();
    let primary = match root.find_mut(|e| e.name() == primary_tag) {
        Some(found) => {
            let previous = found.text();
            if previous.trim() != text {
                found.set_text(text.clone());
                updates.push(FieldUpdate {
                    field: primary_tag.to_string(),
                    previous: Some(previous.trim().to_string()),
                    value: text.clone(),
                });
            }
            true
        }
        None => false,
    };
    if !primary {
        environment_container(root).push_child(Element::with_text(primary_tag, text.clone()));
        updates.push(FieldUpdate {
            field: primary_tag.to_string(),
            previous: None,
            value: text.clone(),
        });
    }

    for &tag in synonym_tags {
        root.visit_mut(&mut |element: &mut Element| {
            if element.name() != tag || !element.is_leaf() {
                return;
            }
            let previous = element.text();
            if previous.trim() == text {
                return;
            }
            element.set_text(text.clone());
            updates.push(FieldUpdate {
                field: tag.to_string(),
                previous: Some(previous.trim().to_string()),
                value: text.clone(),
            });
        });
    }

    for update in &updates {
        log::info!(
            "{}: '{}' -> '{}'",
            update.field,
            update.previous.as_deref().unwrap_or(""),
            update.value
        );
    }
    updates
}

/// Reads the current period length, trying the primary tag before synonyms.
pub fn read_period_length(document: &XmlDocument) -> Result<i64, CoreError> {
    let root = document.root();
    let field = std::iter::once(PRIMARY_PERIOD_TAG)
        .chain(PERIOD_SYNONYM_TAGS)
        .find_map(|tag| root.find_named(tag));

    let Some(field) = field else {
        log::warn!(
            "no {PRIMARY_PERIOD_TAG} field found; assuming {DEFAULT_DAYS_PER_PERIOD} days per period"
        );
        return Ok(DEFAULT_DAYS_PER_PERIOD);
    };

    let days = parse_int_field(field)?;
    if days < 1 {
        return Err(CoreError::new(
            CoreErrorCode::InvalidConfiguration,
            format!("{} in save is {days}; must be positive", field.name()),
        ));
    }
    Ok(days)
}

pub fn read_current_day(document: &XmlDocument) -> Result<i64, CoreError> {
    match document.root().find_named(CURRENT_DAY_TAG) {
        Some(field) => parse_int_field(field),
        None => {
            log::warn!("no {CURRENT_DAY_TAG} field found; assuming day {DEFAULT_CURRENT_DAY}");
            Ok(DEFAULT_CURRENT_DAY)
        }
    }
}

/// Sets `currentDay`, creating it under the environment container if absent.
pub fn set_current_day(document: &mut XmlDocument, value: i64) -> FieldUpdate {
    let text = value.to_string();
    let root = document.root_mut();
    let previous = match root.find_named_mut(CURRENT_DAY_TAG) {
        Some(field) => {
            let previous = field.text().trim().to_string();
            field.set_text(text.clone());
            Some(previous)
        }
        None => {
            environment_container(root).push_child(Element::with_text(CURRENT_DAY_TAG, text.clone()));
            None
        }
    };
    FieldUpdate {
        field: CURRENT_DAY_TAG.to_string(),
        previous,
        value: text,
    }
}

fn parse_int_field(field: &Element) -> Result<i64, CoreError> {
    let raw = field.text();
    raw.trim().parse::<i64>().map_err(|_| {
        CoreError::new(
            CoreErrorCode::InvalidConfiguration,
            format!("{} is not an integer: '{}'", field.name(), raw.trim()),
        )
    })
}
