//! Removal of cached weather data that the game rebuilds from the calendar.

use serde::Serialize;

use crate::xml::{Element, XmlDocument};

const FORECAST_CONTAINER: &str = "weatherForecast";
const FORECAST_PERIOD: &str = "period";
const WEATHER_OBJECT: &str = "object";
const WEATHER_OBJECT_PARENTS: [&str; 4] = ["weather", "weatherObjects", "variation", "weatherPreset"];
const LAST_UPDATE: &str = "lastUpdate";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InvalidationCount {
    pub removed: usize,
    pub reset: usize,
}

impl InvalidationCount {
    pub fn total(&self) -> usize {
        self.removed + self.reset
    }
}

/// Drops forecast and weather caches anywhere in the document and zeroes
/// `lastUpdate` markers.
pub fn clear_forecast(document: &mut XmlDocument) -> InvalidationCount {
    let root = document.root_mut();
    let removed = root.remove_descendants_where(&mut is_cache_marker);

    let mut reset = 0;
    root.visit_mut(&mut |element: &mut Element| {
        if is_last_update_marker(element) && element.text().trim() != "0" {
            element.set_text("0");
            reset += 1;
        }
    });

    let count = InvalidationCount { removed, reset };
    log::info!(
        "cleared forecast caches: {} removed, {} reset",
        count.removed,
        count.reset
    );
    count
}

fn is_cache_marker(parent: &str, child: &Element) -> bool {
    let name = child.name();
    if parent == FORECAST_CONTAINER && name == FORECAST_PERIOD {
        return true;
    }
    if name == WEATHER_OBJECT && WEATHER_OBJECT_PARENTS.contains(&parent) {
        return true;
    }
    name != FORECAST_CONTAINER && ends_with_ignore_ascii_case(name, "forecast")
}

fn is_last_update_marker(element: &Element) -> bool {
    element.is_leaf()
        && (element.name() == LAST_UPDATE || element.name().ends_with("LastUpdate"))
}

fn ends_with_ignore_ascii_case(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len()
        && name.as_bytes()[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
}
