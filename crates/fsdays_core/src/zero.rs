//! Format-preserving reset of per-farm counters in `farms.xml`.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::xml::{Element, XmlDocument};

pub const FARM_TAG: &str = "farm";
pub const FARM_ID_TAG: &str = "farmId";
pub const STATISTICS_TAG: &str = "statistics";
pub const FINANCES_TAG: &str = "finances";
pub const FINANCE_STATS_TAG: &str = "stats";

pub const INTEGER_ZERO: &str = "0";
pub const DECIMAL_ZERO: &str = "0.000000";

static INTEGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+$").expect("integer pattern is valid"));
static DECIMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+\.[0-9]+$").expect("decimal pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NumericShape {
    Integer,
    Decimal,
}

impl NumericShape {
    pub fn classify(text: &str) -> Option<Self> {
        let text = text.trim();
        if INTEGER_RE.is_match(text) {
            Some(Self::Integer)
        } else if DECIMAL_RE.is_match(text) {
            Some(Self::Decimal)
        } else {
            None
        }
    }

    pub fn zero(&self) -> &'static str {
        match self {
            Self::Integer => INTEGER_ZERO,
            Self::Decimal => DECIMAL_ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub farm_id: Option<String>,
    pub field: String,
    pub old: String,
    pub new: String,
}

/// Zeroes every numeric leaf below `entity_root` whose tag is not protected.
/// Non-numeric and empty leaves are left alone. Only leaves whose text
/// actually changed are returned; `field` is the path below `entity_root`.
pub fn zero_numeric_leaves(entity_root: &mut Element, protected_tags: &[&str]) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    let mut path = Vec::new();
    zero_leaves_into(entity_root, protected_tags, &mut path, &mut changes);
    changes
}

fn zero_leaves_into(
    element: &mut Element,
    protected_tags: &[&str],
    path: &mut Vec<String>,
    changes: &mut Vec<FieldChange>,
) {
    for child in element.elements_mut() {
        if protected_tags.contains(&child.name()) {
            continue;
        }
        path.push(child.name().to_string());
        if child.is_leaf() {
            let old = child.text().trim().to_string();
            match NumericShape::classify(&old) {
                Some(shape) if old != shape.zero() => {
                    child.set_text(shape.zero());
                    changes.push(FieldChange {
                        farm_id: None,
                        field: path.join("/"),
                        old,
                        new: shape.zero().to_string(),
                    });
                }
                Some(_) => {}
                None => log::debug!("skipping non-numeric field {}: '{}'", path.join("/"), old),
            }
        } else {
            zero_leaves_into(child, protected_tags, path, changes);
        }
        path.pop();
    }
}

/// Resets `farm/statistics` for every farm, keeping `farmId`.
pub fn reset_farm_statistics(document: &mut XmlDocument) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    for farm in document.root_mut().children_named_mut(FARM_TAG) {
        let farm_id = farm_identifier(farm);
        let Some(statistics) = farm.child_mut(STATISTICS_TAG) else {
            continue;
        };
        for mut change in zero_numeric_leaves(statistics, &[FARM_ID_TAG]) {
            change.farm_id = farm_id.clone();
            change.field = format!("{STATISTICS_TAG}/{}", change.field);
            changes.push(change);
        }
    }
    log_changes(&changes);
    changes
}

/// Resets every `farm/finances/stats` block, including nested containers.
pub fn reset_farm_finances(document: &mut XmlDocument) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    for farm in document.root_mut().children_named_mut(FARM_TAG) {
        let farm_id = farm_identifier(farm);
        let Some(finances) = farm.child_mut(FINANCES_TAG) else {
            continue;
        };
        for (index, stats) in finances.children_named_mut(FINANCE_STATS_TAG).enumerate() {
            let day = stats.attribute("day").map(str::to_string);
            for mut change in zero_numeric_leaves(stats, &[]) {
                change.farm_id = farm_id.clone();
                change.field = match &day {
                    Some(day) => format!("{FINANCES_TAG}/{FINANCE_STATS_TAG}[day={day}]/{}", change.field),
                    None => format!("{FINANCES_TAG}/{FINANCE_STATS_TAG}[{index}]/{}", change.field),
                };
                changes.push(change);
            }
        }
    }
    log_changes(&changes);
    changes
}

fn farm_identifier(farm: &Element) -> Option<String> {
    farm.attribute(FARM_ID_TAG)
        .map(str::to_string)
        .or_else(|| {
            farm.child(STATISTICS_TAG)
                .and_then(|s| s.child(FARM_ID_TAG))
                .or_else(|| farm.child(FARM_ID_TAG))
                .map(|e| e.text().trim().to_string())
        })
}

fn log_changes(changes: &[FieldChange]) {
    for change in changes {
        log::info!(
            "farm {}: {}: '{}' -> '{}'",
            change.farm_id.as_deref().unwrap_or("?"),
            change.field,
            change.old,
            change.new
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{NumericShape, reset_farm_statistics, zero_numeric_leaves};
    use crate::xml::XmlDocument;

    #[test]
    fn classify_recognizes_integer_and_decimal_shapes() {
        assert_eq!(NumericShape::classify("123"), Some(NumericShape::Integer));
        assert_eq!(NumericShape::classify("-7"), Some(NumericShape::Integer));
        assert_eq!(NumericShape::classify("45.670000"), Some(NumericShape::Decimal));
        assert_eq!(NumericShape::classify("-0.5"), Some(NumericShape::Decimal));
        assert_eq!(NumericShape::classify(" 8 "), Some(NumericShape::Integer));
    }

    #[test]
    fn classify_rejects_other_text() {
        for text in ["", "abc", "1e5", "1.", ".5", "true", "1,000"] {
            assert_eq!(NumericShape::classify(text), None, "{text:?}");
        }
    }

    #[test]
    fn zeroing_keeps_literal_shape() {
        let mut doc = XmlDocument::parse(
            "<s><a>123</a><b>45.670000</b><c>1.5</c><d>name</d><e/><f>0</f></s>",
        )
        .expect("input should parse");
        let changes = zero_numeric_leaves(doc.root_mut(), &[]);
        let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["a", "b", "c"]);

        let root = doc.root();
        let text = |name: &str| root.child(name).map(|e| e.text()).unwrap_or_default();
        assert_eq!(text("a"), "0");
        assert_eq!(text("b"), "0.000000");
        assert_eq!(text("c"), "0.000000");
        assert_eq!(text("d"), "name");
        assert_eq!(text("e"), "");
        assert_eq!(text("f"), "0");
    }

    #[test]
    fn protected_tags_are_skipped_and_nested_leaves_reached() {
        let mut doc = XmlDocument::parse(
            "<s><farmId>3</farmId><group><x>9</x><farmId>4</farmId></group></s>",
        )
        .expect("input should parse");
        let changes = zero_numeric_leaves(doc.root_mut(), &["farmId"]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "group/x");
        assert_eq!(
            doc.root().child("farmId").map(|e| e.text()).as_deref(),
            Some("3")
        );
    }

    #[test]
    fn statistics_reset_reaches_nested_groups() {
        let mut doc = XmlDocument::parse(
            "<farms><farm farmId=\"2\"><statistics><farmId>2</farmId>\
             <vehicles><distance>8.500000</distance><farmId>2</farmId></vehicles>\
             <revenue>5</revenue></statistics></farm></farms>",
        )
        .expect("input should parse");
        let changes = reset_farm_statistics(&mut doc);
        let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["statistics/vehicles/distance", "statistics/revenue"]
        );
        assert!(changes.iter().all(|c| c.farm_id.as_deref() == Some("2")));
        let vehicles = doc
            .root()
            .find_named("vehicles")
            .expect("vehicles group");
        assert_eq!(
            vehicles.child("distance").map(|e| e.text()).as_deref(),
            Some("0.000000")
        );
        assert_eq!(vehicles.child("farmId").map(|e| e.text()).as_deref(), Some("2"));
    }
}
