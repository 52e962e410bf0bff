//! Mirroring a value into a second, independent save document.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core_api::{CoreError, CoreErrorCode};
use crate::store::{Clock, DocumentStore, WriteOptions, WriteOutcome};

pub const CAREER_SETTINGS_TAG: &str = "settings";
pub const CAREER_PERIOD_TAG: &str = "plannedDaysPerPeriod";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SyncOutcome {
    /// The mirrored document does not exist; nothing was done.
    Missing { path: PathBuf },
    /// The field already held the value; no backup, no write.
    Unchanged { path: PathBuf },
    Updated {
        path: PathBuf,
        previous: Option<String>,
        write: WriteOutcome,
    },
}

/// Sets `<root>/<container>/<field>` in the document at `path` to `value`,
/// creating the container and field if needed.
pub fn sync_mirrored_field<C: Clock>(
    store: &DocumentStore<C>,
    path: &Path,
    container: &str,
    field: &str,
    value: &str,
    options: WriteOptions,
) -> Result<SyncOutcome, CoreError> {
    let mut document = match store.load(path) {
        Ok(document) => document,
        Err(e) if e.code == CoreErrorCode::DocumentNotFound => {
            log::warn!("{}; skipping {field} sync", e.message);
            return Ok(SyncOutcome::Missing {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(e),
    };

    let node = document.root_mut().ensure_child(container).ensure_child(field);
    let current = node.text().trim().to_string();
    if current == value {
        log::info!("{field} already {current}; no change");
        return Ok(SyncOutcome::Unchanged {
            path: path.to_path_buf(),
        });
    }

    log::info!("{field}: '{current}' -> '{value}'");
    node.set_text(value);
    let write = store.backup_then_write(&document, path, options)?;

    Ok(SyncOutcome::Updated {
        path: path.to_path_buf(),
        previous: (!current.is_empty()).then_some(current),
        write,
    })
}
