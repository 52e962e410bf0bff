//! Loading save documents and writing them back behind a timestamped backup.

use std::fs;
use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::core_api::{CoreError, CoreErrorCode};
use crate::xml::XmlDocument;

const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WriteOptions {
    pub dry_run: bool,
    pub no_backup: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum WriteOutcome {
    /// Nothing needed writing.
    Unchanged,
    /// Dry run: neither a backup nor the document was written.
    DryRun,
    Written { backup: Option<PathBuf> },
}

#[derive(Debug, Default, Clone)]
pub struct DocumentStore<C = SystemClock> {
    clock: C,
}

impl DocumentStore<SystemClock> {
    pub fn new() -> Self {
        Self { clock: SystemClock }
    }
}

impl<C: Clock> DocumentStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    pub fn load(&self, path: &Path) -> Result<XmlDocument, CoreError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CoreError::new(
                    CoreErrorCode::DocumentNotFound,
                    format!("{} not found", path.display()),
                ));
            }
            Err(e) => return Err(CoreError::io(format!("failed to read {}", path.display()), e)),
        };
        log::info!("opened {}", path.display());

        XmlDocument::parse(&raw).map_err(|e| {
            CoreError::new(e.code, format!("{}: {}", path.display(), e.message))
        })
    }

    /// Backs up the file at `path` (unless disabled) and replaces it with the
    /// serialized document. A dry run touches nothing.
    pub fn backup_then_write(
        &self,
        document: &XmlDocument,
        path: &Path,
        options: WriteOptions,
    ) -> Result<WriteOutcome, CoreError> {
        if options.dry_run {
            log::info!("dry run: not writing {}", path.display());
            return Ok(WriteOutcome::DryRun);
        }

        let backup = if options.no_backup || !path.exists() {
            None
        } else {
            Some(self.backup(path)?)
        };

        write_atomically(path, document.to_xml_string().as_bytes())?;
        log::info!("updated {}", path.display());
        Ok(WriteOutcome::Written { backup })
    }

    /// Copies `path` to a sibling `<name>.<timestamp>.bak`. Existing backups
    /// are never overwritten.
    pub fn backup(&self, path: &Path) -> Result<PathBuf, CoreError> {
        let stamp = self.clock.now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let target = next_free_backup_path(path, &stamp);
        fs::copy(path, &target).map_err(|e| {
            CoreError::io(
                format!("failed to back up {} to {}", path.display(), target.display()),
                e,
            )
        })?;
        log::info!("backup created: {}", target.display());
        Ok(target)
    }
}

pub fn backup_path(path: &Path, stamp: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{stamp}.bak"));
    path.with_file_name(name)
}

fn next_free_backup_path(path: &Path, stamp: &str) -> PathBuf {
    let mut candidate = backup_path(path, stamp);
    let mut attempt = 1;
    while candidate.exists() {
        candidate = backup_path(path, &format!("{stamp}-{attempt}"));
        attempt += 1;
    }
    candidate
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), CoreError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| CoreError::io(format!("failed to create temp file in {}", dir.display()), e))?;
    if let Ok(metadata) = fs::metadata(path) {
        tmp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(|e| CoreError::io(format!("failed to copy permissions of {}", path.display()), e))?;
    }
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| CoreError::io(format!("failed to write {}", path.display()), e))?;
    tmp.persist(path)
        .map_err(|e| CoreError::io(format!("failed to replace {}", path.display()), e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{backup_path, next_free_backup_path};

    #[test]
    fn backup_name_appends_timestamp_and_extension() {
        let path = Path::new("/saves/savegame1/environment.xml");
        assert_eq!(
            backup_path(path, "20261016_101500"),
            Path::new("/saves/savegame1/environment.xml.20261016_101500.bak")
        );
    }

    #[test]
    fn colliding_backup_gets_numeric_suffix() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("farms.xml");
        std::fs::write(backup_path(&path, "20260101_000000"), b"old").expect("seed backup");

        let next = next_free_backup_path(&path, "20260101_000000");
        assert_eq!(
            next.file_name().and_then(|n| n.to_str()),
            Some("farms.xml.20260101_000000-1.bak")
        );
    }
}
