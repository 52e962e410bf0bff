use std::env;
use std::path::{Path, PathBuf};

use super::error::{CoreError, CoreErrorCode};

const GAME_SAVE_ROOT: [&str; 3] = ["Documents", "My Games", "FarmingSimulator2025"];
const ENVIRONMENT_CANDIDATES: [&str; 2] = ["environment.xml", "config/environment.xml"];

pub const CAREER_FILE: &str = "careerSavegame.xml";
pub const FARMS_FILE: &str = "farms.xml";

/// Resolves a save folder given either a path or a bare folder name such as
/// `savegame1`.
pub fn resolve_save_dir(arg: &str) -> Result<PathBuf, CoreError> {
    let cwd = env::current_dir()
        .map_err(|e| CoreError::io("failed to read current directory", e))?;
    resolve_save_dir_from(arg, home_dir().as_deref(), &cwd)
}

pub fn resolve_save_dir_from(
    arg: &str,
    home: Option<&Path>,
    cwd: &Path,
) -> Result<PathBuf, CoreError> {
    let direct = PathBuf::from(arg);
    if direct.is_dir() {
        return Ok(direct);
    }

    if let Some(home) = home {
        let mut in_game_dir = home.to_path_buf();
        for part in GAME_SAVE_ROOT {
            in_game_dir.push(part);
        }
        in_game_dir.push(arg);
        if in_game_dir.is_dir() {
            return Ok(in_game_dir);
        }
    }

    let relative = cwd.join(arg);
    if relative.is_dir() {
        return Ok(relative);
    }

    Err(CoreError::new(
        CoreErrorCode::SaveDirectoryNotFound,
        format!("could not resolve save directory from '{arg}'"),
    ))
}

pub fn find_environment_xml(save_dir: &Path) -> Result<PathBuf, CoreError> {
    ENVIRONMENT_CANDIDATES
        .iter()
        .map(|rel| save_dir.join(rel))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            CoreError::new(
                CoreErrorCode::DocumentNotFound,
                format!(
                    "environment.xml not found in {} (tried {})",
                    save_dir.display(),
                    ENVIRONMENT_CANDIDATES.join(", ")
                ),
            )
        })
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
