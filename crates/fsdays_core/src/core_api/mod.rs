mod engine;
mod error;
mod save_dir;
mod types;

pub use engine::SaveEditor;
pub use error::{CoreError, CoreErrorCode};
pub use save_dir::{
    CAREER_FILE, FARMS_FILE, find_environment_xml, resolve_save_dir, resolve_save_dir_from,
};
pub use types::{DayChangeReport, ResetKind, ResetReport};
