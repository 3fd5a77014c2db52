use std::fs;
use std::path::{Path, PathBuf};

use ev_core::EventError;
use walkdir::WalkDir;

use crate::{
    map_cli_config_invalid, map_cli_config_read, map_cli_path, map_cli_program_invalid,
    map_cli_program_read, ProgramBundle, ProgramFile, RunConfig,
};

pub(crate) fn resolve_path(raw: &str) -> Result<PathBuf, EventError> {
    let path = PathBuf::from(raw);
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir().map_err(map_cli_path)?.join(path)
    };

    if !absolute.exists() {
        return Err(EventError::new(
            "CLI_PATH_NOT_FOUND",
            format!("Path does not exist: {}", absolute.display()),
        ));
    }
    Ok(absolute)
}

pub(crate) fn resolve_dir(raw: &str) -> Result<PathBuf, EventError> {
    let absolute = resolve_path(raw)?;
    if !absolute.is_dir() {
        return Err(EventError::new(
            "CLI_PATH_NOT_DIR",
            format!("Not a directory: {}", absolute.display()),
        ));
    }
    Ok(absolute)
}

pub(crate) fn load_program_file(path: &Path) -> Result<ProgramBundle, EventError> {
    let raw = fs::read_to_string(path).map_err(map_cli_program_read)?;
    let file: ProgramFile = serde_json::from_str(&raw).map_err(map_cli_program_invalid)?;
    Ok(file.into_bundle())
}

pub(crate) fn load_run_config(path: &Path) -> Result<RunConfig, EventError> {
    let raw = fs::read_to_string(path).map_err(map_cli_config_read)?;
    serde_json::from_str(&raw).map_err(map_cli_config_invalid)
}

/// Every `*.json` file under `root`, sorted by path.
pub(crate) fn collect_program_files(root: &Path) -> Vec<PathBuf> {
    let mut files = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
        .collect::<Vec<_>>();
    files.sort();
    files
}
