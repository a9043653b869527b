use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ChatResult;
use crate::format::DEFAULT_CODE_LANGUAGE;

/// `code-<millis>.<tag>`; untagged blocks are saved as plain text.
pub fn code_filename(language: &str, timestamp_ms: i64) -> String {
    let extension = if language.is_empty() || language == DEFAULT_CODE_LANGUAGE {
        "txt"
    } else {
        language
    };
    format!("code-{timestamp_ms}.{extension}")
}

/// The configured directory, else the user's download folder, else the
/// working directory.
pub fn download_dir(configured: Option<&str>) -> PathBuf {
    configured
        .map(PathBuf::from)
        .or_else(dirs::download_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn save_code(dir: &Path, language: &str, code: &str, timestamp_ms: i64) -> ChatResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(code_filename(language, timestamp_ms));
    fs::write(&path, code)?;
    log::info!("Saved code block to {}", path.display());
    Ok(path)
}
