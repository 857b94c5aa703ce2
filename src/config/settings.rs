use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

use crate::Result;
use crate::sanitize::DEFAULT_PATH_LIMIT;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:143.0) Gecko/20100101 Firefox/143.0";

/// Reads the settings file, falling back to defaults if it does not exist
pub fn read_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Settings::default()),
        Err(e) => return Err(e).with_context(|| "Failed to read settings file"),
    };
    let settings: Settings = serde_yml::from_str(&contents).with_context(
        || "Could not parse settings (There is most likely an error in the settings file)",
    )?;
    debug!("Read settings: {:?}", settings);
    Ok(settings)
}

/// Optional tuning that is not exposed on the command line
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Root folder all courses are stored in
    pub download_dir: PathBuf,
    /// Folder for the per-run log files
    pub log_dir: PathBuf,
    /// Streaming download tool (name in PATH or full path)
    pub downloader: String,
    pub user_agent: String,
    /// Maximum length of generated paths
    pub path_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("Courses"),
            log_dir: PathBuf::from("logs_dmstk"),
            downloader: "N_m3u8DL-RE".to_string(),
            user_agent: USER_AGENT.to_string(),
            path_limit: DEFAULT_PATH_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = read_settings(dir.path().join("nope.yml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yml");
        fs::write(&path, "downloader: /opt/bin/N_m3u8DL-RE\npath_limit: 240\n").unwrap();

        let settings = read_settings(&path).unwrap();
        assert_eq!(settings.downloader, "/opt/bin/N_m3u8DL-RE");
        assert_eq!(settings.path_limit, 240);
        assert_eq!(settings.download_dir, PathBuf::from("Courses"));
        assert_eq!(settings.user_agent, USER_AGENT);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yml");
        fs::write(&path, "path_limit: [1, 2").unwrap();
        assert!(read_settings(&path).is_err());
    }
}
