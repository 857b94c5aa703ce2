use std::process::ExitStatus;

use thiserror::Error;

/// Conditions that end the whole run
#[derive(Debug, Error)]
pub enum FatalError {
    #[error(
        "Invalid course url: \"{0}\" (expected https://www.domestika.org/<lang>/courses/<id>-<name>)"
    )]
    InvalidUrl(String),

    #[error(
        "Could not load cookies for '{browser}': {reason}. Make sure you are logged into Domestika in that browser"
    )]
    CredentialUnavailable { browser: String, reason: String },

    #[error("Could not access the course page {url}: {source}")]
    CoursePageUnavailable {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Could not find the course title on {0}")]
    MissingCourseTitle(String),

    #[error("'{0}' was not found. Make sure it is in your PATH and executable")]
    DownloaderMissing(String),

    #[error("Could not create the course directory {path}: {source}")]
    CourseDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Settings(anyhow::Error),
}

/// Failure of the external streaming download tool
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("'{0}' could not be found")]
    ToolMissing(String),

    #[error("downloader exited with status: {0}")]
    Exited(ExitStatus),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
