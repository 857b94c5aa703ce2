pub mod attachments;
pub mod media;
pub mod request;

use std::path::Path;

use tokio::{fs, io};
use tracing::{error, info, instrument};

use crate::{
    Result,
    course::DownloadTask,
    errors::{FatalError, FetchError},
};

pub use media::{MediaFetcher, MediaRequest, StreamDownloader};

/// What happened to a single item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Downloaded,
    /// The output file was already there
    Skipped,
    Failed,
}

/// Ensures that the directory specified by the given `Path` exists.
async fn ensure_path_exists(path: &Path) -> Result<()> {
    if let Some(parent_dir) = path.parent() {
        fs::create_dir_all(parent_dir).await?;
    }
    Ok(())
}

/// Check if a file exists
/// # Returns
/// true if file exists
pub async fn check_exists(file_path: &Path) -> Result<bool> {
    match fs::metadata(file_path).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Hands videos to a `MediaFetcher` and writes attachments, one item at a time
///
/// The existence of the output file is the only record of a finished download.
pub struct DownloadDispatcher<F: MediaFetcher> {
    fetcher: F,
    quality: String,
    lang: String,
    path_limit: usize,
}

impl<F: MediaFetcher> DownloadDispatcher<F> {
    pub fn new(fetcher: F, quality: &str, lang: &str, path_limit: usize) -> Self {
        Self {
            fetcher,
            quality: quality.to_string(),
            lang: lang.to_string(),
            path_limit,
        }
    }

    #[cfg(test)]
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Downloads `task.dir/task.file_name.mp4` unless it already exists
    ///
    /// Only a missing downloader executable is returned as an error, every other failure is
    /// logged and reported as `Outcome::Failed`.
    #[instrument(skip(self, task), fields(unit = %task.unit))]
    pub async fn download_video(
        &self,
        task: &DownloadTask,
    ) -> std::result::Result<Outcome, FatalError> {
        let output = task.dir.join(format!("{}.mp4", task.file_name));

        match check_exists(&output).await {
            Ok(true) => {
                info!("The file '{}.mp4' already exists", task.file_name);
                return Ok(Outcome::Skipped);
            }
            Ok(false) => {}
            Err(e) => {
                error!("Could not check {}: {:#}", output.display(), e);
                return Ok(Outcome::Failed);
            }
        }

        if let Err(e) = fs::create_dir_all(&task.dir).await {
            error!("Could not create {}: {}", task.dir.display(), e);
            return Ok(Outcome::Failed);
        }

        info!("Downloading video: '{}'", task.file_name);
        let request = MediaRequest {
            url: task.url.clone(),
            save_dir: task.dir.clone(),
            save_name: task.file_name.clone(),
            quality: self.quality.clone(),
            lang: self.lang.clone(),
        };
        match self.fetcher.fetch(&request).await {
            Ok(()) => Ok(Outcome::Downloaded),
            Err(FetchError::ToolMissing(program)) => Err(FatalError::DownloaderMissing(program)),
            Err(e) => {
                error!("Error downloading '{}': {}", task.file_name, e);
                Ok(Outcome::Failed)
            }
        }
    }
}
