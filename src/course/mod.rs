mod page;
mod tree;
mod validate;

pub use page::{CoursePage, UnitLink};
pub use tree::CourseTreeBuilder;
pub use validate::validate_course_url;

use std::path::{Path, PathBuf};

use crate::sanitize::sanitize;

/// The course being downloaded, derived once per run
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub title: String,
    pub url: String,
    pub directory: PathBuf,
}

impl Course {
    /// Sanitizes the scraped title and places the course inside `download_dir`
    pub fn new(raw_title: &str, url: &str, download_dir: &Path, path_limit: usize) -> Self {
        let title = sanitize(raw_title, download_dir, path_limit);
        Course {
            directory: download_dir.join(&title),
            title,
            url: url.to_string(),
        }
    }
}

/// A unit of the course with its own directory
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub title: String,
    pub link: url::Url,
    pub directory: PathBuf,
}

/// A single video to hand to the dispatcher
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadTask {
    /// Unit the video was found in (for logging)
    pub unit: String,
    pub url: String,
    pub dir: PathBuf,
    /// File name without the `.mp4` extension
    pub file_name: String,
}
