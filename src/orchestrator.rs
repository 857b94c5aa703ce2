use std::path::{self, Path, PathBuf};
use std::pin::pin;
use std::time::Duration;

use futures::StreamExt;
use reqwest::StatusCode;
use tokio::fs;
use tracing::{info, instrument, warn};
use url::Url;

use crate::{
    config::{cli::Cli, settings::Settings},
    course::{Course, CoursePage, CourseTreeBuilder, validate_course_url},
    download::{
        DownloadDispatcher, MediaFetcher, Outcome, StreamDownloader, request::write_response,
    },
    errors::FatalError,
    extract::UnitStateExtractor,
    sanitize::sanitize,
    session::Session,
    status_bar::StatusBar,
};

/// Folder inside the course that receives the attachments
pub const RESOURCES_DIR: &str = "Recursos Adicionales";
pub const COVER_FILE: &str = "cover.jpg";

/// Validates the url, logs in with the browser cookies and downloads the whole course
pub async fn run(cli: &Cli, settings: &Settings) -> Result<StatusBar, FatalError> {
    let url = validate_course_url(&cli.url)?;
    let session = Session::create(&cli.browser, &settings.user_agent)?;

    let download_dir =
        path::absolute(&settings.download_dir).unwrap_or_else(|_| settings.download_dir.clone());
    let orchestrator = Orchestrator {
        session,
        extractor: UnitStateExtractor::default(),
        dispatcher: DownloadDispatcher::new(
            StreamDownloader::new(settings.downloader.as_str()),
            &cli.quality,
            &cli.lang,
            settings.path_limit,
        ),
        download_dir,
        path_limit: settings.path_limit,
    };
    orchestrator.scrape_course(&url).await
}

pub struct Orchestrator<F: MediaFetcher> {
    pub session: Session,
    pub extractor: UnitStateExtractor,
    pub dispatcher: DownloadDispatcher<F>,
    pub download_dir: PathBuf,
    pub path_limit: usize,
}

impl<F: MediaFetcher> Orchestrator<F> {
    /// Course page, cover, every unit's videos and finally the attachments
    #[instrument(skip(self))]
    pub async fn scrape_course(&self, url: &str) -> Result<StatusBar, FatalError> {
        let html = self
            .session
            .fetch_html(url)
            .await
            .map_err(|source| FatalError::CoursePageUnavailable {
                url: url.to_string(),
                source,
            })?;
        let page = CoursePage::parse(&html);

        let title = page
            .title
            .as_deref()
            .ok_or_else(|| FatalError::MissingCourseTitle(url.to_string()))?;
        let course = Course::new(title, url, &self.download_dir, self.path_limit);
        fs::create_dir_all(&course.directory)
            .await
            .map_err(|source| FatalError::CourseDirectory {
                path: course.directory.display().to_string(),
                source,
            })?;
        info!("CURSO: {}", course.title.to_uppercase());

        let mut status = StatusBar::default();

        if let Some(cover_url) = &page.cover_url {
            status.register(self.download_cover(cover_url, &course.directory).await);
        }

        let builder =
            CourseTreeBuilder::new(&page, &course, &self.session, &self.extractor, self.path_limit);
        info!("Found {} units", builder.units().len());
        let mut tasks = pin!(builder.tasks());
        while let Some(task) = tasks.next().await {
            status.register(self.dispatcher.download_video(&task).await?);
        }

        if let Some(href) = &page.resources_href {
            match Url::parse(url).and_then(|base| base.join(href)) {
                Ok(resources_url) => {
                    let dir = course
                        .directory
                        .join(sanitize(RESOURCES_DIR, &course.directory, self.path_limit));
                    let outcomes = self
                        .dispatcher
                        .download_attachments(&self.session, resources_url.as_str(), &dir)
                        .await;
                    status.register_all(outcomes);
                }
                Err(e) => warn!("Invalid resources link {}: {}", href, e),
            }
        }

        Ok(status)
    }

    /// The cover is optional, failures are only logged
    async fn download_cover(&self, cover_url: &str, course_dir: &Path) -> Outcome {
        info!("Downloading cover image...");
        let response = match self.session.client.get(cover_url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Could not download the cover image: {}", e);
                return Outcome::Failed;
            }
        };
        if response.status() != StatusCode::OK {
            warn!("Could not download the cover image (Status: {})", response.status());
            return Outcome::Failed;
        }
        match write_response(&course_dir.join(COVER_FILE), response).await {
            Ok(()) => Outcome::Downloaded,
            Err(e) => {
                warn!("Could not save the cover image: {:#}", e);
                Outcome::Failed
            }
        }
    }
}

/// Formats a duration as `Hh Mm Ss`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}
