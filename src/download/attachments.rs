use std::path::Path;

use percent_encoding::percent_decode_str;
use select::{
    document::Document,
    predicate::{Class, Name, Predicate},
};
use tracing::warn;
use url::Url;

use super::*;
use crate::{download::request::write_response, sanitize::sanitize, session::Session};

/// Collects the hrefs of `h3.material-item__title a[href]`
fn attachment_links(html: &str) -> Vec<String> {
    Document::from(html)
        .find(
            Name("h3")
                .and(Class("material-item__title"))
                .descendant(Name("a")),
        )
        .filter_map(|a| a.attr("href").map(str::to_string))
        .collect()
}

/// Last path segment of `url`, percent-decoded
fn file_name_from_url(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");
    percent_decode_str(segment).decode_utf8_lossy().to_string()
}

impl<F: MediaFetcher> DownloadDispatcher<F> {
    /// Downloads every file listed on the course's resources page into `dir`
    ///
    /// Failures are logged per file and never stop the batch.
    #[instrument(skip(self, session, dir))]
    pub async fn download_attachments(
        &self,
        session: &Session,
        resources_url: &str,
        dir: &Path,
    ) -> Vec<Outcome> {
        let html = match session.fetch_html(resources_url).await {
            Ok(html) => html,
            Err(e) => {
                error!("Error fetching the resources page: {:#}", e);
                return Vec::new();
            }
        };

        let links = attachment_links(&html);
        if links.is_empty() {
            info!("No additional resources found");
            return Vec::new();
        }

        info!("Downloading additional resources...");
        if let Err(e) = fs::create_dir_all(dir).await {
            error!("Could not create {}: {}", dir.display(), e);
            return vec![Outcome::Failed; links.len()];
        }

        let base = Url::parse(resources_url).ok();
        let mut outcomes = Vec::with_capacity(links.len());
        for href in links {
            let outcome = match self.download_attachment(session, base.as_ref(), &href, dir).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Could not download the file from {}: {:#}", href, e);
                    Outcome::Failed
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn download_attachment(
        &self,
        session: &Session,
        base: Option<&Url>,
        href: &str,
        dir: &Path,
    ) -> Result<Outcome> {
        let url = match base {
            Some(base) => base.join(href)?,
            None => Url::parse(href)?,
        };

        let response = session.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            warn!(
                "Could not download the file from {} (Status: {})",
                url,
                response.status()
            );
            return Ok(Outcome::Failed);
        }

        // Redirects may lead to a storage url carrying the real name
        let file_name = sanitize(&file_name_from_url(response.url()), dir, self.path_limit);
        if file_name.is_empty() {
            warn!("No file name in {}, skipping", response.url());
            return Ok(Outcome::Failed);
        }

        info!(" -> Downloading '{}'", file_name);
        write_response(&dir.join(&file_name), response).await?;
        Ok(Outcome::Downloaded)
    }
}
