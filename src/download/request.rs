use std::path::{Path, PathBuf};

use anyhow::Context;
use futures::StreamExt;
use indicatif::ProgressStyle;
use reqwest::Response;
use tokio::{
    fs,
    fs::File,
    io::{AsyncWriteExt, BufWriter},
};
use tracing::{Span, debug, instrument};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use super::*;

const PART_SUFFIX: &str = ".part_dmstk-dl";

/// Saves the body of `response` at `file_path`, showing the transfer on the current span
///
/// Bytes go to `<file>.part_dmstk-dl` and are only moved into place once complete.
/// A failed transfer removes the part file again.
#[instrument(skip_all, fields(file = %file_path.display()))]
pub async fn write_response(file_path: &Path, response: Response) -> Result<()> {
    ensure_path_exists(file_path).await?;
    let part_path = part_path(file_path);

    let span = Span::current();
    let total_size = response.content_length();
    match progress_style(file_path, total_size) {
        Ok(style) => span.pb_set_style(&style),
        Err(e) => debug!("No progress bar for {}: {:#}", file_path.display(), e),
    }
    if let Some(total_size) = total_size {
        span.pb_set_length(total_size);
    }
    span.pb_set_position(0);

    if let Err(e) = stream_body(&part_path, response, &span).await {
        let _ = fs::remove_file(&part_path).await;
        return Err(e);
    }
    fs::rename(&part_path, file_path)
        .await
        .with_context(|| format!("Failed to move {} into place", file_path.display()))?;

    Ok(())
}

fn part_path(file_path: &Path) -> PathBuf {
    let mut part = file_path.as_os_str().to_owned();
    part.push(PART_SUFFIX);
    part.into()
}

/// A byte bar when the size is known, a spinner otherwise
fn progress_style(file_path: &Path, total_size: Option<u64>) -> Result<ProgressStyle> {
    let name = file_path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    match total_size {
        Some(_) => Ok(ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] \
                 {{bytes}}/{{total_bytes}} ({{eta}}) File: {}",
                name
            ))?
            .progress_chars("#>-")),
        None => Ok(ProgressStyle::default_spinner().template(&format!(
            "{{spinner:.green}} [{{elapsed_precise}}] {{bytes}} File: {}",
            name
        ))?),
    }
}

async fn stream_body(part_path: &Path, response: Response, span: &Span) -> Result<()> {
    let mut file = BufWriter::new(File::create(part_path).await?);
    let mut body = response.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        span.pb_set_position(written);
    }
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn writes_body_into_new_directory() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cover.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xff, 0xd8, 0xff]))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("Course").join("cover.jpg");
        let response = reqwest::get(format!("{}/cover.jpg", server.uri())).await.unwrap();
        write_response(&target, response).await.unwrap();

        assert_eq!(fs::read(&target).await.unwrap(), vec![0xff, 0xd8, 0xff]);
        let leftovers: Vec<_> = std::fs::read_dir(tmp.path().join("Course"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(leftovers, vec!["cover.jpg"]);
    }

    #[test]
    fn part_file_sits_next_to_the_target() {
        assert_eq!(
            part_path(Path::new("/courses/C/Recursos Adicionales/brushes.abr")),
            Path::new("/courses/C/Recursos Adicionales/brushes.abr.part_dmstk-dl")
        );
    }

    #[test]
    fn spinner_without_known_size() {
        assert!(progress_style(Path::new("cover.jpg"), None).is_ok());
        assert!(progress_style(Path::new("cover.jpg"), Some(3)).is_ok());
    }
}
