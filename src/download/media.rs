use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use indicatif::ProgressStyle;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{Span, debug, instrument, trace, warn};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::errors::FetchError;

static RE_PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,3}(?:\.\d+)?)%").unwrap());

/// Everything the streaming tool needs for one video
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRequest {
    /// Manifest / playback url
    pub url: String,
    pub save_dir: PathBuf,
    /// Output file name without extension
    pub save_name: String,
    /// Resolution selector (e.g. "1080")
    pub quality: String,
    /// Subtitle / audio track name (e.g. "Español")
    pub lang: String,
}

/// Resolves a playback url into a video file on disk
pub trait MediaFetcher {
    async fn fetch(&self, request: &MediaRequest) -> Result<(), FetchError>;
}

/// Runs N_m3u8DL-RE as a child process
#[derive(Debug, Clone)]
pub struct StreamDownloader {
    program: String,
}

impl StreamDownloader {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn args(request: &MediaRequest) -> Vec<OsString> {
        vec![
            "-sv".into(),
            format!("res={}", request.quality).into(),
            request.url.clone().into(),
            "-ss".into(),
            format!("name={}", request.lang).into(),
            "--save-dir".into(),
            request.save_dir.clone().into_os_string(),
            "--save-name".into(),
            request.save_name.clone().into(),
        ]
    }
}

impl MediaFetcher for StreamDownloader {
    /// Runs the tool and waits for it, displaying a progress bar
    #[instrument(skip(self, request), fields(video = %request.save_name))]
    async fn fetch(&self, request: &MediaRequest) -> Result<(), FetchError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(StreamDownloader::args(request));

        debug!("{} params: {:?}", self.program, cmd);

        // Spawn the process
        let mut child = match cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(FetchError::ToolMissing(self.program.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        // Prepare template
        let mut template =
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% ({eta})  Video: "
                .to_string();
        template.push_str(&request.save_name);
        if let Ok(style) = ProgressStyle::default_bar().template(&template) {
            Span::current().pb_set_style(&style.progress_chars("#>-"));
        }
        Span::current().pb_set_length(1000);
        Span::current().pb_set_position(0);

        // Process the tool's stdout line by line, console code pages are not always UTF-8
        let mut percent_extractor = PercentExtractor::default();
        let mut read_error = None;
        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).split(b'\n');
            loop {
                match lines.next_segment().await {
                    Ok(Some(raw)) => {
                        let line = String::from_utf8_lossy(&raw);
                        trace!("{}", line);
                        percent_extractor.push_new_line(&line);
                        Span::current()
                            .pb_set_position((percent_extractor.percentage * 10.0) as u64);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        read_error = Some(e);
                        break;
                    }
                }
            }
        }

        // Never return while the tool is still running
        if let Some(e) = read_error {
            warn!("Lost the output of {}, stopping it: {}", self.program, e);
            child.kill().await?;
            return Err(e.into());
        }

        // Wait for the tool to finish
        let status = child.wait().await?;
        if !status.success() {
            return Err(FetchError::Exited(status));
        }

        Ok(())
    }
}

/// Helper to extract the percentage from the tool's progress lines
///
/// Video, audio and subtitle tracks are fetched one after the other, each counting up to 100%.
#[derive(Debug, Default)]
struct PercentExtractor {
    pub percentage: f32,
}

impl PercentExtractor {
    fn push_new_line(&mut self, line: &str) {
        let value: f32 = match RE_PERCENT
            .captures_iter(line)
            .last()
            .and_then(|captures| captures[1].parse().ok())
        {
            Some(value) => value,
            None => return,
        };
        if value > 100.0 {
            return;
        }

        trace!("Extracted percentage: {}", value);
        self.percentage = if (value - self.percentage).abs() < 50.0 {
            self.percentage.max(value)
        } else {
            value
        };
    }
}
