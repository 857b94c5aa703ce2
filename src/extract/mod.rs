mod initial_props;

pub use initial_props::InitialPropsExtractor;

use select::document::Document;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, instrument, trace, warn};

use crate::{Result, session::Session};

/// Title used when a final project does not name itself
pub const DEFAULT_PROJECT_TITLE: &str = "Proyecto Final";

/// Finds the serialized state of a unit inside its page
///
/// Returns `Ok(None)` when the page carries no state (e.g. locked content)
pub trait StateExtractor {
    fn extract(&self, document: &Document) -> Result<Option<Value>>;
}

/// A regular lesson of a unit
#[derive(Debug, Clone, PartialEq)]
pub struct VideoLesson {
    /// 1-based position inside the unit's `videos` array
    pub index: usize,
    pub title: String,
    pub playback_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinalProjectVideo {
    pub title: String,
    pub playback_url: String,
}

/// The videos found in a unit's state
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UnitState {
    pub lessons: Vec<VideoLesson>,
    pub final_project: Option<FinalProjectVideo>,
}

#[derive(Debug, Deserialize)]
struct LessonEntry {
    video: VideoInfo,
}

#[derive(Debug, Deserialize)]
struct VideoInfo {
    title: String,
    #[serde(rename = "playbackURL")]
    playback_url: String,
}

#[derive(Debug, Deserialize)]
struct PlaybackInfo {
    #[serde(rename = "playbackURL")]
    playback_url: String,
}

impl UnitState {
    /// Interprets the `videos` list and the final project (`video` / `title`) of a unit state
    pub fn from_value(value: &Value) -> Self {
        let lessons = value
            .get("videos")
            .and_then(Value::as_array)
            .map(|videos| {
                videos
                    .iter()
                    .enumerate()
                    .filter_map(|(i, entry)| {
                        match serde_json::from_value::<LessonEntry>(entry.clone()) {
                            Ok(lesson) => Some(VideoLesson {
                                index: i + 1,
                                title: lesson.video.title,
                                playback_url: lesson.video.playback_url,
                            }),
                            Err(e) => {
                                warn!("Skipping lesson {}: {}", i + 1, e);
                                None
                            }
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let final_project = match value.get("video") {
            Some(video) if is_truthy(video) => {
                match serde_json::from_value::<PlaybackInfo>(video.clone()) {
                    Ok(info) => Some(FinalProjectVideo {
                        title: value
                            .get("title")
                            .and_then(Value::as_str)
                            .unwrap_or(DEFAULT_PROJECT_TITLE)
                            .to_string(),
                        playback_url: info.playback_url,
                    }),
                    Err(e) => {
                        warn!("Skipping final project: {}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        UnitState {
            lessons,
            final_project,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty() && self.final_project.is_none()
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Fetches unit pages and reads their state through a swappable strategy
pub struct UnitStateExtractor {
    strategy: Box<dyn StateExtractor + Send + Sync>,
}

impl Default for UnitStateExtractor {
    fn default() -> Self {
        Self::new(InitialPropsExtractor)
    }
}

impl UnitStateExtractor {
    pub fn new(strategy: impl StateExtractor + Send + Sync + 'static) -> Self {
        Self {
            strategy: Box::new(strategy),
        }
    }

    /// Fetches the unit page and extracts its state
    ///
    /// Every failure is logged and results in `None`, so the remaining units are still processed
    #[instrument(skip(self, session))]
    pub async fn extract(&self, session: &Session, unit_url: &str) -> Option<UnitState> {
        let html = match session.fetch_html(unit_url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("No access to this lesson or network error: {:#}", e);
                return None;
            }
        };
        self.extract_from_html(&html)
    }

    pub fn extract_from_html(&self, html: &str) -> Option<UnitState> {
        let document = Document::from(html);
        match self.strategy.extract(&document) {
            Ok(Some(value)) => Some(UnitState::from_value(&value)),
            Ok(None) => {
                warn!("No embedded unit state found in the page");
                None
            }
            Err(e) => {
                error!("Failed decoding the unit state: {:#}", e);
                None
            }
        }
    }
}
