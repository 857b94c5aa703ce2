use futures::stream::{self, Stream, StreamExt};
use tracing::{info, warn};
use url::Url;

use super::*;
use crate::{
    extract::{UnitState, UnitStateExtractor},
    session::Session,
};

/// Turns the unit list of a course page into download tasks
///
/// Unit pages are only fetched while the task stream is polled, each of them once.
pub struct CourseTreeBuilder<'a> {
    session: &'a Session,
    extractor: &'a UnitStateExtractor,
    course: &'a Course,
    units: Vec<Unit>,
    path_limit: usize,
}

impl<'a> CourseTreeBuilder<'a> {
    pub fn new(
        page: &CoursePage,
        course: &'a Course,
        session: &'a Session,
        extractor: &'a UnitStateExtractor,
        path_limit: usize,
    ) -> Self {
        let base = Url::parse(&course.url).ok();
        let units = page
            .units
            .iter()
            .filter_map(|link| {
                let resolved = match &base {
                    Some(base) => base.join(&link.href),
                    None => Url::parse(&link.href),
                };
                match resolved {
                    Ok(url) => {
                        let title = sanitize(&link.title, &course.directory, path_limit);
                        Some(Unit {
                            directory: course.directory.join(&title),
                            title,
                            link: url,
                        })
                    }
                    Err(e) => {
                        warn!(
                            "Skipping unit {}: invalid link {} ({})",
                            link.title.trim(),
                            link.href,
                            e
                        );
                        None
                    }
                }
            })
            .collect();

        CourseTreeBuilder {
            session,
            extractor,
            course,
            units,
            path_limit,
        }
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Lazily yields the tasks of every unit in document order
    pub fn tasks(&self) -> impl Stream<Item = DownloadTask> + '_ {
        stream::iter(self.units.iter())
            .then(move |unit| self.resolve_unit(unit))
            .flat_map(stream::iter)
    }

    async fn resolve_unit(&self, unit: &Unit) -> Vec<DownloadTask> {
        info!("--- Processing unit: {} ---", unit.title);
        match self.extractor.extract(self.session, unit.link.as_str()).await {
            Some(state) if state.is_empty() => {
                info!("No videos in unit {}", unit.title);
                Vec::new()
            }
            Some(state) => self.unit_tasks(unit, &state),
            None => Vec::new(),
        }
    }

    /// Lessons are numbered by their position in the state, the final project is always `01`
    /// and lives in its own directory next to the units
    pub fn unit_tasks(&self, unit: &Unit, state: &UnitState) -> Vec<DownloadTask> {
        let mut tasks: Vec<DownloadTask> = state
            .lessons
            .iter()
            .map(|lesson| {
                let title = sanitize(&lesson.title, &self.course.directory, self.path_limit);
                DownloadTask {
                    unit: unit.title.clone(),
                    url: lesson.playback_url.clone(),
                    dir: unit.directory.clone(),
                    file_name: format!("{:02} - {}", lesson.index, title),
                }
            })
            .collect();

        if let Some(project) = &state.final_project {
            let title = sanitize(&project.title, &self.course.directory, self.path_limit);
            tasks.push(DownloadTask {
                unit: unit.title.clone(),
                url: project.playback_url.clone(),
                dir: self.course.directory.join(&title),
                file_name: format!("01 - {}", title),
            });
        }

        tasks
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::extract::{FinalProjectVideo, VideoLesson};
    use crate::sanitize::DEFAULT_PATH_LIMIT;

    fn course(url: &str) -> Course {
        Course::new("Color: teoría", url, Path::new("/downloads"), DEFAULT_PATH_LIMIT)
    }

    fn lesson(index: usize, title: &str) -> VideoLesson {
        VideoLesson {
            index,
            title: title.to_string(),
            playback_url: format!("https://cdn/{}.m3u8", index),
        }
    }

    fn unit_page(json: &str) -> String {
        format!(
            "<html><script>window.__INITIAL_PROPS__ = JSON.parse('{}');</script></html>",
            json
        )
    }

    #[test]
    fn lessons_numbered_in_source_order() {
        let course = course("https://www.domestika.org/en/courses/1-a/course");
        let page = CoursePage {
            units: vec![UnitLink {
                title: " Unit 1 ".to_string(),
                href: "/en/units/1".to_string(),
            }],
            ..Default::default()
        };
        let session = Session::from_cookies(&[], "test-agent").unwrap();
        let extractor = UnitStateExtractor::default();
        let builder =
            CourseTreeBuilder::new(&page, &course, &session, &extractor, DEFAULT_PATH_LIMIT);

        let unit = &builder.units()[0];
        assert_eq!(unit.title, "Unit 1");
        assert_eq!(unit.link.as_str(), "https://www.domestika.org/en/units/1");
        assert_eq!(unit.directory, Path::new("/downloads/Color_ teoría/Unit 1"));

        let state = UnitState {
            lessons: vec![lesson(1, "Intro"), lesson(2, "Setup: tools")],
            final_project: None,
        };
        let names: Vec<_> = builder
            .unit_tasks(unit, &state)
            .into_iter()
            .map(|task| task.file_name)
            .collect();
        assert_eq!(names, vec!["01 - Intro", "02 - Setup_ tools"]);
    }

    #[test]
    fn final_project_gets_own_directory() {
        let course = course("https://www.domestika.org/en/courses/1-a/course");
        let page = CoursePage {
            units: vec![UnitLink {
                title: "Unit 5".to_string(),
                href: "https://www.domestika.org/en/units/5".to_string(),
            }],
            ..Default::default()
        };
        let session = Session::from_cookies(&[], "test-agent").unwrap();
        let extractor = UnitStateExtractor::default();
        let builder =
            CourseTreeBuilder::new(&page, &course, &session, &extractor, DEFAULT_PATH_LIMIT);
        let unit = &builder.units()[0];

        let state = UnitState {
            lessons: vec![lesson(1, "A"), lesson(2, "B"), lesson(3, "C")],
            final_project: Some(FinalProjectVideo {
                title: "Proyecto Final".to_string(),
                playback_url: "https://cdn/project.m3u8".to_string(),
            }),
        };
        let tasks = builder.unit_tasks(unit, &state);
        assert_eq!(tasks.len(), 4);

        let project = tasks.last().unwrap();
        assert_eq!(project.file_name, "01 - Proyecto Final");
        assert_eq!(project.dir, Path::new("/downloads/Color_ teoría/Proyecto Final"));
        assert_ne!(project.dir, unit.directory);
        assert_eq!(tasks[0].file_name, "01 - A");
    }

    #[tokio::test]
    async fn unit_without_state_does_not_stop_the_others() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/units/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>locked</html>"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/units/2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(unit_page(
                r#"{\"videos\":[{\"video\":{\"title\":\"Intro\",\"playbackURL\":\"https://cdn/1.m3u8\"}},{\"video\":{\"title\":\"Setup\",\"playbackURL\":\"https://cdn/2.m3u8\"}}]}"#,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let course = course(&format!("{}/en/courses/1-a/course", server.uri()));
        let page = CoursePage {
            units: vec![
                UnitLink {
                    title: "Locked".to_string(),
                    href: "/units/1".to_string(),
                },
                UnitLink {
                    title: "Open".to_string(),
                    href: "/units/2".to_string(),
                },
            ],
            ..Default::default()
        };
        let session = Session::from_cookies(&[], "test-agent").unwrap();
        let extractor = UnitStateExtractor::default();
        let builder =
            CourseTreeBuilder::new(&page, &course, &session, &extractor, DEFAULT_PATH_LIMIT);

        let tasks: Vec<DownloadTask> = builder.tasks().collect().await;
        let names: Vec<_> = tasks.iter().map(|t| t.file_name.as_str()).collect();
        assert_eq!(names, vec!["01 - Intro", "02 - Setup"]);
        assert!(tasks.iter().all(|t| t.unit == "Open"));
        assert_eq!(tasks[1].url, "https://cdn/2.m3u8");
    }
}
