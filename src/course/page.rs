use once_cell::sync::Lazy;
use regex::Regex;
use select::{
    document::Document,
    node::Node,
    predicate::{Class, Name, Predicate},
};
use tracing::{debug, warn};

static RE_COVER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https://imgproxy\.domestika\.org/unsafe/s:\d+:\d+/rs:fill/ex:true/el:true/plain/src://course-covers/\d+/\d+/\d+/\d+-original\.jpg\?\d+").unwrap()
});

/// Class name fragments the course heading has carried over the site's redesigns
const TITLE_CLASS_MARKERS: [&str; 2] = ["course-header-new__title", "my-[10px]"];
/// Labels of the list entry linking to the course attachments
const RESOURCES_LABELS: [&str; 2] = ["Recursos adicionales", "Additional Resources"];

/// Link to a unit as listed on the course page
#[derive(Debug, Clone, PartialEq)]
pub struct UnitLink {
    pub title: String,
    pub href: String,
}

/// Everything the pipeline needs from the course page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoursePage {
    pub title: Option<String>,
    pub cover_url: Option<String>,
    /// Units in document order
    pub units: Vec<UnitLink>,
    pub resources_href: Option<String>,
}

impl CoursePage {
    pub fn parse(html: &str) -> Self {
        let document = Document::from(html);

        let title = document
            .find(Name("h1"))
            .find(|node| has_title_class(node))
            .map(|node| node.text());

        let cover_url = RE_COVER.find(html).map(|m| m.as_str().to_string());

        let mut units = Vec::new();
        for (i, unit) in document
            .find(Name("li").and(Class("unit-item")))
            .enumerate()
        {
            let anchor = unit
                .find(Name("h4").and(Class("unit-item__title")).descendant(Name("a")))
                .next();
            match anchor.and_then(|a| a.attr("href").map(|href| (a.text(), href))) {
                Some((title, href)) => units.push(UnitLink {
                    title,
                    href: href.to_string(),
                }),
                None => warn!("Skipping unit {}: no title found", i + 1),
            }
        }
        debug!("Found {} units", units.len());

        // Menus nest lists, so the label has to be the anchor's own text
        let resources_href = document
            .find(Name("li").descendant(Name("a")))
            .filter(|a| {
                let text = a.text();
                RESOURCES_LABELS.iter().any(|label| text.contains(label))
            })
            .find_map(|a| a.attr("href"))
            .map(str::to_string);

        CoursePage {
            title,
            cover_url,
            units,
            resources_href,
        }
    }
}

fn has_title_class(node: &Node) -> bool {
    node.attr("class").is_some_and(|classes| {
        classes
            .split_whitespace()
            .any(|class| TITLE_CLASS_MARKERS.iter().any(|marker| class.contains(marker)))
    })
}
