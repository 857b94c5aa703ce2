use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use select::{document::Document, predicate::Name};
use serde_json::Value;

use super::*;

/// Global the unit pages assign their state to
pub const INITIAL_PROPS_MARKER: &str = "window.__INITIAL_PROPS__";

static RE_JSON_PARSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"JSON\.parse\('(.+?)'\);").unwrap());

/// Reads `window.__INITIAL_PROPS__ = JSON.parse('...');` from a unit page
#[derive(Debug, Default, Clone, Copy)]
pub struct InitialPropsExtractor;

impl StateExtractor for InitialPropsExtractor {
    fn extract(&self, document: &Document) -> Result<Option<Value>> {
        let script = match document
            .find(Name("script"))
            .map(|node| node.text())
            .find(|text| text.contains(INITIAL_PROPS_MARKER))
        {
            Some(script) => script,
            None => return Ok(None),
        };

        let captures = match RE_JSON_PARSE.captures(&script) {
            Some(captures) => captures,
            None => return Ok(None),
        };
        let json = unescape(&captures[1]);
        trace!("Initial props: {}", json);

        let value = serde_json::from_str(&json).context("Malformed __INITIAL_PROPS__ json")?;
        Ok(Some(value))
    }
}

/// Undo the string escaping of the json literal
fn unescape(literal: &str) -> String {
    literal.replace("\\\"", "\"").replace("\\\\", "\\")
}
