use std::path::{self, Path};

use once_cell::sync::Lazy;
use regex::Regex;

/// Default maximum length (in characters) of a full path produced by `sanitize`
pub const DEFAULT_PATH_LIMIT: usize = 200;

static RE_FORBIDDEN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());

/// Turns scraped text into a single path segment that can be placed inside `base_path`.
///
/// Forbidden characters (`< > : " / \ | ? *`) become `_` and surrounding whitespace is removed.
/// If `base_path/name` would be longer than `limit` characters, the name is cut down to the
/// space that remains after the base path and its separator.
///
/// Never fails: when the base path alone already exceeds the limit, the cut follows
/// slice semantics for a negative length and drops that many characters from the end.
pub fn sanitize(name: &str, base_path: &Path, limit: usize) -> String {
    let cleaned = RE_FORBIDDEN.replace_all(name, "_").trim().to_string();

    let base = path::absolute(base_path).unwrap_or_else(|_| base_path.to_path_buf());
    let full_len = base.join(&cleaned).to_string_lossy().chars().count();
    if full_len <= limit {
        return cleaned;
    }

    // `join("")` yields the base path with a trailing separator
    let base_len = base.join("").to_string_lossy().chars().count();
    let available = limit as i64 - base_len as i64;

    let name_len = cleaned.chars().count() as i64;
    let keep = if available >= 0 {
        available.min(name_len)
    } else {
        (name_len + available).max(0)
    };

    cleaned
        .chars()
        .take(keep as usize)
        .collect::<String>()
        .trim_end()
        .to_string()
}
