use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::FatalError;

static RE_COURSE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https://www\.domestika\.org/.+?/courses/\d+-[-\w]+)(/course)?/?$").unwrap()
});

/// Checks a course url and returns its canonical form, which always ends in `/course`
pub fn validate_course_url(url: &str) -> Result<String, FatalError> {
    RE_COURSE_URL
        .captures(url.trim())
        .map(|captures| format!("{}/course", &captures[1]))
        .ok_or_else(|| FatalError::InvalidUrl(url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL: &str = "https://www.domestika.org/en/courses/1234-sample-course/course";

    #[test]
    fn appends_course_segment() {
        assert_eq!(
            validate_course_url("https://www.domestika.org/en/courses/1234-sample-course").unwrap(),
            CANONICAL
        );
    }

    #[test]
    fn keeps_existing_course_segment() {
        for url in [
            "https://www.domestika.org/en/courses/1234-sample-course/",
            "https://www.domestika.org/en/courses/1234-sample-course/course",
            "https://www.domestika.org/en/courses/1234-sample-course/course/",
        ] {
            assert_eq!(validate_course_url(url).unwrap(), CANONICAL);
        }
    }

    #[test]
    fn accepts_other_locales() {
        assert_eq!(
            validate_course_url("https://www.domestika.org/es/courses/42-acuarela-botánica")
                .unwrap(),
            "https://www.domestika.org/es/courses/42-acuarela-botánica/course"
        );
    }

    #[test]
    fn rejects_foreign_or_malformed_urls() {
        for url in [
            "https://example.com/courses/1234-x",
            "http://www.domestika.org/en/courses/1234-x",
            "https://www.domestika.org/en/courses/sample-course",
            "https://www.domestika.org/en/courses/1234-x/units/5",
        ] {
            assert!(matches!(
                validate_course_url(url),
                Err(FatalError::InvalidUrl(_))
            ));
        }
    }
}
