use std::sync::Arc;

use anyhow::anyhow;
use reqwest::{Client, Response, cookie::Jar};
use tracing::{debug, trace};
use url::Url;

use crate::{Result, config::cli::Browser, errors::FatalError};

/// Domain filter used when reading the browser's cookie store
pub const COOKIE_DOMAIN: &str = "domestika.org";

/// A cookie as stored by a browser
#[derive(Debug, Clone)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
}

/// Anything that can hand out the cookies of a logged in session
pub trait CookieSource {
    fn name(&self) -> String;
    fn load(&self, domain: &str) -> Result<Vec<StoredCookie>>;
}

impl CookieSource for Browser {
    fn name(&self) -> String {
        format!("{:?}", self).to_lowercase()
    }

    fn load(&self, domain: &str) -> Result<Vec<StoredCookie>> {
        let domains = Some(vec![domain.to_string()]);
        let cookies = match self {
            Browser::Firefox => rookie::firefox(domains),
            Browser::Chrome => rookie::chrome(domains),
            Browser::Edge => rookie::edge(domains),
            Browser::Brave => rookie::brave(domains),
        }
        .map_err(|e| anyhow!("{e}"))?;

        Ok(cookies
            .into_iter()
            .map(|cookie| StoredCookie {
                name: cookie.name,
                value: cookie.value,
                domain: cookie.domain,
                path: cookie.path,
            })
            .collect())
    }
}

/// Authenticated http session
#[derive(Debug, Clone)]
pub struct Session {
    /// The cookie jar containing the browser cookies
    pub cookie_jar: Arc<Jar>,
    /// The client used for requests
    pub client: Client,
}

impl Session {
    /// Creates a session from the cookies of `source`
    ///
    /// Failing to get any cookie is fatal, nothing can be downloaded without a session
    pub fn create(
        source: &impl CookieSource,
        user_agent: &str,
    ) -> std::result::Result<Self, FatalError> {
        let unavailable = |reason: String| FatalError::CredentialUnavailable {
            browser: source.name(),
            reason,
        };

        let cookies = source
            .load(COOKIE_DOMAIN)
            .map_err(|e| unavailable(e.to_string()))?;
        if cookies.is_empty() {
            return Err(unavailable("no stored session found".to_string()));
        }
        debug!("Loaded {} cookies from {}", cookies.len(), source.name());

        Session::from_cookies(&cookies, user_agent).map_err(|e| unavailable(e.to_string()))
    }

    /// Builds the client with all given cookies and a fixed user agent
    pub fn from_cookies(cookies: &[StoredCookie], user_agent: &str) -> Result<Self> {
        let cookie_jar = Arc::new(Jar::default());
        for cookie in cookies {
            let domain = cookie.domain.trim_start_matches('.');
            let origin = Url::parse(&format!("https://{}/", domain))?;
            let path = if cookie.path.is_empty() { "/" } else { &cookie.path };
            trace!("Adding cookie {} for {}", cookie.name, domain);
            cookie_jar.add_cookie_str(
                &format!(
                    "{}={}; Domain={}; Path={}",
                    cookie.name, cookie.value, domain, path
                ),
                &origin,
            );
        }

        let client = Client::builder()
            .cookie_provider(cookie_jar.clone())
            .user_agent(user_agent)
            .build()?;
        Ok(Session { cookie_jar, client })
    }

    /// Authenticated GET, any non 2xx status is an error
    pub async fn get(&self, url: &str) -> Result<Response> {
        debug!("GET {}", url);
        Ok(self.client.get(url).send().await?.error_for_status()?)
    }

    /// Fetches a page and returns its markup
    pub async fn fetch_html(&self, url: &str) -> Result<String> {
        Ok(self.get(url).await?.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use reqwest::cookie::CookieStore;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    struct FixedCookies(Vec<StoredCookie>);

    impl CookieSource for FixedCookies {
        fn name(&self) -> String {
            "fixed".to_string()
        }

        fn load(&self, _domain: &str) -> Result<Vec<StoredCookie>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenStore;

    impl CookieSource for BrokenStore {
        fn name(&self) -> String {
            "broken".to_string()
        }

        fn load(&self, _domain: &str) -> Result<Vec<StoredCookie>> {
            Err(anyhow!("profile not found"))
        }
    }

    fn session_cookie(domain: &str) -> StoredCookie {
        StoredCookie {
            name: "_domestika_session".to_string(),
            value: "abc123".to_string(),
            domain: domain.to_string(),
            path: "/".to_string(),
        }
    }

    #[test]
    fn cookies_are_scoped_to_their_domain() {
        let session = Session::create(
            &FixedCookies(vec![session_cookie(".domestika.org")]),
            "test-agent",
        )
        .unwrap();

        let url = Url::parse("https://www.domestika.org/en/courses").unwrap();
        let header = session.cookie_jar.cookies(&url).unwrap();
        assert_eq!(header.to_str().unwrap(), "_domestika_session=abc123");

        let other = Url::parse("https://example.com/").unwrap();
        assert!(session.cookie_jar.cookies(&other).is_none());
    }

    #[test]
    fn empty_store_is_fatal() {
        let err = Session::create(&FixedCookies(vec![]), "test-agent").unwrap_err();
        assert!(matches!(err, FatalError::CredentialUnavailable { .. }));
    }

    #[test]
    fn failing_store_is_fatal() {
        match Session::create(&BrokenStore, "test-agent") {
            Err(FatalError::CredentialUnavailable { browser, reason }) => {
                assert_eq!(browser, "broken");
                assert!(reason.contains("profile not found"));
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn browser_names() {
        assert_eq!(Browser::Firefox.name(), "firefox");
        assert_eq!(Browser::Brave.name(), "brave");
    }

    #[tokio::test]
    async fn requests_carry_user_agent_and_fail_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("user-agent", "test-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/locked"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let session = Session::from_cookies(&[], "test-agent").unwrap();
        let html = session
            .fetch_html(&format!("{}/page", server.uri()))
            .await
            .unwrap();
        assert_eq!(html, "<html></html>");
        assert!(
            session
                .fetch_html(&format!("{}/locked", server.uri()))
                .await
                .is_err()
        );
    }
}
