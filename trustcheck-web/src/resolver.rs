//! Content resolver: raw input to [`ResolvedContent`].
//!
//! Plain text passes through untouched. URL-shaped input is fetched once
//! (short timeout, no retry), only a bounded prefix of the body is read, and
//! the URL's host is checked against the trusted-origin allowlist.

use async_trait::async_trait;
use std::time::Duration;
use trustcheck_common::{CheckError, DomainMatch, ResolvedContent, Result, truncate_chars};
use trustcheck_http::{HttpClient, RequestOpts};
use url::Url;

use crate::traits::ContentSource;

pub use trustcheck_common::DEFAULT_TRUSTED_DOMAINS;

/// Characters of the fetched body considered at all.
pub const FETCH_PREFIX_CHARS: usize = 2000;
/// Characters of the fetched body handed to the judgment signal.
pub const JUDGE_TEXT_CHARS: usize = 1000;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

// Worst case of 4 UTF-8 bytes per character.
const FETCH_BYTE_BUDGET: usize = FETCH_PREFIX_CHARS * 4;

/// Whether input is treated as a URL. Deliberately a plain prefix check:
/// anything else is judged as text.
///
/// ```
/// use trustcheck_web::resolver::is_url_like;
///
/// assert!(is_url_like("https://www.bbc.com/news"));
/// assert!(!is_url_like("www.bbc.com/news"));
/// ```
pub fn is_url_like(raw: &str) -> bool {
    raw.starts_with("http://") || raw.starts_with("https://")
}

/// Allowlist of reputable news domains; a weak authenticity hint, not a
/// security boundary.
#[derive(Debug, Clone)]
pub struct TrustedDomains {
    domains: Vec<String>,
    mode: DomainMatch,
}

impl Default for TrustedDomains {
    fn default() -> Self {
        Self::new(DEFAULT_TRUSTED_DOMAINS.iter().copied(), DomainMatch::default())
    }
}

impl TrustedDomains {
    pub fn new<I, S>(domains: I, mode: DomainMatch) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| d.as_ref().trim().trim_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains, mode }
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn mode(&self) -> DomainMatch {
        self.mode
    }

    /// ```
    /// use trustcheck_common::DomainMatch;
    /// use trustcheck_web::resolver::TrustedDomains;
    /// use url::Url;
    ///
    /// let loose = TrustedDomains::default();
    /// let strict = TrustedDomains::new(["nytimes.com"], DomainMatch::HostSuffix);
    /// let spoof = Url::parse("https://nytimes.com.attacker.example/a").unwrap();
    /// assert!(loose.is_trusted(&spoof));
    /// assert!(!strict.is_trusted(&spoof));
    /// ```
    pub fn is_trusted(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.trim_end_matches('.').to_ascii_lowercase();

        self.domains.iter().any(|domain| match self.mode {
            DomainMatch::Substring => host.contains(domain.as_str()),
            DomainMatch::HostSuffix => {
                host == *domain
                    || host
                        .strip_suffix(domain.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
        })
    }
}

/// [`ContentSource`] that fetches URL-shaped input over HTTP.
#[derive(Clone)]
pub struct UrlResolver {
    http: HttpClient,
    trusted: TrustedDomains,
    timeout: Duration,
}

impl UrlResolver {
    pub fn new(trusted: TrustedDomains) -> Result<Self> {
        let http = HttpClient::detached()
            .map_err(|e| CheckError::Config(format!("HttpClient init failed: {e}")))?;
        Ok(Self {
            http,
            trusted,
            timeout: DEFAULT_FETCH_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn fetch_prefix(&self, url: &Url) -> Result<String> {
        self.http
            .get_text_prefix(
                url.as_str(),
                FETCH_BYTE_BUDGET,
                RequestOpts {
                    timeout: Some(self.timeout),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| CheckError::Fetch {
                cause: e.to_string(),
            })
    }
}

#[async_trait]
impl ContentSource for UrlResolver {
    async fn resolve(&self, raw: &str) -> Result<ResolvedContent> {
        if !is_url_like(raw) {
            return Ok(ResolvedContent::plain(raw));
        }

        let fetched = match Url::parse(raw) {
            Ok(url) => self.fetch_prefix(&url).await.map(|body| (url, body)),
            Err(e) => Err(CheckError::Fetch {
                cause: format!("invalid URL: {e}"),
            }),
        };
        let (url, body) = fetched.inspect_err(|err| {
            if let CheckError::Fetch { cause } = err {
                tracing::warn!(cause = %cause, "resolver.fetch_failed");
            }
        })?;

        let prefix = truncate_chars(&body, FETCH_PREFIX_CHARS);
        let text = truncate_chars(prefix, JUDGE_TEXT_CHARS);
        let trusted = self.trusted.is_trusted(&url);

        tracing::info!(
            host = url.host_str().unwrap_or("-"),
            trusted,
            body_chars = text.chars().count(),
            "resolver.fetched"
        );
        Ok(ResolvedContent::fetched(text, trusted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn url_detection_is_a_prefix_check() {
        assert!(is_url_like("http://example.com"));
        assert!(is_url_like("https://example.com"));
        assert!(!is_url_like("HTTPS://example.com"));
        assert!(!is_url_like("see https://example.com"));
        assert!(!is_url_like("ftp://example.com"));
    }

    #[test]
    fn default_allowlist_matches_known_outlets() {
        let trusted = TrustedDomains::default();
        assert!(trusted.is_trusted(&url("https://www.bbc.com/news/world-1")));
        assert!(trusted.is_trusted(&url("https://WWW.Reuters.com/article")));
        assert!(trusted.is_trusted(&url("https://apnews.com/x")));
        assert!(!trusted.is_trusted(&url("https://example.com/bbc.com")));
    }

    #[test]
    fn substring_mode_is_permissive() {
        let trusted = TrustedDomains::default();
        assert!(trusted.is_trusted(&url("https://nyt.nytimes.com.attacker.example/")));
        assert!(trusted.is_trusted(&url("https://notbbc.com/")));
    }

    #[test]
    fn host_suffix_mode_requires_label_boundary() {
        let trusted = TrustedDomains::new(DEFAULT_TRUSTED_DOMAINS, DomainMatch::HostSuffix);
        assert!(trusted.is_trusted(&url("https://bbc.com/")));
        assert!(trusted.is_trusted(&url("https://www.bbc.co.uk/news")));
        assert!(!trusted.is_trusted(&url("https://notbbc.com/")));
        assert!(!trusted.is_trusted(&url("https://nytimes.com.attacker.example/")));
    }

    #[test]
    fn blank_domains_are_dropped() {
        let trusted = TrustedDomains::new(["", "  ", ".Example.org."], DomainMatch::Substring);
        assert_eq!(trusted.domains(), ["example.org".to_string()]);
    }

    #[tokio::test]
    async fn plain_text_passes_through_without_fetch() {
        let resolver = UrlResolver::new(TrustedDomains::default()).unwrap();
        let content = resolver.resolve("  Aliens landed in Ohio  ").await.unwrap();
        assert_eq!(content, ResolvedContent::plain("  Aliens landed in Ohio  "));
    }

    #[tokio::test]
    async fn fetched_body_is_truncated_to_judge_budget() {
        let server = MockServer::start().await;
        let body = "é".repeat(5000);
        Mock::given(method("GET"))
            .and(path("/story"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = UrlResolver::new(TrustedDomains::default()).unwrap();
        let content = resolver
            .resolve(&format!("{}/story", server.uri()))
            .await
            .unwrap();
        assert!(content.is_url_input);
        assert!(!content.is_trusted_origin);
        assert_eq!(content.text_to_judge.chars().count(), JUDGE_TEXT_CHARS);
        assert!(content.text_to_judge.chars().all(|c| c == 'é'));
    }

    #[tokio::test]
    async fn allowlisted_host_is_trusted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("short page"))
            .mount(&server)
            .await;

        let resolver =
            UrlResolver::new(TrustedDomains::new(["127.0.0.1"], DomainMatch::HostSuffix)).unwrap();
        let content = resolver.resolve(&server.uri()).await.unwrap();
        assert_eq!(content, ResolvedContent::fetched("short page", true));
    }

    #[tokio::test]
    async fn non_success_status_is_fetch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let resolver = UrlResolver::new(TrustedDomains::default()).unwrap();
        let err = resolver.resolve(&server.uri()).await.unwrap_err();
        assert!(matches!(err, CheckError::Fetch { .. }));
        assert_eq!(err.to_string(), "Could not fetch URL");
    }

    #[tokio::test]
    async fn slow_document_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let resolver = UrlResolver::new(TrustedDomains::default())
            .unwrap()
            .with_timeout(Duration::from_millis(50));
        let err = resolver.resolve(&server.uri()).await.unwrap_err();
        assert_eq!(err.to_string(), "Could not fetch URL");
    }

    #[tokio::test]
    async fn unparseable_url_is_fetch_failure() {
        let resolver = UrlResolver::new(TrustedDomains::default()).unwrap();
        let err = resolver.resolve("https://exa mple.com").await.unwrap_err();
        assert_eq!(err.to_string(), "Could not fetch URL");
    }
}
