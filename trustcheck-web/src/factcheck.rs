//! Google Fact Check Tools claim search.
//!
//! Best-effort by construction: an unconfigured key skips the call, and any
//! network, status or decode failure is logged and collapsed into
//! [`FactCheck::Unavailable`]. Nothing here can fail an analysis.

use async_trait::async_trait;
use serde::Deserialize;
use std::borrow::Cow;
use std::time::Duration;
use trustcheck_common::{CheckError, FactCheck, Result, truncate_chars};
use trustcheck_http::{Auth, HttpClient, HttpError, RequestOpts};

use crate::traits::FactChecker;

pub const GOOGLE_FACT_CHECK_URL: &str =
    "https://factchecktools.googleapis.com/v1alpha1/claims:search";
pub const DEFAULT_LANGUAGE_CODE: &str = "en";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Characters of the raw input used as the search query.
pub const QUERY_INPUT_CHARS: usize = 50;
/// Upper bound the service is ever sent.
pub const MAX_QUERY_CHARS: usize = 100;

const MISSING_RATING: &str = "N/A";

#[derive(Debug, Default, Deserialize)]
pub struct ClaimSearchResponse {
    #[serde(default)]
    pub claims: Vec<Claim>,
}

#[derive(Debug, Deserialize)]
pub struct Claim {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, rename = "claimReview")]
    pub claim_review: Vec<ClaimReview>,
}

#[derive(Debug, Deserialize)]
pub struct ClaimReview {
    #[serde(default, rename = "textualRating")]
    pub textual_rating: Option<String>,
}

impl ClaimSearchResponse {
    /// Rating of the first review of the first claim, if there is one.
    pub fn first_rating(&self) -> Option<String> {
        let review = self.claims.first()?.claim_review.first()?;
        Some(
            review
                .textual_rating
                .clone()
                .unwrap_or_else(|| MISSING_RATING.to_string()),
        )
    }
}

pub struct GoogleFactCheck {
    http: HttpClient,
    endpoint: String,
    api_key: Option<String>,
    language_code: String,
    timeout: Duration,
}

impl GoogleFactCheck {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        let http = HttpClient::new(&endpoint)
            .map_err(|e| CheckError::Config(format!("HttpClient init failed: {e}")))?;
        Ok(Self {
            http,
            endpoint,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            language_code: DEFAULT_LANGUAGE_CODE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_language_code(mut self, code: impl Into<String>) -> Self {
        self.language_code = code.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(
        &self,
        key: &str,
        query: &str,
    ) -> std::result::Result<ClaimSearchResponse, HttpError> {
        self.http
            .get_json(
                &self.endpoint,
                RequestOpts {
                    timeout: Some(self.timeout),
                    query: Some(vec![
                        ("query", Cow::Borrowed(query)),
                        ("languageCode", Cow::Borrowed(self.language_code.as_str())),
                    ]),
                    auth: Some(Auth::Query {
                        name: "key",
                        value: Cow::Borrowed(key),
                    }),
                    allow_absolute: true,
                    ..Default::default()
                },
            )
            .await
    }
}

#[async_trait]
impl FactChecker for GoogleFactCheck {
    async fn lookup(&self, raw: &str) -> FactCheck {
        let Some(key) = self.api_key.as_deref() else {
            tracing::debug!("factcheck.skipped.unconfigured");
            return FactCheck::Unavailable;
        };

        let query = truncate_chars(truncate_chars(raw, QUERY_INPUT_CHARS), MAX_QUERY_CHARS);
        match self.search(key, query).await {
            Ok(resp) => match resp.first_rating() {
                Some(rating) => {
                    tracing::info!(
                        rating = %rating,
                        claim = resp.claims.first().and_then(|c| c.text.as_deref()).unwrap_or("-"),
                        claims = resp.claims.len(),
                        "factcheck.rating"
                    );
                    FactCheck::Rating(rating)
                }
                None => {
                    tracing::debug!(claims = resp.claims.len(), "factcheck.no_claim");
                    FactCheck::Unavailable
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "factcheck.unavailable");
                FactCheck::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn checker(server: &MockServer, key: Option<&str>) -> GoogleFactCheck {
        GoogleFactCheck::new(
            format!("{}/v1alpha1/claims:search", server.uri()),
            key.map(str::to_string),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn returns_first_review_rating() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1alpha1/claims:search"))
            .and(query_param("query", "The moon landing was faked"))
            .and(query_param("languageCode", "en"))
            .and(query_param("key", "g-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "claims": [
                    {
                        "text": "moon",
                        "claimReview": [{"textualRating": "False"}, {"textualRating": "True"}]
                    },
                    {"claimReview": [{"textualRating": "Mostly True"}]}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let fc = checker(&server, Some("g-key"));
        assert_eq!(
            fc.lookup("The moon landing was faked").await,
            FactCheck::Rating("False".into())
        );
    }

    #[tokio::test]
    async fn query_uses_first_fifty_characters() {
        let server = MockServer::start().await;
        let raw = "a".repeat(80);
        Mock::given(method("GET"))
            .and(query_param("query", "a".repeat(QUERY_INPUT_CHARS)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let fc = checker(&server, Some("k"));
        assert_eq!(fc.lookup(&raw).await, FactCheck::Unavailable);
    }

    #[tokio::test]
    async fn claim_without_reviews_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"claims": [{"claimReview": []}]})),
            )
            .mount(&server)
            .await;

        assert_eq!(checker(&server, Some("k")).lookup("x").await, FactCheck::Unavailable);
    }

    #[tokio::test]
    async fn review_without_rating_reports_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"claims": [{"claimReview": [{"url": "https://x"}]}]})),
            )
            .mount(&server)
            .await;

        assert_eq!(
            checker(&server, Some("k")).lookup("x").await,
            FactCheck::Rating("N/A".into())
        );
    }

    #[tokio::test]
    async fn errors_and_timeouts_are_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken/claims:search"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(json!({"error": {"message": "denied"}})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1alpha1/claims:search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "claims": [{"claimReview": [{"textualRating": "False"}]}]
                    }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let broken = GoogleFactCheck::new(
            format!("{}/broken/claims:search", server.uri()),
            Some("k".into()),
        )
        .unwrap();
        assert_eq!(broken.lookup("x").await, FactCheck::Unavailable);

        let slow = checker(&server, Some("k")).with_timeout(Duration::from_millis(50));
        assert_eq!(slow.lookup("x").await, FactCheck::Unavailable);
    }

    #[tokio::test]
    async fn missing_key_skips_the_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let fc = checker(&server, None);
        assert!(!fc.is_configured());
        assert_eq!(fc.lookup("anything").await, FactCheck::Unavailable);
    }
}
