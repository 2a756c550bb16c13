//! Common types and utilities shared across TrustCheck crates.
//!
//! This crate defines the request-scoped values that flow through the
//! analysis pipeline, the shared error type, and observability helpers. It is
//! intentionally lightweight so that every crate in the workspace can depend
//! on it without pulling in HTTP or LLM machinery.
//!
//! # Overview
//!
//! - [`ResolvedContent`]: what the content resolver derived from raw input
//! - [`FactCheck`]: best-effort outcome of the claim-search lookup
//! - [`Judgment`]: parsed `(score, category, reason)` triple from the LLM
//! - [`AnalysisResult`]: terminal value returned to callers
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`CheckError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! ```rust
//! use trustcheck_common::{AnalysisResult, FactCheck, Judgment};
//!
//! let judgment = Judgment::new(73, "biased", "Uses loaded language.");
//! let result = AnalysisResult::succeeded(judgment, FactCheck::Unavailable, false);
//! assert!(result.success);
//! assert_eq!(result.score, Some(73));
//! assert_eq!(result.fact_check, None);
//! ```
use serde::{Deserialize, Serialize};

pub mod observability;

/// Text handed to the judgment signal, plus what we learned about its origin.
///
/// Created once per request by the content resolver and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContent {
    /// Raw input, or the truncated prefix of the fetched document.
    pub text_to_judge: String,
    /// Whether the raw input was URL-shaped.
    pub is_url_input: bool,
    /// Only meaningful when `is_url_input` is true.
    pub is_trusted_origin: bool,
}

impl ResolvedContent {
    /// Content for plain (non-URL) input.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text_to_judge: text.into(),
            is_url_input: false,
            is_trusted_origin: false,
        }
    }

    /// Content derived from a fetched document.
    pub fn fetched(text: impl Into<String>, is_trusted_origin: bool) -> Self {
        Self {
            text_to_judge: text.into(),
            is_url_input: true,
            is_trusted_origin,
        }
    }
}

/// Outcome of the fact-check signal. It never aborts the pipeline, so there
/// is no error variant: every failure collapses into `Unavailable`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FactCheck {
    /// Textual rating of the first review of the first matching claim.
    Rating(String),
    /// No claim found, service unconfigured, or the lookup failed.
    #[default]
    Unavailable,
}

impl FactCheck {
    pub fn rating(&self) -> Option<&str> {
        match self {
            FactCheck::Rating(r) => Some(r),
            FactCheck::Unavailable => None,
        }
    }

    pub fn into_rating(self) -> Option<String> {
        match self {
            FactCheck::Rating(r) => Some(r),
            FactCheck::Unavailable => None,
        }
    }
}

/// Structured view of the LLM's free-text reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgment {
    /// Always within `0..=100`.
    pub score: u8,
    pub category: String,
    /// At most 300 characters.
    pub reason: String,
}

impl Judgment {
    pub fn new(score: u8, category: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            score,
            category: category.into(),
            reason: reason.into(),
        }
    }
}

/// Terminal value returned to the caller of the analysis pipeline.
///
/// `success == false` always comes with `score == None`; `success == true`
/// always carries a score in `0..=100`. Use the two constructors to keep
/// that invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub success: bool,
    pub score: Option<u8>,
    pub category: Option<String>,
    pub reason: String,
    pub fact_check: Option<String>,
    pub is_trusted_source: bool,
}

impl AnalysisResult {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            score: None,
            category: None,
            reason: reason.into(),
            fact_check: None,
            is_trusted_source: false,
        }
    }

    pub fn succeeded(judgment: Judgment, fact_check: FactCheck, is_trusted_source: bool) -> Self {
        Self {
            success: true,
            score: Some(judgment.score.min(100)),
            category: Some(judgment.category),
            reason: judgment.reason,
            fact_check: fact_check.into_rating(),
            is_trusted_source,
        }
    }
}

impl From<CheckError> for AnalysisResult {
    fn from(err: CheckError) -> Self {
        AnalysisResult::failed(err.to_string())
    }
}

/// Reputable news outlets whose URLs count as a trusted origin by default.
pub const DEFAULT_TRUSTED_DOMAINS: &[&str] = &[
    "bbc.com",
    "reuters.com",
    "ap.org",
    "apnews.com",
    "theguardian.com",
    "nytimes.com",
    "bbc.co.uk",
];

/// How a URL's host is compared against the trusted-origin allowlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainMatch {
    /// Case-insensitive substring of the host. Permissive: a host such as
    /// `nytimes.com.attacker.example` matches `nytimes.com`.
    #[default]
    Substring,
    /// Host equals the domain or is a subdomain of it.
    HostSuffix,
}

/// Error types used across the TrustCheck pipeline.
///
/// The `Display` output of each variant is the `reason` reported to callers.
#[derive(thiserror::Error, Debug)]
pub enum CheckError {
    /// Input was empty or whitespace only.
    #[error("Empty input")]
    EmptyInput,

    /// URL-shaped input whose document could not be retrieved.
    #[error("Could not fetch URL")]
    Fetch { cause: String },

    /// Transport or decode failure talking to the judgment service.
    #[error("{0}")]
    Judgment(String),

    /// The judgment service answered without a usable choice.
    #[error("API error")]
    EmptyReply,

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenient alias for results that use [`CheckError`].
pub type Result<T> = std::result::Result<T, CheckError>;

/// Borrow at most `max` characters of `s`, never splitting a code point.
///
/// ```
/// assert_eq!(trustcheck_common::truncate_chars("héllo", 2), "hé");
/// assert_eq!(trustcheck_common::truncate_chars("abc", 10), "abc");
/// ```
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
