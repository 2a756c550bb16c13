use async_trait::async_trait;
use trustcheck_common::{FactCheck, ResolvedContent, Result};

/// Turns raw input into the text to judge.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fails only for URL-shaped input whose document cannot be fetched.
    async fn resolve(&self, raw: &str) -> Result<ResolvedContent>;
}

/// Looks up an existing third-party verdict for the input.
#[async_trait]
pub trait FactChecker: Send + Sync {
    /// Never fails: errors, timeouts and misses are all [`FactCheck::Unavailable`].
    async fn lookup(&self, raw: &str) -> FactCheck;
}
