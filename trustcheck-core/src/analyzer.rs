use std::sync::Arc;

use tracing::Instrument;
use trustcheck_common::{AnalysisResult, CheckError, Judgment, ResolvedContent, Result};
use trustcheck_llm::traits::LlmClient;
use trustcheck_web::traits::{ContentSource, FactChecker};
use uuid::Uuid;

/// Points taken off a high self-reported score from an unverified URL.
pub const TRUST_DISCOUNT: u8 = 20;
/// Scores at or below this are never discounted.
pub const DISCOUNT_THRESHOLD: u8 = 50;

/// Lower the score of untrusted URL sources that rate themselves highly.
///
/// ```
/// use trustcheck_common::ResolvedContent;
/// use trustcheck_core::apply_trust_discount;
///
/// let untrusted = ResolvedContent::fetched("page", false);
/// assert_eq!(apply_trust_discount(80, &untrusted), 60);
/// assert_eq!(apply_trust_discount(40, &untrusted), 40);
/// assert_eq!(apply_trust_discount(80, &ResolvedContent::fetched("page", true)), 80);
/// assert_eq!(apply_trust_discount(80, &ResolvedContent::plain("text")), 80);
/// ```
pub fn apply_trust_discount(score: u8, content: &ResolvedContent) -> u8 {
    if content.is_url_input && !content.is_trusted_origin && score > DISCOUNT_THRESHOLD {
        score.saturating_sub(TRUST_DISCOUNT)
    } else {
        score
    }
}

/// The analysis pipeline. Holds only shared, read-only collaborators, so one
/// instance serves any number of concurrent requests.
#[derive(Clone)]
pub struct Analyzer {
    resolver: Arc<dyn ContentSource>,
    fact_checker: Arc<dyn FactChecker>,
    llm: Arc<dyn LlmClient>,
}

impl Analyzer {
    pub fn new(
        resolver: Arc<dyn ContentSource>,
        fact_checker: Arc<dyn FactChecker>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            resolver,
            fact_checker,
            llm,
        }
    }

    /// Run one analysis. Failures are reported inside the result
    /// (`success: false`), never as an error.
    pub async fn analyze(&self, raw: &str) -> AnalysisResult {
        let span = tracing::info_span!("analysis", id = %Uuid::new_v4());
        async {
            tracing::info!(input_chars = raw.chars().count(), "analysis.start");
            match self.run(raw).await {
                Ok(result) => {
                    tracing::info!(
                        score = ?result.score,
                        category = result.category.as_deref().unwrap_or("-"),
                        fact_check = result.fact_check.as_deref().unwrap_or("-"),
                        trusted = result.is_trusted_source,
                        "analysis.done"
                    );
                    result
                }
                Err(err) => {
                    tracing::warn!(reason = %err, "analysis.failed");
                    AnalysisResult::from(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, raw: &str) -> Result<AnalysisResult> {
        if raw.trim().is_empty() {
            return Err(CheckError::EmptyInput);
        }

        let content = self.resolver.resolve(raw).await?;

        // The fact check keys off the raw input, the judgment off the
        // resolved text. A failed judgment drops the lookup still in flight.
        let fact_check = async { Ok::<_, CheckError>(self.fact_checker.lookup(raw).await) };
        let (fact_check, judgment) =
            tokio::try_join!(fact_check, self.llm.assess_trust(&content.text_to_judge))?;

        let score = apply_trust_discount(judgment.score, &content);
        if score != judgment.score {
            tracing::debug!(raw_score = judgment.score, score, "analysis.trust_discount");
        }

        Ok(AnalysisResult::succeeded(
            Judgment { score, ..judgment },
            fact_check,
            content.is_trusted_origin,
        ))
    }
}
