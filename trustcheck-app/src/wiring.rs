use std::sync::Arc;

use anyhow::{Context, Result};
use trustcheck_config::{ASI_ONE_KEY_ENV, FACT_CHECK_KEY_ENV, TrustCheckConfig};
use trustcheck_core::Analyzer;
use trustcheck_llm::asi::AsiOneClient;
use trustcheck_web::factcheck::GoogleFactCheck;
use trustcheck_web::resolver::{TrustedDomains, UrlResolver};

/// Assemble the pipeline collaborators described by `cfg`.
pub fn build_analyzer(cfg: &TrustCheckConfig) -> Result<Analyzer> {
    if cfg.llm.api_key.is_none() {
        // Every analysis will fail until a key is supplied.
        tracing::warn!(env = ASI_ONE_KEY_ENV, "llm.api_key_missing");
    }
    let llm = AsiOneClient::new(
        cfg.llm.endpoint.clone(),
        cfg.llm.api_key.clone(),
        cfg.llm.model.clone(),
    )
    .context("failed to build LLM client")?
    .with_timeout(cfg.llm.timeout());

    let fact_checker = GoogleFactCheck::new(
        cfg.fact_check.endpoint.clone(),
        cfg.fact_check.api_key.clone(),
    )
    .context("failed to build fact-check client")?
    .with_language_code(cfg.fact_check.language_code.clone())
    .with_timeout(cfg.fact_check.timeout());
    if !fact_checker.is_configured() {
        tracing::info!(env = FACT_CHECK_KEY_ENV, "factcheck.disabled");
    }

    let trusted = TrustedDomains::new(&cfg.resolver.trusted_domains, cfg.resolver.domain_match);
    tracing::debug!(
        domains = trusted.domains().len(),
        mode = ?trusted.mode(),
        "resolver.allowlist"
    );
    let resolver = UrlResolver::new(trusted)
        .context("failed to build content resolver")?
        .with_timeout(cfg.resolver.timeout());

    Ok(Analyzer::new(
        Arc::new(resolver),
        Arc::new(fact_checker),
        Arc::new(llm),
    ))
}
