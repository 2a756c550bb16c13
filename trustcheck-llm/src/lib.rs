//! LLM integration for TrustCheck.
//!
//! This crate exposes the [`traits::LlmClient`] interface whose default
//! [`assess_trust`](traits::LlmClient::assess_trust) method is the judgment
//! signal, the [`asi::AsiOneClient`] provider, and the tolerant reply
//! [`parser`].
//!
//! # Examples
//! ```no_run
//! use trustcheck_llm::{asi::AsiOneClient, traits::LlmClient};
//!
//! # #[tokio::main]
//! # async fn main() -> trustcheck_common::Result<()> {
//! let client = AsiOneClient::new(
//!     trustcheck_llm::asi::ASI_ONE_CHAT_URL,
//!     std::env::var("ASI_ONE_API_KEY").ok(),
//!     trustcheck_llm::DEFAULT_MODEL.to_string(),
//! )?;
//! let judgment = client.assess_trust("The moon is made of cheese.").await?;
//! assert!(judgment.score <= 100);
//! # Ok(())
//! # }
//! ```
pub mod asi;
pub mod parser;
pub mod traits;

pub const DEFAULT_MODEL: &str = "asi1-mini";
