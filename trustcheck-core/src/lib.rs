//! Signal aggregation and scoring for TrustCheck.
//!
//! [`Analyzer`] runs the content resolver, then the fact-check and judgment
//! signals concurrently, and folds them into one [`AnalysisResult`].
//!
//! [`AnalysisResult`]: trustcheck_common::AnalysisResult

pub mod analyzer;

pub use analyzer::{apply_trust_discount, Analyzer};
