//! Content acquisition and third-party evidence for an analysis.
//!
//! - [`resolver`]: decides whether input is a URL, fetches a bounded prefix
//!   of the document and classifies its origin against an allowlist
//! - [`factcheck`]: best-effort claim lookup against Google Fact Check Tools
//! - [`traits`]: the seams the aggregator depends on

pub mod factcheck;
pub mod resolver;
pub mod traits;
