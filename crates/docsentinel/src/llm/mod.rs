//! LLM comparison collaborator.
//!
//! The model endpoint is opaque to the pipeline: text in, normalized
//! [`Finding`]s out, transient or permanent [`CollabError`] on failure. The
//! pipeline never sees raw model output — parsing and severity normalization
//! happen here, at the boundary.

pub mod http;
pub mod parse;
pub mod prompt;

pub use http::HttpComparer;
pub use parse::parse_findings;
pub use prompt::ComparePrompt;

use crate::error::CollabError;
use crate::finding::Finding;

/// Detects semantic contradictions between a new and an old document.
///
/// `feedback_context` is the digest of past reviewer decisions; it may be
/// empty and implementations must accept that.
pub trait TextComparer: Send + Sync {
    fn compare(
        &self,
        new_text: &str,
        old_text: &str,
        feedback_context: &str,
    ) -> Result<Vec<Finding>, CollabError>;
}
