//! Classification of user-supplied references.
//!
//! A reference can be a bare course slug, a full course URL, a learning
//! path or collection URL, or one of the personal library views
//! (saved / completed / in-progress). Classification is pure and total:
//! anything unrecognized falls through to an individual course slug.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Base URL of the learning platform. Everything the pipeline navigates
/// to lives under this prefix.
pub const LEARNING_BASE_URL: &str = "https://www.linkedin.com/learning";

/// Matches the site prefix so full URLs reduce to their path.
static BASE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://(www\.)?linkedin\.com/learning/?").unwrap());

/// Everything the user asked for, grouped by how it gets expanded.
///
/// Sets keep identifiers deduplicated and in a stable order, so a
/// course reachable through several references is only fetched once.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RequestedContent {
    /// Individual course slugs.
    pub courses: BTreeSet<String>,

    /// Learning path identifiers (the part after `paths/`).
    pub paths: BTreeSet<String>,

    /// Collection identifiers (the part after `collections/`).
    pub collections: BTreeSet<String>,

    /// Include the account's saved courses.
    pub want_saved: bool,

    /// Include the account's completed courses.
    pub want_completed: bool,

    /// Include the account's in-progress courses.
    pub want_in_progress: bool,
}

impl RequestedContent {
    /// True if any personal library view was requested.
    pub fn wants_personal_lists(&self) -> bool {
        self.want_saved || self.want_completed || self.want_in_progress
    }
}

/// Classifies an ordered list of references into [`RequestedContent`].
///
/// Each reference is normalized by stripping the site prefix and any
/// query or fragment suffix, then matched first-match-wins. Unmatched
/// references contribute their leading path segment as a course slug.
pub fn classify(references: &[String]) -> RequestedContent {
    let mut requested = RequestedContent::default();

    for reference in references {
        let normalized = normalize(reference);

        if normalized.starts_with("me/saved") {
            requested.want_saved = true;
        } else if normalized.starts_with("me/completed") {
            requested.want_completed = true;
        } else if normalized.starts_with("me/in-progress") {
            requested.want_in_progress = true;
        } else if let Some(id) = normalized.strip_prefix("collections/") {
            if !id.is_empty() {
                requested.collections.insert(id.to_string());
            }
        } else if let Some(id) = normalized.strip_prefix("paths/") {
            if !id.is_empty() {
                requested.paths.insert(id.to_string());
            }
        } else {
            let slug = normalized.split('/').next().unwrap_or_default();
            if !slug.is_empty() {
                requested.courses.insert(slug.to_string());
            }
        }
    }

    requested
}

/// Reduces a reference to its path below the learning base URL.
fn normalize(reference: &str) -> String {
    let stripped = BASE_PREFIX.replace(reference.trim(), "");
    let without_query = stripped
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    without_query.trim_matches('/').to_string()
}
