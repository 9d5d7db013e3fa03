//! Expansion of paths, collections, and personal lists into courses.
//!
//! Listing views lazy-load their cards, so every expansion scrolls the
//! page until it stops growing before reading anchors back. An empty
//! listing is a valid result.

use crate::automation::PageAutomation;
use crate::error::AutomationError;
use crate::references::LEARNING_BASE_URL;
use crate::sanitize::sanitize;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Listing page selectors.
const LISTING_CARD_LINK: &str = ".lls-card-headline a";
const COLLAPSED_SECTION: &str = ".collapsible-section--collapsed button";
const PATH_TITLE: &str = ".path-layout__title h1";
const PATH_START: &str = "button[data-control-name=\"start_path\"]";
const PATH_MEMBER_LINK: &str = "a.path-course-card__link";

/// Captures the course slug out of a learning URL or href.
static SLUG_FROM_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/learning/([^/?#]+)").unwrap());

/// First URL segments that are listing views rather than course slugs.
const RESERVED_SEGMENTS: [&str; 4] = ["paths", "collections", "me", "search"];

/// A learning path resolved to its title and ordered members.
#[derive(Debug, Clone)]
pub struct PathListing {
    /// Sanitized path title.
    pub title: String,

    /// Member courses in path order.
    pub members: Vec<PathMember>,
}

/// One course inside a learning path.
#[derive(Debug, Clone)]
pub struct PathMember {
    /// Course slug.
    pub slug: String,

    /// Sanitized course title as shown on the path page.
    pub title: String,
}

/// Expands a collection into its member course slugs.
pub async fn expand_collection<P: PageAutomation>(
    page: &P,
    id: &str,
) -> Result<Vec<String>, AutomationError> {
    open_listing(page, &format!("{LEARNING_BASE_URL}/collections/{id}")).await?;
    collect_course_links(page, LISTING_CARD_LINK).await
}

/// Expands a learning path into its title and ordered members.
///
/// A path the account never started hides its member list behind a
/// start control, which is activated first.
pub async fn expand_path<P: PageAutomation>(
    page: &P,
    id: &str,
) -> Result<PathListing, AutomationError> {
    page.navigate(&format!("{LEARNING_BASE_URL}/paths/{id}")).await?;
    page.wait_settled().await?;

    if let Some(start) = page.query_single(PATH_START).await? {
        page.activate(&start).await?;
        page.wait_settled().await?;
    }
    page.scroll_to_bottom_until_stable().await?;
    expand_collapsed_sections(page).await?;

    let title_element = page
        .query_single(PATH_TITLE)
        .await?
        .ok_or_else(|| AutomationError::ElementNotFound(format!("title of path '{id}'")))?;
    let title = sanitize(&page.read_text(&title_element).await?);

    let mut members = Vec::new();
    let mut seen = BTreeSet::new();
    for link in page.query_all(PATH_MEMBER_LINK).await? {
        let Some(href) = page.read_attribute(&link, "href").await? else {
            continue;
        };
        let Some(slug) = course_slug_from_href(&href) else {
            continue;
        };
        if seen.insert(slug.clone()) {
            members.push(PathMember {
                slug,
                title: sanitize(&page.read_text(&link).await?),
            });
        }
    }

    Ok(PathListing { title, members })
}

/// Expands the account's saved-courses list.
pub async fn expand_saved<P: PageAutomation>(page: &P) -> Result<Vec<String>, AutomationError> {
    expand_personal_list(page, "saved").await
}

/// Expands the account's completed-courses list.
pub async fn expand_completed<P: PageAutomation>(
    page: &P,
) -> Result<Vec<String>, AutomationError> {
    expand_personal_list(page, "completed").await
}

/// Expands the account's in-progress list.
pub async fn expand_in_progress<P: PageAutomation>(
    page: &P,
) -> Result<Vec<String>, AutomationError> {
    expand_personal_list(page, "in-progress").await
}

async fn expand_personal_list<P: PageAutomation>(
    page: &P,
    view: &str,
) -> Result<Vec<String>, AutomationError> {
    open_listing(page, &format!("{LEARNING_BASE_URL}/me/{view}")).await?;
    collect_course_links(page, LISTING_CARD_LINK).await
}

/// Navigates to a listing view and forces its lazy content to load.
async fn open_listing<P: PageAutomation>(page: &P, url: &str) -> Result<(), AutomationError> {
    page.navigate(url).await?;
    page.wait_settled().await?;
    page.scroll_to_bottom_until_stable().await?;
    expand_collapsed_sections(page).await
}

async fn expand_collapsed_sections<P: PageAutomation>(
    page: &P,
) -> Result<(), AutomationError> {
    for control in page.query_all(COLLAPSED_SECTION).await? {
        page.activate(&control).await?;
    }
    Ok(())
}

/// Reads course slugs out of the anchors matching `selector`,
/// deduplicated while keeping presentation order.
async fn collect_course_links<P: PageAutomation>(
    page: &P,
    selector: &str,
) -> Result<Vec<String>, AutomationError> {
    let mut slugs = Vec::new();
    let mut seen = BTreeSet::new();
    for anchor in page.query_all(selector).await? {
        let Some(href) = page.read_attribute(&anchor, "href").await? else {
            continue;
        };
        if let Some(slug) = course_slug_from_href(&href)
            && seen.insert(slug.clone())
        {
            slugs.push(slug);
        }
    }
    Ok(slugs)
}

/// Extracts a course slug from an href, absolute or relative.
pub fn course_slug_from_href(href: &str) -> Option<String> {
    let slug = SLUG_FROM_HREF
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())?;
    if RESERVED_SEGMENTS.contains(&slug.as_str()) {
        return None;
    }
    Some(slug)
}
