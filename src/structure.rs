//! Course structure extraction.
//!
//! Walks a course's classroom page and produces the normalized
//! chapter/lesson tree the pipeline downloads from. All display titles
//! are sanitized here, chapter ordinals are normalized, and
//! interactive assessments are filtered out because they carry no
//! downloadable media.

use crate::automation::PageAutomation;
use crate::error::StructureError;
use crate::references::LEARNING_BASE_URL;
use crate::sanitize::sanitize;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Classroom page selectors.
const COURSE_TITLE: &str = ".classroom-nav__details h1";
const SIDEBAR_OPEN: &str = ".classroom-sidebar-toggle--open";
const SIDEBAR_TOGGLE: &str = ".classroom-sidebar-toggle";
const COLLAPSED_CHAPTER: &str = ".classroom-toc-chapter--collapsed";
const CHAPTER: &str = ".classroom-toc-chapter";

/// Lesson hrefs containing this marker are quiz-style assessments, not
/// downloadable content.
const ASSESSMENT_MARKER: &str = "learningApiAssessment";

/// Leading "1. " / "2) " style numbering supplied by the source.
static NUMERIC_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\s*[.)]\s*").unwrap());

/// Bookend chapters the source leaves unnumbered. English-only markers;
/// non-English course content keeps its presentation ordinals.
static INTRO_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^introduction\b").unwrap());
static CLOSING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^conclusion").unwrap());

/// The full normalized tree for one course.
#[derive(Debug, Clone)]
pub struct CourseStructure {
    /// Sanitized course display title.
    pub title: String,

    /// Chapters in presentation order.
    pub chapters: Vec<Chapter>,
}

impl CourseStructure {
    /// Total number of downloadable lessons.
    pub fn lesson_count(&self) -> usize {
        self.chapters.iter().map(|c| c.lessons.len()).sum()
    }
}

/// One chapter: a named, ordered group of lessons.
#[derive(Debug, Clone)]
pub struct Chapter {
    /// Normalized ordinal used for directory naming.
    pub ordinal: u32,

    /// Sanitized chapter title with any numeric prefix stripped.
    pub title: String,

    /// Lessons in presentation order.
    pub lessons: Vec<Lesson>,
}

impl Chapter {
    /// Directory name for this chapter under the course directory.
    pub fn dir_name(&self) -> String {
        format!("{}. {}", self.ordinal, self.title)
    }
}

/// One downloadable lesson.
#[derive(Debug, Clone)]
pub struct Lesson {
    /// Sanitized lesson display title.
    pub title: String,

    /// Absolute URL of the lesson's content page.
    pub url: String,
}

/// Extracts the chapter/lesson tree for a course slug.
///
/// Returns [`StructureError::Unavailable`] on any missing required
/// element; retrying is the orchestrator's decision.
pub async fn extract<P: PageAutomation>(
    page: &P,
    slug: &str,
) -> Result<CourseStructure, StructureError> {
    page.navigate(&course_url(slug)).await?;
    page.wait_settled().await?;

    // The content sidebar hides the chapter list when collapsed.
    if page.query_single(SIDEBAR_OPEN).await?.is_none()
        && let Some(toggle) = page.query_single(SIDEBAR_TOGGLE).await?
    {
        page.activate(&toggle).await?;
    }
    for collapsed in page.query_all(COLLAPSED_CHAPTER).await? {
        page.activate(&collapsed).await?;
    }

    let title_element = page
        .query_single(COURSE_TITLE)
        .await?
        .ok_or_else(|| StructureError::Unavailable(format!("no course title for '{slug}'")))?;
    let title = sanitize(&page.read_text(&title_element).await?);

    let chapter_count = page.query_all(CHAPTER).await?.len();
    if chapter_count == 0 {
        return Err(StructureError::Unavailable(format!(
            "no chapters found for '{slug}'"
        )));
    }

    let mut raw_titles = Vec::with_capacity(chapter_count);
    let mut lesson_lists = Vec::with_capacity(chapter_count);
    for position in 1..=chapter_count {
        let title_element = page
            .query_single(&chapter_title_selector(position))
            .await?
            .ok_or_else(|| {
                StructureError::Unavailable(format!("chapter {position} has no title"))
            })?;
        raw_titles.push(sanitize(&page.read_text(&title_element).await?));
        lesson_lists.push(extract_lessons(page, position).await?);
    }

    let chapters = assign_ordinals(&raw_titles)
        .into_iter()
        .zip(lesson_lists)
        .map(|((ordinal, title), lessons)| Chapter {
            ordinal,
            title,
            lessons,
        })
        .collect();

    Ok(CourseStructure { title, chapters })
}

/// Reads the lesson (title, href) pairs of the chapter at `position`.
async fn extract_lessons<P: PageAutomation>(
    page: &P,
    position: usize,
) -> Result<Vec<Lesson>, StructureError> {
    let links = page.query_all(&lesson_link_selector(position)).await?;
    let titles = page.query_all(&lesson_title_selector(position)).await?;

    // The two lists must pair up one-to-one; zipping mismatched lists
    // would shift every later lesson onto its neighbor's title.
    if links.len() != titles.len() {
        return Err(StructureError::Unavailable(format!(
            "chapter {position} has {} lesson links but {} titles",
            links.len(),
            titles.len()
        )));
    }

    let mut lessons = Vec::with_capacity(links.len());
    for (link, title) in links.iter().zip(titles.iter()) {
        let Some(href) = page.read_attribute(link, "href").await? else {
            continue;
        };
        if href.contains(ASSESSMENT_MARKER) {
            continue;
        }
        let Some(url) = absolute_url(&href) else {
            continue;
        };
        lessons.push(Lesson {
            title: sanitize(&page.read_text(title).await?),
            url,
        });
    }
    Ok(lessons)
}

/// Normalizes chapter ordinals from raw (sanitized) titles.
///
/// Strips any numeric prefix, then assigns: introduction chapters 0,
/// closing chapters the position after the last structural chapter,
/// everything else its presentation position. Source-supplied numbering
/// never overrides these positions.
fn assign_ordinals(raw_titles: &[String]) -> Vec<(u32, String)> {
    let cleaned: Vec<String> = raw_titles
        .iter()
        .map(|t| NUMERIC_PREFIX.replace(t, "").trim().to_string())
        .collect();

    let last_structural = cleaned
        .iter()
        .enumerate()
        .filter(|(_, t)| !INTRO_MARKER.is_match(t) && !CLOSING_MARKER.is_match(t))
        .map(|(i, _)| i)
        .next_back()
        .unwrap_or(0);

    cleaned
        .into_iter()
        .enumerate()
        .map(|(position, title)| {
            let ordinal = if INTRO_MARKER.is_match(&title) {
                0
            } else if CLOSING_MARKER.is_match(&title) {
                (last_structural + 1) as u32
            } else {
                position as u32
            };
            (ordinal, title)
        })
        .collect()
}

/// URL of a course's classroom page.
pub fn course_url(slug: &str) -> String {
    format!("{LEARNING_BASE_URL}/{slug}")
}

/// Lesson hrefs come off the markup root-relative; navigation needs
/// them absolute.
fn absolute_url(href: &str) -> Option<String> {
    static BASE: LazyLock<Url> = LazyLock::new(|| Url::parse(LEARNING_BASE_URL).unwrap());
    BASE.join(href).ok().map(|url| url.to_string())
}

pub(crate) fn chapter_title_selector(position: usize) -> String {
    format!("{CHAPTER}:nth-of-type({position}) .classroom-toc-chapter__toggle-title")
}

pub(crate) fn lesson_link_selector(position: usize) -> String {
    format!("{CHAPTER}:nth-of-type({position}) .classroom-toc-item-layout__link")
}

pub(crate) fn lesson_title_selector(position: usize) -> String {
    format!(
        "{CHAPTER}:nth-of-type({position}) .classroom-toc-item-layout__link \
         .classroom-toc-item-layout__title"
    )
}
