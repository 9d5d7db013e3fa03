//! Run orchestration: classify, enumerate, extract, download.
//!
//! Drives the whole run over one shared automation session, strictly
//! one course and one lesson at a time. Per-lesson and per-course
//! failures degrade to recorded skips so the run always makes maximum
//! forward progress; only losing the session itself aborts.

use crate::automation::PageAutomation;
use crate::config::DownloadConfig;
use crate::console::Console;
use crate::download::{download_to, resolve_media_url};
use crate::enumerate::{
    PathListing, expand_collection, expand_completed, expand_in_progress, expand_path,
    expand_saved,
};
use crate::error::{AutomationError, DownloadError, Result, StructureError};
use crate::references::{RequestedContent, classify};
use crate::retry::with_retry_while;
use crate::sanitize::sanitize;
use crate::structure::{self, Chapter, Lesson};
use anyhow::Context;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Aggregated counts for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Courses the run tried to process.
    pub courses_attempted: u32,

    /// Courses whose structure never became available.
    pub courses_unavailable: u32,

    /// Lessons downloaded in this run.
    pub lessons_downloaded: u32,

    /// Lessons skipped because a complete file was already present.
    pub lessons_skipped_existing: u32,

    /// Lessons skipped as unreachable after exhausting retries.
    pub lessons_unreachable: u32,
}

/// Terminal state of one lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LessonOutcome {
    Downloaded(u64),
    SkippedExisting,
    SkippedUnreachable,
}

/// Sequences a full run against one automation session.
pub struct Pipeline<'a, P: PageAutomation> {
    page: &'a P,
    client: reqwest::Client,
    settings: DownloadConfig,
    output_root: PathBuf,
    console: Console,
}

impl<'a, P: PageAutomation> Pipeline<'a, P> {
    /// Creates a pipeline writing under `output_root`.
    pub fn new(page: &'a P, settings: DownloadConfig, output_root: PathBuf) -> Self {
        Self {
            page,
            client: reqwest::Client::new(),
            settings,
            output_root,
            console: Console::new(),
        }
    }

    /// Runs the whole pipeline for the given references.
    pub async fn run(&self, references: &[String]) -> Result<RunReport> {
        let requested = classify(references);
        self.console.step(&format!(
            "Classified {} reference(s): {} course(s), {} path(s), {} collection(s)",
            references.len(),
            requested.courses.len(),
            requested.paths.len(),
            requested.collections.len()
        ));

        std::fs::create_dir_all(&self.output_root).with_context(|| {
            format!(
                "Failed to create output directory {}",
                self.output_root.display()
            )
        })?;

        let courses = self.resolve_course_set(&requested).await?;
        self.console
            .info(&format!("{} course(s) to process", courses.len()));

        let mut report = RunReport {
            courses_attempted: courses.len() as u32,
            ..RunReport::default()
        };
        for slug in &courses {
            self.process_course(slug, &mut report).await?;
        }

        Ok(report)
    }

    /// Expands paths, collections, and personal lists into the final
    /// deduplicated course set, writing one manifest per path before
    /// any download starts. A failed expansion is logged and skipped.
    async fn resolve_course_set(
        &self,
        requested: &RequestedContent,
    ) -> Result<BTreeSet<String>> {
        let mut courses = requested.courses.clone();

        for id in &requested.collections {
            match expand_collection(self.page, id).await {
                Ok(slugs) => {
                    self.console.info(&format!(
                        "Collection '{id}' has {} course(s)",
                        slugs.len()
                    ));
                    courses.extend(slugs);
                }
                Err(err @ AutomationError::SessionLost(_)) => {
                    return Err(err)
                        .with_context(|| format!("Lost the browser session expanding '{id}'"));
                }
                Err(err) => self
                    .console
                    .warning(&format!("Could not expand collection '{id}': {err}")),
            }
        }

        for id in &requested.paths {
            match expand_path(self.page, id).await {
                Ok(listing) => {
                    let manifest = self.write_manifest(&listing)?;
                    self.console.success(&format!(
                        "Path '{}': {} course(s), manifest {}",
                        listing.title,
                        listing.members.len(),
                        self.console.muted(&manifest.display().to_string())
                    ));
                    courses.extend(listing.members.into_iter().map(|m| m.slug));
                }
                Err(err @ AutomationError::SessionLost(_)) => {
                    return Err(err)
                        .with_context(|| format!("Lost the browser session expanding '{id}'"));
                }
                Err(err) => self
                    .console
                    .warning(&format!("Could not expand path '{id}': {err}")),
            }
        }

        if requested.want_saved {
            self.extend_from_personal_list(&mut courses, "saved", expand_saved(self.page).await)?;
        }
        if requested.want_completed {
            self.extend_from_personal_list(
                &mut courses,
                "completed",
                expand_completed(self.page).await,
            )?;
        }
        if requested.want_in_progress {
            self.extend_from_personal_list(
                &mut courses,
                "in-progress",
                expand_in_progress(self.page).await,
            )?;
        }

        Ok(courses)
    }

    fn extend_from_personal_list(
        &self,
        courses: &mut BTreeSet<String>,
        view: &str,
        expanded: std::result::Result<Vec<String>, AutomationError>,
    ) -> Result<()> {
        match expanded {
            Ok(slugs) => {
                self.console
                    .info(&format!("'{view}' list has {} course(s)", slugs.len()));
                courses.extend(slugs);
            }
            Err(err @ AutomationError::SessionLost(_)) => {
                return Err(err)
                    .with_context(|| format!("Lost the browser session reading '{view}'"));
            }
            Err(err) => self
                .console
                .warning(&format!("Could not read '{view}' list: {err}")),
        }
        Ok(())
    }

    /// Writes a path's plain-text manifest under the output root.
    fn write_manifest(&self, listing: &PathListing) -> Result<PathBuf> {
        let path = self
            .output_root
            .join(format!("{}.txt", sanitize(&listing.title)));
        let mut content = String::from(&listing.title);
        content.push('\n');
        for member in &listing.members {
            content.push('\n');
            content.push_str(&member.title);
        }
        content.push('\n');
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write manifest {}", path.display()))?;
        Ok(path)
    }

    /// Extracts one course's structure (with bounded retry) and walks
    /// its lessons. An unavailable course is counted and skipped; a
    /// lost session aborts the run.
    async fn process_course(&self, slug: &str, report: &mut RunReport) -> Result<()> {
        self.console.section(&format!("Course: {slug}"));

        let schedule = self.settings.structure_schedule();
        let extracted = with_retry_while(
            schedule,
            || structure::extract(self.page, slug),
            |err| !matches!(err, StructureError::Session(_)),
        )
        .await;
        let course = match extracted {
            Ok(course) => course,
            Err(err @ StructureError::Session(_)) => {
                return Err(err)
                    .with_context(|| format!("Lost the browser session at course '{slug}'"));
            }
            Err(err) => {
                self.console
                    .warning(&format!("Skipping course '{slug}': {err}"));
                report.courses_unavailable += 1;
                return Ok(());
            }
        };

        self.console.success(&format!(
            "{}: {} chapter(s), {} lesson(s)",
            course.title,
            course.chapters.len(),
            course.lesson_count()
        ));

        for chapter in &course.chapters {
            let chapter_dir = self.output_root.join(&course.title).join(chapter.dir_name());
            std::fs::create_dir_all(&chapter_dir).with_context(|| {
                format!("Failed to create chapter directory {}", chapter_dir.display())
            })?;

            for (position, lesson) in chapter.lessons.iter().enumerate() {
                let target =
                    lesson_target_path(&self.output_root, &course.title, chapter, position, lesson);
                match self.process_lesson(lesson, &target).await? {
                    LessonOutcome::Downloaded(bytes) => {
                        report.lessons_downloaded += 1;
                        self.console.success(&format!(
                            "Downloaded '{}' ({})",
                            lesson.title,
                            self.console.bytes(bytes)
                        ));
                    }
                    LessonOutcome::SkippedExisting => {
                        report.lessons_skipped_existing += 1;
                        self.console
                            .info(&format!("Skipped existing '{}'", lesson.title));
                    }
                    LessonOutcome::SkippedUnreachable => {
                        report.lessons_unreachable += 1;
                        self.console
                            .warning(&format!("Skipped unreachable '{}'", lesson.title));
                    }
                }
            }
        }

        Ok(())
    }

    /// Runs one lesson through its state machine.
    ///
    /// Each attempt starts from the presence check, so a file completed
    /// by an earlier attempt (or an earlier run) is never re-fetched,
    /// while a truncated leftover below the size threshold is retried.
    /// A lost session aborts the run instead of degrading to a skip.
    async fn process_lesson(&self, lesson: &Lesson, target: &Path) -> Result<LessonOutcome> {
        for attempt in 1..=self.settings.lesson_attempts.max(1) {
            if is_complete(target, self.settings.min_valid_size_bytes) {
                return Ok(LessonOutcome::SkippedExisting);
            }

            let url = match resolve_media_url(self.page, lesson, self.settings.resolve_schedule())
                .await
            {
                Ok(url) => url,
                Err(err @ DownloadError::Session(_)) => {
                    return Err(err).with_context(|| {
                        format!("Lost the browser session at lesson '{}'", lesson.title)
                    });
                }
                Err(err) => {
                    self.console
                        .warning(&format!("'{}': {err}", lesson.title));
                    return Ok(LessonOutcome::SkippedUnreachable);
                }
            };

            match download_to(&self.client, &url, target, self.settings.stream_timeout()).await {
                Ok(bytes) => return Ok(LessonOutcome::Downloaded(bytes)),
                Err(err) => self.console.warning(&format!(
                    "Attempt {attempt}/{} for '{}' failed: {err}",
                    self.settings.lesson_attempts, lesson.title
                )),
            }
        }

        Ok(LessonOutcome::SkippedUnreachable)
    }
}

/// Deterministic target path for a lesson.
///
/// A pure function of the output root, course title, chapter, lesson
/// position, and lesson title — this determinism is what makes the
/// resume-by-presence check correct across runs.
pub fn lesson_target_path(
    root: &Path,
    course_title: &str,
    chapter: &Chapter,
    position: usize,
    lesson: &Lesson,
) -> PathBuf {
    root.join(course_title)
        .join(chapter.dir_name())
        .join(format!("{}. {}.mp4", position + 1, lesson.title))
}

/// True if `target` already holds a complete prior download.
fn is_complete(target: &Path, min_valid_size: u64) -> bool {
    std::fs::metadata(target)
        .map(|meta| meta.len() > min_valid_size)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::testing::{FakeElement, FakePage};
    use crate::references::LEARNING_BASE_URL;
    use crate::structure::{
        chapter_title_selector, course_url, lesson_link_selector, lesson_title_selector,
    };

    const COURSE_TITLE_SELECTOR: &str = ".classroom-nav__details h1";
    const CHAPTER_SELECTOR: &str = ".classroom-toc-chapter";
    const LISTING_LINK_SELECTOR: &str = ".lls-card-headline a";

    fn fast_settings() -> DownloadConfig {
        DownloadConfig {
            lesson_attempts: 2,
            resolve_attempts: 2,
            resolve_retry_delay_sec: 0.0,
            structure_attempts: 1,
            structure_retry_delay_sec: 0.0,
            stream_timeout_sec: 5,
            min_valid_size_bytes: 200 * 1024,
        }
    }

    /// Registers "my-course": one chapter, two lessons, no media source.
    fn add_my_course(page: &mut FakePage) {
        let url = course_url("my-course");
        page.add_element(&url, ".classroom-sidebar-toggle--open", FakeElement::with_text("open"));
        page.add_element(&url, COURSE_TITLE_SELECTOR, FakeElement::with_text("My Course"));
        page.add_element(&url, CHAPTER_SELECTOR, FakeElement::with_text("ch1"));
        page.add_element(
            &url,
            &chapter_title_selector(1),
            FakeElement::with_text("Introduction"),
        );
        for (slug, title) in [("welcome", "Welcome"), ("overview", "Overview")] {
            page.add_element(
                &url,
                &lesson_link_selector(1),
                FakeElement::with_text(slug)
                    .with_attr("href", &format!("{LEARNING_BASE_URL}/my-course/{slug}")),
            );
            page.add_element(
                &url,
                &lesson_title_selector(1),
                FakeElement::with_text(title),
            );
        }
    }

    fn chapter(ordinal: u32, title: &str) -> Chapter {
        Chapter {
            ordinal,
            title: title.to_string(),
            lessons: Vec::new(),
        }
    }

    fn lesson(title: &str) -> Lesson {
        Lesson {
            title: title.to_string(),
            url: format!("{LEARNING_BASE_URL}/my-course/welcome"),
        }
    }

    #[test]
    fn test_lesson_target_path_is_deterministic() {
        let root = Path::new("/downloads");
        let chapter = chapter(0, "Introduction");
        let lesson = lesson("Welcome");

        let first = lesson_target_path(root, "My Course", &chapter, 0, &lesson);
        let second = lesson_target_path(root, "My Course", &chapter, 0, &lesson);
        assert_eq!(first, second);
        assert_eq!(
            first,
            PathBuf::from("/downloads/My Course/0. Introduction/1. Welcome.mp4")
        );

        let moved = lesson_target_path(root, "My Course", &chapter, 3, &lesson);
        assert_eq!(
            moved,
            PathBuf::from("/downloads/My Course/0. Introduction/4. Welcome.mp4")
        );
    }

    #[tokio::test]
    async fn test_run_resolves_collection_and_courses_once() {
        let mut page = FakePage::new();
        add_my_course(&mut page);
        let collection_url = format!("{LEARNING_BASE_URL}/collections/team-picks");
        for slug in ["course-a", "course-b", "my-course"] {
            page.add_element(
                &collection_url,
                LISTING_LINK_SELECTOR,
                FakeElement::with_text(slug).with_attr("href", &format!("/learning/{slug}")),
            );
        }

        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(&page, fast_settings(), dir.path().to_path_buf());
        let references = vec![
            "my-course".to_string(),
            format!("{LEARNING_BASE_URL}/collections/team-picks"),
        ];
        let report = pipeline.run(&references).await.unwrap();

        // my-course appears via both expansion routes but is attempted once
        assert_eq!(report.courses_attempted, 3);
        // course-a and course-b have no pages, so their structure never resolves
        assert_eq!(report.courses_unavailable, 2);
        // my-course's two lessons carry no media source
        assert_eq!(report.lessons_unreachable, 2);
        assert_eq!(report.lessons_downloaded, 0);
        assert_eq!(
            page.navigations()
                .iter()
                .filter(|url| url.ends_with("/my-course"))
                .count(),
            1
        );

        // No path was referenced, so no manifest lands in the output root
        let manifests: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "txt"))
            .collect();
        assert!(manifests.is_empty());
    }

    #[tokio::test]
    async fn test_run_writes_path_manifest_before_downloads() {
        let mut page = FakePage::new();
        let path_url = format!("{LEARNING_BASE_URL}/paths/become-a-dev");
        page.add_element(
            &path_url,
            ".path-layout__title h1",
            FakeElement::with_text("Become a Developer"),
        );
        for (slug, title) in [("course-a", "Course A"), ("course-b", "Course B")] {
            page.add_element(
                &path_url,
                "a.path-course-card__link",
                FakeElement::with_text(title).with_attr("href", &format!("/learning/{slug}")),
            );
        }

        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(&page, fast_settings(), dir.path().to_path_buf());
        let report = pipeline
            .run(&["paths/become-a-dev".to_string()])
            .await
            .unwrap();

        assert_eq!(report.courses_attempted, 2);
        assert_eq!(report.courses_unavailable, 2);

        let manifest = dir.path().join("Become a Developer.txt");
        let content = std::fs::read_to_string(manifest).unwrap();
        assert_eq!(content, "Become a Developer\n\nCourse A\nCourse B\n");
    }

    #[tokio::test]
    async fn test_existing_complete_file_is_never_refetched() {
        let mut page = FakePage::new();
        add_my_course(&mut page);

        let dir = tempfile::tempdir().unwrap();
        let settings = fast_settings();

        // A prior run completed "Welcome" above the size threshold
        let welcome = dir
            .path()
            .join("My Course/0. Introduction/1. Welcome.mp4");
        std::fs::create_dir_all(welcome.parent().unwrap()).unwrap();
        std::fs::write(&welcome, vec![0u8; 300 * 1024]).unwrap();

        let pipeline = Pipeline::new(&page, settings, dir.path().to_path_buf());
        let report = pipeline.run(&["my-course".to_string()]).await.unwrap();

        assert_eq!(report.lessons_skipped_existing, 1);
        assert_eq!(report.lessons_unreachable, 1);
        // The completed lesson's page was never visited
        assert!(
            !page
                .navigations()
                .iter()
                .any(|url| url.ends_with("/my-course/welcome"))
        );
    }

    #[tokio::test]
    async fn test_lost_session_mid_run_aborts() {
        let mut page = FakePage::new();
        add_my_course(&mut page);
        // The course page loads, then the browser dies before the
        // first lesson navigation
        page.lose_session_after(1);

        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(&page, fast_settings(), dir.path().to_path_buf());
        let err = pipeline.run(&["my-course".to_string()]).await.unwrap_err();

        assert!(err.to_string().contains("Lost the browser session"));
        // No attempt budget was ground through against the dead session
        assert_eq!(page.navigations().len(), 1);
    }

    #[tokio::test]
    async fn test_lost_session_during_expansion_aborts() {
        let page = FakePage::new();
        page.lose_session_after(0);

        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(&page, fast_settings(), dir.path().to_path_buf());
        let err = pipeline
            .run(&["collections/team-picks".to_string()])
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Lost the browser session"));
    }

    #[tokio::test]
    async fn test_truncated_leftover_is_retried() {
        let mut page = FakePage::new();
        add_my_course(&mut page);

        let dir = tempfile::tempdir().unwrap();

        // An interrupted run left a file below the size threshold
        let welcome = dir
            .path()
            .join("My Course/0. Introduction/1. Welcome.mp4");
        std::fs::create_dir_all(welcome.parent().unwrap()).unwrap();
        std::fs::write(&welcome, vec![0u8; 10 * 1024]).unwrap();

        let pipeline = Pipeline::new(&page, fast_settings(), dir.path().to_path_buf());
        let report = pipeline.run(&["my-course".to_string()]).await.unwrap();

        assert_eq!(report.lessons_skipped_existing, 0);
        assert_eq!(report.lessons_unreachable, 2);
        assert!(
            page.navigations()
                .iter()
                .any(|url| url.ends_with("/my-course/welcome"))
        );
    }
}
