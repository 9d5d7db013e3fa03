//! Media resolution and streaming download.
//!
//! Resolution drives the shared page to a lesson and waits for its
//! media element to carry a source URL, retrying in place against
//! transient absence. The transfer itself streams bytes to disk under
//! a hard timeout and never retries; retry across whole attempts is
//! the orchestrator's policy.

use crate::automation::PageAutomation;
use crate::error::{AutomationError, DownloadError};
use crate::retry::{RetrySchedule, with_retry_while};
use crate::structure::Lesson;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// The classroom video element.
const MEDIA_SELECTOR: &str = ".vjs-tech";

/// Resolves the downloadable media URL for a lesson.
///
/// Navigates to the lesson page and reads the media element's `src`.
/// An absent element or empty source is retried per `schedule`; once
/// the budget is spent the lesson is reported unavailable. A lost
/// session is never retried and comes back as [`DownloadError::Session`].
pub async fn resolve_media_url<P: PageAutomation>(
    page: &P,
    lesson: &Lesson,
    schedule: RetrySchedule,
) -> Result<String, DownloadError> {
    let attempts = schedule.attempts.max(1);
    with_retry_while(schedule, || async move {
        page.navigate(&lesson.url).await?;
        page.wait_settled().await?;

        let media = page
            .query_single(MEDIA_SELECTOR)
            .await?
            .ok_or_else(|| AutomationError::ElementNotFound(MEDIA_SELECTOR.to_string()))?;
        match page.read_attribute(&media, "src").await? {
            Some(src) if !src.is_empty() => Ok(src),
            _ => Err(AutomationError::ElementNotFound(format!(
                "{MEDIA_SELECTOR} has no source"
            ))),
        }
    }, |err| !matches!(err, AutomationError::SessionLost(_)))
    .await
    .map_err(|err| match err {
        AutomationError::SessionLost(_) => DownloadError::Session(err),
        _ => DownloadError::Unavailable { attempts },
    })
}

/// Streams `url` to `target`, bounded by `limit`.
///
/// Returns the number of bytes written. On timeout the partially
/// written file is left in place; the orchestrator's size check treats
/// it as incomplete on the next attempt.
pub async fn download_to(
    client: &reqwest::Client,
    url: &str,
    target: &Path,
    limit: Duration,
) -> Result<u64, DownloadError> {
    match tokio::time::timeout(limit, stream_to_file(client, url, target)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(DownloadError::Timeout(limit)),
    }
}

async fn stream_to_file(
    client: &reqwest::Client,
    url: &str,
    target: &Path,
) -> Result<u64, DownloadError> {
    let response = client.get(url).send().await?.error_for_status()?;

    let mut file = tokio::fs::File::create(target).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
}
