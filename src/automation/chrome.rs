//! Headless-Chrome backed automation session.
//!
//! Owns the browser process, its event handler task, and the single
//! page the whole run shares. Also handles session establishment: the
//! login form is driven here, before the pipeline starts.

use super::PageAutomation;
use crate::config::BrowserConfig;
use crate::error::AutomationError;
use crate::references::LEARNING_BASE_URL;
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig as LaunchConfig, Element, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Login form selectors.
const LOGIN_URL: &str = "https://www.linkedin.com/learning-login/";
const LOGIN_ID_INPUT: &str = "#auth-id-input";
const LOGIN_ID_SUBMIT: &str = "#auth-id-button";
const LOGIN_PASSWORD_INPUT: &str = "#password";
const LOGIN_SUBMIT: &str = "[data-control-urn=\"login-submit\"]";

/// Upper bound on scroll rounds while waiting for a listing to stop
/// growing.
const MAX_SCROLL_ROUNDS: u32 = 50;

/// Pause after each scroll so lazy content can load.
const SCROLL_PAUSE: Duration = Duration::from_millis(750);

/// A live Chrome session with one page shared by the entire run.
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    settle_delay: Duration,
}

impl ChromeSession {
    /// Launches a browser and opens the page the run will use.
    pub async fn launch(config: &BrowserConfig) -> Result<Self, AutomationError> {
        let mut builder = LaunchConfig::builder()
            .window_size(config.window_width, config.window_height);
        if !config.headless {
            builder = builder.with_head();
        }
        let launch_config = builder.build().map_err(AutomationError::Launch)?;

        let (browser, mut events) = Browser::launch(launch_config)
            .await
            .map_err(|e| AutomationError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| AutomationError::Launch(e.to_string()))?;

        Ok(Self {
            browser,
            page,
            handler,
            settle_delay: Duration::from_secs_f64(config.settle_delay_sec),
        })
    }

    /// Signs the account in so course pages and personal lists resolve.
    pub async fn login(&self, user: &str, password: &str) -> Result<(), AutomationError> {
        self.navigate(LOGIN_URL).await?;

        let id_input = self.require(LOGIN_ID_INPUT).await?;
        id_input
            .type_str(user)
            .await
            .map_err(|e| AutomationError::Read(e.to_string()))?;
        self.activate(&self.require(LOGIN_ID_SUBMIT).await?).await?;
        self.wait_for_navigation().await?;

        let password_input = self.require(LOGIN_PASSWORD_INPUT).await?;
        password_input
            .type_str(password)
            .await
            .map_err(|e| AutomationError::Read(e.to_string()))?;
        self.activate(&self.require(LOGIN_SUBMIT).await?).await?;
        self.wait_for_navigation().await?;

        // Landing anywhere under the learning site means the form was
        // accepted; anything else is a credential or challenge problem.
        let url = self
            .page
            .url()
            .await
            .map_err(|e| AutomationError::SessionLost(e.to_string()))?
            .unwrap_or_default();
        if url.starts_with(LEARNING_BASE_URL) {
            Ok(())
        } else {
            Err(AutomationError::Navigation(format!(
                "login did not reach the learning site (landed on {url})"
            )))
        }
    }

    /// Closes the page and tears the browser process down.
    pub async fn close(mut self) {
        let _ = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler.abort();
    }

    async fn require(&self, selector: &str) -> Result<Element, AutomationError> {
        self.query_single(selector)
            .await?
            .ok_or_else(|| AutomationError::ElementNotFound(selector.to_string()))
    }

    async fn wait_for_navigation(&self) -> Result<(), AutomationError> {
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| AutomationError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn scroll_height(&self) -> Result<f64, AutomationError> {
        self.page
            .evaluate("document.body.scrollHeight")
            .await
            .map_err(|e| AutomationError::Evaluate(e.to_string()))?
            .into_value::<f64>()
            .map_err(|e| AutomationError::Evaluate(e.to_string()))
    }
}

#[async_trait]
impl PageAutomation for ChromeSession {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<(), AutomationError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| AutomationError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn wait_settled(&self) -> Result<(), AutomationError> {
        tokio::time::sleep(self.settle_delay).await;
        Ok(())
    }

    async fn query_single(&self, selector: &str) -> Result<Option<Element>, AutomationError> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Element>, AutomationError> {
        // find_elements errors when the selector matches nothing; an
        // empty page region is a valid result, not a failure.
        match self.page.find_elements(selector).await {
            Ok(elements) => Ok(elements),
            Err(_) => Ok(Vec::new()),
        }
    }

    async fn activate(&self, element: &Element) -> Result<(), AutomationError> {
        element
            .click()
            .await
            .map_err(|e| AutomationError::Read(e.to_string()))?;
        Ok(())
    }

    async fn read_text(&self, element: &Element) -> Result<String, AutomationError> {
        let text = element
            .inner_text()
            .await
            .map_err(|e| AutomationError::Read(e.to_string()))?;
        Ok(text.unwrap_or_default())
    }

    async fn read_attribute(
        &self,
        element: &Element,
        name: &str,
    ) -> Result<Option<String>, AutomationError> {
        element
            .attribute(name)
            .await
            .map_err(|e| AutomationError::Read(e.to_string()))
    }

    async fn scroll_to_bottom_until_stable(&self) -> Result<(), AutomationError> {
        let mut height = self.scroll_height().await?;
        for _ in 0..MAX_SCROLL_ROUNDS {
            self.page
                .evaluate("window.scrollTo(0, document.body.scrollHeight)")
                .await
                .map_err(|e| AutomationError::Evaluate(e.to_string()))?;
            tokio::time::sleep(SCROLL_PAUSE).await;

            let grown = self.scroll_height().await?;
            if grown <= height {
                return Ok(());
            }
            height = grown;
        }
        Ok(())
    }
}
