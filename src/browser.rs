use anyhow::{Context as _, Result};
use log::{debug, info, warn};
use std::time::Duration;
use thirtyfour::error::WebDriverError;
use thirtyfour::prelude::*;

/// A clickable control the pipeline knows how to look for. Each maps to an
/// ordered list of selectors; the first one present wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    QuickApply,
    Submit,
    Continue,
    Review,
    Dismiss,
}

/// The one browser page the pipeline owns for the duration of a run.
///
/// Absence of an element is data (`Ok(false)` / `Ok(None)`), never an error;
/// an `Err` from any method means the interaction itself broke and the
/// caller escalates per its own policy. All waits are bounded by the caller.
pub trait PageDriver {
    /// Distinct record identifiers currently materialized in the feed.
    async fn card_ids(&self) -> Result<Vec<String>>;

    /// Trigger one round of content growth: scroll the listing container to
    /// its bottom, or the whole window when no container is found.
    async fn scroll_feed(&self) -> Result<()>;

    /// Serialized HTML of the current page.
    async fn page_html(&self) -> Result<String>;

    /// Open the detail view for one record by clicking its card.
    async fn open_card(&self, id: &str) -> Result<()>;

    /// HTML of the detail panel, if one is present.
    async fn detail_html(&self) -> Result<Option<String>>;

    /// Whether the application dialog is currently open.
    async fn modal_open(&self) -> Result<bool>;

    /// Find and click a control. `Ok(true)` = clicked, `Ok(false)` = absent.
    async fn click(&self, control: Control) -> Result<bool>;

    /// Advance to the next listing page. `Ok(false)` = no more pages.
    async fn advance_page(&self) -> Result<bool>;

    /// Cooperative wait for render/network settling.
    async fn settle(&self, wait: Duration);
}

const CARD_SELECTOR: &str = "div[data-job-id]";

const FEED_CONTAINER_SELECTORS: &[&str] = &[
    "div.jobs-search-results-list",
    "div.scaffold-layout__list-container",
    "div.jobs-search-results",
    "main",
];

const DETAIL_PANEL_SELECTORS: &[&str] = &[
    "div.jobs-search__job-details",
    "div.job-details",
    "div.jobs-details",
    "section.jobs-box",
    "div.scaffold-layout__detail",
];

const NEXT_PAGE_SELECTORS: &[&str] = &[
    "button[aria-label='Next']",
    "button[aria-label*='next']",
    "li[class*='selected'] + li button",
];

fn control_selectors(control: Control) -> &'static [&'static str] {
    match control {
        Control::QuickApply => &[
            "button[aria-label*='Easy Apply']",
            "button.jobs-apply-button",
        ],
        Control::Submit => &["button[aria-label*='Submit application']"],
        Control::Continue => &[
            "button[aria-label*='Continue to next step']",
            "button[aria-label*='Next']",
        ],
        Control::Review => &["button[aria-label*='Review your application']"],
        Control::Dismiss => &["button[aria-label*='Dismiss']"],
    }
}

/// `PageDriver` backed by a live WebDriver session. The session is expected
/// to be authenticated already; login and fingerprinting are someone else's
/// problem.
pub struct ListingPage {
    driver: WebDriver,
}

impl ListingPage {
    pub async fn connect(webdriver_url: &str) -> Result<Self> {
        let caps = DesiredCapabilities::chrome();
        let driver = WebDriver::new(webdriver_url, caps)
            .await
            .with_context(|| format!("failed to connect to WebDriver at {webdriver_url}"))?;
        Ok(ListingPage { driver })
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        info!("Navigating to {url}");
        self.driver
            .goto(url)
            .await
            .with_context(|| format!("failed to navigate to {url}"))?;
        Ok(())
    }

    pub async fn quit(self) -> Result<()> {
        self.driver.quit().await?;
        Ok(())
    }

    async fn find_first(&self, selectors: &[&str]) -> Option<WebElement> {
        for selector in selectors {
            if let Ok(element) = self.driver.find(By::Css(*selector)).await {
                return Some(element);
            }
        }
        None
    }
}

impl PageDriver for ListingPage {
    async fn card_ids(&self) -> Result<Vec<String>> {
        let cards = self.driver.find_all(By::Css(CARD_SELECTOR)).await?;
        let mut ids = Vec::with_capacity(cards.len());
        for card in cards {
            if let Some(id) = card.attr("data-job-id").await? {
                if !id.is_empty() {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }

    async fn scroll_feed(&self) -> Result<()> {
        for selector in FEED_CONTAINER_SELECTORS {
            if self.driver.find(By::Css(*selector)).await.is_ok() {
                debug!("Scrolling feed container {selector}");
                self.driver
                    .execute(
                        "const el = document.querySelector(arguments[0]); \
                         if (el) { el.scrollTop = el.scrollHeight; }",
                        vec![serde_json::json!(selector)],
                    )
                    .await?;
                return Ok(());
            }
        }
        // No recognizable container; fall back to the whole window.
        debug!("No feed container found, scrolling window");
        self.driver
            .execute("window.scrollTo(0, document.body.scrollHeight)", vec![])
            .await?;
        Ok(())
    }

    async fn page_html(&self) -> Result<String> {
        let html = self.driver.source().await.context("failed to read page source")?;
        Ok(html)
    }

    async fn open_card(&self, id: &str) -> Result<()> {
        let selector = format!("div[data-job-id='{id}']");
        let card = self
            .driver
            .find(By::Css(selector.as_str()))
            .await
            .with_context(|| format!("job card {id} not present"))?;
        card.click().await.with_context(|| format!("failed to click job card {id}"))?;
        Ok(())
    }

    async fn detail_html(&self) -> Result<Option<String>> {
        match self.find_first(DETAIL_PANEL_SELECTORS).await {
            Some(panel) => Ok(Some(panel.inner_html().await?)),
            None => Ok(None),
        }
    }

    async fn modal_open(&self) -> Result<bool> {
        // A missing dialog is data; anything else is a broken session.
        match self.driver.find(By::Css("div[role='dialog']")).await {
            Ok(_) => Ok(true),
            Err(WebDriverError::NoSuchElement(_)) => Ok(false),
            Err(e) => Err(e).context("dialog presence check failed"),
        }
    }

    async fn click(&self, control: Control) -> Result<bool> {
        for selector in control_selectors(control) {
            let Ok(button) = self.driver.find(By::Css(*selector)).await else {
                continue;
            };
            if let Ok(Some(_)) = button.attr("disabled").await {
                continue;
            }
            button
                .click()
                .await
                .with_context(|| format!("failed to click {control:?} ({selector})"))?;
            return Ok(true);
        }
        Ok(false)
    }

    async fn advance_page(&self) -> Result<bool> {
        let Some(button) = self.find_first(NEXT_PAGE_SELECTORS).await else {
            info!("No next page button found");
            return Ok(false);
        };
        if let Ok(Some(_)) = button.attr("disabled").await {
            info!("Next page button is disabled");
            return Ok(false);
        }
        button.click().await.context("failed to click next page")?;
        self.settle(Duration::from_millis(3000)).await;

        // Confirm new cards actually rendered; a click that navigated
        // nowhere is treated as end-of-pages rather than an error.
        match self.driver.find(By::Css(CARD_SELECTOR)).await {
            Ok(_) => Ok(true),
            Err(_) => {
                warn!("Next page click produced no job cards");
                Ok(false)
            }
        }
    }

    async fn settle(&self, wait: Duration) {
        tokio::time::sleep(wait).await;
    }
}
