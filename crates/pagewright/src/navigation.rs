//! Navigation Coordinator
//!
//! Moves from one page to another through a resolved element, choosing
//! between a direct address transition and a simulated click.
//!
//! ```text
//!   Inspect ──► Decide ──► Execute ──────────────► Confirm
//!   (href)      │          DirectAddress: goto        (readiness race)
//!               │          SimulateClick: click
//!               │            └─ blocked? grace, then forced dispatch (once)
//! ```
//!
//! Direct transitions skip hover menus and animations entirely, which is
//! the path that fails most often on real sites.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};
use url::Url;

use crate::document::{ClickMode, Document};
use crate::readiness::{duration_ms, Readiness, ReadinessDetector, ReadinessSet};
use crate::resolver::ResolvedElement;
use crate::result::{NavigationMode, PagewrightError, PagewrightResult};

/// Decided way of leaving the current page
#[derive(Debug, Clone)]
pub struct NavigationIntent {
    /// Chosen mode
    pub mode: NavigationMode,
    /// Absolute destination, present only for [`NavigationMode::DirectAddress`]
    pub target_address: Option<Url>,
    /// Element the navigation starts from
    pub source: ResolvedElement,
}

/// Result of a confirmed navigation
#[derive(Debug, Clone, Serialize)]
pub struct NavigationOutcome {
    /// Mode that reached the destination
    pub mode: NavigationMode,
    /// Destination address, when one was used
    pub address: Option<String>,
    /// Whether the click had to be escalated to a forced dispatch
    pub escalated: bool,
    /// Which destination condition confirmed arrival
    pub readiness: Readiness,
}

/// Usable direct address for `href`, resolved against `base`.
///
/// Rejects empty and fragment-only references, non-http(s) schemes
/// (`javascript:`, `mailto:`, `tel:`) and links back to the current
/// document with only a fragment.
#[must_use]
pub fn address_for(base: Option<&Url>, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let url = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    if let (Some(base), Some(_)) = (base, url.fragment()) {
        let mut without = url.clone();
        without.set_fragment(None);
        let mut current = base.clone();
        current.set_fragment(None);
        if without == current {
            return None;
        }
    }
    Some(url)
}

/// Plans and executes page transitions
#[derive(Clone)]
pub struct NavigationCoordinator {
    document: Arc<dyn Document>,
    detector: ReadinessDetector,
    timeout: Duration,
    click_grace: Duration,
}

impl fmt::Debug for NavigationCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationCoordinator")
            .field("timeout", &self.timeout)
            .field("click_grace", &self.click_grace)
            .finish_non_exhaustive()
    }
}

impl NavigationCoordinator {
    /// Create a coordinator confirming arrival within `timeout`
    #[must_use]
    pub fn new(
        document: Arc<dyn Document>,
        detector: ReadinessDetector,
        timeout: Duration,
        click_grace: Duration,
    ) -> Self {
        Self {
            document,
            detector,
            timeout,
            click_grace,
        }
    }

    /// Inspect the element and decide how to navigate
    pub async fn plan(&self, element: &ResolvedElement) -> PagewrightResult<NavigationIntent> {
        let deadline = Instant::now() + self.timeout;
        let inspect = async {
            let href = self.document.attribute(&element.handle, "href").await?;
            let current = self.document.current_url().await?;
            Ok::<_, PagewrightError>((href, current))
        };
        let (href, current) = tokio::time::timeout_at(deadline, inspect)
            .await
            .map_err(|_| self.expired(NavigationMode::DirectAddress, None, "inspecting href"))??;
        let base = Url::parse(&current).ok();
        let target_address = href.as_deref().and_then(|h| address_for(base.as_ref(), h));
        let mode = if target_address.is_some() {
            NavigationMode::DirectAddress
        } else {
            NavigationMode::SimulateClick
        };
        Ok(NavigationIntent {
            mode,
            target_address,
            source: element.clone(),
        })
    }

    /// Navigate through `element` and confirm arrival on `destination`
    pub async fn navigate(
        &self,
        element: &ResolvedElement,
        destination: &ReadinessSet,
    ) -> PagewrightResult<NavigationOutcome> {
        let intent = self.plan(element).await?;
        info!(
            element = %element.target,
            mode = %intent.mode,
            address = intent.target_address.as_ref().map(Url::as_str),
            "navigating"
        );
        let escalated = self.execute(&intent).await?;
        let readiness = self.detector.await_ready(destination, self.timeout).await?;
        Ok(NavigationOutcome {
            mode: intent.mode,
            address: intent.target_address.map(String::from),
            escalated,
            readiness,
        })
    }

    /// Perform the planned action; returns whether the click was escalated.
    ///
    /// The whole action, including any escalation, shares the navigation
    /// timeout.
    pub async fn execute(&self, intent: &NavigationIntent) -> PagewrightResult<bool> {
        let deadline = Instant::now() + self.timeout;
        match (&intent.mode, &intent.target_address) {
            (NavigationMode::DirectAddress, Some(url)) => {
                let mode = NavigationMode::DirectAddress;
                self.bounded(deadline, mode, Some(url), self.document.goto(url.as_str()))
                    .await?
                    .map_err(|e| navigation_error(mode, Some(url), &e))?;
                Ok(false)
            }
            _ => self.click_through(&intent.source, deadline).await,
        }
    }

    async fn click_through(&self, source: &ResolvedElement, deadline: Instant) -> PagewrightResult<bool> {
        let mode = NavigationMode::SimulateClick;
        let clicked = self
            .bounded(deadline, mode, None, self.document.click(&source.handle, ClickMode::Normal))
            .await?;
        match clicked {
            Ok(()) => Ok(false),
            Err(e) if e.is_click_blocked() => {
                warn!(element = %source.target, error = %e, "click blocked, escalating to forced dispatch");
                let dispatch = async {
                    tokio::time::sleep(self.click_grace).await;
                    self.document.click(&source.handle, ClickMode::Dispatch).await
                };
                self.bounded(deadline, mode, None, dispatch)
                    .await?
                    .map_err(|e| navigation_error(mode, None, &e))?;
                Ok(true)
            }
            Err(e) => Err(navigation_error(mode, None, &e)),
        }
    }

    /// Run `action` until `deadline`; the outer error is expiry
    async fn bounded<T>(
        &self,
        deadline: Instant,
        mode: NavigationMode,
        url: Option<&Url>,
        action: impl Future<Output = PagewrightResult<T>>,
    ) -> PagewrightResult<PagewrightResult<T>> {
        tokio::time::timeout_at(deadline, action)
            .await
            .map_err(|_| self.expired(mode, url, "waiting for the browser"))
    }

    fn expired(&self, mode: NavigationMode, url: Option<&Url>, doing: &str) -> PagewrightError {
        warn!(%mode, timeout_ms = duration_ms(self.timeout), doing, "navigation action timed out");
        PagewrightError::Navigation {
            mode,
            url: url.map(ToString::to_string),
            message: format!("timed out after {}ms {doing}", duration_ms(self.timeout)),
        }
    }
}

fn navigation_error(mode: NavigationMode, url: Option<&Url>, cause: &PagewrightError) -> PagewrightError {
    PagewrightError::Navigation {
        mode,
        url: url.map(ToString::to_string),
        message: cause.to_string(),
    }
}
