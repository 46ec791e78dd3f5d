//! Page context: one browsing session of one scenario.
//!
//! Owns the injected document, the time budgets and the resolution
//! components, plus the overlay watcher installed for the session. Page
//! objects borrow everything they need from here.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::config::{SuiteConfig, Timeouts};
use crate::document::{ClickMode, Document};
use crate::navigation::{NavigationCoordinator, NavigationOutcome};
use crate::overlay::{dedupe_rules, OverlayGuard, OverlayHandler, OverlayRule};
use crate::readiness::{ReadinessDetector, ReadinessSet};
use crate::resolver::{ElementResolver, ResolvedElement};
use crate::result::{NavigationMode, PagewrightError, PagewrightResult};
use crate::selector::SemanticTarget;

#[derive(Default)]
struct Overlays {
    rules: Vec<OverlayRule>,
    guard: Option<OverlayGuard>,
}

/// Everything a page object needs to act on the current document
pub struct PageContext {
    document: Arc<dyn Document>,
    config: SuiteConfig,
    base: Url,
    resolver: ElementResolver,
    detector: ReadinessDetector,
    coordinator: NavigationCoordinator,
    overlays: Mutex<Overlays>,
}

impl fmt::Debug for PageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageContext")
            .field("base", &self.base.as_str())
            .field("timeouts", &self.config.timeouts)
            .finish_non_exhaustive()
    }
}

impl PageContext {
    /// Create a context over `document`
    pub fn new(document: Arc<dyn Document>, config: SuiteConfig) -> PagewrightResult<Self> {
        config.validate()?;
        let base = config.base()?;
        let resolver = ElementResolver::new(document.clone(), config.timeouts.poll_interval());
        let detector = ReadinessDetector::new(resolver.clone());
        let coordinator = NavigationCoordinator::new(
            document.clone(),
            detector.clone(),
            config.timeouts.navigation(),
            config.timeouts.click_grace(),
        );
        Ok(Self {
            document,
            config,
            base,
            resolver,
            detector,
            coordinator,
            overlays: Mutex::new(Overlays::default()),
        })
    }

    /// The document
    #[must_use]
    pub fn document(&self) -> &Arc<dyn Document> {
        &self.document
    }

    /// Suite configuration
    #[must_use]
    pub const fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Time budgets
    #[must_use]
    pub const fn timeouts(&self) -> &Timeouts {
        &self.config.timeouts
    }

    /// Element resolver
    #[must_use]
    pub const fn resolver(&self) -> &ElementResolver {
        &self.resolver
    }

    /// Readiness detector
    #[must_use]
    pub const fn detector(&self) -> &ReadinessDetector {
        &self.detector
    }

    /// Navigation coordinator
    #[must_use]
    pub const fn coordinator(&self) -> &NavigationCoordinator {
        &self.coordinator
    }

    /// `path` joined onto the base URL
    pub fn absolute_url(&self, path: &str) -> PagewrightResult<Url> {
        self.base.join(path).map_err(|e| PagewrightError::Config {
            message: format!("cannot join {path:?} onto {}: {e}", self.base),
        })
    }

    /// Add overlay rules and (re)start the watcher with the merged set.
    ///
    /// Rules already installed under the same name are kept as they are.
    pub async fn install_overlays(&self, rules: Vec<OverlayRule>) {
        let mut overlays = self.overlays.lock().await;
        let merged = dedupe_rules(overlays.rules.drain(..).chain(rules));
        if let Some(old) = overlays.guard.take() {
            old.uninstall().await;
        }
        overlays.guard = Some(OverlayHandler::install(
            self.document.clone(),
            merged.clone(),
            self.timeouts().poll_interval(),
        ));
        overlays.rules = merged;
    }

    /// Overlay dismissals performed by the current watcher
    pub async fn overlay_dismissals(&self) -> usize {
        self.overlays
            .lock()
            .await
            .guard
            .as_ref()
            .map_or(0, OverlayGuard::dismissals)
    }

    /// Names of the installed overlay rules
    pub async fn overlay_rules(&self) -> Vec<String> {
        self.overlays
            .lock()
            .await
            .rules
            .iter()
            .map(|r| r.name().to_string())
            .collect()
    }

    /// Stop the overlay watcher
    pub async fn close(&self) {
        let guard = self.overlays.lock().await.guard.take();
        if let Some(guard) = guard {
            debug!(dismissals = guard.dismissals(), "closing page context");
            guard.uninstall().await;
        }
    }

    /// Transition the document to `url`
    pub async fn goto(&self, url: &Url) -> PagewrightResult<()> {
        self.document
            .goto(url.as_str())
            .await
            .map_err(|e| PagewrightError::Navigation {
                mode: NavigationMode::DirectAddress,
                url: Some(url.to_string()),
                message: e.to_string(),
            })
    }

    /// Current address
    pub async fn current_url(&self) -> PagewrightResult<String> {
        self.document.current_url().await
    }

    /// Resolve within the action budget
    pub async fn resolve(&self, target: &SemanticTarget) -> PagewrightResult<ResolvedElement> {
        self.resolver.resolve(target, self.timeouts().action()).await
    }

    /// Resolve within the expect budget, for presence checks
    pub async fn expect(&self, target: &SemanticTarget) -> PagewrightResult<ResolvedElement> {
        self.resolver.resolve(target, self.timeouts().expect()).await
    }

    /// Whether `target` is visible right now
    pub async fn is_visible(&self, target: &SemanticTarget) -> PagewrightResult<bool> {
        self.resolver.is_visible(target).await
    }

    /// Visible matches right now
    pub async fn count(&self, target: &SemanticTarget) -> PagewrightResult<usize> {
        Ok(self.resolver.probe_all(target).await?.len())
    }

    /// Resolve and click
    pub async fn click(&self, target: &SemanticTarget) -> PagewrightResult<()> {
        let element = self.resolve(target).await?;
        self.document.click(&element.handle, ClickMode::Normal).await
    }

    /// Resolve and fill
    pub async fn fill(&self, target: &SemanticTarget, text: &str) -> PagewrightResult<()> {
        let element = self.resolve(target).await?;
        self.document.fill(&element.handle, text).await
    }

    /// Resolve and press a key
    pub async fn press(&self, target: &SemanticTarget, key: &str) -> PagewrightResult<()> {
        let element = self.resolve(target).await?;
        self.document.press(&element.handle, key).await
    }

    /// Trimmed rendered text of an element
    pub async fn text_of(&self, element: &ResolvedElement) -> PagewrightResult<String> {
        Ok(self.document.inner_text(&element.handle).await?.trim().to_string())
    }

    /// Resolve `target` and navigate through it to `destination`
    pub async fn navigate_via(
        &self,
        target: &SemanticTarget,
        destination: &ReadinessSet,
    ) -> PagewrightResult<NavigationOutcome> {
        let element = self.resolve(target).await?;
        self.coordinator.navigate(&element, destination).await
    }
}
