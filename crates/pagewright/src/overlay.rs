//! Transient-Overlay Handler
//!
//! Cookie banners, consent dialogs and promo popups can appear at any point
//! of a page visit and block pointer events. An [`OverlayGuard`] runs a
//! background watcher that dismisses them every time they appear, for as
//! long as the guard is alive.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::document::{ClickMode, Document};
use crate::resolver::ElementResolver;
use crate::result::PagewrightResult;
use crate::selector::SemanticTarget;

/// How an overlay is dismissed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DismissAction {
    /// Pointer click on the dismiss control
    Click,
    /// Forced event dispatch on the dismiss control
    ForceClick,
    /// Key press with the control focused (e.g. `Escape`)
    PressKey(String),
}

/// Recognizes one overlay's dismiss control and how to operate it
#[derive(Debug, Clone)]
pub struct OverlayRule {
    target: SemanticTarget,
    action: DismissAction,
}

impl OverlayRule {
    /// Create a rule
    #[must_use]
    pub const fn new(target: SemanticTarget, action: DismissAction) -> Self {
        Self { target, action }
    }

    /// Rule that clicks `target`
    #[must_use]
    pub const fn click(target: SemanticTarget) -> Self {
        Self::new(target, DismissAction::Click)
    }

    /// Rule name (the target name); rules are unique by name
    #[must_use]
    pub fn name(&self) -> &str {
        self.target.name()
    }

    /// Dismiss control
    #[must_use]
    pub const fn target(&self) -> &SemanticTarget {
        &self.target
    }

    /// Dismiss action
    #[must_use]
    pub const fn action(&self) -> &DismissAction {
        &self.action
    }
}

/// Drops later rules whose name was already seen
#[must_use]
pub fn dedupe_rules(rules: impl IntoIterator<Item = OverlayRule>) -> Vec<OverlayRule> {
    let mut seen = HashSet::new();
    rules
        .into_iter()
        .filter(|rule| seen.insert(rule.name().to_string()))
        .collect()
}

/// Installs overlay watchers
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayHandler;

impl OverlayHandler {
    /// Start watching for `rules` on `document`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn install(
        document: Arc<dyn Document>,
        rules: Vec<OverlayRule>,
        poll_interval: Duration,
    ) -> OverlayGuard {
        let rules = dedupe_rules(rules);
        let names = rules.iter().map(|r| r.name().to_string()).collect();
        let dismissals = Arc::new(AtomicUsize::new(0));
        let (shutdown, stop) = oneshot::channel();
        let watcher = Watcher {
            resolver: ElementResolver::new(document.clone(), poll_interval),
            document,
            rules,
            dismissals: dismissals.clone(),
        };
        let task = tokio::spawn(watcher.run(poll_interval, stop));
        debug!(?names, "overlay watcher installed");
        OverlayGuard {
            names,
            dismissals,
            shutdown: Some(shutdown),
            task: Some(task),
        }
    }
}

struct Watcher {
    document: Arc<dyn Document>,
    resolver: ElementResolver,
    rules: Vec<OverlayRule>,
    dismissals: Arc<AtomicUsize>,
}

impl Watcher {
    async fn run(self, poll_interval: Duration, mut stop: oneshot::Receiver<()>) {
        let mut ticker = tokio::time::interval(poll_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = ticker.tick() => self.sweep().await,
            }
        }
        debug!("overlay watcher stopped");
    }

    async fn sweep(&self) {
        for rule in &self.rules {
            let element = match self.resolver.probe(rule.target()).await {
                Ok(Some(element)) => element,
                Ok(None) => continue,
                Err(e) => {
                    debug!(overlay = rule.name(), error = %e, "overlay probe failed");
                    continue;
                }
            };
            match self.dismiss(rule, &element.handle).await {
                Ok(()) => {
                    let total = self.dismissals.fetch_add(1, Ordering::SeqCst) + 1;
                    info!(overlay = rule.name(), total, "overlay dismissed");
                }
                Err(e) => warn!(overlay = rule.name(), error = %e, "overlay dismissal failed, retrying next tick"),
            }
        }
    }

    async fn dismiss(
        &self,
        rule: &OverlayRule,
        handle: &crate::document::ElementHandle,
    ) -> PagewrightResult<()> {
        match rule.action() {
            DismissAction::Click => self.document.click(handle, ClickMode::Normal).await,
            DismissAction::ForceClick => self.document.click(handle, ClickMode::Dispatch).await,
            DismissAction::PressKey(key) => self.document.press(handle, key).await,
        }
    }
}

/// Keeps an overlay watcher alive; dropping it stops the watcher
pub struct OverlayGuard {
    names: Vec<String>,
    dismissals: Arc<AtomicUsize>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl fmt::Debug for OverlayGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayGuard")
            .field("rules", &self.names)
            .field("dismissals", &self.dismissals())
            .finish()
    }
}

impl OverlayGuard {
    /// Number of dismissals performed so far
    #[must_use]
    pub fn dismissals(&self) -> usize {
        self.dismissals.load(Ordering::SeqCst)
    }

    /// Names of the installed rules, after de-duplication
    #[must_use]
    pub fn rule_names(&self) -> &[String] {
        &self.names
    }

    /// Stop the watcher, letting an in-flight dismissal finish
    pub async fn uninstall(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "overlay watcher ended abnormally");
            }
        }
    }
}

impl Drop for OverlayGuard {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{MockDocument, MockEffect, MockNode, MockPage};
    use crate::selector::{SelectorSpec, TextPattern};

    const HOME: &str = "https://shop.test/";
    const POLL: Duration = Duration::from_millis(50);

    fn accept_cookies() -> OverlayRule {
        OverlayRule::click(
            SemanticTarget::new("Accept Cookies")
                .or(SelectorSpec::role("button").named(TextPattern::exact("Accept Cookies"))),
        )
    }

    fn with_banner() -> Arc<MockDocument> {
        let doc = MockDocument::new().with_route(
            HOME,
            MockPage::new("Home")
                .node(MockNode::new("banner", "div").class("cookie-banner"))
                .node(
                    MockNode::new("accept", "button")
                        .text("Accept Cookies")
                        .child_of("banner")
                        .on_click(MockEffect::Hide(vec!["banner".to_string()])),
                ),
        );
        doc.open(HOME);
        Arc::new(doc)
    }

    mod rule_tests {
        use super::*;

        #[test]
        fn test_dedupe_keeps_first_rule_per_name() {
            let rules = dedupe_rules(vec![
                accept_cookies(),
                OverlayRule::new(accept_cookies().target().clone(), DismissAction::ForceClick),
            ]);
            assert_eq!(rules.len(), 1);
            assert_eq!(rules[0].action(), &DismissAction::Click);
        }
    }

    mod watcher_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_dismisses_every_appearance() {
            let doc = with_banner();
            let guard = OverlayHandler::install(doc.clone(), vec![accept_cookies()], POLL);

            tokio::time::sleep(POLL * 3).await;
            assert_eq!(guard.dismissals(), 1);

            doc.show("banner");
            tokio::time::sleep(POLL * 3).await;
            assert_eq!(guard.dismissals(), 2);
            assert_eq!(doc.count_calls("click:accept"), 2);
            guard.uninstall().await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_duplicate_rules_dismiss_once() {
            let doc = with_banner();
            let guard = OverlayHandler::install(
                doc.clone(),
                vec![accept_cookies(), accept_cookies()],
                POLL,
            );
            assert_eq!(guard.rule_names(), ["Accept Cookies"]);
            tokio::time::sleep(POLL * 4).await;
            assert_eq!(doc.count_calls("click:accept"), 1);
            guard.uninstall().await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_uninstall_stops_watching() {
            let doc = with_banner();
            let guard = OverlayHandler::install(doc.clone(), vec![accept_cookies()], POLL);
            tokio::time::sleep(POLL * 2).await;
            guard.uninstall().await;

            doc.show("banner");
            tokio::time::sleep(POLL * 4).await;
            assert_eq!(doc.count_calls("click:accept"), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_drop_stops_watching() {
            let doc = with_banner();
            {
                let _guard = OverlayHandler::install(doc.clone(), vec![accept_cookies()], POLL);
                tokio::time::sleep(POLL * 2).await;
            }
            doc.show("banner");
            tokio::time::sleep(POLL * 4).await;
            assert_eq!(doc.count_calls("click:accept"), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_failed_dismissal_is_retried() {
            let doc = MockDocument::new().with_route(
                HOME,
                MockPage::new("Home")
                    .node(MockNode::new("promo", "div").class("promo-modal"))
                    .node(
                        MockNode::new("promo-close", "button")
                            .text("Close")
                            .child_of("promo")
                            .disabled()
                            .on_click(MockEffect::Hide(vec!["promo".to_string()])),
                    ),
            );
            doc.open(HOME);
            let doc = Arc::new(doc);
            let rule = OverlayRule::click(
                SemanticTarget::new("promo close")
                    .or(SelectorSpec::role("button").named(TextPattern::exact("Close"))),
            );
            let guard = OverlayHandler::install(doc.clone(), vec![rule], POLL);
            tokio::time::sleep(POLL * 3).await;
            assert_eq!(guard.dismissals(), 0);
            assert!(!doc.was_called("click:promo-close"));

            doc.set_enabled("promo-close", true);
            tokio::time::sleep(POLL * 3).await;
            assert_eq!(guard.dismissals(), 1);
            assert_eq!(doc.count_calls("click:promo-close"), 1);
            guard.uninstall().await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_press_key_action() {
            let doc = with_banner();
            let rule = OverlayRule::new(
                accept_cookies().target().clone(),
                DismissAction::PressKey("Escape".to_string()),
            );
            let guard = OverlayHandler::install(doc.clone(), vec![rule], POLL);
            tokio::time::sleep(POLL * 2).await;
            assert!(doc.was_called("press:accept:Escape"));
            guard.uninstall().await;
        }
    }

    mod interplay_tests {
        use super::*;
        use crate::navigation::NavigationCoordinator;
        use crate::readiness::{ReadinessCondition, ReadinessDetector, ReadinessSet};
        use crate::result::NavigationMode;

        const PLP: &str = "https://shop.test/p/";

        #[tokio::test(start_paused = true)]
        async fn test_duplicate_rules_do_not_disturb_navigation() {
            let late = Duration::from_millis(200);
            let doc = MockDocument::new()
                .with_route(
                    HOME,
                    MockPage::new("Home")
                        .node(MockNode::new("banner", "div").class("cookie-banner").appears_after(late))
                        .node(
                            MockNode::new("accept", "button")
                                .text("Accept Cookies")
                                .child_of("banner")
                                .on_click(MockEffect::Hide(vec!["banner".to_string()])),
                        )
                        .node(
                            MockNode::new("menu", "span")
                                .role("menuitem")
                                .text("Products")
                                .appears_after(late)
                                .covered_by("banner")
                                .on_click(MockEffect::Navigate(PLP.to_string())),
                        ),
                )
                .with_route(PLP, MockPage::new("Products"));
            doc.open(HOME);
            let doc = Arc::new(doc);
            let guard = OverlayHandler::install(
                doc.clone(),
                vec![accept_cookies(), accept_cookies()],
                POLL,
            );

            let resolver = ElementResolver::new(doc.clone(), POLL);
            let coordinator = NavigationCoordinator::new(
                doc.clone(),
                ReadinessDetector::new(resolver.clone()),
                Duration::from_secs(5),
                Duration::from_millis(500),
            );
            let menu_target = SemanticTarget::new("Products menu")
                .or(SelectorSpec::role("menuitem").named(TextPattern::exact("Products")));
            let menu = resolver.resolve(&menu_target, Duration::from_secs(2)).await.unwrap();
            let plp = ReadinessSet::any_of([ReadinessCondition::url_matches("/p/$").unwrap()]);
            let outcome = coordinator.navigate(&menu, &plp).await.unwrap();

            assert_eq!(outcome.mode, NavigationMode::SimulateClick);
            assert_eq!(doc.current_url().await.unwrap(), PLP);
            tokio::time::sleep(POLL * 4).await;
            assert_eq!(doc.count_calls("click:accept"), 1);
            assert_eq!(guard.dismissals(), 1);
            guard.uninstall().await;
        }
    }
}
