//! Readiness Detector
//!
//! Decides when a page transition has completed by racing a set of
//! alternative signals (element visible, URL, title, load state).
//!
//! ## Toyota Way Application
//!
//! - **Jidoka**: First condition to hold stops the wait immediately
//! - **Poka-Yoke**: An empty condition set is rejected up front
//! - **Muda**: Losing racers are dropped, no further polling

use std::fmt;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::resolver::ElementResolver;
use crate::result::{PagewrightError, PagewrightResult};
use crate::selector::SemanticTarget;

// =============================================================================
// LOAD STATE
// =============================================================================

/// Page load states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LoadState {
    /// `DOMContentLoaded` fired
    DomContentLoaded,
    /// The `load` event fired
    #[default]
    Load,
    /// No network activity for 500ms
    NetworkIdle,
}

impl LoadState {
    /// JavaScript event name for this load state
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::DomContentLoaded => "DOMContentLoaded",
            Self::NetworkIdle => "networkidle",
        }
    }

    const fn rank(self) -> u8 {
        match self {
            Self::DomContentLoaded => 0,
            Self::Load => 1,
            Self::NetworkIdle => 2,
        }
    }

    /// Whether a document currently in `self` has reached `required`
    #[must_use]
    pub const fn satisfies(self, required: Self) -> bool {
        self.rank() >= required.rank()
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.event_name())
    }
}

// =============================================================================
// CONDITIONS
// =============================================================================

/// A named predicate over the current document
#[derive(Debug, Clone)]
pub enum ReadinessCondition {
    /// Target resolves to a visible element
    Visible(SemanticTarget),
    /// Current address matches
    UrlMatches(Regex),
    /// Document title matches
    TitleMatches(Regex),
    /// Document reached a load state
    LoadState(LoadState),
}

fn case_insensitive(pattern: &str) -> PagewrightResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| PagewrightError::Config {
            message: format!("invalid pattern /{pattern}/: {e}"),
        })
}

impl ReadinessCondition {
    /// Element visible
    #[must_use]
    pub const fn visible(target: SemanticTarget) -> Self {
        Self::Visible(target)
    }

    /// Address matches a case-insensitive pattern
    pub fn url_matches(pattern: &str) -> PagewrightResult<Self> {
        case_insensitive(pattern).map(Self::UrlMatches)
    }

    /// Title matches a case-insensitive pattern
    pub fn title_matches(pattern: &str) -> PagewrightResult<Self> {
        case_insensitive(pattern).map(Self::TitleMatches)
    }

    /// Load state reached
    #[must_use]
    pub const fn load_state(state: LoadState) -> Self {
        Self::LoadState(state)
    }
}

impl fmt::Display for ReadinessCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visible(target) => write!(f, "visible({})", target.name()),
            Self::UrlMatches(re) => write!(f, "url~/{}/", re.as_str()),
            Self::TitleMatches(re) => write!(f, "title~/{}/", re.as_str()),
            Self::LoadState(state) => write!(f, "load-state({state})"),
        }
    }
}

/// Alternative signals that a page is ready
#[derive(Debug, Clone, Default)]
pub struct ReadinessSet {
    conditions: Vec<ReadinessCondition>,
}

impl ReadinessSet {
    /// Empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set from conditions
    #[must_use]
    pub fn any_of(conditions: impl IntoIterator<Item = ReadinessCondition>) -> Self {
        Self {
            conditions: conditions.into_iter().collect(),
        }
    }

    /// Add a condition
    #[must_use]
    pub fn with(mut self, condition: ReadinessCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Conditions in declaration order
    #[must_use]
    pub fn conditions(&self) -> &[ReadinessCondition] {
        &self.conditions
    }

    /// Whether there is nothing to wait for
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Condition names, in order
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.conditions.iter().map(ToString::to_string).collect()
    }
}

/// Which condition established readiness, and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Readiness {
    /// Name of the condition that fired
    pub fired: String,
    /// Its index in the set
    pub index: usize,
    /// Time from the start of the wait
    pub elapsed: Duration,
}

// =============================================================================
// DETECTOR
// =============================================================================

/// Races readiness conditions against a budget
#[derive(Debug, Clone)]
pub struct ReadinessDetector {
    resolver: ElementResolver,
}

impl ReadinessDetector {
    /// Create a detector evaluating conditions through `resolver`
    #[must_use]
    pub const fn new(resolver: ElementResolver) -> Self {
        Self { resolver }
    }

    /// Sample a condition once. A transient failure samples as `false`.
    pub async fn check(&self, condition: &ReadinessCondition) -> PagewrightResult<bool> {
        let document = self.resolver.document();
        let sampled = match condition {
            ReadinessCondition::Visible(target) => self.resolver.is_visible(target).await,
            ReadinessCondition::UrlMatches(re) => {
                document.current_url().await.map(|url| re.is_match(&url))
            }
            ReadinessCondition::TitleMatches(re) => {
                document.title().await.map(|title| re.is_match(&title))
            }
            ReadinessCondition::LoadState(required) => {
                document.load_state().await.map(|s| s.satisfies(*required))
            }
        };
        match sampled {
            Err(e) if e.is_transient() => {
                debug!(%condition, error = %e, "transient failure, polling again");
                Ok(false)
            }
            other => other,
        }
    }

    async fn watch(&self, condition: &ReadinessCondition) -> PagewrightResult<()> {
        loop {
            if self.check(condition).await? {
                return Ok(());
            }
            tokio::time::sleep(self.resolver.poll_interval()).await;
        }
    }

    /// Wait until any condition of `set` holds.
    ///
    /// Conditions are evaluated concurrently; the first to hold wins and the
    /// others are dropped. Transient driver failures are polled through; a
    /// condition failing any other way leaves the race, and if every condition
    /// fails the last error is returned.
    pub async fn await_ready(
        &self,
        set: &ReadinessSet,
        budget: Duration,
    ) -> PagewrightResult<Readiness> {
        if set.is_empty() {
            return Err(PagewrightError::Config {
                message: "readiness set has no conditions".to_string(),
            });
        }
        let started = Instant::now();
        let race = async {
            let mut racers: FuturesUnordered<_> = set
                .conditions()
                .iter()
                .enumerate()
                .map(|(index, condition)| async move { (index, self.watch(condition).await) })
                .collect();
            let mut last_error = None;
            while let Some((index, outcome)) = racers.next().await {
                match outcome {
                    Ok(()) => return Ok(index),
                    Err(e) => {
                        warn!(condition = %set.conditions()[index], error = %e, "readiness condition failed");
                        last_error = Some(e);
                    }
                }
            }
            Err(last_error.unwrap_or_else(|| PagewrightError::driver("no readiness racer completed")))
        };

        match tokio::time::timeout(budget, race).await {
            Ok(Ok(index)) => {
                let fired = set.conditions()[index].to_string();
                let elapsed = started.elapsed();
                debug!(%fired, ?elapsed, "page ready");
                Ok(Readiness {
                    fired,
                    index,
                    elapsed,
                })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(PagewrightError::ReadinessTimeout {
                conditions: set.names(),
                timeout_ms: duration_ms(budget),
            }),
        }
    }

    /// Wait until every condition of `set` holds under one shared budget.
    ///
    /// Reports the last condition to be satisfied.
    pub async fn await_all(
        &self,
        set: &ReadinessSet,
        budget: Duration,
    ) -> PagewrightResult<Readiness> {
        if set.is_empty() {
            return Err(PagewrightError::Config {
                message: "readiness set has no conditions".to_string(),
            });
        }
        let started = Instant::now();
        let deadline = started + budget;
        for (index, condition) in set.conditions().iter().enumerate() {
            match tokio::time::timeout_at(deadline, self.watch(condition)).await {
                Ok(Ok(())) => debug!(condition = %condition, "condition holds"),
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    return Err(PagewrightError::ReadinessTimeout {
                        conditions: set.names()[index..].to_vec(),
                        timeout_ms: duration_ms(budget),
                    })
                }
            }
        }
        let index = set.conditions().len() - 1;
        Ok(Readiness {
            fired: set.conditions()[index].to_string(),
            index,
            elapsed: started.elapsed(),
        })
    }
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::document::{MockDocument, MockNode, MockPage};
    use crate::selector::{SelectorSpec, TextPattern};

    const RESULTS: &str = "https://shop.test/search?Ntt=cardio";

    fn detector(doc: MockDocument) -> (Arc<MockDocument>, ReadinessDetector) {
        let doc = Arc::new(doc);
        let resolver = ElementResolver::new(doc.clone(), Duration::from_millis(50));
        (doc, ReadinessDetector::new(resolver))
    }

    fn grid() -> SemanticTarget {
        SemanticTarget::new("results grid").or(SelectorSpec::css(".mds-grid"))
    }

    fn empty_state() -> SemanticTarget {
        SemanticTarget::new("no results")
            .or(SelectorSpec::css(".mds-font_paragraph").has_text(TextPattern::substring("No products")))
    }

    mod load_state_tests {
        use super::*;

        #[test]
        fn test_load_state_default_and_display() {
            assert_eq!(LoadState::default(), LoadState::Load);
            assert_eq!(LoadState::DomContentLoaded.to_string(), "DOMContentLoaded");
        }

        #[test]
        fn test_load_state_ordering() {
            assert!(LoadState::Load.satisfies(LoadState::DomContentLoaded));
            assert!(LoadState::NetworkIdle.satisfies(LoadState::Load));
            assert!(!LoadState::DomContentLoaded.satisfies(LoadState::Load));
        }
    }

    mod condition_tests {
        use super::*;

        #[test]
        fn test_condition_names() {
            let url = ReadinessCondition::url_matches(r"/p/").unwrap();
            assert_eq!(url.to_string(), "url~//p//");
            assert_eq!(ReadinessCondition::visible(grid()).to_string(), "visible(results grid)");
            assert_eq!(
                ReadinessCondition::load_state(LoadState::Load).to_string(),
                "load-state(load)"
            );
        }

        #[test]
        fn test_invalid_pattern_is_config_error() {
            let err = ReadinessCondition::title_matches("(").unwrap_err();
            assert!(matches!(err, PagewrightError::Config { .. }));
        }

        #[tokio::test]
        async fn test_title_match_is_case_insensitive() {
            let doc = MockDocument::new().with_route(RESULTS, MockPage::new("LITTMANN Search"));
            doc.open(RESULTS);
            let (_, detector) = detector(doc);
            let cond = ReadinessCondition::title_matches("littmann").unwrap();
            assert!(detector.check(&cond).await.unwrap());
        }
    }

    mod race_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_first_true_condition_wins() {
            let doc = MockDocument::new().with_route(
                RESULTS,
                MockPage::new("Search").node(
                    MockNode::new("empty", "p")
                        .class("mds-font_paragraph")
                        .text("No products found")
                        .appears_after(Duration::from_millis(400)),
                ),
            );
            doc.open(RESULTS);
            let (_, detector) = detector(doc);
            let set = ReadinessSet::any_of([
                ReadinessCondition::visible(grid()),
                ReadinessCondition::visible(empty_state()),
            ]);

            let ready = detector
                .await_ready(&set, Duration::from_secs(10))
                .await
                .unwrap();
            assert_eq!(ready.index, 1);
            assert_eq!(ready.fired, "visible(no results)");
            assert!(ready.elapsed >= Duration::from_millis(400));
            assert!(ready.elapsed < Duration::from_secs(1));
        }

        #[tokio::test(start_paused = true)]
        async fn test_timeout_is_not_early() {
            let doc = MockDocument::new().with_route(RESULTS, MockPage::new("Search"));
            doc.open(RESULTS);
            let (_, detector) = detector(doc);
            let set = ReadinessSet::new()
                .with(ReadinessCondition::visible(grid()))
                .with(ReadinessCondition::visible(empty_state()));

            let started = Instant::now();
            let err = detector
                .await_ready(&set, Duration::from_secs(10))
                .await
                .unwrap_err();
            assert!(started.elapsed() >= Duration::from_secs(10));
            match err {
                PagewrightError::ReadinessTimeout {
                    conditions,
                    timeout_ms,
                } => {
                    assert_eq!(timeout_ms, 10_000);
                    assert_eq!(conditions, vec!["visible(results grid)", "visible(no results)"]);
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn test_empty_set_rejected() {
            let (_, detector) = detector(MockDocument::new());
            let err = detector
                .await_ready(&ReadinessSet::new(), Duration::from_secs(1))
                .await
                .unwrap_err();
            assert!(matches!(err, PagewrightError::Config { .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_ready_when_element_already_visible() {
            let doc = MockDocument::new().with_route(
                RESULTS,
                MockPage::new("Search").node(MockNode::new("g", "div").class("mds-grid")),
            );
            doc.open(RESULTS);
            let (_, detector) = detector(doc);
            let set = ReadinessSet::any_of([ReadinessCondition::visible(grid())]);
            let ready = detector.await_ready(&set, Duration::ZERO).await.unwrap();
            assert_eq!(ready.elapsed, Duration::ZERO);
        }
    }

    mod unsteady_document_tests {
        use super::*;
        use crate::document::testing::UnsteadyDocument;

        fn results_with_grid() -> Arc<MockDocument> {
            let doc = MockDocument::new().with_route(
                RESULTS,
                MockPage::new("Search").node(MockNode::new("g", "div").class("mds-grid")),
            );
            doc.open(RESULTS);
            Arc::new(doc)
        }

        #[tokio::test(start_paused = true)]
        async fn test_destroyed_context_does_not_end_the_race() {
            let flaky = UnsteadyDocument::new(results_with_grid()).failing_queries(2);
            let resolver = ElementResolver::new(Arc::new(flaky), Duration::from_millis(50));
            let detector = ReadinessDetector::new(resolver);
            let set = ReadinessSet::any_of([ReadinessCondition::visible(grid())]);
            let ready = detector
                .await_ready(&set, Duration::from_secs(5))
                .await
                .unwrap();
            assert_eq!(ready.index, 0);
            assert!(ready.elapsed >= Duration::from_millis(100));
        }

        #[tokio::test(start_paused = true)]
        async fn test_url_read_failure_samples_false() {
            let flaky = UnsteadyDocument::new(results_with_grid()).failing_queries(1);
            let resolver = ElementResolver::new(Arc::new(flaky), Duration::from_millis(50));
            let detector = ReadinessDetector::new(resolver);
            let cond = ReadinessCondition::url_matches("Ntt=").unwrap();
            assert!(!detector.check(&cond).await.unwrap());
            assert!(detector.check(&cond).await.unwrap());
        }

        #[tokio::test(start_paused = true)]
        async fn test_slow_document_times_out_on_budget() {
            let slow = UnsteadyDocument::new(results_with_grid()).slow_queries(Duration::from_secs(30));
            let resolver = ElementResolver::new(Arc::new(slow), Duration::from_millis(50));
            let detector = ReadinessDetector::new(resolver);
            let set = ReadinessSet::any_of([ReadinessCondition::visible(grid())]);
            let started = Instant::now();
            let err = detector
                .await_ready(&set, Duration::from_secs(2))
                .await
                .unwrap_err();
            assert!(started.elapsed() < Duration::from_millis(2100));
            assert!(err.is_timeout());
        }
    }

    mod all_of_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_await_all_needs_every_condition() {
            let doc = MockDocument::new().with_route(
                "https://shop.test/p/",
                MockPage::new("Products").node(
                    MockNode::new("h", "h1")
                        .text("Stethoscopes")
                        .appears_after(Duration::from_millis(200)),
                ),
            );
            doc.open("https://shop.test/p/");
            let (_, detector) = detector(doc);
            let heading = SemanticTarget::new("heading").or(SelectorSpec::role("heading").level(1));
            let set = ReadinessSet::any_of([
                ReadinessCondition::url_matches(r"/p/").unwrap(),
                ReadinessCondition::visible(heading),
            ]);
            let ready = detector
                .await_all(&set, Duration::from_secs(5))
                .await
                .unwrap();
            assert_eq!(ready.index, 1);
            assert!(ready.elapsed >= Duration::from_millis(200));
        }

        #[tokio::test(start_paused = true)]
        async fn test_await_all_times_out_on_failing_condition() {
            let doc = MockDocument::new().with_route("https://shop.test/", MockPage::new("Home"));
            doc.open("https://shop.test/");
            let (_, detector) = detector(doc);
            let set = ReadinessSet::any_of([
                ReadinessCondition::load_state(LoadState::Load),
                ReadinessCondition::url_matches(r"/p/").unwrap(),
            ]);
            let err = detector
                .await_all(&set, Duration::from_secs(2))
                .await
                .unwrap_err();
            match err {
                PagewrightError::ReadinessTimeout { conditions, .. } => {
                    assert_eq!(conditions, vec!["url~//p//"]);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }
}
