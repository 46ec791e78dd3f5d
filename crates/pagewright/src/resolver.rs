//! Element Resolver
//!
//! Turns a [`SemanticTarget`] into a concrete, visible element by trying its
//! candidates strictly in declaration order. The first candidate that yields
//! a visible, attached element wins; later candidates are never consulted.
//!
//! The resolver is read-only: it queries and samples state but never acts.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::document::{BoundingState, Document, ElementHandle};
use crate::result::{PagewrightError, PagewrightResult};
use crate::selector::{Cardinality, SelectorSpec, SemanticTarget};

/// Default interval between resolution passes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A target bound to a live element
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedElement {
    /// Live element reference
    pub handle: ElementHandle,
    /// Rank of the candidate that matched (0 = preferred)
    pub matched_candidate_index: usize,
    /// State sampled at resolution time
    pub state: BoundingState,
    /// Name of the semantic target
    pub target: String,
}

impl fmt::Display for ResolvedElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} (candidate {})",
            self.target, self.handle, self.matched_candidate_index
        )
    }
}

/// Resolves semantic targets against a [`Document`]
#[derive(Clone)]
pub struct ElementResolver {
    document: Arc<dyn Document>,
    poll_interval: Duration,
}

impl fmt::Debug for ElementResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementResolver")
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

type Matches = (usize, Vec<(ElementHandle, BoundingState)>);

impl ElementResolver {
    /// Create a resolver polling every `poll_interval`
    #[must_use]
    pub fn new(document: Arc<dyn Document>, poll_interval: Duration) -> Self {
        Self {
            document,
            poll_interval,
        }
    }

    /// The document being queried
    #[must_use]
    pub fn document(&self) -> &Arc<dyn Document> {
        &self.document
    }

    /// Interval between passes
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Visible, attached matches of one candidate, honoring its scope chain
    async fn visible_matches(
        &self,
        spec: &SelectorSpec,
    ) -> PagewrightResult<Vec<(ElementHandle, BoundingState)>> {
        let chain = spec.scope_chain();
        let Some((leaf, scopes)) = chain.split_last() else {
            return Ok(Vec::new());
        };

        let mut roots: Vec<Option<ElementHandle>> = vec![None];
        for scope in scopes {
            let mut next = Vec::new();
            for root in &roots {
                next.extend(self.document.query(scope, root.as_ref()).await?.into_iter().map(Some));
            }
            if next.is_empty() {
                return Ok(Vec::new());
            }
            roots = next;
        }

        let mut matches: Vec<(ElementHandle, BoundingState)> = Vec::new();
        for root in &roots {
            for handle in self.document.query(leaf, root.as_ref()).await? {
                if matches.iter().any(|(seen, _)| seen.id == handle.id) {
                    continue;
                }
                let state = self.document.state(&handle).await?;
                if state.visible && state.attached {
                    matches.push((handle, state));
                }
            }
        }
        Ok(matches)
    }

    /// One full pass over the candidates. Transient errors count as a miss.
    async fn pass(&self, target: &SemanticTarget) -> PagewrightResult<Option<Matches>> {
        for (index, spec) in target.candidates().iter().enumerate() {
            let matches = match self.visible_matches(spec).await {
                Ok(matches) => matches,
                Err(e) if e.is_transient() => {
                    debug!(element = target.name(), candidate = %spec, error = %e, "transient failure, treating as miss");
                    Vec::new()
                }
                Err(e) => return Err(e),
            };
            if matches.is_empty() {
                trace!(element = target.name(), candidate = %spec, "candidate miss");
                continue;
            }
            if target.cardinality() == Cardinality::Unique && matches.len() > 1 {
                return Err(PagewrightError::AmbiguousMatch {
                    target: target.name().to_string(),
                    count: matches.len(),
                });
            }
            if index > 0 {
                debug!(element = target.name(), candidate = %spec, index, "resolved via fallback candidate");
            }
            return Ok(Some((index, matches)));
        }
        Ok(None)
    }

    fn not_found(target: &SemanticTarget) -> PagewrightError {
        PagewrightError::ElementNotFound {
            target: target.name().to_string(),
            tried: target.candidate_descriptions(),
        }
    }

    /// Poll until a pass succeeds or the deadline `budget` from now passes.
    ///
    /// A zero budget still gets exactly one pass; any other budget bounds
    /// every pass, including the first.
    async fn poll(&self, target: &SemanticTarget, budget: Duration) -> PagewrightResult<Matches> {
        if budget.is_zero() {
            return self.pass(target).await?.ok_or_else(|| Self::not_found(target));
        }
        let deadline = Instant::now() + budget;
        let attempts = async {
            loop {
                if let Some(found) = self.pass(target).await? {
                    return Ok::<_, PagewrightError>(found);
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };
        match tokio::time::timeout_at(deadline, attempts).await {
            Ok(result) => result,
            Err(_) => {
                debug!(element = target.name(), ?budget, "element not found");
                Err(Self::not_found(target))
            }
        }
    }

    fn bind(target: &SemanticTarget, index: usize, matches: Vec<(ElementHandle, BoundingState)>) -> Vec<ResolvedElement> {
        matches
            .into_iter()
            .map(|(handle, state)| ResolvedElement {
                handle,
                matched_candidate_index: index,
                state,
                target: target.name().to_string(),
            })
            .collect()
    }

    /// Resolve `target` to one visible element within `budget`
    pub async fn resolve(
        &self,
        target: &SemanticTarget,
        budget: Duration,
    ) -> PagewrightResult<ResolvedElement> {
        let (index, matches) = self.poll(target, budget).await?;
        Self::bind(target, index, matches)
            .into_iter()
            .next()
            .ok_or_else(|| Self::not_found(target))
    }

    /// Resolve every visible match of the winning candidate within `budget`
    pub async fn resolve_all(
        &self,
        target: &SemanticTarget,
        budget: Duration,
    ) -> PagewrightResult<Vec<ResolvedElement>> {
        let (index, matches) = self.poll(target, budget).await?;
        Ok(Self::bind(target, index, matches))
    }

    /// Single pass, no waiting
    pub async fn probe(&self, target: &SemanticTarget) -> PagewrightResult<Option<ResolvedElement>> {
        Ok(self
            .pass(target)
            .await?
            .and_then(|(index, matches)| Self::bind(target, index, matches).into_iter().next()))
    }

    /// Single pass returning every visible match of the winning candidate
    pub async fn probe_all(&self, target: &SemanticTarget) -> PagewrightResult<Vec<ResolvedElement>> {
        Ok(self
            .pass(target)
            .await?
            .map(|(index, matches)| Self::bind(target, index, matches))
            .unwrap_or_default())
    }

    /// Whether `target` currently resolves
    pub async fn is_visible(&self, target: &SemanticTarget) -> PagewrightResult<bool> {
        Ok(self.pass(target).await?.is_some())
    }
}
