//! Pagewright: resilient element resolution and page readiness for
//! storefront end-to-end checks
//!
//! Business scenarios talk to page objects; page objects describe elements
//! as ordered candidate chains and pages as sets of readiness signals; the
//! resolution layer decides which candidate is present, when a transition
//! has completed, and how to get past overlays and intercepted clicks.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   PAGEWRIGHT Architecture                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Scenario   │    │ Page       │    │ Resolver / │            │
//! │   │ Catalog    │───►│ Objects    │───►│ Readiness  │            │
//! │   │ (TC0xx)    │    │            │    │ Navigation │            │
//! │   └────────────┘    └────────────┘    └─────┬──────┘            │
//! │                                             │                   │
//! │                     ┌───────────────────────┴──────┐            │
//! │                     │ Document (Mock │ chromium)   │            │
//! │                     └──────────────────────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
mod config;
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
mod context;
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown,
    clippy::significant_drop_tightening
)]
mod document;
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
mod navigation;
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
mod overlay;
mod page;
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
mod readiness;
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
mod resolver;
mod result;
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::unnecessary_wraps,
    clippy::doc_markdown
)]
mod selector;

/// Chromium backend over the DevTools protocol
#[cfg(feature = "browser")]
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
mod cdp;

/// Page objects for the Littmann India storefront
///
/// Header, footer, home, search results, product listing, product detail
/// and informational pages.
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
pub mod pages;

/// Business scenarios and the suite runner
///
/// The TC0xx catalog, selection by id or pattern, and concurrent execution
/// with a per-scenario budget.
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown,
    clippy::too_many_lines
)]
pub mod scenarios;

pub use config::{SuiteConfig, Timeouts, DEFAULT_BASE_URL};
pub use context::PageContext;
pub use document::{
    BoundingBox, BoundingState, ClickMode, Document, ElementHandle, MockDocument, MockEffect,
    MockNode, MockPage,
};
pub use navigation::{address_for, NavigationCoordinator, NavigationIntent, NavigationOutcome};
pub use overlay::{dedupe_rules, DismissAction, OverlayGuard, OverlayHandler, OverlayRule};
pub use page::PageObject;
pub use readiness::{LoadState, Readiness, ReadinessCondition, ReadinessDetector, ReadinessSet};
pub use resolver::{ElementResolver, ResolvedElement, DEFAULT_POLL_INTERVAL};
pub use result::{NavigationMode, PagewrightError, PagewrightResult};
pub use scenarios::{
    catalog, select, DocumentFactory, Scenario, ScenarioOutcome, ScenarioReport, ScenarioRunner,
    SuiteSummary,
};
pub use selector::{Cardinality, SelectorKind, SelectorSpec, SemanticTarget, TextPattern};

#[cfg(feature = "browser")]
pub use cdp::{CdpBrowser, CdpDocument};

/// Prelude for writing scenarios and page objects
pub mod prelude {
    pub use super::pages::*;
    pub use super::{
        ClickMode, Document, ElementResolver, NavigationCoordinator, NavigationMode, PageContext,
        PageObject, PagewrightError, PagewrightResult, ReadinessCondition, ReadinessSet,
        ResolvedElement, SelectorSpec, SemanticTarget, SuiteConfig, TextPattern,
    };
}
