//! Business scenarios and the runner that executes them.
//!
//! Each scenario is an async function over a fresh [`PageContext`]. The
//! runner gives every scenario its own document, bounds it by the test
//! budget and classifies the outcome.
//!
//! ## Toyota Way Application:
//! - **Jidoka**: A failing step stops its scenario with a typed error
//! - **Heijunka**: Scenarios are levelled across `parallel_jobs` workers

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use regex::Regex;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::SuiteConfig;
use crate::context::PageContext;
use crate::document::Document;
use crate::page::PageObject;
use crate::pages::{
    HomePage, MainMenu, ProductDetailPage, ProductListingPage, SearchResultsPage,
    STETHOSCOPES_PATH,
};
use crate::readiness::duration_ms;
use crate::result::{PagewrightError, PagewrightResult};

/// Future returned by a scenario body
pub type ScenarioFuture = BoxFuture<'static, PagewrightResult<ScenarioOutcome>>;

/// Scenario body
pub type ScenarioFn = fn(Arc<PageContext>) -> ScenarioFuture;

/// Classified result of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    /// Every step and check succeeded
    Passed,
    /// Not run, or the exercised feature is absent from the site
    Skipped {
        /// Why
        reason: String,
    },
    /// A step or check failed
    Failed {
        /// Rendered error
        error: String,
    },
}

impl ScenarioOutcome {
    /// Skipped with `reason`
    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    /// Whether the scenario passed
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Whether the scenario failed
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for ScenarioOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Skipped { reason } => write!(f, "skipped ({reason})"),
            Self::Failed { error } => write!(f, "failed: {error}"),
        }
    }
}

/// A named business scenario
#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    /// Identifier such as `TC014`
    pub id: &'static str,
    /// Human-readable title
    pub title: &'static str,
    /// Functional area
    pub module: &'static str,
    /// Reason the scenario is never run
    pub skip: Option<&'static str>,
    run: ScenarioFn,
}

impl Scenario {
    /// Create a scenario
    #[must_use]
    pub const fn new(
        id: &'static str,
        title: &'static str,
        module: &'static str,
        run: ScenarioFn,
    ) -> Self {
        Self {
            id,
            title,
            module,
            skip: None,
            run,
        }
    }

    /// Mark as never run
    #[must_use]
    pub const fn skipped(mut self, reason: &'static str) -> Self {
        self.skip = Some(reason);
        self
    }

    /// Run the body against `ctx`
    pub fn run(&self, ctx: Arc<PageContext>) -> ScenarioFuture {
        (self.run)(ctx)
    }
}

/// Report of one executed scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Scenario identifier
    pub id: String,
    /// Scenario title
    pub title: String,
    /// Functional area
    pub module: String,
    /// Classified outcome
    pub outcome: ScenarioOutcome,
    /// Wall time spent, in milliseconds
    pub elapsed_ms: u64,
    /// Final URL, title and overlay dismissals
    pub diagnostics: BTreeMap<String, String>,
}

/// Reports of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct SuiteSummary {
    /// Reports in catalog order
    pub reports: Vec<ScenarioReport>,
    /// Wall time of the run, in milliseconds
    pub elapsed_ms: u64,
}

impl SuiteSummary {
    /// Total scenarios
    #[must_use]
    pub fn total(&self) -> usize {
        self.reports.len()
    }

    /// Passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_passed()).count()
    }

    /// Failed scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_failed()).count()
    }

    /// Skipped scenarios
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.total() - self.passed_count() - self.failed_count()
    }

    /// Whether nothing failed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }

    /// Failed reports
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioReport> {
        self.reports.iter().filter(|r| r.outcome.is_failed()).collect()
    }
}

/// Source of one isolated document per scenario
#[async_trait]
pub trait DocumentFactory: Send + Sync {
    /// Open a fresh document
    async fn open(&self) -> PagewrightResult<Arc<dyn Document>>;
}

#[async_trait]
impl<F> DocumentFactory for F
where
    F: Fn() -> PagewrightResult<Arc<dyn Document>> + Send + Sync,
{
    async fn open(&self) -> PagewrightResult<Arc<dyn Document>> {
        self()
    }
}

/// Runs scenarios as independent workers
#[derive(Clone)]
pub struct ScenarioRunner {
    config: SuiteConfig,
    factory: Arc<dyn DocumentFactory>,
}

impl fmt::Debug for ScenarioRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioRunner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ScenarioRunner {
    /// Create a runner opening documents from `factory`
    #[must_use]
    pub fn new(config: SuiteConfig, factory: Arc<dyn DocumentFactory>) -> Self {
        Self { config, factory }
    }

    /// Run `scenarios`, at most `parallel_jobs` at a time
    pub async fn run(&self, scenarios: &[Scenario]) -> SuiteSummary {
        let started = Instant::now();
        let jobs = self.config.parallel_jobs.max(1);
        info!(scenarios = scenarios.len(), jobs, "running suite");
        let mut reports: Vec<(usize, ScenarioReport)> = stream::iter(scenarios.iter().enumerate())
            .map(|(i, scenario)| self.run_one(scenario).map(move |report| (i, report)))
            .buffer_unordered(jobs)
            .collect()
            .await;
        reports.sort_by_key(|(i, _)| *i);
        SuiteSummary {
            reports: reports.into_iter().map(|(_, report)| report).collect(),
            elapsed_ms: duration_ms(started.elapsed()),
        }
    }

    /// Run a single scenario in its own context
    pub async fn run_one(&self, scenario: &Scenario) -> ScenarioReport {
        let started = Instant::now();
        let mut diagnostics = BTreeMap::new();
        let outcome = match scenario.skip {
            Some(reason) => ScenarioOutcome::skipped(reason),
            None => match self.open_context().await {
                Ok(ctx) => self.execute(scenario, ctx, &mut diagnostics).await,
                Err(e) => ScenarioOutcome::Failed {
                    error: e.to_string(),
                },
            },
        };
        let elapsed_ms = duration_ms(started.elapsed());
        match &outcome {
            ScenarioOutcome::Failed { error } => {
                warn!(id = scenario.id, elapsed_ms, %error, "scenario failed");
            }
            other => info!(id = scenario.id, elapsed_ms, outcome = %other, "scenario finished"),
        }
        ScenarioReport {
            id: scenario.id.to_string(),
            title: scenario.title.to_string(),
            module: scenario.module.to_string(),
            outcome,
            elapsed_ms,
            diagnostics,
        }
    }

    async fn open_context(&self) -> PagewrightResult<Arc<PageContext>> {
        let document = self.factory.open().await?;
        Ok(Arc::new(PageContext::new(document, self.config.clone())?))
    }

    async fn execute(
        &self,
        scenario: &Scenario,
        ctx: Arc<PageContext>,
        diagnostics: &mut BTreeMap<String, String>,
    ) -> ScenarioOutcome {
        let budget = self.config.timeouts.test();
        let result = tokio::time::timeout(budget, scenario.run(ctx.clone())).await;

        if let Ok(url) = ctx.current_url().await {
            let _ = diagnostics.insert("url".to_string(), url);
        }
        if let Ok(title) = ctx.document().title().await {
            let _ = diagnostics.insert("title".to_string(), title);
        }
        let dismissals = ctx.overlay_dismissals().await;
        let _ = diagnostics.insert("overlay_dismissals".to_string(), dismissals.to_string());
        ctx.close().await;

        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => ScenarioOutcome::Failed {
                error: e.to_string(),
            },
            Err(_) => ScenarioOutcome::Failed {
                error: format!("scenario exceeded {} ms", duration_ms(budget)),
            },
        }
    }
}

/// Scenarios whose id is in `ids` (case-insensitive) and whose title
/// matches `grep`; an empty `ids` keeps every id
#[must_use]
pub fn select(scenarios: &[Scenario], ids: &[String], grep: Option<&Regex>) -> Vec<Scenario> {
    scenarios
        .iter()
        .filter(|s| ids.is_empty() || ids.iter().any(|id| id.eq_ignore_ascii_case(s.id)))
        .filter(|s| grep.map_or(true, |re| re.is_match(s.title)))
        .copied()
        .collect()
}

const NAVIGATION: &str = "Navigation & Page Load";
const SEARCH: &str = "Search Functionality";
const CATALOG: &str = "Product Catalog";

/// Every scenario of the suite, in catalog order
#[must_use]
pub fn catalog() -> Vec<Scenario> {
    vec![
        Scenario::new("TC001", "Verify homepage loads successfully", NAVIGATION, homepage_loads),
        Scenario::new("TC013", "Verify search bar visibility", SEARCH, search_bar_visible),
        Scenario::new("TC014", "Verify valid product search", SEARCH, valid_search),
        Scenario::new("TC015", "Verify partial keyword search", SEARCH, partial_search),
        Scenario::new("TC016", "Verify no results found", SEARCH, invalid_search),
        Scenario::new("TC017", "Verify special characters search", SEARCH, special_characters)
            .skipped("special characters redirect to the home page"),
        Scenario::new("TC018", "Verify search by SKU/Model Number", SEARCH, sku_search),
        Scenario::new("TC019", "Verify search input max length", SEARCH, long_query),
        Scenario::new("TC020", "Verify clearing search results", SEARCH, cleared_search),
        Scenario::new("TC021", "Verify navigation from search results", SEARCH, result_navigation),
        Scenario::new("TC022", "Verify search suggestions", SEARCH, search_suggestions),
        Scenario::new("TC023", "Verify \"All Products\" (PLP) load", CATALOG, listing_loads),
        Scenario::new("TC024", "Verify product filtering by Category", CATALOG, category_filter),
        Scenario::new("TC025", "Verify product filtering by Color", CATALOG, color_filter),
        Scenario::new("TC026", "Verify clearing filters", CATALOG, clear_filters),
        Scenario::new("TC027", "Verify product card details", CATALOG, card_details),
        Scenario::new("TC028", "Verify navigation to Product Detail Page (PDP)", CATALOG, detail_navigation),
    ]
}

fn ensure(condition: bool, message: impl Into<String>) -> PagewrightResult<()> {
    if condition {
        Ok(())
    } else {
        Err(PagewrightError::assertion(message))
    }
}

async fn open_home(ctx: &Arc<PageContext>) -> PagewrightResult<HomePage> {
    let home = HomePage::new(ctx.clone())?;
    home.navigate().await?;
    Ok(home)
}

async fn search_from_home(ctx: &Arc<PageContext>, query: &str) -> PagewrightResult<SearchResultsPage> {
    let home = open_home(ctx).await?;
    home.header().search(query).await?;
    let results = SearchResultsPage::new(ctx.clone())?;
    let ready = results.wait_until_loaded().await?;
    info!(query, fired = %ready.fired, "search results ready");
    Ok(results)
}

async fn open_listing(ctx: &Arc<PageContext>, path: Option<&str>) -> PagewrightResult<ProductListingPage> {
    let _ = open_home(ctx).await?;
    let listing = ProductListingPage::new(ctx.clone())?;
    match path {
        Some(path) => ctx.goto(&ctx.absolute_url(path)?).await?,
        None => listing.open().await?,
    }
    let _ = listing.wait_until_loaded().await?;
    Ok(listing)
}

fn homepage_loads(ctx: Arc<PageContext>) -> ScenarioFuture {
    async move {
        let home = open_home(&ctx).await?;
        ensure(home.is_loaded().await, "home page did not become ready")?;
        ensure(home.is_hero_visible().await?, "hero section not visible")?;
        ensure(
            home.header().is_menu_visible(MainMenu::Products).await,
            "Products menu not visible",
        )?;
        Ok(ScenarioOutcome::Passed)
    }
    .boxed()
}

fn search_bar_visible(ctx: Arc<PageContext>) -> ScenarioFuture {
    async move {
        let home = open_home(&ctx).await?;
        let header = home.header();
        ensure(header.is_search_visible().await, "search box or button not visible")?;
        let placeholder = header.search_placeholder().await?.unwrap_or_default();
        ensure(
            placeholder.to_lowercase().contains("search"),
            format!("unexpected placeholder {placeholder:?}"),
        )?;
        Ok(ScenarioOutcome::Passed)
    }
    .boxed()
}

fn valid_search(ctx: Arc<PageContext>) -> ScenarioFuture {
    async move {
        let results = search_from_home(&ctx, "Master Cardiology").await?;
        let count = results.results_count().await?;
        info!(count, "results for valid query");
        ensure(count > 0, "no results for a catalog product")?;
        let label = results.first_result_label().await?;
        ensure(
            label.to_lowercase().contains("cardiology"),
            format!("first result {label:?} is unrelated"),
        )?;
        Ok(ScenarioOutcome::Passed)
    }
    .boxed()
}

fn partial_search(ctx: Arc<PageContext>) -> ScenarioFuture {
    async move {
        let results = search_from_home(&ctx, "Cardio").await?;
        ensure(results.results_count().await? > 0, "no results for a partial keyword")?;
        let label = results.first_result_label().await?;
        ensure(!label.is_empty(), "first result has no label")?;
        Ok(ScenarioOutcome::Passed)
    }
    .boxed()
}

fn invalid_search(ctx: Arc<PageContext>) -> ScenarioFuture {
    async move {
        let results = search_from_home(&ctx, "xyz123invalid").await?;
        let count = results.results_count().await?;
        info!(count, "results for invalid query");
        ensure(results.has_heading().await, "results page has no heading")?;
        Ok(ScenarioOutcome::Passed)
    }
    .boxed()
}

fn special_characters(ctx: Arc<PageContext>) -> ScenarioFuture {
    async move {
        let home = open_home(&ctx).await?;
        home.header().search("@#$%^").await?;
        tokio::time::sleep(Duration::from_secs(2)).await;
        ensure(home.header().is_search_visible().await, "search box gone after special characters")?;
        Ok(ScenarioOutcome::Passed)
    }
    .boxed()
}

fn sku_search(ctx: Arc<PageContext>) -> ScenarioFuture {
    async move {
        let results = search_from_home(&ctx, "2161").await?;
        ensure(results.results_count().await? > 0, "no results for model number 2161")?;
        Ok(ScenarioOutcome::Passed)
    }
    .boxed()
}

fn long_query(ctx: Arc<PageContext>) -> ScenarioFuture {
    async move {
        let home = open_home(&ctx).await?;
        let header = home.header();
        header.type_query(&"Stethoscope ".repeat(20)).await?;
        let value = header.search_input_value().await?;
        info!(length = value.len(), "search box accepted long input");
        ensure(!value.is_empty(), "search box rejected long input")?;
        ensure(header.is_search_visible().await, "search controls hidden after long input")?;
        Ok(ScenarioOutcome::Passed)
    }
    .boxed()
}

fn cleared_search(ctx: Arc<PageContext>) -> ScenarioFuture {
    async move {
        let results = search_from_home(&ctx, "Cardiology").await?;
        results.header().clear_search().await?;
        results.header().submit_search().await?;
        let _ = results.wait_until_loaded().await?;
        ensure(results.has_heading().await, "empty search shows no heading")?;
        Ok(ScenarioOutcome::Passed)
    }
    .boxed()
}

fn result_navigation(ctx: Arc<PageContext>) -> ScenarioFuture {
    async move {
        let results = search_from_home(&ctx, "Master Cardiology").await?;
        let label = results.first_result_label().await?;
        info!(product = %label, "opening first result");
        let _ = results.click_result(0).await?;
        let url = ctx.current_url().await?;
        ensure(url.contains("/p/"), format!("{url} is not a product page"))?;
        Ok(ScenarioOutcome::Passed)
    }
    .boxed()
}

fn search_suggestions(ctx: Arc<PageContext>) -> ScenarioFuture {
    async move {
        let home = open_home(&ctx).await?;
        let header = home.header();
        header.focus_search().await?;
        header.type_query("Cla").await?;
        tokio::time::sleep(Duration::from_secs(1)).await;
        let value = header.search_input_value().await?;
        ensure(value == "Cla", format!("search box holds {value:?}"))?;
        Ok(ScenarioOutcome::Passed)
    }
    .boxed()
}

fn listing_loads(ctx: Arc<PageContext>) -> ScenarioFuture {
    async move {
        let listing = open_listing(&ctx, None).await?;
        ensure(listing.has_structure().await, "listing heading, filters or grid missing")?;
        let count = listing.product_count().await?;
        info!(count, "products on listing");
        ensure(count > 0, "listing shows no products")?;
        Ok(ScenarioOutcome::Passed)
    }
    .boxed()
}

fn category_filter(ctx: Arc<PageContext>) -> ScenarioFuture {
    async move {
        let listing = open_listing(&ctx, None).await?;
        let initial = listing.product_count().await?;
        let _ = listing.filter_by_category("Stethoscopes").await?;
        let _ = listing.wait_until_loaded().await?;
        let filtered = listing.product_count().await?;
        info!(initial, filtered, "category filter applied");
        let url = ctx.current_url().await?;
        ensure(url.contains("stethoscopes"), format!("{url} is not the category listing"))?;
        ensure(filtered > 0, "category listing shows no products")?;
        Ok(ScenarioOutcome::Passed)
    }
    .boxed()
}

fn color_filter(ctx: Arc<PageContext>) -> ScenarioFuture {
    async move {
        let listing = open_listing(&ctx, None).await?;
        match listing.filter_by_color("Black").await {
            Ok(()) => {
                ensure(listing.product_count().await? > 0, "color filter left no products")?;
                Ok(ScenarioOutcome::Passed)
            }
            Err(PagewrightError::ElementNotFound { .. }) => {
                Ok(ScenarioOutcome::skipped("color filter not available on this site"))
            }
            Err(e) => Err(e),
        }
    }
    .boxed()
}

fn clear_filters(ctx: Arc<PageContext>) -> ScenarioFuture {
    async move {
        let listing = open_listing(&ctx, Some(STETHOSCOPES_PATH)).await?;
        let filtered = listing.product_count().await?;
        listing.clear_filters().await?;
        let _ = listing.wait_until_loaded().await?;
        let cleared = listing.product_count().await?;
        info!(filtered, cleared, "filters cleared");
        ensure(cleared >= filtered, format!("{cleared} products after clearing, {filtered} before"))?;
        let url = ctx.current_url().await?;
        ensure(url.contains("/p/") && !url.contains("/pc/"), format!("{url} is still filtered"))?;
        Ok(ScenarioOutcome::Passed)
    }
    .boxed()
}

fn card_details(ctx: Arc<PageContext>) -> ScenarioFuture {
    async move {
        let listing = open_listing(&ctx, None).await?;
        let card = listing.card_details(0).await?;
        info!(title = %card.title, has_image = card.has_image, "first product card");
        ensure(!card.title.is_empty(), "first card has no title")?;
        ensure(card.has_image, "first card has no image")?;
        Ok(ScenarioOutcome::Passed)
    }
    .boxed()
}

fn detail_navigation(ctx: Arc<PageContext>) -> ScenarioFuture {
    async move {
        let listing = open_listing(&ctx, None).await?;
        let card = listing.card_details(0).await?;
        info!(product = %card.title, "opening first product");
        let _ = listing.select_first_product().await?;
        let detail = ProductDetailPage::new(ctx.clone())?;
        let _ = detail.wait_until_loaded().await?;
        let url = ctx.current_url().await?;
        ensure(url.contains("/p/"), format!("{url} is not a product page"))?;
        ensure(!detail.title().await?.is_empty(), "product title is empty")?;
        Ok(ScenarioOutcome::Passed)
    }
    .boxed()
}
