//! Search results page.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::PageContext;
use crate::navigation::NavigationOutcome;
use crate::page::PageObject;
use crate::readiness::{ReadinessCondition, ReadinessSet};
use crate::result::{PagewrightError, PagewrightResult};
use crate::selector::{SelectorSpec, SemanticTarget, TextPattern};

use super::{card_label, Header, ProductDetailPage};

/// Results of a header search.
///
/// The site answers unknown queries either with an explicit empty state or
/// with fuzzy fallback results under a heading; both count as loaded.
#[derive(Debug, Clone)]
pub struct SearchResultsPage {
    ctx: Arc<PageContext>,
    header: Header,
    cards: SemanticTarget,
    no_results: SemanticTarget,
    heading: SemanticTarget,
    ready: ReadinessSet,
}

impl SearchResultsPage {
    /// Results page in `ctx`
    pub fn new(ctx: Arc<PageContext>) -> PagewrightResult<Self> {
        let grid = SemanticTarget::new("results grid").or(SelectorSpec::css(".mds-grid"));
        let cards = SemanticTarget::new("result cards")
            .or(SelectorSpec::css("a.mds-link"))
            .all();
        let no_results = SemanticTarget::new("no results message").or(
            SelectorSpec::css(".mds-font_paragraph")
                .has_text(TextPattern::regex("No products|0 products")?),
        );
        let results_heading = SemanticTarget::new("results heading")
            .or(SelectorSpec::css("h1").has_text(TextPattern::regex("Results for|products")?));
        let heading = SemanticTarget::new("page heading").or(SelectorSpec::css("h1"));
        let ready = ReadinessSet::any_of([
            ReadinessCondition::visible(grid),
            ReadinessCondition::visible(no_results.clone()),
            ReadinessCondition::visible(results_heading),
        ]);
        Ok(Self {
            header: Header::new(ctx.clone())?,
            ctx,
            cards,
            no_results,
            heading,
            ready,
        })
    }

    /// Site header
    #[must_use]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Number of visible result cards
    pub async fn results_count(&self) -> PagewrightResult<usize> {
        self.ctx.count(&self.cards).await
    }

    /// Whether the explicit empty state is shown
    pub async fn has_no_results(&self) -> PagewrightResult<bool> {
        self.ctx.is_visible(&self.no_results).await
    }

    /// Whether a page heading shows up within the expect budget
    pub async fn has_heading(&self) -> bool {
        self.ctx.expect(&self.heading).await.is_ok()
    }

    /// Label of the first result card
    pub async fn first_result_label(&self) -> PagewrightResult<String> {
        let card = self.ctx.expect(&self.cards).await?;
        card_label(&self.ctx, &card).await
    }

    /// Open the result at `index` and confirm arrival on its detail page
    pub async fn click_result(&self, index: usize) -> PagewrightResult<NavigationOutcome> {
        let cards = self
            .ctx
            .resolver()
            .resolve_all(&self.cards, self.ctx.timeouts().expect())
            .await?;
        let count = cards.len();
        let card = cards.into_iter().nth(index).ok_or_else(|| {
            PagewrightError::assertion(format!("no result at index {index}, only {count} shown"))
        })?;
        let destination = ProductDetailPage::arrival()?;
        self.ctx.coordinator().navigate(&card, &destination).await
    }
}

#[async_trait]
impl PageObject for SearchResultsPage {
    fn name(&self) -> &str {
        "search results"
    }

    fn context(&self) -> &PageContext {
        &self.ctx
    }

    fn readiness(&self) -> &ReadinessSet {
        &self.ready
    }
}
