//! Product listing page (all products and category listings).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::context::PageContext;
use crate::document::ClickMode;
use crate::navigation::NavigationOutcome;
use crate::page::PageObject;
use crate::readiness::{ReadinessCondition, ReadinessSet};
use crate::result::{PagewrightError, PagewrightResult};
use crate::selector::{SelectorSpec, SemanticTarget, TextPattern};

use super::{card_label, literal, Footer, Header, ProductDetailPage, PRODUCTS_PATH};

/// Budget for locating a specific product or filter link
const PICK_BUDGET: Duration = Duration::from_secs(5);

/// Summary of one product card
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardDetails {
    /// Product title
    pub title: String,
    /// Whether the card shows a product image
    pub has_image: bool,
}

/// Product listing page
#[derive(Debug, Clone)]
pub struct ProductListingPage {
    ctx: Arc<PageContext>,
    header: Header,
    footer: Footer,
    heading: SemanticTarget,
    filters: SemanticTarget,
    grid: SemanticTarget,
    cards: SemanticTarget,
    ready: ReadinessSet,
}

impl ProductListingPage {
    /// Listing page in `ctx`
    pub fn new(ctx: Arc<PageContext>) -> PagewrightResult<Self> {
        let heading = SemanticTarget::new("listing heading").or(SelectorSpec::role("heading").level(1));
        let filters = SemanticTarget::new("filters").or(SelectorSpec::css(".filter-container, #filters, aside"));
        let grid_css = ".product-grid, .grid-layout, [role=\"list\"]";
        let grid = SemanticTarget::new("product grid").or(SelectorSpec::css(grid_css));
        let cards = SemanticTarget::new("product cards")
            .or(SelectorSpec::css("a.mds-link").within(SelectorSpec::css(grid_css)))
            .or(SelectorSpec::css("a.mds-link"))
            .all();
        let ready = ReadinessSet::any_of([
            ReadinessCondition::url_matches(r"/p/")?,
            ReadinessCondition::visible(heading.clone()),
        ]);
        Ok(Self {
            header: Header::new(ctx.clone())?,
            footer: Footer::new(ctx.clone()),
            ctx,
            heading,
            filters,
            grid,
            cards,
            ready,
        })
    }

    /// Open the all-products listing directly
    pub async fn open(&self) -> PagewrightResult<()> {
        let url = self.ctx.absolute_url(PRODUCTS_PATH)?;
        self.ctx.goto(&url).await
    }

    /// Site header
    #[must_use]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Site footer
    #[must_use]
    pub const fn footer(&self) -> &Footer {
        &self.footer
    }

    /// Whether heading, filters and grid all show up within the expect budget
    pub async fn has_structure(&self) -> bool {
        for target in [&self.heading, &self.filters, &self.grid] {
            if self.ctx.expect(target).await.is_err() {
                return false;
            }
        }
        true
    }

    /// Number of visible product cards
    pub async fn product_count(&self) -> PagewrightResult<usize> {
        self.ctx.count(&self.cards).await
    }

    /// Title and image presence of the card at `index`
    pub async fn card_details(&self, index: usize) -> PagewrightResult<CardDetails> {
        let cards = self
            .ctx
            .resolver()
            .resolve_all(&self.cards, self.ctx.timeouts().expect())
            .await?;
        let count = cards.len();
        let card = cards.into_iter().nth(index).ok_or_else(|| {
            PagewrightError::assertion(format!("no product card at index {index}, only {count} shown"))
        })?;
        let title = card_label(&self.ctx, &card).await?;
        let document = self.ctx.document();
        let mut has_image = false;
        for image in document.query(&SelectorSpec::css("img"), Some(&card.handle)).await? {
            if document.state(&image).await?.visible {
                has_image = true;
                break;
            }
        }
        Ok(CardDetails { title, has_image })
    }

    /// Open the first flagship stethoscope listed
    pub async fn select_first_product(&self) -> PagewrightResult<NavigationOutcome> {
        let target = SemanticTarget::new("flagship product link").or(
            SelectorSpec::css("a").has_text(TextPattern::regex("Classic III|Cardiology IV|Master Cardiology")?),
        );
        let product = self.ctx.resolver().resolve(&target, PICK_BUDGET).await?;
        self.ctx
            .coordinator()
            .navigate(&product, &ProductDetailPage::arrival()?)
            .await
    }

    /// Follow a category link such as "Stethoscopes"
    pub async fn filter_by_category(&self, category: &str) -> PagewrightResult<NavigationOutcome> {
        let target = SemanticTarget::new(format!("{category} category"))
            .or(SelectorSpec::css("a.mds-link_secondary").has_text(literal(category)?));
        let link = self.ctx.resolver().resolve(&target, PICK_BUDGET).await?;
        let slug = category.to_lowercase().replace(' ', "-");
        let destination =
            ReadinessSet::any_of([ReadinessCondition::url_matches(&regex::escape(&slug))?]);
        self.ctx.coordinator().navigate(&link, &destination).await
    }

    /// Apply a color facet; fails with `ElementNotFound` when the site has none
    pub async fn filter_by_color(&self, color: &str) -> PagewrightResult<()> {
        let target = SemanticTarget::new(format!("{color} color filter"))
            .or(SelectorSpec::css("[data-facet*=\"color\"] a, [data-facet*=\"color\"] input")
                .has_text(literal(color)?))
            .or(SelectorSpec::role("checkbox").named(literal(color)?).within(SelectorSpec::css(
                ".color-filter, [aria-label*=\"Color\"]",
            )));
        let facet = self.ctx.resolver().resolve(&target, PICK_BUDGET).await?;
        self.ctx.document().click(&facet.handle, ClickMode::Normal).await?;
        let _ = self.wait_until_loaded().await?;
        Ok(())
    }

    /// Return to the unfiltered listing, by its link when shown, else directly
    pub async fn clear_filters(&self) -> PagewrightResult<()> {
        let all_link = SemanticTarget::new("all products link")
            .or(SelectorSpec::css(&format!("a[href=\"{PRODUCTS_PATH}\"]")));
        let destination = ReadinessSet::any_of([ReadinessCondition::url_matches(r"/p/$")?]);
        if let Some(link) = self.ctx.resolver().probe(&all_link).await? {
            let _ = self.ctx.coordinator().navigate(&link, &destination).await?;
        } else {
            info!("all products link not shown, opening listing directly");
            self.open().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl PageObject for ProductListingPage {
    fn name(&self) -> &str {
        "product listing"
    }

    fn context(&self) -> &PageContext {
        &self.ctx
    }

    fn readiness(&self) -> &ReadinessSet {
        &self.ready
    }

    fn requires_all(&self) -> bool {
        true
    }
}
