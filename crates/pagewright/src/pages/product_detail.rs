//! Product detail page.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::context::PageContext;
use crate::page::PageObject;
use crate::readiness::{ReadinessCondition, ReadinessSet};
use crate::result::PagewrightResult;
use crate::selector::{SelectorSpec, SemanticTarget, TextPattern};

use super::{link_named, Header, WhereToBuyPage};

const BREADCRUMB_BUDGET: Duration = Duration::from_secs(5);

/// Detail page of a single product
#[derive(Debug, Clone)]
pub struct ProductDetailPage {
    ctx: Arc<PageContext>,
    header: Header,
    title: SemanticTarget,
    breadcrumb: SemanticTarget,
    country_link: SemanticTarget,
    specifications: SemanticTarget,
    where_to_buy: SemanticTarget,
    ready: ReadinessSet,
}

impl ProductDetailPage {
    /// Detail page in `ctx`
    pub fn new(ctx: Arc<PageContext>) -> PagewrightResult<Self> {
        let title = SemanticTarget::new("product title").or(SelectorSpec::css("h1"));
        let breadcrumb = SemanticTarget::new("breadcrumb")
            .or(SelectorSpec::css("nav[aria-label=\"Breadcrumb\"], .breadcrumbs, nav.breadcrumbs"));
        let country_link = SemanticTarget::new("India breadcrumb link")
            .or(SelectorSpec::role("link").named(TextPattern::exact("India")));
        let specifications = SemanticTarget::new("specifications").or(
            SelectorSpec::css("[id*=\"spec\"], [class*=\"spec\"], section")
                .has_text(TextPattern::regex("specification|technical|details")?),
        );
        let ready = ReadinessSet::any_of([ReadinessCondition::visible(title.clone())]);
        Ok(Self {
            header: Header::new(ctx.clone())?,
            where_to_buy: link_named("where to buy link", "where to buy")?,
            ctx,
            title,
            breadcrumb,
            country_link,
            specifications,
            ready,
        })
    }

    /// Signals that a navigation has landed on some product detail page
    pub fn arrival() -> PagewrightResult<ReadinessSet> {
        Ok(ReadinessSet::any_of([ReadinessCondition::url_matches(r"/p/d/")?]))
    }

    /// Site header
    #[must_use]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Rendered product title
    pub async fn title(&self) -> PagewrightResult<String> {
        let title = self.ctx.expect(&self.title).await?;
        self.ctx.text_of(&title).await
    }

    /// Check the breadcrumb: the country link when shown, else any breadcrumb trail
    pub async fn verify_breadcrumb(&self) -> PagewrightResult<()> {
        if self.ctx.is_visible(&self.country_link).await? {
            return Ok(());
        }
        let _ = self
            .ctx
            .resolver()
            .resolve(&self.breadcrumb, BREADCRUMB_BUDGET)
            .await?;
        Ok(())
    }

    /// Whether a specifications section is shown
    pub async fn has_specifications(&self) -> PagewrightResult<bool> {
        self.ctx.is_visible(&self.specifications).await
    }

    /// Follow the "Where to Buy" link
    pub async fn open_where_to_buy(&self) -> PagewrightResult<WhereToBuyPage> {
        let page = WhereToBuyPage::new(self.ctx.clone())?;
        let _ = self.ctx.navigate_via(&self.where_to_buy, page.readiness()).await?;
        Ok(page)
    }
}

#[async_trait]
impl PageObject for ProductDetailPage {
    fn name(&self) -> &str {
        "product detail"
    }

    fn context(&self) -> &PageContext {
        &self.ctx
    }

    fn readiness(&self) -> &ReadinessSet {
        &self.ready
    }
}
