//! Informational pages reached from the header and footer.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::PageContext;
use crate::page::PageObject;
use crate::readiness::{ReadinessCondition, ReadinessSet};
use crate::result::PagewrightResult;
use crate::selector::{SelectorSpec, SemanticTarget, TextPattern};

macro_rules! url_and_heading_page {
    ($page:ident, $name:literal) => {
        #[async_trait]
        impl PageObject for $page {
            fn name(&self) -> &str {
                $name
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
    };
}

fn url_and_heading(url: &str, heading: &SemanticTarget) -> PagewrightResult<ReadinessSet> {
    Ok(ReadinessSet::any_of([
        ReadinessCondition::url_matches(url)?,
        ReadinessCondition::visible(heading.clone()),
    ]))
}

/// Retailer locator
#[derive(Debug, Clone)]
pub struct WhereToBuyPage {
    ctx: Arc<PageContext>,
    ready: ReadinessSet,
}

impl WhereToBuyPage {
    /// Page in `ctx`
    pub fn new(ctx: Arc<PageContext>) -> PagewrightResult<Self> {
        let heading = SemanticTarget::new("where to buy heading")
            .or(SelectorSpec::css("h1, h2").has_text(TextPattern::regex("Where to Buy")?));
        Ok(Self {
            ready: url_and_heading("where-to-buy", &heading)?,
            ctx,
        })
    }
}

url_and_heading_page!(WhereToBuyPage, "where to buy");

/// Customer service page
#[derive(Debug, Clone)]
pub struct ContactUsPage {
    ctx: Arc<PageContext>,
    show_form: SemanticTarget,
    ready: ReadinessSet,
}

impl ContactUsPage {
    /// Page in `ctx`
    pub fn new(ctx: Arc<PageContext>) -> PagewrightResult<Self> {
        let heading = SemanticTarget::new("customer service heading").or(
            SelectorSpec::role("heading")
                .level(2)
                .named(TextPattern::regex("Customer Service")?),
        );
        let show_form = SemanticTarget::new("show form button")
            .or(SelectorSpec::role("button").named(TextPattern::regex("Show Form|Email Us")?));
        Ok(Self {
            ready: url_and_heading(r"/contact-us/", &heading)?,
            ctx,
            show_form,
        })
    }

    /// Whether the contact form toggle is shown
    pub async fn has_show_form(&self) -> PagewrightResult<bool> {
        self.ctx.is_visible(&self.show_form).await
    }
}

url_and_heading_page!(ContactUsPage, "contact us");

/// Brand page
#[derive(Debug, Clone)]
pub struct WhyChoosePage {
    ctx: Arc<PageContext>,
    ready: ReadinessSet,
}

impl WhyChoosePage {
    /// Page in `ctx`
    pub fn new(ctx: Arc<PageContext>) -> PagewrightResult<Self> {
        let heading = SemanticTarget::new("why choose heading").or(
            SelectorSpec::role("heading")
                .level(1)
                .named(TextPattern::regex("Why Choose")?),
        );
        Ok(Self {
            ready: url_and_heading(r"/why-choose/", &heading)?,
            ctx,
        })
    }
}

url_and_heading_page!(WhyChoosePage, "why choose");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::fixtures;

    #[tokio::test(start_paused = true)]
    async fn test_info_pages_load() {
        let (doc, ctx) = fixtures::site_context();

        doc.open(&format!("{}/3M/en_IN/where-to-buy/", fixtures::ORIGIN));
        assert!(WhereToBuyPage::new(ctx.clone()).unwrap().is_loaded().await);

        doc.open(&format!("{}/3M/en_IN/contact-us/", fixtures::ORIGIN));
        let contact = ContactUsPage::new(ctx.clone()).unwrap();
        assert!(contact.is_loaded().await);
        assert!(contact.has_show_form().await.unwrap());

        doc.open(&format!("{}/3M/en_IN/why-choose/", fixtures::ORIGIN));
        assert!(WhyChoosePage::new(ctx).unwrap().is_loaded().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_page_is_not_loaded() {
        let (doc, ctx) = fixtures::site_context();
        doc.open(&format!("{}/3M/en_IN/where-to-buy/", fixtures::ORIGIN));
        let page = WhyChoosePage::new(ctx).unwrap();
        assert!(!page.is_loaded().await);
    }
}
