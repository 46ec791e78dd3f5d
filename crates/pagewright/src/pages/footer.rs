//! Site footer links.

use std::sync::Arc;

use crate::context::PageContext;
use crate::navigation::NavigationOutcome;
use crate::page::PageObject;
use crate::result::PagewrightResult;
use crate::selector::{SelectorSpec, SemanticTarget, TextPattern};

use super::{ContactUsPage, WhereToBuyPage};

/// Links the footer is expected to carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FooterLink {
    /// Contact Us
    ContactUs,
    /// Where to Buy
    WhereToBuy,
    /// Legal Information
    LegalInformation,
    /// Privacy Policy
    PrivacyPolicy,
}

impl FooterLink {
    const fn pattern(self) -> &'static str {
        match self {
            Self::ContactUs => "contact us",
            Self::WhereToBuy => "where to buy",
            Self::LegalInformation => "legal information",
            Self::PrivacyPolicy => "privacy policy",
        }
    }

    /// Link inside the page footer, falling back to any link with that name
    pub fn target(self) -> PagewrightResult<SemanticTarget> {
        let name = TextPattern::regex(self.pattern())?;
        Ok(SemanticTarget::new(format!("footer {}", self.pattern()))
            .or(SelectorSpec::role("link")
                .named(name.clone())
                .within(SelectorSpec::role("contentinfo")))
            .or(SelectorSpec::role("link").named(name)))
    }
}

/// Footer shared by most pages
#[derive(Debug, Clone)]
pub struct Footer {
    ctx: Arc<PageContext>,
    region: SemanticTarget,
}

impl Footer {
    /// Footer of the page in `ctx`
    #[must_use]
    pub fn new(ctx: Arc<PageContext>) -> Self {
        let region = SemanticTarget::new("footer")
            .or(SelectorSpec::role("contentinfo"))
            .or(SelectorSpec::css("footer, .footer, #footer"));
        Self { ctx, region }
    }

    /// Whether the footer is rendered
    pub async fn is_visible(&self) -> PagewrightResult<bool> {
        self.ctx.is_visible(&self.region).await
    }

    /// Whether `link` is present right now
    pub async fn has_link(&self, link: FooterLink) -> PagewrightResult<bool> {
        self.ctx.is_visible(&link.target()?).await
    }

    /// Follow a footer link and confirm arrival on `destination`
    pub async fn open<P: PageObject>(&self, link: FooterLink, destination: &P) -> PagewrightResult<NavigationOutcome> {
        self.ctx
            .navigate_via(&link.target()?, destination.readiness())
            .await
    }

    /// Follow "Contact Us"
    pub async fn open_contact_us(&self) -> PagewrightResult<ContactUsPage> {
        let page = ContactUsPage::new(self.ctx.clone())?;
        let _ = self.open(FooterLink::ContactUs, &page).await?;
        Ok(page)
    }

    /// Follow "Where to Buy"
    pub async fn open_where_to_buy(&self) -> PagewrightResult<WhereToBuyPage> {
        let page = WhereToBuyPage::new(self.ctx.clone())?;
        let _ = self.open(FooterLink::WhereToBuy, &page).await?;
        Ok(page)
    }
}
