//! Home page.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::context::PageContext;
use crate::overlay::OverlayRule;
use crate::page::PageObject;
use crate::readiness::{LoadState, ReadinessCondition, ReadinessSet};
use crate::result::PagewrightResult;
use crate::selector::{SelectorSpec, SemanticTarget, TextPattern};

use super::{Footer, Header};

/// Cookie consent controls dismissed for the whole visit
#[must_use]
pub fn cookie_rules() -> Vec<OverlayRule> {
    ["Accept Cookies", "Reject Non-Essential Cookies"]
        .into_iter()
        .map(|label| {
            OverlayRule::click(
                SemanticTarget::new(label)
                    .or(SelectorSpec::role("button").named(TextPattern::exact(label))),
            )
        })
        .collect()
}

/// Landing page at the base URL
#[derive(Debug, Clone)]
pub struct HomePage {
    ctx: Arc<PageContext>,
    header: Header,
    footer: Footer,
    hero: SemanticTarget,
    ready: ReadinessSet,
}

impl HomePage {
    /// Home page of the site in `ctx`
    pub fn new(ctx: Arc<PageContext>) -> PagewrightResult<Self> {
        let hero = SemanticTarget::new("hero")
            .or(SelectorSpec::css(".hero"))
            .or(SelectorSpec::role("heading").level(1));
        let ready = ReadinessSet::any_of([
            ReadinessCondition::title_matches("Littmann")?,
            ReadinessCondition::visible(hero.clone()),
        ]);
        Ok(Self {
            header: Header::new(ctx.clone())?,
            footer: Footer::new(ctx.clone()),
            ctx,
            hero,
            ready,
        })
    }

    /// Install the cookie handlers, open the base URL and wait for `load`
    pub async fn navigate(&self) -> PagewrightResult<()> {
        self.ctx.install_overlays(cookie_rules()).await;
        let url = self.ctx.absolute_url("")?;
        info!(%url, "opening home page");
        self.ctx.goto(&url).await?;
        let loaded = ReadinessSet::any_of([ReadinessCondition::load_state(LoadState::Load)]);
        let _ = self
            .ctx
            .detector()
            .await_ready(&loaded, self.ctx.timeouts().navigation())
            .await?;
        Ok(())
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

    /// Whether the hero banner is rendered
    pub async fn is_hero_visible(&self) -> PagewrightResult<bool> {
        self.ctx.is_visible(&self.hero).await
    }
}

#[async_trait]
impl PageObject for HomePage {
    fn name(&self) -> &str {
        "home"
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
