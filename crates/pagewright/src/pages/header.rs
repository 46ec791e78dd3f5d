//! Site header: search box and main navigation menus.

use std::fmt;
use std::sync::Arc;

use crate::context::PageContext;
use crate::navigation::NavigationOutcome;
use crate::readiness::ReadinessSet;
use crate::result::PagewrightResult;
use crate::selector::{SelectorSpec, SemanticTarget, TextPattern};

use super::link_named;

/// Top-level menu entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MainMenu {
    /// Products
    Products,
    /// Our Innovation
    OurInnovation,
    /// Tools & Resources
    ToolsAndResources,
    /// Education & Training
    EducationAndTraining,
    /// Latest News
    LatestNews,
    /// Where to Buy
    WhereToBuy,
}

impl MainMenu {
    /// Every menu, in header order
    pub const ALL: [Self; 6] = [
        Self::Products,
        Self::OurInnovation,
        Self::ToolsAndResources,
        Self::EducationAndTraining,
        Self::LatestNews,
        Self::WhereToBuy,
    ];

    /// Visible label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Products => "Products",
            Self::OurInnovation => "Our Innovation",
            Self::ToolsAndResources => "Tools & Resources",
            Self::EducationAndTraining => "Education & Training",
            Self::LatestNews => "Latest News",
            Self::WhereToBuy => "Where to Buy",
        }
    }

    /// Menu entry: a link with the exact label, else any element with that text
    #[must_use]
    pub fn target(self) -> SemanticTarget {
        SemanticTarget::new(format!("{self} menu"))
            .or(SelectorSpec::role("link").named(TextPattern::exact(self.label())))
            .or(SelectorSpec::text(TextPattern::exact(self.label())))
    }
}

impl fmt::Display for MainMenu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Header shared by every page
#[derive(Debug, Clone)]
pub struct Header {
    ctx: Arc<PageContext>,
    search_input: SemanticTarget,
    search_button: SemanticTarget,
}

impl Header {
    /// Header of the page in `ctx`
    pub fn new(ctx: Arc<PageContext>) -> PagewrightResult<Self> {
        let search_input = SemanticTarget::new("search box")
            .or(SelectorSpec::role("searchbox").named(TextPattern::regex("search")?))
            .or(SelectorSpec::placeholder(TextPattern::exact("Search")));
        let search_button = SemanticTarget::new("search button")
            .or(SelectorSpec::role("button").named(TextPattern::regex("search")?));
        Ok(Self {
            ctx,
            search_input,
            search_button,
        })
    }

    /// Type `query` and submit it with Enter
    pub async fn search(&self, query: &str) -> PagewrightResult<()> {
        self.ctx.fill(&self.search_input, query).await?;
        self.ctx.press(&self.search_input, "Enter").await
    }

    /// Type into the search box without submitting
    pub async fn type_query(&self, text: &str) -> PagewrightResult<()> {
        self.ctx.fill(&self.search_input, text).await
    }

    /// Focus the search box
    pub async fn focus_search(&self) -> PagewrightResult<()> {
        self.ctx.click(&self.search_input).await
    }

    /// Empty the search box
    pub async fn clear_search(&self) -> PagewrightResult<()> {
        self.ctx.fill(&self.search_input, "").await
    }

    /// Submit whatever is in the search box
    pub async fn submit_search(&self) -> PagewrightResult<()> {
        self.ctx.press(&self.search_input, "Enter").await
    }

    /// Current content of the search box
    pub async fn search_input_value(&self) -> PagewrightResult<String> {
        let input = self.ctx.resolve(&self.search_input).await?;
        self.ctx.document().input_value(&input.handle).await
    }

    /// `placeholder` of the search box
    pub async fn search_placeholder(&self) -> PagewrightResult<Option<String>> {
        let input = self.ctx.resolve(&self.search_input).await?;
        self.ctx.document().attribute(&input.handle, "placeholder").await
    }

    /// Whether the search box and its button both show up within the expect budget
    pub async fn is_search_visible(&self) -> bool {
        self.ctx.expect(&self.search_input).await.is_ok()
            && self.ctx.expect(&self.search_button).await.is_ok()
    }

    /// Whether `menu` shows up within the expect budget
    pub async fn is_menu_visible(&self, menu: MainMenu) -> bool {
        self.ctx.expect(&menu.target()).await.is_ok()
    }

    /// Move the pointer over `menu`
    pub async fn hover_menu(&self, menu: MainMenu) -> PagewrightResult<()> {
        let element = self.ctx.resolve(&menu.target()).await?;
        self.ctx.document().hover(&element.handle).await
    }

    /// Follow `menu` and confirm arrival on `destination`
    pub async fn open_menu(
        &self,
        menu: MainMenu,
        destination: &ReadinessSet,
    ) -> PagewrightResult<NavigationOutcome> {
        self.ctx.navigate_via(&menu.target(), destination).await
    }

    /// Submenu entry whose name contains `name`, as a link or a menu item
    pub fn submenu_link(&self, name: &str) -> PagewrightResult<SemanticTarget> {
        link_named(&format!("{name} submenu"), &regex::escape(name))
    }

    /// Follow a submenu entry
    pub async fn open_submenu(
        &self,
        name: &str,
        destination: &ReadinessSet,
    ) -> PagewrightResult<NavigationOutcome> {
        let target = self.submenu_link(name)?;
        self.ctx.navigate_via(&target, destination).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::pages::fixtures;
    use crate::readiness::ReadinessCondition;
    use crate::result::NavigationMode;

    #[test]
    fn test_menu_labels() {
        assert_eq!(MainMenu::ALL.len(), 6);
        assert_eq!(MainMenu::ToolsAndResources.to_string(), "Tools & Resources");
        let target = MainMenu::Products.target();
        assert_eq!(target.name(), "Products menu");
        assert_eq!(target.candidates().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_submits_query() {
        let (doc, ctx) = fixtures::home_context();
        let header = Header::new(ctx).unwrap();
        header.search("Master Cardiology").await.unwrap();
        assert_eq!(
            doc.current_url().await.unwrap(),
            "https://www.littmann.in/3M/en_IN/search/?Ntt=Master+Cardiology"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_box_state() {
        let (_, ctx) = fixtures::home_context();
        let header = Header::new(ctx).unwrap();
        assert!(header.is_search_visible().await);
        assert_eq!(header.search_placeholder().await.unwrap().as_deref(), Some("Search"));
        header.type_query("Cla").await.unwrap();
        assert_eq!(header.search_input_value().await.unwrap(), "Cla");
        header.clear_search().await.unwrap();
        assert_eq!(header.search_input_value().await.unwrap(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_menu_uses_direct_address() {
        let (doc, ctx) = fixtures::home_context();
        let header = Header::new(ctx).unwrap();
        let destination =
            ReadinessSet::any_of([ReadinessCondition::url_matches("where-to-buy").unwrap()]);
        let outcome = header.open_menu(MainMenu::WhereToBuy, &destination).await.unwrap();
        assert_eq!(outcome.mode, NavigationMode::DirectAddress);
        assert!(!doc.was_called("click:"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submenu_link_matches_menuitem() {
        let (_, ctx) = fixtures::home_context();
        let header = Header::new(ctx.clone()).unwrap();
        let target = header.submenu_link("Classic III").unwrap();
        let found = ctx.resolve(&target).await.unwrap();
        assert_eq!(found.matched_candidate_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hover_then_open_submenu() {
        let (doc, ctx) = fixtures::home_context();
        let header = Header::new(ctx).unwrap();
        header.hover_menu(MainMenu::Products).await.unwrap();
        assert!(doc.was_called("hover:menu-products"));

        let destination =
            ReadinessSet::any_of([ReadinessCondition::url_matches("/p/d/b5005010001/").unwrap()]);
        let outcome = header.open_submenu("Classic III", &destination).await.unwrap();
        assert_eq!(outcome.mode, NavigationMode::SimulateClick);
        assert!(doc.was_called("click:submenu-classic"));
        assert_eq!(doc.current_url().await.unwrap(), fixtures::CLASSIC_PDP);
    }
}
