//! Page objects for the Littmann India storefront.
//!
//! Each page object owns its semantic targets and readiness signals and
//! exposes only business-level operations.

mod footer;
mod header;
mod home;
mod info;
mod product_detail;
mod product_listing;
mod search_results;

#[cfg(test)]
pub(crate) mod fixtures;

pub use footer::{Footer, FooterLink};
pub use header::{Header, MainMenu};
pub use home::HomePage;
pub use info::{ContactUsPage, WhereToBuyPage, WhyChoosePage};
pub use product_detail::ProductDetailPage;
pub use product_listing::{CardDetails, ProductListingPage};
pub use search_results::SearchResultsPage;

use crate::context::PageContext;
use crate::resolver::ResolvedElement;
use crate::result::PagewrightResult;
use crate::selector::{SelectorSpec, SemanticTarget, TextPattern};

/// All-products listing, relative to the site origin
pub const PRODUCTS_PATH: &str = "/3M/en_IN/p/";

/// Stethoscopes category listing
pub const STETHOSCOPES_PATH: &str = "/3M/en_IN/p/pc/stethoscopes/";

/// Case-insensitive pattern matching `text` literally
pub(crate) fn literal(text: &str) -> PagewrightResult<TextPattern> {
    TextPattern::regex(&regex::escape(text))
}

/// Link target found by accessible name, falling back to any link-like text
pub(crate) fn link_named(name: &str, pattern: &str) -> PagewrightResult<SemanticTarget> {
    Ok(SemanticTarget::new(name)
        .or(SelectorSpec::role("link").named(TextPattern::regex(pattern)?))
        .or(SelectorSpec::role("menuitem").named(TextPattern::regex(pattern)?)))
}

/// Text of the first `<p>` inside `card`, else the card's own text
pub(crate) async fn card_label(ctx: &PageContext, card: &ResolvedElement) -> PagewrightResult<String> {
    let document = ctx.document();
    let paragraphs = document.query(&SelectorSpec::css("p"), Some(&card.handle)).await?;
    match paragraphs.first() {
        Some(p) => Ok(document.inner_text(p).await?.trim().to_string()),
        None => ctx.text_of(card).await,
    }
}
