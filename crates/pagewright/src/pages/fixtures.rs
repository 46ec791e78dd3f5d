//! In-memory replica of the storefront for page and scenario tests.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{SuiteConfig, DEFAULT_BASE_URL};
use crate::context::PageContext;
use crate::document::{MockDocument, MockEffect, MockNode, MockPage};

use super::{PRODUCTS_PATH, STETHOSCOPES_PATH};

pub(crate) const ORIGIN: &str = "https://www.littmann.in";
pub(crate) const BASE: &str = DEFAULT_BASE_URL;
pub(crate) const SEARCH: &str = "https://www.littmann.in/3M/en_IN/search/?Ntt=";
pub(crate) const CLASSIC_PDP: &str = "https://www.littmann.in/3M/en_IN/p/d/b5005010001/";
pub(crate) const CARDIOLOGY_PDP: &str = "https://www.littmann.in/3M/en_IN/p/d/b5005010005/";

const MASTER: &str = "3M™ Littmann® Master Cardiology™ Stethoscope, Black Tube, 27 inch, 2161";
const CARDIOLOGY_IV: &str = "3M™ Littmann® Cardiology IV™ Diagnostic Stethoscope, 6152";
const CLASSIC: &str = "3M™ Littmann® Classic III™ Monitoring Stethoscope, 5620";
const LIGHTWEIGHT: &str = "3M™ Littmann® Lightweight II S.E. Stethoscope, 2450";

fn absolute(path: &str) -> String {
    format!("{ORIGIN}{path}")
}

/// Header with search and menus, plus a cookie banner that pops up late
fn chrome(page: MockPage, products_as_link: bool) -> MockPage {
    let mut page = page
        .node(MockNode::new("cookie-banner", "div").class("cookie-banner").appears_after(Duration::from_millis(300)))
        .node(
            MockNode::new("cookie-accept", "button")
                .text("Accept Cookies")
                .child_of("cookie-banner")
                .on_click(MockEffect::Hide(vec!["cookie-banner".to_string()])),
        )
        .node(
            MockNode::new("cookie-reject", "button")
                .text("Reject Non-Essential Cookies")
                .child_of("cookie-banner")
                .on_click(MockEffect::Hide(vec!["cookie-banner".to_string()])),
        )
        .node(MockNode::new("site-header", "header"))
        .node(
            MockNode::new("search", "input")
                .attr("type", "search")
                .attr("placeholder", "Search")
                .name("Search")
                .child_of("site-header")
                .on_enter(MockEffect::Navigate(format!("{SEARCH}{{value}}"))),
        )
        .node(MockNode::new("search-button", "button").name("Search").child_of("site-header"))
        .node(MockNode::new("nav", "nav").child_of("site-header"));

    page = if products_as_link {
        page.node(
            MockNode::new("menu-products", "a")
                .href(PRODUCTS_PATH)
                .text("Products")
                .child_of("nav")
                .covered_by("cookie-banner"),
        )
    } else {
        page.node(
            MockNode::new("menu-products", "span")
                .class("nav-label")
                .text("Products")
                .child_of("nav")
                .covered_by("cookie-banner")
                .on_click(MockEffect::Navigate(absolute(PRODUCTS_PATH))),
        )
    };

    for (id, label, path) in [
        ("menu-innovation", "Our Innovation", "/3M/en_IN/our-innovation/"),
        ("menu-tools", "Tools & Resources", "/3M/en_IN/tools-resources/"),
        ("menu-education", "Education & Training", "/3M/en_IN/education/"),
        ("menu-news", "Latest News", "/3M/en_IN/news/"),
        ("menu-where-to-buy", "Where to Buy", "/3M/en_IN/where-to-buy/"),
    ] {
        page = page.node(
            MockNode::new(id, "a")
                .href(path)
                .text(label)
                .child_of("nav")
                .covered_by("cookie-banner"),
        );
    }
    page.node(
        MockNode::new("submenu-classic", "span")
            .role("menuitem")
            .text("Classic III™ Stethoscopes")
            .child_of("nav")
            .on_click(MockEffect::Navigate(CLASSIC_PDP.to_string())),
    )
}

fn footer(page: MockPage) -> MockPage {
    let mut page = page.node(MockNode::new("site-footer", "footer"));
    for (id, label, path) in [
        ("footer-contact", "Contact Us", "/3M/en_IN/contact-us/"),
        ("footer-where-to-buy", "Where to Buy", "/3M/en_IN/where-to-buy/"),
        ("footer-legal", "Legal Information", "/3M/en_IN/legal/"),
        ("footer-privacy", "Privacy Policy", "/3M/en_IN/privacy/"),
    ] {
        page = page.node(MockNode::new(id, "a").href(path).text(label).child_of("site-footer"));
    }
    page
}

fn home(products_as_link: bool) -> MockPage {
    let page = chrome(MockPage::new("3M™ Littmann® Stethoscopes | 3M India"), products_as_link)
        .node(MockNode::new("hero", "div").class("hero"))
        .node(MockNode::new("hero-title", "h1").text("Trusted by clinicians worldwide").child_of("hero"));
    footer(page)
}

fn results(heading: &str, cards: &[(&str, &str)]) -> MockPage {
    let mut page = chrome(MockPage::new("Search Results | 3M India"), true).node(
        MockNode::new("results-heading", "h1")
            .text(heading)
            .appears_after(Duration::from_millis(800)),
    );
    if cards.is_empty() {
        page = page.node(
            MockNode::new("no-results", "p")
                .class("mds-font_paragraph")
                .text("No products found")
                .appears_after(Duration::from_millis(300)),
        );
    } else {
        page = page.node(
            MockNode::new("results-grid", "div")
                .class("mds-grid")
                .appears_after(Duration::from_millis(300)),
        );
        for (i, (label, url)) in cards.iter().enumerate() {
            let card = format!("card-{i}");
            page = page
                .node(
                    MockNode::new(card.clone(), "a")
                        .class("mds-link")
                        .href(*url)
                        .child_of("results-grid"),
                )
                .node(MockNode::new(format!("card-{i}-label"), "p").text(*label).child_of(card));
        }
    }
    footer(page)
}

fn listing(heading: &str, cards: &[(&str, &str)], all_link: bool) -> MockPage {
    let mut page = chrome(MockPage::new("Littmann Stethoscopes | 3M India"), true)
        .node(MockNode::new("listing-heading", "h1").text(heading))
        .node(MockNode::new("filters", "aside"))
        .node(
            MockNode::new("category-stethoscopes", "a")
                .class("mds-link_secondary")
                .href(STETHOSCOPES_PATH)
                .text("Stethoscopes")
                .child_of("filters"),
        );
    if all_link {
        page = page.node(
            MockNode::new("all-products", "a")
                .href(PRODUCTS_PATH)
                .text("< All")
                .child_of("filters"),
        );
    }
    page = page.node(MockNode::new("grid", "div").role("list").class("grid-layout"));
    for (i, (label, url)) in cards.iter().enumerate() {
        let card = format!("product-{i}");
        page = page
            .node(MockNode::new(card.clone(), "a").class("mds-link").href(*url).child_of("grid"))
            .node(MockNode::new(format!("product-{i}-image"), "img").attr("alt", *label).child_of(card.clone()))
            .node(MockNode::new(format!("product-{i}-title"), "p").text(*label).child_of(card));
    }
    footer(page)
}

fn detail(title: &str, country_breadcrumb: bool) -> MockPage {
    let mut page = chrome(MockPage::new(format!("{title} | 3M India")), true)
        .node(MockNode::new("breadcrumb", "nav").attr("aria-label", "Breadcrumb"));
    if country_breadcrumb {
        page = page.node(
            MockNode::new("crumb-india", "a")
                .href("/3M/en_IN/company-in/")
                .text("India")
                .child_of("breadcrumb"),
        );
    }
    page = page
        .node(MockNode::new("crumb-products", "a").href(PRODUCTS_PATH).text("Products").child_of("breadcrumb"))
        .node(MockNode::new("product-title", "h1").text(title))
        .node(MockNode::new("specs", "section").attr("id", "specifications").text("Specifications"))
        .node(
            MockNode::new("pdp-where-to-buy", "a")
                .href("/3M/en_IN/where-to-buy/")
                .text("Where to Buy"),
        );
    footer(page)
}

fn routes(doc: MockDocument, products_as_link: bool) -> MockDocument {
    let master = (MASTER, "/3M/en_IN/p/d/b5005010005/");
    let cardiology_iv = (CARDIOLOGY_IV, "/3M/en_IN/p/d/b5005010006/");
    let classic = (CLASSIC, "/3M/en_IN/p/d/b5005010001/");
    let lightweight = (LIGHTWEIGHT, "/3M/en_IN/p/d/b5005010002/");
    doc.with_route(BASE, home(products_as_link))
        .with_route(
            format!("{SEARCH}Master+Cardiology"),
            results("Results for \"Master Cardiology\"", &[master, cardiology_iv]),
        )
        .with_route(format!("{SEARCH}Cardiology"), results("Results for \"Cardiology\"", &[master, cardiology_iv]))
        .with_route(format!("{SEARCH}Cardio"), results("Results for \"Cardio\"", &[cardiology_iv, master]))
        .with_route(format!("{SEARCH}2161"), results("Results for \"2161\"", &[master]))
        .with_route(format!("{SEARCH}"), results("All products", &[classic, master]))
        .with_route(format!("{SEARCH}*"), results("0 products", &[]))
        .with_route(
            absolute(PRODUCTS_PATH),
            listing("Littmann Stethoscopes", &[classic, cardiology_iv, lightweight], false),
        )
        .with_route(absolute(STETHOSCOPES_PATH), listing("Stethoscopes", &[classic, cardiology_iv], true))
        .with_route(CLASSIC_PDP, detail("3M™ Littmann® Classic III™ Monitoring Stethoscope", true))
        .with_route(CARDIOLOGY_PDP, detail("3M™ Littmann® Master Cardiology™ Stethoscope", false))
        .with_route(
            absolute("/3M/en_IN/p/d/b5005010006/"),
            detail("3M™ Littmann® Cardiology IV™ Diagnostic Stethoscope", true),
        )
        .with_route(
            absolute("/3M/en_IN/where-to-buy/"),
            chrome(MockPage::new("Where to Buy | 3M India"), true)
                .node(MockNode::new("wtb-heading", "h1").text("Where to Buy Littmann Stethoscopes")),
        )
        .with_route(
            absolute("/3M/en_IN/contact-us/"),
            chrome(MockPage::new("Contact Us | 3M India"), true)
                .node(MockNode::new("cs-heading", "h2").text("Customer Service"))
                .node(MockNode::new("show-form", "button").text("Show Form")),
        )
        .with_route(
            absolute("/3M/en_IN/why-choose/"),
            chrome(MockPage::new("Why Choose Littmann | 3M India"), true)
                .node(MockNode::new("why-heading", "h1").text("Why Choose Littmann?")),
        )
}

/// Whole site, Products menu as a real link
pub(crate) fn site() -> MockDocument {
    routes(MockDocument::new(), true)
}

/// Whole site, Products menu rendered as plain text with a click handler
pub(crate) fn text_menu_site() -> MockDocument {
    routes(MockDocument::new(), false)
}

pub(crate) fn context_for(doc: MockDocument) -> (Arc<MockDocument>, Arc<PageContext>) {
    let doc = Arc::new(doc);
    let ctx = PageContext::new(doc.clone(), SuiteConfig::default()).unwrap();
    (doc, Arc::new(ctx))
}

pub(crate) fn site_context() -> (Arc<MockDocument>, Arc<PageContext>) {
    context_for(site())
}

pub(crate) fn home_context() -> (Arc<MockDocument>, Arc<PageContext>) {
    let (doc, ctx) = site_context();
    doc.open(BASE);
    (doc, ctx)
}

pub(crate) fn search_context(encoded_query: &str) -> (Arc<MockDocument>, Arc<PageContext>) {
    let (doc, ctx) = site_context();
    doc.open(&format!("{SEARCH}{encoded_query}"));
    (doc, ctx)
}
