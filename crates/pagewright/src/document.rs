//! Document - abstract browser-automation collaborator.
//!
//! Every component of the resolution layer talks to the live page through
//! the [`Document`] trait. The trait object is injected into each
//! [`PageContext`](crate::PageContext), so parallel scenarios never share a
//! browsing context.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Document (async trait)                                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────────────────┐     ┌─────────────────────────┐  │
//! │  │  CdpDocument           │     │  MockDocument           │  │
//! │  │  (feature `browser`)   │     │  (in-memory DOM, tests) │  │
//! │  │  chromiumoxide + JS    │     │  deterministic timing   │  │
//! │  └────────────────────────┘     └─────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::readiness::LoadState;
use crate::result::{PagewrightError, PagewrightResult};
use crate::selector::{SelectorKind, SelectorSpec};

/// Bounding box for an element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X position
    pub x: f32,
    /// Y position
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point `(x, y)`
    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether the box has a non-zero area
    #[must_use]
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Opaque reference to a live element.
///
/// Only valid for the document it came from; after a navigation the
/// backend reports it as [`PagewrightError::StaleElement`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Backend-specific identifier
    pub id: String,
    /// Element tag name
    pub tag_name: String,
    /// Element text content at query time
    pub text_content: Option<String>,
    /// Bounding box at query time, if rendered
    pub bounding_box: Option<BoundingBox>,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
            text_content: None,
            bounding_box: None,
        }
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}#{}>", self.tag_name, self.id)
    }
}

/// Visibility and attachment snapshot of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundingState {
    /// Rendered with a non-empty box and not hidden by style
    pub visible: bool,
    /// Still connected to the document
    pub attached: bool,
    /// Not disabled
    pub enabled: bool,
}

impl BoundingState {
    /// Visible, attached and enabled
    #[must_use]
    pub const fn interactable(&self) -> bool {
        self.visible && self.attached && self.enabled
    }
}

/// How a click is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClickMode {
    /// Real pointer click at the element's center; fails if something covers it
    Normal,
    /// Forced event dispatch on the element itself, ignoring overlapping layers
    Dispatch,
}

/// Browser-automation surface consumed by the resolution layer.
///
/// Implementations must be cheap to share behind an `Arc`; the overlay
/// watcher calls into the same document concurrently with the main step.
/// `query` ignores [`SelectorSpec::scope`]; scoping is applied by the
/// resolver through the `within` root.
#[async_trait]
pub trait Document: Send + Sync + fmt::Debug {
    /// Find elements matching `spec`, in document order, below `within` if given
    async fn query(
        &self,
        spec: &SelectorSpec,
        within: Option<&ElementHandle>,
    ) -> PagewrightResult<Vec<ElementHandle>>;

    /// Current visibility/attachment of an element
    async fn state(&self, handle: &ElementHandle) -> PagewrightResult<BoundingState>;

    /// Attribute value, `None` when absent
    async fn attribute(&self, handle: &ElementHandle, name: &str)
        -> PagewrightResult<Option<String>>;

    /// Rendered text of the element and its descendants
    async fn inner_text(&self, handle: &ElementHandle) -> PagewrightResult<String>;

    /// Current value of a form control
    async fn input_value(&self, handle: &ElementHandle) -> PagewrightResult<String>;

    /// Click the element
    async fn click(&self, handle: &ElementHandle, mode: ClickMode) -> PagewrightResult<()>;

    /// Replace the value of a form control
    async fn fill(&self, handle: &ElementHandle, text: &str) -> PagewrightResult<()>;

    /// Press a key with the element focused
    async fn press(&self, handle: &ElementHandle, key: &str) -> PagewrightResult<()>;

    /// Move the pointer over the element
    async fn hover(&self, handle: &ElementHandle) -> PagewrightResult<()>;

    /// Transition the document to `url`
    async fn goto(&self, url: &str) -> PagewrightResult<()>;

    /// Current document address
    async fn current_url(&self) -> PagewrightResult<String>;

    /// Current document title
    async fn title(&self) -> PagewrightResult<String>;

    /// Current load state of the document
    async fn load_state(&self) -> PagewrightResult<LoadState>;
}

// ============================================================================
// MockDocument
// ============================================================================

/// Side effect of an interaction on a [`MockNode`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEffect {
    /// Load another route; `{value}` is replaced by the node's url-encoded value
    Navigate(String),
    /// Hide the listed nodes
    Hide(Vec<String>),
    /// Show the listed nodes
    Show(Vec<String>),
}

/// One node of the in-memory DOM
#[derive(Debug, Clone)]
pub struct MockNode {
    id: String,
    tag: String,
    role: Option<String>,
    name: Option<String>,
    text: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    parent: Option<String>,
    visible: bool,
    enabled: bool,
    appear_after: Option<Duration>,
    covered_by: Option<String>,
    on_click: Option<MockEffect>,
    on_enter: Option<MockEffect>,
}

impl MockNode {
    /// Create a visible node
    #[must_use]
    pub fn new(id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag: tag.into(),
            role: None,
            name: None,
            text: String::new(),
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            parent: None,
            visible: true,
            enabled: true,
            appear_after: None,
            covered_by: None,
            on_click: None,
            on_enter: None,
        }
    }

    /// Explicit ARIA role
    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Accessible name (`aria-label`)
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Own text content
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Add a class
    #[must_use]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set `href`
    #[must_use]
    pub fn href(self, href: impl Into<String>) -> Self {
        self.attr("href", href)
    }

    /// Nest under another node
    #[must_use]
    pub fn child_of(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Start hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Start disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Become visible only after `delay` from page load
    #[must_use]
    pub const fn appears_after(mut self, delay: Duration) -> Self {
        self.appear_after = Some(delay);
        self
    }

    /// Pointer clicks are intercepted while `overlay` is visible
    #[must_use]
    pub fn covered_by(mut self, overlay: impl Into<String>) -> Self {
        self.covered_by = Some(overlay.into());
        self
    }

    /// Effect of a click
    #[must_use]
    pub fn on_click(mut self, effect: MockEffect) -> Self {
        self.on_click = Some(effect);
        self
    }

    /// Effect of pressing Enter
    #[must_use]
    pub fn on_enter(mut self, effect: MockEffect) -> Self {
        self.on_enter = Some(effect);
        self
    }

    fn implicit_role(&self) -> Option<&str> {
        if let Some(role) = &self.role {
            return Some(role);
        }
        match self.tag.as_str() {
            "a" if self.attributes.contains_key("href") => Some("link"),
            "button" => Some("button"),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Some("heading"),
            "nav" => Some("navigation"),
            "footer" => Some("contentinfo"),
            "ul" | "ol" => Some("list"),
            "li" => Some("listitem"),
            "img" => Some("img"),
            "textarea" => Some("textbox"),
            "input" => match self.attributes.get("type").map(String::as_str) {
                Some("search") => Some("searchbox"),
                Some("button" | "submit" | "reset") => Some("button"),
                None | Some("text" | "email") => Some("textbox"),
                _ => None,
            },
            _ => None,
        }
    }

    fn heading_level(&self) -> Option<u8> {
        if let Some(level) = self.attributes.get("aria-level") {
            return level.parse().ok();
        }
        self.tag
            .strip_prefix('h')
            .and_then(|n| n.parse().ok())
            .filter(|n| (1..=6).contains(n))
    }
}

/// A route of the mock site
#[derive(Debug, Clone, Default)]
pub struct MockPage {
    title: String,
    nodes: Vec<MockNode>,
}

impl MockPage {
    /// Create an empty page
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            nodes: Vec::new(),
        }
    }

    /// Append a node (document order is insertion order)
    #[must_use]
    pub fn node(mut self, node: MockNode) -> Self {
        self.nodes.push(node);
        self
    }
}

#[derive(Debug)]
struct LiveNode {
    node: MockNode,
    visible_from: Option<Instant>,
    attached: bool,
    value: String,
}

#[derive(Debug, Default)]
struct MockState {
    url: String,
    title: String,
    generation: u64,
    nodes: Vec<LiveNode>,
    routes: Vec<(String, MockPage)>,
    failing: Vec<String>,
    load_state: LoadState,
    history: Vec<String>,
}

/// In-memory document for unit and scenario tests.
///
/// Timing uses `tokio::time`, so tests running with a paused clock see
/// deterministic appearance of delayed nodes.
#[derive(Debug, Default)]
pub struct MockDocument {
    state: Mutex<MockState>,
}

impl MockDocument {
    /// Create an empty document at `about:blank`
    #[must_use]
    pub fn new() -> Self {
        let doc = Self::default();
        doc.lock().url = "about:blank".to_string();
        doc
    }

    /// Register a route. A key ending in `*` matches by prefix.
    #[must_use]
    pub fn with_route(self, url: impl Into<String>, page: MockPage) -> Self {
        self.lock().routes.push((url.into(), page));
        self
    }

    /// Make navigation to any URL starting with `prefix` fail
    #[must_use]
    pub fn with_failing_route(self, prefix: impl Into<String>) -> Self {
        self.lock().failing.push(prefix.into());
        self
    }

    /// Load `url` as if navigated to, without recording history
    pub fn open(&self, url: &str) {
        let mut state = self.lock();
        load(&mut state, url);
    }

    /// Show a node again (e.g. a reopened banner)
    pub fn show(&self, id: &str) {
        self.set_visible(id, true);
    }

    /// Hide a node
    pub fn hide(&self, id: &str) {
        self.set_visible(id, false);
    }

    /// Enable or disable a node (e.g. a consent button that arms late)
    pub fn set_enabled(&self, id: &str, enabled: bool) {
        let mut state = self.lock();
        if let Some(live) = state.nodes.iter_mut().find(|n| n.node.id == id) {
            live.node.enabled = enabled;
        }
    }

    /// Detach a node from the document
    pub fn detach(&self, id: &str) {
        let mut state = self.lock();
        if let Some(live) = state.nodes.iter_mut().find(|n| n.node.id == id) {
            live.attached = false;
        }
    }

    /// Override the reported load state
    pub fn set_load_state(&self, load_state: LoadState) {
        self.lock().load_state = load_state;
    }

    /// Interaction history (`goto:`, `click:`, `dispatch:`, `fill:`, `press:`, `hover:`)
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    /// Whether any recorded call starts with `prefix`
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.lock().history.iter().any(|c| c.starts_with(prefix))
    }

    /// Number of recorded calls starting with `prefix`
    #[must_use]
    pub fn count_calls(&self, prefix: &str) -> usize {
        self.lock()
            .history
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_visible(&self, id: &str, visible: bool) {
        let mut state = self.lock();
        if let Some(live) = state.nodes.iter_mut().find(|n| n.node.id == id) {
            live.node.visible = visible;
            live.visible_from = None;
        }
    }
}

fn load(state: &mut MockState, url: &str) {
    let page = state
        .routes
        .iter()
        .find(|(key, _)| key == url)
        .or_else(|| {
            state
                .routes
                .iter()
                .filter(|(key, _)| key.ends_with('*') && url.starts_with(key.trim_end_matches('*')))
                .max_by_key(|(key, _)| key.len())
        })
        .map(|(_, page)| page.clone())
        .unwrap_or_default();
    let now = Instant::now();
    state.generation += 1;
    state.url = url.to_string();
    state.title = page.title;
    state.load_state = LoadState::Load;
    state.nodes = page
        .nodes
        .into_iter()
        .map(|node| LiveNode {
            visible_from: node.appear_after.map(|d| now + d),
            attached: true,
            value: node.attributes.get("value").cloned().unwrap_or_default(),
            node,
        })
        .collect();
}

fn handle_id(generation: u64, node_id: &str) -> String {
    format!("{generation}:{node_id}")
}

impl MockState {
    fn index_of(&self, handle: &ElementHandle) -> PagewrightResult<usize> {
        let stale = || PagewrightError::StaleElement {
            handle: handle.id.clone(),
        };
        let (generation, node_id) = handle.id.split_once(':').ok_or_else(stale)?;
        if generation != self.generation.to_string() {
            return Err(stale());
        }
        let index = self
            .nodes
            .iter()
            .position(|n| n.node.id == node_id)
            .ok_or_else(stale)?;
        if self.nodes[index].attached {
            Ok(index)
        } else {
            Err(stale())
        }
    }

    fn parent_index(&self, index: usize) -> Option<usize> {
        let parent = self.nodes[index].node.parent.as_ref()?;
        self.nodes.iter().position(|n| &n.node.id == parent)
    }

    fn is_visible(&self, index: usize) -> bool {
        let now = Instant::now();
        let mut cursor = Some(index);
        while let Some(i) = cursor {
            let live = &self.nodes[i];
            let shown = live.node.visible && live.visible_from.map_or(true, |at| now >= at);
            if !live.attached || !shown {
                return false;
            }
            cursor = self.parent_index(i);
        }
        true
    }

    fn is_descendant(&self, index: usize, ancestor: usize) -> bool {
        let mut cursor = self.parent_index(index);
        while let Some(i) = cursor {
            if i == ancestor {
                return true;
            }
            cursor = self.parent_index(i);
        }
        false
    }

    fn full_text(&self, index: usize) -> String {
        let mut parts = Vec::new();
        if !self.nodes[index].node.text.is_empty() {
            parts.push(self.nodes[index].node.text.clone());
        }
        for (i, live) in self.nodes.iter().enumerate() {
            if live.node.parent.as_deref() == Some(self.nodes[index].node.id.as_str()) {
                let text = self.full_text(i);
                if !text.is_empty() {
                    parts.push(text);
                }
            }
        }
        parts.join(" ")
    }

    fn accessible_name(&self, index: usize) -> String {
        let node = &self.nodes[index].node;
        node.name
            .clone()
            .or_else(|| node.attributes.get("aria-label").cloned())
            .unwrap_or_else(|| self.full_text(index))
    }

    fn matches(&self, index: usize, spec: &SelectorSpec) -> bool {
        let node = &self.nodes[index].node;
        let pattern_ok = |text: &str| spec.pattern().map_or(true, |p| p.matches(text));
        match spec.kind() {
            SelectorKind::Role { role, level } => {
                node.implicit_role() == Some(role.as_str())
                    && level.map_or(true, |l| node.heading_level() == Some(l))
                    && pattern_ok(&self.accessible_name(index))
            }
            SelectorKind::Text => !node.text.is_empty() && pattern_ok(&node.text),
            SelectorKind::Attribute { name } => {
                node.attributes.get(name).is_some_and(|v| pattern_ok(v))
            }
            SelectorKind::Placeholder => node
                .attributes
                .get("placeholder")
                .is_some_and(|v| pattern_ok(v)),
            SelectorKind::Css(css) => {
                css_matches(self, index, css) && pattern_ok(&self.full_text(index))
            }
        }
    }

    fn to_handle(&self, index: usize) -> ElementHandle {
        let live = &self.nodes[index];
        let mut handle = ElementHandle::new(handle_id(self.generation, &live.node.id), &live.node.tag);
        handle.text_content = Some(self.full_text(index));
        if self.is_visible(index) {
            handle.bounding_box = Some(BoundingBox::new(0.0, index as f32 * 20.0, 100.0, 20.0));
        }
        handle
    }

    fn apply(&mut self, index: usize, effect: Option<MockEffect>) {
        match effect {
            Some(MockEffect::Navigate(template)) => {
                let value: String =
                    url::form_urlencoded::byte_serialize(self.nodes[index].value.as_bytes())
                        .collect();
                let url = template.replace("{value}", &value);
                load(self, &url);
            }
            Some(MockEffect::Hide(ids)) => {
                for live in &mut self.nodes {
                    if ids.contains(&live.node.id) {
                        live.node.visible = false;
                    }
                }
            }
            Some(MockEffect::Show(ids)) => {
                for live in &mut self.nodes {
                    if ids.contains(&live.node.id) {
                        live.node.visible = true;
                        live.visible_from = None;
                    }
                }
            }
            None => {}
        }
    }

    fn require_visible(&self, index: usize, handle: &ElementHandle) -> PagewrightResult<()> {
        if !self.is_visible(index) {
            return Err(PagewrightError::NotInteractable {
                handle: handle.id.clone(),
                message: "element is not visible".to_string(),
            });
        }
        if !self.nodes[index].node.enabled {
            return Err(PagewrightError::NotInteractable {
                handle: handle.id.clone(),
                message: "element is disabled".to_string(),
            });
        }
        Ok(())
    }
}

// Subset of CSS: compound selectors (tag, #id, .class, [attr], [attr=v],
// [attr*=v], [attr^=v]), descendant combinator and selector lists.
fn css_matches(state: &MockState, index: usize, css: &str) -> bool {
    css.split(',').any(|complex| {
        let parts = split_outside_brackets(complex.trim());
        complex_matches(state, index, &parts)
    })
}

fn split_outside_brackets(selector: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for ch in selector.chars() {
        match (ch, quote) {
            ('"' | '\'', None) => quote = Some(ch),
            (c, Some(q)) if c == q => quote = None,
            ('[', None) => depth += 1,
            (']', None) => depth = depth.saturating_sub(1),
            _ => {}
        }
        if ch.is_whitespace() && depth == 0 && quote.is_none() {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

fn complex_matches(state: &MockState, index: usize, parts: &[String]) -> bool {
    let Some((last, ancestors)) = parts.split_last() else {
        return false;
    };
    if !compound_matches(&state.nodes[index].node, last) {
        return false;
    }
    let mut remaining = ancestors;
    let mut cursor = state.parent_index(index);
    while let Some((wanted, rest)) = remaining.split_last() {
        loop {
            let Some(i) = cursor else {
                return false;
            };
            cursor = state.parent_index(i);
            if compound_matches(&state.nodes[i].node, wanted) {
                break;
            }
        }
        remaining = rest;
    }
    true
}

fn compound_matches(node: &MockNode, compound: &str) -> bool {
    let mut rest = compound;
    let tag_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '*'))
        .unwrap_or(rest.len());
    let tag = &rest[..tag_len];
    if !tag.is_empty() && tag != "*" && !tag.eq_ignore_ascii_case(&node.tag) {
        return false;
    }
    rest = &rest[tag_len..];
    while let Some(first) = rest.chars().next() {
        match first {
            '.' | '#' => {
                let body = &rest[1..];
                let end = body
                    .find(|c: char| matches!(c, '.' | '#' | '[' | ':'))
                    .unwrap_or(body.len());
                let ident = &body[..end];
                let ok = if first == '.' {
                    node.classes.iter().any(|c| c == ident)
                } else {
                    node.attributes.get("id").map(String::as_str) == Some(ident)
                };
                if !ok {
                    return false;
                }
                rest = &body[end..];
            }
            '[' => {
                let Some(end) = rest.find(']') else {
                    return false;
                };
                if !attribute_matches(node, &rest[1..end]) {
                    return false;
                }
                rest = &rest[end + 1..];
            }
            _ => return false,
        }
    }
    true
}

fn attribute_matches(node: &MockNode, expr: &str) -> bool {
    let value_of = |name: &str| -> Option<String> {
        match name {
            "class" => (!node.classes.is_empty()).then(|| node.classes.join(" ")),
            "role" => node.role.clone().or_else(|| node.attributes.get(name).cloned()),
            _ => node.attributes.get(name).cloned(),
        }
    };
    for op in ["*=", "^=", "$=", "~=", "="] {
        if let Some((name, raw)) = expr.split_once(op) {
            let expected = raw.trim().trim_matches(|c| c == '"' || c == '\'');
            let Some(actual) = value_of(name.trim()) else {
                return false;
            };
            return match op {
                "*=" => actual.contains(expected),
                "^=" => actual.starts_with(expected),
                "$=" => actual.ends_with(expected),
                "~=" => actual.split_whitespace().any(|w| w == expected),
                _ => actual == expected,
            };
        }
    }
    value_of(expr.trim()).is_some()
}

#[async_trait]
impl Document for MockDocument {
    async fn query(
        &self,
        spec: &SelectorSpec,
        within: Option<&ElementHandle>,
    ) -> PagewrightResult<Vec<ElementHandle>> {
        let state = self.lock();
        let root = within.map(|h| state.index_of(h)).transpose()?;
        Ok((0..state.nodes.len())
            .filter(|&i| state.nodes[i].attached)
            .filter(|&i| root.map_or(true, |r| state.is_descendant(i, r)))
            .filter(|&i| state.matches(i, spec))
            .map(|i| state.to_handle(i))
            .collect())
    }

    async fn state(&self, handle: &ElementHandle) -> PagewrightResult<BoundingState> {
        let state = self.lock();
        match state.index_of(handle) {
            Ok(i) => Ok(BoundingState {
                visible: state.is_visible(i),
                attached: true,
                enabled: state.nodes[i].node.enabled,
            }),
            Err(PagewrightError::StaleElement { .. }) => Ok(BoundingState::default()),
            Err(e) => Err(e),
        }
    }

    async fn attribute(
        &self,
        handle: &ElementHandle,
        name: &str,
    ) -> PagewrightResult<Option<String>> {
        let state = self.lock();
        let i = state.index_of(handle)?;
        Ok(state.nodes[i].node.attributes.get(name).cloned())
    }

    async fn inner_text(&self, handle: &ElementHandle) -> PagewrightResult<String> {
        let state = self.lock();
        let i = state.index_of(handle)?;
        Ok(state.full_text(i))
    }

    async fn input_value(&self, handle: &ElementHandle) -> PagewrightResult<String> {
        let state = self.lock();
        let i = state.index_of(handle)?;
        Ok(state.nodes[i].value.clone())
    }

    async fn click(&self, handle: &ElementHandle, mode: ClickMode) -> PagewrightResult<()> {
        let mut state = self.lock();
        let i = state.index_of(handle)?;
        let node_id = state.nodes[i].node.id.clone();
        if mode == ClickMode::Normal {
            state.require_visible(i, handle)?;
            if let Some(overlay) = state.nodes[i].node.covered_by.clone() {
                let covering = state
                    .nodes
                    .iter()
                    .position(|n| n.node.id == overlay)
                    .is_some_and(|o| state.is_visible(o));
                if covering {
                    state.history.push(format!("intercepted:{node_id}"));
                    return Err(PagewrightError::ClickIntercepted {
                        handle: handle.id.clone(),
                        by: overlay,
                    });
                }
            }
            state.history.push(format!("click:{node_id}"));
        } else {
            state.history.push(format!("dispatch:{node_id}"));
        }
        let effect = state.nodes[i].node.on_click.clone();
        state.apply(i, effect);
        Ok(())
    }

    async fn fill(&self, handle: &ElementHandle, text: &str) -> PagewrightResult<()> {
        let mut state = self.lock();
        let i = state.index_of(handle)?;
        state.require_visible(i, handle)?;
        let node_id = state.nodes[i].node.id.clone();
        state.history.push(format!("fill:{node_id}={text}"));
        state.nodes[i].value = text.to_string();
        Ok(())
    }

    async fn press(&self, handle: &ElementHandle, key: &str) -> PagewrightResult<()> {
        let mut state = self.lock();
        let i = state.index_of(handle)?;
        state.require_visible(i, handle)?;
        let node_id = state.nodes[i].node.id.clone();
        state.history.push(format!("press:{node_id}:{key}"));
        if key == "Enter" {
            let effect = state.nodes[i].node.on_enter.clone();
            state.apply(i, effect);
        }
        Ok(())
    }

    async fn hover(&self, handle: &ElementHandle) -> PagewrightResult<()> {
        let mut state = self.lock();
        let i = state.index_of(handle)?;
        state.require_visible(i, handle)?;
        let node_id = state.nodes[i].node.id.clone();
        state.history.push(format!("hover:{node_id}"));
        Ok(())
    }

    async fn goto(&self, url: &str) -> PagewrightResult<()> {
        let mut state = self.lock();
        state.history.push(format!("goto:{url}"));
        if state.failing.iter().any(|prefix| url.starts_with(prefix.as_str())) {
            return Err(PagewrightError::driver(format!(
                "net::ERR_CONNECTION_REFUSED at {url}"
            )));
        }
        load(&mut state, url);
        Ok(())
    }

    async fn current_url(&self) -> PagewrightResult<String> {
        Ok(self.lock().url.clone())
    }

    async fn title(&self) -> PagewrightResult<String> {
        Ok(self.lock().title.clone())
    }

    async fn load_state(&self) -> PagewrightResult<LoadState> {
        Ok(self.lock().load_state)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Wrappers that make a [`MockDocument`] slow or unreliable.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    /// Delegates to a [`MockDocument`] after an optional delay, failing the
    /// first few queries the way a page mid-navigation does
    #[derive(Debug)]
    pub(crate) struct UnsteadyDocument {
        inner: Arc<MockDocument>,
        query_delay: Duration,
        action_delay: Duration,
        failing_queries: AtomicUsize,
    }

    impl UnsteadyDocument {
        pub(crate) fn new(inner: Arc<MockDocument>) -> Self {
            Self {
                inner,
                query_delay: Duration::ZERO,
                action_delay: Duration::ZERO,
                failing_queries: AtomicUsize::new(0),
            }
        }

        /// Every query sleeps `delay` first
        pub(crate) fn slow_queries(mut self, delay: Duration) -> Self {
            self.query_delay = delay;
            self
        }

        /// Every goto and click sleeps `delay` first
        pub(crate) fn slow_actions(mut self, delay: Duration) -> Self {
            self.action_delay = delay;
            self
        }

        /// The next `count` queries and URL reads fail with a destroyed context
        pub(crate) fn failing_queries(self, count: usize) -> Self {
            self.failing_queries.store(count, Ordering::SeqCst);
            self
        }

        fn context_lost(&self) -> PagewrightResult<()> {
            let armed = self
                .failing_queries
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if armed {
                Err(PagewrightError::driver("Execution context was destroyed"))
            } else {
                Ok(())
            }
        }

        async fn pause(delay: Duration) {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    #[async_trait]
    impl Document for UnsteadyDocument {
        async fn query(
            &self,
            spec: &SelectorSpec,
            within: Option<&ElementHandle>,
        ) -> PagewrightResult<Vec<ElementHandle>> {
            Self::pause(self.query_delay).await;
            self.context_lost()?;
            self.inner.query(spec, within).await
        }

        async fn state(&self, handle: &ElementHandle) -> PagewrightResult<BoundingState> {
            self.inner.state(handle).await
        }

        async fn attribute(
            &self,
            handle: &ElementHandle,
            name: &str,
        ) -> PagewrightResult<Option<String>> {
            self.inner.attribute(handle, name).await
        }

        async fn inner_text(&self, handle: &ElementHandle) -> PagewrightResult<String> {
            self.inner.inner_text(handle).await
        }

        async fn input_value(&self, handle: &ElementHandle) -> PagewrightResult<String> {
            self.inner.input_value(handle).await
        }

        async fn click(&self, handle: &ElementHandle, mode: ClickMode) -> PagewrightResult<()> {
            Self::pause(self.action_delay).await;
            self.inner.click(handle, mode).await
        }

        async fn fill(&self, handle: &ElementHandle, text: &str) -> PagewrightResult<()> {
            self.inner.fill(handle, text).await
        }

        async fn press(&self, handle: &ElementHandle, key: &str) -> PagewrightResult<()> {
            self.inner.press(handle, key).await
        }

        async fn hover(&self, handle: &ElementHandle) -> PagewrightResult<()> {
            self.inner.hover(handle).await
        }

        async fn goto(&self, url: &str) -> PagewrightResult<()> {
            Self::pause(self.action_delay).await;
            self.inner.goto(url).await
        }

        async fn current_url(&self) -> PagewrightResult<String> {
            self.context_lost()?;
            self.inner.current_url().await
        }

        async fn title(&self) -> PagewrightResult<String> {
            self.inner.title().await
        }

        async fn load_state(&self) -> PagewrightResult<LoadState> {
            self.inner.load_state().await
        }
    }
}
