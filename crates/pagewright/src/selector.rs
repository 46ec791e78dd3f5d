//! Semantic targets and their ordered selector candidates.
//!
//! A [`SemanticTarget`] names one logical element ("Products menu link",
//! "search input") and lists every concrete way of finding it, best first.
//! The resolver walks that list strictly in order, so the position of a
//! candidate is its confidence rank.
//!
//! ```ignore
//! let products = SemanticTarget::new("Products menu")
//!     .or(SelectorSpec::role("link").named(TextPattern::exact("Products")))
//!     .or(SelectorSpec::text(TextPattern::exact("Products")));
//! ```

use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::result::{PagewrightError, PagewrightResult};

/// Text matching rule for names, text content and attribute values
#[derive(Debug, Clone)]
pub enum TextPattern {
    /// Whole string equality after whitespace normalization (case-sensitive)
    Exact(String),
    /// Case-insensitive substring match
    Substring(String),
    /// Case-insensitive regular expression
    Regex(Regex),
}

impl TextPattern {
    /// Exact match
    #[must_use]
    pub fn exact(text: impl Into<String>) -> Self {
        Self::Exact(text.into())
    }

    /// Case-insensitive substring match
    #[must_use]
    pub fn substring(text: impl Into<String>) -> Self {
        Self::Substring(text.into())
    }

    /// Case-insensitive regular expression
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the pattern does not compile
    pub fn regex(pattern: &str) -> PagewrightResult<Self> {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map(Self::Regex)
            .map_err(|e| PagewrightError::Config {
                message: format!("invalid pattern /{pattern}/: {e}"),
            })
    }

    /// Check a candidate string against this pattern
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Exact(expected) => normalize(text) == normalize(expected),
            Self::Substring(needle) => normalize(text)
                .to_lowercase()
                .contains(&normalize(needle).to_lowercase()),
            Self::Regex(re) => re.is_match(text),
        }
    }

    /// JavaScript predicate `(s) => bool` equivalent to [`TextPattern::matches`]
    #[must_use]
    pub fn to_js_predicate(&self) -> String {
        const NORM: &str = "String(s || '').replace(/\\s+/g, ' ').trim()";
        match self {
            Self::Exact(expected) => {
                format!("(s) => {NORM} === {}", js_string(&normalize(expected)))
            }
            Self::Substring(needle) => format!(
                "(s) => {NORM}.toLowerCase().includes({})",
                js_string(&normalize(needle).to_lowercase())
            ),
            Self::Regex(re) => format!(
                "(s) => new RegExp({}, 'i').test(String(s || ''))",
                js_string(re.as_str())
            ),
        }
    }
}

impl PartialEq for TextPattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Exact(a), Self::Exact(b)) | (Self::Substring(a), Self::Substring(b)) => a == b,
            (Self::Regex(a), Self::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl fmt::Display for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(s) => write!(f, "{s:?}"),
            Self::Substring(s) => write!(f, "*{s:?}*"),
            Self::Regex(re) => write!(f, "/{}/i", re.as_str()),
        }
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// JavaScript string literal for `text`
pub(crate) fn js_string(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

/// How a candidate finds elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorKind {
    /// ARIA role, optionally a heading level; the pattern matches the accessible name
    Role {
        /// Role name (`link`, `button`, `heading`, ...)
        role: String,
        /// Heading level for `heading`
        level: Option<u8>,
    },
    /// Visible text content; the pattern is required
    Text,
    /// Attribute value; without a pattern the attribute only has to be present
    Attribute {
        /// Attribute name
        name: String,
    },
    /// `placeholder` attribute of form controls
    Placeholder,
    /// Structural CSS; the pattern, if any, filters on contained text
    Css(String),
}

/// One concrete way of finding a [`SemanticTarget`]
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorSpec {
    kind: SelectorKind,
    pattern: Option<TextPattern>,
    scope: Option<Box<SelectorSpec>>,
}

impl SelectorSpec {
    fn of(kind: SelectorKind) -> Self {
        Self {
            kind,
            pattern: None,
            scope: None,
        }
    }

    /// Role-based selector (`getByRole`)
    #[must_use]
    pub fn role(role: impl Into<String>) -> Self {
        Self::of(SelectorKind::Role {
            role: role.into(),
            level: None,
        })
    }

    /// Text-based selector (`getByText`)
    #[must_use]
    pub fn text(pattern: TextPattern) -> Self {
        Self::of(SelectorKind::Text).filtered(pattern)
    }

    /// Attribute-based selector
    #[must_use]
    pub fn attribute(name: impl Into<String>) -> Self {
        Self::of(SelectorKind::Attribute { name: name.into() })
    }

    /// Placeholder selector (`getByPlaceholder`)
    #[must_use]
    pub fn placeholder(pattern: TextPattern) -> Self {
        Self::of(SelectorKind::Placeholder).filtered(pattern)
    }

    /// Structural CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::of(SelectorKind::Css(selector.into()))
    }

    /// Accessible name filter for role selectors
    #[must_use]
    pub fn named(self, pattern: TextPattern) -> Self {
        self.filtered(pattern)
    }

    /// Contained-text filter for CSS selectors
    #[must_use]
    pub fn has_text(self, pattern: TextPattern) -> Self {
        self.filtered(pattern)
    }

    /// Value filter for attribute selectors
    #[must_use]
    pub fn valued(self, pattern: TextPattern) -> Self {
        self.filtered(pattern)
    }

    fn filtered(mut self, pattern: TextPattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Heading level (only meaningful for `role("heading")`)
    #[must_use]
    pub fn level(mut self, level: u8) -> Self {
        if let SelectorKind::Role { level: ref mut l, .. } = self.kind {
            *l = Some(level);
        }
        self
    }

    /// Restrict matches to descendants of elements matching `scope`
    #[must_use]
    pub fn within(mut self, scope: SelectorSpec) -> Self {
        self.scope = Some(Box::new(scope));
        self
    }

    /// Selector kind
    #[must_use]
    pub const fn kind(&self) -> &SelectorKind {
        &self.kind
    }

    /// Optional text pattern
    #[must_use]
    pub const fn pattern(&self) -> Option<&TextPattern> {
        self.pattern.as_ref()
    }

    /// Optional containing region
    #[must_use]
    pub fn scope(&self) -> Option<&SelectorSpec> {
        self.scope.as_deref()
    }

    /// The scope chain from the outermost region down to this selector.
    ///
    /// Each link is returned without its own scope so it can be queried
    /// relative to the roots produced by the previous link.
    #[must_use]
    pub fn scope_chain(&self) -> Vec<SelectorSpec> {
        let mut chain = Vec::new();
        let mut cursor = Some(self);
        while let Some(spec) = cursor {
            chain.push(Self {
                kind: spec.kind.clone(),
                pattern: spec.pattern.clone(),
                scope: None,
            });
            cursor = spec.scope();
        }
        chain.reverse();
        chain
    }

    /// CSS that pre-selects elements able to carry `role` (explicit or implicit)
    #[must_use]
    pub fn role_css(role: &str, level: Option<u8>) -> String {
        match (role, level) {
            ("heading", Some(n)) => format!("h{n}, [role=\"heading\"][aria-level=\"{n}\"]"),
            ("heading", None) => "h1, h2, h3, h4, h5, h6, [role=\"heading\"]".to_string(),
            ("link", _) => "a[href], area[href], [role=\"link\"]".to_string(),
            ("button", _) => "button, input[type=\"button\"], input[type=\"submit\"], input[type=\"reset\"], [role=\"button\"]".to_string(),
            ("searchbox", _) => "input[type=\"search\"], [role=\"searchbox\"]".to_string(),
            ("textbox", _) => "input:not([type]), input[type=\"text\"], input[type=\"email\"], textarea, [role=\"textbox\"]".to_string(),
            ("list", _) => "ul, ol, [role=\"list\"]".to_string(),
            ("listitem", _) => "li, [role=\"listitem\"]".to_string(),
            ("navigation", _) => "nav, [role=\"navigation\"]".to_string(),
            ("contentinfo", _) => "footer, [role=\"contentinfo\"]".to_string(),
            ("img", _) => "img[alt], [role=\"img\"]".to_string(),
            (other, _) => format!("[role=\"{other}\"]"),
        }
    }

    /// JavaScript expression yielding an array of matching elements below `root`.
    ///
    /// `root` must be a JavaScript expression evaluating to an element or `document`.
    #[must_use]
    pub fn to_query(&self, root: &str) -> String {
        const ACC_NAME: &str = "(el.getAttribute('aria-label') || el.innerText || el.textContent || el.getAttribute('title') || el.value || '')";
        let filter = self
            .pattern
            .as_ref()
            .map_or_else(|| "() => true".to_string(), TextPattern::to_js_predicate);
        match &self.kind {
            SelectorKind::Role { role, level } => format!(
                "Array.from({root}.querySelectorAll({css})).filter(el => ({filter})({ACC_NAME}))",
                css = js_string(&Self::role_css(role, *level)),
            ),
            SelectorKind::Text => format!(
                "Array.from({root}.querySelectorAll('body *')).filter(el => ({filter})(el.innerText) && !Array.from(el.children).some(c => ({filter})(c.innerText)))"
            ),
            SelectorKind::Attribute { name } => format!(
                "Array.from({root}.querySelectorAll({css})).filter(el => ({filter})(el.getAttribute({attr})))",
                css = js_string(&format!("[{name}]")),
                attr = js_string(name),
            ),
            SelectorKind::Placeholder => format!(
                "Array.from({root}.querySelectorAll('[placeholder]')).filter(el => ({filter})(el.getAttribute('placeholder')))"
            ),
            SelectorKind::Css(css) => format!(
                "Array.from({root}.querySelectorAll({css})).filter(el => ({filter})(el.innerText || el.textContent))",
                css = js_string(css),
            ),
        }
    }
}

impl fmt::Display for SelectorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scope) = &self.scope {
            write!(f, "{scope} >> ")?;
        }
        match &self.kind {
            SelectorKind::Role { role, level } => {
                write!(f, "role={role}")?;
                if let Some(n) = level {
                    write!(f, "[level={n}]")?;
                }
                if let Some(p) = &self.pattern {
                    write!(f, "[name={p}]")?;
                }
                Ok(())
            }
            SelectorKind::Text => match &self.pattern {
                Some(p) => write!(f, "text={p}"),
                None => write!(f, "text=*"),
            },
            SelectorKind::Attribute { name } => match &self.pattern {
                Some(p) => write!(f, "[{name}={p}]"),
                None => write!(f, "[{name}]"),
            },
            SelectorKind::Placeholder => match &self.pattern {
                Some(p) => write!(f, "placeholder={p}"),
                None => write!(f, "placeholder=*"),
            },
            SelectorKind::Css(css) => {
                write!(f, "css={css}")?;
                if let Some(p) = &self.pattern {
                    write!(f, "[has-text={p}]")?;
                }
                Ok(())
            }
        }
    }
}

/// How many of a winning candidate's matches the caller wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Cardinality {
    /// First visible match in document order (`.first()`)
    #[default]
    First,
    /// Every visible match (collection targets such as product cards)
    All,
    /// Exactly one visible match; more is an `AmbiguousMatch` error
    Unique,
}

/// A named logical element and the ordered ways of finding it
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticTarget {
    name: String,
    candidates: Vec<SelectorSpec>,
    cardinality: Cardinality,
}

impl SemanticTarget {
    /// Create a target with no candidates yet
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            candidates: Vec::new(),
            cardinality: Cardinality::First,
        }
    }

    /// Append a lower-ranked candidate
    #[must_use]
    pub fn or(mut self, candidate: SelectorSpec) -> Self {
        self.candidates.push(candidate);
        self
    }

    /// Mark as a collection target
    #[must_use]
    pub const fn all(mut self) -> Self {
        self.cardinality = Cardinality::All;
        self
    }

    /// Require a unique match
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.cardinality = Cardinality::Unique;
        self
    }

    /// Target name used in logs and errors
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Candidates in priority order
    #[must_use]
    pub fn candidates(&self) -> &[SelectorSpec] {
        &self.candidates
    }

    /// Requested cardinality
    #[must_use]
    pub const fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Human-readable candidate list, in order
    #[must_use]
    pub fn candidate_descriptions(&self) -> Vec<String> {
        self.candidates.iter().map(ToString::to_string).collect()
    }
}
