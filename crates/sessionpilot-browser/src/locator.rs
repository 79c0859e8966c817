//! Locator strategies and element targets.
//!
//! A [`Locator`] describes how to find a set of elements; a [`Target`] picks
//! one element out of that set, optionally inside another target. Both
//! compile to JavaScript expressions evaluated in the page, so the page
//! driver only ever ships strings over the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Locator {
    /// Plain CSS selector.
    Css { selector: String },
    /// Elements matching `scope` whose trimmed visible text equals or starts
    /// with one of `labels` (case-insensitive).
    Text { scope: String, labels: Vec<String> },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css {
            selector: selector.into(),
        }
    }

    pub fn text(scope: impl Into<String>, labels: &[&str]) -> Self {
        Self::Text {
            scope: scope.into(),
            labels: labels.iter().map(|label| label.to_lowercase()).collect(),
        }
    }

    /// JavaScript expression evaluating to an array of the matched elements
    /// below the JS value named `root`.
    pub fn js_query(&self, root: &str) -> String {
        match self {
            Self::Css { selector } => format!(
                "Array.from({root}.querySelectorAll({selector}))",
                selector = js_string(selector)
            ),
            Self::Text { scope, labels } => format!(
                "Array.from({root}.querySelectorAll({scope})).filter((el) => {{ \
                 const t = (el.innerText || el.textContent || '').trim().toLowerCase(); \
                 return {labels}.some((l) => t === l || t.startsWith(l)); }})",
                scope = js_string(scope),
                labels = js_string_array(labels)
            ),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css { selector } => write!(f, "css={}", selector),
            Self::Text { scope, labels } => write!(f, "text={}~{}", scope, labels.join("|")),
        }
    }
}

/// One element: the `index`-th match of `locator`, searched inside `within`
/// when set, otherwise in the whole document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub locator: Locator,
    pub index: usize,
    pub within: Option<Box<Target>>,
}

impl Target {
    pub fn first(locator: Locator) -> Self {
        Self::nth(locator, 0)
    }

    pub fn nth(locator: Locator, index: usize) -> Self {
        Self {
            locator,
            index,
            within: None,
        }
    }

    pub fn within(mut self, parent: &Target) -> Self {
        self.within = Some(Box::new(parent.clone()));
        self
    }

    /// Like [`Target::within`], leaving the target document-wide for `None`.
    pub fn scoped(self, parent: Option<&Target>) -> Self {
        match parent {
            Some(parent) => self.within(parent),
            None => self,
        }
    }

    /// JavaScript expression evaluating to the element or `null`.
    pub fn js_element(&self) -> String {
        format!(
            "((root) => root ? (({query})[{index}] || null) : null)({root})",
            query = self.locator.js_query("root"),
            index = self.index,
            root = js_root(self.within.as_deref()),
        )
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = &self.within {
            write!(f, "{} >> ", parent)?;
        }
        write!(f, "{}[{}]", self.locator, self.index)
    }
}

/// JavaScript expression counting the matches of `locator` inside `within`.
pub fn js_count(locator: &Locator, within: Option<&Target>) -> String {
    format!(
        "((root) => root ? ({query}).length : 0)({root})",
        query = locator.js_query("root"),
        root = js_root(within),
    )
}

fn js_root(within: Option<&Target>) -> String {
    match within {
        Some(parent) => parent.js_element(),
        None => "document".to_string(),
    }
}

/// Quote a Rust string as a JavaScript string literal.
pub fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn js_string_array(values: &[String]) -> String {
    serde_json::Value::from(values.to_vec()).to_string()
}
