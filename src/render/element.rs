//! Render tree elements.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheMetadata, MaxAge};

/// Reference to a lazy builder registered in the
/// [`BuilderRegistry`](super::BuilderRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LazyBuilderRef {
    pub builder_id: String,
    pub args: Vec<String>,
    /// When true, the subtree is deferred behind a placeholder and its
    /// volatility does not poison the enclosing scope's stored entry.
    pub create_placeholder: bool,
}

/// A renderable unit: own markup, named children, cacheability.
///
/// Declaring cache keys makes the element a cacheable scope; an element
/// without keys renders and bubbles its metadata but is never stored
/// itself.
#[derive(Debug, Clone, Default)]
pub struct Element {
    markup: String,
    children: Vec<(String, Element)>,
    keys: Vec<String>,
    contexts: BTreeSet<String>,
    tags: BTreeSet<String>,
    max_age: MaxAge,
    lazy: Option<LazyBuilderRef>,
}

impl Element {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markup(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            ..Self::default()
        }
    }

    /// An element whose content is produced by a registered lazy
    /// builder. Lazy elements carry no children of their own.
    pub fn lazy(
        builder_id: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            lazy: Some(LazyBuilderRef {
                builder_id: builder_id.into(),
                args: args.into_iter().map(Into::into).collect(),
                create_placeholder: false,
            }),
            ..Self::default()
        }
    }

    /// Defer this lazy element behind a placeholder, resolved only after
    /// the enclosing cacheable scopes have been finalised and stored.
    pub fn deferred(mut self) -> Self {
        if let Some(lazy) = &mut self.lazy {
            lazy.create_placeholder = true;
        }
        self
    }

    pub fn with_keys(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.keys.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn with_contexts(mut self, contexts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.contexts.extend(contexts.into_iter().map(Into::into));
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_max_age(mut self, max_age: MaxAge) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_child(mut self, name: impl Into<String>, child: Element) -> Self {
        debug_assert!(
            self.lazy.is_none(),
            "lazy elements cannot carry children; the builder produces the subtree"
        );
        self.children.push((name.into(), child));
        self
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn contexts(&self) -> &BTreeSet<String> {
        &self.contexts
    }

    pub fn own_markup(&self) -> &str {
        &self.markup
    }

    pub(crate) fn children(&self) -> &[(String, Element)] {
        &self.children
    }

    pub(crate) fn lazy_builder(&self) -> Option<&LazyBuilderRef> {
        self.lazy.as_ref()
    }

    /// The metadata declared on the element itself, before any child
    /// bubbling.
    pub fn declared_metadata(&self) -> CacheMetadata {
        CacheMetadata {
            tags: self.tags.clone(),
            contexts: self.contexts.clone(),
            max_age: self.max_age,
        }
    }
}
