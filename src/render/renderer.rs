//! Render cache protocol.
//!
//! Depth-first walk over an [`Element`] tree. Each unit moves through
//! PENDING → HIT (serve stored payload, bubble stored metadata) or
//! PENDING → MISS → COMPUTING (children render and bubble into the
//! unit's accumulator) → DONE (store if cacheable, bubble to parent).
//! Deferred islands leave a placeholder behind and are resolved only
//! after every enclosing scope has been finalised.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use crate::cache::{
    BackendError, CacheBackend, CacheItem, CacheMetadata, ContextError, ContextRegistry, MaxAge,
    RequestContext, assemble_cache_id,
};
use crate::config::CacheConfig;

use super::builders::{BuilderError, BuilderRegistry};
use super::element::{Element, LazyBuilderRef};

const METRIC_RENDER_HIT: &str = "sigillo_render_cache_hit_total";
const METRIC_RENDER_MISS: &str = "sigillo_render_cache_miss_total";

/// Upper bound on redirect hops while chasing context-augmented keys.
const MAX_REDIRECT_CHASE: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Builder(#[from] BuilderError),
}

/// A deferred island awaiting resolution at the end of the root render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderSpec {
    /// Token embedded in the surrounding markup.
    pub token: String,
    /// The builder that produces the island.
    pub builder: LazyBuilderRef,
    /// Metadata declared on the deferred element itself; merged into the
    /// root result at resolution, never into the stored ancestors.
    pub metadata: CacheMetadata,
}

/// Final result of a root render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub markup: String,
    pub metadata: CacheMetadata,
}

/// Wire format of a stored render entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderEntry {
    /// A rendered payload with its final metadata and deferred islands.
    Payload {
        markup: String,
        metadata: CacheMetadata,
        placeholders: Vec<PlaceholderSpec>,
    },
    /// The unit was stored under a larger context set than it declared;
    /// re-derive the key with these contexts and look again.
    Redirect { contexts: BTreeSet<String> },
}

impl RenderEntry {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}

struct Subtree {
    markup: String,
    metadata: CacheMetadata,
    placeholders: Vec<PlaceholderSpec>,
}

/// Drives the render cache protocol over element trees.
pub struct Renderer {
    backend: Arc<dyn CacheBackend>,
    contexts: ContextRegistry,
    builders: BuilderRegistry,
    config: CacheConfig,
}

impl Renderer {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        contexts: ContextRegistry,
        builders: BuilderRegistry,
        config: CacheConfig,
    ) -> Self {
        Self {
            backend,
            contexts,
            builders,
            config,
        }
    }

    /// Render a tree to markup, resolving deferred islands last so their
    /// volatility lands on the returned metadata without touching the
    /// entries stored for their ancestors.
    pub fn render_root(
        &self,
        element: &Element,
        req: &RequestContext,
    ) -> Result<Rendered, RenderError> {
        let subtree = self.render_element(element, req)?;
        let mut markup = subtree.markup;
        let mut metadata = subtree.metadata;

        let mut pending = subtree.placeholders;
        let mut seen: HashSet<String> = HashSet::new();
        while let Some(spec) = pending.pop() {
            if !seen.insert(spec.token.clone()) {
                continue;
            }
            let builder = self.builders.get(&spec.builder.builder_id)?;
            let built = builder.build(&spec.builder.args);
            let resolved = self.render_element(&built, req)?;
            markup = markup.replace(&placeholder_markup(&spec.token), &resolved.markup);
            metadata.merge_in(&spec.metadata);
            metadata.merge_in(&resolved.metadata);
            pending.extend(resolved.placeholders);
        }

        Ok(Rendered { markup, metadata })
    }

    fn render_element(
        &self,
        element: &Element,
        req: &RequestContext,
    ) -> Result<Subtree, RenderError> {
        if let Some(lazy) = element.lazy_builder()
            && lazy.create_placeholder
        {
            let token = placeholder_token(lazy);
            return Ok(Subtree {
                markup: placeholder_markup(&token),
                metadata: CacheMetadata::new(),
                placeholders: vec![PlaceholderSpec {
                    token,
                    builder: lazy.clone(),
                    metadata: element.declared_metadata(),
                }],
            });
        }

        let cache_enabled = self.config.enable_render_cache && !element.keys().is_empty();

        if cache_enabled {
            if let Some(hit) = self.cache_get(element, req)? {
                counter!(METRIC_RENDER_HIT).increment(1);
                return Ok(hit);
            }
            counter!(METRIC_RENDER_MISS).increment(1);
        }

        let mut markup = element.own_markup().to_string();
        let mut metadata = element.declared_metadata();
        let mut placeholders = Vec::new();

        if let Some(lazy) = element.lazy_builder() {
            // Inline lazy content renders in place and bubbles normally.
            let built = self.builders.get(&lazy.builder_id)?.build(&lazy.args);
            let child = self.render_element(&built, req)?;
            markup.push_str(&child.markup);
            metadata.merge_in(&child.metadata);
            placeholders.extend(child.placeholders);
        }

        for (_name, child) in element.children() {
            let child = self.render_element(child, req)?;
            markup.push_str(&child.markup);
            metadata.merge_in(&child.metadata);
            placeholders.extend(child.placeholders);
        }

        let subtree = Subtree {
            markup,
            metadata,
            placeholders,
        };

        if cache_enabled && subtree.metadata.is_cacheable() {
            self.cache_set(element, req, &subtree)?;
        }

        Ok(subtree)
    }

    /// Look up a stored entry, chasing context redirects.
    fn cache_get(
        &self,
        element: &Element,
        req: &RequestContext,
    ) -> Result<Option<Subtree>, RenderError> {
        let mut contexts = element.contexts().clone();
        for _hop in 0..MAX_REDIRECT_CHASE {
            let key = assemble_cache_id(element.keys(), &contexts, &self.contexts, req)?;
            let Some(item) = self.backend.get(&key) else {
                return Ok(None);
            };
            match RenderEntry::decode(&item.data) {
                Ok(RenderEntry::Payload {
                    markup,
                    metadata,
                    placeholders,
                }) => {
                    return Ok(Some(Subtree {
                        markup,
                        metadata,
                        placeholders,
                    }));
                }
                Ok(RenderEntry::Redirect { contexts: wider }) => {
                    debug!(cache_key = %key, "following render cache redirect");
                    contexts = wider;
                }
                Err(error) => {
                    warn!(%error, cache_key = %key, "discarding undecodable render cache entry");
                    self.backend.delete(&key);
                    return Ok(None);
                }
            }
        }
        Ok(None)
    }

    /// Store a finalised unit, plus a redirect when children widened its
    /// context set beyond the declaration.
    fn cache_set(
        &self,
        element: &Element,
        req: &RequestContext,
        subtree: &Subtree,
    ) -> Result<(), RenderError> {
        let full_key = assemble_cache_id(
            element.keys(),
            &subtree.metadata.contexts,
            &self.contexts,
            req,
        )?;
        let payload = RenderEntry::Payload {
            markup: subtree.markup.clone(),
            metadata: subtree.metadata.clone(),
            placeholders: subtree.placeholders.clone(),
        };
        if let Err(error) = self.store(&full_key, &payload, &subtree.metadata) {
            warn!(%error, cache_key = %full_key, "failed to store render cache entry");
            return Ok(());
        }

        if *element.contexts() != subtree.metadata.contexts {
            let declared_key =
                assemble_cache_id(element.keys(), element.contexts(), &self.contexts, req)?;
            let redirect = RenderEntry::Redirect {
                contexts: subtree.metadata.contexts.clone(),
            };
            if let Err(error) = self.store(&declared_key, &redirect, &subtree.metadata) {
                warn!(%error, cache_key = %declared_key, "failed to store render cache redirect");
            }
        }
        Ok(())
    }

    fn store(
        &self,
        key: &str,
        entry: &RenderEntry,
        metadata: &CacheMetadata,
    ) -> Result<(), BackendError> {
        let data = entry
            .encode()
            .map_err(|error| BackendError::Encoding(error.to_string()))?;
        let mut item = CacheItem::permanent(data).with_tags(metadata.tags.iter().cloned());
        if let MaxAge::Finite(seconds) = metadata.max_age {
            item = item.with_expiry(OffsetDateTime::now_utc() + Duration::seconds(i64::from(seconds)));
        }
        self.backend.set(key, item)
    }
}

fn placeholder_token(builder: &LazyBuilderRef) -> String {
    let mut hasher = Sha256::new();
    hasher.update(builder.builder_id.as_bytes());
    for arg in &builder.args {
        hasher.update([0x1f]);
        hasher.update(arg.as_bytes());
    }
    hex::encode(hasher.finalize())
}

fn placeholder_markup(token: &str) -> String {
    format!("<sigillo-placeholder token=\"{token}\"></sigillo-placeholder>")
}
