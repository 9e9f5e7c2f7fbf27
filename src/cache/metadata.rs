//! Cacheability metadata and its merge semantics.
//!
//! Every renderable unit carries tags, contexts and a max-age. Bubbling
//! folds child metadata into the parent with [`CacheMetadata::merge`],
//! which is commutative, associative and idempotent so the outcome never
//! depends on traversal order or on a subtree being merged twice.

use std::collections::BTreeSet;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// How long a rendered unit may be served from cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaxAge {
    /// Cacheable until a tag invalidates it.
    #[default]
    Permanent,
    /// Cacheable for this many seconds; zero means never cacheable.
    Finite(u32),
}

impl MaxAge {
    /// The stricter of two bounds: any finite value absorbs
    /// `Permanent`, and zero is sticky once introduced.
    pub fn merge(self, other: MaxAge) -> MaxAge {
        match (self, other) {
            (MaxAge::Permanent, other) => other,
            (this, MaxAge::Permanent) => this,
            (MaxAge::Finite(a), MaxAge::Finite(b)) => MaxAge::Finite(a.min(b)),
        }
    }

    pub fn is_uncacheable(self) -> bool {
        self == MaxAge::Finite(0)
    }
}

// Wire format: the string "permanent" or a plain number of seconds.
impl Serialize for MaxAge {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            MaxAge::Permanent => serializer.serialize_str("permanent"),
            MaxAge::Finite(seconds) => serializer.serialize_u32(*seconds),
        }
    }
}

impl<'de> Deserialize<'de> for MaxAge {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MaxAgeVisitor;

        impl Visitor<'_> for MaxAgeVisitor {
            type Value = MaxAge;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("\"permanent\" or a non-negative number of seconds")
            }

            fn visit_str<E>(self, value: &str) -> Result<MaxAge, E>
            where
                E: de::Error,
            {
                if value == "permanent" {
                    Ok(MaxAge::Permanent)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(value), &self))
                }
            }

            fn visit_u64<E>(self, value: u64) -> Result<MaxAge, E>
            where
                E: de::Error,
            {
                u32::try_from(value)
                    .map(MaxAge::Finite)
                    .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(value), &self))
            }

            fn visit_i64<E>(self, value: i64) -> Result<MaxAge, E>
            where
                E: de::Error,
            {
                u32::try_from(value)
                    .map(MaxAge::Finite)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(value), &self))
            }
        }

        deserializer.deserialize_any(MaxAgeVisitor)
    }
}

/// Tags, contexts and max-age attached to a renderable unit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// Invalidation tags; union on merge.
    pub tags: BTreeSet<String>,
    /// Context tokens whose value must vary the cache key; union on merge.
    pub contexts: BTreeSet<String>,
    /// Upper bound on cache lifetime; minimum on merge.
    pub max_age: MaxAge,
}

impl CacheMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_contexts(mut self, contexts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.contexts.extend(contexts.into_iter().map(Into::into));
        self
    }

    pub fn with_max_age(mut self, max_age: MaxAge) -> Self {
        self.max_age = max_age;
        self
    }

    /// Pure merge of two metadata values.
    pub fn merge(a: &CacheMetadata, b: &CacheMetadata) -> CacheMetadata {
        let mut merged = a.clone();
        merged.merge_in(b);
        merged
    }

    /// Fold `other` into `self`.
    pub fn merge_in(&mut self, other: &CacheMetadata) {
        self.tags.extend(other.tags.iter().cloned());
        self.contexts.extend(other.contexts.iter().cloned());
        self.max_age = self.max_age.merge(other.max_age);
    }

    pub fn is_cacheable(&self) -> bool {
        !self.max_age.is_uncacheable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tags: &[&str], contexts: &[&str], max_age: MaxAge) -> CacheMetadata {
        CacheMetadata::new()
            .with_tags(tags.iter().copied())
            .with_contexts(contexts.iter().copied())
            .with_max_age(max_age)
    }

    #[test]
    fn merge_is_commutative() {
        let a = sample(&["post:1"], &["user.roles"], MaxAge::Finite(300));
        let b = sample(&["user:2"], &["user.permissions"], MaxAge::Permanent);
        assert_eq!(CacheMetadata::merge(&a, &b), CacheMetadata::merge(&b, &a));
    }

    #[test]
    fn merge_is_associative() {
        let a = sample(&["a"], &[], MaxAge::Finite(60));
        let b = sample(&["b"], &["user"], MaxAge::Permanent);
        let c = sample(&["c"], &["user.roles"], MaxAge::Finite(30));

        let left = CacheMetadata::merge(&CacheMetadata::merge(&a, &b), &c);
        let right = CacheMetadata::merge(&a, &CacheMetadata::merge(&b, &c));
        assert_eq!(left, right);
    }

    #[test]
    fn merge_is_idempotent() {
        let a = sample(&["post:1", "user:2"], &["user.permissions"], MaxAge::Finite(120));
        assert_eq!(CacheMetadata::merge(&a, &a), a);
    }

    #[test]
    fn permanent_is_the_merge_identity() {
        assert_eq!(
            MaxAge::Permanent.merge(MaxAge::Finite(45)),
            MaxAge::Finite(45)
        );
        assert_eq!(MaxAge::Permanent.merge(MaxAge::Permanent), MaxAge::Permanent);
    }

    #[test]
    fn zero_max_age_is_sticky() {
        let poisoned = MaxAge::Finite(0)
            .merge(MaxAge::Permanent)
            .merge(MaxAge::Finite(3600));
        assert!(poisoned.is_uncacheable());
    }

    #[test]
    fn finite_merge_takes_the_minimum() {
        assert_eq!(
            MaxAge::Finite(300).merge(MaxAge::Finite(60)),
            MaxAge::Finite(60)
        );
    }

    #[test]
    fn max_age_serializes_to_the_wire_format() {
        assert_eq!(
            serde_json::to_string(&MaxAge::Permanent).unwrap(),
            "\"permanent\""
        );
        assert_eq!(serde_json::to_string(&MaxAge::Finite(300)).unwrap(), "300");
    }

    #[test]
    fn max_age_deserializes_from_the_wire_format() {
        assert_eq!(
            serde_json::from_str::<MaxAge>("\"permanent\"").unwrap(),
            MaxAge::Permanent
        );
        assert_eq!(
            serde_json::from_str::<MaxAge>("0").unwrap(),
            MaxAge::Finite(0)
        );
        assert!(serde_json::from_str::<MaxAge>("\"forever\"").is_err());
        assert!(serde_json::from_str::<MaxAge>("-5").is_err());
    }
}
