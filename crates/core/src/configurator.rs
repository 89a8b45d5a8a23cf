//! Variant resolution for the shoe configurator.
//!
//! A product's variants each pin one value per [`OptionCategory`]. A
//! [`Combination`] is what the customer has picked so far, and a
//! [`VariantIndex`] answers two questions about it:
//!
//! - which variant (if any) the complete selection names, and
//! - which values of a category can still lead to a real variant given
//!   the other selections.
//!
//! ```
//! use cobbler_core::{
//!     Combination, OptionCategory, OptionKey, Resolution, VariantId, VariantIndex,
//! };
//!
//! let key = OptionKey::from_fn(|category| match category {
//!     OptionCategory::Size => 42,
//!     _ => 1,
//! });
//! let index = VariantIndex::build([(VariantId::new(7), key)]).unwrap();
//!
//! let mut combo = Combination::from_key(&key);
//! assert_eq!(index.resolve(&combo), Resolution::Available(VariantId::new(7)));
//!
//! combo.select(OptionCategory::Size, 43);
//! assert_eq!(index.resolve(&combo), Resolution::Unavailable);
//! ```

use core::fmt;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::de::{self, IgnoredAny};
use serde::{Deserialize, Deserializer, Serialize};

use crate::options::OptionCategory;
use crate::types::{ColorId, MaterialId, PanelId, SizeId, SoleId, StyleId, VariantId};

/// The complete option tuple that identifies a variant within a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OptionKey {
    pub size: SizeId,
    pub style: StyleId,
    pub sole: SoleId,
    pub material: MaterialId,
    pub color: ColorId,
    pub panel: PanelId,
}

impl OptionKey {
    /// Build a key by asking for each category's raw ID.
    pub fn from_fn(mut value: impl FnMut(OptionCategory) -> i32) -> Self {
        Self {
            size: SizeId::new(value(OptionCategory::Size)),
            style: StyleId::new(value(OptionCategory::Style)),
            sole: SoleId::new(value(OptionCategory::Sole)),
            material: MaterialId::new(value(OptionCategory::Material)),
            color: ColorId::new(value(OptionCategory::Color)),
            panel: PanelId::new(value(OptionCategory::Panel)),
        }
    }

    /// The raw ID this key holds for `category`.
    #[must_use]
    pub const fn get(&self, category: OptionCategory) -> i32 {
        match category {
            OptionCategory::Size => self.size.as_i32(),
            OptionCategory::Style => self.style.as_i32(),
            OptionCategory::Sole => self.sole.as_i32(),
            OptionCategory::Material => self.material.as_i32(),
            OptionCategory::Color => self.color.as_i32(),
            OptionCategory::Panel => self.panel.as_i32(),
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for category in OptionCategory::ALL {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{category}={}", self.get(category))?;
        }
        Ok(())
    }
}

/// Error parsing a [`Combination`] from query parameters.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ComboParseError {
    #[error("invalid value for {category}: {value:?} is not an option id")]
    InvalidValue {
        category: OptionCategory,
        value: String,
    },
}

/// A partial selection, at most one value per category.
///
/// Deserializes from a JSON object with the same rules as
/// [`Combination::from_pairs`]: unknown keys are ignored, `null` or `""`
/// leaves a category unselected, and IDs may be numbers or numeric strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Combination {
    values: BTreeMap<OptionCategory, i32>,
}

/// One value of a JSON selection object.
#[derive(Deserialize)]
#[serde(untagged)]
enum SelectionValue {
    Id(i64),
    Text(String),
    Null,
    Other(IgnoredAny),
}

impl<'de> Deserialize<'de> for Combination {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, SelectionValue>::deserialize(deserializer)?;
        let mut combo = Self::new();
        for (key, value) in raw {
            let Ok(category) = key.parse::<OptionCategory>() else {
                continue;
            };
            let result = match value {
                SelectionValue::Id(id) => i32::try_from(id)
                    .map(|id| combo.select(category, id))
                    .map_err(|_| ComboParseError::InvalidValue {
                        category,
                        value: id.to_string(),
                    }),
                SelectionValue::Text(text) => combo.select_text(category, &text),
                SelectionValue::Null => {
                    combo.clear(category);
                    Ok(())
                }
                SelectionValue::Other(_) => Err(ComboParseError::InvalidValue {
                    category,
                    value: "a non-scalar value".to_owned(),
                }),
            };
            result.map_err(de::Error::custom)?;
        }
        Ok(combo)
    }
}

impl Combination {
    /// An empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A complete selection matching `key`.
    #[must_use]
    pub fn from_key(key: &OptionKey) -> Self {
        let mut combo = Self::new();
        for category in OptionCategory::ALL {
            combo.select(category, key.get(category));
        }
        combo
    }

    /// Parse `category=id` pairs, typically from a query string.
    ///
    /// Keys that are not category names are ignored so unrelated query
    /// parameters pass through. An empty value leaves the category
    /// unselected.
    ///
    /// # Errors
    ///
    /// Returns [`ComboParseError::InvalidValue`] when a category key carries
    /// something other than an integer.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ComboParseError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut combo = Self::new();
        for (key, value) in pairs {
            let Ok(category) = key.as_ref().parse::<OptionCategory>() else {
                continue;
            };
            combo.select_text(category, value.as_ref())?;
        }
        Ok(combo)
    }

    fn select_text(&mut self, category: OptionCategory, value: &str) -> Result<(), ComboParseError> {
        let value = value.trim();
        if value.is_empty() {
            self.clear(category);
            return Ok(());
        }
        let id = value
            .parse::<i32>()
            .map_err(|_| ComboParseError::InvalidValue {
                category,
                value: value.to_owned(),
            })?;
        self.select(category, id);
        Ok(())
    }

    pub fn select(&mut self, category: OptionCategory, id: i32) {
        self.values.insert(category, id);
    }

    pub fn clear(&mut self, category: OptionCategory) {
        self.values.remove(&category);
    }

    #[must_use]
    pub fn get(&self, category: OptionCategory) -> Option<i32> {
        self.values.get(&category).copied()
    }

    /// A copy of this selection with `category` set to `id`.
    #[must_use]
    pub fn with(&self, category: OptionCategory, id: i32) -> Self {
        let mut next = self.clone();
        next.select(category, id);
        next
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        OptionCategory::ALL
            .iter()
            .all(|c| self.values.contains_key(c))
    }

    /// Categories not yet selected, in [`OptionCategory::ALL`] order.
    #[must_use]
    pub fn missing(&self) -> Vec<OptionCategory> {
        OptionCategory::ALL
            .into_iter()
            .filter(|c| !self.values.contains_key(c))
            .collect()
    }

    /// The full key, once every category is selected.
    #[must_use]
    pub fn to_key(&self) -> Option<OptionKey> {
        if !self.is_complete() {
            return None;
        }
        Some(OptionKey::from_fn(|c| self.get(c).unwrap_or_default()))
    }

    /// Render as `material=1&color=4` in [`OptionCategory::ALL`] order.
    #[must_use]
    pub fn to_query(&self) -> String {
        OptionCategory::ALL
            .into_iter()
            .filter_map(|c| self.get(c).map(|id| format!("{c}={id}")))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Outcome of resolving a [`Combination`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The selection names exactly this variant.
    Available(VariantId),
    /// Every category is selected but no variant has this tuple.
    Unavailable,
    /// Some categories are still unselected.
    Incomplete { missing: Vec<OptionCategory> },
}

impl Resolution {
    /// Short state name for templates and JSON.
    #[must_use]
    pub const fn state(&self) -> &'static str {
        match self {
            Self::Available(_) => "available",
            Self::Unavailable => "unavailable",
            Self::Incomplete { .. } => "incomplete",
        }
    }

    #[must_use]
    pub const fn variant_id(&self) -> Option<VariantId> {
        match self {
            Self::Available(id) => Some(*id),
            _ => None,
        }
    }
}

/// Error building a [`VariantIndex`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("variants {first} and {second} share the same options ({key})")]
    DuplicateCombination {
        key: OptionKey,
        first: VariantId,
        second: VariantId,
    },
}

/// Exact-match lookup from option tuples to variants of one product.
#[derive(Debug, Clone, Default)]
pub struct VariantIndex {
    by_key: HashMap<OptionKey, VariantId>,
}

impl VariantIndex {
    /// Index the given variants.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DuplicateCombination`] if two variants carry the
    /// same tuple.
    pub fn build<I>(variants: I) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = (VariantId, OptionKey)>,
    {
        let mut by_key = HashMap::new();
        for (id, key) in variants {
            if let Some(first) = by_key.insert(key, id) {
                return Err(IndexError::DuplicateCombination {
                    key,
                    first,
                    second: id,
                });
            }
        }
        Ok(Self { by_key })
    }

    #[must_use]
    pub fn lookup(&self, key: &OptionKey) -> Option<VariantId> {
        self.by_key.get(key).copied()
    }

    #[must_use]
    pub fn resolve(&self, combo: &Combination) -> Resolution {
        let Some(key) = combo.to_key() else {
            return Resolution::Incomplete {
                missing: combo.missing(),
            };
        };
        self.lookup(&key)
            .map_or(Resolution::Unavailable, Resolution::Available)
    }

    /// Values of `category` that appear in at least one variant agreeing
    /// with every other selected category.
    ///
    /// The current selection for `category` itself is not a constraint, so
    /// switching a value never hides its siblings.
    #[must_use]
    pub fn available_values(&self, combo: &Combination, category: OptionCategory) -> BTreeSet<i32> {
        let constraints: Vec<(OptionCategory, i32)> = OptionCategory::ALL
            .into_iter()
            .filter(|c| *c != category)
            .filter_map(|c| combo.get(c).map(|id| (c, id)))
            .collect();

        self.by_key
            .keys()
            .filter(|key| constraints.iter().all(|(c, id)| key.get(*c) == *id))
            .map(|key| key.get(category))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &OptionKey> {
        self.by_key.keys()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn key(material: i32, color: i32, size: i32) -> OptionKey {
        OptionKey::from_fn(|c| match c {
            OptionCategory::Material => material,
            OptionCategory::Color => color,
            OptionCategory::Size => size,
            _ => 1,
        })
    }

    fn sample_index() -> VariantIndex {
        VariantIndex::build([
            (VariantId::new(1), key(10, 20, 40)),
            (VariantId::new(2), key(10, 21, 40)),
            (VariantId::new(3), key(11, 20, 41)),
        ])
        .unwrap()
    }

    #[test]
    fn test_duplicate_combination_rejected() {
        let err = VariantIndex::build([
            (VariantId::new(1), key(10, 20, 40)),
            (VariantId::new(2), key(10, 20, 40)),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            IndexError::DuplicateCombination {
                key: key(10, 20, 40),
                first: VariantId::new(1),
                second: VariantId::new(2),
            }
        );
    }

    #[test]
    fn test_resolve_exact_match() {
        let index = sample_index();
        let combo = Combination::from_key(&key(10, 21, 40));
        assert_eq!(
            index.resolve(&combo),
            Resolution::Available(VariantId::new(2))
        );
        assert_eq!(index.resolve(&combo).state(), "available");
    }

    #[test]
    fn test_resolve_unavailable() {
        let index = sample_index();
        let combo = Combination::from_key(&key(11, 21, 40));
        assert_eq!(index.resolve(&combo), Resolution::Unavailable);
    }

    #[test]
    fn test_resolve_incomplete_lists_missing_in_order() {
        let index = sample_index();
        let mut combo = Combination::new();
        combo.select(OptionCategory::Color, 20);
        combo.select(OptionCategory::Panel, 1);
        assert_eq!(
            index.resolve(&combo),
            Resolution::Incomplete {
                missing: vec![
                    OptionCategory::Material,
                    OptionCategory::Sole,
                    OptionCategory::Style,
                    OptionCategory::Size,
                ]
            }
        );
    }

    #[test]
    fn test_empty_index_resolves_unavailable() {
        let index = VariantIndex::default();
        assert!(index.is_empty());
        let combo = Combination::from_key(&key(1, 1, 1));
        assert_eq!(index.resolve(&combo), Resolution::Unavailable);
    }

    #[test]
    fn test_unknown_id_is_unavailable_not_an_error() {
        let index = sample_index();
        let combo = Combination::from_key(&key(10, 20, 9999));
        assert_eq!(index.resolve(&combo), Resolution::Unavailable);
    }

    #[test]
    fn test_available_values_ignores_own_selection() {
        let index = sample_index();
        let mut combo = Combination::new();
        combo.select(OptionCategory::Material, 10);
        combo.select(OptionCategory::Color, 21);

        let colors = index.available_values(&combo, OptionCategory::Color);
        assert_eq!(colors, BTreeSet::from([20, 21]));

        let materials = index.available_values(&combo, OptionCategory::Material);
        assert_eq!(materials, BTreeSet::from([10]));

        let sizes = index.available_values(&combo, OptionCategory::Size);
        assert_eq!(sizes, BTreeSet::from([40]));
    }

    #[test]
    fn test_available_values_with_empty_selection() {
        let index = sample_index();
        let sizes = index.available_values(&Combination::new(), OptionCategory::Size);
        assert_eq!(sizes, BTreeSet::from([40, 41]));
    }

    #[test]
    fn test_from_pairs() {
        let combo = Combination::from_pairs([
            ("size", "3"),
            ("color", " 7 "),
            ("utm_source", "mail"),
            ("panel", ""),
        ])
        .unwrap();
        assert_eq!(combo.get(OptionCategory::Size), Some(3));
        assert_eq!(combo.get(OptionCategory::Color), Some(7));
        assert_eq!(combo.get(OptionCategory::Panel), None);
        assert_eq!(combo.to_query(), "color=7&size=3");
    }

    #[test]
    fn test_from_pairs_rejects_non_integer() {
        let err = Combination::from_pairs([("sole", "leather")]).unwrap_err();
        assert_eq!(
            err,
            ComboParseError::InvalidValue {
                category: OptionCategory::Sole,
                value: "leather".to_owned(),
            }
        );
    }

    #[test]
    fn test_to_key_requires_completion() {
        let mut combo = Combination::from_key(&key(1, 2, 3));
        assert!(combo.to_key().is_some());
        combo.clear(OptionCategory::Style);
        assert!(!combo.is_complete());
        assert_eq!(combo.to_key(), None);
        assert_eq!(combo.missing(), vec![OptionCategory::Style]);
    }

    #[test]
    fn test_with_leaves_original_untouched() {
        let combo = Combination::new();
        let next = combo.with(OptionCategory::Sole, 5);
        assert!(combo.is_empty());
        assert_eq!(next.get(OptionCategory::Sole), Some(5));
    }

    #[test]
    fn test_combination_json_shape() {
        let combo = Combination::new().with(OptionCategory::Color, 4);
        assert_eq!(serde_json::to_string(&combo).unwrap(), r#"{"color":4}"#);
    }

    #[test]
    fn test_combination_from_json_matches_query_rules() {
        let combo: Combination = serde_json::from_str(
            r#"{"color": 4, "size": " 42 ", "sole": null, "panel": "", "laces": {"x": 1}, "quantity": 2}"#,
        )
        .unwrap();
        let from_query =
            Combination::from_pairs([("color", "4"), ("size", "42"), ("laces", "waxed")]).unwrap();
        assert_eq!(combo, from_query);
        assert_eq!(combo.get(OptionCategory::Sole), None);
    }

    #[test]
    fn test_combination_from_json_rejects_bad_ids() {
        let err = serde_json::from_str::<Combination>(r#"{"size": "nine"}"#).unwrap_err();
        assert!(err.to_string().contains("nine"));
        assert!(serde_json::from_str::<Combination>(r#"{"size": 4294967296}"#).is_err());
        assert!(serde_json::from_str::<Combination>(r#"{"color": [4]}"#).is_err());
    }
}
