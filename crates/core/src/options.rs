//! The six option categories a shoe is configured along.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One configurable axis of a shoe.
///
/// Every purchasable variant carries exactly one value for each category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionCategory {
    Size,
    Style,
    Sole,
    Material,
    Color,
    Panel,
}

impl OptionCategory {
    /// All categories in the order the configurator asks for them.
    pub const ALL: [Self; 6] = [
        Self::Material,
        Self::Color,
        Self::Sole,
        Self::Style,
        Self::Size,
        Self::Panel,
    ];

    /// Singular lowercase name, also used as the query parameter key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Style => "style",
            Self::Sole => "sole",
            Self::Material => "material",
            Self::Color => "color",
            Self::Panel => "panel",
        }
    }

    /// Plural name used in REST paths (`/api/options/colors`).
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Size => "sizes",
            Self::Style => "styles",
            Self::Sole => "soles",
            Self::Material => "materials",
            Self::Color => "colors",
            Self::Panel => "panels",
        }
    }

    /// Human-readable label for page headings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Size => "Size",
            Self::Style => "Style",
            Self::Sole => "Sole",
            Self::Material => "Material",
            Self::Color => "Color",
            Self::Panel => "Panel",
        }
    }

    /// Fully qualified table holding this category's values.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Size => "catalog.size",
            Self::Style => "catalog.style",
            Self::Sole => "catalog.sole",
            Self::Material => "catalog.material",
            Self::Color => "catalog.color",
            Self::Panel => "catalog.panel",
        }
    }

    /// Foreign key column on `catalog.product_variant`.
    #[must_use]
    pub const fn variant_column(self) -> &'static str {
        match self {
            Self::Size => "size_id",
            Self::Style => "style_id",
            Self::Sole => "sole_id",
            Self::Material => "material_id",
            Self::Color => "color_id",
            Self::Panel => "panel_id",
        }
    }

    /// Only colors carry a swatch hex code.
    #[must_use]
    pub const fn has_hex_code(self) -> bool {
        matches!(self, Self::Color)
    }

    /// Parse the plural REST segment.
    #[must_use]
    pub fn from_plural(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.plural() == s)
    }

    /// Map a Shopify product option name (e.g. `"Colour"`, `"Sizes"`).
    ///
    /// ```
    /// use cobbler_core::OptionCategory;
    ///
    /// assert_eq!(OptionCategory::from_option_name(" Colour "), Some(OptionCategory::Color));
    /// assert_eq!(OptionCategory::from_option_name("SOLES"), Some(OptionCategory::Sole));
    /// assert_eq!(OptionCategory::from_option_name("Title"), None);
    /// ```
    #[must_use]
    pub fn from_option_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "colour" | "colours" => Some(Self::Color),
            other => Self::ALL
                .into_iter()
                .find(|c| c.as_str() == other || c.plural() == other),
        }
    }
}

impl fmt::Display for OptionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown option category: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_display_order() {
        let names: Vec<_> = OptionCategory::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(
            names,
            ["material", "color", "sole", "style", "size", "panel"]
        );
    }

    #[test]
    fn test_plural_roundtrip() {
        for category in OptionCategory::ALL {
            assert_eq!(OptionCategory::from_plural(category.plural()), Some(category));
            assert_eq!(category.as_str().parse(), Ok(category));
        }
        assert_eq!(OptionCategory::from_plural("laces"), None);
        assert_eq!(OptionCategory::from_plural("size"), None);
    }

    #[test]
    fn test_from_option_name() {
        assert_eq!(
            OptionCategory::from_option_name("Size"),
            Some(OptionCategory::Size)
        );
        assert_eq!(
            OptionCategory::from_option_name("panels"),
            Some(OptionCategory::Panel)
        );
        assert_eq!(
            OptionCategory::from_option_name("COLOURS"),
            Some(OptionCategory::Color)
        );
        assert_eq!(OptionCategory::from_option_name(""), None);
        assert_eq!(OptionCategory::from_option_name("Width"), None);
    }

    #[test]
    fn test_only_color_has_hex() {
        let with_hex: Vec<_> = OptionCategory::ALL
            .into_iter()
            .filter(|c| c.has_hex_code())
            .collect();
        assert_eq!(with_hex, [OptionCategory::Color]);
    }
}
