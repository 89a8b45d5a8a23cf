//! Catalog domain models and validated inputs.
//!
//! Request bodies deserialize into the `*Input` types. Their `validate`
//! methods produce the `New*` types the repositories accept, so nothing
//! reaches a query without passing these checks.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cobbler_core::{
    CollectionId, Handle, HandleError, ImageId, OptionCategory, OptionKey, ProductId,
    ProductStatus, VariantId,
};

/// Longest option name accepted.
pub const MAX_OPTION_NAME_LENGTH: usize = 100;

const MAX_TITLE_LENGTH: usize = 255;
const MAX_SKU_LENGTH: usize = 255;
const MAX_SEO_DESCRIPTION_LENGTH: usize = 320;

/// A rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("hex code must look like #RRGGBB (got {0:?})")]
    InvalidHexCode(String),

    #[error("{0} options do not have a hex code")]
    HexCodeNotAllowed(OptionCategory),

    #[error("{0} cannot be negative")]
    Negative(&'static str),

    #[error("invalid handle: {0}")]
    InvalidHandle(#[from] HandleError),
}

// =============================================================================
// Options
// =============================================================================

/// One value of an option category, e.g. the color "Oxblood".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionValue {
    pub id: i32,
    pub category: OptionCategory,
    pub name: String,
    pub description: Option<String>,
    pub hex_code: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating or replacing an option value.
#[derive(Debug, Clone, Deserialize)]
pub struct OptionInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub hex_code: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

/// A validated option value ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOption {
    pub name: String,
    pub description: Option<String>,
    pub hex_code: Option<String>,
    pub sort_order: i32,
}

impl OptionInput {
    /// Validate against the rules of `category`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an empty or overlong name, a
    /// malformed hex code, or a hex code on a category other than color.
    pub fn validate(self, category: OptionCategory) -> Result<NewOption, ValidationError> {
        let name = validate_name(&self.name)?;

        let hex_code = match non_empty(self.hex_code) {
            Some(_) if !category.has_hex_code() => {
                return Err(ValidationError::HexCodeNotAllowed(category));
            }
            Some(hex) => Some(normalize_hex_code(&hex)?),
            None => None,
        };

        Ok(NewOption {
            name,
            description: non_empty(self.description),
            hex_code,
            sort_order: self.sort_order,
        })
    }
}

/// Trim and bound an option name.
///
/// # Errors
///
/// Returns [`ValidationError::Required`] or [`ValidationError::TooLong`].
pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::Required("name"));
    }
    if name.chars().count() > MAX_OPTION_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "name",
            max: MAX_OPTION_NAME_LENGTH,
        });
    }
    Ok(name.to_owned())
}

/// Normalize `#rrggbb` to `#RRGGBB`.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidHexCode`] for anything else.
pub fn normalize_hex_code(hex: &str) -> Result<String, ValidationError> {
    let trimmed = hex.trim();
    let valid = trimmed.len() == 7
        && trimmed.starts_with('#')
        && trimmed.chars().skip(1).all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(ValidationError::InvalidHexCode(hex.to_owned()));
    }
    Ok(trimmed.to_ascii_uppercase())
}

// =============================================================================
// Products
// =============================================================================

/// A catalog product.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    /// Shopify GID, `None` for products created locally.
    pub shopify_id: Option<String>,
    pub handle: Handle,
    pub title: String,
    pub description_html: String,
    pub status: ProductStatus,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub synced_at: Option<DateTime<Utc>>,
}

/// Request body for creating or replacing a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    /// Derived from the title when omitted.
    #[serde(default)]
    pub handle: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description_html: String,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A validated product ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub handle: Handle,
    pub title: String,
    pub description_html: String,
    pub status: ProductStatus,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub tags: Vec<String>,
}

impl ProductInput {
    /// Validate the product and settle its handle.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for a missing title or a bad handle.
    pub fn validate(self) -> Result<NewProduct, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::Required("title"));
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(ValidationError::TooLong {
                field: "title",
                max: MAX_TITLE_LENGTH,
            });
        }

        let handle = match non_empty(self.handle) {
            Some(handle) => Handle::parse(&handle)?,
            None => Handle::from_title(title).ok_or(ValidationError::Required("handle"))?,
        };

        let mut tags: Vec<String> = self
            .tags
            .into_iter()
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .collect();
        tags.sort();
        tags.dedup();

        Ok(NewProduct {
            handle,
            title: title.to_owned(),
            description_html: self.description_html,
            status: self.status,
            vendor: non_empty(self.vendor),
            product_type: non_empty(self.product_type),
            tags,
        })
    }
}

/// SEO metadata for a product page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSeo {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl ProductSeo {
    /// Trim empty fields to `None` and bound their length.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TooLong`] when a field exceeds its limit.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let title = non_empty(self.title);
        if title
            .as_ref()
            .is_some_and(|t| t.chars().count() > MAX_TITLE_LENGTH)
        {
            return Err(ValidationError::TooLong {
                field: "seo title",
                max: MAX_TITLE_LENGTH,
            });
        }
        let description = non_empty(self.description);
        if description
            .as_ref()
            .is_some_and(|d| d.chars().count() > MAX_SEO_DESCRIPTION_LENGTH)
        {
            return Err(ValidationError::TooLong {
                field: "seo description",
                max: MAX_SEO_DESCRIPTION_LENGTH,
            });
        }
        Ok(Self { title, description })
    }
}

// =============================================================================
// Variants
// =============================================================================

/// A purchasable variant: one value from each option category.
#[derive(Debug, Clone, Serialize)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub shopify_id: Option<String>,
    pub sku: Option<String>,
    pub title: String,
    pub options: OptionKey,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub inventory_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating or replacing a variant.
#[derive(Debug, Clone, Deserialize)]
pub struct VariantInput {
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub options: OptionKey,
    pub price: Decimal,
    #[serde(default)]
    pub compare_at_price: Option<Decimal>,
    #[serde(default)]
    pub inventory_quantity: i32,
}

/// A validated variant ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVariant {
    pub sku: Option<String>,
    pub title: String,
    pub options: OptionKey,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub inventory_quantity: i32,
}

impl VariantInput {
    /// Validate prices and SKU.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Negative`] for negative prices and
    /// [`ValidationError::TooLong`] for an overlong SKU or title.
    pub fn validate(self) -> Result<NewVariant, ValidationError> {
        if self.price.is_sign_negative() && !self.price.is_zero() {
            return Err(ValidationError::Negative("price"));
        }
        if self
            .compare_at_price
            .is_some_and(|p| p.is_sign_negative() && !p.is_zero())
        {
            return Err(ValidationError::Negative("compare_at_price"));
        }

        let sku = non_empty(self.sku);
        if sku.as_ref().is_some_and(|s| s.len() > MAX_SKU_LENGTH) {
            return Err(ValidationError::TooLong {
                field: "sku",
                max: MAX_SKU_LENGTH,
            });
        }
        let title = non_empty(self.title).unwrap_or_default();
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(ValidationError::TooLong {
                field: "title",
                max: MAX_TITLE_LENGTH,
            });
        }

        Ok(NewVariant {
            sku,
            title,
            options: self.options,
            price: self.price,
            compare_at_price: self.compare_at_price,
            inventory_quantity: self.inventory_quantity,
        })
    }
}

// =============================================================================
// Images and collections
// =============================================================================

/// A product image, either synced from Shopify or uploaded to the asset host.
#[derive(Debug, Clone, Serialize)]
pub struct ProductImage {
    pub id: ImageId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub shopify_id: Option<String>,
    pub asset_public_id: Option<String>,
    pub url: String,
    pub alt_text: Option<String>,
    pub position: i32,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// An uploaded image ready to be recorded.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub asset_public_id: String,
    pub url: String,
    pub alt_text: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

/// A product collection synced from Shopify.
#[derive(Debug, Clone, Serialize)]
pub struct Collection {
    pub id: CollectionId,
    pub shopify_id: String,
    pub handle: String,
    pub title: String,
    pub description_html: String,
    pub product_count: i64,
    pub synced_at: DateTime<Utc>,
}

/// A product together with everything shown on its edit page.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub seo: ProductSeo,
    pub images: Vec<ProductImage>,
    pub variants: Vec<Variant>,
}

/// Trim and drop empty optional strings.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn option_input(name: &str, hex: Option<&str>) -> OptionInput {
        OptionInput {
            name: name.to_owned(),
            description: Some("  ".to_owned()),
            hex_code: hex.map(str::to_owned),
            sort_order: 3,
        }
    }

    #[test]
    fn test_option_validation_trims_and_normalizes() {
        let option = option_input("  Oxblood ", Some("#7a1f2b"))
            .validate(OptionCategory::Color)
            .unwrap();
        assert_eq!(option.name, "Oxblood");
        assert_eq!(option.hex_code.as_deref(), Some("#7A1F2B"));
        assert_eq!(option.description, None);
        assert_eq!(option.sort_order, 3);
    }

    #[test]
    fn test_option_validation_rejects_bad_names() {
        assert_eq!(
            option_input(" ", None).validate(OptionCategory::Size),
            Err(ValidationError::Required("name"))
        );
        assert!(matches!(
            option_input(&"x".repeat(101), None).validate(OptionCategory::Size),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_hex_code_rules() {
        assert_eq!(
            option_input("Leather", Some("#000000")).validate(OptionCategory::Material),
            Err(ValidationError::HexCodeNotAllowed(OptionCategory::Material))
        );
        assert!(matches!(
            option_input("Black", Some("000000")).validate(OptionCategory::Color),
            Err(ValidationError::InvalidHexCode(_))
        ));
        assert!(matches!(
            option_input("Black", Some("#00000G")).validate(OptionCategory::Color),
            Err(ValidationError::InvalidHexCode(_))
        ));
        assert!(
            option_input("Natural", Some(""))
                .validate(OptionCategory::Sole)
                .is_ok()
        );
    }

    #[test]
    fn test_product_handle_from_title() {
        let product = ProductInput {
            handle: None,
            title: " Chelsea Boot ".to_owned(),
            description_html: String::new(),
            status: ProductStatus::Active,
            vendor: Some(String::new()),
            product_type: None,
            tags: vec!["boots".into(), " ".into(), "leather".into(), "boots".into()],
        }
        .validate()
        .unwrap();
        assert_eq!(product.handle.as_str(), "chelsea-boot");
        assert_eq!(product.title, "Chelsea Boot");
        assert_eq!(product.vendor, None);
        assert_eq!(product.tags, vec!["boots", "leather"]);
    }

    #[test]
    fn test_product_rejects_bad_handle_and_empty_title() {
        let input = ProductInput {
            handle: Some("Chelsea Boot".to_owned()),
            title: "Chelsea Boot".to_owned(),
            description_html: String::new(),
            status: ProductStatus::Draft,
            vendor: None,
            product_type: None,
            tags: vec![],
        };
        assert!(matches!(
            input.clone().validate(),
            Err(ValidationError::InvalidHandle(_))
        ));
        let untitled = ProductInput {
            title: "  ".to_owned(),
            ..input
        };
        assert_eq!(untitled.validate(), Err(ValidationError::Required("title")));
    }

    #[test]
    fn test_variant_rejects_negative_prices() {
        let key = OptionKey::from_fn(|_| 1);
        let input = VariantInput {
            sku: Some(" OX-42 ".to_owned()),
            title: None,
            options: key,
            price: Decimal::new(-1, 0),
            compare_at_price: None,
            inventory_quantity: 0,
        };
        assert_eq!(
            input.clone().validate(),
            Err(ValidationError::Negative("price"))
        );

        let ok = VariantInput {
            price: Decimal::new(18900, 2),
            ..input
        }
        .validate()
        .unwrap();
        assert_eq!(ok.sku.as_deref(), Some("OX-42"));
        assert_eq!(ok.title, "");
    }

    #[test]
    fn test_seo_validation() {
        let seo = ProductSeo {
            title: Some(" ".to_owned()),
            description: Some("Hand-lasted in Northampton".to_owned()),
        }
        .validate()
        .unwrap();
        assert_eq!(seo.title, None);
        assert!(
            ProductSeo {
                title: None,
                description: Some("d".repeat(321)),
            }
            .validate()
            .is_err()
        );
    }
}
