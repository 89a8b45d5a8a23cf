//! Conversions from raw GraphQL responses to domain types.

use cobbler_core::ProductStatus;

use super::queries::{RawPageInfo, get_catalog_collections, get_catalog_products};
use super::types::{
    Connection, PageInfo, SelectedOption, ShopifyCollection, ShopifyImage, ShopifyProduct,
    ShopifySeo, ShopifyVariant,
};

/// Map Shopify's `ACTIVE`/`DRAFT`/`ARCHIVED` (and anything newer) to a
/// local status. Unknown states are kept off the storefront.
#[must_use]
pub fn convert_status(status: &str) -> ProductStatus {
    status.parse().unwrap_or(ProductStatus::Draft)
}

fn convert_page_info(info: RawPageInfo) -> PageInfo {
    PageInfo {
        has_next_page: info.has_next_page,
        end_cursor: info.end_cursor,
    }
}

pub fn convert_product_connection(
    connection: get_catalog_products::ProductConnection,
) -> Connection<ShopifyProduct> {
    Connection {
        items: connection.nodes.into_iter().map(convert_product).collect(),
        page_info: convert_page_info(connection.page_info),
    }
}

pub fn convert_product(product: get_catalog_products::Product) -> ShopifyProduct {
    let seo = product.seo.map_or_else(ShopifySeo::default, |s| ShopifySeo {
        title: s.title,
        description: s.description,
    });

    ShopifyProduct {
        status: convert_status(&product.status),
        id: product.id,
        handle: product.handle,
        title: product.title,
        description_html: product.description_html,
        vendor: product.vendor.filter(|v| !v.is_empty()),
        product_type: product.product_type.filter(|t| !t.is_empty()),
        tags: product.tags,
        seo,
        // images without an ID cannot be upserted
        images: product
            .images
            .nodes
            .into_iter()
            .filter_map(|i| {
                Some(ShopifyImage {
                    id: i.id?,
                    url: i.url,
                    alt_text: i.alt_text.filter(|a| !a.is_empty()),
                    width: i.width,
                    height: i.height,
                })
            })
            .collect(),
        variants: product
            .variants
            .nodes
            .into_iter()
            .map(convert_variant)
            .collect(),
    }
}

fn convert_variant(variant: get_catalog_products::Variant) -> ShopifyVariant {
    ShopifyVariant {
        id: variant.id,
        sku: variant.sku.filter(|s| !s.is_empty()),
        title: variant.title,
        price: variant.price,
        compare_at_price: variant.compare_at_price,
        inventory_quantity: variant.inventory_quantity.unwrap_or(0),
        selected_options: variant
            .selected_options
            .into_iter()
            .map(|o| SelectedOption {
                name: o.name,
                value: o.value,
            })
            .collect(),
        image_id: variant.image.and_then(|i| i.id),
    }
}

pub fn convert_collection_connection(
    connection: get_catalog_collections::CollectionConnection,
) -> Connection<ShopifyCollection> {
    Connection {
        items: connection
            .nodes
            .into_iter()
            .map(|c| ShopifyCollection {
                id: c.id,
                handle: c.handle,
                title: c.title,
                description_html: c.description_html,
                product_ids: c.products.nodes.into_iter().map(|p| p.id).collect(),
            })
            .collect(),
        page_info: convert_page_info(connection.page_info),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    const PRODUCTS_PAGE: &str = r##"{
        "products": {
            "pageInfo": { "hasNextPage": true, "endCursor": "eyJsYXN0X2lkIjo3fQ" },
            "nodes": [{
                "id": "gid://shopify/Product/7",
                "handle": "chelsea-boot",
                "title": "Chelsea Boot",
                "descriptionHtml": "<p>Hand-lasted</p>",
                "status": "ACTIVE",
                "vendor": "",
                "productType": "Boots",
                "tags": ["boots"],
                "seo": { "title": null, "description": "Made to order" },
                "images": { "nodes": [
                    { "id": "gid://shopify/ProductImage/1", "url": "https://cdn.shopify.com/a.jpg",
                      "altText": "", "width": 800, "height": 600 },
                    { "id": null, "url": "https://cdn.shopify.com/b.jpg",
                      "altText": null, "width": null, "height": null }
                ] },
                "variants": { "nodes": [{
                    "id": "gid://shopify/ProductVariant/70",
                    "sku": "",
                    "title": "42 / Oxblood",
                    "price": "189.00",
                    "compareAtPrice": null,
                    "inventoryQuantity": null,
                    "selectedOptions": [
                        { "name": "Size", "value": "42" },
                        { "name": "Color", "value": "Oxblood" }
                    ],
                    "image": { "id": "gid://shopify/ProductImage/1" }
                }] }
            }]
        }
    }"##;

    #[test]
    fn test_convert_status() {
        assert_eq!(convert_status("ACTIVE"), ProductStatus::Active);
        assert_eq!(convert_status("ARCHIVED"), ProductStatus::Archived);
        assert_eq!(convert_status("DRAFT"), ProductStatus::Draft);
        assert_eq!(convert_status("UNLISTED"), ProductStatus::Draft);
    }

    #[test]
    fn test_convert_product_page() {
        let data: get_catalog_products::ResponseData =
            serde_json::from_str(PRODUCTS_PAGE).unwrap();
        let page = convert_product_connection(data.products);

        assert_eq!(page.page_info.next_cursor(), Some("eyJsYXN0X2lkIjo3fQ"));
        let product = &page.items[0];
        assert_eq!(product.status, ProductStatus::Active);
        assert_eq!(product.vendor, None);
        assert_eq!(product.seo.description.as_deref(), Some("Made to order"));
        assert_eq!(product.images.len(), 1);
        assert_eq!(product.images[0].alt_text, None);

        let variant = &product.variants[0];
        assert_eq!(variant.price, Decimal::new(18900, 2));
        assert_eq!(variant.sku, None);
        assert_eq!(variant.inventory_quantity, 0);
        assert_eq!(variant.selected_options[1], SelectedOption::new("Color", "Oxblood"));
        assert_eq!(
            variant.image_id.as_deref(),
            Some("gid://shopify/ProductImage/1")
        );
    }

    #[test]
    fn test_convert_collection_page() {
        let json = r#"{
            "collections": {
                "pageInfo": { "hasNextPage": false, "endCursor": null },
                "nodes": [{
                    "id": "gid://shopify/Collection/3",
                    "handle": "boots",
                    "title": "Boots",
                    "descriptionHtml": "",
                    "products": { "nodes": [
                        { "id": "gid://shopify/Product/7" },
                        { "id": "gid://shopify/Product/8" }
                    ] }
                }]
            }
        }"#;
        let data: get_catalog_collections::ResponseData = serde_json::from_str(json).unwrap();
        let page = convert_collection_connection(data.collections);
        assert_eq!(page.page_info.next_cursor(), None);
        assert_eq!(
            page.items[0].product_ids,
            vec!["gid://shopify/Product/7", "gid://shopify/Product/8"]
        );
    }
}
