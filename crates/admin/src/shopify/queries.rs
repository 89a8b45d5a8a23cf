//! GraphQL query definitions for the Shopify Admin API.
//!
//! Each query implements [`GraphQLQuery`] by hand: the documents are small
//! and fixed, and the response shapes below only name the fields the
//! catalog sync reads.

use graphql_client::{GraphQLQuery, QueryBody};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Products requested per page.
pub const PRODUCTS_PAGE_SIZE: i64 = 50;
/// Collections requested per page.
pub const COLLECTIONS_PAGE_SIZE: i64 = 50;

/// Variables shared by the cursor-paginated queries.
#[derive(Debug, Clone, Serialize)]
pub struct PageVariables {
    pub first: i64,
    pub after: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Nodes<T> {
    pub nodes: Vec<T>,
}

// =============================================================================
// Products
// =============================================================================

pub struct GetCatalogProducts;

pub mod get_catalog_products {
    use super::{Decimal, Deserialize, Nodes, RawPageInfo};

    pub const OPERATION_NAME: &str = "GetCatalogProducts";

    pub const QUERY: &str = r"
query GetCatalogProducts($first: Int!, $after: String) {
  products(first: $first, after: $after, sortKey: ID) {
    pageInfo { hasNextPage endCursor }
    nodes {
      id
      handle
      title
      descriptionHtml
      status
      vendor
      productType
      tags
      seo { title description }
      images(first: 20) {
        nodes { id url altText width height }
      }
      variants(first: 100) {
        nodes {
          id
          sku
          title
          price
          compareAtPrice
          inventoryQuantity
          selectedOptions { name value }
          image { id }
        }
      }
    }
  }
}
";

    #[derive(Debug, Clone, Deserialize)]
    pub struct ResponseData {
        pub products: ProductConnection,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProductConnection {
        pub page_info: RawPageInfo,
        pub nodes: Vec<Product>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Product {
        pub id: String,
        pub handle: String,
        pub title: String,
        #[serde(default)]
        pub description_html: String,
        pub status: String,
        pub vendor: Option<String>,
        pub product_type: Option<String>,
        #[serde(default)]
        pub tags: Vec<String>,
        pub seo: Option<Seo>,
        pub images: Nodes<Image>,
        pub variants: Nodes<Variant>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct Seo {
        pub title: Option<String>,
        pub description: Option<String>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Image {
        pub id: Option<String>,
        pub url: String,
        pub alt_text: Option<String>,
        pub width: Option<i32>,
        pub height: Option<i32>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variant {
        pub id: String,
        pub sku: Option<String>,
        pub title: String,
        pub price: Decimal,
        pub compare_at_price: Option<Decimal>,
        pub inventory_quantity: Option<i32>,
        pub selected_options: Vec<SelectedOption>,
        pub image: Option<ImageRef>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct SelectedOption {
        pub name: String,
        pub value: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ImageRef {
        pub id: Option<String>,
    }
}

impl GraphQLQuery for GetCatalogProducts {
    type Variables = PageVariables;
    type ResponseData = get_catalog_products::ResponseData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: get_catalog_products::QUERY,
            operation_name: get_catalog_products::OPERATION_NAME,
        }
    }
}

// =============================================================================
// Collections
// =============================================================================

pub struct GetCatalogCollections;

pub mod get_catalog_collections {
    use super::{Deserialize, Nodes, RawPageInfo};

    pub const OPERATION_NAME: &str = "GetCatalogCollections";

    pub const QUERY: &str = r"
query GetCatalogCollections($first: Int!, $after: String) {
  collections(first: $first, after: $after, sortKey: ID) {
    pageInfo { hasNextPage endCursor }
    nodes {
      id
      handle
      title
      descriptionHtml
      products(first: 250) {
        nodes { id }
      }
    }
  }
}
";

    #[derive(Debug, Clone, Deserialize)]
    pub struct ResponseData {
        pub collections: CollectionConnection,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CollectionConnection {
        pub page_info: RawPageInfo,
        pub nodes: Vec<Collection>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Collection {
        pub id: String,
        pub handle: String,
        pub title: String,
        #[serde(default)]
        pub description_html: String,
        pub products: Nodes<ProductRef>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ProductRef {
        pub id: String,
    }
}

impl GraphQLQuery for GetCatalogCollections {
    type Variables = PageVariables;
    type ResponseData = get_catalog_collections::ResponseData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: get_catalog_collections::QUERY,
            operation_name: get_catalog_collections::OPERATION_NAME,
        }
    }
}
