//! Product listing and the HTML configurator.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use cobbler_core::{Combination, PageRequest};

use crate::db::CatalogRepository;
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::CspNonce;
use crate::models::ProductSummary;
use crate::services::ConfiguratorView;
use crate::state::AppState;

/// Products per listing page.
pub const PRODUCTS_PER_PAGE: u32 = 24;

#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u32>,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub nonce: String,
    pub products: Vec<ProductSummary>,
    pub current_page: u32,
    pub total_pages: i64,
    pub previous_page: Option<u32>,
    pub next_page: Option<u32>,
}

/// Configurator page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub nonce: String,
    pub view: ConfiguratorView,
}

/// Read a selection from query pairs such as `?material=1&color=4`.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if a category carries a non-integer.
pub fn selection(pairs: &[(String, String)]) -> Result<Combination> {
    Ok(Combination::from_pairs(
        pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    )?)
}

/// Display the paginated product listing.
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
    nonce: CspNonce,
) -> Result<ProductsIndexTemplate> {
    let request = PageRequest::new(query.page, Some(PRODUCTS_PER_PAGE));
    let page = CatalogRepository::new(state.pool())
        .list_products(request)
        .await?;

    Ok(ProductsIndexTemplate {
        nonce: nonce.0,
        current_page: page.page,
        total_pages: page.total_pages(),
        previous_page: page.has_previous().then(|| page.page - 1),
        next_page: page.has_next().then(|| page.page + 1),
        products: page.items,
    })
}

/// Display the configurator for one product with the selection in the
/// query string.
pub async fn show(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
    nonce: CspNonce,
) -> Result<ProductShowTemplate> {
    let combo = selection(&pairs)?;
    let view = state.configurator().configure(&handle, &combo).await?;

    add_breadcrumb(
        "configurator",
        "Viewed configurator",
        Some(&[("handle", handle.as_str()), ("state", view.state)]),
    );

    Ok(ProductShowTemplate {
        nonce: nonce.0,
        view,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cobbler_core::OptionCategory;

    use super::*;
    use crate::error::AppError;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_selection_ignores_unrelated_params() {
        let combo = selection(&pairs(&[
            ("material", "2"),
            ("utm_source", "newsletter"),
            ("color", ""),
        ]))
        .unwrap();
        assert_eq!(combo.get(OptionCategory::Material), Some(2));
        assert_eq!(combo.get(OptionCategory::Color), None);
    }

    #[test]
    fn test_selection_rejects_garbage() {
        let err = selection(&pairs(&[("size", "nine")])).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
