//! Shopify global IDs.

/// Numeric tail of a Shopify GID.
///
/// `gid://shopify/ProductVariant/123` becomes `123`. Anything that is not a
/// GID ending in digits yields `None`, including a bare `123`.
#[must_use]
pub fn numeric_id(gid: &str) -> Option<&str> {
    let rest = gid.trim().strip_prefix("gid://shopify/")?;
    let (_, id) = rest.rsplit_once('/')?;
    let id = id.split('?').next()?;
    (!id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())).then_some(id)
}
