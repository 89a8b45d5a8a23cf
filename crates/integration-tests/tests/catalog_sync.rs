//! Applying Shopify products and collections to the catalog.
//!
//! These run the per-record sync steps against a real database with
//! hand-built Shopify payloads, so no Shopify store is needed.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use cobbler_admin::db::ProductRepository;
use cobbler_admin::models::NewProduct;
use cobbler_admin::services::CatalogSync;
use cobbler_admin::shopify::{
    AdminClient, SelectedOption, ShopifyCollection, ShopifyImage, ShopifyProduct, ShopifySeo,
    ShopifyVariant,
};
use cobbler_core::{Handle, OptionCategory, ProductStatus};
use cobbler_integration_tests::{admin_config, migrated_pool, test_database_url};

/// Unique names and GIDs for one test, so runs never share rows.
struct Run {
    tag: String,
    base: u64,
}

impl Run {
    fn new() -> Self {
        let tag = Uuid::new_v4().simple().to_string();
        let base = u64::from_str_radix(&tag[..10], 16).unwrap() * 100;
        Self { tag, base }
    }

    fn gid(&self, kind: &str, n: u64) -> String {
        format!("gid://shopify/{kind}/{}", self.base + n)
    }

    fn handle(&self) -> String {
        format!("chelsea-{}", self.tag)
    }

    fn variant(&self, n: u64, size: &str, color: &str, image: Option<u64>) -> ShopifyVariant {
        let tag = &self.tag;
        ShopifyVariant {
            id: self.gid("ProductVariant", n),
            sku: Some(format!("CH-{n}")),
            title: format!("{size} / {color}"),
            price: Decimal::new(21900, 2),
            compare_at_price: None,
            inventory_quantity: 4,
            selected_options: vec![
                SelectedOption::new("Size", format!("{size} {tag}")),
                SelectedOption::new("Style", format!("Chelsea {tag}")),
                SelectedOption::new("Sole", format!("Crepe {tag}")),
                SelectedOption::new("Material", format!("Suede {tag}")),
                SelectedOption::new("Color", format!("{color} {tag}")),
                SelectedOption::new("Panel", format!("Elastic {tag}")),
            ],
            image_id: image.map(|i| self.gid("ProductImage", i)),
        }
    }

    fn image(&self, n: u64) -> ShopifyImage {
        ShopifyImage {
            id: self.gid("ProductImage", n),
            url: format!("https://cdn.shopify.com/s/files/1/chelsea-{n}.jpg"),
            alt_text: Some("Chelsea boot".to_owned()),
            width: Some(1200),
            height: Some(900),
        }
    }

    fn product(&self, images: Vec<ShopifyImage>, variants: Vec<ShopifyVariant>) -> ShopifyProduct {
        ShopifyProduct {
            id: self.gid("Product", 1),
            handle: self.handle(),
            title: "Chelsea Boot".to_owned(),
            description_html: "<p>Blake stitched.</p>".to_owned(),
            status: ProductStatus::Active,
            vendor: Some("Cobbler".to_owned()),
            product_type: Some("Boots".to_owned()),
            tags: vec!["boots".to_owned()],
            seo: ShopifySeo {
                title: Some("Chelsea Boot".to_owned()),
                description: None,
            },
            images,
            variants,
        }
    }

    async fn cleanup(&self, pool: &PgPool) {
        sqlx::query("DELETE FROM catalog.collection WHERE shopify_id = $1")
            .bind(self.gid("Collection", 1))
            .execute(pool)
            .await
            .unwrap();
        sqlx::query("DELETE FROM catalog.product WHERE handle = $1")
            .bind(self.handle())
            .execute(pool)
            .await
            .unwrap();
        for category in OptionCategory::ALL {
            sqlx::query(&format!("DELETE FROM {} WHERE name LIKE $1", category.table()))
                .bind(format!("% {}", self.tag))
                .execute(pool)
                .await
                .unwrap();
        }
    }
}

fn catalog_sync(pool: &PgPool) -> CatalogSync {
    let client = AdminClient::new(&admin_config().shopify).unwrap();
    CatalogSync::new(pool.clone(), client)
}

/// `(variant GID, size name, color name)` for the product, by GID.
async fn variant_rows(pool: &PgPool, run: &Run) -> Vec<(String, String, String)> {
    sqlx::query_as(
        r"
        SELECT v.shopify_id, s.name, c.name
        FROM catalog.product_variant v
        JOIN catalog.product p ON p.id = v.product_id
        JOIN catalog.size s ON s.id = v.size_id
        JOIN catalog.color c ON c.id = v.color_id
        WHERE p.handle = $1
        ORDER BY v.shopify_id
        ",
    )
    .bind(run.handle())
    .fetch_all(pool)
    .await
    .unwrap()
}

/// `(image GID, pinned variant GID)` for the product, by position.
async fn image_pins(pool: &PgPool, run: &Run) -> Vec<(String, Option<String>)> {
    sqlx::query_as(
        r"
        SELECT i.shopify_id, v.shopify_id
        FROM catalog.product_image i
        JOIN catalog.product p ON p.id = i.product_id
        LEFT JOIN catalog.product_variant v ON v.id = i.variant_id
        WHERE p.handle = $1
        ORDER BY i.position
        ",
    )
    .bind(run.handle())
    .fetch_all(pool)
    .await
    .unwrap()
}

async fn database() -> Option<PgPool> {
    let url = test_database_url()?;
    Some(migrated_pool(&url).await)
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_applying_a_product_twice_changes_nothing() {
    let Some(pool) = database().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let run = Run::new();
    let sync = catalog_sync(&pool);

    let mut default_title = run.variant(9, "41", "Black", None);
    default_title.selected_options = vec![SelectedOption::new("Title", "Default Title")];
    let product = run.product(
        vec![run.image(1), run.image(2)],
        vec![
            run.variant(1, "42", "Black", Some(1)),
            run.variant(2, "43", "Black", Some(2)),
            default_title,
        ],
    );

    let first = sync.apply_product(&product).await.unwrap();
    let rows = variant_rows(&pool, &run).await;
    let pins = image_pins(&pool, &run).await;
    let second = sync.apply_product(&product).await.unwrap();

    assert_eq!(first.variants, 2);
    assert_eq!(first.images, 2);
    assert_eq!(first.skipped_variants, 1);
    assert_eq!(first, second);
    assert_eq!(variant_rows(&pool, &run).await, rows);
    assert_eq!(image_pins(&pool, &run).await, pins);
    assert_eq!(rows.len(), 2);

    let handle = Handle::parse(&run.handle()).unwrap();
    let stored = ProductRepository::new(&pool)
        .get_by_handle(&handle)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.shopify_id.as_deref(), Some(run.gid("Product", 1).as_str()));
    assert!(stored.synced_at.is_some());

    run.cleanup(&pool).await;
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_variants_can_swap_option_tuples() {
    let Some(pool) = database().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let run = Run::new();
    let sync = catalog_sync(&pool);

    let before = run.product(
        vec![],
        vec![
            run.variant(1, "42", "Black", None),
            run.variant(2, "43", "Black", None),
        ],
    );
    sync.apply_product(&before).await.unwrap();

    // Same two variants, sizes exchanged
    let after = run.product(
        vec![],
        vec![
            run.variant(1, "43", "Black", None),
            run.variant(2, "42", "Black", None),
        ],
    );
    let tally = sync.apply_product(&after).await.unwrap();
    assert_eq!(tally.pruned_variants, 0);

    let sizes: Vec<(String, String)> = variant_rows(&pool, &run)
        .await
        .into_iter()
        .map(|(gid, size, _)| (gid, size))
        .collect();
    assert_eq!(
        sizes,
        vec![
            (run.gid("ProductVariant", 1), format!("43 {}", run.tag)),
            (run.gid("ProductVariant", 2), format!("42 {}", run.tag)),
        ]
    );

    run.cleanup(&pool).await;
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_variant_image_moves_with_the_variant() {
    let Some(pool) = database().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let run = Run::new();
    let sync = catalog_sync(&pool);

    let before = run.product(
        vec![run.image(1), run.image(2)],
        vec![
            run.variant(1, "42", "Black", Some(1)),
            run.variant(2, "43", "Black", None),
        ],
    );
    sync.apply_product(&before).await.unwrap();
    assert_eq!(
        image_pins(&pool, &run).await,
        vec![
            (run.gid("ProductImage", 1), Some(run.gid("ProductVariant", 1))),
            (run.gid("ProductImage", 2), None),
        ]
    );

    let after = run.product(
        vec![run.image(1), run.image(2)],
        vec![
            run.variant(1, "42", "Black", Some(2)),
            run.variant(2, "43", "Black", None),
        ],
    );
    sync.apply_product(&after).await.unwrap();
    assert_eq!(
        image_pins(&pool, &run).await,
        vec![
            (run.gid("ProductImage", 1), None),
            (run.gid("ProductImage", 2), Some(run.gid("ProductVariant", 1))),
        ]
    );

    run.cleanup(&pool).await;
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_removed_variants_and_images_are_pruned() {
    let Some(pool) = database().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let run = Run::new();
    let sync = catalog_sync(&pool);

    let before = run.product(
        vec![run.image(1), run.image(2)],
        vec![
            run.variant(1, "42", "Oxblood", Some(1)),
            run.variant(2, "43", "Oxblood", Some(2)),
        ],
    );
    sync.apply_product(&before).await.unwrap();

    let after = run.product(
        vec![run.image(1)],
        vec![run.variant(1, "42", "Oxblood", Some(1))],
    );
    let tally = sync.apply_product(&after).await.unwrap();

    assert_eq!(tally.pruned_variants, 1);
    let rows = variant_rows(&pool, &run).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, run.gid("ProductVariant", 1));
    assert_eq!(
        image_pins(&pool, &run).await,
        vec![(run.gid("ProductImage", 1), Some(run.gid("ProductVariant", 1)))]
    );

    // A replacement variant takes over the freed combination
    let replaced = run.product(
        vec![run.image(1)],
        vec![run.variant(3, "42", "Oxblood", None)],
    );
    let tally = sync.apply_product(&replaced).await.unwrap();
    assert_eq!(tally.pruned_variants, 1);
    let rows = variant_rows(&pool, &run).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, run.gid("ProductVariant", 3));

    run.cleanup(&pool).await;
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_local_product_is_adopted_by_handle() {
    let Some(pool) = database().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let run = Run::new();
    let sync = catalog_sync(&pool);
    let handle = Handle::parse(&run.handle()).unwrap();

    let local = ProductRepository::new(&pool)
        .create(&NewProduct {
            handle: handle.clone(),
            title: "Chelsea Boot (draft)".to_owned(),
            description_html: String::new(),
            status: ProductStatus::Draft,
            vendor: None,
            product_type: None,
            tags: vec![],
        })
        .await
        .unwrap();
    assert!(local.shopify_id.is_none());

    sync.apply_product(&run.product(vec![], vec![run.variant(1, "42", "Black", None)]))
        .await
        .unwrap();

    let adopted = ProductRepository::new(&pool)
        .get_by_handle(&handle)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(adopted.id, local.id);
    assert_eq!(adopted.shopify_id.as_deref(), Some(run.gid("Product", 1).as_str()));
    assert_eq!(adopted.title, "Chelsea Boot");
    assert_eq!(adopted.status, ProductStatus::Active);

    run.cleanup(&pool).await;
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_collection_members_follow_local_products() {
    let Some(pool) = database().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let run = Run::new();
    let sync = catalog_sync(&pool);

    sync.apply_product(&run.product(vec![], vec![run.variant(1, "42", "Black", None)]))
        .await
        .unwrap();

    let mut collection = ShopifyCollection {
        id: run.gid("Collection", 1),
        handle: format!("boots-{}", run.tag),
        title: "Boots".to_owned(),
        description_html: String::new(),
        product_ids: vec![run.gid("Product", 1), run.gid("Product", 99)],
    };
    assert_eq!(sync.apply_collection(&collection).await.unwrap(), 1);
    assert_eq!(sync.apply_collection(&collection).await.unwrap(), 1);

    collection.product_ids.clear();
    assert_eq!(sync.apply_collection(&collection).await.unwrap(), 0);

    let members: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM catalog.collection_product cp \
         JOIN catalog.collection c ON c.id = cp.collection_id \
         WHERE c.shopify_id = $1",
    )
    .bind(run.gid("Collection", 1))
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(members, 0);

    run.cleanup(&pool).await;
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_product_without_usable_handle_writes_nothing() {
    let Some(pool) = database().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let run = Run::new();
    let sync = catalog_sync(&pool);

    let mut product = run.product(vec![], vec![run.variant(1, "42", "Black", None)]);
    product.handle = String::new();
    product.title = "靴".to_owned();

    assert!(sync.apply_product(&product).await.is_err());

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog.product WHERE shopify_id = $1")
        .bind(run.gid("Product", 1))
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored, 0);

    run.cleanup(&pool).await;
}
