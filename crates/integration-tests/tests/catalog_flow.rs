//! End-to-end catalog flow against a real database.
//!
//! An admin builds a product through the JSON API, the storefront resolves
//! selections against it, and checkout hands off to the Shopify cart.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

use cobbler_admin::services::AdminAuthService;
use cobbler_core::{AdminRole, OptionCategory};
use cobbler_integration_tests::{
    STORE, admin_app, get, json_request, migrated_pool, send, storefront_app, test_database_url,
};

const PASSWORD: &str = "correct-horse-battery-staple";

struct Created {
    admin_id: i32,
    product_id: i64,
    options: Vec<(OptionCategory, i64)>,
}

async fn cleanup(pool: &PgPool, created: &Created) {
    sqlx::query("DELETE FROM catalog.product WHERE id = $1")
        .bind(i32::try_from(created.product_id).unwrap())
        .execute(pool)
        .await
        .unwrap();
    for (category, id) in &created.options {
        sqlx::query(&format!("DELETE FROM {} WHERE id = $1", category.table()))
            .bind(i32::try_from(*id).unwrap())
            .execute(pool)
            .await
            .unwrap();
    }
    sqlx::query("DELETE FROM admin.admin_user WHERE id = $1")
        .bind(created.admin_id)
        .execute(pool)
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_configure_and_checkout_flow() {
    let Some(url) = test_database_url() else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let pool = migrated_pool(&url).await;
    let run = Uuid::new_v4().simple().to_string();
    let admin_api = admin_app(pool.clone());
    let storefront = storefront_app(pool.clone());

    let email = format!("catalog-{run}@cobbler.test");
    let admin = AdminAuthService::new(&pool)
        .create_admin(&email, "Catalog Team", AdminRole::Admin, PASSWORD)
        .await
        .unwrap();

    let login = send(
        &admin_api,
        json_request(
            "POST",
            "/api/auth/login",
            &json!({ "email": email, "password": PASSWORD }),
            None,
        ),
    )
    .await;
    assert_eq!(login.status, StatusCode::OK);
    let token = login.json()["token"].as_str().unwrap().to_string();

    // Two sizes, one value on every other axis
    let mut options = Vec::new();
    let mut first = serde_json::Map::new();
    let mut second = serde_json::Map::new();
    for category in OptionCategory::ALL {
        let names: &[&str] = if category == OptionCategory::Size {
            &["9", "10"]
        } else {
            &["Standard"]
        };
        for (i, name) in names.iter().enumerate() {
            let mut body = json!({ "name": format!("{name} {run}"), "sort_order": i });
            if category.has_hex_code() {
                body["hex_code"] = json!("#5c3a21");
            }
            let response = send(
                &admin_api,
                json_request(
                    "POST",
                    &format!("/api/options/{}", category.plural()),
                    &body,
                    Some(&token),
                ),
            )
            .await;
            assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
            let id = response.json()["id"].as_i64().unwrap();
            options.push((category, id));

            let key = category.to_string();
            first.entry(key.clone()).or_insert(json!(id));
            second.insert(key, json!(id));
        }
    }

    let handle = format!("derby-{run}");
    let response = send(
        &admin_api,
        json_request(
            "POST",
            "/api/products",
            &json!({
                "handle": handle,
                "title": "Plain Toe Derby",
                "description_html": "<p>Goodyear welted.</p>",
                "status": "active",
                "tags": ["derby"],
            }),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
    let product_id = response.json()["id"].as_i64().unwrap();

    let created = Created {
        admin_id: admin.id.as_i32(),
        product_id,
        options,
    };

    let mut variant_ids = Vec::new();
    for (key, price) in [(&first, "185.00"), (&second, "195.00")] {
        let response = send(
            &admin_api,
            json_request(
                "POST",
                &format!("/api/products/{product_id}/variants"),
                &json!({ "options": key, "price": price, "inventory_quantity": 3 }),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
        variant_ids.push(response.json()["id"].as_i64().unwrap());
    }

    // Same combination twice is a conflict
    let response = send(
        &admin_api,
        json_request(
            "POST",
            &format!("/api/products/{product_id}/variants"),
            &json!({ "options": first, "price": "185.00" }),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    // Lookup by storefront handle
    let response = send(
        &admin_api,
        json_request(
            "GET",
            &format!("/api/products/by-handle/{handle}"),
            &json!({}),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    let detail = response.json();
    assert_eq!(detail["id"].as_i64(), Some(product_id));
    assert_eq!(detail["variants"].as_array().unwrap().len(), 2);

    // Resolve preview reads IDs as strings and skips unknown keys
    let mut body: serde_json::Map<String, Value> = second
        .iter()
        .map(|(k, v)| (k.clone(), json!(v.to_string())))
        .collect();
    body.insert("laces".to_owned(), json!("waxed"));
    let response = send(
        &admin_api,
        json_request(
            "POST",
            &format!("/api/products/{product_id}/resolve"),
            &Value::Object(body),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    assert_eq!(response.json()["state"], "available");
    assert_eq!(response.json()["variant_id"].as_i64(), Some(variant_ids[1]));

    // Everything but size selected
    let mut partial: Vec<String> = second
        .iter()
        .filter(|(k, _)| k.as_str() != "size")
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    let response = send(
        &storefront,
        get(&format!(
            "/api/products/{handle}/configure?{}",
            partial.join("&")
        )),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    let view = response.json();
    assert_eq!(view["state"], "incomplete");
    assert_eq!(view["missing"], json!(["size"]));
    assert!(view["variant"].is_null());

    partial.push(format!("size={}", second["size"]));
    let response = send(
        &storefront,
        get(&format!(
            "/api/products/{handle}/configure?{}",
            partial.join("&")
        )),
    )
    .await;
    let view: Value = response.json();
    assert_eq!(view["state"], "available");
    assert_eq!(view["variant"]["id"].as_i64(), Some(variant_ids[1]));
    assert_eq!(view["variant"]["price_display"], "$195.00");
    // Not synced yet
    assert!(view["variant"]["checkout_url"].is_null());

    let response = send(&storefront, get(&format!("/products/{handle}"))).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("Plain Toe Derby"));

    let response = send(&storefront, get(&format!("/checkout/{}", variant_ids[1]))).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let numeric = u64::from_str_radix(&run[..10], 16).unwrap();
    sqlx::query("UPDATE catalog.product_variant SET shopify_id = $1 WHERE id = $2")
        .bind(format!("gid://shopify/ProductVariant/{numeric}"))
        .bind(i32::try_from(variant_ids[1]).unwrap())
        .execute(&pool)
        .await
        .unwrap();

    let response = send(
        &storefront,
        get(&format!("/checkout/{}?quantity=2", variant_ids[1])),
    )
    .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(
        response.header("location"),
        Some(format!("https://{STORE}/cart/{numeric}:2").as_str())
    );

    let response = send(&storefront, get("/api/products/no-such-shoe/configure")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    cleanup(&pool, &created).await;
}
