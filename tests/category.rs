mod common;

use common::{seed_category, seed_product, spawn_app};
use reqwest::{Client, StatusCode};

#[tokio::test]
async fn test_create_category_derives_slug_from_title() {
    let app = spawn_app().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/category/add-category/", app.base))
        .json(&serde_json::json!({ "title": "Smart Phones" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse response JSON");
    assert_eq!(body["title"], "Smart Phones");
    assert_eq!(body["slug"], "smart-phones");
    assert_eq!(body["full_image_url"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_create_category_keeps_explicit_slug() {
    let app = spawn_app().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/category/add-category/", app.base))
        .json(&serde_json::json!({ "title": "Smart Phones", "slug": "telefony" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse response JSON");
    assert_eq!(body["slug"], "telefony");
}

#[tokio::test]
async fn test_duplicate_slug_is_a_conflict() {
    let app = spawn_app().await;
    let client = Client::new();

    for _ in 0..2 {
        let _ = client
            .post(format!("{}/category/add-category/", app.base))
            .json(&serde_json::json!({ "title": "Phones" }))
            .send()
            .await
            .expect("Failed to send request");
    }

    let response = client
        .post(format!("{}/category/add-category/", app.base))
        .json(&serde_json::json!({ "title": "Phones" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = response
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse response JSON");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_create_category_validates_title() {
    let app = spawn_app().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/category/add-category/", app.base))
        .json(&serde_json::json!({ "title": "" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse response JSON");
    assert!(body["title"].is_array());
}

#[tokio::test]
async fn test_list_categories_with_title_filter() {
    let app = spawn_app().await;
    let client = Client::new();

    seed_category(&app.db, "Phones", "phones").await;
    seed_category(&app.db, "Laptops", "laptops").await;

    let response = client
        .get(format!("{}/categories/", app.base))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = response
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse response JSON");
    assert_eq!(body.as_array().map(|a| a.len()), Some(2));

    let response = client
        .get(format!("{}/categories/?title=Phones", app.base))
        .send()
        .await
        .expect("Failed to send request");
    let body = response
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse response JSON");
    let list = body.as_array().expect("Expected an array");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["slug"], "phones");
}

#[tokio::test]
async fn test_update_category_keeps_absent_fields() {
    let app = spawn_app().await;
    let client = Client::new();

    seed_category(&app.db, "Phones", "phones").await;

    let response = client
        .patch(format!("{}/category/phones/edit/", app.base))
        .json(&serde_json::json!({ "title": "Smartphones" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = response
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse response JSON");
    assert_eq!(body["title"], "Smartphones");
    // Absent slug stays untouched by a title change.
    assert_eq!(body["slug"], "phones");

    let response = client
        .get(format!("{}/category/phones/edit/", app.base))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = response
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse response JSON");
    assert_eq!(body["title"], "Smartphones");
}

#[tokio::test]
async fn test_update_missing_category_is_not_found() {
    let app = spawn_app().await;
    let client = Client::new();

    let response = client
        .put(format!("{}/category/nope/edit/", app.base))
        .json(&serde_json::json!({ "title": "Whatever" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_category_cascades_and_audits() {
    let app = spawn_app().await;
    let client = Client::new();

    let categ = seed_category(&app.db, "Phones", "phones").await;
    let prod = seed_product(&app.db, categ.id, "Pixel", 500.0).await;

    let response = client
        .delete(format!("{}/category/phones/delete/", app.base))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Cascaded product is gone.
    let response = client
        .get(format!("{}/product/detail/{}/", app.base, prod.id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Audit records exist for the category and the cascaded product.
    let category_record = app.audit_dir.join(format!("category_{}.json", categ.id));
    let product_record = app.audit_dir.join(format!("product_{}.json", prod.id));
    assert!(category_record.exists());
    assert!(product_record.exists());

    let raw = std::fs::read_to_string(category_record).expect("Failed to read audit record");
    let record: serde_json::Value = serde_json::from_str(&raw).expect("Record is not JSON");
    assert_eq!(record["title"], "Phones");
    assert_eq!(record["slug"], "phones");
    assert!(record.get("created_at").is_none());
}

#[tokio::test]
async fn test_delete_missing_category_is_not_found() {
    let app = spawn_app().await;
    let client = Client::new();

    let response = client
        .delete(format!("{}/category/nope/delete/", app.base))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
