mod common;

use common::spawn_app;
use reqwest::{header, multipart, Client, StatusCode};

const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
];

async fn bearer_token(client: &Client, base: &str) -> String {
    let response = client
        .post(format!("{base}/register/"))
        .json(&serde_json::json!({
            "username": "uploader",
            "password": "Secret15",
            "email": "uploader@example.com"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client
        .post(format!("{base}/token-auth/"))
        .json(&serde_json::json!({ "username": "uploader", "password": "Secret15" }))
        .send()
        .await
        .expect("Failed to send request");
    let body = response
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse response JSON");
    body["token"].as_str().expect("Missing token").to_string()
}

#[tokio::test]
async fn test_upload_requires_identity() {
    let app = spawn_app().await;
    let client = Client::new();

    let part = multipart::Part::bytes(PNG_BYTES.to_vec())
        .mime_str("image/png")
        .expect("Failed to build part");
    let form = multipart::Form::new().part("front", part);

    let response = client
        .post(format!("{}/upload/image/", app.base))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_and_fetch_roundtrip() {
    let app = spawn_app().await;
    let client = Client::new();
    let token = bearer_token(&client, &app.base).await;

    let part = multipart::Part::bytes(PNG_BYTES.to_vec())
        .mime_str("image/png")
        .expect("Failed to build part");
    let form = multipart::Form::new().part("front", part);

    let response = client
        .post(format!("{}/upload/image/", app.base))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse response JSON");
    let stored = body["image"].as_str().expect("Missing blob path");
    assert!(stored.ends_with(".png"));

    let response = client
        .get(format!("{}/media/{stored}", app.base))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("image/png")
    );
    let fetched = response.bytes().await.expect("Failed to read body");
    assert_eq!(fetched.as_ref(), PNG_BYTES);
}

#[tokio::test]
async fn test_upload_rejects_unsupported_content_type() {
    let app = spawn_app().await;
    let client = Client::new();
    let token = bearer_token(&client, &app.base).await;

    let part = multipart::Part::bytes(b"GIF89a".to_vec())
        .mime_str("image/gif")
        .expect("Failed to build part");
    let form = multipart::Form::new().part("anim", part);

    let response = client
        .post(format!("{}/upload/image/", app.base))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_media_fetch_of_missing_file_is_not_found() {
    let app = spawn_app().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/media/nope.png", app.base))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
