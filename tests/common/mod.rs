#![allow(dead_code)]

use chrono::Utc;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use rust_texnomart::entities::{
    attribute_key, attribute_value, category, comment, image, product, product_attribute,
};
use rust_texnomart::{create_api_router, setup_schema, AuditSink};

pub struct TestApp {
    pub base: String,
    pub db: Arc<DatabaseConnection>,
    pub audit_dir: PathBuf,
}

/// Boots the full application against a throwaway sqlite file and returns
/// the address reqwest should talk to.
pub async fn spawn_app() -> TestApp {
    std::env::set_var("SECRET", "integration-test-secret");
    let media_root = std::env::temp_dir().join("texnomart_test_media");
    std::env::set_var("MEDIA_ROOT", &media_root);

    let db_path = std::env::temp_dir().join(format!("texnomart_test_{}.sqlite", Uuid::new_v4()));
    let database_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let db = Database::connect(&database_url)
        .await
        .expect("Failed to connect to test database");
    setup_schema(&db).await;
    let db = Arc::new(db);

    let audit_dir = std::env::temp_dir().join(format!("texnomart_audit_{}", Uuid::new_v4()));
    let audit = AuditSink::open(&audit_dir).expect("Failed to open audit sink");

    let app = create_api_router(db.clone(), Arc::new(audit));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server error");
    });

    TestApp {
        base: format!("http://{addr}"),
        db,
        audit_dir,
    }
}

pub async fn seed_category(db: &DatabaseConnection, title: &str, slug: &str) -> category::Model {
    category::ActiveModel {
        title: Set(title.to_string()),
        slug: Set(slug.to_string()),
        image: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to seed category")
}

pub async fn seed_product(
    db: &DatabaseConnection,
    category_id: i32,
    name: &str,
    price: f64,
) -> product::Model {
    let now = Utc::now();
    product::ActiveModel {
        name: Set(name.to_string()),
        category_id: Set(category_id),
        description: Set(format!("{name} description")),
        image: Set(None),
        price: Set(price),
        is_liked: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to seed product")
}

pub async fn seed_comment(db: &DatabaseConnection, product_id: i32, rating: i16) -> comment::Model {
    let now = Utc::now();
    comment::ActiveModel {
        message: Set(Some(format!("rated {rating}"))),
        file: Set(None),
        product_id: Set(product_id),
        user_id: Set(None),
        rating: Set(rating),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to seed comment")
}

pub async fn seed_attribute_key(db: &DatabaseConnection, key_name: &str) -> attribute_key::Model {
    attribute_key::ActiveModel {
        key_name: Set(key_name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to seed attribute key")
}

pub async fn seed_attribute_value(
    db: &DatabaseConnection,
    value_name: &str,
) -> attribute_value::Model {
    attribute_value::ActiveModel {
        value_name: Set(value_name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to seed attribute value")
}

pub async fn seed_product_attribute(
    db: &DatabaseConnection,
    product_id: i32,
    attr_key_id: Option<i32>,
    attr_value_id: Option<i32>,
) -> product_attribute::Model {
    let now = Utc::now();
    product_attribute::ActiveModel {
        attr_key_id: Set(attr_key_id),
        attr_value_id: Set(attr_value_id),
        product_id: Set(Some(product_id)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to seed product attribute")
}

pub async fn seed_image(
    db: &DatabaseConnection,
    product_id: i32,
    file: &str,
    is_primary: bool,
) -> image::Model {
    image::ActiveModel {
        image: Set(file.to_string()),
        product_id: Set(Some(product_id)),
        is_primary: Set(is_primary),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to seed image")
}
