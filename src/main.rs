use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;

use rust_texnomart::{create_api_router, setup_schema, AuditSink};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    dotenvy::dotenv().ok();

    std::env::var("SECRET").expect("SECRET must be set");
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db: DatabaseConnection = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");
    setup_schema(&db).await;

    let audit_dir =
        std::env::var("DELETED_ITEMS_DIR").unwrap_or_else(|_| "deleted_items".to_string());
    let audit = AuditSink::open(audit_dir).expect("Failed to open audit sink");

    let app = create_api_router(Arc::new(db), Arc::new(audit));

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind listener");
    tracing::info!(addr = %bind_addr, "Running");
    axum::serve(listener, app).await.expect("Server error");
}
