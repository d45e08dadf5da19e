pub mod api;
pub mod audit;
pub mod entities;
pub mod error;
pub mod middleware;

pub use api::create_api_router;
pub use audit::AuditSink;
pub use entities::setup_schema;
