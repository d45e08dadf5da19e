pub mod api_key;
pub mod attribute_key;
pub mod attribute_value;
pub mod auth_token;
pub mod category;
pub mod comment;
pub mod image;
pub mod order;
pub mod product;
pub mod product_attribute;
pub mod product_like;
pub mod session;
pub mod user;

use sea_orm::{ConnectionTrait, DatabaseConnection, Schema};

pub async fn setup_schema(db: &DatabaseConnection) {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let statements = [
        schema.create_table_from_entity(user::Entity),
        schema.create_table_from_entity(category::Entity),
        schema.create_table_from_entity(product::Entity),
        schema.create_table_from_entity(image::Entity),
        schema.create_table_from_entity(order::Entity),
        schema.create_table_from_entity(comment::Entity),
        schema.create_table_from_entity(attribute_key::Entity),
        schema.create_table_from_entity(attribute_value::Entity),
        schema.create_table_from_entity(product_attribute::Entity),
        schema.create_table_from_entity(product_like::Entity),
        schema.create_table_from_entity(api_key::Entity),
        schema.create_table_from_entity(auth_token::Entity),
        schema.create_table_from_entity(session::Entity),
    ];

    for statement in statements {
        db.execute(backend.build(&statement))
            .await
            .expect("Failed to create schema");
    }
}
