use sea_orm::entity::prelude::*;
use serde::Serialize;
use crate::entities::attribute_key::Entity as AttributeKey;
use crate::entities::attribute_value::Entity as AttributeValue;
use crate::entities::product::Entity as Product;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "product_attributes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub attr_key_id: Option<i32>,
    pub attr_value_id: Option<i32>,
    pub product_id: Option<i32>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "AttributeKey",
        from = "crate::entities::product_attribute::Column::AttrKeyId",
        to = "crate::entities::attribute_key::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade",
    )]
    AttributeKey,
    #[sea_orm(
        belongs_to = "AttributeValue",
        from = "crate::entities::product_attribute::Column::AttrValueId",
        to = "crate::entities::attribute_value::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade",
    )]
    AttributeValue,
    #[sea_orm(
        belongs_to = "Product",
        from = "crate::entities::product_attribute::Column::ProductId",
        to = "crate::entities::product::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade",
    )]
    Product,
}

impl ActiveModelBehavior for ActiveModel {}
