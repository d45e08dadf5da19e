use sea_orm::entity::prelude::*;
use crate::entities::product::Entity as Product;
use crate::entities::user::Entity as User;

/// The `users_like` many-to-many link. The composite primary key doubles as
/// the store-level uniqueness constraint on (product, user).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "product_likes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub product_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Product",
        from = "crate::entities::product_like::Column::ProductId",
        to = "crate::entities::product::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade",
    )]
    Product,
    #[sea_orm(
        belongs_to = "User",
        from = "crate::entities::product_like::Column::UserId",
        to = "crate::entities::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade",
    )]
    User,
}

impl ActiveModelBehavior for ActiveModel {}
