use sea_orm::entity::prelude::*;
use serde::Serialize;
use crate::entities::product::Entity as Product;
use crate::entities::user::Entity as User;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: Option<i32>,
    pub product_id: Option<i32>,
    #[sea_orm(default = 1)]
    pub quantity: i32,
    #[sea_orm(default = 0.0)]
    pub first_payment: f64,
    #[sea_orm(default = 3)]
    pub month: i16,
}

impl Model {
    /// Installment size for the referenced product, floored to a whole unit.
    pub fn monthly_payment(&self, product_price: f64) -> f64 {
        (product_price / f64::from(self.month)).floor()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "User",
        from = "crate::entities::order::Column::UserId",
        to = "crate::entities::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade",
    )]
    User,
    #[sea_orm(
        belongs_to = "Product",
        from = "crate::entities::order::Column::ProductId",
        to = "crate::entities::product::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade",
    )]
    Product,
}

impl ActiveModelBehavior for ActiveModel {}
