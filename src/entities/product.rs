use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue;
use serde::{Deserialize, Serialize};

use crate::services::pricing;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Cleared (not cascaded) when the section is removed
    pub section_id: Option<i32>,
    pub title: String,
    #[sea_orm(unique)]
    pub slug: String,
    #[sea_orm(unique)]
    pub sku: String,
    #[sea_orm(column_type = "Text")]
    pub short_description: String,
    #[sea_orm(column_type = "Text")]
    pub full_description: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub price_special: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub price_retail: Option<Decimal>,
    pub stock: i32,
    /// Path of an uploaded image relative to the media root
    pub image: Option<String>,
    /// Legacy image reference imported from the previous storefront
    pub image_code: String,
    /// Unit of measure shown next to the price ("pcs", "m", ...)
    pub unit: String,
    pub wire_section: String,
    pub load_limit: String,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::section::Entity",
        from = "Column::SectionId",
        to = "super::section::Column::Id",
        on_delete = "SetNull"
    )]
    Section,
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::section::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Section.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Model {
    /// Price the customer pays.
    pub fn effective_price(&self) -> Decimal {
        pricing::effective_price(self.price, self.price_special)
    }

    /// Reference ("was") price shown next to the sale price.
    pub fn effective_retail_price(&self) -> Decimal {
        pricing::effective_retail_price(self.price, self.price_retail)
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    /// A special price, whenever present, becomes the stored base price.
    ///
    /// This is one-way: clearing the special price later does not restore
    /// the previous base price.
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if let ActiveValue::Set(Some(special)) | ActiveValue::Unchanged(Some(special)) =
            &self.price_special
        {
            self.price = ActiveValue::Set(*special);
        }
        super::touch_timestamps(&mut self.created_at, &mut self.updated_at, insert);
        Ok(self)
    }
}
