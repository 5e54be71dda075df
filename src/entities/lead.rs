use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeadType {
    #[sea_orm(string_value = "callback")]
    Callback,
    #[sea_orm(string_value = "consultation")]
    Consultation,
    #[sea_orm(string_value = "price_request")]
    PriceRequest,
    #[default]
    #[sea_orm(string_value = "feedback")]
    Feedback,
}

impl LeadType {
    /// Maps the `type` sent by storefront forms onto a lead type.
    ///
    /// Only callback, consultation and feedback are reachable this way;
    /// anything else (including `price_request`) is filed as feedback.
    pub fn from_form_value(value: &str) -> Self {
        match value.trim() {
            "callback" => LeadType::Callback,
            "consultation" => LeadType::Consultation,
            _ => LeadType::Feedback,
        }
    }
}

/// Contact-form submission. Only `processed` changes after creation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "leads")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub lead_type: LeadType,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    #[sea_orm(column_type = "Json", nullable)]
    pub meta: Option<Json>,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        super::touch_timestamps(&mut self.created_at, &mut self.updated_at, insert);
        Ok(self)
    }
}
