//! Content-management operations for catalog operators.
//!
//! Deletes follow the catalog's integrity rules: a category or subcategory
//! with children, or a product that appears on any order, is never removed.
//! Sections may be removed at any time; their subsections go with them and
//! their products are detached.

use crate::{
    entities::{
        category::{self, Entity as CategoryEntity},
        order_item::{self, Entity as OrderItemEntity},
        product::{self, Entity as ProductEntity},
        section::{self, Entity as SectionEntity},
        subcategory::{self, Entity as SubcategoryEntity},
        subsection::{self, Entity as SubsectionEntity},
    },
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, NotSet, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// Catalog node kinds that operators can toggle and delete.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CatalogKind {
    Category,
    Subcategory,
    Section,
    Product,
}

/// Outcome of a bulk delete: rows removed plus one message per refused row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BulkDeleteReport {
    pub deleted: u64,
    pub errors: Vec<String>,
}

/// Product fields editable by operators.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SaveProductInput {
    pub section_id: Option<i32>,
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 255, message = "Slug is required"))]
    pub slug: String,
    #[validate(length(min = 1, max = 100, message = "SKU is required"))]
    pub sku: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub full_description: String,
    #[serde(default)]
    #[validate(custom = "non_negative_money")]
    #[schema(value_type = String, example = "1234.50")]
    pub price: Decimal,
    #[validate(custom = "non_negative_money")]
    #[schema(value_type = Option<String>)]
    pub price_special: Option<Decimal>,
    #[validate(custom = "non_negative_money")]
    #[schema(value_type = Option<String>)]
    pub price_retail: Option<Decimal>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i32,
    pub image: Option<String>,
    #[serde(default)]
    pub image_code: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub wire_section: String,
    #[serde(default)]
    pub load_limit: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_active() -> bool {
    true
}

fn non_negative_money(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("negative_price");
        err.message = Some("Prices cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Clone)]
pub struct AdminService {
    db: Arc<DatabaseConnection>,
}

impl AdminService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Activates or deactivates the given rows; returns how many were updated.
    ///
    /// Bulk toggles bypass the save hooks, so a product's special price is
    /// not re-applied here.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn set_active(
        &self,
        kind: CatalogKind,
        ids: Vec<i32>,
        active: bool,
    ) -> Result<u64, ServiceError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let db = &*self.db;
        let updated = match kind {
            CatalogKind::Category => {
                toggle::<CategoryEntity, _>(
                    db,
                    ids,
                    active,
                    category::Column::Id,
                    category::Column::IsActive,
                    category::Column::UpdatedAt,
                )
                .await?
            }
            CatalogKind::Subcategory => {
                toggle::<SubcategoryEntity, _>(
                    db,
                    ids,
                    active,
                    subcategory::Column::Id,
                    subcategory::Column::IsActive,
                    subcategory::Column::UpdatedAt,
                )
                .await?
            }
            CatalogKind::Section => {
                toggle::<SectionEntity, _>(
                    db,
                    ids,
                    active,
                    section::Column::Id,
                    section::Column::IsActive,
                    section::Column::UpdatedAt,
                )
                .await?
            }
            CatalogKind::Product => {
                toggle::<ProductEntity, _>(
                    db,
                    ids,
                    active,
                    product::Column::Id,
                    product::Column::IsActive,
                    product::Column::UpdatedAt,
                )
                .await?
            }
        };
        info!(%kind, active, updated, "Catalog visibility changed");
        Ok(updated)
    }

    /// Deletes one node.
    ///
    /// # Errors
    ///
    /// * `ServiceError::NotFound` - no such row
    /// * `ServiceError::IntegrityError` - dependent rows block the delete
    #[instrument(skip(self))]
    pub async fn delete(&self, kind: CatalogKind, id: i32) -> Result<(), ServiceError> {
        let (title, blocker) = self.inspect(kind, id).await?;
        if let Some(reason) = blocker {
            warn!(%kind, id, %reason, "Delete refused");
            return Err(ServiceError::IntegrityError(format!(
                "Cannot delete {kind} \"{title}\": {reason}"
            )));
        }
        self.remove(kind, id).await?;
        info!(%kind, id, "Catalog node deleted");
        Ok(())
    }

    /// Deletes every row that is free to go and reports the rest.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn delete_bulk(
        &self,
        kind: CatalogKind,
        ids: Vec<i32>,
    ) -> Result<BulkDeleteReport, ServiceError> {
        let mut report = BulkDeleteReport::default();
        for id in ids {
            match self.inspect(kind, id).await {
                Ok((_, None)) => {
                    self.remove(kind, id).await?;
                    report.deleted += 1;
                }
                Ok((title, Some(reason))) => report.errors.push(format!("\"{title}\": {reason}")),
                Err(ServiceError::NotFound(message)) => report.errors.push(message),
                Err(e) => return Err(e),
            }
        }
        info!(%kind, deleted = report.deleted, refused = report.errors.len(), "Bulk delete finished");
        Ok(report)
    }

    /// Returns the row's title and, when something blocks its removal, why.
    async fn inspect(
        &self,
        kind: CatalogKind,
        id: i32,
    ) -> Result<(String, Option<String>), ServiceError> {
        let db = &*self.db;
        let missing = || ServiceError::not_found(format!("{kind} {id} not found"));

        match kind {
            CatalogKind::Category => {
                let row = CategoryEntity::find_by_id(id).one(db).await?.ok_or_else(missing)?;
                let children = SubcategoryEntity::find()
                    .filter(subcategory::Column::CategoryId.eq(id))
                    .count(db)
                    .await?;
                Ok((row.title, blocking(children, "subcategories")))
            }
            CatalogKind::Subcategory => {
                let row = SubcategoryEntity::find_by_id(id).one(db).await?.ok_or_else(missing)?;
                let children = SectionEntity::find()
                    .filter(section::Column::SubcategoryId.eq(id))
                    .count(db)
                    .await?;
                Ok((row.title, blocking(children, "sections")))
            }
            CatalogKind::Section => {
                let row = SectionEntity::find_by_id(id).one(db).await?.ok_or_else(missing)?;
                Ok((row.title, None))
            }
            CatalogKind::Product => {
                let row = ProductEntity::find_by_id(id).one(db).await?.ok_or_else(missing)?;
                let uses = OrderItemEntity::find()
                    .filter(order_item::Column::ProductId.eq(id))
                    .count(db)
                    .await?;
                let reason = (uses > 0).then(|| format!("it is used in {uses} order items"));
                Ok((row.title, reason))
            }
        }
    }

    async fn remove(&self, kind: CatalogKind, id: i32) -> Result<(), ServiceError> {
        let db = &*self.db;
        match kind {
            CatalogKind::Category => {
                CategoryEntity::delete_by_id(id).exec(db).await?;
            }
            CatalogKind::Subcategory => {
                SubcategoryEntity::delete_by_id(id).exec(db).await?;
            }
            CatalogKind::Section => {
                let txn = db.begin().await?;
                ProductEntity::update_many()
                    .col_expr(product::Column::SectionId, Expr::value(Option::<i32>::None))
                    .filter(product::Column::SectionId.eq(id))
                    .exec(&txn)
                    .await?;
                SubsectionEntity::delete_many()
                    .filter(subsection::Column::SectionId.eq(id))
                    .exec(&txn)
                    .await?;
                SectionEntity::delete_by_id(id).exec(&txn).await?;
                txn.commit().await?;
            }
            CatalogKind::Product => {
                ProductEntity::delete_by_id(id).exec(db).await?;
            }
        }
        Ok(())
    }

    /// Copies products with derived SKU, slug and title.
    ///
    /// The n-th copy made by one call (counting from 0, in id order) gets
    /// `{sku}_copy_{n}` and `{slug}-copy-{n}`. All copies are written in one
    /// transaction.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn duplicate_products(
        &self,
        ids: Vec<i32>,
    ) -> Result<Vec<product::Model>, ServiceError> {
        let originals = ProductEntity::find()
            .filter(product::Column::Id.is_in(ids))
            .order_by_asc(product::Column::Id)
            .all(&*self.db)
            .await?;

        let txn = self.db.begin().await?;
        let mut copies = Vec::with_capacity(originals.len());
        for (n, original) in originals.into_iter().enumerate() {
            let copy = product::ActiveModel {
                id: NotSet,
                section_id: Set(original.section_id),
                title: Set(format!("{} (copy)", original.title)),
                slug: Set(format!("{}-copy-{n}", original.slug)),
                sku: Set(format!("{}_copy_{n}", original.sku)),
                short_description: Set(original.short_description),
                full_description: Set(original.full_description),
                price: Set(original.price),
                price_special: Set(original.price_special),
                price_retail: Set(original.price_retail),
                stock: Set(original.stock),
                image: Set(original.image),
                image_code: Set(original.image_code),
                unit: Set(original.unit),
                wire_section: Set(original.wire_section),
                load_limit: Set(original.load_limit),
                is_active: Set(original.is_active),
                sort_order: Set(original.sort_order),
                created_at: NotSet,
                updated_at: NotSet,
            }
            .insert(&txn)
            .await?;
            copies.push(copy);
        }
        txn.commit().await?;

        info!(copies = copies.len(), "Products duplicated");
        Ok(copies)
    }

    /// Creates a product, or updates it when `id` is given.
    ///
    /// # Errors
    ///
    /// * `ServiceError::ValidationError` - invalid fields, unknown section, or
    ///   a SKU or slug already used by another product
    /// * `ServiceError::NotFound` - `id` given but no such product
    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn save_product(
        &self,
        id: Option<i32>,
        input: SaveProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db;

        if let Some(section_id) = input.section_id {
            SectionEntity::find_by_id(section_id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::validation(format!("Section {section_id} not found")))?;
        }
        ensure_unique(db, product::Column::Sku, &input.sku, id, "SKU").await?;
        ensure_unique(db, product::Column::Slug, &input.slug, id, "Slug").await?;

        let mut active: product::ActiveModel = match id {
            Some(id) => ProductEntity::find_by_id(id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::not_found(format!("Product {id} not found")))?
                .into(),
            None => <product::ActiveModel as Default>::default(),
        };

        active.section_id = Set(input.section_id);
        active.title = Set(input.title);
        active.slug = Set(input.slug);
        active.sku = Set(input.sku);
        active.short_description = Set(input.short_description);
        active.full_description = Set(input.full_description);
        active.price = Set(input.price);
        active.price_special = Set(input.price_special);
        active.price_retail = Set(input.price_retail);
        active.stock = Set(input.stock);
        active.image = Set(input.image);
        active.image_code = Set(input.image_code);
        active.unit = Set(input.unit);
        active.wire_section = Set(input.wire_section);
        active.load_limit = Set(input.load_limit);
        active.is_active = Set(input.is_active);
        active.sort_order = Set(input.sort_order);

        let saved = if id.is_some() {
            active.update(db).await?
        } else {
            active.insert(db).await?
        };
        info!(product_id = saved.id, created = id.is_none(), "Product saved");
        Ok(saved)
    }

    /// Number of active products in a section.
    #[instrument(skip(self))]
    pub async fn section_product_count(&self, section_id: i32) -> Result<u64, ServiceError> {
        Ok(ProductEntity::find()
            .filter(product::Column::SectionId.eq(section_id))
            .filter(product::Column::IsActive.eq(true))
            .count(&*self.db)
            .await?)
    }
}

fn blocking(children: u64, what: &str) -> Option<String> {
    (children > 0).then(|| format!("it has {children} {what}; delete or move them first"))
}

async fn toggle<E, C>(
    db: &C,
    ids: Vec<i32>,
    active: bool,
    id_column: E::Column,
    active_column: E::Column,
    updated_column: E::Column,
) -> Result<u64, ServiceError>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let result = E::update_many()
        .col_expr(active_column, Expr::value(active))
        .col_expr(updated_column, Expr::value(Utc::now()))
        .filter(id_column.is_in(ids))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

async fn ensure_unique<C: ConnectionTrait>(
    db: &C,
    column: product::Column,
    value: &str,
    except_id: Option<i32>,
    label: &str,
) -> Result<(), ServiceError> {
    let mut query = ProductEntity::find().filter(column.eq(value));
    if let Some(id) = except_id {
        query = query.filter(product::Column::Id.ne(id));
    }
    if query.count(db).await? > 0 {
        return Err(ServiceError::validation(format!(
            "{label} \"{value}\" is already used by another product"
        )));
    }
    Ok(())
}
