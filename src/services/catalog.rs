//! Read side of the catalog: the nested tree behind the storefront page,
//! paginated section listings and single-product fragments.
//!
//! Only active rows are ever returned, and an inactive node hides its whole
//! subtree. Every level is ordered by `(sort_order, title)`.

use crate::{
    entities::{
        category::{self, Entity as CategoryEntity},
        product::{self, Entity as ProductEntity},
        section::{self, Entity as SectionEntity},
        subcategory::{self, Entity as SubcategoryEntity},
        subsection::{self, Entity as SubsectionEntity},
    },
    errors::ServiceError,
    services::images::ImageResolver,
    services::pricing::format_money,
    tracing::log_slow_operation,
};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};
use utoipa::ToSchema;

const SLOW_TREE_THRESHOLD: Duration = Duration::from_millis(250);

/// Product as listed on catalog pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductCard {
    pub id: i32,
    pub section_id: Option<i32>,
    pub title: String,
    pub slug: String,
    pub sku: String,
    pub short_description: String,
    /// Price the customer pays (special price when set)
    #[schema(example = "1234.50")]
    pub price: String,
    /// Reference price; equals `price` when no retail price is set
    #[schema(example = "1500.00")]
    pub retail_price: String,
    pub stock: i32,
    pub unit: String,
    pub wire_section: String,
    pub load_limit: String,
    pub image_url: String,
}

/// Full product view for the detail popup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub card: ProductCard,
    pub full_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubsectionNode {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SectionNode {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub subsections: Vec<SubsectionNode>,
    pub products: Vec<ProductCard>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubcategoryNode {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub sections: Vec<SectionNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryNode {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub subcategories: Vec<SubcategoryNode>,
}

/// Everything the storefront page needs in one document.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CatalogTree {
    pub categories: Vec<CategoryNode>,
    /// Every active product, for client-side search
    pub all_products: Vec<ProductCard>,
}

/// One page of a section's products.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SectionPage {
    pub products: Vec<ProductCard>,
    pub html: String,
    pub has_more: bool,
    pub total_count: u64,
    /// `offset` plus the number of products on this page
    pub loaded_count: u64,
}

/// Catalog read model with image URLs resolved.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    images: Arc<ImageResolver>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>, images: Arc<ImageResolver>) -> Self {
        Self { db, images }
    }

    pub fn product_card(&self, product: &product::Model) -> ProductCard {
        ProductCard {
            id: product.id,
            section_id: product.section_id,
            title: product.title.clone(),
            slug: product.slug.clone(),
            sku: product.sku.clone(),
            short_description: product.short_description.clone(),
            price: format_money(product.effective_price()),
            retail_price: format_money(product.effective_retail_price()),
            stock: product.stock,
            unit: product.unit.clone(),
            wire_section: product.wire_section.clone(),
            load_limit: product.load_limit.clone(),
            image_url: self.images.for_product(product),
        }
    }

    /// Loads the active catalog as a nested tree.
    ///
    /// Issues one query per level, so the cost does not grow with the number
    /// of categories.
    #[instrument(skip(self))]
    pub async fn catalog_tree(&self) -> Result<CatalogTree, ServiceError> {
        let started = Instant::now();
        let db = &*self.db;

        let categories = CategoryEntity::find()
            .filter(category::Column::IsActive.eq(true))
            .order_by_asc(category::Column::SortOrder)
            .order_by_asc(category::Column::Title)
            .all(db)
            .await?;

        let subcategories = SubcategoryEntity::find()
            .filter(subcategory::Column::IsActive.eq(true))
            .filter(subcategory::Column::CategoryId.is_in(categories.iter().map(|c| c.id)))
            .order_by_asc(subcategory::Column::SortOrder)
            .order_by_asc(subcategory::Column::Title)
            .all(db)
            .await?;

        let sections = SectionEntity::find()
            .filter(section::Column::IsActive.eq(true))
            .filter(section::Column::SubcategoryId.is_in(subcategories.iter().map(|s| s.id)))
            .order_by_asc(section::Column::SortOrder)
            .order_by_asc(section::Column::Title)
            .all(db)
            .await?;

        let subsections = SubsectionEntity::find()
            .filter(subsection::Column::IsActive.eq(true))
            .filter(subsection::Column::SectionId.is_in(sections.iter().map(|s| s.id)))
            .order_by_asc(subsection::Column::SortOrder)
            .order_by_asc(subsection::Column::Title)
            .all(db)
            .await?;

        let all_products: Vec<ProductCard> = active_products()
            .all(db)
            .await?
            .iter()
            .map(|p| self.product_card(p))
            .collect();

        let mut products_by_section = group_by(
            all_products.iter().filter(|p| p.section_id.is_some()).cloned(),
            |p| p.section_id,
        );
        let mut subsections_by_section = group_by(subsections, |s| s.section_id);
        let mut sections_by_subcategory = group_by(sections, |s| s.subcategory_id);
        let mut subcategories_by_category = group_by(subcategories, |s| s.category_id);

        let categories = categories
            .into_iter()
            .map(|c| CategoryNode {
                subcategories: subcategories_by_category
                    .remove(&c.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|sc| SubcategoryNode {
                        sections: sections_by_subcategory
                            .remove(&sc.id)
                            .unwrap_or_default()
                            .into_iter()
                            .map(|s| SectionNode {
                                subsections: subsections_by_section
                                    .remove(&s.id)
                                    .unwrap_or_default()
                                    .into_iter()
                                    .map(|ss| SubsectionNode {
                                        id: ss.id,
                                        title: ss.title,
                                        slug: ss.slug,
                                        description: ss.description,
                                    })
                                    .collect(),
                                products: products_by_section
                                    .remove(&Some(s.id))
                                    .unwrap_or_default(),
                                id: s.id,
                                title: s.title,
                                slug: s.slug,
                                description: s.description,
                            })
                            .collect(),
                        id: sc.id,
                        title: sc.title,
                        slug: sc.slug,
                        description: sc.description,
                    })
                    .collect(),
                id: c.id,
                title: c.title,
                slug: c.slug,
                description: c.description,
            })
            .collect::<Vec<_>>();

        log_slow_operation("catalog_tree", started.elapsed(), SLOW_TREE_THRESHOLD);
        debug!(
            categories = categories.len(),
            products = all_products.len(),
            "Catalog tree assembled"
        );
        Ok(CatalogTree {
            categories,
            all_products,
        })
    }

    /// Loads one page of an active section's active products.
    ///
    /// # Errors
    ///
    /// * `ServiceError::NotFound` - the section does not exist or is inactive
    #[instrument(skip(self))]
    pub async fn section_products(
        &self,
        section_id: i32,
        offset: u64,
        limit: u64,
    ) -> Result<SectionPage, ServiceError> {
        let db = &*self.db;

        SectionEntity::find_by_id(section_id)
            .filter(section::Column::IsActive.eq(true))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Section not found"))?;

        let in_section = active_products().filter(product::Column::SectionId.eq(section_id));
        let total_count = in_section.clone().count(db).await?;

        // SQL binds offsets as signed integers; anything past the end is an empty page anyway
        let products: Vec<ProductCard> = if offset >= total_count {
            Vec::new()
        } else {
            in_section
                .offset(offset)
                .limit(limit.min(i64::MAX as u64))
                .all(db)
                .await?
                .iter()
                .map(|p| self.product_card(p))
                .collect()
        };

        Ok(SectionPage {
            html: render_product_cards(&products),
            has_more: offset.saturating_add(limit) < total_count,
            total_count,
            loaded_count: offset.saturating_add(products.len() as u64),
            products,
        })
    }

    /// Finds an active product by SKU.
    ///
    /// # Errors
    ///
    /// * `ServiceError::NotFound` - no active product has this SKU
    #[instrument(skip(self))]
    pub async fn product_detail(&self, sku: &str) -> Result<ProductDetail, ServiceError> {
        let product = ProductEntity::find()
            .filter(product::Column::Sku.eq(sku))
            .filter(product::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product not found"))?;

        Ok(ProductDetail {
            card: self.product_card(&product),
            full_description: product.full_description,
        })
    }
}

fn active_products() -> Select<ProductEntity> {
    ProductEntity::find()
        .filter(product::Column::IsActive.eq(true))
        .order_by_asc(product::Column::SortOrder)
        .order_by_asc(product::Column::Title)
}

/// Buckets rows by key, keeping their original order inside each bucket.
fn group_by<K, T, I, F>(rows: I, key: F) -> HashMap<K, Vec<T>>
where
    K: Eq + Hash,
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> K,
{
    let mut groups: HashMap<K, Vec<T>> = HashMap::new();
    for row in rows {
        groups.entry(key(&row)).or_default().push(row);
    }
    groups
}

/// Escapes text for use in HTML element content and quoted attributes.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_price(out: &mut String, card: &ProductCard) {
    let _ = write!(
        out,
        r#"<div class="product-price"><span class="price">{}</span>"#,
        escape_html(&card.price)
    );
    if card.retail_price != card.price {
        let _ = write!(
            out,
            r#" <span class="price-retail">{}</span>"#,
            escape_html(&card.retail_price)
        );
    }
    if !card.unit.is_empty() {
        let _ = write!(out, r#" <span class="unit">/ {}</span>"#, escape_html(&card.unit));
    }
    out.push_str("</div>");
}

/// Renders the product grid items appended by the "show more" button.
pub fn render_product_cards(cards: &[ProductCard]) -> String {
    let mut out = String::new();
    for card in cards {
        let _ = write!(
            out,
            r#"<div class="product-card" data-product-id="{id}" data-sku="{sku}" data-title="{title}" data-price="{price}"><img class="product-image" src="{image}" alt="{title}" loading="lazy"><div class="product-title">{title}</div><div class="product-sku">{sku}</div>"#,
            id = card.id,
            sku = escape_html(&card.sku),
            title = escape_html(&card.title),
            price = escape_html(&card.price),
            image = escape_html(&card.image_url),
        );
        render_price(&mut out, card);
        out.push_str("</div>");
    }
    out
}

/// Renders the product detail popup body.
pub fn render_product_detail(detail: &ProductDetail) -> String {
    let card = &detail.card;
    let mut out = String::new();
    let _ = write!(
        out,
        r#"<div class="product-detail" data-product-id="{id}" data-sku="{sku}"><img class="product-image" src="{image}" alt="{title}"><h2 class="product-title">{title}</h2><div class="product-sku">{sku}</div>"#,
        id = card.id,
        sku = escape_html(&card.sku),
        title = escape_html(&card.title),
        image = escape_html(&card.image_url),
    );
    render_price(&mut out, card);

    let specs = [
        ("Wire section", &card.wire_section),
        ("Load limit", &card.load_limit),
    ];
    if specs.iter().any(|(_, value)| !value.is_empty()) {
        out.push_str(r#"<dl class="product-specs">"#);
        for (label, value) in specs.iter().filter(|(_, value)| !value.is_empty()) {
            let _ = write!(out, "<dt>{label}</dt><dd>{}</dd>", escape_html(value));
        }
        out.push_str("</dl>");
    }
    let _ = write!(out, r#"<div class="product-stock">In stock: {}</div>"#, card.stock);

    for text in [&card.short_description, &detail.full_description] {
        if !text.is_empty() {
            let _ = write!(
                out,
                r#"<div class="product-description">{}</div>"#,
                escape_html(text)
            );
        }
    }
    out.push_str("</div>");
    out
}
