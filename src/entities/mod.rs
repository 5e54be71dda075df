//! SeaORM entities for the storefront schema.
//!
//! The catalog is a strict four-level tree (category → subcategory →
//! section → subsection) with products hanging off sections. Orders and
//! leads are standalone intake records.

pub mod category;
pub mod lead;
pub mod order;
pub mod order_item;
pub mod product;
pub mod section;
pub mod subcategory;
pub mod subsection;

use chrono::{DateTime, Utc};
use sea_orm::ActiveValue;

/// Stamps `created_at` on insert and refreshes `updated_at` on every save.
pub(crate) fn touch_timestamps(
    created_at: &mut ActiveValue<DateTime<Utc>>,
    updated_at: &mut ActiveValue<DateTime<Utc>>,
    insert: bool,
) {
    let now = Utc::now();
    if insert && matches!(created_at, ActiveValue::NotSet) {
        *created_at = ActiveValue::Set(now);
    }
    *updated_at = ActiveValue::Set(now);
}
