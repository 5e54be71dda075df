pub mod admin;
pub mod cart;
pub mod catalog;
pub mod common;
pub mod leads;
pub mod orders;

use crate::{
    db::DbPool,
    services::{
        admin::AdminService, cart::CartService, catalog::CatalogService,
        images::ImageResolver, leads::LeadService, orders::OrderService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub cart: Arc<CartService>,
    pub leads: Arc<LeadService>,
    pub orders: Arc<OrderService>,
    pub catalog: Arc<CatalogService>,
    pub admin: Arc<AdminService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, images: Arc<ImageResolver>) -> Self {
        let cart = CartService::new();
        Self {
            orders: Arc::new(OrderService::new(db_pool.clone(), cart.clone())),
            cart: Arc::new(cart),
            leads: Arc::new(LeadService::new(db_pool.clone())),
            catalog: Arc::new(CatalogService::new(db_pool.clone(), images)),
            admin: Arc::new(AdminService::new(db_pool)),
        }
    }
}
