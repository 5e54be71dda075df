// Pure helpers shared by the services below
pub mod images;
pub mod pricing;

// Session-backed cart
pub mod cart;

// Intake
pub mod leads;
pub mod orders;

// Catalog read side and content management
pub mod admin;
pub mod catalog;
