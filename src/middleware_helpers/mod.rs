//! Request-level middleware shared by every route.

pub mod request_id;
