//! Shared API types for list endpoints

pub mod pagination;

pub use pagination::{Paginated, PaginationMeta, PaginationParams};
