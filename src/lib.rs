// Blog Feed - posts, groups, comments and author follows behind paginated feeds

// Core types and primitives
pub mod core;

// Domain records
pub mod models;

// Store, caching and request infrastructure
pub mod infrastructure;

// Feed queries, mutations and administration
pub mod services;

// HTTP surface
pub mod api;
pub mod app_state;

// Common utilities
pub mod config;
pub mod error;
pub mod forms;
pub mod pagination;
pub mod data_seeder;

// Re-exports for convenience
pub use error::{AppError, AppResult};
pub use pagination::{paginate, Page, PageRequest, Paginator};
