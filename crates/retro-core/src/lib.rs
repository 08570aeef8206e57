pub mod config;
pub mod error;
pub mod latency;
pub mod models;
pub mod repository;
pub mod sorting;
pub mod validation;

pub use error::RetroError;
pub use repository::CatalogRepository;
