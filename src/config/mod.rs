//! YAML command catalogs
//!
//! - `types`: serde shapes of a catalog file
//! - `loader`: file discovery, handler binding and catalog construction

pub mod loader;
pub mod types;

pub use loader::{CatalogLoader, HandlerRegistry};
pub use types::{CatalogConfig, CommandConfig, ParamConfig};
