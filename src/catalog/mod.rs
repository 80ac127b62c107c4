//! Property catalog: reference data the advisor sells against

mod data;
pub mod loader;

pub use data::{find_property, Property};
pub use loader::{load_catalog, sample_catalog};
