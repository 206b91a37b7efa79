//! Cutting plans for a fabrication shop: first-fit-decreasing packing of
//! linear cuts onto stock bars, column nesting of rectangular panels onto
//! stock sheets, and grouping of identical bars for reporting.

pub mod catalog;
pub mod grouping;
pub mod linear;
pub mod nesting;
pub mod types;

pub use catalog::{ProfileCatalog, ProfileInfo, StaticCatalog};
pub use grouping::{expand_groups, fingerprint, group_bars, same_layout};
pub use linear::LinearOptimizer;
pub use nesting::PanelOptimizer;
pub use types::*;
