//! The BSP layout engine (spec.md §4.3).
pub mod bsp;

pub use bsp::Bsp;
